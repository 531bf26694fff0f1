//! Cenário completo do loop de controle com hardware e servidor falsos.

use bike_core::alarm::{AlarmMachine, Buzzer, BuzzerState};
use bike_core::gps::GpsSource;
use bike_core::http::{HttpResponse, HttpTransport, TransportError};
use bike_core::protocol::decode_payload;
use bike_core::sampler::{MotionSampler, SensorError};
use bike_core::uplink::{SendReason, UplinkClient};
use bike_core::{AppConfig, DeviceMode, Monitor};
use embedded_hal::digital::{self, OutputPin};
use embedded_hal::i2c::{self, I2c, Operation, SevenBitAddress};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::{Duration, Instant};

// ──────────────────────────────────────────────
// Hardware falso
// ──────────────────────────────────────────────

/// Acelerômetro que devolve sempre o mesmo valor bruto nos três eixos.
struct SteadyAccel(Rc<RefCell<i16>>);

impl i2c::ErrorType for SteadyAccel {
    type Error = i2c::ErrorKind;
}

impl I2c<SevenBitAddress> for SteadyAccel {
    fn transaction(
        &mut self,
        _address: SevenBitAddress,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        let word = self.0.borrow().to_be_bytes();
        for op in operations {
            if let Operation::Read(buf) = op {
                buf.copy_from_slice(&word[..buf.len()]);
            }
        }
        Ok(())
    }
}

#[derive(Clone, Default)]
struct Pin(Rc<RefCell<bool>>);

impl digital::ErrorType for Pin {
    type Error = digital::ErrorKind;
}

impl OutputPin for Pin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        *self.0.borrow_mut() = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        *self.0.borrow_mut() = true;
        Ok(())
    }
}

#[derive(Default)]
struct Gps(Rc<RefCell<VecDeque<String>>>);

impl GpsSource for Gps {
    fn has_data(&mut self) -> Result<bool, SensorError> {
        Ok(!self.0.borrow().is_empty())
    }

    fn read_line(&mut self) -> Result<Option<Vec<u8>>, SensorError> {
        Ok(self.0.borrow_mut().pop_front().map(String::into_bytes))
    }
}

#[derive(Default)]
struct Server {
    replies: Rc<RefCell<VecDeque<Result<HttpResponse, TransportError>>>>,
    requests: Rc<RefCell<Vec<Vec<u8>>>>,
}

impl HttpTransport for Server {
    fn post_json(&mut self, body: &[u8]) -> Result<HttpResponse, TransportError> {
        self.requests.borrow_mut().push(body.to_vec());
        self.replies
            .borrow_mut()
            .pop_front()
            .unwrap_or(Err(TransportError::Timeout))
    }
}

fn ok(body: &str) -> Result<HttpResponse, TransportError> {
    Ok(HttpResponse {
        status: 200,
        body: body.as_bytes().to_vec(),
    })
}

// ──────────────────────────────────────────────
// Cenário
// ──────────────────────────────────────────────

#[test]
fn arm_detect_and_disarm() {
    let raw = Rc::new(RefCell::new(16384i16)); // 1g em cada eixo → √3 g
    let buzzer = Pin::default();
    let gps = Gps::default();
    let lines = gps.0.clone();
    let server = Server::default();
    let replies = server.replies.clone();
    let requests = server.requests.clone();

    let mut monitor = Monitor::new(
        MotionSampler::new(SteadyAccel(raw.clone())),
        AlarmMachine::new(Buzzer::new(buzzer.clone())),
        gps,
        UplinkClient::new(server),
        &AppConfig::default(),
    );
    let t0 = Instant::now();
    let at = |secs: u64| t0 + Duration::from_secs(secs);

    // Tick 0: sem fix, nada enviado ainda → heartbeat; servidor arma
    replies.borrow_mut().push_back(ok(r#"{"mode":"lock","threshold":2.0}"#));
    let r = monitor.tick(at(0)).unwrap();
    assert_eq!(r.sent, Some(SendReason::Heartbeat));
    assert_eq!(monitor.state().mode, DeviceMode::Lock);
    assert_eq!(monitor.state().threshold.get(), 2.0);

    // Tick 1: √3 < 2.0 → quieto
    assert_eq!(monitor.tick(at(1)).unwrap().buzzer, BuzzerState::Quiet);
    assert!(!*buzzer.0.borrow());

    // Tick 2: movimento forte (2g por eixo) → alarme; fix → envio com coordenada
    *raw.borrow_mut() = 32767;
    lines
        .borrow_mut()
        .push_back("$GNRMC,083559.00,A,2742.000,N,08519.440,E,0.004,77.52,091202,,,A*57".into());
    replies.borrow_mut().push_back(Err(TransportError::ConnectionReset));
    let r = monitor.tick(at(2)).unwrap();
    assert_eq!(r.buzzer, BuzzerState::Sounding);
    assert!(*buzzer.0.borrow());
    assert_eq!(r.sent, Some(SendReason::WithFix));
    assert_eq!(r.uplink_ok, Some(false));
    // Reset não altera o modo
    assert_eq!(monitor.state().mode, DeviceMode::Lock);

    let last = decode_payload(requests.borrow().last().unwrap()).unwrap();
    assert!((last.gps_latitude - 27.7).abs() < 1e-6);
    assert!((last.gps_longitude - 85.324).abs() < 1e-6);

    // Ticks 3–7: sem fix, dentro do intervalo → nenhum envio
    for s in 3..=7 {
        assert_eq!(monitor.tick(at(s)).unwrap().sent, None);
    }
    assert_eq!(requests.borrow().len(), 2);

    // Tick 8: intervalo estourado → heartbeat; servidor desarma
    replies.borrow_mut().push_back(ok(r#"{"mode":"safe"}"#));
    let r = monitor.tick(at(8)).unwrap();
    assert_eq!(r.sent, Some(SendReason::Heartbeat));
    assert_eq!(monitor.state().mode, DeviceMode::Safe);
    assert_eq!(monitor.state().threshold.get(), 1.3);

    let last = decode_payload(requests.borrow().last().unwrap()).unwrap();
    assert_eq!(last.gps_latitude, 0.0);
    assert_eq!(last.gps_longitude, 0.0);

    // Tick 9: SAFE silencia mesmo com movimento forte
    assert_eq!(monitor.tick(at(9)).unwrap().buzzer, BuzzerState::Quiet);
    assert!(!*buzzer.0.borrow());
}
