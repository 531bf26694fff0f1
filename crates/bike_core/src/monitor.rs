//! Loop de controle: um tick por intervalo, single-thread.
//!
//! Ordem de cada tick:
//! 1. amostra o acelerômetro (falha → tick pulado, buzzer e uplink intocados)
//! 2. avalia o alarme e aciona o buzzer
//! 3. lê no máximo uma linha do GPS
//! 4. com fix → envia telemetria com a coordenada
//! 5. sem fix e intervalo estourado → envia sem coordenada
//!
//! Nenhuma falha de tick encerra o processo.

use crate::alarm::{AlarmMachine, BuzzerState};
use crate::config::AppConfig;
use crate::gps::{GpsSource, poll_coordinate};
use crate::http::HttpTransport;
use crate::sampler::{MotionSampler, SensorError};
use crate::types::{AccelerationSample, AlarmThreshold, ArmingState, DeviceMode, GeoCoordinate};
use crate::uplink::{SendPolicy, SendReason, UplinkClient, log_failure};
use embedded_hal::digital::OutputPin;
use embedded_hal::i2c::I2c;
use std::time::{Duration, Instant};
use tracing::{error, info};

/// Falha que aborta o restante de um tick.
#[derive(Debug, thiserror::Error)]
pub enum TickError {
    #[error("Erro no acelerômetro: {0}")]
    Sampler(SensorError),

    #[error("Erro no buzzer: {0}")]
    Buzzer(SensorError),
}

/// Resultado de um tick completo.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    pub sample: AccelerationSample,
    pub magnitude: f64,
    /// Modo usado na avaliação do alarme (anterior ao uplink deste tick).
    pub mode: DeviceMode,
    pub buzzer: BuzzerState,
    pub coordinate: Option<GeoCoordinate>,
    pub sent: Option<SendReason>,
    /// `Some(true)` se o uplink deste tick teve resposta 200 válida.
    pub uplink_ok: Option<bool>,
}

/// Orquestra amostragem, alarme, GPS e uplink.
pub struct Monitor<I2C, P, G, T> {
    sampler: MotionSampler<I2C>,
    alarm: AlarmMachine<P>,
    gps: G,
    uplink: UplinkClient<T>,
    policy: SendPolicy,
    state: ArmingState,
    tick_interval: Duration,
}

impl<I2C, P, G, T> Monitor<I2C, P, G, T>
where
    I2C: I2c,
    P: OutputPin,
    G: GpsSource,
    T: HttpTransport,
{
    pub fn new(
        sampler: MotionSampler<I2C>,
        alarm: AlarmMachine<P>,
        gps: G,
        uplink: UplinkClient<T>,
        config: &AppConfig,
    ) -> Self {
        let threshold = AlarmThreshold::new(config.alarm.default_threshold).unwrap_or_default();
        Self {
            sampler,
            alarm,
            gps,
            uplink,
            policy: SendPolicy::new(config.uplink.gps_send_interval()),
            state: ArmingState::new(threshold),
            tick_interval: config.control.tick_interval(),
        }
    }

    pub fn state(&self) -> &ArmingState {
        &self.state
    }

    pub fn policy(&self) -> &SendPolicy {
        &self.policy
    }

    pub fn uplink(&self) -> &UplinkClient<T> {
        &self.uplink
    }

    pub fn alarm(&self) -> &AlarmMachine<P> {
        &self.alarm
    }

    /// Executa um tick no instante `now`.
    pub fn tick(&mut self, now: Instant) -> Result<TickReport, TickError> {
        let sample = self.sampler.read().map_err(TickError::Sampler)?;
        let magnitude = sample.magnitude();
        let mode = self.state.mode;

        let buzzer = self
            .alarm
            .update(&self.state, magnitude)
            .map_err(TickError::Buzzer)?;

        let coordinate = poll_coordinate(&mut self.gps);

        let sent = self.policy.decide(now, coordinate.is_some());
        let uplink_ok = sent.map(|_| {
            let result = self.uplink.send(coordinate, sample, &mut self.state);
            self.policy.mark_sent(now);
            match result {
                Ok(_) => true,
                Err(e) => {
                    log_failure(&e);
                    false
                }
            }
        });

        Ok(TickReport {
            sample,
            magnitude,
            mode,
            buzzer,
            coordinate,
            sent,
            uplink_ok,
        })
    }

    /// Loop infinito. Erros de tick são logados e o loop segue.
    pub fn run(&mut self) -> ! {
        loop {
            let cycle_start = Instant::now();

            match self.tick(cycle_start) {
                Ok(report) => Self::log_status(&report),
                Err(e) => error!("✗ Erro no loop principal: {e}"),
            }

            // Dormir pelo tempo restante do intervalo
            let elapsed = cycle_start.elapsed();
            if elapsed < self.tick_interval {
                std::thread::sleep(self.tick_interval - elapsed);
            }
        }
    }

    fn log_status(report: &TickReport) {
        info!("{}", status_line(report));
        if let Some(coord) = report.coordinate {
            info!("📍 GPS: {coord}");
        }
    }
}

/// Linha de status de um tick, com o modo que decidiu o buzzer.
pub fn status_line(report: &TickReport) -> String {
    let status = match report.buzzer {
        BuzzerState::Sounding => "🔔 ALARME",
        BuzzerState::Quiet => "✓ Normal",
    };
    format!(
        "Modo: {:4} | X={:+.2} Y={:+.2} Z={:+.2} | Mag={:.2}g | {}",
        report.mode.to_string(),
        report.sample.ax,
        report.sample.ay,
        report.sample.az,
        report.magnitude,
        status
    )
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────
