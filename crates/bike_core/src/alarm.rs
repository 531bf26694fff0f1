//! Máquina de estados do alarme.
//!
//! O estado do buzzer é função pura de (modo, magnitude, threshold),
//! reavaliada a cada tick: sem histerese, debounce ou trava. SOUNDING só é
//! alcançável em LOCK.

use crate::sampler::SensorError;
use crate::types::{ArmingState, DeviceMode};
use embedded_hal::digital::OutputPin;
use tracing::{info, warn};

/// Estado observável do buzzer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BuzzerState {
    #[default]
    Quiet,
    Sounding,
}

impl BuzzerState {
    pub fn is_on(&self) -> bool {
        matches!(self, BuzzerState::Sounding)
    }
}

/// Regra de transição.
pub fn evaluate(state: &ArmingState, magnitude: f64) -> BuzzerState {
    match state.mode {
        DeviceMode::Lock if magnitude > state.threshold.get() => BuzzerState::Sounding,
        DeviceMode::Lock | DeviceMode::Safe => BuzzerState::Quiet,
    }
}

/// Buzzer ligado a um pino GPIO.
pub struct Buzzer<P> {
    pin: P,
}

impl<P: OutputPin> Buzzer<P> {
    pub fn new(pin: P) -> Self {
        Self { pin }
    }

    pub fn set(&mut self, on: bool) -> Result<(), SensorError> {
        let result = if on {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        result.map_err(|e| SensorError::Buzzer(format!("{e:?}")))
    }

    pub fn release(self) -> P {
        self.pin
    }
}

/// Avalia o alarme a cada tick e aciona o buzzer.
pub struct AlarmMachine<P> {
    buzzer: Buzzer<P>,
    current: BuzzerState,
}

impl<P: OutputPin> AlarmMachine<P> {
    pub fn new(buzzer: Buzzer<P>) -> Self {
        Self {
            buzzer,
            current: BuzzerState::Quiet,
        }
    }

    pub fn state(&self) -> BuzzerState {
        self.current
    }

    pub fn buzzer_mut(&mut self) -> &mut Buzzer<P> {
        &mut self.buzzer
    }

    /// Reavalia e escreve o pino em todo tick, mesmo sem mudança de estado.
    pub fn update(
        &mut self,
        state: &ArmingState,
        magnitude: f64,
    ) -> Result<BuzzerState, SensorError> {
        let next = evaluate(state, magnitude);
        self.buzzer.set(next.is_on())?;

        if next != self.current {
            match next {
                BuzzerState::Sounding => warn!(
                    "🔔 ALARME: magnitude {:.2}g > threshold {}",
                    magnitude, state.threshold
                ),
                BuzzerState::Quiet => info!("Alarme silenciado ({})", state.mode),
            }
        }
        self.current = next;
        Ok(next)
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::types::AlarmThreshold;
    use embedded_hal::digital::{ErrorKind, ErrorType};
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Pino falso que registra cada escrita.
    #[derive(Clone, Default)]
    pub(crate) struct FakePin {
        pub levels: Rc<RefCell<Vec<bool>>>,
        pub fail: bool,
    }

    impl FakePin {
        pub(crate) fn last(&self) -> Option<bool> {
            self.levels.borrow().last().copied()
        }
    }

    impl ErrorType for FakePin {
        type Error = ErrorKind;
    }

    impl OutputPin for FakePin {
        fn set_low(&mut self) -> Result<(), Self::Error> {
            if self.fail {
                return Err(ErrorKind::Other);
            }
            self.levels.borrow_mut().push(false);
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Self::Error> {
            if self.fail {
                return Err(ErrorKind::Other);
            }
            self.levels.borrow_mut().push(true);
            Ok(())
        }
    }

    fn armed(threshold: f64) -> ArmingState {
        ArmingState {
            mode: DeviceMode::Lock,
            threshold: AlarmThreshold::new(threshold).unwrap(),
        }
    }

    #[test]
    fn lock_above_threshold_sounds() {
        assert_eq!(evaluate(&armed(1.3), 1.31), BuzzerState::Sounding);
    }

    #[test]
    fn lock_below_or_at_threshold_is_quiet() {
        assert_eq!(evaluate(&armed(1.3), 1.29), BuzzerState::Quiet);
        assert_eq!(evaluate(&armed(1.3), 1.3), BuzzerState::Quiet);
    }

    #[test]
    fn safe_mode_dominates() {
        let state = ArmingState::default();
        assert_eq!(evaluate(&state, 99.0), BuzzerState::Quiet);
    }

    #[test]
    fn machine_drives_pin_every_tick() {
        let pin = FakePin::default();
        let mut machine = AlarmMachine::new(Buzzer::new(pin.clone()));
        let state = armed(1.3);

        assert_eq!(machine.update(&state, 2.0).unwrap(), BuzzerState::Sounding);
        assert_eq!(pin.last(), Some(true));
        assert_eq!(machine.update(&state, 2.0).unwrap(), BuzzerState::Sounding);
        assert_eq!(machine.update(&state, 1.0).unwrap(), BuzzerState::Quiet);
        assert_eq!(pin.last(), Some(false));
        assert_eq!(*pin.levels.borrow(), vec![true, true, false]);
    }

    #[test]
    fn no_latching_after_disarm() {
        let pin = FakePin::default();
        let mut machine = AlarmMachine::new(Buzzer::new(pin.clone()));
        machine.update(&armed(1.3), 5.0).unwrap();
        machine.update(&ArmingState::default(), 5.0).unwrap();
        assert_eq!(machine.state(), BuzzerState::Quiet);
        assert_eq!(pin.last(), Some(false));
    }

    #[test]
    fn pin_failure_is_reported() {
        let pin = FakePin {
            fail: true,
            ..Default::default()
        };
        let mut machine = AlarmMachine::new(Buzzer::new(pin));
        assert!(matches!(
            machine.update(&armed(1.3), 2.0),
            Err(SensorError::Buzzer(_))
        ));
    }
}
