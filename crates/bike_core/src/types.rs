//! Tipos de domínio do monitor antifurto.
//!
//! Amostras do acelerômetro, coordenadas GPS e o par modo/threshold
//! controlado pelo servidor.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ──────────────────────────────────────────────
// Acelerômetro
// ──────────────────────────────────────────────

/// Leitura instantânea dos três eixos do acelerômetro, em g.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AccelerationSample {
    pub ax: f64,
    pub ay: f64,
    pub az: f64,
}

impl AccelerationSample {
    pub fn new(ax: f64, ay: f64, az: f64) -> Self {
        Self { ax, ay, az }
    }

    /// Norma euclidiana dos três eixos (g).
    pub fn magnitude(&self) -> f64 {
        (self.ax * self.ax + self.ay * self.ay + self.az * self.az).sqrt()
    }
}

// ──────────────────────────────────────────────
// GPS
// ──────────────────────────────────────────────

/// Posição em graus decimais com sinal (S/W negativos), 6 casas decimais.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoCoordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl fmt::Display for GeoCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}, {:.6}", self.latitude, self.longitude)
    }
}

// ──────────────────────────────────────────────
// Modo / threshold
// ──────────────────────────────────────────────

/// Estado de armamento definido pelo servidor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceMode {
    /// Monitoramento desligado
    #[default]
    Safe,
    /// Alarme ativo
    Lock,
}

impl DeviceMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceMode::Safe => "safe",
            DeviceMode::Lock => "lock",
        }
    }
}

impl fmt::Display for DeviceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DeviceMode::Safe => "SAFE",
            DeviceMode::Lock => "LOCK",
        })
    }
}

impl FromStr for DeviceMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "safe" => Ok(DeviceMode::Safe),
            "lock" => Ok(DeviceMode::Lock),
            other => Err(format!("modo desconhecido: {other:?}")),
        }
    }
}

/// Threshold padrão do alarme (g).
pub const DEFAULT_THRESHOLD: f64 = 1.3;

/// Magnitude limite acima da qual o alarme dispara em LOCK.
///
/// Só é construído a partir de valores finitos e > 0.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
pub struct AlarmThreshold(f64);

impl AlarmThreshold {
    pub fn new(value: f64) -> Option<Self> {
        (value.is_finite() && value > 0.0).then_some(Self(value))
    }

    pub fn get(&self) -> f64 {
        self.0
    }
}

impl Default for AlarmThreshold {
    fn default() -> Self {
        Self(DEFAULT_THRESHOLD)
    }
}

impl fmt::Display for AlarmThreshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}g", self.0)
    }
}

/// Par modo/threshold: único estado mutável compartilhado do núcleo.
///
/// Escrito apenas pelo cliente de uplink (resposta do servidor), lido pela
/// máquina de alarme. Os dois campos são sempre substituídos juntos.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ArmingState {
    pub mode: DeviceMode,
    pub threshold: AlarmThreshold,
}

impl ArmingState {
    pub fn new(threshold: AlarmThreshold) -> Self {
        Self {
            mode: DeviceMode::Safe,
            threshold,
        }
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magnitude_of_unit_z_is_one() {
        let s = AccelerationSample::new(0.0, 0.0, 1.0);
        assert!((s.magnitude() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn magnitude_of_ones_is_sqrt3() {
        let s = AccelerationSample::new(1.0, 1.0, 1.0);
        assert!((s.magnitude() - 3f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn threshold_rejects_non_positive() {
        assert!(AlarmThreshold::new(0.0).is_none());
        assert!(AlarmThreshold::new(-1.0).is_none());
        assert!(AlarmThreshold::new(f64::NAN).is_none());
        assert!(AlarmThreshold::new(f64::INFINITY).is_none());
        assert_eq!(AlarmThreshold::new(2.0).map(|t| t.get()), Some(2.0));
    }

    #[test]
    fn initial_state_is_safe_with_default_threshold() {
        let state = ArmingState::default();
        assert_eq!(state.mode, DeviceMode::Safe);
        assert_eq!(state.threshold.get(), DEFAULT_THRESHOLD);
    }

    #[test]
    fn mode_parses_case_insensitive() {
        assert_eq!("LOCK".parse::<DeviceMode>(), Ok(DeviceMode::Lock));
        assert_eq!(" safe ".parse::<DeviceMode>(), Ok(DeviceMode::Safe));
        assert!("armed".parse::<DeviceMode>().is_err());
    }
}
