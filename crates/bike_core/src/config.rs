//! Configuração unificada via TOML.
//!
//! Servidor, threshold, intervalos e pinos do dispositivo vivem em um
//! único `config.toml`; os defaults reproduzem a instalação de referência.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::types::DEFAULT_THRESHOLD;

/// Limites aceitos para os intervalos (segundos).
pub const MAX_TIMEOUT_SECS: f64 = 60.0;
pub const MAX_SEND_INTERVAL_SECS: f64 = 3600.0;

/// Converte segundos em `Duration` sem pânico; fora da faixa usa `fallback`.
fn secs_or(secs: f64, fallback: f64) -> Duration {
    Duration::try_from_secs_f64(secs)
        .ok()
        .filter(|d| !d.is_zero())
        .unwrap_or_else(|| Duration::from_secs_f64(fallback))
}

/// Servidor de telemetria.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// IP ou hostname do servidor
    pub host: String,
    /// Porta HTTP
    pub port: u16,
    /// Endpoint do uplink
    pub path: String,
    /// Timeout de conexão/leitura/escrita (segundos)
    pub timeout_secs: f64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "192.168.1.76".into(),
            port: 3000,
            path: "/esp32/data".into(),
            timeout_secs: 5.0,
        }
    }
}

impl ServerConfig {
    pub fn timeout(&self) -> Duration {
        secs_or(self.timeout_secs, ServerConfig::default().timeout_secs)
    }
}

/// Alarme.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlarmConfig {
    /// Threshold inicial até a primeira resposta do servidor (g)
    pub default_threshold: f64,
    /// Dois bipes de teste na inicialização
    pub self_test: bool,
}

impl Default for AlarmConfig {
    fn default() -> Self {
        Self {
            default_threshold: DEFAULT_THRESHOLD,
            self_test: true,
        }
    }
}

/// Cadência do uplink.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UplinkConfig {
    /// Intervalo máximo sem envio quando não há fix (segundos)
    pub gps_send_interval_secs: f64,
}

impl Default for UplinkConfig {
    fn default() -> Self {
        Self {
            gps_send_interval_secs: 5.0,
        }
    }
}

impl UplinkConfig {
    pub fn gps_send_interval(&self) -> Duration {
        secs_or(
            self.gps_send_interval_secs,
            UplinkConfig::default().gps_send_interval_secs,
        )
    }
}

/// Loop de controle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Período de cada tick (segundos)
    pub tick_interval_secs: f64,
    /// Aborta na inicialização se o acelerômetro não responder
    pub accelerometer_required: bool,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: 1.0,
            accelerometer_required: false,
        }
    }
}

impl ControlConfig {
    pub fn tick_interval(&self) -> Duration {
        secs_or(
            self.tick_interval_secs,
            ControlConfig::default().tick_interval_secs,
        )
    }
}

/// Barramentos e pinos do dispositivo.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HardwareConfig {
    /// Dispositivo I2C do MPU6050
    pub i2c_bus: String,
    /// Endereço I2C do MPU6050
    pub mpu_address: u8,
    /// Porta serial do GPS
    pub gps_port: String,
    pub gps_baud: u32,
    /// Timeout de leitura de linha do GPS (ms)
    pub gps_timeout_ms: u64,
    /// Chip GPIO do buzzer
    pub buzzer_chip: String,
    /// Linha GPIO do buzzer
    pub buzzer_line: u32,
}

impl Default for HardwareConfig {
    fn default() -> Self {
        Self {
            i2c_bus: "/dev/i2c-1".into(),
            mpu_address: 0x68,
            gps_port: "/dev/serial0".into(),
            gps_baud: 9600,
            gps_timeout_ms: 1000,
            buzzer_chip: "/dev/gpiochip0".into(),
            buzzer_line: 5,
        }
    }
}

/// Configuração raiz do aplicativo.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub alarm: AlarmConfig,
    pub uplink: UplinkConfig,
    pub control: ControlConfig,
    pub hardware: HardwareConfig,
}

impl AppConfig {
    /// Carrega configuração de um arquivo TOML.
    pub fn load(path: &Path) -> Self {
        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(content) => match toml::from_str::<AppConfig>(&content) {
                    Ok(config) => {
                        info!("Configuração carregada de {}", path.display());
                        return config;
                    }
                    Err(e) => {
                        warn!("Erro ao parsear {}: {}", path.display(), e);
                    }
                },
                Err(e) => {
                    warn!("Erro ao ler {}: {}", path.display(), e);
                }
            }
        }

        info!("Usando configuração padrão");
        AppConfig::default()
    }

    /// Salva configuração em arquivo TOML.
    pub fn save(&self, path: &Path) -> Result<(), String> {
        let content = toml::to_string_pretty(self).map_err(|e| e.to_string())?;
        std::fs::write(path, content).map_err(|e| e.to_string())?;
        info!("Configuração salva em {}", path.display());
        Ok(())
    }

    /// Retorna o caminho padrão do config.toml.
    pub fn default_path() -> PathBuf {
        let exe_dir = std::env::current_exe()
            .map(|p| p.parent().unwrap_or(Path::new(".")).to_path_buf())
            .unwrap_or_else(|_| PathBuf::from("."));
        exe_dir.join("config.toml")
    }

    /// URL completa do endpoint de uplink.
    pub fn server_url(&self) -> String {
        format!(
            "http://{}:{}{}",
            self.server.host, self.server.port, self.server.path
        )
    }

    /// Valida a configuração e retorna lista de erros.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.server.host.trim().is_empty() {
            errors.push("Host do servidor não pode ser vazio".into());
        }
        if self.server.port == 0 {
            errors.push("Porta do servidor não pode ser 0".into());
        }
        if !self.server.path.starts_with('/') {
            errors.push(format!(
                "Endpoint deve começar com '/': {:?}",
                self.server.path
            ));
        }
        if !(self.server.timeout_secs > 0.0 && self.server.timeout_secs <= MAX_TIMEOUT_SECS) {
            errors.push(format!(
                "Timeout do servidor inválido: {} (0–{MAX_TIMEOUT_SECS})",
                self.server.timeout_secs
            ));
        }
        if !(self.alarm.default_threshold.is_finite() && self.alarm.default_threshold > 0.0) {
            errors.push(format!(
                "Threshold padrão deve ser > 0: {}",
                self.alarm.default_threshold
            ));
        }
        if !(self.uplink.gps_send_interval_secs > 0.0
            && self.uplink.gps_send_interval_secs <= MAX_SEND_INTERVAL_SECS)
        {
            errors.push(format!(
                "Intervalo de envio inválido: {} (0–{MAX_SEND_INTERVAL_SECS})",
                self.uplink.gps_send_interval_secs
            ));
        }
        if !(0.1..=60.0).contains(&self.control.tick_interval_secs) {
            errors.push(format!(
                "Intervalo do tick inválido: {} (0.1–60.0)",
                self.control.tick_interval_secs
            ));
        }
        if self.hardware.gps_timeout_ms == 0 {
            errors.push("Timeout do GPS não pode ser 0".into());
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        let errors = config.validate();
        assert!(errors.is_empty(), "Erros: {:?}", errors);
    }

    #[test]
    fn defaults_match_reference_install() {
        let config = AppConfig::default();
        assert_eq!(config.server_url(), "http://192.168.1.76:3000/esp32/data");
        assert_eq!(config.alarm.default_threshold, 1.3);
        assert_eq!(config.uplink.gps_send_interval(), Duration::from_secs(5));
        assert_eq!(config.control.tick_interval(), Duration::from_secs(1));
    }

    #[test]
    fn roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(config.server.port, parsed.server.port);
        assert_eq!(config.hardware.gps_port, parsed.hardware.gps_port);
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let partial = r#"
[server]
host = "10.0.0.5"
"#;
        let config: AppConfig = toml::from_str(partial).unwrap();
        assert_eq!(config.server.host, "10.0.0.5");
        // Outros campos devem ter valor padrão
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.alarm.default_threshold, 1.3);
    }

    #[test]
    fn rejects_non_positive_threshold() {
        let mut config = AppConfig::default();
        config.alarm.default_threshold = 0.0;
        config.control.tick_interval_secs = 0.0;
        let errors = config.validate();
        assert_eq!(errors.len(), 2, "Erros: {:?}", errors);
    }

    #[test]
    fn rejects_huge_intervals() {
        let mut config = AppConfig::default();
        config.server.timeout_secs = 1e20;
        config.uplink.gps_send_interval_secs = 1e20;
        let errors = config.validate();
        assert_eq!(errors.len(), 2, "Erros: {:?}", errors);

        config.server.timeout_secs = f64::NAN;
        config.uplink.gps_send_interval_secs = f64::INFINITY;
        assert_eq!(config.validate().len(), 2);
    }

    #[test]
    fn out_of_range_durations_do_not_panic() {
        let mut config = AppConfig::default();
        config.server.timeout_secs = 1e20;
        config.uplink.gps_send_interval_secs = -3.0;
        config.control.tick_interval_secs = f64::NAN;
        assert_eq!(config.server.timeout(), Duration::from_secs(5));
        assert_eq!(config.uplink.gps_send_interval(), Duration::from_secs(5));
        assert_eq!(config.control.tick_interval(), Duration::from_secs(1));

        config.server.timeout_secs = 0.0;
        assert_eq!(config.server.timeout(), Duration::from_secs(5));
        config.server.timeout_secs = 2.5;
        assert_eq!(config.server.timeout(), Duration::from_millis(2500));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = AppConfig::load(Path::new("/nonexistent/bike/config.toml"));
        assert_eq!(config.server.port, 3000);
    }
}
