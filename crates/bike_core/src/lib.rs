//! # Bike Core
//!
//! Núcleo do monitor antifurto para bicicleta: amostra o acelerômetro,
//! soa o buzzer quando armado e envia telemetria (acelerômetro + GPS) a um
//! servidor que, na resposta, define o modo e o threshold do alarme.
//!
//! ## Módulos
//! - [`types`] – Amostras, coordenadas, modo e threshold
//! - [`nmea`] – Parser de sentenças GGA/RMC
//! - [`sampler`] – Driver do MPU6050 (embedded-hal I2C)
//! - [`alarm`] – Máquina de estados do alarme e buzzer
//! - [`gps`] – Fonte de linhas NMEA
//! - [`protocol`] – Payload JSON e resposta do servidor
//! - [`http`] – Transporte HTTP/1.1 com timeout
//! - [`uplink`] – Cadência de envio e aplicação da resposta
//! - [`config`] – Configuração unificada via TOML
//! - [`monitor`] – Loop de controle

pub mod types;
pub mod nmea;
pub mod sampler;
pub mod alarm;
pub mod gps;
pub mod protocol;
pub mod http;
pub mod uplink;
pub mod config;
pub mod monitor;

// Re-exports convenientes
pub use types::{AccelerationSample, AlarmThreshold, ArmingState, DeviceMode, GeoCoordinate};
pub use config::AppConfig;
pub use monitor::{Monitor, TickError, TickReport};
