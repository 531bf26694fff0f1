//! Protocolo do uplink (JSON sobre HTTP).
//!
//! Requisição `POST /esp32/data`:
//!
//! ```text
//! {"gps_latitude": f64, "gps_longitude": f64,
//!  "accel_x": f64, "accel_y": f64, "accel_z": f64}
//! ```
//!
//! Resposta `200`: `{"mode": "safe"|"lock", "threshold": f64}`, ambos
//! opcionais. Sem coordenada, latitude/longitude vão como `0`.

use crate::types::{AccelerationSample, DEFAULT_THRESHOLD, DeviceMode, GeoCoordinate};
use serde::{Deserialize, Deserializer, Serialize};

/// Erros do protocolo.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Erro de serialização: {0}")]
    Serialize(String),

    #[error("Erro de deserialização: {0}")]
    Deserialize(String),
}

/// Corpo enviado ao servidor a cada uplink.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct UplinkPayload {
    pub gps_latitude: f64,
    pub gps_longitude: f64,
    pub accel_x: f64,
    pub accel_y: f64,
    pub accel_z: f64,
}

impl UplinkPayload {
    pub fn new(coordinate: Option<GeoCoordinate>, sample: AccelerationSample) -> Self {
        let (gps_latitude, gps_longitude) = coordinate
            .map(|c| (c.latitude, c.longitude))
            .unwrap_or((0.0, 0.0));
        Self {
            gps_latitude,
            gps_longitude,
            accel_x: sample.ax,
            accel_y: sample.ay,
            accel_z: sample.az,
        }
    }
}

/// Resposta do servidor com os defaults já aplicados.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ServerReply {
    #[serde(default, deserialize_with = "lenient_mode")]
    pub mode: DeviceMode,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

impl Default for ServerReply {
    fn default() -> Self {
        Self {
            mode: DeviceMode::Safe,
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

/// Qualquer valor de `mode` que não seja "safe"/"lock" cai em SAFE.
fn lenient_mode<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DeviceMode, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value
        .as_str()
        .and_then(|s| s.parse().ok())
        .unwrap_or_default())
}

/// Serializa o payload em JSON.
pub fn encode_payload(payload: &UplinkPayload) -> Result<Vec<u8>, ProtocolError> {
    serde_json::to_vec(payload).map_err(|e| ProtocolError::Serialize(e.to_string()))
}

/// Lado servidor do contrato; usado em testes e ferramentas.
pub fn decode_payload(data: &[u8]) -> Result<UplinkPayload, ProtocolError> {
    serde_json::from_slice(data).map_err(|e| ProtocolError::Deserialize(e.to_string()))
}

/// Interpreta o corpo de uma resposta 200.
pub fn decode_reply(body: &[u8]) -> Result<ServerReply, ProtocolError> {
    serde_json::from_slice(body).map_err(|e| ProtocolError::Deserialize(e.to_string()))
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────
