//! Fonte de linhas NMEA do receptor GPS.

use crate::nmea::parse_sentence;
use crate::sampler::SensorError;
use crate::types::GeoCoordinate;
use tracing::{debug, warn};

/// Capacidade mínima do receptor: leitura de linha não bloqueante.
pub trait GpsSource {
    /// Há bytes pendentes no buffer do receptor?
    fn has_data(&mut self) -> Result<bool, SensorError>;

    /// Lê até uma linha (limitada por timeout). `None` se nada chegou.
    fn read_line(&mut self) -> Result<Option<Vec<u8>>, SensorError>;
}

/// Receptor ausente (porta serial não abriu): nunca há dados.
impl<G: GpsSource> GpsSource for Option<G> {
    fn has_data(&mut self) -> Result<bool, SensorError> {
        match self {
            Some(gps) => gps.has_data(),
            None => Ok(false),
        }
    }

    fn read_line(&mut self) -> Result<Option<Vec<u8>>, SensorError> {
        match self {
            Some(gps) => gps.read_line(),
            None => Ok(None),
        }
    }
}

/// Decodifica UTF-8 descartando bytes inválidos (ruído na UART).
pub fn decode_ignoring_invalid(bytes: &[u8]) -> String {
    bytes.utf8_chunks().map(|chunk| chunk.valid()).collect()
}

/// Lê no máximo uma linha e tenta extrair uma coordenada.
///
/// Erros de leitura são logados e tratados como "sem fix neste tick".
pub fn poll_coordinate<G: GpsSource + ?Sized>(gps: &mut G) -> Option<GeoCoordinate> {
    let line = match gps.has_data() {
        Ok(true) => gps.read_line(),
        Ok(false) => return None,
        Err(e) => Err(e),
    };

    match line {
        Ok(Some(bytes)) => {
            let text = decode_ignoring_invalid(&bytes);
            let text = text.trim();
            debug!("GPS: {text}");
            parse_sentence(text)
        }
        Ok(None) => None,
        Err(e) => {
            warn!("GPS error: {e}");
            None
        }
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────
