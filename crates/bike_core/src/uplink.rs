//! Cliente de uplink de telemetria.
//!
//! Decide quando enviar ([`SendPolicy`]), monta o payload, faz um único POST
//! (sem retry) e aplica a resposta do servidor ao [`ArmingState`]. Qualquer
//! falha deixa modo e threshold como estavam; a próxima janela de envio é o
//! retry natural.

use crate::http::{HttpTransport, TransportError};
use crate::protocol::{ProtocolError, UplinkPayload, decode_reply, encode_payload};
use crate::types::{AccelerationSample, AlarmThreshold, ArmingState, DeviceMode, GeoCoordinate};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Status HTTP aceito como sucesso.
const HTTP_OK: u16 = 200;

/// Erros do uplink. Todos são tratados e não fatais.
#[derive(Debug, thiserror::Error)]
pub enum UplinkError {
    #[error("Erro do servidor: HTTP {0}")]
    Status(u16),

    #[error("Resposta inválida: {0}")]
    Reply(ProtocolError),

    #[error("Erro ao montar payload: {0}")]
    Encode(ProtocolError),

    #[error("Erro de rede: {0}")]
    Transport(#[from] TransportError),
}

impl UplinkError {
    /// Reset de conexão é esperado com este servidor e não vai para o log.
    pub fn is_connection_reset(&self) -> bool {
        matches!(self, UplinkError::Transport(TransportError::ConnectionReset))
    }
}

/// Efeito de um envio bem-sucedido sobre o estado local.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UplinkOutcome {
    /// `(anterior, novo)` quando o modo mudou.
    pub mode_changed: Option<(DeviceMode, DeviceMode)>,
    pub threshold_changed: bool,
}

/// Motivo de um envio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendReason {
    /// Houve fix neste tick.
    WithFix,
    /// Sem fix, mas o intervalo desde o último envio estourou.
    Heartbeat,
}

/// Cadência de envio: com fix sempre; sem fix só após `interval`.
#[derive(Debug, Clone)]
pub struct SendPolicy {
    interval: Duration,
    last_sent: Option<Instant>,
}

impl SendPolicy {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_sent: None,
        }
    }

    pub fn last_sent(&self) -> Option<Instant> {
        self.last_sent
    }

    /// Nada enviado ainda conta como intervalo estourado.
    pub fn decide(&self, now: Instant, has_fix: bool) -> Option<SendReason> {
        if has_fix {
            return Some(SendReason::WithFix);
        }
        match self.last_sent {
            None => Some(SendReason::Heartbeat),
            Some(last) if now.saturating_duration_since(last) > self.interval => {
                Some(SendReason::Heartbeat)
            }
            Some(_) => None,
        }
    }

    /// Registra a tentativa, com ou sem sucesso.
    pub fn mark_sent(&mut self, now: Instant) {
        self.last_sent = Some(now);
    }
}

/// Cliente que fala com o servidor via um [`HttpTransport`].
pub struct UplinkClient<T> {
    transport: T,
}

impl<T: HttpTransport> UplinkClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Envia uma amostra e, em HTTP 200, aplica modo/threshold da resposta.
    pub fn send(
        &mut self,
        coordinate: Option<GeoCoordinate>,
        sample: AccelerationSample,
        state: &mut ArmingState,
    ) -> Result<UplinkOutcome, UplinkError> {
        let payload = UplinkPayload::new(coordinate, sample);
        let body = encode_payload(&payload).map_err(UplinkError::Encode)?;

        let response = self.transport.post_json(&body)?;
        debug!("Uplink → {} bytes, HTTP {}", body.len(), response.status);
        if response.status != HTTP_OK {
            return Err(UplinkError::Status(response.status));
        }

        let reply = decode_reply(&response.body).map_err(UplinkError::Reply)?;
        Ok(apply_reply(state, reply.mode, reply.threshold))
    }
}

/// Substitui o par modo/threshold. Threshold inválido mantém o anterior.
fn apply_reply(state: &mut ArmingState, mode: DeviceMode, threshold: f64) -> UplinkOutcome {
    let previous = *state;

    let threshold = match AlarmThreshold::new(threshold) {
        Some(t) => t,
        None => {
            warn!("Threshold inválido recebido ({threshold}), mantendo {}", previous.threshold);
            previous.threshold
        }
    };
    *state = ArmingState { mode, threshold };

    let mode_changed = (previous.mode != mode).then_some((previous.mode, mode));
    if let Some((old, new)) = mode_changed {
        info!("📡 Modo alterado: {old} → {new}");
    }
    let threshold_changed = previous.threshold != threshold;
    if threshold_changed {
        info!("Threshold alterado: {} → {}", previous.threshold, threshold);
    }

    UplinkOutcome {
        mode_changed,
        threshold_changed,
    }
}

/// Loga uma falha de uplink conforme a taxonomia de erros.
pub fn log_failure(err: &UplinkError) {
    match err {
        e if e.is_connection_reset() => debug!("Conexão resetada pelo servidor (esperado)"),
        UplinkError::Transport(e) => warn!("✗ Erro de rede: {e}"),
        UplinkError::Status(code) => warn!("✗ Erro do servidor: HTTP {code}"),
        UplinkError::Reply(e) => warn!("Erro ao interpretar resposta: {e}"),
        UplinkError::Encode(e) => warn!("✗ Erro ao enviar dados: {e}"),
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────
