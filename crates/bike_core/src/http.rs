//! Transporte HTTP/1.1 mínimo sobre `TcpStream`.
//!
//! Uma requisição por conexão (`Connection: close`); o socket é liberado
//! ao sair de [`TcpHttpClient::post_json`] em qualquer caminho. A resposta
//! termina no fim do corpo (`Content-Length` ou `chunked`), não no EOF:
//! o servidor pode manter o socket aberto depois de responder.

use std::io::{BufRead, BufReader, ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;
use tracing::debug;

/// Limite de tamanho da resposta aceita (cabeçalhos + corpo).
const MAX_RESPONSE_BYTES: u64 = 64 * 1024;

/// Falhas de transporte.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Endereço inválido {0}: {1}")]
    Resolve(String, String),

    #[error("Conexão resetada pelo servidor")]
    ConnectionReset,

    #[error("Timeout de rede")]
    Timeout,

    #[error("Erro de E/S: {0}")]
    Io(#[from] std::io::Error),

    #[error("Resposta HTTP malformada: {0}")]
    Malformed(String),
}

impl TransportError {
    fn from_io(e: std::io::Error) -> Self {
        match e.kind() {
            ErrorKind::ConnectionReset => TransportError::ConnectionReset,
            ErrorKind::TimedOut | ErrorKind::WouldBlock => TransportError::Timeout,
            ErrorKind::UnexpectedEof => TransportError::Malformed("resposta truncada".into()),
            _ => TransportError::Io(e),
        }
    }
}

/// Resposta HTTP já separada em status e corpo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Capacidade mínima exigida pelo cliente de uplink.
pub trait HttpTransport {
    /// Envia `body` como `application/json` ao endpoint fixo.
    fn post_json(&mut self, body: &[u8]) -> Result<HttpResponse, TransportError>;
}

/// Cliente HTTP bloqueante com timeouts de conexão, leitura e escrita.
#[derive(Debug, Clone)]
pub struct TcpHttpClient {
    host: String,
    port: u16,
    path: String,
    timeout: Duration,
}

impl TcpHttpClient {
    pub fn new(host: impl Into<String>, port: u16, path: impl Into<String>, timeout: Duration) -> Self {
        Self {
            host: host.into(),
            port,
            path: path.into(),
            timeout,
        }
    }

    fn resolve(&self) -> Result<SocketAddr, TransportError> {
        let target = format!("{}:{}", self.host, self.port);
        target
            .to_socket_addrs()
            .map_err(|e| TransportError::Resolve(target.clone(), e.to_string()))?
            .next()
            .ok_or_else(|| TransportError::Resolve(target, "nenhum endereço".into()))
    }
}

impl HttpTransport for TcpHttpClient {
    fn post_json(&mut self, body: &[u8]) -> Result<HttpResponse, TransportError> {
        let addr = self.resolve()?;
        let mut stream =
            TcpStream::connect_timeout(&addr, self.timeout).map_err(TransportError::from_io)?;
        stream
            .set_read_timeout(Some(self.timeout))
            .map_err(TransportError::from_io)?;
        stream
            .set_write_timeout(Some(self.timeout))
            .map_err(TransportError::from_io)?;

        let request = build_request(&self.host, self.port, &self.path, body);
        stream.write_all(&request).map_err(TransportError::from_io)?;
        stream.flush().map_err(TransportError::from_io)?;

        let mut reader = BufReader::new(stream.take(MAX_RESPONSE_BYTES));
        let response = read_response(&mut reader)?;
        debug!("HTTP ← {} ({} bytes de corpo) de {addr}", response.status, response.body.len());
        Ok(response)
    }
}

/// Monta a requisição POST completa (cabeçalhos + corpo).
pub fn build_request(host: &str, port: u16, path: &str, body: &[u8]) -> Vec<u8> {
    let head = format!(
        "POST {path} HTTP/1.1\r\n\
         Host: {host}:{port}\r\n\
         Content-Type: application/json\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\
         \r\n",
        body.len()
    );
    let mut request = Vec::with_capacity(head.len() + body.len());
    request.extend_from_slice(head.as_bytes());
    request.extend_from_slice(body);
    request
}

/// Separa status e corpo de uma resposta HTTP/1.x já em memória.
pub fn parse_response(raw: &[u8]) -> Result<HttpResponse, TransportError> {
    let mut reader = raw;
    read_response(&mut reader)
}

/// Como o corpo da resposta é delimitado.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyFraming {
    Length(usize),
    Chunked,
    UntilEof,
}

/// Lê status, cabeçalhos e exatamente o corpo anunciado.
pub fn read_response<R: BufRead>(reader: &mut R) -> Result<HttpResponse, TransportError> {
    let status_line = read_line(reader)?
        .ok_or_else(|| TransportError::Malformed("resposta vazia".into()))?;
    let mut parts = status_line.split_whitespace();
    let version = parts.next().unwrap_or_default();
    if !version.starts_with("HTTP/1.") {
        return Err(TransportError::Malformed(format!(
            "linha de status inválida: {status_line:?}"
        )));
    }
    let status: u16 = parts
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| TransportError::Malformed(format!("status inválido: {status_line:?}")))?;

    let mut framing = BodyFraming::UntilEof;
    loop {
        let line = read_line(reader)?
            .ok_or_else(|| TransportError::Malformed("cabeçalho incompleto".into()))?;
        if line.is_empty() {
            break;
        }
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let (name, value) = (name.trim(), value.trim());
        if name.eq_ignore_ascii_case("transfer-encoding")
            && value.to_ascii_lowercase().contains("chunked")
        {
            framing = BodyFraming::Chunked;
        } else if name.eq_ignore_ascii_case("content-length") && framing != BodyFraming::Chunked {
            let len = value.parse().map_err(|_| {
                TransportError::Malformed(format!("Content-Length inválido: {value:?}"))
            })?;
            framing = BodyFraming::Length(len);
        }
    }

    let body = match framing {
        BodyFraming::Length(len) => read_exact_body(reader, len)?,
        BodyFraming::Chunked => read_chunked_body(reader)?,
        BodyFraming::UntilEof => {
            let mut body = Vec::new();
            reader
                .read_to_end(&mut body)
                .map_err(TransportError::from_io)?;
            body
        }
    };

    Ok(HttpResponse { status, body })
}

/// Uma linha sem o terminador (`\r\n` ou `\n`). `None` no EOF.
fn read_line<R: BufRead>(reader: &mut R) -> Result<Option<String>, TransportError> {
    let mut raw = Vec::new();
    let n = reader
        .read_until(b'\n', &mut raw)
        .map_err(TransportError::from_io)?;
    if n == 0 {
        return Ok(None);
    }
    if !raw.ends_with(b"\n") {
        return Err(TransportError::Malformed("linha sem terminador".into()));
    }
    let line = String::from_utf8(raw)
        .map_err(|_| TransportError::Malformed("cabeçalho não é UTF-8".into()))?;
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

fn read_exact_body<R: Read>(reader: &mut R, len: usize) -> Result<Vec<u8>, TransportError> {
    if len as u64 > MAX_RESPONSE_BYTES {
        return Err(TransportError::Malformed(format!("corpo grande demais ({len} bytes)")));
    }
    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).map_err(|e| match e.kind() {
        ErrorKind::UnexpectedEof => {
            TransportError::Malformed(format!("corpo truncado (esperado {len} bytes)"))
        }
        _ => TransportError::from_io(e),
    })?;
    Ok(body)
}

/// `Transfer-Encoding: chunked`: `<hex>[;ext]\r\n<dados>\r\n ... 0\r\n<trailers>\r\n`.
fn read_chunked_body<R: BufRead>(reader: &mut R) -> Result<Vec<u8>, TransportError> {
    let mut body = Vec::new();
    loop {
        let size_line = read_line(reader)?
            .ok_or_else(|| TransportError::Malformed("chunk truncado".into()))?;
        let size_hex = size_line.split(';').next().unwrap_or_default().trim();
        let size = usize::from_str_radix(size_hex, 16).map_err(|_| {
            TransportError::Malformed(format!("tamanho de chunk inválido: {size_line:?}"))
        })?;

        if size == 0 {
            // Trailers até a linha vazia
            while let Some(line) = read_line(reader)? {
                if line.is_empty() {
                    break;
                }
            }
            return Ok(body);
        }

        if (body.len() + size) as u64 > MAX_RESPONSE_BYTES {
            return Err(TransportError::Malformed("corpo chunked grande demais".into()));
        }
        body.extend_from_slice(&read_exact_body(reader, size)?);
        match read_line(reader)? {
            Some(line) if line.is_empty() => {}
            _ => return Err(TransportError::Malformed("chunk sem CRLF final".into())),
        }
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────
