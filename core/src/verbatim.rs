//! # Verbatim Requests
//!
//! The URL parser behind the pooled clients resolves dot segments, including
//! encoded ones like `%2e%2e`, before a request leaves. Paths it would rewrite
//! go through this one-shot HTTP/1.1 exchange instead. It writes the request
//! target and the extra header names exactly as configured and closes the
//! connection once the response is read.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Url;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::TlsConnector;
use tokio_rustls::rustls::client::danger::{
    HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier,
};
use tokio_rustls::rustls::crypto::{
    CryptoProvider, ring, verify_tls12_signature, verify_tls13_signature,
};
use tokio_rustls::rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use tokio_rustls::rustls::{self, ClientConfig, DigitallySignedStruct, SignatureScheme};

use vhunt_common::config::ScanConfig;
use vhunt_common::target::{Target, normalize_path};

use crate::error::ProbeError;
use crate::worker::{HttpResponse, USER_AGENT_VALUE};

const READ_CHUNK: usize = 8 * 1024;

/// True when sending `url` through the URL parser would put something other
/// than `path` on the request line.
pub fn is_rewritten(url: &str, path: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return true;
    };
    let mut sent = parsed.path().to_string();
    if let Some(query) = parsed.query() {
        sent.push('?');
        sent.push_str(query);
    }
    sent != path
}

pub struct VerbatimSender {
    tls: Option<TlsConnector>,
    port: u16,
    connect_timeout: Duration,
    read_timeout: Duration,
    request_timeout: Duration,
    headers: Vec<(String, String)>,
}

impl VerbatimSender {
    pub fn new(config: &ScanConfig) -> Result<Self, rustls::Error> {
        let tls = if config.protocol.is_tls() {
            Some(TlsConnector::from(Arc::new(insecure_tls_config()?)))
        } else {
            None
        };

        Ok(Self {
            tls,
            port: config.port(),
            connect_timeout: config.connect_timeout,
            read_timeout: config.read_timeout,
            request_timeout: config.request_timeout,
            headers: config.headers.clone(),
        })
    }

    /// The full request head for `target`.
    ///
    /// Extra headers replace the built-in `Host` and `User-Agent` lines of the
    /// same name. `Connection: close` is always sent.
    pub fn request_head(&self, target: &Target) -> String {
        let given = |name: &str| self.headers.iter().any(|(n, _)| n.eq_ignore_ascii_case(name));

        let mut head = format!("GET {} HTTP/1.1\r\n", normalize_path(&target.path));
        if !given("host") {
            head.push_str(&format!("Host: {}\r\n", target.hostname));
        }
        if !given("user-agent") {
            head.push_str(&format!("User-Agent: {}\r\n", USER_AGENT_VALUE));
        }
        for (name, value) in &self.headers {
            if !name.eq_ignore_ascii_case("connection") {
                head.push_str(&format!("{}: {}\r\n", name, value));
            }
        }
        head.push_str("Connection: close\r\n\r\n");
        head
    }

    pub async fn send(&self, target: &Target) -> Result<HttpResponse, ProbeError> {
        timeout(self.request_timeout, self.exchange(target))
            .await
            .map_err(|_| ProbeError::Timeout)?
    }

    async fn exchange(&self, target: &Target) -> Result<HttpResponse, ProbeError> {
        let head = self.request_head(target);
        let stream = timeout(
            self.connect_timeout,
            TcpStream::connect((target.address.as_str(), self.port)),
        )
        .await
        .map_err(|_| ProbeError::Timeout)?
        .map_err(ProbeError::Transport)?;

        let Some(connector) = &self.tls else {
            return roundtrip(stream, head.as_bytes(), self.read_timeout).await;
        };

        let name = ServerName::try_from(target.address.clone())
            .map_err(|e| ProbeError::Transport(io::Error::new(io::ErrorKind::InvalidInput, e)))?;
        let stream = timeout(self.connect_timeout, connector.connect(name, stream))
            .await
            .map_err(|_| ProbeError::Timeout)?
            .map_err(ProbeError::Transport)?;
        roundtrip(stream, head.as_bytes(), self.read_timeout).await
    }
}

async fn roundtrip<S>(mut stream: S, request: &[u8], read_timeout: Duration) -> Result<HttpResponse, ProbeError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    stream.write_all(request).await.map_err(ProbeError::Transport)?;
    stream.flush().await.map_err(ProbeError::Transport)?;

    let mut buf = Vec::with_capacity(READ_CHUNK);
    let mut chunk = [0u8; READ_CHUNK];
    loop {
        let read = timeout(read_timeout, stream.read(&mut chunk))
            .await
            .map_err(|_| ProbeError::Timeout)?;
        let n = match read {
            Ok(n) => n,
            // TLS peers often close without a close_notify.
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => 0,
            Err(e) => return Err(ProbeError::Transport(e)),
        };
        buf.extend_from_slice(&chunk[..n]);

        if let Some(response) = parse_response(&buf, n == 0)? {
            return Ok(response);
        }
    }
}

/// Parses a buffered response. `Ok(None)` means more bytes are needed; once
/// `eof` is set the result is always decided.
pub fn parse_response(buf: &[u8], eof: bool) -> Result<Option<HttpResponse>, ProbeError> {
    let Some(head_end) = find(buf, b"\r\n\r\n") else {
        return if eof {
            Err(malformed("connection closed before the response head"))
        } else {
            Ok(None)
        };
    };

    let head = String::from_utf8_lossy(&buf[..head_end]);
    let mut lines = head.split("\r\n");
    let status = parse_status_line(lines.next().unwrap_or_default())?;
    let body = &buf[head_end + 4..];

    match status {
        // Interim response, the real one follows.
        100 | 102..=199 => return parse_response(body, eof),
        101 | 204 | 304 => {
            return Ok(Some(HttpResponse {
                status,
                body: Vec::new(),
            }));
        }
        _ => {}
    }

    let mut content_length = None;
    let mut chunked = false;
    for (name, value) in lines.filter_map(|line| line.split_once(':')) {
        let (name, value) = (name.trim(), value.trim());
        if name.eq_ignore_ascii_case("content-length") {
            content_length = value.parse::<usize>().ok();
        } else if name.eq_ignore_ascii_case("transfer-encoding") {
            chunked = value.to_ascii_lowercase().contains("chunked");
        }
    }

    let body = if chunked {
        match decode_chunked(body)? {
            Some(body) => body,
            None if eof => return Err(malformed("connection closed inside a chunked body")),
            None => return Ok(None),
        }
    } else if let Some(len) = content_length {
        if body.len() >= len {
            body[..len].to_vec()
        } else if eof {
            return Err(malformed("connection closed before the full body"));
        } else {
            return Ok(None);
        }
    } else if eof {
        body.to_vec()
    } else {
        return Ok(None);
    };

    Ok(Some(HttpResponse { status, body }))
}

fn parse_status_line(line: &str) -> Result<u16, ProbeError> {
    let mut parts = line.split_whitespace();
    let version = parts.next().unwrap_or_default();
    if !version.starts_with("HTTP/") {
        return Err(malformed(format!("bad status line '{line}'")));
    }
    parts
        .next()
        .and_then(|code| code.parse::<u16>().ok())
        .ok_or_else(|| malformed(format!("bad status line '{line}'")))
}

fn decode_chunked(data: &[u8]) -> Result<Option<Vec<u8>>, ProbeError> {
    let mut body = Vec::new();
    let mut pos = 0;
    loop {
        let Some(line_end) = find(&data[pos..], b"\r\n") else {
            return Ok(None);
        };
        let line = String::from_utf8_lossy(&data[pos..pos + line_end]);
        let size_field = line.split(';').next().unwrap_or_default().trim();
        let size = usize::from_str_radix(size_field, 16)
            .map_err(|_| malformed(format!("bad chunk size '{size_field}'")))?;
        pos += line_end + 2;

        if size == 0 {
            return Ok(Some(body));
        }
        if data.len() < pos + size + 2 {
            return Ok(None);
        }
        body.extend_from_slice(&data[pos..pos + size]);
        pos += size + 2;
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}

fn malformed(reason: impl Into<String>) -> ProbeError {
    ProbeError::Malformed(reason.into())
}

fn insecure_tls_config() -> Result<ClientConfig, rustls::Error> {
    let provider = Arc::new(ring::default_provider());
    Ok(ClientConfig::builder_with_provider(Arc::clone(&provider))
        .with_safe_default_protocol_versions()?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(AcceptAnyCert(provider)))
        .with_no_client_auth())
}

/// Accepts every certificate while still checking handshake signatures.
#[derive(Debug)]
struct AcceptAnyCert(Arc<CryptoProvider>);

impl ServerCertVerifier for AcceptAnyCert {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(message, cert, dss, &self.0.signature_verification_algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(message, cert, dss, &self.0.signature_verification_algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.0.signature_verification_algorithms.supported_schemes()
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
