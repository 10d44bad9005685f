use std::fmt;
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::debug;
use url::{Host, Url};

use crate::smtp_verify::error::SmtpVerifyError;
use crate::smtp_verify::options::SmtpOptions;

/// Buffered socket to the mail server, possibly through a proxy tunnel.
/// Bytes the proxy sent right after its status head stay in the buffer.
pub(crate) type Transport = BufReader<TcpStream>;

/// One way of reaching the exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Candidate {
    Direct,
    Proxy(String),
}

impl Candidate {
    /// Every proxy, or a single direct connection when none is given.
    pub(crate) fn list(proxies: &[String]) -> Vec<Self> {
        if proxies.is_empty() {
            vec![Self::Direct]
        } else {
            proxies.iter().cloned().map(Self::Proxy).collect()
        }
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct => f.write_str("direct"),
            Self::Proxy(url) => write!(f, "proxy {url}"),
        }
    }
}

pub(crate) async fn open(
    candidate: &Candidate,
    mx: &str,
    options: &SmtpOptions,
) -> Result<Transport, SmtpVerifyError> {
    match candidate {
        Candidate::Direct => connect_direct(mx, options.port, options.connect_timeout()).await,
        Candidate::Proxy(raw) => {
            let endpoint = ProxyEndpoint::parse(raw, mx)?;
            endpoint.tunnel(mx, options.port, options.connect_timeout()).await
        }
    }
}

async fn connect_direct(
    mx: &str,
    port: u16,
    limit: Duration,
) -> Result<Transport, SmtpVerifyError> {
    match tokio::time::timeout(limit, TcpStream::connect((mx, port))).await {
        Ok(Ok(stream)) => Ok(BufReader::new(stream)),
        Ok(Err(err)) => Err(SmtpVerifyError::connect(mx, err)),
        Err(_) => Err(SmtpVerifyError::ProxyConnectTimeout { mx: mx.to_string() }),
    }
}

/// Parsed `http://[user:pass@]host[:port]` proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ProxyEndpoint {
    host: String,
    port: u16,
    authorization: Option<String>,
}

impl ProxyEndpoint {
    pub(crate) fn parse(raw: &str, mx: &str) -> Result<Self, SmtpVerifyError> {
        let invalid = |reason: String| SmtpVerifyError::InvalidProxy {
            mx: mx.to_string(),
            proxy: raw.to_string(),
            reason,
        };

        let url = Url::parse(raw).map_err(|err| invalid(err.to_string()))?;
        if url.scheme() != "http" {
            return Err(SmtpVerifyError::UnsupportedProxyProtocol {
                mx: mx.to_string(),
                scheme: url.scheme().to_string(),
            });
        }

        let host = match url.host() {
            Some(Host::Domain(domain)) => domain.to_string(),
            Some(Host::Ipv4(addr)) => addr.to_string(),
            Some(Host::Ipv6(addr)) => addr.to_string(),
            None => return Err(invalid("missing host".to_string())),
        };
        let port = url.port_or_known_default().unwrap_or(80);

        let authorization = if url.username().is_empty() && url.password().is_none() {
            None
        } else {
            let user = urlencoding::decode(url.username())
                .map_err(|err| invalid(format!("username: {err}")))?;
            let pass = urlencoding::decode(url.password().unwrap_or(""))
                .map_err(|err| invalid(format!("password: {err}")))?;
            Some(format!("Basic {}", STANDARD.encode(format!("{user}:{pass}"))))
        };

        Ok(Self {
            host,
            port,
            authorization,
        })
    }

    /// Opens the proxy socket and asks for a tunnel to `mx:port`. The whole
    /// handshake is bounded by `limit`.
    pub(crate) async fn tunnel(
        &self,
        mx: &str,
        port: u16,
        limit: Duration,
    ) -> Result<Transport, SmtpVerifyError> {
        let handshake = async {
            let stream = TcpStream::connect((self.host.as_str(), self.port))
                .await
                .map_err(|err| SmtpVerifyError::connect(mx, err))?;
            let mut transport = BufReader::new(stream);

            let mut request = format!("CONNECT {mx}:{port} HTTP/1.1\r\nHost: {mx}:{port}\r\n");
            if let Some(auth) = &self.authorization {
                request.push_str(&format!("Proxy-Authorization: {auth}\r\n"));
            }
            request.push_str("\r\n");
            transport
                .write_all(request.as_bytes())
                .await
                .map_err(|err| SmtpVerifyError::io(mx, err))?;
            transport
                .flush()
                .await
                .map_err(|err| SmtpVerifyError::io(mx, err))?;

            read_head(&mut transport, mx).await?;
            Ok::<_, SmtpVerifyError>(transport)
        };

        match tokio::time::timeout(limit, handshake).await {
            Ok(Ok(transport)) => {
                debug!(mx, proxy = %self.host, port = self.port, "tunnel established");
                Ok(transport)
            }
            Ok(Err(err)) => Err(err),
            Err(_) => Err(SmtpVerifyError::ProxyConnectTimeout { mx: mx.to_string() }),
        }
    }
}

/// Reads the proxy status line and drains its headers.
async fn read_head(transport: &mut Transport, mx: &str) -> Result<(), SmtpVerifyError> {
    let mut status = String::new();
    let read = transport
        .read_line(&mut status)
        .await
        .map_err(|err| SmtpVerifyError::io(mx, err))?;
    if read == 0 {
        return Err(SmtpVerifyError::tunnel_refused(mx, "proxy closed the connection"));
    }

    let status = status.trim_end();
    let code = status
        .split_whitespace()
        .nth(1)
        .and_then(|code| code.parse::<u16>().ok());
    match code {
        Some(code) if (200..300).contains(&code) => {}
        _ => return Err(SmtpVerifyError::tunnel_refused(mx, status)),
    }

    loop {
        let mut header = String::new();
        let read = transport
            .read_line(&mut header)
            .await
            .map_err(|err| SmtpVerifyError::io(mx, err))?;
        if read == 0 {
            return Err(SmtpVerifyError::tunnel_refused(mx, "proxy closed the connection"));
        }
        if header.trim_end().is_empty() {
            return Ok(());
        }
    }
}
