//! TLS certificate acquisition.
//!
//! A [`CertificateFetcher`] resolves a target URL into an [`Endpoint`], opens
//! one TCP connection, runs a TLS client handshake and returns the leaf
//! certificate the server presented. The connection is shut down before the
//! certificate is handed back.
//!
//! # Security
//!
//! With [`PeerVerification::InspectOnly`] the handshake accepts *any*
//! certificate: chain and hostname verification are switched off so that
//! expired, self-signed or otherwise untrusted certificates can be observed.
//! A connection made in that mode must never be used to exchange data that
//! relies on the peer's identity.

use crate::error::CheckError;
use openssl::ssl::{HandshakeError, Ssl, SslContext, SslMethod, SslVerifyMode};
use openssl::x509::{X509VerifyResult, X509};
use std::fmt;
use std::io;
use std::net::{IpAddr, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;
use tracing::debug;
use url::{Host, Url};

pub const DEFAULT_SCHEME: &str = "https";
pub const DEFAULT_PORT: u16 = 443;
/// Connect, read and write timeout applied to every connection.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// A normalized `scheme://host:port` target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub scheme: String,
    /// Domain name or IP literal, IPv6 without brackets
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    /// Normalizes a target URL.
    ///
    /// A missing scheme defaults to `https`, a missing port to the scheme's
    /// known default or `443`.
    ///
    /// # Errors
    ///
    /// [`CheckError::InvalidUrl`] when the input is empty, cannot be parsed or
    /// has no host.
    pub fn parse(input: &str) -> Result<Endpoint, CheckError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(invalid_url(input, "URL is empty"));
        }

        let candidate = if trimmed.contains("://") {
            trimmed.to_string()
        } else {
            format!("{}://{}", DEFAULT_SCHEME, trimmed)
        };
        let url = Url::parse(&candidate).map_err(|e| invalid_url(input, e))?;

        let host = match url.host() {
            Some(Host::Domain(domain)) if !domain.is_empty() => domain.to_string(),
            Some(Host::Ipv4(addr)) => addr.to_string(),
            Some(Host::Ipv6(addr)) => addr.to_string(),
            _ => return Err(invalid_url(input, "URL has no host")),
        };

        Ok(Endpoint {
            scheme: url.scheme().to_string(),
            host,
            port: url.port_or_known_default().unwrap_or(DEFAULT_PORT),
        })
    }

    /// `host:port`, with brackets around IPv6 literals.
    pub fn address(&self) -> String {
        match self.ip() {
            Some(IpAddr::V6(_)) => format!("[{}]:{}", self.host, self.port),
            _ => format!("{}:{}", self.host, self.port),
        }
    }

    fn ip(&self) -> Option<IpAddr> {
        self.host.parse().ok()
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.address())
    }
}

fn invalid_url(url: &str, reason: impl ToString) -> CheckError {
    CheckError::InvalidUrl {
        url: url.to_string(),
        reason: reason.to_string(),
    }
}

/// How the TLS client treats the certificate the server presents.
///
/// There is deliberately no default: every caller states which mode it wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerVerification {
    /// Inspect-only mode. Chain and hostname verification are disabled so
    /// that any certificate, trusted or not, can be fetched and reported.
    InspectOnly,
    /// Regular client behaviour: the chain must verify against the system
    /// trust store and the certificate must match the host.
    Strict,
}

/// Options for a single fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOptions {
    pub verification: PeerVerification,
    pub timeout: Duration,
}

impl FetchOptions {
    pub fn new(verification: PeerVerification) -> Self {
        FetchOptions {
            verification,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Fetches leaf certificates over TLS. Keeps no state between calls.
#[derive(Debug, Clone)]
pub struct CertificateFetcher {
    options: FetchOptions,
}

impl CertificateFetcher {
    pub fn new(options: FetchOptions) -> Self {
        CertificateFetcher { options }
    }

    pub fn options(&self) -> &FetchOptions {
        &self.options
    }

    /// Normalizes `url` and fetches the certificate of that endpoint.
    pub fn fetch(&self, url: &str) -> Result<X509, CheckError> {
        let endpoint = Endpoint::parse(url)?;
        self.fetch_endpoint(&endpoint)
    }

    /// Connects to `endpoint`, completes the handshake and returns the peer
    /// certificate. A single attempt is made.
    pub fn fetch_endpoint(&self, endpoint: &Endpoint) -> Result<X509, CheckError> {
        let address = endpoint.address();
        let context = build_context(self.options.verification)?;

        let mut ssl = Ssl::new(&context)?;
        if endpoint.ip().is_none() {
            ssl.set_hostname(&endpoint.host)?;
        }
        if self.options.verification == PeerVerification::Strict {
            match endpoint.ip() {
                Some(ip) => ssl.param_mut().set_ip(ip)?,
                None => ssl.param_mut().set_host(&endpoint.host)?,
            }
        }

        let tcp_stream = connect(endpoint, self.options.timeout)?;
        debug!(%address, "starting TLS handshake");
        let mut stream = ssl
            .connect(tcp_stream)
            .map_err(|e| handshake_error(&address, e))?;

        let certificate = stream.ssl().peer_certificate();
        if let Err(e) = stream.shutdown() {
            debug!(%address, error = %e, "TLS shutdown was not clean");
        }
        drop(stream);

        certificate.ok_or(CheckError::NoPeerCertificate { address })
    }
}

fn build_context(verification: PeerVerification) -> Result<SslContext, CheckError> {
    let mut builder = SslContext::builder(SslMethod::tls_client())?;
    match verification {
        PeerVerification::InspectOnly => builder.set_verify(SslVerifyMode::NONE),
        PeerVerification::Strict => {
            builder.set_default_verify_paths()?;
            builder.set_verify(SslVerifyMode::PEER);
        }
    }
    Ok(builder.build())
}

fn connect(endpoint: &Endpoint, timeout: Duration) -> Result<TcpStream, CheckError> {
    let address = endpoint.address();
    let resolved: Vec<SocketAddr> = (endpoint.host.as_str(), endpoint.port)
        .to_socket_addrs()
        .map_err(|source| CheckError::DnsResolution {
            hostname: endpoint.host.clone(),
            source,
        })?
        .collect();

    if resolved.is_empty() {
        return Err(CheckError::DnsResolution {
            hostname: endpoint.host.clone(),
            source: io::Error::new(io::ErrorKind::NotFound, "no addresses found"),
        });
    }

    let mut last_error = None;
    for socket_addr in resolved {
        debug!(%address, %socket_addr, "connecting");
        match TcpStream::connect_timeout(&socket_addr, timeout) {
            Ok(tcp_stream) => {
                let configured = tcp_stream
                    .set_read_timeout(Some(timeout))
                    .and_then(|_| tcp_stream.set_write_timeout(Some(timeout)));
                return match configured {
                    Ok(()) => Ok(tcp_stream),
                    Err(source) => Err(CheckError::ConnectionFailed { address, source }),
                };
            }
            Err(e) => last_error = Some(e),
        }
    }

    match last_error {
        Some(e) if is_timeout(&e) => Err(CheckError::Timeout {
            operation: format!("connect to {}", address),
        }),
        Some(source) => Err(CheckError::ConnectionFailed { address, source }),
        None => Err(CheckError::ConnectionFailed {
            address,
            source: io::Error::from(io::ErrorKind::AddrNotAvailable),
        }),
    }
}

fn handshake_error(address: &str, error: HandshakeError<TcpStream>) -> CheckError {
    match error {
        HandshakeError::SetupFailure(stack) => CheckError::Tls(stack),
        HandshakeError::Failure(mid) | HandshakeError::WouldBlock(mid) => {
            if mid.error().io_error().map_or(false, is_timeout) {
                return CheckError::Timeout {
                    operation: format!("TLS handshake with {}", address),
                };
            }
            let verify_result = mid.ssl().verify_result();
            let details = if verify_result == X509VerifyResult::OK {
                format!("{}: {}", address, mid.error())
            } else {
                format!(
                    "{}: {} ({})",
                    address,
                    mid.error(),
                    verify_result.error_string()
                )
            };
            CheckError::HandshakeFailed { details }
        }
    }
}

fn is_timeout(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::net::TcpListener;

    #[test]
    fn test_bare_host_defaults_to_https_443() {
        let endpoint = Endpoint::parse("example.com").unwrap();
        assert_eq!(endpoint.scheme, "https");
        assert_eq!(endpoint.host, "example.com");
        assert_eq!(endpoint.port, 443);
        assert_eq!(endpoint.to_string(), "https://example.com:443");
    }

    #[test]
    fn test_explicit_port_is_preserved() {
        let endpoint = Endpoint::parse("https://example.com:8443").unwrap();
        assert_eq!(endpoint.port, 8443);

        let endpoint = Endpoint::parse("example.com:9443/status").unwrap();
        assert_eq!(endpoint.scheme, "https");
        assert_eq!(endpoint.port, 9443);
    }

    #[test]
    fn test_ip_literals() {
        let endpoint = Endpoint::parse("https://[::1]:8443").unwrap();
        assert_eq!(endpoint.host, "::1");
        assert_eq!(endpoint.address(), "[::1]:8443");

        let endpoint = Endpoint::parse("127.0.0.1").unwrap();
        assert_eq!(endpoint.address(), "127.0.0.1:443");
    }

    #[test]
    fn test_malformed_urls_are_rejected() {
        for input in ["", "   ", "https://", "https://exa mple.com", "ht tp://x"] {
            let err = Endpoint::parse(input).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidUrl, "input: {:?}", input);
        }
    }

    #[test]
    fn test_invalid_url_fails_before_connecting() {
        let fetcher = CertificateFetcher::new(FetchOptions::new(PeerVerification::InspectOnly));
        let err = fetcher.fetch("https://").unwrap_err();
        assert!(matches!(err, CheckError::InvalidUrl { .. }));
    }

    #[test]
    fn test_unresolvable_host() {
        let fetcher = CertificateFetcher::new(
            FetchOptions::new(PeerVerification::InspectOnly).with_timeout(Duration::from_secs(5)),
        );
        let err = fetcher.fetch("https://thisdoesnotexist.invalid").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Connection);
        assert!(!err.to_string().is_empty());
    }

    #[test]
    fn test_connection_refused() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let fetcher = CertificateFetcher::new(
            FetchOptions::new(PeerVerification::InspectOnly).with_timeout(Duration::from_secs(5)),
        );
        let err = fetcher
            .fetch(&format!("https://127.0.0.1:{}", port))
            .unwrap_err();
        assert!(
            matches!(err, CheckError::ConnectionFailed { .. }),
            "unexpected error: {}",
            err
        );
    }

    #[test]
    fn test_fetch_options() {
        let options = FetchOptions::new(PeerVerification::Strict);
        assert_eq!(options.timeout, DEFAULT_TIMEOUT);
        let options = options.with_timeout(Duration::from_secs(3));
        assert_eq!(options.timeout, Duration::from_secs(3));
        assert_eq!(options.verification, PeerVerification::Strict);
    }
}
