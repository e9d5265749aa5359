//! Error types for certificate checks.
//!
//! Every per-target failure ends up as a [`CheckError`]. The orchestration
//! layer turns it into the error string of a
//! [`CheckOutcome`](crate::outcome::CheckOutcome), so a single failing host
//! never aborts the rest of the run.

use std::io;
use thiserror::Error;

/// Broad category of a [`CheckError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The target URL could not be normalized into an endpoint.
    InvalidUrl,
    /// DNS, TCP or TLS level failure while fetching the certificate.
    Connection,
    /// A certificate was presented but could not be decoded.
    InvalidCertificate,
}

/// Error type for a single certificate check.
#[derive(Debug, Error)]
pub enum CheckError {
    /// The target URL is malformed or has no host
    #[error("Invalid URL: {url} - {reason}")]
    InvalidUrl {
        /// The URL as supplied by the caller
        url: String,
        /// Why it was rejected
        reason: String,
    },

    /// DNS resolution failed for the given hostname
    #[error("Failed to resolve hostname: {hostname}: {source}")]
    DnsResolution {
        /// The hostname that failed to resolve
        hostname: String,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// TCP connection failed to the target address
    #[error("Connection failed to {address}: {source}")]
    ConnectionFailed {
        /// The address (host:port) that connection failed to
        address: String,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Network operation timeout
    #[error("Operation timed out: {operation}")]
    Timeout {
        /// Description of which operation timed out
        operation: String,
    },

    /// TLS handshake failed
    #[error("TLS handshake failed: {details}")]
    HandshakeFailed {
        /// Details about why the handshake failed
        details: String,
    },

    /// The handshake completed but the server sent no certificate
    #[error("No peer certificate presented by {address}")]
    NoPeerCertificate {
        /// The address (host:port) that was contacted
        address: String,
    },

    /// OpenSSL could not set up the client
    #[error("TLS setup error: {0}")]
    Tls(#[from] openssl::error::ErrorStack),

    /// Certificate present but undecodable
    #[error("Invalid certificate: {reason}")]
    InvalidCertificate {
        /// Description of what went wrong
        reason: String,
    },
}

impl CheckError {
    pub(crate) fn invalid_certificate(reason: impl ToString) -> Self {
        Self::InvalidCertificate {
            reason: reason.to_string(),
        }
    }

    /// Returns the category this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidUrl { .. } => ErrorKind::InvalidUrl,
            Self::InvalidCertificate { .. } => ErrorKind::InvalidCertificate,
            Self::DnsResolution { .. }
            | Self::ConnectionFailed { .. }
            | Self::Timeout { .. }
            | Self::HandshakeFailed { .. }
            | Self::NoPeerCertificate { .. }
            | Self::Tls(_) => ErrorKind::Connection,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CheckError::InvalidUrl {
            url: "https://".to_string(),
            reason: "empty host".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid URL: https:// - empty host");
    }

    #[test]
    fn test_error_kind() {
        let err = CheckError::Timeout {
            operation: "connect to example.com:443".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::Connection);

        let err = CheckError::invalid_certificate("truncated DER");
        assert_eq!(err.kind(), ErrorKind::InvalidCertificate);
        assert_eq!(err.to_string(), "Invalid certificate: truncated DER");
    }

    #[test]
    fn test_io_source_is_exposed() {
        use std::error::Error as _;

        let err = CheckError::ConnectionFailed {
            address: "127.0.0.1:1".to_string(),
            source: io::Error::from(io::ErrorKind::ConnectionRefused),
        };
        assert!(err.source().is_some());
        assert!(err.to_string().starts_with("Connection failed to 127.0.0.1:1"));
    }
}
