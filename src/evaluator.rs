//! Certificate parsing and expiration classification.
//!
//! [`CertificateInfo::from_x509`] turns a peer certificate into a flat record.
//! The time based part lives in [`classify`], a pure function of the validity
//! window, the reference instant and the warning threshold.

use crate::error::CheckError;
use chrono::{DateTime, Utc};
use openssl::asn1::{Asn1Time, Asn1TimeRef};
use openssl::bn::{BigNum, BigNumContext};
use openssl::nid::Nid;
use openssl::pkey::{Id, PKeyRef, Public};
use openssl::x509::{X509NameRef, X509Ref, X509};
use serde::{Deserialize, Serialize};

/// Warning threshold used when the caller does not override it.
pub const DEFAULT_WARNING_DAYS: i64 = 30;

const SECONDS_PER_DAY: i64 = 86_400;

/// The `notBefore`/`notAfter` window of a certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validity {
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
}

/// Time based classification of a certificate.
///
/// A certificate whose `not_before` lies in the future is neither `expired`
/// nor `valid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    /// Whole days until `not_after`, negative once expired.
    pub days_until_expiration: i64,
    pub expired: bool,
    pub expires_soon: bool,
    pub valid: bool,
}

/// Classifies a validity window against `now`.
///
/// `days_until_expiration` is `(not_after - now) / 86400s` rounded half away
/// from zero, computed on whole seconds. A certificate expiring in exactly
/// `threshold_days` days is expiring soon.
pub fn classify(validity: &Validity, now: DateTime<Utc>, threshold_days: i64) -> Classification {
    let expired = validity.not_after < now;
    let days_until_expiration = days_until(validity.not_after, now);

    Classification {
        days_until_expiration,
        expired,
        expires_soon: !expired && days_until_expiration <= threshold_days,
        valid: !expired && validity.not_before <= now,
    }
}

/// Days from `now` until `instant`, rounded half away from zero.
pub fn days_until(instant: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    round_days(instant.signed_duration_since(now).num_seconds())
}

fn round_days(seconds: i64) -> i64 {
    let days = seconds / SECONDS_PER_DAY;
    let remainder = seconds % SECONDS_PER_DAY;
    if remainder.abs() * 2 >= SECONDS_PER_DAY {
        days + remainder.signum()
    } else {
        days
    }
}

/// Public key of a certificate, reduced to what the report needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublicKey {
    /// RSA key with its modulus length
    Rsa { bits: u32 },
    /// Elliptic curve key with the bit length of its group order
    Ec { bits: u32 },
    /// DSA key, size not reported
    Dsa,
    /// Any other key type (Ed25519, Ed448, ...)
    Unsupported,
}

impl PublicKey {
    /// Dispatches on the key type of `key`.
    pub fn from_pkey(key: &PKeyRef<Public>) -> Result<Self, CheckError> {
        let key = match key.id() {
            Id::RSA => {
                let rsa = key.rsa().map_err(CheckError::invalid_certificate)?;
                PublicKey::Rsa {
                    bits: bit_length(rsa.n().num_bits())?,
                }
            }
            Id::EC => {
                let ec_key = key.ec_key().map_err(CheckError::invalid_certificate)?;
                let mut order = BigNum::new()?;
                let mut ctx = BigNumContext::new()?;
                ec_key
                    .group()
                    .order(&mut order, &mut ctx)
                    .map_err(CheckError::invalid_certificate)?;
                PublicKey::Ec {
                    bits: bit_length(order.num_bits())?,
                }
            }
            Id::DSA => PublicKey::Dsa,
            _ => PublicKey::Unsupported,
        };
        Ok(key)
    }

    pub fn algorithm(&self) -> &'static str {
        match self {
            PublicKey::Rsa { .. } => "RSA",
            PublicKey::Ec { .. } => "EC",
            PublicKey::Dsa => "DSA",
            PublicKey::Unsupported => "unknown",
        }
    }

    /// Key size in bits, `None` when the key type is not sized.
    pub fn key_size_bits(&self) -> Option<u32> {
        match self {
            PublicKey::Rsa { bits } | PublicKey::Ec { bits } => Some(*bits),
            PublicKey::Dsa | PublicKey::Unsupported => None,
        }
    }
}

fn bit_length(bits: i32) -> Result<u32, CheckError> {
    u32::try_from(bits)
        .map_err(|_| CheckError::invalid_certificate(format!("invalid key size: {}", bits)))
}

/// Metadata and expiration status of a single certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateInfo {
    /// Subject distinguished name, RFC 2253 form
    pub subject: String,
    /// Issuer distinguished name, RFC 2253 form
    pub issuer: String,
    /// Serial number in decimal
    pub serial_number: String,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
    /// X.509 version number (3 for a v3 certificate)
    pub version: u32,
    pub signature_algorithm: String,
    /// `RSA`, `EC`, `DSA` or `unknown`
    pub public_key_algorithm: String,
    pub key_size_bits: Option<u32>,
    #[serde(flatten)]
    pub classification: Classification,
}

impl CertificateInfo {
    /// Extracts the certificate fields and classifies them against `now`.
    ///
    /// # Errors
    ///
    /// Returns [`CheckError::InvalidCertificate`] when a field cannot be
    /// decoded.
    pub fn from_x509(
        cert: &X509Ref,
        now: DateTime<Utc>,
        threshold_days: i64,
    ) -> Result<CertificateInfo, CheckError> {
        let validity = Validity {
            not_before: asn1_to_utc(cert.not_before())?,
            not_after: asn1_to_utc(cert.not_after())?,
        };

        let public_key = cert
            .public_key()
            .map_err(CheckError::invalid_certificate)?;
        let key = PublicKey::from_pkey(&public_key)?;

        let serial_number = cert
            .serial_number()
            .to_bn()
            .and_then(|bn| bn.to_dec_str().map(|s| s.to_string()))
            .map_err(CheckError::invalid_certificate)?;

        let version = u32::try_from(cert.version())
            .map(|v| v + 1)
            .map_err(|_| {
                CheckError::invalid_certificate(format!("invalid version: {}", cert.version()))
            })?;

        Ok(CertificateInfo {
            subject: distinguished_name(cert.subject_name()),
            issuer: distinguished_name(cert.issuer_name()),
            serial_number,
            not_before: validity.not_before,
            not_after: validity.not_after,
            version,
            signature_algorithm: cert.signature_algorithm().object().to_string(),
            public_key_algorithm: key.algorithm().to_string(),
            key_size_bits: key.key_size_bits(),
            classification: classify(&validity, now, threshold_days),
        })
    }

    /// Same as [`CertificateInfo::from_x509`] for a DER encoded certificate.
    pub fn from_der(
        der: &[u8],
        now: DateTime<Utc>,
        threshold_days: i64,
    ) -> Result<CertificateInfo, CheckError> {
        let cert = X509::from_der(der).map_err(CheckError::invalid_certificate)?;
        Self::from_x509(&cert, now, threshold_days)
    }

    pub fn validity(&self) -> Validity {
        Validity {
            not_before: self.not_before,
            not_after: self.not_after,
        }
    }

    /// Recomputes the classification for another instant or threshold.
    pub fn reclassify(&self, now: DateTime<Utc>, threshold_days: i64) -> Classification {
        classify(&self.validity(), now, threshold_days)
    }
}

fn asn1_to_utc(time: &Asn1TimeRef) -> Result<DateTime<Utc>, CheckError> {
    let epoch = Asn1Time::from_unix(0)?;
    let diff = epoch.diff(time).map_err(CheckError::invalid_certificate)?;
    let seconds = i64::from(diff.days) * SECONDS_PER_DAY + i64::from(diff.secs);
    DateTime::from_timestamp(seconds, 0)
        .ok_or_else(|| CheckError::invalid_certificate(format!("time out of range: {}", time)))
}

/// Renders a name in RFC 2253 order: most specific RDN first.
fn distinguished_name(name: &X509NameRef) -> String {
    let mut parts: Vec<String> = name
        .entries()
        .map(|entry| {
            let nid = entry.object().nid();
            let key = match nid.short_name() {
                Ok(short) if nid != Nid::UNDEF => short.to_string(),
                _ => entry.object().to_string(),
            };
            let value = entry
                .data()
                .to_string()
                .unwrap_or_else(|_| String::from_utf8_lossy(entry.data().as_slice()).into_owned());
            format!("{}={}", key, escape_dn_value(&value))
        })
        .collect();
    parts.reverse();
    parts.join(",")
}

fn escape_dn_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    let last = value.chars().count().saturating_sub(1);
    for (i, c) in value.chars().enumerate() {
        let special = matches!(c, ',' | '+' | '"' | '\\' | '<' | '>' | ';')
            || (i == 0 && (c == '#' || c == ' '))
            || (i == last && c == ' ');
        if special {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
