//! TLS certificate expiration checks.
//!
//! For each [`Target`] the crate opens a TLS connection, captures the leaf
//! certificate, extracts its metadata and classifies it as OK, expiring soon,
//! expired or not yet valid. Failures are reported per target and never stop
//! the remaining checks.
//!
//! ```no_run
//! use certpoller::{check_certificate, CheckOptions, PeerVerification, Target};
//!
//! let options = CheckOptions::new(PeerVerification::InspectOnly).with_warning_days(14);
//! let outcome = check_certificate(&Target::new("Example", "example.com"), &options);
//! println!("{}: {}", outcome.name, outcome.status());
//! ```

pub mod config;
pub mod error;
pub mod evaluator;
pub mod fetcher;
pub mod outcome;
pub mod report;

pub use error::{CheckError, ErrorKind};
pub use evaluator::{classify, CertificateInfo, Classification, PublicKey, Validity, DEFAULT_WARNING_DAYS};
pub use fetcher::{CertificateFetcher, Endpoint, FetchOptions, PeerVerification};
pub use outcome::{CertificateStatus, CheckOutcome, Summary, Target};

use chrono::Utc;
use std::time::Duration;
use tracing::{info, warn};

/// Options shared by every check of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOptions {
    pub fetch: FetchOptions,
    /// Threshold in days for [`Classification::expires_soon`]
    pub warning_days: i64,
}

impl CheckOptions {
    pub fn new(verification: PeerVerification) -> Self {
        CheckOptions {
            fetch: FetchOptions::new(verification),
            warning_days: DEFAULT_WARNING_DAYS,
        }
    }

    pub fn with_warning_days(mut self, warning_days: i64) -> Self {
        self.warning_days = warning_days;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.fetch = self.fetch.with_timeout(timeout);
        self
    }
}

/// Checks one target. Every failure is captured in the returned outcome.
pub fn check_certificate(target: &Target, options: &CheckOptions) -> CheckOutcome {
    match inspect(target, options) {
        Ok(info) => {
            info!(
                check = %target.name,
                days_until_expiration = info.classification.days_until_expiration,
                expired = info.classification.expired,
                "certificate checked"
            );
            CheckOutcome::certificate(target, info)
        }
        Err(e) => {
            warn!(check = %target.name, url = %target.url, error = %e, "certificate check failed");
            CheckOutcome::failure(target, e.to_string())
        }
    }
}

/// Checks all targets sequentially; outcomes keep the order of `targets`.
pub fn check_all(targets: &[Target], options: &CheckOptions) -> Vec<CheckOutcome> {
    targets
        .iter()
        .map(|target| check_certificate(target, options))
        .collect()
}

fn inspect(target: &Target, options: &CheckOptions) -> Result<CertificateInfo, CheckError> {
    let fetcher = CertificateFetcher::new(options.fetch.clone());
    let certificate = fetcher.fetch(&target.url)?;
    CertificateInfo::from_x509(&certificate, Utc::now(), options.warning_days)
}
