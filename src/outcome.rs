//! Per-target results and their aggregation.

use crate::evaluator::CertificateInfo;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};

/// A configured host to check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub name: String,
    pub url: String,
}

impl Target {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Target {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// Either the certificate details or the reason the check failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Detail {
    Certificate(CertificateInfo),
    Error { error: String },
}

/// Result of checking one [`Target`]. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckOutcome {
    pub name: String,
    pub url: String,
    #[serde(flatten)]
    detail: Detail,
}

impl CheckOutcome {
    pub fn certificate(target: &Target, info: CertificateInfo) -> Self {
        CheckOutcome {
            name: target.name.clone(),
            url: target.url.clone(),
            detail: Detail::Certificate(info),
        }
    }

    pub fn failure(target: &Target, error: impl Into<String>) -> Self {
        CheckOutcome {
            name: target.name.clone(),
            url: target.url.clone(),
            detail: Detail::Error {
                error: error.into(),
            },
        }
    }

    pub fn detail(&self) -> &Detail {
        &self.detail
    }

    pub fn info(&self) -> Option<&CertificateInfo> {
        match &self.detail {
            Detail::Certificate(info) => Some(info),
            Detail::Error { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.detail {
            Detail::Certificate(_) => None,
            Detail::Error { error } => Some(error),
        }
    }

    pub fn status(&self) -> CertificateStatus {
        match &self.detail {
            Detail::Error { .. } => CertificateStatus::Error,
            Detail::Certificate(info) => {
                let c = &info.classification;
                if c.expired {
                    CertificateStatus::Expired
                } else if c.expires_soon {
                    CertificateStatus::ExpiringSoon
                } else if !c.valid {
                    CertificateStatus::NotYetValid
                } else {
                    CertificateStatus::Ok
                }
            }
        }
    }
}

/// Status shown in reports, in decreasing order of severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
pub enum CertificateStatus {
    #[strum(serialize = "ERROR")]
    Error,
    #[strum(serialize = "EXPIRED")]
    Expired,
    #[strum(serialize = "WARNING")]
    ExpiringSoon,
    #[strum(serialize = "NOT YET VALID")]
    NotYetValid,
    #[strum(serialize = "OK")]
    Ok,
}

impl CertificateStatus {
    /// Whether this status makes the run exit with a non-zero code.
    pub fn is_failure(self) -> bool {
        matches!(
            self,
            CertificateStatus::Error | CertificateStatus::Expired | CertificateStatus::ExpiringSoon
        )
    }
}

/// Counts of outcomes per status.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub ok: usize,
    pub expiring_soon: usize,
    pub expired: usize,
    pub not_yet_valid: usize,
    pub errors: usize,
}

impl Summary {
    pub fn from_outcomes(outcomes: &[CheckOutcome]) -> Self {
        let mut summary = Summary {
            total: outcomes.len(),
            ..Summary::default()
        };
        for outcome in outcomes {
            match outcome.status() {
                CertificateStatus::Ok => summary.ok += 1,
                CertificateStatus::ExpiringSoon => summary.expiring_soon += 1,
                CertificateStatus::Expired => summary.expired += 1,
                CertificateStatus::NotYetValid => summary.not_yet_valid += 1,
                CertificateStatus::Error => summary.errors += 1,
            }
        }
        summary
    }

    pub fn has_failures(&self) -> bool {
        self.errors + self.expired + self.expiring_soon > 0
    }

    /// `1` when any outcome failed, expired or expires soon, `0` otherwise.
    pub fn exit_code(&self) -> u8 {
        if self.has_failures() {
            1
        } else {
            0
        }
    }
}
