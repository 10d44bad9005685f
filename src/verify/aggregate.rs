use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::batch::ProbeBatch;
use crate::smtp_verify::{ProbeOutcome, SmtpVerifyError};

/// Final answer for one address.
#[derive(Debug, Clone)]
pub enum Verdict {
    /// `RCPT TO` accepted.
    Exists,
    /// `RCPT TO` answered 550.
    Rejected,
    /// The server accepted a bogus recipient (catch-all) or did not clearly
    /// reject it.
    Unknown,
    /// The batch holding this address could not be probed. The error is
    /// shared by every address of that batch.
    Failed(Arc<SmtpVerifyError>),
}

impl Verdict {
    /// `Some(true)` / `Some(false)` for a definite answer, `None` otherwise.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Exists => Some(true),
            Self::Rejected => Some(false),
            Self::Unknown | Self::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&SmtpVerifyError> {
        match self {
            Self::Failed(err) => Some(err),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Exists => "exists",
            Self::Rejected => "rejected",
            Self::Unknown => "unknown",
            Self::Failed(_) => "failed",
        }
    }
}

impl PartialEq for Verdict {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Failed(a), Self::Failed(b)) => {
                Arc::ptr_eq(a, b) || a.to_string() == b.to_string()
            }
            (a, b) => std::mem::discriminant(a) == std::mem::discriminant(b),
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed(err) => write!(f, "failed: {err}"),
            other => f.write_str(other.label()),
        }
    }
}

/// `true` / `false` / `null`, or the error message of a failed batch.
#[cfg(feature = "with-serde")]
impl serde::Serialize for Verdict {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Exists => serializer.serialize_bool(true),
            Self::Rejected => serializer.serialize_bool(false),
            Self::Unknown => serializer.serialize_none(),
            Self::Failed(err) => serializer.collect_str(err),
        }
    }
}

/// Verdict of every probed address, keyed by the address exactly as given.
pub type Verdicts = BTreeMap<String, Verdict>;

/// Folds the outcome of `batch` into `verdicts`. Keys already present are
/// left untouched.
pub(crate) fn merge(verdicts: &mut Verdicts, batch: &ProbeBatch, outcome: ProbeOutcome) {
    match outcome {
        ProbeOutcome::Verified(classified) => {
            for address in &batch.addresses {
                let verdict = match classified.get(address.as_str()) {
                    Some(true) => Verdict::Exists,
                    Some(false) => Verdict::Rejected,
                    None => Verdict::Unknown,
                };
                verdicts
                    .entry(address.as_str().to_string())
                    .or_insert(verdict);
            }
        }
        ProbeOutcome::Unknown => {
            for address in &batch.addresses {
                verdicts
                    .entry(address.as_str().to_string())
                    .or_insert(Verdict::Unknown);
            }
        }
        ProbeOutcome::Failed(err) => {
            let shared = Arc::new(err);
            for address in &batch.addresses {
                verdicts
                    .entry(address.as_str().to_string())
                    .or_insert_with(|| Verdict::Failed(shared.clone()));
            }
        }
    }
}
