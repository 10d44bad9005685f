use std::collections::BTreeMap;

use super::error::SmtpVerifyError;

/// Per-address answer of a fully classified batch, keyed by the original
/// address string. `true` = accepted (250), `false` = rejected (550).
pub type Classification = BTreeMap<String, bool>;

/// What a successful SMTP dialogue concluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchVerdict {
    Classified(Classification),
    /// The server accepted (or did not clearly reject) a bogus recipient.
    Unknown,
}

/// Result of one batch, whatever candidate produced it. Never partial:
/// either every address is classified or one value covers the whole batch.
#[derive(Debug)]
pub enum ProbeOutcome {
    Verified(Classification),
    Unknown,
    Failed(SmtpVerifyError),
}

impl From<BatchVerdict> for ProbeOutcome {
    fn from(verdict: BatchVerdict) -> Self {
        match verdict {
            BatchVerdict::Classified(map) => Self::Verified(map),
            BatchVerdict::Unknown => Self::Unknown,
        }
    }
}
