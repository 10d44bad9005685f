#[cfg(feature = "with-serde")]
use serde::{Deserialize, Serialize};

use crate::mx::DnsOptions;
use crate::smtp_verify::SmtpOptions;

/// Everything a [`Verifier`](super::Verifier) can be tuned with.
///
/// With `with-serde`, missing fields fall back to their defaults so a JSON
/// file only needs the values it overrides:
///
/// ```json
/// { "smtp": { "max_emails_per_req": 4, "helo_domain": "probe.example.net" } }
/// ```
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "with-serde", serde(default))]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyOptions {
    pub dns: DnsOptions,
    pub smtp: SmtpOptions,
}
