//! Email address parsing for the probe pipeline.
//!
//! An [`Address`] keeps the caller's original string (used as the key of the
//! final verdict map) next to the local part and the lowercase ASCII domain
//! that DNS lookups and `RCPT TO` commands need. Local parts may carry
//! UTF-8 characters (RFC 6531); they are sent to the server as given.

mod domain;
mod error;
mod local;

use std::fmt;

pub use error::AddressError;

use domain::ascii_domain;
use local::is_local_part;

#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address {
    original: String,
    local: String,
    domain: String,
}

impl Address {
    /// Parses `raw`, splitting at the last `@`.
    pub fn parse(raw: &str) -> Result<Self, AddressError> {
        let input = raw.trim();
        let Some((local, domain)) = input.rsplit_once('@') else {
            return Err(AddressError::MissingAt {
                address: raw.to_string(),
            });
        };

        let mut reasons = Vec::new();
        if input.len() > 254 {
            reasons.push(format!("total length {} > 254", input.len()));
        }
        if local.is_empty() || local.len() > 64 {
            reasons.push(format!(
                "local part length {} invalid (1..=64)",
                local.len()
            ));
        } else if !is_local_part(local) {
            reasons.push("invalid local part".to_string());
        }
        let domain = ascii_domain(domain, &mut reasons);

        match domain {
            Some(domain) if reasons.is_empty() => Ok(Self {
                original: raw.to_string(),
                local: local.to_string(),
                domain,
            }),
            _ => Err(AddressError::malformed(raw, reasons)),
        }
    }

    /// The string exactly as supplied by the caller.
    pub fn as_str(&self) -> &str {
        &self.original
    }

    pub fn local_part(&self) -> &str {
        &self.local
    }

    /// Lowercase ASCII domain.
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// `local@ascii-domain`, the form sent in `RCPT TO`.
    pub fn mailbox(&self) -> String {
        format!("{}@{}", self.local, self.domain)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}
