use std::time::Duration;

#[cfg(feature = "with-serde")]
use serde::{Deserialize, Serialize};

/// Limits applied while resolving the MX host of every domain.
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "with-serde", serde(default))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsOptions {
    /// Lookups started together.
    pub max_sim_req: usize,
    pub chunk_delay_ms: u64,
    /// Deadline of a single domain lookup.
    pub timeout_ms: u64,
}

impl Default for DnsOptions {
    fn default() -> Self {
        Self {
            max_sim_req: 5,
            chunk_delay_ms: 100,
            timeout_ms: 10_000,
        }
    }
}

impl DnsOptions {
    pub fn chunk_delay(&self) -> Duration {
        Duration::from_millis(self.chunk_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
