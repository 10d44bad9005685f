use std::time::Duration;

#[cfg(feature = "with-serde")]
use serde::{Deserialize, Serialize};

/// Configuration knobs for the SMTP probe stage. Every `*_ms` field has a
/// [`Duration`] accessor.
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "with-serde", serde(default))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpOptions {
    /// Addresses checked over one SMTP session.
    pub max_emails_per_req: usize,
    /// Sessions opened at once against the same MX.
    pub max_sim_same_mx: usize,
    pub same_mx_chunk_delay_ms: u64,
    /// Distinct MX hosts probed at once.
    pub max_sim_mx: usize,
    pub mx_chunk_delay_ms: u64,
    /// TCP connect (and HTTP CONNECT handshake) deadline.
    pub connect_timeout_ms: u64,
    /// Proxies asked at once; once one answers no other is started.
    pub max_sim_proxies: usize,
    pub proxy_chunk_delay_ms: u64,
    /// Base deadline of one batch.
    pub proxy_timeout_ms: u64,
    /// Added to the batch deadline for every address in the batch.
    pub proxy_email_timeout_ms: u64,
    pub port: u16,
    pub helo_domain: String,
    pub mail_from: String,
}

impl Default for SmtpOptions {
    fn default() -> Self {
        Self {
            max_emails_per_req: 16,
            max_sim_same_mx: 1,
            same_mx_chunk_delay_ms: 100,
            max_sim_mx: 30,
            mx_chunk_delay_ms: 100,
            connect_timeout_ms: 10_000,
            max_sim_proxies: 5,
            proxy_chunk_delay_ms: 100,
            proxy_timeout_ms: 10_000,
            proxy_email_timeout_ms: 800,
            port: 25,
            helo_domain: "mail.example.org".to_string(),
            mail_from: "name@example.org".to_string(),
        }
    }
}

impl SmtpOptions {
    pub fn same_mx_chunk_delay(&self) -> Duration {
        Duration::from_millis(self.same_mx_chunk_delay_ms)
    }

    pub fn mx_chunk_delay(&self) -> Duration {
        Duration::from_millis(self.mx_chunk_delay_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn proxy_chunk_delay(&self) -> Duration {
        Duration::from_millis(self.proxy_chunk_delay_ms)
    }

    /// Also bounds the closing `QUIT` exchange.
    pub fn proxy_email_timeout(&self) -> Duration {
        Duration::from_millis(self.proxy_email_timeout_ms)
    }

    /// `proxy_timeout + proxy_email_timeout * batch_len`.
    pub fn batch_timeout(&self, batch_len: usize) -> Duration {
        let per_email = self
            .proxy_email_timeout_ms
            .saturating_mul(batch_len as u64);
        Duration::from_millis(self.proxy_timeout_ms.saturating_add(per_email))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_timeout_grows_with_batch() {
        let options = SmtpOptions::default();
        assert_eq!(options.batch_timeout(0), Duration::from_secs(10));
        assert_eq!(options.batch_timeout(16), Duration::from_millis(22_800));
    }
}
