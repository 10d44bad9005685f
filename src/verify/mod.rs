//! Bulk verification pipeline.
//!
//! ```text
//! addresses ─► parse ─► group by domain ─► MX per domain ─► group by MX
//!           ─► batches ─► funnel(MX) ─► funnel(batches of one MX) ─► race(proxies)
//! ```
//!
//! Addresses that cannot be parsed or whose domain has no usable MX are
//! left out of the result. They still count as processed so the progress
//! reaches its total.

mod aggregate;
mod options;
mod progress;

use std::convert::Infallible;
use std::sync::Arc;

use tracing::{debug, info, warn};
use trust_dns_resolver::TokioAsyncResolver;

use crate::address::Address;
use crate::batch::{MxGroup, ProbeBatch, build_groups, group_by_domain};
use crate::funnel::{self, FunnelPolicy};
use crate::mx::{self, Error as MxError, LookupMx, domains_by_exchange, resolve_exchanges};
use crate::smtp_verify::{ProbeOutcome, SmtpVerifyError, check_batch};

pub use aggregate::{Verdict, Verdicts};
pub use options::VerifyOptions;
pub use progress::{ProgressListener, ProgressSnapshot};

use aggregate::merge;
use progress::ProgressTracker;

/// Entry point of the library: owns the options, the MX resolver and the
/// progress listeners. One verifier can run any number of checks.
pub struct Verifier<R = TokioAsyncResolver> {
    options: VerifyOptions,
    resolver: R,
    listeners: Vec<ProgressListener>,
}

impl Verifier<TokioAsyncResolver> {
    /// Uses the system DNS configuration.
    pub fn from_system_conf(options: VerifyOptions) -> Result<Self, MxError> {
        Ok(Self::with_resolver(options, mx::system_resolver()?))
    }
}

impl<R: LookupMx> Verifier<R> {
    pub fn with_resolver(options: VerifyOptions, resolver: R) -> Self {
        Self {
            options,
            resolver,
            listeners: Vec::new(),
        }
    }

    /// Registers a listener called after every probed batch (and once for
    /// the addresses excluded before probing).
    pub fn on_progress<F>(mut self, listener: F) -> Self
    where
        F: Fn(ProgressSnapshot) + Send + Sync + 'static,
    {
        self.listeners.push(Arc::new(listener));
        self
    }

    /// Checks every address, through `proxies` when some are given.
    ///
    /// Never fails as a whole: each probed address gets a [`Verdict`], and a
    /// failed batch is reported on each of its addresses.
    pub async fn check_emails<S: AsRef<str>>(
        &self,
        addresses: &[S],
        proxies: &[String],
    ) -> Verdicts {
        let smtp = &self.options.smtp;
        let tracker = ProgressTracker::new(addresses.len(), self.listeners.clone());

        let mut parsed = Vec::with_capacity(addresses.len());
        for raw in addresses {
            match Address::parse(raw.as_ref()) {
                Ok(address) => parsed.push(address),
                Err(err) => warn!(error = %err, "address skipped"),
            }
        }

        let by_domain = group_by_domain(parsed);
        let domains: Vec<String> = by_domain.keys().cloned().collect();
        let exchanges = resolve_exchanges(&self.resolver, domains, &self.options.dns).await;
        let by_exchange = domains_by_exchange(&exchanges);
        let groups = build_groups(&by_domain, &by_exchange, smtp.max_emails_per_req);

        let scheduled: usize = groups.iter().map(MxGroup::address_count).sum();
        let excluded = addresses.len().saturating_sub(scheduled);
        if excluded > 0 {
            info!(excluded, "addresses without a usable MX or malformed, not probed");
            tracker.record(excluded);
        }
        info!(
            total = addresses.len(),
            mx_count = groups.len(),
            batches = groups.iter().map(|g| g.batches.len()).sum::<usize>(),
            proxies = proxies.len(),
            "probing"
        );

        let policy = FunnelPolicy::new(smtp.max_sim_mx, smtp.mx_chunk_delay());
        let tracker = &tracker;
        let units: Vec<_> = groups
            .iter()
            .map(|group| {
                move || async move {
                    Ok::<_, Infallible>(self.probe_group(group, proxies, tracker).await)
                }
            })
            .collect();
        let slots = funnel::all(&policy, units).await.unwrap_or_default();

        let mut verdicts = Verdicts::new();
        for (group, slot) in groups.iter().zip(slots) {
            match slot {
                Ok(outcomes) => {
                    for (batch, outcome) in group.batches.iter().zip(outcomes) {
                        merge(&mut verdicts, batch, outcome);
                    }
                }
                Err(err) => {
                    for batch in &group.batches {
                        merge(&mut verdicts, batch, aborted(batch, err.to_string()));
                    }
                }
            }
        }

        debug!(progress = %tracker.snapshot(), checked = verdicts.len(), "check finished");
        verdicts
    }

    /// Probes the batches of one exchange, `max_sim_same_mx` at a time.
    async fn probe_group(
        &self,
        group: &MxGroup,
        proxies: &[String],
        tracker: &ProgressTracker,
    ) -> Vec<ProbeOutcome> {
        let smtp = &self.options.smtp;
        let policy = FunnelPolicy::new(smtp.max_sim_same_mx, smtp.same_mx_chunk_delay());
        let units: Vec<_> = group
            .batches
            .iter()
            .map(|batch| {
                move || async move {
                    let outcome = check_batch(batch, proxies, smtp).await;
                    tracker.record(batch.len());
                    Ok::<_, Infallible>(outcome)
                }
            })
            .collect();

        let slots = funnel::all(&policy, units).await.unwrap_or_default();
        slots
            .into_iter()
            .zip(&group.batches)
            .map(|(slot, batch)| match slot {
                Ok(outcome) => outcome,
                // the unit panicked before recording its batch
                Err(err) => {
                    tracker.record(batch.len());
                    aborted(batch, err.to_string())
                }
            })
            .collect()
    }
}

fn aborted(batch: &ProbeBatch, reason: String) -> ProbeOutcome {
    ProbeOutcome::Failed(SmtpVerifyError::Aborted {
        mx: batch.mx.clone(),
        reason,
    })
}

/// One-shot check with the system resolver and no progress listener.
///
/// Only fails when the system DNS configuration cannot be loaded.
pub async fn check_emails<S: AsRef<str>>(
    addresses: &[S],
    proxies: &[String],
    options: VerifyOptions,
) -> Result<Verdicts, MxError> {
    let verifier = Verifier::from_system_conf(options)?;
    Ok(verifier.check_emails(addresses, proxies).await)
}
