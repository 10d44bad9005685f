use tracing::{debug, warn};

use crate::batch::ProbeBatch;
use crate::funnel::{self, FunnelError, FunnelPolicy};
use crate::smtp_verify::error::SmtpVerifyError;
use crate::smtp_verify::options::SmtpOptions;
use crate::smtp_verify::probe::probe_batch;
use crate::smtp_verify::tunnel::Candidate;
use crate::smtp_verify::types::ProbeOutcome;

/// Probes one batch, racing every proxy (or a single direct connection when
/// `proxies` is empty).
///
/// The first candidate that concludes the dialogue wins and the others are
/// dropped. Failed candidates fall through to the next one; when all of them
/// fail the last failure is reported. The whole race is bounded by
/// [`SmtpOptions::batch_timeout`].
pub async fn check_batch(
    batch: &ProbeBatch,
    proxies: &[String],
    options: &SmtpOptions,
) -> ProbeOutcome {
    let policy = FunnelPolicy::new(options.max_sim_proxies, options.proxy_chunk_delay())
        .with_timeout(
            options.batch_timeout(batch.len()),
            format!("{} timeout", batch.mx),
        );

    let units: Vec<_> = Candidate::list(proxies)
        .into_iter()
        .map(|candidate| move || async move { probe_batch(&candidate, batch, options).await })
        .collect();

    let outcome = match funnel::race(&policy, units).await {
        Ok(verdict) => ProbeOutcome::from(verdict),
        Err(FunnelError::Failed(err)) => ProbeOutcome::Failed(err),
        Err(FunnelError::TimedOut(_)) => ProbeOutcome::Failed(SmtpVerifyError::BatchTimeout {
            mx: batch.mx.clone(),
        }),
        Err(FunnelError::Panicked(reason)) => ProbeOutcome::Failed(SmtpVerifyError::Aborted {
            mx: batch.mx.clone(),
            reason,
        }),
        Err(FunnelError::NoUnits) => ProbeOutcome::Failed(SmtpVerifyError::NoCandidates {
            mx: batch.mx.clone(),
        }),
    };

    match &outcome {
        ProbeOutcome::Verified(map) => {
            let accepted = map.values().filter(|exists| **exists).count();
            debug!(mx = %batch.mx, batch_len = batch.len(), accepted, "batch verified");
        }
        ProbeOutcome::Unknown => {
            debug!(mx = %batch.mx, batch_len = batch.len(), "catch-all or ambiguous server");
        }
        ProbeOutcome::Failed(err) => {
            warn!(mx = %batch.mx, batch_len = batch.len(), error = %err, "batch failed");
        }
    }
    outcome
}
