use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::funnel::{self, FunnelPolicy};

use super::{DnsOptions, Error, LookupMx, MxStatus};

/// Resolves the preferred exchange of every domain.
///
/// Lookups run through the funnel with `max_sim_req` concurrency. A failed
/// or timed-out lookup counts as "no records"; such domains map to an empty
/// exchange.
pub(crate) async fn resolve_exchanges<R>(
    resolver: &R,
    domains: Vec<String>,
    options: &DnsOptions,
) -> BTreeMap<String, String>
where
    R: LookupMx + ?Sized,
{
    let policy = FunnelPolicy::new(options.max_sim_req, options.chunk_delay());
    let timeout = options.timeout();
    let units: Vec<_> = domains
        .iter()
        .map(|domain| {
            move || async move {
                match tokio::time::timeout(timeout, resolver.lookup_mx(domain)).await {
                    Ok(answer) => answer,
                    Err(_) => Err(Error::Timeout {
                        domain: domain.clone(),
                    }),
                }
            }
        })
        .collect();

    // no funnel-wide deadline here, only the per-domain one above
    let slots = funnel::all(&policy, units).await.unwrap_or_default();

    domains
        .into_iter()
        .zip(slots)
        .map(|(domain, slot)| {
            let status = match slot {
                Ok(records) => MxStatus::from(records),
                Err(err) => {
                    warn!(%domain, error = %err, "MX resolution failed, domain skipped");
                    MxStatus::NoRecords
                }
            };
            let exchange = status
                .preferred()
                .map(|record| record.exchange.clone())
                .unwrap_or_default();
            debug!(%domain, %exchange, "preferred MX");
            (domain, exchange)
        })
        .collect()
}

/// Inverts domain → exchange into exchange → domains, dropping domains
/// without an exchange.
pub(crate) fn domains_by_exchange(
    exchanges: &BTreeMap<String, String>,
) -> BTreeMap<String, Vec<String>> {
    let mut inverted: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (domain, exchange) in exchanges {
        if exchange.is_empty() {
            continue;
        }
        inverted
            .entry(exchange.clone())
            .or_default()
            .push(domain.clone());
    }
    inverted
}
