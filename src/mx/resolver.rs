use async_trait::async_trait;
use trust_dns_resolver::TokioAsyncResolver;
use trust_dns_resolver::error::ResolveErrorKind;

use super::{Error, MxRecord};

/// Source of MX answers. Implemented for the tokio system resolver; tests
/// plug in a stub.
#[async_trait]
pub trait LookupMx: Send + Sync {
    async fn lookup_mx(&self, domain: &str) -> Result<Vec<MxRecord>, Error>;
}

/// Builds a resolver from the system configuration (`/etc/resolv.conf`).
pub fn system_resolver() -> Result<TokioAsyncResolver, Error> {
    TokioAsyncResolver::tokio_from_system_conf().map_err(Error::resolver_init)
}

#[async_trait]
impl LookupMx for TokioAsyncResolver {
    async fn lookup_mx(&self, domain: &str) -> Result<Vec<MxRecord>, Error> {
        if domain.trim().is_empty() {
            return Err(Error::EmptyDomain);
        }
        let lookup = match self.mx_lookup(domain).await {
            Ok(lookup) => lookup,
            Err(err) => match err.kind() {
                ResolveErrorKind::NoRecordsFound { .. } => return Ok(Vec::new()),
                _ => return Err(Error::lookup(domain, err)),
            },
        };
        Ok(lookup
            .iter()
            .map(|mx| MxRecord::new(mx.preference(), normalize_exchange(&mx.exchange().to_utf8())))
            .collect())
    }
}

pub(crate) fn normalize_exchange(exchange: &str) -> String {
    exchange.trim_end_matches('.').to_ascii_lowercase()
}
