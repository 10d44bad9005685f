use thiserror::Error;

#[derive(Debug, Error)]
pub enum MxError {
    #[error("domain is empty")]
    EmptyDomain,
    #[error("resolver initialization failed: {0}")]
    ResolverInit(String),
    #[error("MX lookup for {domain} failed: {source}")]
    Lookup {
        domain: String,
        #[source]
        source: trust_dns_resolver::error::ResolveError,
    },
    #[error("timeout resolving MX records for {domain}")]
    Timeout { domain: String },
}

impl MxError {
    pub(crate) fn resolver_init(err: impl std::fmt::Display) -> Self {
        Self::ResolverInit(err.to_string())
    }

    pub(crate) fn lookup(domain: &str, source: trust_dns_resolver::error::ResolveError) -> Self {
        Self::Lookup {
            domain: domain.to_string(),
            source,
        }
    }
}
