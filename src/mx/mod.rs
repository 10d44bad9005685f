//! MX resolution stage.
//!
//! Every distinct domain is resolved once through the funnel, reduced to its
//! preferred exchange, and the mapping is inverted so that domains sharing a
//! mail server end up probed over the same SMTP sessions.

mod error;
mod options;
mod resolver;
mod stage;
mod types;

pub use error::MxError as Error;
pub use options::DnsOptions;
pub use resolver::{LookupMx, system_resolver};
pub use types::{MxRecord, MxStatus};

pub(crate) use stage::{domains_by_exchange, resolve_exchanges};
