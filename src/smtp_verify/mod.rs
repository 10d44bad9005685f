//! SMTP RCPT probing of address batches.
//!
//! A batch is probed over a single SMTP session, either directly or through
//! an HTTP `CONNECT` tunnel. Before asking for real recipients the session
//! offers a random mailbox of the same domain: a server that does not
//! reject it cannot tell us anything, so the whole batch is
//! [`ProbeOutcome::Unknown`].
//!
//! [`check_batch`] races the available proxies and never fails: every
//! fault is a [`ProbeOutcome::Failed`] covering the whole batch.

mod engine;
mod error;
mod options;
mod probe;
mod session;
mod tunnel;
mod types;
mod util;

pub use engine::check_batch;
pub use error::{ReplyStage, SmtpVerifyError};
pub use options::SmtpOptions;
pub use types::{Classification, ProbeOutcome};
