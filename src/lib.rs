#![forbid(unsafe_code)]
//! mailcheck_bulk: bulk mailbox existence checks over SMTP.
//!
//! Addresses are grouped by the preferred MX of their domain, cut into
//! batches and probed with `RCPT TO`, one SMTP session per batch, directly or
//! through HTTP `CONNECT` proxies.
//!
//! ```no_run
//! # async fn run() -> Result<(), mailcheck_bulk::MxError> {
//! use mailcheck_bulk::{Verifier, VerifyOptions};
//!
//! let verifier = Verifier::from_system_conf(VerifyOptions::default())?
//!     .on_progress(|snap| eprintln!("{snap}"));
//! let verdicts = verifier.check_emails(&["jane@example.com"], &[]).await;
//! for (address, verdict) in &verdicts {
//!     println!("{address}: {:?}", verdict.as_bool());
//! }
//! # Ok(())
//! # }
//! ```

pub mod address;
pub mod batch;
pub mod funnel;
pub mod mx;
pub mod smtp_verify;
pub mod verify;

#[cfg(test)]
pub(crate) mod test_support;

pub use address::{Address, AddressError};
pub use batch::{MxGroup, ProbeBatch};
pub use funnel::{FunnelError, FunnelPolicy};
pub use mx::{DnsOptions, Error as MxError, LookupMx, MxRecord, MxStatus};
pub use smtp_verify::{ProbeOutcome, SmtpOptions, SmtpVerifyError, check_batch};
pub use verify::{
    ProgressListener, ProgressSnapshot, Verdict, Verdicts, Verifier, VerifyOptions, check_emails,
};
