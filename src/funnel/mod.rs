//! Bounded-concurrency scheduler used at every fan-out point of the pipeline.
//!
//! Units are `FnOnce() -> Future` factories: a unit does nothing until its
//! chunk is reached. Chunks of [`FunnelPolicy::concurrency`] units run
//! concurrently inside the calling task (no `spawn`, so units may borrow),
//! separated by [`FunnelPolicy::chunk_delay`].
//!
//! * [`all`] waits for every unit and returns one slot per unit, in input order.
//! * [`race`] returns the first unit that settles with `Ok`. Errors do not end
//!   the race; the remaining siblings of a winner are dropped and later chunks
//!   never start.
//!
//! Neither function lets a unit failure (error or panic) escape: every fault
//! becomes a [`FunnelError`] value.

mod error;
mod policy;

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use futures::future::join_all;
use futures::stream::{FuturesUnordered, StreamExt};

pub use error::FunnelError;
pub use policy::FunnelPolicy;

/// Settled value of one unit.
pub type Slot<T, E> = Result<T, FunnelError<E>>;

/// Runs every unit, chunk after chunk, and returns their slots in input order.
///
/// The outer `Err` is only produced when the policy timeout expires; the
/// chunk in flight at that moment is abandoned.
pub async fn all<T, E, F, Fut>(
    policy: &FunnelPolicy,
    units: Vec<F>,
) -> Result<Vec<Slot<T, E>>, FunnelError<E>>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let work = run_chunks(policy, units);
    match policy.timeout {
        Some(limit) => tokio::time::timeout(limit, work)
            .await
            .map_err(|_| FunnelError::TimedOut(policy.timeout_message.clone())),
        None => Ok(work.await),
    }
}

/// Returns the first `Ok` produced by any unit.
///
/// When every unit fails, the last observed error is returned. An empty unit
/// list yields [`FunnelError::NoUnits`].
pub async fn race<T, E, F, Fut>(policy: &FunnelPolicy, units: Vec<F>) -> Slot<T, E>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let work = race_chunks(policy, units);
    match policy.timeout {
        Some(limit) => match tokio::time::timeout(limit, work).await {
            Ok(settled) => settled,
            Err(_) => Err(FunnelError::TimedOut(policy.timeout_message.clone())),
        },
        None => work.await,
    }
}

async fn run_chunks<T, E, F, Fut>(policy: &FunnelPolicy, units: Vec<F>) -> Vec<Slot<T, E>>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut slots = Vec::with_capacity(units.len());
    let mut pending = units.into_iter().peekable();
    let mut first = true;

    while pending.peek().is_some() {
        if !first {
            pause(policy).await;
        }
        first = false;

        let chunk: Vec<_> = pending
            .by_ref()
            .take(policy.chunk_size())
            .map(|unit| settle(unit()))
            .collect();
        slots.extend(join_all(chunk).await);
    }

    slots
}

async fn race_chunks<T, E, F, Fut>(policy: &FunnelPolicy, units: Vec<F>) -> Slot<T, E>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut last_error = None;
    let mut pending = units.into_iter().peekable();
    let mut first = true;

    while pending.peek().is_some() {
        if !first {
            pause(policy).await;
        }
        first = false;

        let mut in_flight: FuturesUnordered<_> = pending
            .by_ref()
            .take(policy.chunk_size())
            .map(|unit| settle(unit()))
            .collect();
        while let Some(slot) = in_flight.next().await {
            match slot {
                // dropping `in_flight` abandons the siblings
                Ok(value) => return Ok(value),
                Err(err) => last_error = Some(err),
            }
        }
    }

    Err(last_error.unwrap_or(FunnelError::NoUnits))
}

async fn settle<T, E, Fut>(future: Fut) -> Slot<T, E>
where
    Fut: Future<Output = Result<T, E>>,
{
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(FunnelError::Failed(err)),
        Err(payload) => Err(FunnelError::Panicked(panic_message(payload.as_ref()))),
    }
}

async fn pause(policy: &FunnelPolicy) {
    if !policy.chunk_delay.is_zero() {
        tokio::time::sleep(policy.chunk_delay).await;
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
