use thiserror::Error;

/// Everything a funnel unit can settle with besides a value.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FunnelError<E> {
    #[error("{0}")]
    Failed(E),
    #[error("{0}")]
    TimedOut(String),
    #[error("unit panicked: {0}")]
    Panicked(String),
    #[error("no unit to run")]
    NoUnits,
}

impl<E> FunnelError<E> {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut(_))
    }
}
