use std::time::Duration;

/// Scheduling knobs shared by [`all`](super::all) and [`race`](super::race).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunnelPolicy {
    /// Units started together in one chunk. Zero is treated as one.
    pub concurrency: usize,
    /// Pause between two chunks (never before the first one).
    pub chunk_delay: Duration,
    /// Overall deadline, counted from the moment the funnel is invoked.
    pub timeout: Option<Duration>,
    /// Message carried by [`FunnelError::TimedOut`](super::FunnelError::TimedOut).
    pub timeout_message: String,
}

impl FunnelPolicy {
    pub fn new(concurrency: usize, chunk_delay: Duration) -> Self {
        Self {
            concurrency,
            chunk_delay,
            timeout: None,
            timeout_message: "timeout".to_string(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration, message: impl Into<String>) -> Self {
        self.timeout = Some(timeout);
        self.timeout_message = message.into();
        self
    }

    pub(crate) fn chunk_size(&self) -> usize {
        self.concurrency.max(1)
    }
}

impl Default for FunnelPolicy {
    fn default() -> Self {
        Self::new(1, Duration::ZERO)
    }
}
