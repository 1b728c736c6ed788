//! Cooperative cancellation for in-flight resolutions.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Cloneable cancellation signal with an optional absolute deadline.
///
/// All clones share the same flag: calling [`CancelToken::cancel`] on any of
/// them is observed by every network step still running for the resolution.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token that reports itself cancelled once `budget` has elapsed.
    pub fn with_deadline(budget: Duration) -> Self {
        Self {
            flag: Arc::default(),
            deadline: Instant::now().checked_add(budget),
        }
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        if self.flag.load(Ordering::SeqCst) {
            return true;
        }
        self.deadline
            .is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// Time left before the deadline, `None` when no deadline was set.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Caps `timeout` to whatever is left before the deadline.
    pub(crate) fn bound(&self, timeout: Duration) -> Duration {
        match self.remaining() {
            Some(left) => timeout.min(left),
            None => timeout,
        }
    }
}
