//! Burst collapsing for input handlers.
//!
//! A [`Debouncer`] holds the latest value pushed to it and releases it once
//! no new value has arrived for the configured quiet period. Pushing again
//! before then restarts the wait. Callers poll it from their event loop.

use std::time::{Duration, Instant};

/// Quiet period before checkbox/radio filter changes are applied.
pub const FILTER_DEBOUNCE: Duration = Duration::from_millis(300);

/// Quiet period before typed price bounds are applied.
pub const PRICE_DEBOUNCE: Duration = Duration::from_millis(500);

/// Quiet period before a typed search query is submitted.
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

#[derive(Debug)]
pub struct Debouncer<T> {
    wait: Duration,
    pending: Option<(Instant, T)>,
}

impl<T> Debouncer<T> {
    pub fn new(wait: Duration) -> Self {
        Self {
            wait,
            pending: None,
        }
    }

    /// Replace any pending value and restart the quiet period.
    pub fn push(&mut self, value: T, now: Instant) {
        self.pending = Some((now + self.wait, value));
    }

    /// Take the pending value if its quiet period has elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        let ready = matches!(self.pending, Some((deadline, _)) if now >= deadline);
        if ready {
            self.flush()
        } else {
            None
        }
    }

    /// Take the pending value immediately, regardless of the deadline.
    pub fn flush(&mut self) -> Option<T> {
        self.pending.take().map(|(_, value)| value)
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}
