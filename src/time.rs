//! Time abstraction for animation timelines.
//!
//! Animation units never read the wall clock directly. The scheduler samples a
//! [`TimeSource`] once per frame and hands the instant down, which keeps every
//! layer in a frame on the same timestamp and makes lifecycles testable with a
//! hand-driven clock.

use std::time::{Duration, Instant};

/// Trait for abstracting monotonic time sources.
pub trait TimeSource: Send + Sync {
    /// Returns the time elapsed since the source's origin.
    fn now(&self) -> Duration;
}

/// Monotonic wall clock backed by [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Creates a clock whose origin is the moment of construction.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

impl<T: TimeSource + ?Sized> TimeSource for std::sync::Arc<T> {
    fn now(&self) -> Duration {
        (**self).now()
    }
}

/// Longest span accepted from configuration, about 31 years.
pub const MAX_SECONDS: f64 = 1e9;

/// Converts a seconds value from configuration into a [`Duration`].
///
/// Negative and non-finite values collapse to zero, values beyond
/// [`MAX_SECONDS`] saturate there.
pub(crate) fn secs(value: f64) -> Duration {
    if value.is_finite() && value > 0.0 {
        Duration::try_from_secs_f64(value.min(MAX_SECONDS)).unwrap_or(Duration::ZERO)
    } else {
        Duration::ZERO
    }
}
