//! # Logical Clock
//!
//! The engine never reads a wall clock. Every timestamp and deadline is a
//! [`LogicalTime`] — a monotonic tick counter supplied by the deterministic
//! execution environment at each operation call. Deadlines are evaluated by
//! comparison only; nothing in the engine sleeps or schedules.

use serde::{Deserialize, Serialize};

/// A point on the environment's monotonic logical clock.
///
/// Ticks are opaque: chain bindings may map them to block heights or to
/// consensus timestamps, as long as they never decrease between operations.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct LogicalTime(u64);

impl LogicalTime {
    /// Wrap a raw tick value.
    pub fn new(ticks: u64) -> Self {
        Self(ticks)
    }

    /// Access the raw tick value.
    pub fn ticks(&self) -> u64 {
        self.0
    }

    /// The deadline `ticks` after this instant, saturating at the clock's
    /// maximum rather than wrapping.
    pub fn plus(&self, ticks: u64) -> Self {
        Self(self.0.saturating_add(ticks))
    }

    /// Whether a stored deadline has passed as of this instant.
    ///
    /// A deadline is past only when `self` is strictly after it — an
    /// operation arriving exactly at the deadline still makes it.
    pub fn is_past(&self, deadline: LogicalTime) -> bool {
        *self > deadline
    }
}

impl std::fmt::Display for LogicalTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "t{}", self.0)
    }
}
