//! Monotonic time source.
//!
//! A thin wrapper over `tokio::time` rather than a second clock abstraction:
//! tests substitute a virtual clock by running under a paused Tokio runtime
//! (`#[tokio::test(start_paused = true)]`) instead of injecting a fake
//! implementation here.

use std::sync::OnceLock;
use std::time::Duration;

use tokio::time::Instant;

static ORIGIN: OnceLock<Instant> = OnceLock::new();

fn origin() -> Instant {
	*ORIGIN.get_or_init(Instant::now)
}

/// Monotonic clock used for deadlines, timestamps, and sequence tiebreaks.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeSource;

impl TimeSource {
	/// Current monotonic instant.
	#[must_use]
	pub fn now(&self) -> Instant {
		Instant::now()
	}

	/// Microseconds since this process first called into the time source.
	///
	/// Suitable for the `timestamp_us` field on descriptors; not meaningful
	/// across processes.
	#[must_use]
	pub fn now_micros(&self) -> u64 {
		Instant::now().saturating_duration_since(origin()).as_micros() as u64
	}

	/// An absolute deadline `dur` in the future, computed once at call entry.
	#[must_use]
	pub fn deadline(&self, dur: Duration) -> Instant {
		Instant::now() + dur
	}
}
