//! Time source used for every expiry decision.

// self
use crate::_prelude::*;

/// Supplies the current instant to the token manager and the response cache.
pub trait Clock
where
	Self: Send + Sync,
{
	/// Returns the current UTC instant.
	fn now(&self) -> OffsetDateTime;
}

/// Wall clock backed by [`OffsetDateTime::now_utc`].
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;
impl Clock for SystemClock {
	fn now(&self) -> OffsetDateTime {
		OffsetDateTime::now_utc()
	}
}

/// Manually driven clock for deterministic expiry checks.
///
/// Clones share the same instant, so a test can hand one clone to the proxy and keep
/// another to move time forward.
#[derive(Clone, Debug)]
pub struct ManualClock(Arc<Mutex<OffsetDateTime>>);
impl ManualClock {
	/// Creates a clock frozen at `start`.
	pub fn new(start: OffsetDateTime) -> Self {
		Self(Arc::new(Mutex::new(start)))
	}

	/// Moves the clock forward by `delta`.
	pub fn advance(&self, delta: Duration) {
		*self.0.lock() += delta;
	}

	/// Pins the clock to `instant`.
	pub fn set(&self, instant: OffsetDateTime) {
		*self.0.lock() = instant;
	}
}
impl Clock for ManualClock {
	fn now(&self) -> OffsetDateTime {
		*self.0.lock()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	#[test]
	fn manual_clock_clones_share_time() {
		let clock = ManualClock::new(macros::datetime!(2025-01-01 00:00 UTC));
		let observer = clock.clone();

		clock.advance(Duration::seconds(90));

		assert_eq!(observer.now(), macros::datetime!(2025-01-01 00:01:30 UTC));

		observer.set(macros::datetime!(2025-06-01 12:00 UTC));

		assert_eq!(clock.now(), macros::datetime!(2025-06-01 12:00 UTC));
	}
}
