use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide clock backing [`VersionStamp::next`].
static VERSION_CLOCK: AtomicU64 = AtomicU64::new(1);

/// Monotonically comparable marker of a document's edit generation.
///
/// Stamps created with [`VersionStamp::next`] are strictly newer than every
/// stamp created before them in this process, so a replacement handle always
/// compares greater than the handle it replaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VersionStamp(u64);

impl VersionStamp {
	/// Allocates a stamp newer than all previously allocated stamps.
	pub fn next() -> Self {
		Self(VERSION_CLOCK.fetch_add(1, Ordering::Relaxed))
	}

	/// Returns a stamp strictly newer than both `self` and every stamp allocated so far.
	pub fn newer(self) -> Self {
		let mut current = VERSION_CLOCK.load(Ordering::Relaxed);
		loop {
			let candidate = current.max(self.0.saturating_add(1));
			match VERSION_CLOCK.compare_exchange_weak(current, candidate.saturating_add(1), Ordering::Relaxed, Ordering::Relaxed) {
				Ok(_) => return Self(candidate),
				Err(actual) => current = actual,
			}
		}
	}

	/// Wraps a raw value. Intended for tests and deserialized state.
	pub const fn from_raw(raw: u64) -> Self {
		Self(raw)
	}

	pub const fn get(self) -> u64 {
		self.0
	}
}

impl fmt::Display for VersionStamp {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "v{}", self.0)
	}
}

#[cfg(test)]
mod tests {
	use proptest::prelude::*;

	use super::*;

	#[test]
	fn next_is_strictly_increasing() {
		let a = VersionStamp::next();
		let b = VersionStamp::next();
		assert!(b > a);
	}

	#[test]
	fn newer_beats_raw_values_from_elsewhere() {
		let far = VersionStamp::from_raw(u64::from(u32::MAX));
		let newer = far.newer();
		assert!(newer > far);
		assert!(VersionStamp::next() > newer);
	}

	proptest! {
		#[test]
		fn newer_is_always_greater(raw in 0u64..(u64::MAX / 4)) {
			let base = VersionStamp::from_raw(raw);
			let n = base.newer();
			prop_assert!(n > base);
			prop_assert!(n.newer() > n);
		}
	}
}
