//! Identifier allocation.
//!
//! IDs are monotonically increasing and never reused within a process
//! lifetime, so a stale `SrvId`/`LinkId` can never alias a live object.

use std::sync::atomic::{AtomicU64, Ordering};

use ioc_proto::{LinkId, SrvId, IOC_ID_INVALID};

/// Allocates service and link identifiers.
#[derive(Debug)]
pub struct IdRegistry {
	next: AtomicU64,
}

impl Default for IdRegistry {
	fn default() -> Self {
		Self {
			next: AtomicU64::new(IOC_ID_INVALID + 1),
		}
	}
}

impl IdRegistry {
	/// Allocate the next `SrvId`.
	pub fn next_srv_id(&self) -> SrvId {
		SrvId(self.next.fetch_add(1, Ordering::Relaxed))
	}

	/// Allocate the next `LinkId`.
	pub fn next_link_id(&self) -> LinkId {
		LinkId(self.next.fetch_add(1, Ordering::Relaxed))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn ids_are_unique_and_increasing() {
		let reg = IdRegistry::default();
		let a = reg.next_link_id();
		let b = reg.next_link_id();
		assert_ne!(a, b);
		assert!(b.0 > a.0);
	}
}
