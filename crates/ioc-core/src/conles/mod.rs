//! The connectionless (Conles) event bus.
//!
//! A process-global auto-link exposing `*_inConlesMode` events. Modeled as
//! a single actor with one mailbox, exactly like the teacher's
//! `SessionService`: because every `subEVT`/`unsubEVT`/`postEVT`/
//! `forceProcEVT` call is one message processed by that one mailbox in
//! order, "a subscription registered before a post is observed by it"
//! reduces to "processed earlier in the same FIFO queue" -- no extra
//! synchronization is needed to get that guarantee.

mod actor;
mod commands;
mod handle;

pub use commands::SubscriptionId;
pub use handle::ConlesHandle;

use std::sync::OnceLock;

use crate::config::IocConfig;

static BUS: OnceLock<ConlesHandle> = OnceLock::new();

/// The process-wide Conles bus singleton.
pub fn global() -> &'static ConlesHandle {
	BUS.get_or_init(|| actor::ConlesActor::spawn(IocConfig::default()))
}

/// Initialize the bus with a non-default configuration.
///
/// Must be called before the first [`global`] access; returns `false` if
/// the bus was already running (either from a prior call to this function
/// or a prior call to [`global`]).
pub fn init(config: IocConfig) -> bool {
	BUS.set(actor::ConlesActor::spawn(config)).is_ok()
}

/// Drop every subscriber on the global bus. Test-only: isolates scenarios
/// sharing the process-global bus within the same test binary.
#[cfg(test)]
pub(crate) async fn reset_for_test() {
	global().clear().await.expect("conles bus actor is gone");
}
