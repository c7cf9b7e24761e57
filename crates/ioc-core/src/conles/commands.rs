//! Command enum for the Conles bus actor.

use tokio::sync::oneshot;

use ioc_proto::{EvtDesc, OptionSet};

use crate::error::Result;
use crate::link::CbProcEvtFn;

/// Identifies a subscription returned by [`super::ConlesHandle::subscribe`].
///
/// The original C API matches `unsubEVT` against the `(callback, cookie)`
/// pair it was registered with; Rust closures have no comparable stable
/// identity, so subscribe instead hands back this id to use for unsub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Messages processed by the Conles bus actor, in mailbox order.
pub enum ConlesCmd {
	/// Register a subscription; empty `evt_ids` means "all events".
	Subscribe {
		/// Event ids to filter on; empty means wildcard.
		evt_ids: Vec<u32>,
		/// Invoked for each matching delivered event.
		callback: CbProcEvtFn,
		/// Receives the new subscription's id.
		reply: oneshot::Sender<SubscriptionId>,
	},
	/// Remove a subscription.
	Unsubscribe {
		/// The subscription to remove.
		id: SubscriptionId,
		/// Signaled once removal has taken effect.
		reply: oneshot::Sender<()>,
	},
	/// Publish an event to every currently-matching subscriber.
	Post {
		/// The event to publish.
		desc: EvtDesc,
		/// Canonicalized dispatch options.
		opts: OptionSet,
		/// Receives the aggregate dispatch result.
		reply: oneshot::Sender<Result<()>>,
	},
	/// Block until every subscriber's queue has drained.
	Force {
		/// Signaled once every subscriber queue is empty.
		reply: oneshot::Sender<()>,
	},
	/// Drop every subscriber. Test-only: isolates scenarios sharing the
	/// process-global bus within the same test binary.
	#[cfg(test)]
	Clear {
		/// Signaled once every subscriber has been dropped.
		reply: oneshot::Sender<()>,
	},
}
