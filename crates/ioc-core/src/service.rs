//! Service state: accept queue, capability bitmap, and the
//! auto-accept/broadcast/keep-accepted-link flags.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use ioc_proto::{LinkId, SrvFlags, SrvId, Usage, Uri};

use crate::config::IocConfig;
use crate::queue::{BoundedQueue, PopOutcome};

/// Invoked by the auto-accept worker right after a link is accepted, before
/// the connecting client observes success.
pub type OnAutoAccepted = Arc<dyn Fn(SrvId, LinkId, u64) -> bool + Send + Sync>;

/// A service online in the registry.
pub struct ServiceObject {
	/// This service's identifier.
	pub id: SrvId,
	/// The address this service is reachable at.
	pub uri: Uri,
	/// Roles a connecting client may select.
	pub capabilities: Vec<Usage>,
	/// Lifecycle flags.
	pub flags: SrvFlags,
	/// Opaque value threaded through to [`OnAutoAccepted`].
	pub cookie: u64,
	/// Pending connections awaiting manual `acceptClient`. Populated by
	/// `connectService` even under auto-accept, where the acceptor worker
	/// below drains it immediately instead of the caller.
	pub(crate) accept_queue: Arc<BoundedQueue<LinkId>>,
	pub(crate) accepted_links: Mutex<HashSet<LinkId>>,
	on_auto_accepted: Mutex<Option<OnAutoAccepted>>,
	acceptor: Mutex<Option<JoinHandle<()>>>,
}

impl ServiceObject {
	/// Construct a new service, not yet running its auto-accept worker.
	#[must_use]
	pub fn new(id: SrvId, uri: Uri, capabilities: Vec<Usage>, flags: SrvFlags, cookie: u64, config: &IocConfig) -> Self {
		Self {
			id,
			uri,
			capabilities,
			flags,
			cookie,
			accept_queue: BoundedQueue::new(config.depth_evt_desc_queue.max(16)),
			accepted_links: Mutex::new(HashSet::new()),
			on_auto_accepted: Mutex::new(None),
			acceptor: Mutex::new(None),
		}
	}

	/// Register the hook invoked by the auto-accept worker.
	pub async fn set_on_auto_accepted(&self, hook: OnAutoAccepted) {
		*self.on_auto_accepted.lock().await = Some(hook);
	}

	/// Record that `link` was accepted under this service.
	pub async fn track_accepted(&self, link: LinkId) {
		self.accepted_links.lock().await.insert(link);
	}

	/// Forget a link, e.g. after it closes.
	pub async fn untrack_accepted(&self, link: LinkId) {
		self.accepted_links.lock().await.remove(&link);
	}

	/// Snapshot of currently accepted links, used for broadcast fan-out and
	/// offline cascade-close.
	pub async fn accepted_snapshot(&self) -> Vec<LinkId> {
		self.accepted_links.lock().await.iter().copied().collect()
	}

	/// Start the auto-accept worker if `flags.auto_accept` is set.
	///
	/// The worker drains `accept_queue` as fast as connections arrive,
	/// invoking [`OnAutoAccepted`] before the link is usable. A hook
	/// returning `false` causes the link to be torn down and the connecting
	/// client to observe `ConnectionFailed`; that teardown is performed by
	/// the caller of `connectService` once it sees the hook's verdict
	/// recorded on the link (see `delivery::conn`).
	pub async fn spawn_acceptor_if_needed(self: &Arc<Self>) {
		if !self.flags.auto_accept {
			return;
		}
		let srv = self.clone();
		let handle = tokio::spawn(async move {
			debug!(srv_id = srv.id.0, "auto-accept worker started");
			loop {
				let PopOutcome::Item(link_id) = srv.accept_queue.pop(ioc_proto::Blocking::MayBlock, None).await else {
					continue;
				};
				let hook = srv.on_auto_accepted.lock().await.clone();
				let accepted = if let Some(hook) = hook {
					hook(srv.id, link_id, srv.cookie)
				} else {
					true
				};
				if !accepted {
					warn!(srv_id = srv.id.0, link_id = link_id.0, "auto-accept hook rejected link");
				}
				srv.track_accepted(link_id).await;
			}
		});
		*self.acceptor.lock().await = Some(handle);
	}

	/// Stop the auto-accept worker, if running.
	pub async fn stop_acceptor(&self) {
		if let Some(handle) = self.acceptor.lock().await.take() {
			handle.abort();
		}
	}
}
