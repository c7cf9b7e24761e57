//! Per-link state: the EVT/CMD/DAT queue sides, callbacks, and the
//! `Init -> Attaching -> Connected -> Closing -> Closed` lifecycle.
//!
//! A link pair carries exactly one primitive. The "receiving" half
//! (`EvtConsumer`, `CmdExecutor`, `DatReceiver`) owns the queue/rendezvous;
//! the "sending" half (`EvtProducer`, `CmdInitiator`, `DatSender`) holds no
//! local queue and resolves its peer through the [`Registry`](crate::registry::Registry)
//! to reach it. This keeps the pair free of an `Arc` cycle: each side only
//! ever stores the other's [`LinkId`], never a direct strong reference.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{oneshot, watch, Mutex};
use tokio::task::JoinHandle;

use ioc_proto::{CmdDesc, DatDesc, EvtDesc, LinkId, SrvId, Usage};

use crate::config::IocConfig;
use crate::queue::BoundedQueue;

/// Lifecycle state of a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
	/// Allocated, not yet attached to a peer.
	Init,
	/// `connectService`/`acceptClient` is in progress.
	Attaching,
	/// Peer installed, role compatibility verified.
	Connected,
	/// Tearing down; new operations fail, in-flight ones are released.
	Closing,
	/// Fully torn down; the id is retired.
	Closed,
}

/// Callback invoked by the delivery engine for each delivered event.
pub type CbProcEvtFn = Arc<dyn Fn(&EvtDesc) + Send + Sync>;
/// Callback invoked by the delivery engine to execute a command.
pub type CbExecCmdFn = Arc<dyn Fn(CmdDesc) -> CmdDesc + Send + Sync>;
/// Callback invoked by the delivery engine for each received data chunk.
///
/// A non-`Ok` return does not re-queue the chunk (it was already removed
/// from the queue); the failure is logged and counted.
pub type CbRecvDatFn = Arc<dyn Fn(DatDesc) -> Result<(), String> + Send + Sync>;

/// A command transferred from `execCMD` to whichever executor drains the
/// rendezvous slot, carrying the reply channel back to the initiator.
pub struct PendingCmd {
	/// The descriptor as submitted by the initiator.
	pub desc: CmdDesc,
	/// Completed by the executor (callback worker or `ackCMD`).
	pub reply: oneshot::Sender<CmdDesc>,
}

/// How a link's `CmdExecutor` side drains its rendezvous slot.
pub enum CmdExecMode {
	/// `CbExecCmd_F` is invoked by a dedicated worker task.
	Callback(CbExecCmdFn),
	/// The application drains via `waitCMD`/`ackCMD`.
	Polling,
}

/// State owned by a link's `EvtConsumer` side.
pub struct EvtSide {
	pub(crate) queue: Arc<BoundedQueue<EvtDesc>>,
	pub(crate) subscribed: Mutex<HashSet<u32>>,
	pub(crate) callback: Mutex<Option<CbProcEvtFn>>,
}

/// State owned by a link's `CmdExecutor` side.
pub struct CmdSide {
	pub(crate) rendezvous: Arc<BoundedQueue<PendingCmd>>,
	pub(crate) exec_mode: Mutex<Option<CmdExecMode>>,
}

/// State owned by a link's `DatReceiver` side.
pub struct DatSide {
	pub(crate) queue: Arc<BoundedQueue<DatDesc>>,
	pub(crate) callback: Mutex<Option<CbRecvDatFn>>,
	pub(crate) callback_failures: AtomicU64,
}

/// A single end of a connected link pair.
pub struct LinkObject {
	/// This end's identifier.
	pub id: LinkId,
	/// The role this end holds.
	pub usage: Usage,
	/// Owning service, if this link was accepted under one.
	pub srv_id: Option<SrvId>,
	/// The peer end's identifier, set once `Connected`.
	pub peer: Mutex<LinkId>,
	/// Per-link monotonic sequence counter.
	pub seq: AtomicU64,
	state_tx: watch::Sender<LinkState>,
	state_rx: watch::Receiver<LinkState>,
	/// Present only on the receiving half of an EVT link.
	pub evt: Option<EvtSide>,
	/// Present only on the receiving half of a CMD link.
	pub cmd: Option<CmdSide>,
	/// Present only on the receiving half of a DAT link.
	pub dat: Option<DatSide>,
	workers: Mutex<Vec<JoinHandle<()>>>,
}

impl LinkObject {
	/// Construct a new link end for the given role.
	#[must_use]
	pub fn new(id: LinkId, usage: Usage, srv_id: Option<SrvId>, config: &IocConfig) -> Self {
		let (state_tx, state_rx) = watch::channel(LinkState::Init);
		let evt = matches!(usage, Usage::EvtConsumer).then(|| EvtSide {
			queue: BoundedQueue::new(config.depth_evt_desc_queue),
			subscribed: Mutex::new(HashSet::new()),
			callback: Mutex::new(None),
		});
		let cmd = matches!(usage, Usage::CmdExecutor).then(|| CmdSide {
			rendezvous: BoundedQueue::new(1),
			exec_mode: Mutex::new(None),
		});
		let dat = matches!(usage, Usage::DatReceiver).then(|| DatSide {
			queue: BoundedQueue::new(config.depth_dat_chunk_queue),
			callback: Mutex::new(None),
			callback_failures: AtomicU64::new(0),
		});
		Self {
			id,
			usage,
			srv_id,
			peer: Mutex::new(LinkId::INVALID),
			seq: AtomicU64::new(0),
			state_tx,
			state_rx,
			evt,
			cmd,
			dat,
			workers: Mutex::new(Vec::new()),
		}
	}

	/// Current lifecycle state.
	#[must_use]
	pub fn state(&self) -> LinkState {
		*self.state_rx.borrow()
	}

	/// Subscribe to future state transitions.
	#[must_use]
	pub fn watch_state(&self) -> watch::Receiver<LinkState> {
		self.state_rx.clone()
	}

	/// Resolves once this link leaves `Attaching`/`Connected`. Races a
	/// blocked operation (e.g. `execCMD`'s reply wait) against the link being
	/// cascade-closed out from under it.
	pub async fn closed(&self) {
		let mut rx = self.state_rx.clone();
		loop {
			if !matches!(*rx.borrow(), LinkState::Attaching | LinkState::Connected) {
				return;
			}
			if rx.changed().await.is_err() {
				return;
			}
		}
	}

	/// Transition to a new state, waking any `watch_state` observers.
	pub fn set_state(&self, state: LinkState) {
		let _ = self.state_tx.send(state);
	}

	/// Allocate the next per-link sequence number.
	pub fn next_seq(&self) -> u64 {
		self.seq.fetch_add(1, Ordering::Relaxed)
	}

	/// Record a worker task so it can be observed/joined by diagnostics.
	pub async fn track_worker(&self, handle: JoinHandle<()>) {
		self.workers.lock().await.push(handle);
	}

	/// Abort every worker task owned by this link end. Called when the link
	/// transitions to `Closed`.
	pub async fn abort_workers(&self) {
		for handle in self.workers.lock().await.drain(..) {
			handle.abort();
		}
	}

	/// Whether this link end is still usable for new operations.
	#[must_use]
	pub fn is_live(&self) -> bool {
		matches!(self.state(), LinkState::Attaching | LinkState::Connected)
	}
}
