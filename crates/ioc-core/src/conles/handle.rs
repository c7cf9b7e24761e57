//! Public handle for the Conles bus actor.

use tokio::sync::{mpsc, oneshot};

use ioc_proto::{EvtDesc, OptionSet};

use crate::error::{IocError, Result};
use crate::link::CbProcEvtFn;

use super::commands::{ConlesCmd, SubscriptionId};

/// Handle for communicating with the Conles bus actor.
#[derive(Clone)]
pub struct ConlesHandle {
	tx: mpsc::Sender<ConlesCmd>,
}

impl ConlesHandle {
	/// Wrap a command sender in a typed handle.
	pub(crate) fn new(tx: mpsc::Sender<ConlesCmd>) -> Self {
		Self { tx }
	}

	/// Register a subscription; an empty `evt_ids` subscribes to everything.
	pub async fn subscribe(&self, evt_ids: Vec<u32>, callback: CbProcEvtFn) -> Result<SubscriptionId> {
		let (reply, reply_rx) = oneshot::channel();
		self.tx
			.send(ConlesCmd::Subscribe { evt_ids, callback, reply })
			.await
			.map_err(|_| IocError::Bug("conles bus actor is gone".into()))?;
		reply_rx.await.map_err(|_| IocError::Bug("conles bus actor dropped reply".into()))
	}

	/// Remove a subscription.
	pub async fn unsubscribe(&self, id: SubscriptionId) -> Result<()> {
		let (reply, reply_rx) = oneshot::channel();
		self.tx
			.send(ConlesCmd::Unsubscribe { id, reply })
			.await
			.map_err(|_| IocError::Bug("conles bus actor is gone".into()))?;
		reply_rx.await.map_err(|_| IocError::Bug("conles bus actor dropped reply".into()))
	}

	/// Publish an event to every currently-matching subscriber.
	pub async fn post(&self, desc: EvtDesc, opts: OptionSet) -> Result<()> {
		let (reply, reply_rx) = oneshot::channel();
		self.tx
			.send(ConlesCmd::Post { desc, opts, reply })
			.await
			.map_err(|_| IocError::Bug("conles bus actor is gone".into()))?;
		reply_rx.await.map_err(|_| IocError::Bug("conles bus actor dropped reply".into()))?
	}

	/// Block until every subscriber's queue has drained.
	pub async fn force_proc(&self) -> Result<()> {
		let (reply, reply_rx) = oneshot::channel();
		self.tx
			.send(ConlesCmd::Force { reply })
			.await
			.map_err(|_| IocError::Bug("conles bus actor is gone".into()))?;
		reply_rx.await.map_err(|_| IocError::Bug("conles bus actor dropped reply".into()))
	}

	/// Drop every subscriber. Test-only: isolates scenarios sharing the
	/// process-global bus within the same test binary.
	#[cfg(test)]
	pub(crate) async fn clear(&self) -> Result<()> {
		let (reply, reply_rx) = oneshot::channel();
		self.tx
			.send(ConlesCmd::Clear { reply })
			.await
			.map_err(|_| IocError::Bug("conles bus actor is gone".into()))?;
		reply_rx.await.map_err(|_| IocError::Bug("conles bus actor dropped reply".into()))
	}
}
