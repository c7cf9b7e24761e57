//! The Conles bus actor task.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use ioc_proto::{Blocking, EvtDesc, Mode};

use crate::config::IocConfig;
use crate::error::IocError;
use crate::link::CbProcEvtFn;
use crate::queue::{BoundedQueue, DrainOutcome, PopOutcome, PushOutcome};

use super::commands::{ConlesCmd, SubscriptionId};
use super::handle::ConlesHandle;

struct SubEntry {
	evt_ids: Vec<u32>,
	queue: Arc<BoundedQueue<EvtDesc>>,
	callback: CbProcEvtFn,
	worker: JoinHandle<()>,
}

impl SubEntry {
	fn matches(&self, evt_id: u32) -> bool {
		self.evt_ids.is_empty() || self.evt_ids.contains(&evt_id)
	}
}

impl Drop for SubEntry {
	fn drop(&mut self) {
		self.worker.abort();
	}
}

/// Owns every subscriber queue and the dispatch loop; not exposed outside
/// this module, only [`ConlesHandle`] is.
pub(super) struct ConlesActor {
	rx: mpsc::Receiver<ConlesCmd>,
	config: IocConfig,
	subscribers: HashMap<SubscriptionId, SubEntry>,
	next_id: u64,
}

impl ConlesActor {
	pub(super) fn spawn(config: IocConfig) -> ConlesHandle {
		let (tx, rx) = mpsc::channel(256);
		let actor = Self { rx, config, subscribers: HashMap::new(), next_id: 1 };
		tokio::spawn(actor.run());
		ConlesHandle::new(tx)
	}

	async fn run(mut self) {
		debug!("conles bus actor started");
		while let Some(cmd) = self.rx.recv().await {
			match cmd {
				ConlesCmd::Subscribe { evt_ids, callback, reply } => {
					let id = SubscriptionId(self.next_id);
					self.next_id += 1;
					let queue = BoundedQueue::new(self.config.depth_conles_queue);
					let worker = spawn_worker(queue.clone(), callback.clone());
					self.subscribers.insert(id, SubEntry { evt_ids, queue, callback, worker });
					let _ = reply.send(id);
				}
				ConlesCmd::Unsubscribe { id, reply } => {
					self.subscribers.remove(&id);
					let _ = reply.send(());
				}
				ConlesCmd::Post { desc, opts, reply } => {
					let outcome = self.dispatch(desc, opts).await;
					let _ = reply.send(outcome);
				}
				ConlesCmd::Force { reply } => {
					for sub in self.subscribers.values() {
						sub.queue.wait_drained(Blocking::MayBlock, None).await;
					}
					let _ = reply.send(());
				}
				#[cfg(test)]
				ConlesCmd::Clear { reply } => {
					self.subscribers.clear();
					let _ = reply.send(());
				}
			}
		}
	}

	async fn dispatch(&self, desc: EvtDesc, opts: ioc_proto::OptionSet) -> crate::error::Result<()> {
		let targets: Vec<&SubEntry> = self.subscribers.values().filter(|s| s.matches(desc.evt_id)).collect();
		if targets.is_empty() {
			return Err(IocError::NoEventConsumer);
		}
		for sub in targets {
			match opts.mode {
				Mode::Async => {
					if !matches!(sub.queue.push(desc.clone(), opts.blocking, None).await, PushOutcome::Accepted) {
						return Err(IocError::FullQueuingEvtDesc);
					}
				}
				Mode::Sync => {
					if !sub.queue.is_empty().await
						&& !matches!(sub.queue.wait_drained(opts.blocking, None).await, DrainOutcome::Drained)
					{
						return Err(IocError::TooLongEmptyingEvtDescQueue);
					}
					(sub.callback)(&desc);
				}
			}
		}
		Ok(())
	}
}

fn spawn_worker(queue: Arc<BoundedQueue<EvtDesc>>, callback: CbProcEvtFn) -> JoinHandle<()> {
	tokio::spawn(async move {
		loop {
			let PopOutcome::Item(desc) = queue.pop(Blocking::MayBlock, None).await else {
				continue;
			};
			callback(&desc);
		}
	})
}

