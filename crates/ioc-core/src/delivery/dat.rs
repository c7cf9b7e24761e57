//! `sendDAT` / `recvDAT` / `flushDAT`.
//!
//! DAT is always `NoDrop`: a chunk accepted onto the queue is guaranteed
//! in-order delivery to the receiver (by callback or by poll), or the link
//! breaking reports `LinkBroken` to whichever side is still waiting.

use std::sync::atomic::Ordering;

use tracing::warn;

use ioc_proto::{Blocking, DatDesc, LinkId, OptionSet, RawOptions, Usage};

use crate::config::IocConfig;
use crate::error::{IocError, Result};
use crate::link::{CbRecvDatFn, LinkObject};
use crate::queue::{DrainOutcome, PopOutcome, PushOutcome};
use crate::registry::Registry;

fn canonicalize(raw: RawOptions) -> Result<OptionSet> {
	OptionSet::canonicalize(raw, OptionSet::dat_default(), true)
		.map_err(|()| IocError::InvalidParam("DAT options must be NoDrop".into()))
}

async fn resolve_receiver(reg: &Registry, sender_id: LinkId) -> Result<std::sync::Arc<LinkObject>> {
	let sender = reg.get_link(sender_id).await.ok_or(IocError::NotExistLink)?;
	if sender.usage != Usage::DatSender {
		return Err(IocError::IncompatibleUsage);
	}
	if !sender.is_live() {
		return Err(IocError::LinkBroken);
	}
	let peer_id = *sender.peer.lock().await;
	reg.get_link(peer_id).await.ok_or(IocError::LinkBroken)
}

/// Register a receive callback, spawning the link's delivery worker. A
/// non-`Ok` return from `callback` does not re-queue the chunk: the chunk
/// was already removed from the queue and is logged as a delivery failure.
pub async fn set_dat_callback(reg: &Registry, link_id: LinkId, callback: CbRecvDatFn) -> Result<()> {
	let link = reg.get_link(link_id).await.ok_or(IocError::NotExistLink)?;
	if link.usage != Usage::DatReceiver {
		return Err(IocError::IncompatibleUsage);
	}
	let dat = link.dat.as_ref().expect("DatReceiver link always has a DatSide");
	*dat.callback.lock().await = Some(callback);

	let queue = dat.queue.clone();
	let link_for_worker = link.clone();
	let handle = tokio::spawn(async move {
		loop {
			let PopOutcome::Item(chunk) = queue.pop(Blocking::MayBlock, None).await else {
				continue;
			};
			let side = link_for_worker.dat.as_ref().expect("worker only runs for DatReceiver links");
			let cb = side.callback.lock().await.clone();
			if let Some(cb) = cb {
				if let Err(err) = cb(chunk) {
					side.callback_failures.fetch_add(1, Ordering::Relaxed);
					warn!(link_id = link_for_worker.id.0, error = %err, "dat callback returned non-success");
				}
			}
		}
	});
	link.track_worker(handle).await;
	Ok(())
}

/// Enqueue a chunk on the sender's peer, applying the `NoDrop` size and
/// backpressure rules.
pub async fn send_dat(reg: &Registry, link_id: LinkId, mut desc: DatDesc, raw: RawOptions, config: &IocConfig) -> Result<()> {
	let opts = canonicalize(raw)?;
	if desc.bytes.len() > config.max_data_queue_size {
		return Err(IocError::DataTooLarge);
	}
	let receiver = resolve_receiver(reg, link_id).await?;
	let dat = receiver.dat.as_ref().expect("DatReceiver link always has a DatSide");
	desc.seq = ioc_proto::Seq(receiver.next_seq());
	// A push that never finds room reports `BufferFull` (a capacity problem);
	// a pop/drain that never sees data reports `Timeout` (a time problem).
	// Either way, the receiver link leaving `Connected` while this call
	// waits reports `LinkBroken` instead.
	match dat.queue.push(desc, opts.blocking, Some(receiver.watch_state())).await {
		PushOutcome::Accepted => Ok(()),
		PushOutcome::WouldBlock(_) => Err(IocError::BufferFull),
		PushOutcome::Closed(_) => Err(IocError::LinkBroken),
	}
}

/// Poll for the next chunk in FIFO order.
pub async fn recv_dat(reg: &Registry, link_id: LinkId, raw: RawOptions) -> Result<DatDesc> {
	let opts = canonicalize(raw)?;
	let link = reg.get_link(link_id).await.ok_or(IocError::NotExistLink)?;
	if link.usage != Usage::DatReceiver {
		return Err(IocError::IncompatibleUsage);
	}
	let dat = link.dat.as_ref().expect("DatReceiver link always has a DatSide");
	match dat.queue.pop(opts.blocking, Some(link.watch_state())).await {
		PopOutcome::Item(chunk) => Ok(chunk),
		PopOutcome::WouldBlock => Err(IocError::Timeout),
		PopOutcome::Closed => Err(IocError::LinkBroken),
	}
}

/// Wait for the local send queue to fully drain to the peer.
pub async fn flush_dat(reg: &Registry, link_id: LinkId, raw: RawOptions) -> Result<()> {
	let opts = canonicalize(raw)?;
	let receiver = resolve_receiver(reg, link_id).await?;
	let dat = receiver.dat.as_ref().expect("DatReceiver link always has a DatSide");
	match dat.queue.wait_drained(opts.blocking, Some(receiver.watch_state())).await {
		DrainOutcome::Drained => Ok(()),
		DrainOutcome::WouldBlock => Err(IocError::Timeout),
		DrainOutcome::Closed => Err(IocError::LinkBroken),
	}
}

/// Count of callback invocations that returned a non-success result.
pub async fn dat_callback_failures(reg: &Registry, link_id: LinkId) -> Result<u64> {
	let link = reg.get_link(link_id).await.ok_or(IocError::NotExistLink)?;
	let dat = link.dat.as_ref().ok_or_else(|| IocError::InvalidParam("link has no DAT receiver side".into()))?;
	Ok(dat.callback_failures.load(Ordering::Relaxed))
}
