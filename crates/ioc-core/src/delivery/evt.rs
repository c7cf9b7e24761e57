//! `postEVT` / `subEVT` / `unsubEVT` / `forceProcEVT`.

use tracing::{debug, warn};

use ioc_proto::{Blocking, EvtDesc, LinkId, Mode, OptionSet, RawOptions, SrvId, Usage};

use crate::error::{IocError, Result};
use crate::link::{CbProcEvtFn, LinkObject};
use crate::queue::{DrainOutcome, PopOutcome, PushOutcome};
use crate::registry::Registry;

use super::PostTarget;

/// Arguments to `subEVT`: the event ids of interest and the callback that
/// will be invoked for each one. EVT has no polling counterpart -- a
/// subscription without a callback can never observe anything.
pub struct SubEvtArgs {
	/// Event identifiers this subscription covers.
	pub evt_ids: Vec<u32>,
	/// Invoked by the link's worker task for each matching event.
	pub callback: CbProcEvtFn,
}

fn canonicalize(raw: RawOptions) -> Result<OptionSet> {
	OptionSet::canonicalize(raw, OptionSet::evt_default(), false)
		.map_err(|()| IocError::InvalidParam("contradictory EVT options".into()))
}

/// Register a subscription on the consumer half of `link_id`, spawning its
/// delivery worker if this is the first subscription.
pub async fn sub_evt(reg: &Registry, link_id: LinkId, args: SubEvtArgs) -> Result<()> {
	let link = reg.get_link(link_id).await.ok_or(IocError::NotExistLink)?;
	if link.usage != Usage::EvtConsumer {
		return Err(IocError::IncompatibleUsage);
	}
	let evt = link.evt.as_ref().expect("EvtConsumer link always has an EvtSide");
	let had_subscribers = !evt.subscribed.lock().await.is_empty();
	evt.subscribed.lock().await.extend(args.evt_ids.iter().copied());
	*evt.callback.lock().await = Some(args.callback);
	if !had_subscribers {
		spawn_worker(link.clone()).await;
	}
	Ok(())
}

/// Remove event ids from a consumer's subscription.
pub async fn unsub_evt(reg: &Registry, link_id: LinkId, evt_ids: &[u32]) -> Result<()> {
	let link = reg.get_link(link_id).await.ok_or(IocError::NotExistLink)?;
	if link.usage != Usage::EvtConsumer {
		return Err(IocError::IncompatibleUsage);
	}
	let evt = link.evt.as_ref().expect("EvtConsumer link always has an EvtSide");
	let mut subs = evt.subscribed.lock().await;
	for id in evt_ids {
		subs.remove(id);
	}
	Ok(())
}

async fn spawn_worker(link: std::sync::Arc<LinkObject>) {
	let evt = link.evt.as_ref().expect("spawned only for EvtConsumer links").queue.clone();
	let link_for_worker = link.clone();
	let handle = tokio::spawn(async move {
		debug!(link_id = link_for_worker.id.0, "evt delivery worker started");
		loop {
			let PopOutcome::Item(desc) = evt.pop(Blocking::MayBlock, None).await else {
				continue;
			};
			let side = link_for_worker.evt.as_ref().expect("worker only runs for EvtConsumer links");
			let cb = side.callback.lock().await.clone();
			if let Some(cb) = cb {
				cb(&desc);
			} else {
				warn!(link_id = link_for_worker.id.0, evt_id = desc.evt_id, "event dropped: no callback registered");
			}
		}
	});
	link.track_worker(handle).await;
}

/// Dispatch `postEVT` per the Mode x Blocking matrix against either a
/// single link or a broadcast service.
pub async fn post_evt(reg: &Registry, target: PostTarget, mut desc: EvtDesc, raw: RawOptions) -> Result<()> {
	let opts = canonicalize(raw)?;
	match target {
		PostTarget::Link(link_id) => post_to_link(reg, link_id, &mut desc, opts).await,
		PostTarget::Service(srv_id) => post_broadcast(reg, srv_id, desc, opts).await,
	}
}

async fn resolve_consumer(reg: &Registry, producer_id: LinkId) -> Result<std::sync::Arc<LinkObject>> {
	let producer = reg.get_link(producer_id).await.ok_or(IocError::NotExistLink)?;
	if producer.usage != Usage::EvtProducer {
		return Err(IocError::IncompatibleUsage);
	}
	if !producer.is_live() {
		return Err(IocError::LinkBroken);
	}
	let peer_id = *producer.peer.lock().await;
	reg.get_link(peer_id).await.ok_or(IocError::LinkBroken)
}

async fn post_to_link(reg: &Registry, link_id: LinkId, desc: &mut EvtDesc, opts: OptionSet) -> Result<()> {
	let consumer = resolve_consumer(reg, link_id).await?;
	dispatch_one(&consumer, desc.clone(), opts).await
}

async fn post_broadcast(reg: &Registry, srv_id: SrvId, desc: EvtDesc, opts: OptionSet) -> Result<()> {
	let srv = reg.get_service(srv_id).await.ok_or(IocError::NotExistService)?;
	if !srv.flags.broadcast_event {
		return Err(IocError::InvalidParam("service is not configured for broadcast events".into()));
	}
	// `accepted_snapshot` holds the service-side (EvtProducer) ends; each one's
	// peer is the client's EvtConsumer end that actually owns the queue, same
	// as a single-link `postEVT` via `resolve_consumer`.
	let mut delivered = false;
	for link_id in srv.accepted_snapshot().await {
		let Ok(consumer) = resolve_consumer(reg, link_id).await else { continue };
		if dispatch_one(&consumer, desc.clone(), opts).await.is_ok() {
			delivered = true;
		}
	}
	if delivered { Ok(()) } else { Err(IocError::NoEventConsumer) }
}

async fn dispatch_one(consumer: &LinkObject, mut desc: EvtDesc, opts: OptionSet) -> Result<()> {
	let evt = consumer.evt.as_ref().expect("EvtConsumer link always has an EvtSide");
	if !evt.subscribed.lock().await.contains(&desc.evt_id) {
		return Err(IocError::NoEventConsumer);
	}
	desc.seq = ioc_proto::Seq(consumer.next_seq());

	match opts.mode {
		Mode::Async => match evt.queue.push(desc, opts.blocking, Some(consumer.watch_state())).await {
			PushOutcome::Accepted => Ok(()),
			PushOutcome::WouldBlock(_) => Err(IocError::TooManyQueuingEvtDesc),
			PushOutcome::Closed(_) => Err(IocError::LinkBroken),
		},
		Mode::Sync => {
			if !evt.queue.is_empty().await {
				match evt.queue.wait_drained(opts.blocking, Some(consumer.watch_state())).await {
					DrainOutcome::Drained => {}
					DrainOutcome::WouldBlock => return Err(IocError::TooLongEmptyingEvtDescQueue),
					DrainOutcome::Closed => return Err(IocError::LinkBroken),
				}
			}
			let cb = evt.callback.lock().await.clone();
			match cb {
				Some(cb) => {
					cb(&desc);
					Ok(())
				}
				None => Err(IocError::NoEventConsumer),
			}
		}
	}
}

/// Block until the consumer half of `link_id` has drained its queue.
pub async fn force_proc_evt(reg: &Registry, link_id: LinkId) -> Result<()> {
	let link = reg.get_link(link_id).await.ok_or(IocError::NotExistLink)?;
	let evt = link.evt.as_ref().ok_or_else(|| IocError::InvalidParam("link has no EVT consumer side".into()))?;
	evt.queue.wait_drained(Blocking::MayBlock, Some(link.watch_state())).await;
	Ok(())
}
