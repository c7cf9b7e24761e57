//! The public entry points: service lifecycle, connection, and the
//! EVT/CMD/DAT primitives, wired against the process-global [`Registry`]
//! and [`ConlesBus`](crate::conles).

use std::sync::Arc;

use tracing::{debug, warn};

use ioc_proto::{
	Capability, CmdDesc, ConnArgs, DatDesc, EvtDesc, LinkId, OptionSet, RawOptions, SrvArgs, SrvId, Usage,
};

use crate::conles;
use crate::delivery::{cmd as cmd_delivery, dat as dat_delivery, evt as evt_delivery, PostTarget};
use crate::error::{IocError, Result};
use crate::link::{CbExecCmdFn, CbProcEvtFn, CbRecvDatFn, LinkObject, LinkState};
use crate::queue::{PopOutcome, PushOutcome};
use crate::registry::{global, Registry};
use crate::service::ServiceObject;

/// Bring a service online at its declared URI.
pub async fn online_service(args: SrvArgs, cookie: u64) -> Result<SrvId> {
	online_service_with(global(), args, cookie).await
}

async fn online_service_with(reg: &Registry, args: SrvArgs, cookie: u64) -> Result<SrvId> {
	let srv_id = reg.ids.next_srv_id();
	if !reg.reserve_uri(&args.uri, srv_id).await {
		return Err(IocError::ServiceAlreadyExist);
	}
	let srv = Arc::new(ServiceObject::new(srv_id, args.uri.clone(), args.capabilities, args.flags, cookie, &reg.config));
	reg.insert_service(srv.clone()).await;
	srv.spawn_acceptor_if_needed().await;
	debug!(srv_id = srv_id.0, uri = %args.uri, "service online");
	Ok(srv_id)
}

/// Take a service offline, cascade-closing accepted links unless
/// `KeepAcceptedLink` is set.
pub async fn offline_service(srv_id: SrvId) -> Result<()> {
	let reg = global();
	let srv = reg.remove_service(srv_id).await.ok_or(IocError::NotExistService)?;
	reg.release_uri(&srv.uri).await;
	srv.stop_acceptor().await;
	if !srv.flags.keep_accepted_link {
		for link_id in srv.accepted_snapshot().await {
			if let Err(err) = close_link(link_id).await {
				warn!(link_id = link_id.0, error = %err, "cascade close failed during offlineService");
			}
		}
	}
	debug!(srv_id = srv_id.0, "service offline");
	Ok(())
}

/// Register the hook invoked by a service's auto-accept worker.
pub async fn set_on_auto_accepted(srv_id: SrvId, hook: crate::service::OnAutoAccepted) -> Result<()> {
	let srv = global().get_service(srv_id).await.ok_or(IocError::NotExistService)?;
	srv.set_on_auto_accepted(hook).await;
	Ok(())
}

async fn install_link_pair(reg: &Registry, srv_id: SrvId, client_usage: Usage) -> (Arc<LinkObject>, Arc<LinkObject>) {
	let client_id = reg.ids.next_link_id();
	let accepted_id = reg.ids.next_link_id();
	let client = Arc::new(LinkObject::new(client_id, client_usage, None, &reg.config));
	let accepted = Arc::new(LinkObject::new(accepted_id, client_usage.complement(), Some(srv_id), &reg.config));
	*client.peer.lock().await = accepted_id;
	*accepted.peer.lock().await = client_id;
	client.set_state(LinkState::Connected);
	accepted.set_state(LinkState::Connected);
	reg.insert_link(client.clone()).await;
	reg.insert_link(accepted.clone()).await;
	(client, accepted)
}

/// Connect a new link to an online service, selecting `args.usage` as this
/// end's role.
pub async fn connect_service(args: ConnArgs) -> Result<LinkId> {
	let reg = global();
	let srv_id = reg.find_uri(&args.uri).await.ok_or(IocError::NotExistService)?;
	let srv = reg.get_service(srv_id).await.ok_or(IocError::NotExistService)?;
	if !srv.capabilities.contains(&args.usage.complement()) {
		return Err(IocError::IncompatibleUsage);
	}
	let (client, accepted) = install_link_pair(reg, srv_id, args.usage).await;
	if !matches!(
		srv.accept_queue.push(accepted.id, ioc_proto::Blocking::NonBlock, None).await,
		PushOutcome::Accepted
	) {
		return Err(IocError::ConnectionFailed("service accept queue is full".into()));
	}
	debug!(link_id = client.id.0, srv_id = srv_id.0, "link connected");
	Ok(client.id)
}

/// Manually accept the oldest pending connection on `srv_id`.
///
/// Not valid on a service with `AutoAccept` set, since its background
/// worker is already draining the accept queue.
pub async fn accept_client(srv_id: SrvId, raw: RawOptions) -> Result<LinkId> {
	let opts = OptionSet::canonicalize(raw, OptionSet::cmd_default(), false)
		.map_err(|()| IocError::InvalidParam("contradictory accept options".into()))?;
	let reg = global();
	let srv = reg.get_service(srv_id).await.ok_or(IocError::NotExistService)?;
	if srv.flags.auto_accept {
		return Err(IocError::InvalidParam("service has AutoAccept set".into()));
	}
	let link_id = match srv.accept_queue.pop(opts.blocking, None).await {
		PopOutcome::Item(link_id) => link_id,
		PopOutcome::WouldBlock | PopOutcome::Closed => return Err(IocError::Timeout),
	};
	srv.track_accepted(link_id).await;
	Ok(link_id)
}

/// Close a link, cascading the close notification to its peer.
pub async fn close_link(link_id: LinkId) -> Result<()> {
	let reg = global();
	let link = reg.remove_link(link_id).await.ok_or(IocError::NotExistLink)?;
	link.set_state(LinkState::Closing);
	let peer_id = *link.peer.lock().await;
	if peer_id.is_valid() {
		if let Some(peer) = reg.remove_link(peer_id).await {
			peer.set_state(LinkState::Closing);
			peer.set_state(LinkState::Closed);
			peer.abort_workers().await;
			if let Some(srv_id) = peer.srv_id {
				if let Some(srv) = reg.get_service(srv_id).await {
					srv.untrack_accepted(peer.id).await;
				}
			}
		}
	}
	link.set_state(LinkState::Closed);
	link.abort_workers().await;
	if let Some(srv_id) = link.srv_id {
		if let Some(srv) = reg.get_service(srv_id).await {
			srv.untrack_accepted(link.id).await;
		}
	}
	debug!(link_id = link_id.0, "link closed");
	Ok(())
}

// ---- EVT ---------------------------------------------------------------

/// Post an event to a specific link.
pub async fn post_evt(link_id: LinkId, desc: EvtDesc, opts: RawOptions) -> Result<()> {
	evt_delivery::post_evt(global(), PostTarget::Link(link_id), desc, opts).await
}

/// Post an event to every accepted consumer of a broadcast-enabled service.
pub async fn post_evt_to_service(srv_id: SrvId, desc: EvtDesc, opts: RawOptions) -> Result<()> {
	evt_delivery::post_evt(global(), PostTarget::Service(srv_id), desc, opts).await
}

/// Subscribe a link's consumer half to a set of event ids.
pub async fn sub_evt(link_id: LinkId, evt_ids: Vec<u32>, callback: CbProcEvtFn) -> Result<()> {
	evt_delivery::sub_evt(global(), link_id, evt_delivery::SubEvtArgs { evt_ids, callback }).await
}

/// Remove event ids from a link's consumer subscription.
pub async fn unsub_evt(link_id: LinkId, evt_ids: &[u32]) -> Result<()> {
	evt_delivery::unsub_evt(global(), link_id, evt_ids).await
}

/// Block until `link_id`'s consumer queue has drained.
pub async fn force_proc_evt(link_id: LinkId) -> Result<()> {
	evt_delivery::force_proc_evt(global(), link_id).await
}

/// Subscribe to the Conles bus; an empty `evt_ids` subscribes to everything.
pub async fn sub_evt_in_conles_mode(evt_ids: Vec<u32>, callback: CbProcEvtFn) -> Result<conles::SubscriptionId> {
	conles::global().subscribe(evt_ids, callback).await
}

/// Remove a Conles bus subscription.
pub async fn unsub_evt_in_conles_mode(id: conles::SubscriptionId) -> Result<()> {
	conles::global().unsubscribe(id).await
}

/// Post an event on the Conles bus.
pub async fn post_evt_in_conles_mode(desc: EvtDesc, raw: RawOptions) -> Result<()> {
	let opts = OptionSet::canonicalize(raw, OptionSet::evt_default(), false)
		.map_err(|()| IocError::InvalidParam("contradictory EVT options".into()))?;
	conles::global().post(desc, opts).await
}

/// Block until every Conles bus subscriber queue has drained.
pub async fn force_proc_evt_in_conles_mode() -> Result<()> {
	conles::global().force_proc().await
}

// ---- CMD ----------------------------------------------------------------

/// Register a link's command executor callback.
pub async fn set_cmd_executor(link_id: LinkId, callback: CbExecCmdFn) -> Result<()> {
	cmd_delivery::set_cmd_executor(global(), link_id, callback).await
}

/// Submit a command and await its result.
pub async fn exec_cmd(link_id: LinkId, desc: CmdDesc, opts: RawOptions) -> Result<CmdDesc> {
	cmd_delivery::exec_cmd(global(), link_id, desc, opts).await
}

/// Poll for the next pending command on an executor link.
pub async fn wait_cmd(link_id: LinkId, opts: RawOptions) -> Result<cmd_delivery::WaitedCmd> {
	cmd_delivery::wait_cmd(global(), link_id, opts).await
}

/// Publish a polled command's result.
pub fn ack_cmd(waited: cmd_delivery::WaitedCmd, result: CmdDesc) -> Result<()> {
	cmd_delivery::ack_cmd(waited, result)
}

// ---- DAT ------------------------------------------------------------------

/// Register a link's receive callback.
pub async fn set_dat_callback(link_id: LinkId, callback: CbRecvDatFn) -> Result<()> {
	dat_delivery::set_dat_callback(global(), link_id, callback).await
}

/// Send a data chunk.
pub async fn send_dat(link_id: LinkId, desc: DatDesc, opts: RawOptions) -> Result<()> {
	dat_delivery::send_dat(global(), link_id, desc, opts, &global().config).await
}

/// Poll for the next data chunk.
pub async fn recv_dat(link_id: LinkId, opts: RawOptions) -> Result<DatDesc> {
	dat_delivery::recv_dat(global(), link_id, opts).await
}

/// Wait for a link's send queue to fully drain to its peer.
pub async fn flush_dat(link_id: LinkId, opts: RawOptions) -> Result<()> {
	dat_delivery::flush_dat(global(), link_id, opts).await
}

/// Count of non-success returns from a link's DAT receive callback.
pub async fn dat_callback_failures(link_id: LinkId) -> Result<u64> {
	dat_delivery::dat_callback_failures(global(), link_id).await
}

// ---- Capability -----------------------------------------------------------

/// Report the active process-wide configuration.
pub fn get_capability() -> Capability {
	global().config.capability()
}
