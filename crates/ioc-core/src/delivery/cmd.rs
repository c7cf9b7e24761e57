//! `execCMD` / `waitCMD` / `ackCMD`.
//!
//! The rendezvous slot is a [`crate::queue::BoundedQueue`] of capacity 1:
//! "one in-flight command per link at a time" falls straight out of that
//! capacity, and a second `execCMD` queuing behind it is exactly the queue's
//! existing `MayBlock`/`Timeout`/`NonBlock` push discipline. The deadline is
//! computed once and threaded through both the enqueue wait and the reply
//! wait, so a caller's `Timeout(d)` bounds the whole rendezvous, not just
//! one half of it. Both waits also race the executor link's lifecycle: a
//! cascade close while a caller sits in either wait resolves it as
//! `LinkBroken` instead of hanging until the deadline (or forever, under
//! `MayBlock`).

use std::sync::Arc;

use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::debug;

use ioc_proto::{Blocking, CmdDesc, CmdStatus, LinkId, OptionSet, RawOptions, Usage};

use crate::error::{IocError, Result};
use crate::link::{CbExecCmdFn, CmdExecMode, LinkObject, PendingCmd};
use crate::queue::PopOutcome;
use crate::queue::PushOutcome;
use crate::registry::Registry;

fn canonicalize(raw: RawOptions) -> Result<OptionSet> {
	OptionSet::canonicalize(raw, OptionSet::cmd_default(), false)
		.map_err(|()| IocError::InvalidParam("contradictory CMD options".into()))
}

fn deadline_for(blocking: Blocking) -> Option<Instant> {
	match blocking {
		Blocking::Timeout(d) => Some(Instant::now() + d),
		_ => None,
	}
}

async fn resolve_executor(reg: &Registry, initiator_id: LinkId) -> Result<Arc<LinkObject>> {
	let initiator = reg.get_link(initiator_id).await.ok_or(IocError::NotExistLink)?;
	if initiator.usage != Usage::CmdInitiator {
		return Err(IocError::IncompatibleUsage);
	}
	if !initiator.is_live() {
		return Err(IocError::LinkBroken);
	}
	let peer_id = *initiator.peer.lock().await;
	reg.get_link(peer_id).await.ok_or(IocError::LinkBroken)
}

/// Register the callback executor for a link's `CmdExecutor` half, spawning
/// its worker. Mutually exclusive with polling (`waitCMD`/`ackCMD`) on the
/// same link.
pub async fn set_cmd_executor(reg: &Registry, link_id: LinkId, callback: CbExecCmdFn) -> Result<()> {
	let link = reg.get_link(link_id).await.ok_or(IocError::NotExistLink)?;
	if link.usage != Usage::CmdExecutor {
		return Err(IocError::IncompatibleUsage);
	}
	let cmd = link.cmd.as_ref().expect("CmdExecutor link always has a CmdSide");
	*cmd.exec_mode.lock().await = Some(CmdExecMode::Callback(callback.clone()));

	let rendezvous = cmd.rendezvous.clone();
	let link_for_worker = link.clone();
	let handle = tokio::spawn(async move {
		debug!(link_id = link_for_worker.id.0, "cmd executor worker started");
		loop {
			let PopOutcome::Item(pending) = rendezvous.pop(Blocking::MayBlock, None).await else {
				continue;
			};
			let result = callback(pending.desc);
			let _ = pending.reply.send(result);
		}
	});
	link.track_worker(handle).await;
	Ok(())
}

/// Submit a command and await its result, honoring `opts`.
pub async fn exec_cmd(reg: &Registry, link_id: LinkId, mut desc: CmdDesc, raw: RawOptions) -> Result<CmdDesc> {
	let opts = canonicalize(raw)?;
	let executor = resolve_executor(reg, link_id).await?;
	let cmd = executor.cmd.as_ref().expect("CmdExecutor link always has a CmdSide");
	if cmd.exec_mode.lock().await.is_none() {
		return Err(IocError::NoCmdExecutor);
	}

	desc.status = CmdStatus::Pending;
	desc.seq = ioc_proto::Seq(executor.next_seq());
	let (reply_tx, reply_rx) = oneshot::channel();
	let pending = PendingCmd { desc, reply: reply_tx };

	let deadline = deadline_for(opts.blocking);
	match cmd.rendezvous.push(pending, opts.blocking, Some(executor.watch_state())).await {
		PushOutcome::Accepted => {}
		PushOutcome::WouldBlock(_) => return Err(IocError::Timeout),
		PushOutcome::Closed(_) => return Err(IocError::LinkBroken),
	}

	tokio::select! {
		res = reply_rx => res.map_err(|_| IocError::LinkBroken),
		() = executor.closed() => Err(IocError::LinkBroken),
		() = sleep_until_deadline(deadline) => Err(IocError::Timeout),
	}
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
	match deadline {
		Some(d) => tokio::time::sleep_until(d).await,
		None => std::future::pending().await,
	}
}

/// Poll for the next pending command on an executor's rendezvous slot.
///
/// Returns an opaque handle: the caller processes the command off-band and
/// must call [`ack_cmd`] with it to release the initiator.
pub async fn wait_cmd(reg: &Registry, link_id: LinkId, raw: RawOptions) -> Result<WaitedCmd> {
	let opts = canonicalize(raw)?;
	let link = reg.get_link(link_id).await.ok_or(IocError::NotExistLink)?;
	if link.usage != Usage::CmdExecutor {
		return Err(IocError::IncompatibleUsage);
	}
	let cmd = link.cmd.as_ref().expect("CmdExecutor link always has a CmdSide");
	{
		let mode = cmd.exec_mode.lock().await;
		if matches!(*mode, Some(CmdExecMode::Callback(_))) {
			return Err(IocError::InvalidParam("link uses callback execution, not polling".into()));
		}
	}
	*cmd.exec_mode.lock().await = Some(CmdExecMode::Polling);
	let pending = match cmd.rendezvous.pop(opts.blocking, Some(link.watch_state())).await {
		PopOutcome::Item(pending) => pending,
		PopOutcome::WouldBlock => return Err(IocError::Timeout),
		PopOutcome::Closed => return Err(IocError::LinkBroken),
	};
	Ok(WaitedCmd { desc: pending.desc, reply: pending.reply })
}

/// A command received via [`wait_cmd`], awaiting its result.
pub struct WaitedCmd {
	/// The descriptor as submitted by the initiator.
	pub desc: CmdDesc,
	reply: oneshot::Sender<CmdDesc>,
}

/// Publish a command's result, releasing the blocked initiator.
pub fn ack_cmd(waited: WaitedCmd, mut result: CmdDesc) -> Result<()> {
	result.status = if result.status == CmdStatus::Failed { CmdStatus::Failed } else { CmdStatus::Success };
	waited.reply.send(result).map_err(|_| IocError::LinkBroken)
}
