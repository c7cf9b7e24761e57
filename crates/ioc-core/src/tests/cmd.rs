//! Synchronous command execution: callback executor and polling executor.

use std::sync::mpsc as std_mpsc;
use std::sync::Arc;
use std::time::Duration;

use ioc_proto::{Blocking, CmdDesc, CmdStatus, RawOptions, SrvFlags, Usage};

use super::*;

#[tokio::test(flavor = "current_thread")]
async fn ping_pong_round_trip() {
	let _guard = reset().await;
	let (srv_id, uri) = online_echo_service(SrvFlags::default(), Usage::CmdExecutor).await.unwrap();
	let initiator = connect(&uri, Usage::CmdInitiator).await.unwrap();
	let executor = crate::accept_client(srv_id, RawOptions::default()).await.unwrap();

	crate::set_cmd_executor(
		executor,
		Arc::new(|desc: CmdDesc| {
			let mut reply = desc;
			reply.out_payload = b"PONG".to_vec();
			reply.status = CmdStatus::Success;
			reply
		}),
	)
	.await
	.unwrap();

	let result = crate::exec_cmd(initiator, CmdDesc::new(1, b"PING".to_vec()), RawOptions::default())
		.await
		.unwrap();
	assert_eq!(result.out_payload, b"PONG");
	assert_eq!(result.status, CmdStatus::Success);
}

#[tokio::test(flavor = "current_thread")]
async fn exec_cmd_without_executor_reports_no_cmd_executor() {
	let _guard = reset().await;
	let (_srv_id, uri) = online_echo_service(SrvFlags::default(), Usage::CmdExecutor).await.unwrap();
	let initiator = connect(&uri, Usage::CmdInitiator).await.unwrap();

	let err = crate::exec_cmd(initiator, CmdDesc::new(1, Vec::new()), RawOptions::default())
		.await
		.unwrap_err();
	assert!(matches!(err, crate::IocError::NoCmdExecutor));
}

#[tokio::test(flavor = "current_thread")]
async fn wait_cmd_ack_cmd_polling_round_trip() {
	let _guard = reset().await;
	let (srv_id, uri) = online_echo_service(SrvFlags::default(), Usage::CmdExecutor).await.unwrap();
	let initiator = connect(&uri, Usage::CmdInitiator).await.unwrap();
	let executor = crate::accept_client(srv_id, RawOptions::default()).await.unwrap();

	let poller = tokio::spawn(async move {
		let waited = crate::wait_cmd(executor, RawOptions::default()).await.unwrap();
		let mut reply = waited.desc.clone();
		reply.out_payload = b"PONG".to_vec();
		crate::ack_cmd(waited, reply).unwrap();
	});

	let result = crate::exec_cmd(initiator, CmdDesc::new(2, b"PING".to_vec()), RawOptions::default())
		.await
		.unwrap();
	poller.await.unwrap();

	assert_eq!(result.out_payload, b"PONG");
	assert_eq!(result.status, CmdStatus::Success);
}

/// A registered executor that never replies still bounds the initiator's
/// wait to its requested deadline instead of hanging forever.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn exec_cmd_times_out_when_executor_never_replies() {
	let _guard = reset().await;
	let (srv_id, uri) = online_echo_service(SrvFlags::default(), Usage::CmdExecutor).await.unwrap();
	let initiator = connect(&uri, Usage::CmdInitiator).await.unwrap();
	let executor = crate::accept_client(srv_id, RawOptions::default()).await.unwrap();

	let (gate_tx, gate_rx) = std_mpsc::channel::<()>();
	let gate_rx = std::sync::Mutex::new(gate_rx);
	crate::set_cmd_executor(
		executor,
		Arc::new(move |desc: CmdDesc| {
			let _ = gate_rx.lock().unwrap().recv();
			desc
		}),
	)
	.await
	.unwrap();

	let opts = RawOptions { blocking: Some(Blocking::Timeout(Duration::from_millis(50))), ..Default::default() };
	let err = crate::exec_cmd(initiator, CmdDesc::new(3, Vec::new()), opts).await.unwrap_err();
	assert!(matches!(err, crate::IocError::Timeout));

	gate_tx.send(()).unwrap();
}

/// Cascade close: a client blocked in `exec_cmd` with `MayBlock` observes
/// `LinkBroken` as soon as the peer is cascaded away, instead of hanging
/// forever waiting on a reply that will never come.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn exec_cmd_mayblock_observes_link_broken_when_peer_is_cascaded_away() {
	let _guard = reset().await;
	let (srv_id, uri) = online_echo_service(SrvFlags::default(), Usage::CmdExecutor).await.unwrap();
	let initiator = connect(&uri, Usage::CmdInitiator).await.unwrap();
	let executor = crate::accept_client(srv_id, RawOptions::default()).await.unwrap();

	let (gate_tx, gate_rx) = std_mpsc::channel::<()>();
	let gate_rx = std::sync::Mutex::new(gate_rx);
	crate::set_cmd_executor(
		executor,
		Arc::new(move |desc: CmdDesc| {
			let _ = gate_rx.lock().unwrap().recv();
			desc
		}),
	)
	.await
	.unwrap();

	let opts = RawOptions { blocking: Some(Blocking::MayBlock), ..Default::default() };
	let call = tokio::spawn(async move { crate::exec_cmd(initiator, CmdDesc::new(4, Vec::new()), opts).await });
	tokio::time::sleep(Duration::from_millis(20)).await;

	crate::offline_service(srv_id).await.unwrap();

	let outcome = tokio::time::timeout(Duration::from_millis(200), call)
		.await
		.expect("exec_cmd should observe LinkBroken promptly instead of hanging")
		.unwrap();
	assert!(matches!(outcome.unwrap_err(), crate::IocError::LinkBroken));

	gate_tx.send(()).unwrap();
}
