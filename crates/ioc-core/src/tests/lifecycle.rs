//! Link/service lifecycle: connection, acceptance, and teardown.

use std::sync::Arc;

use ioc_proto::{ConnArgs, EvtDesc, RawOptions, SrvFlags, Usage};

use super::*;

#[tokio::test(flavor = "current_thread")]
async fn closed_link_rejects_further_ops() {
	let _guard = reset().await;
	let (_srv_id, uri) = online_echo_service(SrvFlags::default(), Usage::EvtProducer).await.unwrap();
	let client_link = connect(&uri, Usage::EvtConsumer).await.unwrap();

	crate::close_link(client_link).await.unwrap();

	let err = crate::sub_evt(client_link, vec![1], Arc::new(|_: &EvtDesc| {})).await.unwrap_err();
	assert!(matches!(err, crate::IocError::NotExistLink));
}

#[tokio::test(flavor = "current_thread")]
async fn cascade_close_tears_down_both_ends() {
	let _guard = reset().await;
	let (srv_id, uri) = online_echo_service(SrvFlags::default(), Usage::EvtProducer).await.unwrap();
	let client_link = connect(&uri, Usage::EvtConsumer).await.unwrap();
	let accepted_link = crate::accept_client(srv_id, RawOptions::default()).await.unwrap();

	crate::close_link(client_link).await.unwrap();

	let err = crate::post_evt(accepted_link, EvtDesc::new(1, Vec::new()), RawOptions::default())
		.await
		.unwrap_err();
	assert!(matches!(err, crate::IocError::NotExistLink));
}

#[tokio::test(flavor = "current_thread")]
async fn connect_with_incompatible_usage_is_rejected() {
	let _guard = reset().await;
	let (_srv_id, uri) = online_echo_service(SrvFlags::default(), Usage::EvtProducer).await.unwrap();

	let err = crate::connect_service(ConnArgs { uri, usage: Usage::DatSender }).await.unwrap_err();
	assert!(matches!(err, crate::IocError::IncompatibleUsage));
}

#[tokio::test(flavor = "current_thread")]
async fn connect_to_missing_service_reports_not_exist() {
	let _guard = reset().await;
	let uri = ioc_proto::Uri::fifo(unique_path("missing"));
	let err = crate::connect_service(ConnArgs { uri, usage: Usage::EvtConsumer }).await.unwrap_err();
	assert!(matches!(err, crate::IocError::NotExistService));
}

#[tokio::test(flavor = "current_thread")]
async fn offline_service_cascade_closes_accepted_links() {
	let _guard = reset().await;
	let flags = SrvFlags { auto_accept: true, ..Default::default() };
	let (srv_id, uri) = online_echo_service(flags, Usage::EvtProducer).await.unwrap();
	let client_link = connect(&uri, Usage::EvtConsumer).await.unwrap();
	wait_until_accepted(srv_id, 1).await;

	crate::offline_service(srv_id).await.unwrap();

	let err = crate::sub_evt(client_link, vec![1], Arc::new(|_: &EvtDesc| {})).await.unwrap_err();
	assert!(matches!(err, crate::IocError::NotExistLink));
}

#[tokio::test(flavor = "current_thread")]
async fn offline_service_keeps_accepted_link_when_flagged() {
	let _guard = reset().await;
	let flags = SrvFlags { auto_accept: true, keep_accepted_link: true, ..Default::default() };
	let (srv_id, uri) = online_echo_service(flags, Usage::EvtProducer).await.unwrap();
	let client_link = connect(&uri, Usage::EvtConsumer).await.unwrap();
	wait_until_accepted(srv_id, 1).await;

	crate::offline_service(srv_id).await.unwrap();

	// the link itself survives; only the service's URI and accept loop are gone.
	crate::sub_evt(client_link, vec![1], Arc::new(|_: &EvtDesc| {})).await.unwrap();
}
