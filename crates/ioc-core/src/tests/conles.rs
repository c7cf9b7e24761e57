//! The process-wide connectionless (Conles) event bus.

use std::sync::Arc;

use ioc_proto::EvtDesc;
use ioc_proto::RawOptions;

use super::*;

#[tokio::test(flavor = "current_thread")]
async fn echo_then_unsubscribe_stops_delivery() {
	let _guard = reset().await;
	let collector = Collector::new();
	let collector_cb = collector.clone();
	let sub_id = crate::sub_evt_in_conles_mode(vec![42], Arc::new(move |d: &EvtDesc| collector_cb.push(d.payload.clone())))
		.await
		.unwrap();

	crate::post_evt_in_conles_mode(EvtDesc::new(42, b"one".to_vec()), RawOptions::default()).await.unwrap();
	crate::force_proc_evt_in_conles_mode().await.unwrap();
	assert_eq!(collector.snapshot(), vec![b"one".to_vec()]);

	crate::unsub_evt_in_conles_mode(sub_id).await.unwrap();
	let err = crate::post_evt_in_conles_mode(EvtDesc::new(42, b"two".to_vec()), RawOptions::default())
		.await
		.unwrap_err();
	assert!(matches!(err, crate::IocError::NoEventConsumer));
	assert_eq!(collector.snapshot(), vec![b"one".to_vec()]);
}

#[tokio::test(flavor = "current_thread")]
async fn wildcard_subscription_receives_every_event() {
	let _guard = reset().await;
	let collector = Collector::new();
	let collector_cb = collector.clone();
	crate::sub_evt_in_conles_mode(Vec::new(), Arc::new(move |d: &EvtDesc| collector_cb.push(d.evt_id)))
		.await
		.unwrap();

	crate::post_evt_in_conles_mode(EvtDesc::new(1, Vec::new()), RawOptions::default()).await.unwrap();
	crate::post_evt_in_conles_mode(EvtDesc::new(2, Vec::new()), RawOptions::default()).await.unwrap();
	crate::force_proc_evt_in_conles_mode().await.unwrap();

	assert_eq!(collector.snapshot(), vec![1, 2]);
}

#[tokio::test(flavor = "current_thread")]
async fn two_subscribers_both_observe_a_post() {
	let _guard = reset().await;
	let collector_a = Collector::new();
	let collector_b = Collector::new();
	let cb_a = collector_a.clone();
	let cb_b = collector_b.clone();
	crate::sub_evt_in_conles_mode(vec![5], Arc::new(move |d: &EvtDesc| cb_a.push(d.evt_id))).await.unwrap();
	crate::sub_evt_in_conles_mode(vec![5], Arc::new(move |d: &EvtDesc| cb_b.push(d.evt_id))).await.unwrap();

	crate::post_evt_in_conles_mode(EvtDesc::new(5, Vec::new()), RawOptions::default()).await.unwrap();
	crate::force_proc_evt_in_conles_mode().await.unwrap();

	assert_eq!(collector_a.len(), 1);
	assert_eq!(collector_b.len(), 1);
}

#[tokio::test(flavor = "current_thread")]
async fn post_with_no_subscribers_reports_no_consumer() {
	let _guard = reset().await;
	let err = crate::post_evt_in_conles_mode(EvtDesc::new(1, Vec::new()), RawOptions::default())
		.await
		.unwrap_err();
	assert!(matches!(err, crate::IocError::NoEventConsumer));
}
