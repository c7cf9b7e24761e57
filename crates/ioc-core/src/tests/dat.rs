//! Ordered chunk delivery and the size/backpressure rules of `NoDrop` DAT.

use std::sync::Arc;
use std::time::Duration;

use ioc_proto::{DatDesc, LinkId, RawOptions, SrvFlags, Usage};

use super::*;

#[tokio::test(flavor = "current_thread")]
async fn chunks_arrive_in_send_order() {
	let _guard = reset().await;
	let (srv_id, uri) = online_echo_service(SrvFlags::default(), Usage::DatReceiver).await.unwrap();
	let sender = connect(&uri, Usage::DatSender).await.unwrap();
	let receiver = crate::accept_client(srv_id, RawOptions::default()).await.unwrap();

	let collector = Collector::new();
	let collector_cb = collector.clone();
	crate::set_dat_callback(
		receiver,
		Arc::new(move |chunk: DatDesc| {
			collector_cb.push(chunk.bytes);
			Ok(())
		}),
	)
	.await
	.unwrap();

	for n in 0..5u8 {
		crate::send_dat(sender, DatDesc::new(vec![n]), RawOptions::default()).await.unwrap();
	}
	crate::flush_dat(sender, RawOptions::default()).await.unwrap();

	assert_eq!(collector.snapshot(), (0..5u8).map(|n| vec![n]).collect::<Vec<_>>());
}

#[tokio::test(flavor = "current_thread")]
async fn recv_dat_polls_chunks_without_a_callback() {
	let _guard = reset().await;
	let (srv_id, uri) = online_echo_service(SrvFlags::default(), Usage::DatReceiver).await.unwrap();
	let sender = connect(&uri, Usage::DatSender).await.unwrap();
	let receiver = crate::accept_client(srv_id, RawOptions::default()).await.unwrap();

	crate::send_dat(sender, DatDesc::new(b"abc".to_vec()), RawOptions::default()).await.unwrap();
	let chunk = crate::recv_dat(receiver, RawOptions::default()).await.unwrap();

	assert_eq!(chunk.bytes, b"abc");
}

#[tokio::test(flavor = "current_thread")]
async fn data_too_large_is_rejected() {
	let _guard = reset().await;
	let (srv_id, uri) = online_echo_service(SrvFlags::default(), Usage::DatReceiver).await.unwrap();
	let sender = connect(&uri, Usage::DatSender).await.unwrap();
	let _receiver = crate::accept_client(srv_id, RawOptions::default()).await.unwrap();

	let too_big = vec![0u8; crate::get_capability().max_data_queue_size + 1];
	let err = crate::send_dat(sender, DatDesc::new(too_big), RawOptions::default()).await.unwrap_err();

	assert!(matches!(err, crate::IocError::DataTooLarge));
}

#[tokio::test(flavor = "current_thread")]
async fn dat_callback_failure_is_logged_and_counted_not_retried() {
	let _guard = reset().await;
	let (srv_id, uri) = online_echo_service(SrvFlags::default(), Usage::DatReceiver).await.unwrap();
	let sender = connect(&uri, Usage::DatSender).await.unwrap();
	let receiver = crate::accept_client(srv_id, RawOptions::default()).await.unwrap();

	crate::set_dat_callback(receiver, Arc::new(|_chunk: DatDesc| Err("decode failed".to_string())))
		.await
		.unwrap();

	crate::send_dat(sender, DatDesc::new(b"bad".to_vec()), RawOptions::default()).await.unwrap();
	crate::flush_dat(sender, RawOptions::default()).await.unwrap();

	assert_eq!(wait_for_failure_count(receiver, 1).await, 1);
}

async fn wait_for_failure_count(link_id: LinkId, n: u64) -> u64 {
	for _ in 0..200 {
		let count = crate::dat_callback_failures(link_id).await.unwrap();
		if count >= n {
			return count;
		}
		tokio::time::sleep(Duration::from_millis(2)).await;
	}
	panic!("dat callback failure count never reached {n}");
}
