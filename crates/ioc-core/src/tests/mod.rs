//! Integration-style tests exercising the public API end to end.
//!
//! Each test runs in its own `#[tokio::test(flavor = "current_thread")]`
//! task but shares the process-global registry/Conles bus, so every test
//! resets them first via [`reset`].

mod cmd;
mod conles;
mod dat;
mod lifecycle;

use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use ioc_proto::{ConnArgs, SrvArgs, SrvFlags, SrvId, Usage, Uri};

use crate::conles;
use crate::error::Result;
use crate::registry::global;

/// Serializes tests that touch the process-global registry/Conles bus,
/// since `cargo test` otherwise runs them concurrently in one process.
static TEST_GUARD: OnceLock<tokio::sync::Mutex<()>> = OnceLock::new();

/// Reset shared global state and hold the test-serializing lock until the
/// returned guard is dropped (i.e. for the rest of the calling test).
async fn reset() -> tokio::sync::MutexGuard<'static, ()> {
	let guard = TEST_GUARD.get_or_init(|| tokio::sync::Mutex::new(())).lock().await;
	global().reset_for_test().await;
	conles::reset_for_test().await;
	guard
}

async fn wait_until_accepted(srv_id: SrvId, n: usize) {
	for _ in 0..200 {
		if let Some(srv) = global().get_service(srv_id).await {
			if srv.accepted_snapshot().await.len() >= n {
				return;
			}
		}
		tokio::time::sleep(Duration::from_millis(2)).await;
	}
	panic!("auto-accept worker never caught up");
}

fn unique_path(tag: &str) -> String {
	use std::sync::atomic::{AtomicU64, Ordering};
	static COUNTER: AtomicU64 = AtomicU64::new(0);
	format!("/test/{tag}/{}", COUNTER.fetch_add(1, Ordering::Relaxed))
}

/// Collects values pushed from a callback for later assertion.
#[derive(Clone, Default)]
pub(crate) struct Collector<T>(Arc<Mutex<Vec<T>>>);

impl<T: Clone + Send + 'static> Collector<T> {
	pub(crate) fn new() -> Self {
		Self(Arc::new(Mutex::new(Vec::new())))
	}

	pub(crate) fn push(&self, item: T) {
		self.0.lock().unwrap().push(item);
	}

	pub(crate) fn snapshot(&self) -> Vec<T> {
		self.0.lock().unwrap().clone()
	}

	pub(crate) fn len(&self) -> usize {
		self.0.lock().unwrap().len()
	}
}

async fn online_echo_service(flags: SrvFlags, capability: Usage) -> Result<(ioc_proto::SrvId, Uri)> {
	let uri = Uri::fifo(unique_path("svc"));
	let args = SrvArgs { uri: uri.clone(), capabilities: vec![capability], flags };
	let srv_id = crate::api::online_service(args, 0).await?;
	Ok((srv_id, uri))
}

async fn connect(uri: &Uri, usage: Usage) -> Result<ioc_proto::LinkId> {
	crate::api::connect_service(ConnArgs { uri: uri.clone(), usage }).await
}
