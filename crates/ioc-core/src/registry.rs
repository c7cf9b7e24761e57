//! URI -> service and id -> link lookup tables.
//!
//! The registry is the process-global home for every live [`ServiceObject`]
//! and [`LinkObject`]; it is the one place peers resolve each other by id,
//! which is how link pairs avoid holding direct `Arc` cycles (see the
//! module docs on [`crate::link`]).

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use tokio::sync::RwLock;

use ioc_proto::{LinkId, SrvId, Uri};

use crate::config::IocConfig;
use crate::id::IdRegistry;
use crate::link::LinkObject;
use crate::service::ServiceObject;

/// Process-global table of online services and live links.
pub struct Registry {
	pub(crate) ids: IdRegistry,
	/// Active process-wide configuration; set once via [`init`] or defaulted
	/// on first [`global`] access.
	pub config: IocConfig,
	services_by_uri: RwLock<HashMap<Uri, SrvId>>,
	services: RwLock<HashMap<SrvId, Arc<ServiceObject>>>,
	links: RwLock<HashMap<LinkId, Arc<LinkObject>>>,
}

impl Registry {
	fn with_config(config: IocConfig) -> Self {
		Self {
			ids: IdRegistry::default(),
			config,
			services_by_uri: RwLock::new(HashMap::new()),
			services: RwLock::new(HashMap::new()),
			links: RwLock::new(HashMap::new()),
		}
	}
}

static GLOBAL: OnceLock<Registry> = OnceLock::new();

/// The process-wide registry singleton.
pub fn global() -> &'static Registry {
	GLOBAL.get_or_init(|| Registry::with_config(IocConfig::default()))
}

/// Initialize the registry with a non-default configuration.
///
/// Must be called before the first [`global`] access; returns `false` if
/// the registry was already initialized.
pub fn init(config: IocConfig) -> bool {
	GLOBAL.set(Registry::with_config(config)).is_ok()
}

impl Registry {
	/// Reserve a URI, returning `false` if it is already online.
	pub async fn reserve_uri(&self, uri: &Uri, srv_id: SrvId) -> bool {
		let mut guard = self.services_by_uri.write().await;
		if guard.contains_key(uri) {
			return false;
		}
		guard.insert(uri.clone(), srv_id);
		true
	}

	/// Release a previously reserved URI.
	pub async fn release_uri(&self, uri: &Uri) {
		self.services_by_uri.write().await.remove(uri);
	}

	/// Look up the `SrvId` online under `uri`, if any.
	pub async fn find_uri(&self, uri: &Uri) -> Option<SrvId> {
		self.services_by_uri.read().await.get(uri).copied()
	}

	/// Insert a newly-onlined service.
	pub async fn insert_service(&self, srv: Arc<ServiceObject>) {
		self.services.write().await.insert(srv.id, srv);
	}

	/// Remove and return a service by id.
	pub async fn remove_service(&self, id: SrvId) -> Option<Arc<ServiceObject>> {
		self.services.write().await.remove(&id)
	}

	/// Fetch a live service by id.
	pub async fn get_service(&self, id: SrvId) -> Option<Arc<ServiceObject>> {
		self.services.read().await.get(&id).cloned()
	}

	/// Insert a newly-created link end.
	pub async fn insert_link(&self, link: Arc<LinkObject>) {
		self.links.write().await.insert(link.id, link);
	}

	/// Remove and return a link end by id.
	pub async fn remove_link(&self, id: LinkId) -> Option<Arc<LinkObject>> {
		self.links.write().await.remove(&id)
	}

	/// Fetch a live link end by id.
	pub async fn get_link(&self, id: LinkId) -> Option<Arc<LinkObject>> {
		self.links.read().await.get(&id).cloned()
	}

	/// Clear all state. Test-only: isolates scenarios that would otherwise
	/// observe services/links left behind by a previous test in the same
	/// process. The crate's tests live in `#[cfg(test)] mod tests` inside
	/// this crate, so gating on `cfg(test)` is enough to keep this out of the
	/// public API surface shipped to dependents.
	#[cfg(test)]
	pub(crate) async fn reset_for_test(&self) {
		self.services_by_uri.write().await.clear();
		self.services.write().await.clear();
		self.links.write().await.clear();
	}
}
