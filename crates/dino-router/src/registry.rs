use crate::descriptor::ServiceDescriptor;
use crate::error::RouterError;
use crate::health::HealthSnapshot;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Thread-safe store of registered services, keyed by name.
///
/// Descriptors are handed out as `Arc<ServiceDescriptor>` clones so callers
/// can read a consistent snapshot without holding the registry lock across
/// an adapter call — mirroring the source's "copy then release the lock"
/// pattern around its in-memory service dict.
pub struct ServiceRegistry {
	services: Mutex<HashMap<String, Arc<ServiceDescriptor>>>,
}

impl Default for ServiceRegistry {
	fn default() -> Self {
		Self::new()
	}
}

impl ServiceRegistry {
	pub fn new() -> Self {
		Self {
			services: Mutex::new(HashMap::new()),
		}
	}

	/// Insert or replace a descriptor under its own name.
	pub fn register(&self, descriptor: ServiceDescriptor) {
		let mut guard = self.services.lock();
		guard.insert(descriptor.name.clone(), Arc::new(descriptor));
	}

	/// Remove a descriptor by name. Returns whether one was present.
	pub fn unregister(&self, name: &str) -> bool {
		self.services.lock().remove(name).is_some()
	}

	pub fn get_by_name(&self, name: &str) -> Option<Arc<ServiceDescriptor>> {
		self.services.lock().get(name).cloned()
	}

	pub fn require_by_name(&self, name: &str) -> Result<Arc<ServiceDescriptor>, RouterError> {
		self.get_by_name(name).ok_or_else(|| RouterError::service_not_found(name))
	}

	/// Services carrying `tag`, in the name-lexicographic order the
	/// `first_healthy` policy relies on.
	pub fn get_by_tag(&self, tag: &str) -> Vec<Arc<ServiceDescriptor>> {
		let guard = self.services.lock();
		let mut found: Vec<_> = guard.values().filter(|d| d.has_tag(tag)).cloned().collect();
		found.sort_by(|a, b| a.name.cmp(&b.name));
		found
	}

	/// Snapshot of every registered service, in name-lexicographic order.
	pub fn list(&self) -> Vec<Arc<ServiceDescriptor>> {
		let guard = self.services.lock();
		let mut all: Vec<_> = guard.values().cloned().collect();
		all.sort_by(|a, b| a.name.cmp(&b.name));
		all
	}

	pub fn len(&self) -> usize {
		self.services.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Replace a descriptor's health snapshot wholesale. No-op (returns
	/// `false`) if the named service isn't registered — health updates for a
	/// service that was concurrently unregistered are dropped silently,
	/// matching the source's best-effort `update_health`.
	pub fn update_health(&self, name: &str, snapshot: HealthSnapshot) -> bool {
		let mut guard = self.services.lock();
		let Some(existing) = guard.get(name) else {
			return false;
		};
		let mut replacement = (**existing).clone();
		replacement.health = Some(snapshot);
		guard.insert(name.to_string(), Arc::new(replacement));
		true
	}
}
