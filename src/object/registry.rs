//! Object registry seam.
//!
//! The registry that owns id allocation lives outside the core; the core only
//! needs `resolve`, `bind` and `release`. [`InMemoryRegistry`] is the
//! per-connection implementation used by the dispatcher and the tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use super::handle::BoundObject;
use crate::protocol::Interface;
use crate::types::{Error, ObjectId, Result};

/// Read-only object lookup, as needed by the argument codec.
pub trait ObjectResolver {
    /// Resolve an id to a live object.
    ///
    /// Fails with `ObjectDestroyed` for ids released but not yet reused, and
    /// `UnknownObject` for anything else that is not bound.
    fn resolve(&self, id: ObjectId) -> Result<BoundObject>;
}

/// Mutable registry of bound objects for one connection.
pub trait ObjectRegistry: ObjectResolver + Send {
    /// Bind `id` to a new object of `interface` at `version`.
    fn bind(&mut self, id: ObjectId, interface: Arc<Interface>, version: u32) -> Result<BoundObject>;

    /// Detach `object` from the registry.
    fn release(&mut self, object: &BoundObject) -> Result<()>;

    /// Number of live objects.
    fn live_count(&self) -> usize;
}

/// Released ids remembered by default.
pub const DEFAULT_RELEASED_CAPACITY: usize = 4096;

/// HashMap-backed registry. Released ids are remembered so that late messages
/// addressed to them fail with `ObjectDestroyed` until the id is reused.
///
/// At most `released_capacity` ids are remembered; the oldest is evicted
/// first and then resolves as `UnknownObject`.
#[derive(Debug)]
pub struct InMemoryRegistry {
    live: HashMap<ObjectId, BoundObject>,
    released: HashSet<ObjectId>,
    /// Release order of the ids in `released`, oldest first.
    released_order: VecDeque<ObjectId>,
    released_capacity: usize,
}

impl Default for InMemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::with_released_capacity(DEFAULT_RELEASED_CAPACITY)
    }

    pub fn with_released_capacity(capacity: usize) -> Self {
        Self {
            live: HashMap::new(),
            released: HashSet::new(),
            released_order: VecDeque::new(),
            released_capacity: capacity,
        }
    }

    /// Forget a released id once the peer has acknowledged its destruction.
    pub fn forget(&mut self, id: ObjectId) -> bool {
        if !self.released.remove(&id) {
            return false;
        }
        self.released_order.retain(|released| *released != id);
        true
    }

    /// Number of released ids still remembered.
    pub fn released_count(&self) -> usize {
        self.released.len()
    }

    fn remember_released(&mut self, id: ObjectId) {
        if self.released_capacity == 0 || !self.released.insert(id) {
            return;
        }
        self.released_order.push_back(id);
        while self.released_order.len() > self.released_capacity {
            if let Some(oldest) = self.released_order.pop_front() {
                self.released.remove(&oldest);
                tracing::trace!(object = oldest.get(), "released id evicted");
            }
        }
    }

    /// Live objects, sorted by id.
    pub fn objects(&self) -> Vec<BoundObject> {
        let mut objects: Vec<BoundObject> = self.live.values().cloned().collect();
        objects.sort_by_key(BoundObject::id);
        objects
    }
}

impl ObjectResolver for InMemoryRegistry {
    fn resolve(&self, id: ObjectId) -> Result<BoundObject> {
        if let Some(object) = self.live.get(&id) {
            object.ensure_alive()?;
            return Ok(object.clone());
        }
        if self.released.contains(&id) {
            return Err(Error::ObjectDestroyed(id));
        }
        Err(Error::UnknownObject(id))
    }
}

impl ObjectRegistry for InMemoryRegistry {
    fn bind(&mut self, id: ObjectId, interface: Arc<Interface>, version: u32) -> Result<BoundObject> {
        if version == 0 || version > interface.version() {
            return Err(Error::UnsupportedVersion {
                interface: interface.name().to_string(),
                requested: version,
                max: interface.version(),
            });
        }
        if self.live.contains_key(&id) {
            return Err(Error::ObjectIdInUse(id));
        }
        self.forget(id);

        let object = BoundObject::new(id, interface, version);
        tracing::debug!(%object, version, "object bound");
        self.live.insert(id, object.clone());
        Ok(object)
    }

    fn release(&mut self, object: &BoundObject) -> Result<()> {
        match self.live.get(&object.id()) {
            Some(bound) if bound.same_instance(object) => {
                self.live.remove(&object.id());
                self.remember_released(object.id());
                tracing::debug!(%object, "object released");
                Ok(())
            }
            _ => Err(Error::UnknownObject(object.id())),
        }
    }

    fn live_count(&self) -> usize {
        self.live.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: u32) -> ObjectId {
        ObjectId::new(raw).unwrap()
    }

    fn interface(version: u32) -> Arc<Interface> {
        Arc::new(Interface::builder("intf_A", version).build().unwrap())
    }

    #[test]
    fn test_bind_and_resolve() {
        let mut registry = InMemoryRegistry::new();
        let obj = registry.bind(id(2), interface(3), 2).unwrap();
        let resolved = registry.resolve(id(2)).unwrap();
        assert!(resolved.same_instance(&obj));
        assert_eq!(resolved.version(), 2);
        assert_eq!(registry.live_count(), 1);
    }

    #[test]
    fn test_bind_rejects_bad_versions_and_reuse() {
        let mut registry = InMemoryRegistry::new();
        assert!(matches!(
            registry.bind(id(2), interface(1), 2),
            Err(Error::UnsupportedVersion { requested: 2, max: 1, .. })
        ));
        assert!(registry.bind(id(2), interface(1), 0).is_err());
        registry.bind(id(2), interface(1), 1).unwrap();
        assert!(matches!(
            registry.bind(id(2), interface(1), 1),
            Err(Error::ObjectIdInUse(_))
        ));
    }

    #[test]
    fn test_released_ids_report_destroyed_until_reused() {
        let mut registry = InMemoryRegistry::new();
        let obj = registry.bind(id(2), interface(1), 1).unwrap();
        registry.release(&obj).unwrap();
        assert!(matches!(registry.resolve(id(2)), Err(Error::ObjectDestroyed(_))));
        assert!(matches!(registry.resolve(id(3)), Err(Error::UnknownObject(_))));

        let again = registry.bind(id(2), interface(1), 1).unwrap();
        assert!(!again.same_instance(&obj));
        assert!(registry.resolve(id(2)).is_ok());
    }

    #[test]
    fn test_release_stale_handle_fails() {
        let mut registry = InMemoryRegistry::new();
        let old = registry.bind(id(2), interface(1), 1).unwrap();
        registry.release(&old).unwrap();
        registry.bind(id(2), interface(1), 1).unwrap();
        assert!(registry.release(&old).is_err());
        assert_eq!(registry.live_count(), 1);
    }

    #[test]
    fn test_forget() {
        let mut registry = InMemoryRegistry::new();
        let obj = registry.bind(id(2), interface(1), 1).unwrap();
        registry.release(&obj).unwrap();
        assert!(registry.forget(id(2)));
        assert!(matches!(registry.resolve(id(2)), Err(Error::UnknownObject(_))));
        assert!(!registry.forget(id(2)));
    }

    #[test]
    fn test_released_ids_stay_bounded() {
        let mut registry = InMemoryRegistry::with_released_capacity(64);
        let intf = interface(1);
        for raw in 1..=10_000 {
            let obj = registry.bind(id(raw), intf.clone(), 1).unwrap();
            registry.release(&obj).unwrap();
        }
        assert_eq!(registry.live_count(), 0);
        assert_eq!(registry.released_count(), 64);

        // The newest ids are still remembered, the oldest were evicted.
        assert!(matches!(registry.resolve(id(10_000)), Err(Error::ObjectDestroyed(_))));
        assert!(matches!(registry.resolve(id(9_937)), Err(Error::ObjectDestroyed(_))));
        assert!(matches!(registry.resolve(id(9_936)), Err(Error::UnknownObject(_))));
        assert!(matches!(registry.resolve(id(1)), Err(Error::UnknownObject(_))));
    }

    #[test]
    fn test_rebinding_released_id_frees_its_slot() {
        let mut registry = InMemoryRegistry::with_released_capacity(2);
        let intf = interface(1);
        let a = registry.bind(id(2), intf.clone(), 1).unwrap();
        let b = registry.bind(id(3), intf.clone(), 1).unwrap();
        registry.release(&a).unwrap();
        registry.release(&b).unwrap();

        let a = registry.bind(id(2), intf.clone(), 1).unwrap();
        assert_eq!(registry.released_count(), 1);
        registry.release(&a).unwrap();

        // Both ids fit; nothing was evicted.
        assert!(matches!(registry.resolve(id(2)), Err(Error::ObjectDestroyed(_))));
        assert!(matches!(registry.resolve(id(3)), Err(Error::ObjectDestroyed(_))));
    }
}
