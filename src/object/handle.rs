//! Bound object handles.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::protocol::Interface;
use crate::types::{Error, ObjectId, Result};

#[derive(Debug)]
struct ObjectState {
    id: ObjectId,
    interface: Arc<Interface>,
    version: u32,
    destroyed: AtomicBool,
    cancel: CancellationToken,
}

/// One instantiated endpoint of an interface at a fixed negotiated version.
///
/// Cheap to clone; every clone observes destruction. Handler closures keep
/// clones and call [`BoundObject::ensure_alive`] before touching the object.
#[derive(Clone)]
pub struct BoundObject {
    state: Arc<ObjectState>,
}

impl BoundObject {
    pub(crate) fn new(id: ObjectId, interface: Arc<Interface>, version: u32) -> Self {
        Self {
            state: Arc::new(ObjectState {
                id,
                interface,
                version,
                destroyed: AtomicBool::new(false),
                cancel: CancellationToken::new(),
            }),
        }
    }

    pub fn id(&self) -> ObjectId {
        self.state.id
    }

    pub fn interface(&self) -> &Arc<Interface> {
        &self.state.interface
    }

    /// Negotiated version, fixed for the object's lifetime.
    pub fn version(&self) -> u32 {
        self.state.version
    }

    pub fn is_alive(&self) -> bool {
        !self.state.destroyed.load(Ordering::Acquire)
    }

    /// Fail with `ObjectDestroyed` once the object has been destroyed.
    pub fn ensure_alive(&self) -> Result<()> {
        if self.is_alive() {
            Ok(())
        } else {
            Err(Error::ObjectDestroyed(self.state.id))
        }
    }

    /// Token cancelled when the object is destroyed, for async work scoped to
    /// the object.
    pub fn cancellation(&self) -> CancellationToken {
        self.state.cancel.clone()
    }

    /// Mark the object destroyed. Returns `true` only for the call that
    /// performed the transition.
    pub(crate) fn invalidate(&self) -> bool {
        let first = !self.state.destroyed.swap(true, Ordering::AcqRel);
        if first {
            self.state.cancel.cancel();
        }
        first
    }

    /// Whether both handles refer to the same bound instance.
    pub fn same_instance(&self, other: &BoundObject) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }
}

impl fmt::Debug for BoundObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundObject")
            .field("id", &self.state.id)
            .field("interface", &self.state.interface.name())
            .field("version", &self.state.version)
            .field("alive", &self.is_alive())
            .finish()
    }
}

impl fmt::Display for BoundObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.state.interface.name(), self.state.id.get())
    }
}
