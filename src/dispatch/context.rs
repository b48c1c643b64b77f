//! Per-request context handed to handlers.

use std::fmt;

use crate::events::EventEmitter;
use crate::object::{BoundObject, ObjectRegistry};
use crate::protocol::{ArgType, Catalog};
use crate::transport::Transport;
use crate::types::{Error, ObjectId, Result, WireConfig};
use crate::wire::{Argument, NewObject, TypedNewId};

/// What a handler can see and do while serving one request.
pub struct RequestContext<'a> {
    object: BoundObject,
    opcode: u16,
    catalog: &'a Catalog,
    registry: &'a mut dyn ObjectRegistry,
    transport: &'a dyn Transport,
    wire: &'a WireConfig,
}

impl<'a> RequestContext<'a> {
    pub(crate) fn new(
        object: BoundObject,
        opcode: u16,
        catalog: &'a Catalog,
        registry: &'a mut dyn ObjectRegistry,
        transport: &'a dyn Transport,
        wire: &'a WireConfig,
    ) -> Self {
        Self {
            object,
            opcode,
            catalog,
            registry,
            transport,
            wire,
        }
    }

    /// The object the request was sent to.
    pub fn object(&self) -> &BoundObject {
        &self.object
    }

    /// Negotiated version of the dispatching object.
    pub fn version(&self) -> u32 {
        self.object.version()
    }

    pub fn opcode(&self) -> u16 {
        self.opcode
    }

    pub fn catalog(&self) -> &Catalog {
        self.catalog
    }

    pub fn transport(&self) -> &dyn Transport {
        self.transport
    }

    pub fn resolve(&self, id: ObjectId) -> Result<BoundObject> {
        self.registry.resolve(id)
    }

    /// Bind a typed new_id as the interface its parameter declares. The
    /// child inherits the dispatching object's version, capped at the child
    /// interface's own maximum.
    ///
    /// `new_id.interface` must be one the current request declares for a
    /// typed new_id; anything else is an `InterfaceMismatch`.
    pub fn bind_typed(&mut self, new_id: &TypedNewId) -> Result<BoundObject> {
        let declared: Vec<&str> = self
            .object
            .interface()
            .request(self.opcode)
            .map(|request| {
                request
                    .args
                    .iter()
                    .filter(|arg| arg.arg_type == ArgType::NewId)
                    .filter_map(|arg| arg.interface.as_deref())
                    .collect()
            })
            .unwrap_or_default();
        if !declared.contains(&new_id.interface.as_str()) {
            return Err(Error::InterfaceMismatch {
                object: new_id.id,
                expected: declared.join("|"),
                actual: new_id.interface.clone(),
            });
        }

        let interface = self.catalog.require(&new_id.interface)?.clone();
        let version = self.version().min(interface.version());
        self.registry.bind(new_id.id, interface, version)
    }

    /// Bind a dynamically typed new_id.
    ///
    /// The named interface must exist, and the requested version must be at
    /// least 1 and exceed neither the dispatching object's own version nor
    /// the interface's maximum.
    pub fn bind_dynamic(&mut self, request: &NewObject) -> Result<BoundObject> {
        let interface = self.catalog.require(&request.interface)?.clone();
        let max = self.version().min(interface.version());
        if request.version == 0 || request.version > max {
            tracing::warn!(
                object = %self.object,
                interface = %request.interface,
                requested = request.version,
                max,
                "rejected new object version"
            );
            return Err(Error::UnsupportedVersion {
                interface: request.interface.clone(),
                requested: request.version,
                max,
            });
        }
        self.registry.bind(request.id, interface, request.version)
    }

    /// Destroy `object`: invalidate it, detach it, and notify the peer.
    pub fn destroy(&mut self, object: &BoundObject) -> Result<()> {
        super::destroy_object(self.registry, self.transport, object)
    }

    /// Send the event called `event` on `object`.
    pub fn send_event(&self, object: &BoundObject, event: &str, args: Vec<Argument>) -> Result<()> {
        EventEmitter::new(object.interface(), event)?
            .with_wire_config(self.wire.clone())
            .send(object, self.transport, args)
    }
}

impl fmt::Debug for RequestContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("object", &self.object)
            .field("opcode", &self.opcode)
            .finish()
    }
}
