//! Per-connection dispatcher.
//!
//! Incoming requests go through a fixed pipeline:
//! resolve target → opcode → version gate → decode → enum check → handler.
//! The version gate runs before decoding, so a request too new for the
//! object is rejected even when its arguments are garbage.

use bytes::Bytes;
use std::sync::Arc;

use super::context::RequestContext;
use super::table::HandlerSet;
use crate::object::{BoundObject, InMemoryRegistry, ObjectRegistry};
use crate::protocol::{Catalog, Interface, MessageDesc};
use crate::transport::Transport;
use crate::types::{Error, ObjectId, Result, WireConfig};
use crate::wire::{codec, Argument, FdQueue, RawMessage};

/// Routes requests for one connection. Owns that connection's registry.
pub struct Dispatcher<R: ObjectRegistry = InMemoryRegistry> {
    catalog: Arc<Catalog>,
    handlers: Arc<HandlerSet>,
    registry: R,
    transport: Arc<dyn Transport>,
    wire: WireConfig,
}

impl Dispatcher<InMemoryRegistry> {
    pub fn new(catalog: Arc<Catalog>, handlers: Arc<HandlerSet>, transport: Arc<dyn Transport>) -> Self {
        Self::with_registry(catalog, handlers, transport, InMemoryRegistry::new())
    }
}

impl<R: ObjectRegistry> Dispatcher<R> {
    pub fn with_registry(
        catalog: Arc<Catalog>,
        handlers: Arc<HandlerSet>,
        transport: Arc<dyn Transport>,
        registry: R,
    ) -> Self {
        Self {
            catalog,
            handlers,
            registry,
            transport,
            wire: WireConfig::default(),
        }
    }

    pub fn with_wire_config(mut self, wire: WireConfig) -> Self {
        self.wire = wire;
        self
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut R {
        &mut self.registry
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Bind a well-known object outside of any request, typically the
    /// connection's root object.
    pub fn bind_root(&mut self, id: ObjectId, interface: &str, version: u32) -> Result<BoundObject> {
        let interface = self.catalog.require(interface)?.clone();
        self.registry.bind(id, interface, version)
    }

    /// Destroy an object from the server side.
    pub fn destroy(&mut self, object: &BoundObject) -> Result<()> {
        super::destroy_object(&mut self.registry, self.transport.as_ref(), object)
    }

    pub fn dispatch_raw(&mut self, message: RawMessage, fds: &mut FdQueue) -> Result<()> {
        self.dispatch(message.object, message.opcode, message.payload, fds)
    }

    /// Route one request to its handler.
    pub fn dispatch(&mut self, target: ObjectId, opcode: u16, payload: Bytes, fds: &mut FdQueue) -> Result<()> {
        let object = self.registry.resolve(target)?;
        let interface = object.interface().clone();

        let request = interface.request(opcode).ok_or_else(|| Error::UnknownOpcode {
            interface: interface.name().to_string(),
            opcode,
        })?;

        if object.version() < request.since {
            tracing::debug!(
                %object,
                request = %request.name,
                since = request.since,
                "request newer than object version"
            );
            return Err(Error::VersionTooLow {
                interface: interface.name().to_string(),
                member: request.name.clone(),
                since: request.since,
                version: object.version(),
            });
        }

        let mut body = payload;
        let args = codec::decode_args(&request.args, &mut body, fds, &self.registry)?;
        self.check_enums(&interface, request, &args, object.version())?;

        tracing::debug!(%object, request = %request.name, "dispatching request");

        let Some(handler) = self.handlers.handler(interface.name(), opcode).cloned() else {
            tracing::warn!(%object, request = %request.name, "no handler, destroying object");
            if let Err(e) = self.destroy(&object) {
                tracing::warn!(%object, error = %e, "destroy of unimplemented object failed");
            }
            return Err(Error::Unimplemented {
                interface: interface.name().to_string(),
                request: request.name.clone(),
            });
        };

        let result = {
            let mut ctx = RequestContext::new(
                object.clone(),
                opcode,
                &self.catalog,
                &mut self.registry,
                self.transport.as_ref(),
                &self.wire,
            );
            handler.handle(&mut ctx, args)
        };

        if request.is_destructor() {
            if let Err(e) = self.destroy(&object) {
                if result.is_ok() {
                    return Err(e);
                }
                tracing::warn!(%object, error = %e, "destroy after failed destructor failed");
            }
        }
        result
    }

    fn check_enums(&self, interface: &Interface, request: &MessageDesc, args: &[Argument], version: u32) -> Result<()> {
        for (desc, arg) in request.args.iter().zip(args) {
            let Some(enum_ref) = desc.enum_ref.as_deref() else {
                continue;
            };
            let Some(value) = arg.as_wire_u32() else {
                continue;
            };
            let enumeration = self.catalog.resolve_enum(interface, enum_ref).ok_or_else(|| {
                Error::invalid_descriptor(format!(
                    "{}.{} refers to unknown enum '{}'",
                    interface.name(),
                    request.name,
                    enum_ref
                ))
            })?;
            if !enumeration.accepts(value, version) {
                return Err(Error::InvalidEnum {
                    enumeration: enumeration.name.clone(),
                    value,
                    version,
                });
            }
        }
        Ok(())
    }
}

impl<R: ObjectRegistry> std::fmt::Debug for Dispatcher<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("interfaces", &self.catalog.len())
            .field("handlers", &self.handlers.len())
            .field("live_objects", &self.registry.live_count())
            .finish()
    }
}
