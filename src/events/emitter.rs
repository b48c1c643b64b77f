//! Event emitter - encodes and sends one event of one interface.

use std::sync::Arc;

use crate::object::BoundObject;
use crate::protocol::{Interface, MessageDesc};
use crate::transport::Transport;
use crate::types::{Error, Result, WireConfig};
use crate::wire::{codec, Argument};

/// Sender for a single Interface×Event pair. The wire opcode is the event's
/// position in the interface, fixed at construction.
#[derive(Debug, Clone)]
pub struct EventEmitter {
    interface: Arc<Interface>,
    opcode: u16,
    wire: WireConfig,
}

impl EventEmitter {
    /// Emitter for the event called `event`.
    pub fn new(interface: &Arc<Interface>, event: &str) -> Result<Self> {
        let opcode = interface.event_opcode(event).ok_or_else(|| {
            Error::invalid_descriptor(format!("{} has no event '{}'", interface.name(), event))
        })?;
        Ok(Self {
            interface: interface.clone(),
            opcode,
            wire: WireConfig::default(),
        })
    }

    /// Emitter for the event at `opcode`.
    pub fn from_opcode(interface: &Arc<Interface>, opcode: u16) -> Result<Self> {
        if interface.event(opcode).is_none() {
            return Err(Error::UnknownOpcode {
                interface: interface.name().to_string(),
                opcode,
            });
        }
        Ok(Self {
            interface: interface.clone(),
            opcode,
            wire: WireConfig::default(),
        })
    }

    pub fn with_wire_config(mut self, wire: WireConfig) -> Self {
        self.wire = wire;
        self
    }

    pub fn opcode(&self) -> u16 {
        self.opcode
    }

    pub fn descriptor(&self) -> &MessageDesc {
        // Checked at construction; events are never removed from an interface.
        &self.interface.events()[usize::from(self.opcode)]
    }

    /// Encode `args` and send the event to the peer owning `object`.
    ///
    /// Encoding problems are returned to the caller and nothing is sent. A
    /// closed transport is not an error: events have no reply, so there is
    /// no one left to tell.
    pub fn send(&self, object: &BoundObject, transport: &dyn Transport, args: Vec<Argument>) -> Result<()> {
        if object.interface().name() != self.interface.name() {
            return Err(Error::InterfaceMismatch {
                object: object.id(),
                expected: self.interface.name().to_string(),
                actual: object.interface().name().to_string(),
            });
        }
        object.ensure_alive()?;

        let event = self.descriptor();
        if object.version() < event.since {
            return Err(Error::VersionTooLow {
                interface: self.interface.name().to_string(),
                member: event.name.clone(),
                since: event.since,
                version: object.version(),
            });
        }

        let message = codec::encode_message(object.id(), self.opcode, event, args, &self.wire)?;
        match transport.send_message(message) {
            Ok(()) => {
                tracing::trace!(%object, event = %event.name, "event sent");
                Ok(())
            }
            Err(Error::TransportClosed) => {
                tracing::debug!(%object, event = %event.name, "transport closed, event dropped");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
