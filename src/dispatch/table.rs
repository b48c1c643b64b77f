//! Dispatch tables - one handler slot per request opcode.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::context::RequestContext;
use super::handler::{FnHandler, RequestHandler};
use crate::protocol::Interface;
use crate::types::{Error, Result};
use crate::wire::Argument;

/// Handler slots for one interface, indexed by request opcode.
#[derive(Clone)]
pub struct DispatchTable {
    interface: Arc<Interface>,
    slots: Vec<Option<Arc<dyn RequestHandler>>>,
}

impl DispatchTable {
    /// Empty table sized to the interface's requests.
    pub fn new(interface: &Arc<Interface>) -> Self {
        Self {
            interface: interface.clone(),
            slots: vec![None; interface.requests().len()],
        }
    }

    pub fn interface(&self) -> &Arc<Interface> {
        &self.interface
    }

    /// Install `handler` for the request named `request`.
    pub fn on<H>(mut self, request: &str, handler: H) -> Result<Self>
    where
        H: RequestHandler + 'static,
    {
        let opcode = self.opcode_of(request)?;
        self.set_opcode(opcode, Arc::new(handler))?;
        Ok(self)
    }

    /// Install a closure for the request named `request`.
    pub fn on_fn<F>(self, request: &str, f: F) -> Result<Self>
    where
        F: Fn(&mut RequestContext<'_>, Vec<Argument>) -> Result<()> + Send + Sync + 'static,
    {
        self.on(request, FnHandler(f))
    }

    /// Install `handler` at `opcode`, replacing any previous one.
    pub fn set_opcode(&mut self, opcode: u16, handler: Arc<dyn RequestHandler>) -> Result<()> {
        let slot = self
            .slots
            .get_mut(usize::from(opcode))
            .ok_or_else(|| Error::UnknownOpcode {
                interface: self.interface.name().to_string(),
                opcode,
            })?;
        *slot = Some(handler);
        Ok(())
    }

    /// Handler at `opcode`, if one is registered.
    pub fn handler(&self, opcode: u16) -> Option<&Arc<dyn RequestHandler>> {
        self.slots.get(usize::from(opcode)).and_then(Option::as_ref)
    }

    /// Names of requests without a handler.
    pub fn missing(&self) -> Vec<&str> {
        self.interface
            .requests()
            .iter()
            .zip(&self.slots)
            .filter(|(_, slot)| slot.is_none())
            .map(|(request, _)| request.name.as_str())
            .collect()
    }

    fn opcode_of(&self, request: &str) -> Result<u16> {
        self.interface.request_opcode(request).ok_or_else(|| {
            Error::invalid_descriptor(format!(
                "{} has no request '{}'",
                self.interface.name(),
                request
            ))
        })
    }
}

impl fmt::Debug for DispatchTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchTable")
            .field("interface", &self.interface.name())
            .field("registered", &self.slots.iter().filter(|s| s.is_some()).count())
            .field("missing", &self.missing())
            .finish()
    }
}

/// Dispatch tables for every implemented interface, keyed by interface name.
#[derive(Debug, Default, Clone)]
pub struct HandlerSet {
    tables: HashMap<String, DispatchTable>,
}

impl HandlerSet {
    pub fn new() -> Self {
        Self {
            tables: HashMap::new(),
        }
    }

    /// Add a table, replacing any table for the same interface.
    pub fn insert(&mut self, table: DispatchTable) {
        self.tables
            .insert(table.interface().name().to_string(), table);
    }

    pub fn with(mut self, table: DispatchTable) -> Self {
        self.insert(table);
        self
    }

    pub fn table(&self, interface: &str) -> Option<&DispatchTable> {
        self.tables.get(interface)
    }

    /// Handler for `(interface, opcode)`.
    pub fn handler(&self, interface: &str, opcode: u16) -> Option<&Arc<dyn RequestHandler>> {
        self.tables.get(interface).and_then(|t| t.handler(opcode))
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
