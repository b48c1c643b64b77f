//! Interface catalog - every interface known to a connection, by name.
//!
//! Owns descriptors, not implementations. Qualified enum references
//! (`"interface.enum"`) are resolved here, once, when protocols are loaded.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use super::enums::Enumeration;
use super::interface::{Interface, InterfaceDef};
use crate::types::{Error, Result};

// =============================================================================
// Protocol description input
// =============================================================================

/// A protocol document: a named group of interfaces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolDef {
    pub name: String,
    #[serde(default)]
    pub interfaces: Vec<InterfaceDef>,
}

impl ProtocolDef {
    pub fn from_json_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// Immutable-after-load set of interface descriptors.
#[derive(Debug, Default, Clone)]
pub struct Catalog {
    interfaces: HashMap<String, Arc<Interface>>,
    protocols: Vec<String>,
}

impl Catalog {
    pub fn new() -> Self {
        Self {
            interfaces: HashMap::new(),
            protocols: Vec::new(),
        }
    }

    /// Build a catalog from protocol documents. Any inconsistency is fatal.
    pub fn from_protocols(protocols: impl IntoIterator<Item = ProtocolDef>) -> Result<Self> {
        let mut catalog = Self::new();
        for protocol in protocols {
            catalog.add_protocol(protocol)?;
        }
        catalog.validate()?;
        Ok(catalog)
    }

    /// Parse and load a single protocol document.
    pub fn from_json_str(s: &str) -> Result<Self> {
        Self::from_protocols([ProtocolDef::from_json_str(s)?])
    }

    /// Add every interface of a protocol. Call [`Catalog::validate`] once all
    /// protocols are in.
    pub fn add_protocol(&mut self, protocol: ProtocolDef) -> Result<()> {
        for def in protocol.interfaces {
            self.add_interface(def.build()?)?;
        }
        tracing::debug!(protocol = %protocol.name, "protocol loaded");
        self.protocols.push(protocol.name);
        Ok(())
    }

    /// Register a single interface.
    pub fn add_interface(&mut self, interface: Interface) -> Result<Arc<Interface>> {
        if self.interfaces.contains_key(interface.name()) {
            return Err(Error::invalid_descriptor(format!(
                "interface '{}' declared twice",
                interface.name()
            )));
        }
        let interface = Arc::new(interface);
        self.interfaces
            .insert(interface.name().to_string(), interface.clone());
        Ok(interface)
    }

    /// Check that every enum reference resolves.
    pub fn validate(&self) -> Result<()> {
        for interface in self.interfaces.values() {
            for member in interface.requests().iter().chain(interface.events()) {
                for arg in &member.args {
                    if let Some(enum_ref) = &arg.enum_ref {
                        if self.resolve_enum(interface, enum_ref).is_none() {
                            return Err(Error::invalid_descriptor(format!(
                                "{}.{}.{}: unknown enum '{}'",
                                interface.name(),
                                member.name,
                                arg.name,
                                enum_ref
                            )));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    pub fn interface(&self, name: &str) -> Option<&Arc<Interface>> {
        self.interfaces.get(name)
    }

    /// Like [`Catalog::interface`], failing with `UnknownInterface`.
    pub fn require(&self, name: &str) -> Result<&Arc<Interface>> {
        self.interfaces
            .get(name)
            .ok_or_else(|| Error::UnknownInterface(name.to_string()))
    }

    pub fn has_interface(&self, name: &str) -> bool {
        self.interfaces.contains_key(name)
    }

    /// Resolve an enum reference as seen from `owner`.
    pub fn resolve_enum<'a>(&'a self, owner: &'a Interface, enum_ref: &str) -> Option<&'a Enumeration> {
        match enum_ref.split_once('.') {
            Some((interface, name)) => self.interfaces.get(interface)?.enumeration(name),
            None => owner.enumeration(enum_ref),
        }
    }

    /// All interface names, sorted.
    pub fn list_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.interfaces.keys().cloned().collect();
        names.sort();
        names
    }

    /// Names of the loaded protocol documents, in load order.
    pub fn protocols(&self) -> &[String] {
        &self.protocols
    }

    /// Human-readable listing of every interface.
    pub fn describe(&self) -> String {
        self.list_names()
            .iter()
            .filter_map(|name| self.describe_interface(name))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Human-readable listing of one interface: header, requests, events and
    /// enumerations, each member with its opcode.
    pub fn describe_interface(&self, name: &str) -> Option<String> {
        let interface = self.interfaces.get(name)?;
        let mut lines = vec![format!("{} v{}", interface.name(), interface.version())];
        for (opcode, request) in interface.requests().iter().enumerate() {
            lines.push(format!("  request {}: {}", opcode, request.to_signature_line()));
        }
        for (opcode, event) in interface.events().iter().enumerate() {
            lines.push(format!("  event {}: {}", opcode, event.to_signature_line()));
        }
        for enumeration in interface.enums() {
            let entries: Vec<String> = enumeration
                .entries
                .iter()
                .map(|e| format!("{}={} (since {})", e.name, e.value, e.since))
                .collect();
            lines.push(format!(
                "  enum {} [{:?}]: {}",
                enumeration.name,
                enumeration.kind,
                entries.join(", ")
            ));
        }
        Some(lines.join("\n"))
    }

    pub fn len(&self) -> usize {
        self.interfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interfaces.is_empty()
    }
}
