//! Interface descriptors.
//!
//! An [`Interface`] is a passive, validated schema: its requests and events
//! are addressed by opcode (their position), so the builder only ever appends.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::enums::Enumeration;
use super::message::MessageDesc;
use crate::types::{Error, Result};
use crate::validation::{validate_non_empty, validate_positive, validate_since};

/// Maximum number of requests or events an interface can declare.
pub const MAX_MEMBERS: usize = u16::MAX as usize + 1;

/// Validated interface descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Interface {
    name: String,
    version: u32,
    requests: Vec<MessageDesc>,
    events: Vec<MessageDesc>,
    enums: Vec<Enumeration>,
}

impl Interface {
    pub fn builder(name: impl Into<String>, version: u32) -> InterfaceBuilder {
        InterfaceBuilder {
            name: name.into(),
            version,
            requests: Vec::new(),
            events: Vec::new(),
            enums: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn requests(&self) -> &[MessageDesc] {
        &self.requests
    }

    pub fn events(&self) -> &[MessageDesc] {
        &self.events
    }

    pub fn enums(&self) -> &[Enumeration] {
        &self.enums
    }

    pub fn request(&self, opcode: u16) -> Option<&MessageDesc> {
        self.requests.get(usize::from(opcode))
    }

    pub fn event(&self, opcode: u16) -> Option<&MessageDesc> {
        self.events.get(usize::from(opcode))
    }

    pub fn request_opcode(&self, name: &str) -> Option<u16> {
        opcode_of(&self.requests, name)
    }

    pub fn event_opcode(&self, name: &str) -> Option<u16> {
        opcode_of(&self.events, name)
    }

    pub fn enumeration(&self, name: &str) -> Option<&Enumeration> {
        self.enums.iter().find(|e| e.name == name)
    }

    /// Start a newer revision of this interface. Existing members keep their
    /// opcodes; the builder can only append.
    pub fn evolve(&self, version: u32) -> Result<InterfaceBuilder> {
        if version < self.version {
            return Err(Error::invalid_descriptor(format!(
                "{}: version cannot decrease from {} to {}",
                self.name, self.version, version
            )));
        }
        Ok(InterfaceBuilder {
            name: self.name.clone(),
            version,
            requests: self.requests.clone(),
            events: self.events.clone(),
            enums: self.enums.clone(),
        })
    }
}

fn opcode_of(members: &[MessageDesc], name: &str) -> Option<u16> {
    members
        .iter()
        .position(|m| m.name == name)
        .and_then(|p| u16::try_from(p).ok())
}

/// Append-only builder for [`Interface`].
#[derive(Debug, Clone)]
pub struct InterfaceBuilder {
    name: String,
    version: u32,
    requests: Vec<MessageDesc>,
    events: Vec<MessageDesc>,
    enums: Vec<Enumeration>,
}

impl InterfaceBuilder {
    pub fn request(mut self, request: MessageDesc) -> Self {
        self.requests.push(request);
        self
    }

    pub fn event(mut self, event: MessageDesc) -> Self {
        self.events.push(event);
        self
    }

    pub fn enumeration(mut self, enumeration: Enumeration) -> Self {
        self.enums.push(enumeration);
        self
    }

    /// Validate and freeze the descriptor.
    ///
    /// Fails with `InvalidDescriptor` when a member is introduced after the
    /// interface version, when `since` decreases along a member sequence, when
    /// names collide, or when a local enum reference does not resolve.
    pub fn build(self) -> Result<Interface> {
        validate_non_empty(&self.name, "interface name")?;
        validate_positive(self.version, &format!("{}: version", self.name))?;

        check_members(&self.name, "request", &self.requests, self.version)?;
        check_members(&self.name, "event", &self.events, self.version)?;

        let mut enum_names = HashSet::new();
        for enumeration in &self.enums {
            if !enum_names.insert(enumeration.name.as_str()) {
                return Err(Error::invalid_descriptor(format!(
                    "{}: enum '{}' declared twice",
                    self.name, enumeration.name
                )));
            }
            enumeration.check(&self.name, self.version)?;
        }

        for member in self.requests.iter().chain(self.events.iter()) {
            for arg in &member.args {
                if let Some(enum_ref) = &arg.enum_ref {
                    if !enum_ref.contains('.') && !enum_names.contains(enum_ref.as_str()) {
                        return Err(Error::invalid_descriptor(format!(
                            "{}.{}.{}: unknown enum '{}'",
                            self.name, member.name, arg.name, enum_ref
                        )));
                    }
                }
            }
        }

        Ok(Interface {
            name: self.name,
            version: self.version,
            requests: self.requests,
            events: self.events,
            enums: self.enums,
        })
    }
}

fn check_members(interface: &str, what: &str, members: &[MessageDesc], version: u32) -> Result<()> {
    if members.len() > MAX_MEMBERS {
        return Err(Error::invalid_descriptor(format!(
            "{}: too many {}s ({})",
            interface,
            what,
            members.len()
        )));
    }
    let mut names = HashSet::new();
    let mut previous_since = 1;
    for member in members {
        let field = format!("{}.{}", interface, member.name);
        validate_non_empty(&member.name, &format!("{}: {} name", interface, what))?;
        if !names.insert(member.name.as_str()) {
            return Err(Error::invalid_descriptor(format!("{} declared twice", field)));
        }
        validate_since(member.since, version, &field)?;
        if member.since < previous_since {
            return Err(Error::invalid_descriptor(format!(
                "{} is since version {} but follows a member since version {}",
                field, member.since, previous_since
            )));
        }
        previous_since = member.since;
        for arg in &member.args {
            arg.check(&field).map_err(Error::invalid_descriptor)?;
        }
        if what == "event" && member.is_destructor() {
            return Err(Error::invalid_descriptor(format!(
                "{}: events cannot be destructors",
                field
            )));
        }
    }
    Ok(())
}

/// Serializable description of one interface, as produced by a protocol
/// description compiler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterfaceDef {
    pub name: String,
    pub version: u32,
    #[serde(default)]
    pub requests: Vec<MessageDesc>,
    #[serde(default)]
    pub events: Vec<MessageDesc>,
    #[serde(default)]
    pub enums: Vec<Enumeration>,
}

impl InterfaceDef {
    pub fn build(self) -> Result<Interface> {
        let mut builder = Interface::builder(self.name, self.version);
        builder.requests = self.requests;
        builder.events = self.events;
        builder.enums = self.enums;
        builder.build()
    }
}
