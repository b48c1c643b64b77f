//! Decoded argument values.

use std::collections::VecDeque;
use std::os::fd::{AsRawFd, OwnedFd};

use super::fixed::Fixed;
use crate::protocol::ArgType;
use crate::types::ObjectId;

/// Id of a new object together with the interface its parameter declares.
///
/// Decoding fills `interface` from the signature, so a handler binds the
/// object as what the protocol says it is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedNewId {
    pub id: ObjectId,
    pub interface: String,
}

impl TypedNewId {
    pub fn new(id: ObjectId, interface: impl Into<String>) -> Self {
        Self {
            id,
            interface: interface.into(),
        }
    }
}

/// Interface name, version and id carried by a dynamically typed new_id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewObject {
    pub interface: String,
    pub version: u32,
    pub id: ObjectId,
}

/// One argument value, in declared parameter order.
#[derive(Debug)]
pub enum Argument {
    Int(i32),
    Uint(u32),
    Fixed(Fixed),
    /// `None` is the null string.
    Str(Option<String>),
    Fd(OwnedFd),
    /// `None` is the null object.
    Object(Option<ObjectId>),
    /// Id for a new object of a statically known interface.
    NewId(TypedNewId),
    /// Id for a new object whose interface travels on the wire.
    NewObject(NewObject),
    Array(Vec<u8>),
}

impl Argument {
    /// The parameter type this value encodes as.
    pub fn arg_type(&self) -> ArgType {
        match self {
            Argument::Int(_) => ArgType::Int,
            Argument::Uint(_) => ArgType::Uint,
            Argument::Fixed(_) => ArgType::Fixed,
            Argument::Str(_) => ArgType::String,
            Argument::Fd(_) => ArgType::Fd,
            Argument::Object(_) => ArgType::Object,
            Argument::NewId(_) | Argument::NewObject(_) => ArgType::NewId,
            Argument::Array(_) => ArgType::Array,
        }
    }

    pub fn string(s: impl Into<String>) -> Self {
        Argument::Str(Some(s.into()))
    }

    pub fn object(id: ObjectId) -> Self {
        Argument::Object(Some(id))
    }

    pub fn new_id(id: ObjectId, interface: impl Into<String>) -> Self {
        Argument::NewId(TypedNewId::new(id, interface))
    }

    /// Value of an int or uint argument as its 32-bit wire pattern.
    pub fn as_wire_u32(&self) -> Option<u32> {
        match self {
            Argument::Int(i) => Some(*i as u32),
            Argument::Uint(u) => Some(*u),
            _ => None,
        }
    }
}

impl PartialEq for Argument {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Argument::Int(a), Argument::Int(b)) => a == b,
            (Argument::Uint(a), Argument::Uint(b)) => a == b,
            (Argument::Fixed(a), Argument::Fixed(b)) => a == b,
            (Argument::Str(a), Argument::Str(b)) => a == b,
            (Argument::Fd(a), Argument::Fd(b)) => a.as_raw_fd() == b.as_raw_fd(),
            (Argument::Object(a), Argument::Object(b)) => a == b,
            (Argument::NewId(a), Argument::NewId(b)) => a == b,
            (Argument::NewObject(a), Argument::NewObject(b)) => a == b,
            (Argument::Array(a), Argument::Array(b)) => a == b,
            _ => false,
        }
    }
}

/// Out-of-band file descriptors received alongside the byte stream, consumed
/// in order by `fd` parameters.
#[derive(Debug, Default)]
pub struct FdQueue {
    fds: VecDeque<OwnedFd>,
}

impl FdQueue {
    pub fn new() -> Self {
        Self {
            fds: VecDeque::new(),
        }
    }

    pub fn push(&mut self, fd: OwnedFd) {
        self.fds.push_back(fd);
    }

    /// Next descriptor, or `None` when the side channel is exhausted.
    pub fn pop(&mut self) -> Option<OwnedFd> {
        self.fds.pop_front()
    }

    pub fn len(&self) -> usize {
        self.fds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fds.is_empty()
    }
}

impl FromIterator<OwnedFd> for FdQueue {
    fn from_iter<I: IntoIterator<Item = OwnedFd>>(iter: I) -> Self {
        Self {
            fds: iter.into_iter().collect(),
        }
    }
}
