//! Application error types.
//!
//! All errors use `thiserror` for automatic Error trait derivation. Decoding and
//! validation errors are scoped to one message and one object; whether a given
//! kind tears down the whole connection is decided by the embedding (see
//! [`crate::types::DispatchConfig`]).

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::ids::ObjectId;

/// Application result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error enum for the protocol core.
#[derive(Error, Debug)]
pub enum Error {
    /// An argument on the wire (or handed to the encoder) is not well formed.
    #[error("malformed argument: {0}")]
    MalformedArgument(String),

    /// A value cannot be represented in its wire form.
    #[error("value out of range: {0}")]
    OutOfRange(String),

    /// A file descriptor argument was expected but the side channel is empty.
    #[error("missing file descriptor for argument '{0}'")]
    MissingDescriptor(String),

    /// An object id does not resolve to a live or recently destroyed object.
    #[error("unknown object {0}")]
    UnknownObject(ObjectId),

    /// An object resolved to a different interface than the one required.
    #[error("object {object} implements '{actual}', expected '{expected}'")]
    InterfaceMismatch {
        object: ObjectId,
        expected: String,
        actual: String,
    },

    /// The opcode is outside the interface's declared member range.
    #[error("interface '{interface}' has no member with opcode {opcode}")]
    UnknownOpcode { interface: String, opcode: u16 },

    /// The member was introduced after the object's negotiated version.
    #[error("{interface}.{member} requires version {since}, object is bound at version {version}")]
    VersionTooLow {
        interface: String,
        member: String,
        since: u32,
        version: u32,
    },

    /// No handler is registered for the request.
    #[error("{interface}.{request} is not implemented")]
    Unimplemented { interface: String, request: String },

    /// The object has been destroyed.
    #[error("object {0} has been destroyed")]
    ObjectDestroyed(ObjectId),

    /// An enum-typed argument carries a value not valid at the object's version.
    #[error("value {value:#x} is not a valid '{enumeration}' at version {version}")]
    InvalidEnum {
        enumeration: String,
        value: u32,
        version: u32,
    },

    /// The named interface is not known to the catalog.
    #[error("unknown interface '{0}'")]
    UnknownInterface(String),

    /// A requested version is outside what may be bound.
    #[error("version {requested} of '{interface}' is not supported (max {max})")]
    UnsupportedVersion {
        interface: String,
        requested: u32,
        max: u32,
    },

    /// A new-id names an id that is already bound to a live object.
    #[error("object id {0} is already in use")]
    ObjectIdInUse(ObjectId),

    /// A protocol description is internally inconsistent.
    #[error("invalid protocol description: {0}")]
    InvalidDescriptor(String),

    /// The transport is closed.
    #[error("transport closed")]
    TransportClosed,

    /// Serialization/deserialization errors.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Discriminant of [`Error`], used by configuration to classify errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    MalformedArgument,
    OutOfRange,
    MissingDescriptor,
    UnknownObject,
    InterfaceMismatch,
    UnknownOpcode,
    VersionTooLow,
    Unimplemented,
    ObjectDestroyed,
    InvalidEnum,
    UnknownInterface,
    UnsupportedVersion,
    ObjectIdInUse,
    InvalidDescriptor,
    TransportClosed,
    Serialization,
    Io,
}

impl Error {
    /// Kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::MalformedArgument(_) => ErrorKind::MalformedArgument,
            Error::OutOfRange(_) => ErrorKind::OutOfRange,
            Error::MissingDescriptor(_) => ErrorKind::MissingDescriptor,
            Error::UnknownObject(_) => ErrorKind::UnknownObject,
            Error::InterfaceMismatch { .. } => ErrorKind::InterfaceMismatch,
            Error::UnknownOpcode { .. } => ErrorKind::UnknownOpcode,
            Error::VersionTooLow { .. } => ErrorKind::VersionTooLow,
            Error::Unimplemented { .. } => ErrorKind::Unimplemented,
            Error::ObjectDestroyed(_) => ErrorKind::ObjectDestroyed,
            Error::InvalidEnum { .. } => ErrorKind::InvalidEnum,
            Error::UnknownInterface(_) => ErrorKind::UnknownInterface,
            Error::UnsupportedVersion { .. } => ErrorKind::UnsupportedVersion,
            Error::ObjectIdInUse(_) => ErrorKind::ObjectIdInUse,
            Error::InvalidDescriptor(_) => ErrorKind::InvalidDescriptor,
            Error::TransportClosed => ErrorKind::TransportClosed,
            Error::Serialization(_) => ErrorKind::Serialization,
            Error::Io(_) => ErrorKind::Io,
        }
    }

    /// Numeric protocol error code reported to the peer.
    ///
    /// Codes follow the display error convention: 0 invalid object,
    /// 1 invalid method, 2 no memory, 3 implementation error.
    pub fn to_wire_code(&self) -> u32 {
        match self.kind() {
            ErrorKind::UnknownObject
            | ErrorKind::ObjectDestroyed
            | ErrorKind::InterfaceMismatch
            | ErrorKind::ObjectIdInUse => 0,
            ErrorKind::MalformedArgument
            | ErrorKind::OutOfRange
            | ErrorKind::MissingDescriptor
            | ErrorKind::UnknownOpcode
            | ErrorKind::VersionTooLow
            | ErrorKind::InvalidEnum
            | ErrorKind::UnknownInterface
            | ErrorKind::UnsupportedVersion => 1,
            ErrorKind::Io | ErrorKind::TransportClosed => 2,
            ErrorKind::Unimplemented | ErrorKind::InvalidDescriptor | ErrorKind::Serialization => 3,
        }
    }
}

// Convenience constructors
impl Error {
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedArgument(msg.into())
    }

    pub fn out_of_range(msg: impl Into<String>) -> Self {
        Self::OutOfRange(msg.into())
    }

    pub fn missing_descriptor(arg: impl Into<String>) -> Self {
        Self::MissingDescriptor(arg.into())
    }

    pub fn invalid_descriptor(msg: impl Into<String>) -> Self {
        Self::InvalidDescriptor(msg.into())
    }
}
