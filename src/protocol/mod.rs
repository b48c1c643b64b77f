//! Protocol descriptors: interfaces, their members, and enumerations.
//!
//! Everything here is pure data, validated once at construction and shared
//! read-only (`Arc`) across connections.

pub mod catalog;
pub mod enums;
pub mod interface;
pub mod message;
pub mod validator;

pub use catalog::{Catalog, ProtocolDef};
pub use enums::{EnumEntry, Enumeration};
pub use interface::{Interface, InterfaceBuilder, InterfaceDef};
pub use message::{ArgDesc, ArgType, MessageDesc, MessageKind};
pub use validator::EnumKind;
