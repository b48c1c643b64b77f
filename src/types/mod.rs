//! Core types shared by every layer.
//!
//! - **IDs**: Strongly-typed wire identifiers (ObjectId)
//! - **Errors**: Error taxonomy with thiserror derives
//! - **Config**: Wire limits, dispatch policy, server and observability settings

mod config;
mod errors;
mod ids;

pub use config::{
    Config, DispatchConfig, ObservabilityConfig, ServerConfig, WireConfig, WIRE_SIZE_LIMIT,
};
pub use errors::{Error, ErrorKind, Result};
pub use ids::{raw_or_null, ObjectId};
