//! # objwire - Versioned Object Wire Protocol Core
//!
//! Rust implementation of a Wayland-style object protocol:
//! - Interface descriptors with append-only, version-gated requests and events
//! - Argument codec for the 32-bit word wire format, with fds on a side channel
//! - Table-driven validation of enum values against negotiated versions
//! - Per-connection request dispatch and typed event emission
//! - A reference Unix-socket server
//!
//! ## Architecture
//!
//! ```text
//!   frames →  ┌──────────────── Dispatcher (per connection) ───────────────┐
//!             │ registry.resolve → opcode → since gate → decode → enums    │
//!             │        │                                                    │
//!             │        └──→ DispatchTable[opcode] → RequestHandler          │
//!             │                     │                                       │
//!             │                     └──→ EventEmitter → Transport → frames  │
//!             └─────────────────────────────────────────────────────────────┘
//!   Catalog (Arc<Interface>, shared read-only across connections)
//! ```

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]
#![warn(rust_2018_idioms)]

pub mod bindings;
pub mod dispatch;
pub mod events;
pub mod object;
pub mod protocol;
pub mod transport;
pub mod types;
pub mod wire;

// Internal utilities
pub mod observability;
pub mod validation;

pub use dispatch::{DispatchTable, Dispatcher, HandlerSet, RequestContext, RequestHandler};
pub use events::EventEmitter;
pub use object::{BoundObject, InMemoryRegistry, ObjectRegistry, ObjectResolver};
pub use protocol::{ArgDesc, ArgType, Catalog, EnumEntry, EnumKind, Enumeration, Interface, MessageDesc};
pub use transport::{ChannelTransport, Transport};
pub use types::{Config, Error, ErrorKind, ObjectId, Result};
pub use wire::{Argument, FdQueue, Fixed, NewObject, TypedNewId};
