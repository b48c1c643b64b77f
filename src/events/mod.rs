//! Outgoing events.

pub mod emitter;

pub use emitter::EventEmitter;
