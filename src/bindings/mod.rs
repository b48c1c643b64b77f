//! Typed bindings generated with [`protocol_enum!`](crate::protocol_enum)
//! and hand-written descriptor constructors.

mod macros;
pub mod small_test;
