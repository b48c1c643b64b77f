//! Bound objects and the registry seam.

mod handle;
mod registry;

pub use handle::BoundObject;
pub use registry::{InMemoryRegistry, ObjectRegistry, ObjectResolver};
