//! Request dispatch: handler tables, the per-request context, and the
//! per-connection dispatcher that routes incoming messages to handlers.

pub mod context;
pub mod dispatcher;
pub mod handler;
pub mod table;

pub use context::RequestContext;
pub use dispatcher::Dispatcher;
pub use handler::{FnHandler, RequestHandler};
pub use table::{DispatchTable, HandlerSet};

use crate::object::{BoundObject, ObjectRegistry};
use crate::transport::Transport;
use crate::types::{Error, Result};

/// Invalidate `object`, detach it from the registry and tell the peer.
///
/// Only the first call for a given object does anything; later calls are
/// no-ops, so the peer hears about each destruction exactly once.
pub(crate) fn destroy_object(
    registry: &mut dyn ObjectRegistry,
    transport: &dyn Transport,
    object: &BoundObject,
) -> Result<()> {
    if !object.invalidate() {
        return Ok(());
    }
    if let Err(e) = registry.release(object) {
        tracing::warn!(%object, error = %e, "destroyed object was not registered");
    }
    match transport.notify_destroyed(object.id()) {
        Ok(()) | Err(Error::TransportClosed) => {}
        Err(e) => return Err(e),
    }
    tracing::debug!(%object, "object destroyed");
    Ok(())
}
