//! Request handler trait.

use std::fmt;

use super::context::RequestContext;
use crate::types::Result;
use crate::wire::Argument;

/// Application-side implementation of one request.
///
/// Arguments arrive decoded, in declared order, already checked against the
/// object's negotiated version.
pub trait RequestHandler: Send + Sync {
    fn handle(&self, ctx: &mut RequestContext<'_>, args: Vec<Argument>) -> Result<()>;
}

/// Adapter turning a closure into a [`RequestHandler`].
pub struct FnHandler<F>(pub F);

impl<F> RequestHandler for FnHandler<F>
where
    F: Fn(&mut RequestContext<'_>, Vec<Argument>) -> Result<()> + Send + Sync,
{
    fn handle(&self, ctx: &mut RequestContext<'_>, args: Vec<Argument>) -> Result<()> {
        (self.0)(ctx, args)
    }
}

impl<F> fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnHandler")
    }
}
