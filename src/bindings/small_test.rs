//! Typed bindings for the `small_test` protocol (`intf_A`).
//!
//! `intf_A` exercises every argument type, a version-gated event, a scalar
//! enum with a negative and a deprecated member, and a bitfield enum.

use std::os::fd::OwnedFd;
use std::sync::Arc;

use crate::dispatch::{DispatchTable, RequestContext};
use crate::events::EventEmitter;
use crate::object::BoundObject;
use crate::protocol::{ArgDesc, Interface, MessageDesc};
use crate::protocol_enum;
use crate::transport::Transport;
use crate::types::{Error, ObjectId, Result};
use crate::wire::{Argument, Fixed, NewObject, TypedNewId};

pub const INTERFACE_NAME: &str = "intf_A";
pub const INTERFACE_VERSION: u32 = 3;

// Request opcodes.
pub const RQ1: u16 = 0;
pub const RQ2: u16 = 1;
pub const DESTROY: u16 = 2;

// Event opcodes.
pub const HEY: u16 = 0;
pub const YO: u16 = 1;

pub const RQ1_SINCE_VERSION: u32 = 1;
pub const RQ2_SINCE_VERSION: u32 = 1;
pub const DESTROY_SINCE_VERSION: u32 = 1;
pub const HEY_SINCE_VERSION: u32 = 1;
pub const YO_SINCE_VERSION: u32 = 2;

protocol_enum! {
    /// Scalar enumeration with a negative and a deprecated member.
    pub enum Foo("foo", Scalar) {
        /// this is the first
        "first" => First = 0, since 1;
        /// this is the second
        "second" => Second = 1, since 1;
        /// this is the third
        "third" => Third = 2, since 2;
        /// this is a negative value
        "negative" => Negative = -1, since 2;
        /// this is a deprecated value
        "deprecated" => Deprecated = 3, since 2, deprecated 3;
    }
}

protocol_enum! {
    /// Bitfield enumeration.
    pub enum Bar("bar", Bitfield) {
        "first" => First = 0x01, since 1;
        "second" => Second = 0x02, since 1;
        "third" => Third = 0x04, since 2;
    }
}

/// Interface descriptor for `intf_A`.
pub fn descriptor() -> Result<Interface> {
    Interface::builder(INTERFACE_NAME, INTERFACE_VERSION)
        .request(MessageDesc::new("rq1").arg(ArgDesc::new_id_dynamic("untyped_new")))
        .request(
            MessageDesc::new("rq2")
                .arg(ArgDesc::new_id("typed_new", "intf_not_here"))
                .arg(ArgDesc::string("str"))
                .arg(ArgDesc::int("i"))
                .arg(ArgDesc::uint("u"))
                .arg(ArgDesc::fixed("f"))
                .arg(ArgDesc::fd("fd"))
                .arg(ArgDesc::object("obj", Some("another_intf"))),
        )
        .request(MessageDesc::new("destroy").destructor())
        .event(MessageDesc::new("hey").since(HEY_SINCE_VERSION))
        .event(MessageDesc::new("yo").since(YO_SINCE_VERSION))
        .enumeration(Foo::descriptor())
        .enumeration(Bar::descriptor())
        .build()
}

/// Decoded arguments of `rq2`.
#[derive(Debug)]
pub struct Rq2 {
    /// Declared as `intf_not_here`.
    pub typed_new: TypedNewId,
    pub str: String,
    pub i: i32,
    pub u: u32,
    pub f: Fixed,
    pub fd: OwnedFd,
    pub obj: ObjectId,
}

impl Rq2 {
    fn from_args(args: Vec<Argument>) -> Result<Self> {
        let mut args = args.into_iter();
        let mut next = |name: &str| args.next().ok_or_else(|| Error::malformed(format!("rq2: missing '{}'", name)));

        let typed_new = match next("typed_new")? {
            Argument::NewId(new) => new,
            other => return Err(unexpected("typed_new", &other)),
        };
        let str = match next("str")? {
            Argument::Str(Some(s)) => s,
            other => return Err(unexpected("str", &other)),
        };
        let i = match next("i")? {
            Argument::Int(v) => v,
            other => return Err(unexpected("i", &other)),
        };
        let u = match next("u")? {
            Argument::Uint(v) => v,
            other => return Err(unexpected("u", &other)),
        };
        let f = match next("f")? {
            Argument::Fixed(v) => v,
            other => return Err(unexpected("f", &other)),
        };
        let fd = match next("fd")? {
            Argument::Fd(fd) => fd,
            other => return Err(unexpected("fd", &other)),
        };
        let obj = match next("obj")? {
            Argument::Object(Some(id)) => id,
            other => return Err(unexpected("obj", &other)),
        };
        Ok(Self {
            typed_new,
            str,
            i,
            u,
            f,
            fd,
            obj,
        })
    }
}

fn unexpected(name: &str, arg: &Argument) -> Error {
    Error::malformed(format!("'{}' got {}", name, arg.arg_type().display_name()))
}

/// Server-side implementation of `intf_A` requests.
pub trait IntfAHandler: Send + Sync {
    /// `rq1`: create an object of the interface and version named on the wire.
    fn rq1(&self, ctx: &mut RequestContext<'_>, untyped_new: NewObject) -> Result<()>;

    fn rq2(&self, ctx: &mut RequestContext<'_>, args: Rq2) -> Result<()>;

    /// `destroy`: the object is destroyed after this returns.
    fn destroy(&self, _ctx: &mut RequestContext<'_>) -> Result<()> {
        Ok(())
    }
}

/// Dispatch table routing `intf_A` requests to `handler`.
pub fn dispatch_table(interface: &Arc<Interface>, handler: Arc<dyn IntfAHandler>) -> Result<DispatchTable> {
    let rq1 = handler.clone();
    let rq2 = handler.clone();
    DispatchTable::new(interface)
        .on_fn("rq1", move |ctx, args| match args.into_iter().next() {
            Some(Argument::NewObject(new)) => rq1.rq1(ctx, new),
            Some(other) => Err(unexpected("untyped_new", &other)),
            None => Err(Error::malformed("rq1: missing 'untyped_new'")),
        })?
        .on_fn("rq2", move |ctx, args| rq2.rq2(ctx, Rq2::from_args(args)?))?
        .on_fn("destroy", move |ctx, _args| handler.destroy(ctx))
}

/// Send `hey` on `object`.
pub fn send_hey(object: &BoundObject, transport: &dyn Transport) -> Result<()> {
    EventEmitter::from_opcode(object.interface(), HEY)?.send(object, transport, Vec::new())
}

/// Send `yo` on `object`. Requires version 2.
pub fn send_yo(object: &BoundObject, transport: &dyn Transport) -> Result<()> {
    EventEmitter::from_opcode(object.interface(), YO)?.send(object, transport, Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{InMemoryRegistry, ObjectRegistry};
    use crate::transport::ChannelTransport;

    #[test]
    fn test_constants_match_descriptor() {
        let intf = descriptor().unwrap();
        assert_eq!(intf.request_opcode("rq1"), Some(RQ1));
        assert_eq!(intf.request_opcode("rq2"), Some(RQ2));
        assert_eq!(intf.request_opcode("destroy"), Some(DESTROY));
        assert_eq!(intf.event_opcode("hey"), Some(HEY));
        assert_eq!(intf.event_opcode("yo"), Some(YO));
        assert_eq!(intf.event(YO).unwrap().since, YO_SINCE_VERSION);
        assert!(intf.request(DESTROY).unwrap().is_destructor());
    }

    #[test]
    fn test_foo_validity() {
        assert!(Foo::is_valid(0, 1));
        assert!(Foo::is_valid(1, 1));
        assert!(!Foo::is_valid(2, 1));
        assert!(Foo::is_valid(2, 2));
        assert!(!Foo::is_valid(0xFFFF_FFFF, 1));
        assert!(Foo::is_valid(0xFFFF_FFFF, 2));
        assert!(Foo::is_valid(3, 2));
        assert!(Foo::is_valid(3, 3));
        assert!(!Foo::is_valid(4, 3));
        assert_eq!(Foo::Negative.wire_value(), u32::MAX);
        assert_eq!(Foo::Deprecated.deprecated_since(), Some(3));
    }

    #[test]
    fn test_bar_validity() {
        assert!(Bar::is_valid(0x00, 1));
        assert!(Bar::is_valid(0x03, 1));
        assert!(!Bar::is_valid(0x04, 1));
        assert!(Bar::is_valid(0x07, 2));
        assert!(!Bar::is_valid(0x08, 3));
    }

    #[test]
    fn test_yo_needs_version_two() {
        let intf = Arc::new(descriptor().unwrap());
        let mut registry = InMemoryRegistry::new();
        let v1 = registry.bind(ObjectId::new(3).unwrap(), intf.clone(), 1).unwrap();
        let v2 = registry.bind(ObjectId::new(4).unwrap(), intf, 2).unwrap();
        let (transport, mut rx) = ChannelTransport::new();

        send_hey(&v1, &transport).unwrap();
        assert!(matches!(send_yo(&v1, &transport), Err(Error::VersionTooLow { .. })));
        send_yo(&v2, &transport).unwrap();

        let hey = rx.try_recv().unwrap().into_message().unwrap();
        assert_eq!((hey.object.get(), hey.opcode, hey.payload.len()), (3, HEY, 0));
        let yo = rx.try_recv().unwrap().into_message().unwrap();
        assert_eq!((yo.object.get(), yo.opcode), (4, YO));
        assert!(rx.try_recv().is_err());
    }
}
