//! Argument codec.
//!
//! Arguments are a stream of native-endian 32-bit words:
//! ```text
//! int / uint / fixed   one word
//! object / new_id      one word (object id, 0 = null)
//! string               word length (NUL included, 0 = null), bytes, NUL, pad to 4
//! array                word length, bytes, pad to 4
//! new_id (dynamic)     string interface, uint version, new_id
//! fd                   nothing: taken from the side channel
//! ```
//! Decoding consumes exactly the declared parameters in order; leftover bytes
//! are an error.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::os::fd::OwnedFd;

use super::argument::{Argument, FdQueue, NewObject, TypedNewId};
use super::fixed::Fixed;
use super::frame::{OutgoingMessage, HEADER_SIZE};
use crate::object::ObjectResolver;
use crate::protocol::{ArgDesc, ArgType, MessageDesc};
use crate::types::{raw_or_null, Error, ObjectId, Result, WireConfig};

fn padded_len(len: usize) -> usize {
    (len + 3) & !3
}

// =============================================================================
// Encoding
// =============================================================================

/// Encode `args` against `signature`, appending bytes to `buf` and
/// descriptors to `fds`.
pub fn encode_args(
    signature: &[ArgDesc],
    args: Vec<Argument>,
    buf: &mut BytesMut,
    fds: &mut Vec<OwnedFd>,
) -> Result<()> {
    if args.len() != signature.len() {
        return Err(Error::malformed(format!(
            "expected {} arguments, got {}",
            signature.len(),
            args.len()
        )));
    }

    for (desc, arg) in signature.iter().zip(args) {
        match (desc.arg_type, arg) {
            (ArgType::Int, Argument::Int(v)) => buf.put_i32_ne(v),
            (ArgType::Uint, Argument::Uint(v)) => buf.put_u32_ne(v),
            (ArgType::Fixed, Argument::Fixed(v)) => buf.put_i32_ne(v.to_raw()),
            (ArgType::String, Argument::Str(s)) => put_string(desc, s.as_deref(), buf)?,
            (ArgType::Array, Argument::Array(bytes)) => put_array(desc, &bytes, buf)?,
            (ArgType::Fd, Argument::Fd(fd)) => fds.push(fd),
            (ArgType::Object, Argument::Object(id)) => {
                if id.is_none() && !desc.allow_null {
                    return Err(Error::malformed(format!("'{}' cannot be null", desc.name)));
                }
                buf.put_u32_ne(raw_or_null(id));
            }
            (ArgType::NewId, Argument::NewId(new)) if !desc.is_dynamic_new_id() => {
                if desc.interface.as_deref() != Some(new.interface.as_str()) {
                    return Err(Error::InterfaceMismatch {
                        object: new.id,
                        expected: desc.interface.clone().unwrap_or_default(),
                        actual: new.interface,
                    });
                }
                buf.put_u32_ne(new.id.get());
            }
            (ArgType::NewId, Argument::NewObject(new)) if desc.is_dynamic_new_id() => {
                put_string(desc, Some(&new.interface), buf)?;
                buf.put_u32_ne(new.version);
                buf.put_u32_ne(new.id.get());
            }
            (_, other) => {
                return Err(Error::malformed(format!(
                    "'{}' expects {}, got {}",
                    desc.name,
                    desc.arg_type.display_name(),
                    other.arg_type().display_name()
                )));
            }
        }
    }
    Ok(())
}

fn put_string(desc: &ArgDesc, s: Option<&str>, buf: &mut BytesMut) -> Result<()> {
    let Some(s) = s else {
        if !desc.allow_null {
            return Err(Error::malformed(format!("'{}' cannot be null", desc.name)));
        }
        buf.put_u32_ne(0);
        return Ok(());
    };
    if s.as_bytes().contains(&0) {
        return Err(Error::malformed(format!("'{}' contains an interior NUL", desc.name)));
    }
    let len = u32::try_from(s.len() + 1)
        .map_err(|_| Error::out_of_range(format!("'{}' is too long", desc.name)))?;
    buf.put_u32_ne(len);
    buf.put_slice(s.as_bytes());
    buf.put_u8(0);
    pad(buf, s.len() + 1);
    Ok(())
}

fn put_array(desc: &ArgDesc, bytes: &[u8], buf: &mut BytesMut) -> Result<()> {
    let len = u32::try_from(bytes.len())
        .map_err(|_| Error::out_of_range(format!("'{}' is too long", desc.name)))?;
    buf.put_u32_ne(len);
    buf.put_slice(bytes);
    pad(buf, bytes.len());
    Ok(())
}

fn pad(buf: &mut BytesMut, len: usize) {
    buf.put_bytes(0, padded_len(len) - len);
}

/// Encode a complete message, enforcing the configured size and fd limits.
pub fn encode_message(
    object: ObjectId,
    opcode: u16,
    desc: &MessageDesc,
    args: Vec<Argument>,
    config: &WireConfig,
) -> Result<OutgoingMessage> {
    let mut buf = BytesMut::new();
    let mut fds = Vec::new();
    encode_args(&desc.args, args, &mut buf, &mut fds)?;

    let size = HEADER_SIZE + buf.len();
    if size > config.message_size_limit() {
        return Err(Error::out_of_range(format!(
            "{} message is {} bytes, limit is {}",
            desc.name,
            size,
            config.message_size_limit()
        )));
    }
    if fds.len() > config.max_fds_per_message {
        return Err(Error::out_of_range(format!(
            "{} carries {} file descriptors, limit is {}",
            desc.name,
            fds.len(),
            config.max_fds_per_message
        )));
    }

    Ok(OutgoingMessage {
        object,
        opcode,
        payload: buf.freeze(),
        fds,
    })
}

// =============================================================================
// Decoding
// =============================================================================

/// Decode the arguments of one message body against `signature`.
///
/// Object references are resolved through `resolver` and checked against the
/// parameter's interface constraint. New ids are returned unbound; typed ones
/// carry the interface their parameter declares.
pub fn decode_args(
    signature: &[ArgDesc],
    body: &mut Bytes,
    fds: &mut FdQueue,
    resolver: &dyn ObjectResolver,
) -> Result<Vec<Argument>> {
    let mut args = Vec::with_capacity(signature.len());
    for desc in signature {
        let arg = match desc.arg_type {
            ArgType::Int => Argument::Int(take_u32(desc, body)? as i32),
            ArgType::Uint => Argument::Uint(take_u32(desc, body)?),
            ArgType::Fixed => Argument::Fixed(Fixed::from_raw(take_u32(desc, body)? as i32)),
            ArgType::String => Argument::Str(take_string(desc, body)?),
            ArgType::Array => Argument::Array(take_array(desc, body)?),
            ArgType::Fd => Argument::Fd(
                fds.pop()
                    .ok_or_else(|| Error::missing_descriptor(desc.name.clone()))?,
            ),
            ArgType::Object => Argument::Object(take_object(desc, body, resolver)?),
            ArgType::NewId if desc.is_dynamic_new_id() => {
                let interface = take_string(desc, body)?.ok_or_else(|| {
                    Error::malformed(format!("'{}' has a null interface name", desc.name))
                })?;
                let version = take_u32(desc, body)?;
                let id = take_new_id(desc, body)?;
                Argument::NewObject(NewObject {
                    interface,
                    version,
                    id,
                })
            }
            ArgType::NewId => Argument::NewId(TypedNewId {
                id: take_new_id(desc, body)?,
                interface: desc.interface.clone().unwrap_or_default(),
            }),
        };
        args.push(arg);
    }

    if body.has_remaining() {
        return Err(Error::malformed(format!(
            "{} trailing bytes after the last argument",
            body.remaining()
        )));
    }
    Ok(args)
}

fn take_u32(desc: &ArgDesc, body: &mut Bytes) -> Result<u32> {
    if body.remaining() < 4 {
        return Err(Error::malformed(format!("'{}' is truncated", desc.name)));
    }
    Ok(body.get_u32_ne())
}

fn take_padded(desc: &ArgDesc, body: &mut Bytes, len: usize) -> Result<Bytes> {
    if len > body.remaining() || padded_len(len) > body.remaining() {
        return Err(Error::malformed(format!(
            "'{}' declares {} bytes, only {} remain",
            desc.name,
            len,
            body.remaining()
        )));
    }
    let bytes = body.split_to(len);
    body.advance(padded_len(len) - len);
    Ok(bytes)
}

fn take_string(desc: &ArgDesc, body: &mut Bytes) -> Result<Option<String>> {
    let len = take_u32(desc, body)? as usize;
    if len == 0 {
        if desc.allow_null {
            return Ok(None);
        }
        return Err(Error::malformed(format!("'{}' cannot be null", desc.name)));
    }
    let bytes = take_padded(desc, body, len)?;
    let (terminator, text) = match bytes.split_last() {
        Some((terminator, text)) => (*terminator, text),
        None => (1, &[][..]),
    };
    if terminator != 0 || text.contains(&0) {
        return Err(Error::malformed(format!(
            "'{}' length {} does not match its NUL terminator",
            desc.name, len
        )));
    }
    String::from_utf8(text.to_vec())
        .map(Some)
        .map_err(|_| Error::malformed(format!("'{}' is not valid UTF-8", desc.name)))
}

fn take_array(desc: &ArgDesc, body: &mut Bytes) -> Result<Vec<u8>> {
    let len = take_u32(desc, body)? as usize;
    Ok(take_padded(desc, body, len)?.to_vec())
}

fn take_new_id(desc: &ArgDesc, body: &mut Bytes) -> Result<ObjectId> {
    ObjectId::new(take_u32(desc, body)?)
        .ok_or_else(|| Error::malformed(format!("'{}' is a null new_id", desc.name)))
}

fn take_object(
    desc: &ArgDesc,
    body: &mut Bytes,
    resolver: &dyn ObjectResolver,
) -> Result<Option<ObjectId>> {
    let Some(id) = ObjectId::new(take_u32(desc, body)?) else {
        if desc.allow_null {
            return Ok(None);
        }
        return Err(Error::malformed(format!("'{}' cannot be null", desc.name)));
    };
    let object = resolver.resolve(id)?;
    if let Some(expected) = &desc.interface {
        if object.interface().name() != expected {
            return Err(Error::InterfaceMismatch {
                object: id,
                expected: expected.clone(),
                actual: object.interface().name().to_string(),
            });
        }
    }
    Ok(Some(id))
}
