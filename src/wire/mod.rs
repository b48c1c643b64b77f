//! Wire representation: fixed-point numbers, argument values, the argument
//! codec, and stream framing.

pub mod argument;
pub mod codec;
pub mod fixed;
pub mod frame;

pub use argument::{Argument, FdQueue, NewObject, TypedNewId};
pub use codec::{decode_args, encode_args, encode_message};
pub use fixed::Fixed;
pub use frame::{read_frame, write_frame, OutgoingMessage, RawMessage, HEADER_SIZE};
