//! Message framing for stream transports.
//!
//! Frame format:
//! ```text
//! ┌──────────────┬──────────────────────────┬──────────────────┐
//! │ object (4B)  │ size << 16 | opcode (4B) │ arguments        │
//! │ u32 native   │ u32 native               │ size - 8 bytes   │
//! └──────────────┴──────────────────────────┴──────────────────┘
//! ```
//! Size includes the 8-byte header. File descriptors never travel in the
//! frame itself.

use bytes::Bytes;
use std::os::fd::OwnedFd;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::types::ObjectId;

/// Size of the message header in bytes.
pub const HEADER_SIZE: usize = 8;

/// A message addressed to an object, as handed to the transport.
#[derive(Debug)]
pub struct OutgoingMessage {
    pub object: ObjectId,
    pub opcode: u16,
    /// Encoded arguments, header excluded.
    pub payload: Bytes,
    /// Descriptors for the side channel, in argument order.
    pub fds: Vec<OwnedFd>,
}

impl OutgoingMessage {
    /// Total encoded size, header included.
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }
}

/// A framed message read off a stream, arguments still encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    pub object: ObjectId,
    pub opcode: u16,
    pub payload: Bytes,
}

fn invalid(msg: String) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::InvalidData, msg)
}

/// Read one frame from the stream.
///
/// Returns `None` on clean EOF, meaning the stream ended on a frame boundary.
/// A stream ending inside a frame is `UnexpectedEof`. `max_message_size` caps
/// the accepted size, header included.
pub async fn read_frame<R: AsyncReadExt + Unpin>(
    reader: &mut R,
    max_message_size: usize,
) -> std::io::Result<Option<RawMessage>> {
    let mut header = [0u8; HEADER_SIZE];
    let first = reader.read(&mut header).await?;
    if first == 0 {
        return Ok(None);
    }
    if first < HEADER_SIZE {
        reader.read_exact(&mut header[first..]).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    format!("Stream ended after {} of {} header bytes", first, HEADER_SIZE),
                )
            } else {
                e
            }
        })?;
    }

    let raw_object = u32::from_ne_bytes([header[0], header[1], header[2], header[3]]);
    let word = u32::from_ne_bytes([header[4], header[5], header[6], header[7]]);
    let size = (word >> 16) as usize;
    let opcode = (word & 0xFFFF) as u16;

    let object = ObjectId::new(raw_object)
        .ok_or_else(|| invalid("Frame addressed to the null object".to_string()))?;
    if size < HEADER_SIZE {
        return Err(invalid(format!("Frame too short: {} bytes", size)));
    }
    if size > max_message_size {
        return Err(invalid(format!("Frame too large: {} bytes", size)));
    }
    if size % 4 != 0 {
        return Err(invalid(format!("Frame size {} is not word aligned", size)));
    }

    let mut payload = vec![0u8; size - HEADER_SIZE];
    reader.read_exact(&mut payload).await?;

    Ok(Some(RawMessage {
        object,
        opcode,
        payload: Bytes::from(payload),
    }))
}

/// Write one frame to the stream. Descriptors attached to the message are
/// not written; stream transports that cannot pass them drop them here.
pub async fn write_frame<W: AsyncWriteExt + Unpin>(
    writer: &mut W,
    message: &OutgoingMessage,
) -> std::io::Result<()> {
    let size = u32::try_from(message.wire_size())
        .ok()
        .filter(|s| *s <= u32::from(u16::MAX))
        .ok_or_else(|| invalid(format!("Frame too large: {} bytes", message.wire_size())))?;
    let word = (size << 16) | u32::from(message.opcode);
    writer.write_all(&message.object.get().to_ne_bytes()).await?;
    writer.write_all(&word.to_ne_bytes()).await?;
    writer.write_all(&message.payload).await?;
    writer.flush().await?;
    Ok(())
}
