//! Transport seam.
//!
//! The core hands encoded messages to a [`Transport`] and never touches
//! sockets itself. [`ChannelTransport`] queues everything on an unbounded
//! FIFO channel, which keeps emission order per connection; the reference
//! [`server`] drains that channel onto a Unix socket.

pub mod server;

use tokio::sync::mpsc;

use crate::types::{Error, ObjectId, Result};
use crate::wire::OutgoingMessage;

pub use server::{Server, ServerBuilder};

/// Outgoing side of one connection.
pub trait Transport: Send + Sync {
    /// Queue a message. Fails with `TransportClosed` once the peer is gone.
    fn send_message(&self, message: OutgoingMessage) -> Result<()>;

    /// Tell the peer that `id` has been destroyed and may be reused.
    fn notify_destroyed(&self, id: ObjectId) -> Result<()>;

    fn is_closed(&self) -> bool;
}

/// Item queued on a [`ChannelTransport`].
#[derive(Debug)]
pub enum TransportEvent {
    Message(OutgoingMessage),
    Destroyed(ObjectId),
}

impl TransportEvent {
    pub fn into_message(self) -> Option<OutgoingMessage> {
        match self {
            TransportEvent::Message(message) => Some(message),
            TransportEvent::Destroyed(_) => None,
        }
    }
}

/// Transport backed by an unbounded FIFO channel. Closed when the receiver
/// is dropped.
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    tx: mpsc::UnboundedSender<TransportEvent>,
}

impl ChannelTransport {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TransportEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn push(&self, event: TransportEvent) -> Result<()> {
        self.tx.send(event).map_err(|_| Error::TransportClosed)
    }
}

impl Transport for ChannelTransport {
    fn send_message(&self, message: OutgoingMessage) -> Result<()> {
        self.push(TransportEvent::Message(message))
    }

    fn notify_destroyed(&self, id: ObjectId) -> Result<()> {
        self.push(TransportEvent::Destroyed(id))
    }

    fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn message(opcode: u16) -> OutgoingMessage {
        OutgoingMessage {
            object: ObjectId::new(1).unwrap(),
            opcode,
            payload: Bytes::new(),
            fds: Vec::new(),
        }
    }

    #[test]
    fn test_preserves_order() {
        let (transport, mut rx) = ChannelTransport::new();
        transport.send_message(message(0)).unwrap();
        transport.notify_destroyed(ObjectId::new(5).unwrap()).unwrap();
        transport.send_message(message(1)).unwrap();

        assert_eq!(rx.try_recv().unwrap().into_message().unwrap().opcode, 0);
        assert!(matches!(rx.try_recv().unwrap(), TransportEvent::Destroyed(id) if id.get() == 5));
        assert_eq!(rx.try_recv().unwrap().into_message().unwrap().opcode, 1);
    }

    #[test]
    fn test_closed_after_receiver_dropped() {
        let (transport, rx) = ChannelTransport::new();
        assert!(!transport.is_closed());
        drop(rx);
        assert!(transport.is_closed());
        assert!(matches!(
            transport.send_message(message(0)),
            Err(Error::TransportClosed)
        ));
    }
}
