//! Unix-socket reference server - accept loop and per-connection handler.
//!
//! Each connection gets its own [`Dispatcher`] and registry, with object 1
//! bound to the configured root interface. Requests are dispatched in arrival
//! order; events queued by handlers are drained onto the socket by a writer
//! task. This stream transport carries no file descriptors.

use bytes::{BufMut, BytesMut};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::unix::OwnedWriteHalf;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{mpsc, OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

use super::{ChannelTransport, TransportEvent};
use crate::dispatch::{Dispatcher, HandlerSet};
use crate::object::InMemoryRegistry;
use crate::protocol::{ArgType, Catalog};
use crate::types::{Config, Error, ObjectId, Result};
use crate::wire::{read_frame, write_frame, FdQueue, OutgoingMessage};

/// Id of the root object every connection starts with.
pub const ROOT_OBJECT_ID: u32 = 1;

#[derive(Debug)]
struct Shared {
    config: Config,
    catalog: Arc<Catalog>,
    handlers: Arc<HandlerSet>,
    root_interface: String,
    root_version: u32,
    /// Root event opcode used to announce destroyed ids.
    destroy_notice: Option<u16>,
}

/// Builder for [`Server`].
#[derive(Debug)]
pub struct ServerBuilder {
    config: Config,
    catalog: Arc<Catalog>,
    handlers: HandlerSet,
    root: Option<(String, u32)>,
    destroy_notice: Option<String>,
}

impl ServerBuilder {
    pub fn handlers(mut self, handlers: HandlerSet) -> Self {
        self.handlers = handlers;
        self
    }

    /// Interface and version bound at object 1 on every connection.
    pub fn root(mut self, interface: impl Into<String>, version: u32) -> Self {
        self.root = Some((interface.into(), version));
        self
    }

    /// Root event sent with the id of every destroyed object. The event
    /// must take a single uint.
    pub fn destroy_notice(mut self, event: impl Into<String>) -> Self {
        self.destroy_notice = Some(event.into());
        self
    }

    pub fn build(self) -> Result<Server> {
        let (root_interface, root_version) = self
            .root
            .ok_or_else(|| Error::invalid_descriptor("server has no root interface"))?;
        let interface = self.catalog.require(&root_interface)?;
        if root_version == 0 || root_version > interface.version() {
            return Err(Error::UnsupportedVersion {
                interface: root_interface,
                requested: root_version,
                max: interface.version(),
            });
        }

        let destroy_notice = match self.destroy_notice {
            None => None,
            Some(name) => {
                let opcode = interface.event_opcode(&name).ok_or_else(|| {
                    Error::invalid_descriptor(format!("{} has no event '{}'", root_interface, name))
                })?;
                let event = &interface.events()[usize::from(opcode)];
                if event.args.len() != 1 || event.args[0].arg_type != ArgType::Uint {
                    return Err(Error::invalid_descriptor(format!(
                        "destroy notice {}.{} must take a single uint",
                        root_interface, name
                    )));
                }
                Some(opcode)
            }
        };

        Ok(Server {
            shared: Arc::new(Shared {
                config: self.config,
                catalog: self.catalog,
                handlers: Arc::new(self.handlers),
                root_interface,
                root_version,
                destroy_notice,
            }),
            cancel: CancellationToken::new(),
        })
    }
}

/// Reference server speaking the wire protocol over a Unix socket.
#[derive(Debug, Clone)]
pub struct Server {
    shared: Arc<Shared>,
    cancel: CancellationToken,
}

impl Server {
    pub fn builder(config: Config, catalog: Arc<Catalog>) -> ServerBuilder {
        ServerBuilder {
            config,
            catalog,
            handlers: HandlerSet::new(),
            root: None,
            destroy_notice: None,
        }
    }

    /// Bind the configured socket path, replacing a stale socket file.
    pub fn bind(&self) -> Result<UnixListener> {
        let path = &self.shared.config.server.socket_path;
        remove_stale_socket(path)?;
        Ok(UnixListener::bind(path)?)
    }

    /// Bind and run until [`Server::shutdown`] is called.
    pub async fn serve(&self) -> Result<()> {
        let listener = self.bind()?;
        self.serve_on(listener).await
    }

    /// Run the accept loop on an already bound listener.
    pub async fn serve_on(&self, listener: UnixListener) -> Result<()> {
        let max_connections = self.shared.config.server.max_connections;
        let conn_semaphore = Arc::new(Semaphore::new(max_connections));
        tracing::info!(
            socket = %self.shared.config.server.socket_path.display(),
            max_connections,
            root = %self.shared.root_interface,
            "server listening"
        );

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    tracing::info!("server shutting down");
                    break;
                }
                accept = listener.accept() => {
                    let (stream, _addr) = accept?;

                    let permit = match conn_semaphore.clone().try_acquire_owned() {
                        Ok(permit) => permit,
                        Err(_) => {
                            tracing::warn!(max_connections, "connection rejected: at capacity");
                            drop(stream);
                            continue;
                        }
                    };

                    tracing::debug!(
                        active = max_connections - conn_semaphore.available_permits(),
                        "connection accepted"
                    );
                    let shared = self.shared.clone();
                    let cancel = self.cancel.child_token();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, shared, cancel, permit).await {
                            tracing::warn!(error = %e, "connection closed with error");
                        }
                    });
                }
            }
        }
        Ok(())
    }

    /// Request graceful shutdown of the accept loop and all connections.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

fn remove_stale_socket(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Serve one connection: read frames → dispatch, until EOF, timeout,
/// shutdown or a fatal error.
async fn handle_connection(
    stream: UnixStream,
    shared: Arc<Shared>,
    cancel: CancellationToken,
    _permit: OwnedSemaphorePermit,
) -> Result<()> {
    let (mut reader, writer) = stream.into_split();
    let (transport, rx) = ChannelTransport::new();

    let registry = InMemoryRegistry::with_released_capacity(shared.config.dispatch.released_id_capacity);
    let mut dispatcher =
        Dispatcher::with_registry(shared.catalog.clone(), shared.handlers.clone(), Arc::new(transport), registry)
            .with_wire_config(shared.config.wire.clone());
    let root_id = ObjectId::new(ROOT_OBJECT_ID).ok_or_else(|| Error::invalid_descriptor("root object id is null"))?;
    dispatcher.bind_root(root_id, &shared.root_interface, shared.root_version)?;

    let writer_task = tokio::spawn(write_events(
        writer,
        rx,
        shared.destroy_notice,
        shared.config.server.write_timeout,
        cancel.clone(),
    ));

    let read_timeout = shared.config.server.read_timeout;
    let max_message_size = shared.config.wire.message_size_limit();
    let result = loop {
        tokio::select! {
            _ = cancel.cancelled() => break Ok(()),
            frame = tokio::time::timeout(read_timeout, read_frame(&mut reader, max_message_size)) => {
                let message = match frame {
                    Err(_elapsed) => {
                        tracing::debug!(timeout = ?read_timeout, "read timeout, dropping connection");
                        break Ok(());
                    }
                    Ok(Err(e)) => break Err(Error::from(e)),
                    Ok(Ok(None)) => break Ok(()),
                    Ok(Ok(Some(message))) => message,
                };

                let target = message.object;
                let opcode = message.opcode;
                if let Err(e) = dispatcher.dispatch_raw(message, &mut FdQueue::new()) {
                    tracing::warn!(object = target.get(), opcode, error = %e, "request rejected");
                    if shared.config.dispatch.is_fatal(e.kind()) {
                        break Err(e);
                    }
                }
                if dispatcher.transport().is_closed() {
                    break Ok(());
                }
            }
        }
    };

    // Dropping the dispatcher drops the last sender, letting the writer drain
    // and exit.
    drop(dispatcher);
    match writer_task.await {
        Ok(Err(e)) if result.is_ok() => return Err(e),
        Ok(_) => {}
        Err(e) => tracing::warn!(error = %e, "writer task panicked"),
    }
    result
}

/// Drain queued events onto the socket, in queue order.
async fn write_events(
    mut writer: OwnedWriteHalf,
    mut rx: mpsc::UnboundedReceiver<TransportEvent>,
    destroy_notice: Option<u16>,
    write_timeout: Duration,
    cancel: CancellationToken,
) -> Result<()> {
    while let Some(event) = rx.recv().await {
        let message = match event {
            TransportEvent::Message(message) => message,
            TransportEvent::Destroyed(id) => match destroy_notice {
                Some(opcode) => notice_message(opcode, id)?,
                None => continue,
            },
        };
        if !message.fds.is_empty() {
            tracing::warn!(count = message.fds.len(), "stream transport drops file descriptors");
        }
        if let Err(e) = timed_write(&mut writer, &message, write_timeout).await {
            cancel.cancel();
            return Err(e);
        }
    }
    Ok(())
}

fn notice_message(opcode: u16, id: ObjectId) -> Result<OutgoingMessage> {
    let root = ObjectId::new(ROOT_OBJECT_ID).ok_or_else(|| Error::invalid_descriptor("root object id is null"))?;
    let mut payload = BytesMut::with_capacity(4);
    payload.put_u32_ne(id.get());
    Ok(OutgoingMessage {
        object: root,
        opcode,
        payload: payload.freeze(),
        fds: Vec::new(),
    })
}

/// Write a frame with a timeout so slow peers cannot hold a connection open.
async fn timed_write(writer: &mut OwnedWriteHalf, message: &OutgoingMessage, timeout: Duration) -> Result<()> {
    tokio::time::timeout(timeout, write_frame(writer, message))
        .await
        .map_err(|_| {
            tracing::warn!(timeout = ?timeout, "write timeout, dropping connection");
            Error::from(std::io::Error::new(std::io::ErrorKind::TimedOut, "write timeout"))
        })??;
    Ok(())
}
