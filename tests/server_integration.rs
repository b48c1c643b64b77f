//! Server integration tests - Unix socket → frames → dispatch → events.

use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UnixStream;

use objwire::dispatch::{DispatchTable, HandlerSet};
use objwire::protocol::{ArgDesc, Catalog, Interface, MessageDesc};
use objwire::transport::Server;
use objwire::types::Config;
use objwire::wire::{encode_message, read_frame, write_frame, Argument, RawMessage};
use objwire::ObjectId;

fn catalog() -> Arc<Catalog> {
    let mut catalog = Catalog::new();
    catalog
        .add_interface(
            Interface::builder("display", 1)
                .request(MessageDesc::new("sync").arg(ArgDesc::new_id("callback", "callback")))
                .request(MessageDesc::new("ping").arg(ArgDesc::uint("serial")))
                .event(MessageDesc::new("pong").arg(ArgDesc::uint("serial")))
                .event(MessageDesc::new("delete_id").arg(ArgDesc::uint("id")))
                .build()
                .unwrap(),
        )
        .unwrap();
    catalog
        .add_interface(
            Interface::builder("callback", 1)
                .event(MessageDesc::new("done").arg(ArgDesc::uint("data")))
                .build()
                .unwrap(),
        )
        .unwrap();
    Arc::new(catalog)
}

fn handlers(catalog: &Catalog) -> HandlerSet {
    let display = DispatchTable::new(catalog.require("display").unwrap())
        .on_fn("sync", |ctx, args| {
            let Some(Argument::NewId(new)) = args.into_iter().next() else {
                return Err(objwire::Error::malformed("sync: missing callback"));
            };
            let callback = ctx.bind_typed(&new)?;
            ctx.send_event(&callback, "done", vec![Argument::Uint(new.id.get() * 10)])?;
            ctx.destroy(&callback)
        })
        .unwrap()
        .on_fn("ping", |ctx, args| {
            let object = ctx.object().clone();
            ctx.send_event(&object, "pong", args)
        })
        .unwrap();
    HandlerSet::new().with(display)
}

async fn start_server() -> (Server, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.server.socket_path = dir.path().join("objwire-test");
    config.server.read_timeout = Duration::from_secs(5);

    let catalog = catalog();
    let server = Server::builder(config, catalog.clone())
        .handlers(handlers(&catalog))
        .root("display", 1)
        .destroy_notice("delete_id")
        .build()
        .unwrap();

    let listener = server.bind().unwrap();
    let serving = server.clone();
    tokio::spawn(async move {
        let _ = serving.serve_on(listener).await;
    });
    (server, dir)
}

async fn connect(server_dir: &tempfile::TempDir) -> UnixStream {
    UnixStream::connect(server_dir.path().join("objwire-test")).await.unwrap()
}

async fn request(stream: &mut UnixStream, object: u32, name: &str, args: Vec<Argument>) {
    let catalog = catalog();
    let display = catalog.require("display").unwrap();
    let opcode = display.request_opcode(name).unwrap();
    let message = encode_message(
        ObjectId::new(object).unwrap(),
        opcode,
        display.request(opcode).unwrap(),
        args,
        &Default::default(),
    )
    .unwrap();
    write_frame(stream, &message).await.unwrap();
}

async fn next_event(stream: &mut UnixStream) -> Option<RawMessage> {
    tokio::time::timeout(Duration::from_secs(2), read_frame(stream, 4096))
        .await
        .unwrap()
        .unwrap()
}

fn uint_payload(message: &RawMessage) -> u32 {
    u32::from_ne_bytes(message.payload[..4].try_into().unwrap())
}

#[tokio::test]
async fn test_ping_round_trip() {
    let (server, dir) = start_server().await;
    let mut stream = connect(&dir).await;

    request(&mut stream, 1, "ping", vec![Argument::Uint(7)]).await;
    let pong = next_event(&mut stream).await.unwrap();
    assert_eq!((pong.object.get(), pong.opcode, uint_payload(&pong)), (1, 0, 7));

    server.shutdown();
}

#[tokio::test]
async fn test_sync_creates_callback_then_announces_deletion() {
    let (server, dir) = start_server().await;
    let mut stream = connect(&dir).await;

    request(&mut stream, 1, "sync", vec![Argument::new_id(ObjectId::new(2).unwrap(), "callback")]).await;

    let done = next_event(&mut stream).await.unwrap();
    assert_eq!((done.object.get(), done.opcode, uint_payload(&done)), (2, 0, 20));
    let delete_id = next_event(&mut stream).await.unwrap();
    assert_eq!((delete_id.object.get(), delete_id.opcode, uint_payload(&delete_id)), (1, 1, 2));

    // The id is free again once deleted.
    request(&mut stream, 1, "sync", vec![Argument::new_id(ObjectId::new(2).unwrap(), "callback")]).await;
    assert_eq!(next_event(&mut stream).await.unwrap().object.get(), 2);

    server.shutdown();
}

#[tokio::test]
async fn test_non_fatal_error_keeps_connection() {
    let (server, dir) = start_server().await;
    let mut stream = connect(&dir).await;

    // Unknown opcode on the root object.
    let bogus = objwire::wire::OutgoingMessage {
        object: ObjectId::new(1).unwrap(),
        opcode: 9,
        payload: bytes::Bytes::new(),
        fds: Vec::new(),
    };
    write_frame(&mut stream, &bogus).await.unwrap();

    request(&mut stream, 1, "ping", vec![Argument::Uint(3)]).await;
    let pong = next_event(&mut stream).await.unwrap();
    assert_eq!(uint_payload(&pong), 3);

    server.shutdown();
}

#[tokio::test]
async fn test_fatal_error_closes_connection() {
    let (server, dir) = start_server().await;
    let mut stream = connect(&dir).await;

    // Unknown objects are fatal under the default policy.
    request(&mut stream, 42, "ping", vec![Argument::Uint(1)]).await;
    assert!(next_event(&mut stream).await.is_none());

    // Other connections are unaffected.
    let mut other = connect(&dir).await;
    request(&mut other, 1, "ping", vec![Argument::Uint(5)]).await;
    assert_eq!(uint_payload(&next_event(&mut other).await.unwrap()), 5);

    server.shutdown();
}

#[test]
fn test_builder_rejects_bad_root() {
    let catalog = catalog();
    assert!(Server::builder(Config::default(), catalog.clone())
        .root("compositor", 1)
        .build()
        .is_err());
    assert!(Server::builder(Config::default(), catalog.clone())
        .root("display", 2)
        .build()
        .is_err());
    assert!(Server::builder(Config::default(), catalog)
        .root("display", 1)
        .destroy_notice("pong_missing")
        .build()
        .is_err());
}
