//! Argument codec throughput benchmark.
//!
//! Measures encode_args/decode_args for mixed signatures and string/array
//! payloads of growing size, plus frame I/O, using Criterion.

use bytes::BytesMut;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use objwire::object::InMemoryRegistry;
use objwire::protocol::ArgDesc;
use objwire::wire::{decode_args, encode_args, read_frame, write_frame, Argument, FdQueue, Fixed, OutgoingMessage};
use objwire::ObjectId;
use std::io::Cursor;

fn scalar_signature() -> Vec<ArgDesc> {
    vec![
        ArgDesc::int("x"),
        ArgDesc::uint("serial"),
        ArgDesc::fixed("surface_x"),
        ArgDesc::fixed("surface_y"),
        ArgDesc::string("name").nullable(),
    ]
}

fn scalar_args() -> Vec<Argument> {
    vec![
        Argument::Int(-42),
        Argument::Uint(1234),
        Argument::Fixed(Fixed::from_int(640).unwrap()),
        Argument::Fixed(Fixed::from_f64(480.5).unwrap()),
        Argument::string("pointer"),
    ]
}

fn bench_scalar(c: &mut Criterion) {
    let signature = scalar_signature();
    let registry = InMemoryRegistry::new();

    let mut encoded = BytesMut::new();
    encode_args(&signature, scalar_args(), &mut encoded, &mut Vec::new()).unwrap();
    let encoded = encoded.freeze();

    let mut group = c.benchmark_group("scalar_args");
    group.bench_function("encode", |b| {
        b.iter(|| {
            let mut buf = BytesMut::with_capacity(64);
            encode_args(&signature, black_box(scalar_args()), &mut buf, &mut Vec::new()).unwrap();
            buf
        });
    });
    group.bench_function("decode", |b| {
        b.iter(|| {
            let mut body = black_box(encoded.clone());
            decode_args(&signature, &mut body, &mut FdQueue::new(), &registry).unwrap()
        });
    });
    group.finish();
}

fn bench_array(c: &mut Criterion) {
    let signature = vec![ArgDesc::array("keys")];
    let registry = InMemoryRegistry::new();
    let sizes: &[usize] = &[0, 64, 1024, 4096];

    let mut group = c.benchmark_group("array_decode");
    for &size in sizes {
        let mut buf = BytesMut::new();
        encode_args(&signature, vec![Argument::Array(vec![0xAB; size])], &mut buf, &mut Vec::new()).unwrap();
        let encoded = buf.freeze();

        group.bench_with_input(BenchmarkId::from_parameter(size), &encoded, |b, e| {
            b.iter(|| {
                let mut body = black_box(e.clone());
                decode_args(&signature, &mut body, &mut FdQueue::new(), &registry).unwrap()
            });
        });
    }
    group.finish();
}

fn bench_frame_round_trip(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mut payload = BytesMut::new();
    encode_args(&scalar_signature(), scalar_args(), &mut payload, &mut Vec::new()).unwrap();
    let message = OutgoingMessage {
        object: ObjectId::new(3).unwrap(),
        opcode: 2,
        payload: payload.freeze(),
        fds: Vec::new(),
    };

    c.bench_function("frame_round_trip", |b| {
        b.iter(|| {
            rt.block_on(async {
                let mut buf = Vec::with_capacity(64);
                write_frame(&mut buf, black_box(&message)).await.unwrap();
                let mut cursor = Cursor::new(buf);
                read_frame(&mut cursor, 4096).await.unwrap()
            })
        });
    });
}

criterion_group!(benches, bench_scalar, bench_array, bench_frame_round_trip);
criterion_main!(benches);
