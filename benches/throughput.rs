//! Throughput benchmarks for the store, the RESP codec and the snapshot
//! decoder.

use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use ferrokv::commands::CommandHandler;
use ferrokv::config::Config;
use ferrokv::protocol::{RespParser, RespValue};
use ferrokv::snapshot;
use ferrokv::storage::StorageEngine;
use std::sync::Arc;
use std::time::Duration;

fn bench_set(c: &mut Criterion) {
    let engine = Arc::new(StorageEngine::new());

    let mut group = c.benchmark_group("set");
    group.throughput(Throughput::Elements(1));

    group.bench_function("set_small", |b| {
        let mut i = 0u64;
        b.iter(|| {
            engine.set(Bytes::from(format!("key:{}", i)), Bytes::from_static(b"v"));
            i += 1;
        });
    });

    group.bench_function("set_1kb", |b| {
        let mut i = 0u64;
        let value = Bytes::from(vec![b'x'; 1024]);
        b.iter(|| {
            engine.set(Bytes::from(format!("key:{}", i)), value.clone());
            i += 1;
        });
    });

    group.bench_function("set_with_ttl", |b| {
        let mut i = 0u64;
        b.iter(|| {
            engine.set_with_ttl(
                Bytes::from(format!("ttl:{}", i)),
                Bytes::from_static(b"v"),
                Duration::from_secs(3600),
            );
            i += 1;
        });
    });

    group.finish();
}

fn bench_get(c: &mut Criterion) {
    let engine = Arc::new(StorageEngine::new());
    for i in 0..100_000 {
        engine.set(
            Bytes::from(format!("key:{}", i)),
            Bytes::from(format!("value:{}", i)),
        );
    }

    let mut group = c.benchmark_group("get");
    group.throughput(Throughput::Elements(1));

    group.bench_function("get_existing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = Bytes::from(format!("key:{}", i % 100_000));
            black_box(engine.get(&key));
            i += 1;
        });
    });

    group.bench_function("get_missing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = Bytes::from(format!("missing:{}", i));
            black_box(engine.get(&key));
            i += 1;
        });
    });

    group.finish();
}

fn bench_hash(c: &mut Criterion) {
    let engine = Arc::new(StorageEngine::new());

    let mut group = c.benchmark_group("hash");
    group.throughput(Throughput::Elements(1));

    group.bench_function("hset", |b| {
        let mut i = 0u64;
        b.iter(|| {
            engine.hset(
                Bytes::from(format!("h:{}", i % 1000)),
                vec![(Bytes::from(format!("f:{}", i)), Bytes::from_static(b"v"))],
            );
            i += 1;
        });
    });

    group.bench_function("hget", |b| {
        let name = Bytes::from("h:0");
        let mut i = 0u64;
        b.iter(|| {
            black_box(engine.hget(&name, &Bytes::from(format!("f:{}", i % 1000))));
            i += 1;
        });
    });

    group.finish();
}

fn bench_concurrent(c: &mut Criterion) {
    use std::thread;

    let mut group = c.benchmark_group("concurrent");
    group.measurement_time(Duration::from_secs(10));

    group.bench_function("4_threads_mixed", |b| {
        b.iter(|| {
            let engine = Arc::new(StorageEngine::new());
            let handles: Vec<_> = (0..4)
                .map(|t| {
                    let engine = Arc::clone(&engine);
                    thread::spawn(move || {
                        for i in 0..10_000 {
                            let key = Bytes::from(format!("key:{}:{}", t, i));
                            engine.set(key.clone(), Bytes::from_static(b"v"));
                            engine.get(&key);
                        }
                    })
                })
                .collect();

            for handle in handles {
                handle.join().unwrap();
            }

            black_box(engine.len());
        });
    });

    group.finish();
}

fn bench_keys(c: &mut Criterion) {
    let engine = Arc::new(StorageEngine::new());
    for i in 0..1_000 {
        engine.set(Bytes::from(format!("user:{}", i)), Bytes::from_static(b"u"));
        engine.set(Bytes::from(format!("session:{}", i)), Bytes::from_static(b"s"));
    }

    let mut group = c.benchmark_group("keys");

    group.bench_function("keys_prefix", |b| {
        b.iter(|| black_box(engine.keys(b"user:*")));
    });

    group.bench_function("keys_all", |b| {
        b.iter(|| black_box(engine.keys(b"*")));
    });

    group.finish();
}

fn bench_protocol(c: &mut Criterion) {
    let parser = RespParser::new();
    let request = RespValue::array(vec![
        RespValue::bulk_string(Bytes::from("SET")),
        RespValue::bulk_string(Bytes::from("key:1")),
        RespValue::bulk_string(Bytes::from(vec![b'x'; 256])),
    ])
    .serialize();
    let handler = CommandHandler::new(Arc::new(StorageEngine::new()), Arc::new(Config::default()));

    let mut group = c.benchmark_group("protocol");
    group.throughput(Throughput::Bytes(request.len() as u64));

    group.bench_function("parse_set", |b| {
        b.iter(|| black_box(parser.parse(&request).unwrap()));
    });

    group.bench_function("parse_and_execute_set", |b| {
        b.iter(|| {
            let (value, _) = parser.parse(&request).unwrap().unwrap();
            black_box(handler.execute(value).unwrap());
        });
    });

    group.finish();
}

fn bench_snapshot(c: &mut Criterion) {
    let mut data = b"REDIS0011".to_vec();
    data.extend_from_slice(&[0xFE, 0x00, 0xFB, 0x00, 0x00]);
    for i in 0..1_000 {
        let key = format!("key:{}", i);
        let value = format!("value:{}", i);
        data.push(0x00);
        data.push(key.len() as u8);
        data.extend_from_slice(key.as_bytes());
        data.push(value.len() as u8);
        data.extend_from_slice(value.as_bytes());
    }
    data.push(0xFF);
    data.extend_from_slice(&[0; 8]);

    let mut group = c.benchmark_group("snapshot");
    group.throughput(Throughput::Bytes(data.len() as u64));

    group.bench_function("decode_1000_pairs", |b| {
        b.iter(|| black_box(snapshot::decode(&data).unwrap()));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_set,
    bench_get,
    bench_hash,
    bench_concurrent,
    bench_keys,
    bench_protocol,
    bench_snapshot,
);

criterion_main!(benches);
