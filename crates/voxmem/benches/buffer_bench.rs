//! Benchmarks for buffer lock and dump/restore throughput.

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use std::sync::Arc;
use voxmem::{BufferManager, BufferObject, MemoryStreamFactory, StorageKey};

const BUFFER_SIZE: u64 = 1024 * 1024;

fn bench_lock_acquire(c: &mut Criterion) {
    let manager = BufferManager::with_defaults();
    let buffer = BufferObject::new(&manager);
    buffer.allocate(BUFFER_SIZE).unwrap();

    c.bench_function("lock_acquire_release", |b| {
        b.iter(|| {
            let lock = buffer.lock().unwrap();
            black_box(lock.bytes().len());
        });
    });
}

fn bench_dump_restore(c: &mut Criterion) {
    let manager = BufferManager::with_defaults();
    let factory = Arc::new(MemoryStreamFactory::new());
    let buffer = BufferObject::new(&manager);
    buffer.allocate(BUFFER_SIZE).unwrap();
    buffer
        .set_stream_factory(factory, StorageKey::from("bench"), 0)
        .unwrap();

    let mut group = c.benchmark_group("dump_restore");
    group.throughput(Throughput::Bytes(BUFFER_SIZE));
    group.bench_function("round_trip_1mib", |b| {
        b.iter(|| {
            assert!(manager.dump(buffer.id()).unwrap());
            assert!(manager.restore(buffer.id()).unwrap());
        });
    });
    group.finish();
}

criterion_group!(benches, bench_lock_acquire, bench_dump_restore);
criterion_main!(benches);
