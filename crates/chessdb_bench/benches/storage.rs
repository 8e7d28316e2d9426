//! Storage backend benchmarks for slot-sized positional access.

use chessdb_storage::{FileBackend, InMemoryBackend, StorageBackend};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::Rng;
use tempfile::TempDir;

/// Slot sizes to benchmark; 68 bytes is a player slot.
const SLOT_SIZES: [usize; 3] = [16, 68, 256];
const SLOT_COUNT: u64 = 1000;

fn slot_data(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 256) as u8).collect()
}

fn prefilled(backend: &mut dyn StorageBackend, size: usize) {
    backend
        .append(&vec![0u8; size * SLOT_COUNT as usize])
        .unwrap();
}

/// Benchmark in-place slot writes at random positions.
fn bench_slot_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("slot_write");

    for size in SLOT_SIZES.iter() {
        group.throughput(Throughput::Bytes(*size as u64));

        group.bench_with_input(BenchmarkId::new("memory", size), size, |b, &size| {
            let mut backend = InMemoryBackend::new();
            prefilled(&mut backend, size);
            let data = slot_data(size);
            let mut rng = rand::thread_rng();

            b.iter(|| {
                let offset = rng.gen_range(0..SLOT_COUNT) * size as u64;
                backend.write_at(black_box(offset), black_box(&data)).unwrap();
            });
        });

        group.bench_with_input(BenchmarkId::new("file", size), size, |b, &size| {
            let temp_dir = TempDir::new().unwrap();
            let mut backend = FileBackend::open(&temp_dir.path().join("slots.chx")).unwrap();
            prefilled(&mut backend, size);
            let data = slot_data(size);
            let mut rng = rand::thread_rng();

            b.iter(|| {
                let offset = rng.gen_range(0..SLOT_COUNT) * size as u64;
                backend.write_at(black_box(offset), black_box(&data)).unwrap();
            });
        });
    }

    group.finish();
}

/// Benchmark slot reads at random positions.
fn bench_slot_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("slot_read");

    for size in SLOT_SIZES.iter() {
        group.throughput(Throughput::Bytes(*size as u64));

        group.bench_with_input(BenchmarkId::new("memory", size), size, |b, &size| {
            let mut backend = InMemoryBackend::new();
            prefilled(&mut backend, size);
            let mut rng = rand::thread_rng();

            b.iter(|| {
                let offset = rng.gen_range(0..SLOT_COUNT) * size as u64;
                black_box(backend.read_at(black_box(offset), size).unwrap());
            });
        });

        group.bench_with_input(BenchmarkId::new("file", size), size, |b, &size| {
            let temp_dir = TempDir::new().unwrap();
            let mut backend = FileBackend::open(&temp_dir.path().join("slots.chx")).unwrap();
            prefilled(&mut backend, size);
            let mut rng = rand::thread_rng();

            b.iter(|| {
                let offset = rng.gen_range(0..SLOT_COUNT) * size as u64;
                black_box(backend.read_at(black_box(offset), size).unwrap());
            });
        });
    }

    group.finish();
}

/// Benchmark one bulk read covering a batch of slots.
fn bench_range_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("range_read");
    let size = 68;

    for batch in [10usize, 100, 1000].iter() {
        group.throughput(Throughput::Elements(*batch as u64));
        group.bench_with_input(BenchmarkId::from_parameter(batch), batch, |b, &batch| {
            let temp_dir = TempDir::new().unwrap();
            let mut backend = FileBackend::open(&temp_dir.path().join("slots.chx")).unwrap();
            prefilled(&mut backend, size);

            b.iter(|| {
                black_box(backend.read_at(0, black_box(batch * size)).unwrap());
            });
        });
    }

    group.finish();
}

/// Benchmark a header rewrite followed by sync, as done on every commit.
fn bench_commit_sync(c: &mut Criterion) {
    let mut group = c.benchmark_group("commit_sync");
    group.sample_size(20);

    let temp_dir = TempDir::new().unwrap();
    let mut backend = FileBackend::open(&temp_dir.path().join("slots.chx")).unwrap();
    prefilled(&mut backend, 68);
    let header = slot_data(40);

    group.bench_function("header_40b", |b| {
        b.iter(|| {
            backend.write_at(0, black_box(&header)).unwrap();
            backend.sync().unwrap();
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_slot_write,
    bench_slot_read,
    bench_range_read,
    bench_commit_sync,
);

criterion_main!(benches);
