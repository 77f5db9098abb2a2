//! Build and read benchmarks for different block sizes and hash functions.
//!
//! Run with: cargo bench -p blocktree-core

use blocktree_core::{
    hash_blocktree, BuilderConfig, HashFunction, MemoryStore, TreeBuilder, TreeParams,
    TreeReader, DEFAULT_BLOCK_SIZE,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;

/// Generate random data
fn random_data(size: usize) -> Vec<u8> {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    (0..size).map(|_| rng.gen()).collect()
}

const SIZES: [(usize, &str); 2] = [(1, "1MB"), (10, "10MB")];

const BLOCK_SIZES: [(&str, usize); 2] = [("256KB", DEFAULT_BLOCK_SIZE), ("16KB", 16 * 1024)];

fn bench_tree_builder(c: &mut Criterion) {
    let mut group = c.benchmark_group("tree_builder");

    for (size_mb, size_name) in SIZES {
        let size = size_mb * 1024 * 1024;
        let data = random_data(size);
        group.throughput(Throughput::Bytes(size as u64));

        for (block_name, block_size) in BLOCK_SIZES {
            group.bench_with_input(BenchmarkId::new(block_name, size_name), &data, |b, data| {
                b.iter(|| {
                    let store = Arc::new(MemoryStore::new());
                    let builder =
                        TreeBuilder::new(BuilderConfig::new(store).with_block_size(block_size));
                    builder.put(black_box(data)).unwrap()
                })
            });
        }
    }

    group.finish();
}

fn bench_tree_reader(c: &mut Criterion) {
    let mut group = c.benchmark_group("tree_reader");

    for (size_mb, size_name) in SIZES {
        let size = size_mb * 1024 * 1024;
        let data = random_data(size);
        group.throughput(Throughput::Bytes(size as u64));

        for (block_name, block_size) in BLOCK_SIZES {
            let store = Arc::new(MemoryStore::new());
            let result = TreeBuilder::new(BuilderConfig::new(store.clone()).with_block_size(block_size))
                .put(&data)
                .unwrap();

            for verify in [true, false] {
                let reader = TreeReader::new(store.clone()).with_verification(verify);
                let id = format!("{}/verify={}", block_name, verify);
                group.bench_with_input(BenchmarkId::new(id, size_name), &result, |b, result| {
                    b.iter(|| reader.read_all(black_box(&result.tree_hash), result.size).unwrap())
                });
            }
        }
    }

    group.finish();
}

/// Hash-only throughput per function
fn bench_hash_functions(c: &mut Criterion) {
    let mut group = c.benchmark_group("hash_function");
    let size = 4 * 1024 * 1024;
    let data = random_data(size);
    group.throughput(Throughput::Bytes(size as u64));

    for function in [
        HashFunction::Sha256,
        HashFunction::Sha3_256,
        HashFunction::Blake2b,
        HashFunction::Blake2s,
    ] {
        let params = TreeParams::default().with_hash_function(function);
        group.bench_with_input(BenchmarkId::from_parameter(function.name()), &data, |b, data| {
            b.iter(|| hash_blocktree(&params, black_box(data)).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_tree_builder, bench_tree_reader, bench_hash_functions);
criterion_main!(benches);
