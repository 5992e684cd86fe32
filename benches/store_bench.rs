//! Benchmarks for segkv store operations

use criterion::{criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use segkv::{Config, Store};
use tempfile::TempDir;

fn open_store(flush_threshold: usize) -> (TempDir, Store) {
    let temp = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp.path())
        .flush_threshold(flush_threshold)
        .rotation_threshold(64 * 1024 * 1024)
        .build();
    let store = Store::open(config).unwrap();
    (temp, store)
}

fn set_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("set");
    group.throughput(Throughput::Elements(1000));

    for flush_threshold in [1usize, 64, 1024] {
        group.bench_function(format!("1000 keys, flush every {}", flush_threshold), |b| {
            b.iter_batched(
                || open_store(flush_threshold),
                |(_temp, store)| {
                    for i in 0..1000 {
                        store.set(&format!("key{}", i), "value").unwrap();
                    }
                    store.close().unwrap();
                },
                BatchSize::PerIteration,
            )
        });
    }

    group.finish();
}

fn get_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("get");

    // Everything stays buffered
    let (_mem_temp, memtable_store) = open_store(100_000);
    for i in 0..1000 {
        memtable_store.set(&format!("key{}", i), "value").unwrap();
    }
    group.bench_function("memtable hit", |b| {
        let mut i = 0;
        b.iter(|| {
            i = (i + 1) % 1000;
            memtable_store.get(&format!("key{}", i)).unwrap()
        })
    });

    // Everything flushed to the active segment
    let (_disk_temp, disk_store) = open_store(1);
    for i in 0..1000 {
        disk_store.set(&format!("key{}", i), "value").unwrap();
    }
    group.bench_function("segment read", |b| {
        let mut i = 0;
        b.iter(|| {
            i = (i + 1) % 1000;
            disk_store.get(&format!("key{}", i)).unwrap()
        })
    });

    group.bench_function("miss", |b| b.iter(|| disk_store.get("absent").unwrap()));

    group.finish();
}

fn mixed_benchmarks(c: &mut Criterion) {
    let (_temp, store) = open_store(64);
    for i in 0..1000 {
        store.set(&format!("key{}", i), "value").unwrap();
    }

    c.bench_function("mixed 80/20 read/write", |b| {
        let mut i = 0u64;
        b.iter(|| {
            i += 1;
            let key = format!("key{}", i % 1000);
            if i % 5 == 0 {
                store.set(&key, "updated").unwrap();
            } else {
                store.get(&key).unwrap();
            }
        })
    });
}

criterion_group!(benches, set_benchmarks, get_benchmarks, mixed_benchmarks);
criterion_main!(benches);
