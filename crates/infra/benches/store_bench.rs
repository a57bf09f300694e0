//! Storage backend benchmarks
//!
//! Run with: `cargo bench --bench store_bench -p docket-infra`

use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use docket_core::{PersistentStore, SimpleKvStore, Store, StoreOptions};
use docket_infra::{FileKv, SqliteStore};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::runtime::Runtime;

fn payload(entries: usize) -> Value {
    let rows: Vec<Value> = (0..entries)
        .map(|i| {
            json!({
                "id": i,
                "matter": "Holloway v. Crane",
                "minutes": 6 * (i % 10),
                "memo": "reviewed filings",
            })
        })
        .collect();
    Value::Array(rows)
}

fn backends(dir: &TempDir) -> Vec<(&'static str, Arc<dyn Store>)> {
    let Ok(sqlite) = SqliteStore::open(dir.path().join("bench.db"), 4) else {
        return Vec::new();
    };
    let Ok(files) = FileKv::open(dir.path().join("kv")) else {
        return Vec::new();
    };
    let sqlite: Arc<dyn Store> = Arc::new(sqlite);
    let files: Arc<dyn Store> = Arc::new(SimpleKvStore::new(files));
    vec![("sqlite", sqlite), ("file", files)]
}

fn bench_save(c: &mut Criterion) {
    let Ok(rt) = Runtime::new() else { return };
    let Ok(dir) = TempDir::new() else { return };
    let mut group = c.benchmark_group("persistent_store_save");

    for (name, store) in backends(&dir) {
        for &entries in &[10usize, 1_000] {
            let value = payload(entries);
            for compress in [false, true] {
                let options = StoreOptions::new(format!("bench-{entries}")).with_compression(compress);
                let persistent = PersistentStore::new(Arc::clone(&store), options, Value::Null);
                let id = BenchmarkId::new(format!("{name}/compress={compress}"), entries);
                group.bench_with_input(id, &value, |b, value| {
                    b.to_async(&rt).iter(|| async { persistent.save(value).await });
                });
            }
        }
    }

    group.finish();
}

fn bench_load(c: &mut Criterion) {
    let Ok(rt) = Runtime::new() else { return };
    let Ok(dir) = TempDir::new() else { return };
    let mut group = c.benchmark_group("persistent_store_load");

    for (name, store) in backends(&dir) {
        for &entries in &[10usize, 1_000] {
            let options = StoreOptions::new(format!("bench-{entries}")).with_compression(true);
            let persistent = PersistentStore::new(Arc::clone(&store), options, Value::Null);
            if rt.block_on(persistent.save(&payload(entries))).is_err() {
                continue;
            }
            group.bench_function(BenchmarkId::new(name, entries), |b| {
                b.to_async(&rt).iter(|| persistent.load());
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_save, bench_load);
criterion_main!(benches);
