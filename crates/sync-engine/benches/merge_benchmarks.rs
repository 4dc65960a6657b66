// crates/sync-engine/benches/merge_benchmarks.rs
//! Benchmarks for the type-specific mergers and conflict detection

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::{json, Value};
use shopsync_core::{RecordType, SyncRecord};
use shopsync_sync_engine::merge::{merge_cart, merge_interactions, merge_records};
use shopsync_sync_engine::ConflictDetector;
use std::hint::black_box;

fn cart(items: usize, offset: usize) -> Value {
    Value::Array(
        (0..items)
            .map(|i| json!({"productId": format!("p{}", i + offset), "quantity": (i % 7) + 1}))
            .collect(),
    )
}

fn history(events: usize, offset: i64) -> Value {
    Value::Array(
        (0..events as i64)
            .map(|i| json!({"productId": format!("p{}", i % 50), "timestamp": i * 10 + offset, "action": "like"}))
            .collect(),
    )
}

fn bench_cart_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("cart_merge");
    for size in [10, 100, 1000] {
        let local = cart(size, 0);
        let remote = cart(size, size / 2);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| merge_cart(black_box(&local), black_box(&remote)))
        });
    }
    group.finish();
}

fn bench_history_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("interaction_merge");
    for size in [100, 1000, 5000] {
        let local = history(size, 0);
        let remote = history(size, 5);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| merge_interactions(black_box(&local), black_box(&remote)))
        });
    }
    group.finish();
}

fn bench_record_merge(c: &mut Criterion) {
    let local = SyncRecord::new(RecordType::Cart, "u1", cart(200, 0), "dev-a", "ios").with_version(3);
    let remote = SyncRecord::new(RecordType::Cart, "u1", cart(200, 100), "dev-b", "web").with_version(4);

    c.bench_function("merge_records_cart_200", |b| {
        b.iter(|| merge_records(black_box(&local), black_box(&remote)))
    });
}

fn bench_detection(c: &mut Criterion) {
    let local: Vec<SyncRecord> = RecordType::ALL
        .iter()
        .map(|t| SyncRecord::new(*t, "u1", Value::Null, "dev-a", "ios").with_timestamp(1000))
        .collect();
    let remote: Vec<SyncRecord> = RecordType::ALL
        .iter()
        .map(|t| {
            SyncRecord::new(*t, "u1", Value::Null, "dev-b", "web")
                .with_timestamp(9000)
                .with_version(2)
        })
        .collect();
    let detector = ConflictDetector::default();

    c.bench_function("detect_all_types", |b| {
        b.iter(|| detector.detect(black_box(&local), black_box(&remote)))
    });
}

criterion_group!(
    benches,
    bench_cart_merge,
    bench_history_merge,
    bench_record_merge,
    bench_detection
);
criterion_main!(benches);
