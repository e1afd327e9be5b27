//! Routing benchmark suite.
//!
//! Benchmarks the per-frame hot path at different scales:
//! - Frame decoding (typed, untyped, malformed)
//! - Dispatch with 1, 10, 100 listeners per channel
//! - History insertion at capacity
//!
//! Run with: cargo bench --bench dispatch
//! Results saved to: target/criterion/

use std::hint::black_box;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use campus_notify::{EventKey, EventRouter, InboundFrame, Notification, NotificationStore};
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use serde_json::json;

// ============================================================================
// Benchmark Parameters
// ============================================================================

const LISTENER_COUNTS: &[usize] = &[1, 10, 100];
const CAPACITIES: &[usize] = &[10, 100, 1000];

const TYPED_FRAME: &str =
    r#"{"type":"CLASS_CREATED","message":"Class X created","data":{"id":1,"className":"X"}}"#;
const UNTYPED_FRAME: &str = r#"{"type":"ANNOUNCEMENT","message":"Campus closed Friday"}"#;
const MALFORMED_FRAME: &str = "not json at all";

// ============================================================================
// Benchmark: Decode
// ============================================================================

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");
    group.throughput(Throughput::Elements(1));

    for (name, frame) in [
        ("typed", TYPED_FRAME),
        ("untyped", UNTYPED_FRAME),
        ("malformed", MALFORMED_FRAME),
    ] {
        group.bench_function(name, |b| {
            b.iter(|| InboundFrame::decode(black_box(frame)).ok());
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: Dispatch
// ============================================================================

fn bench_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch");
    group.throughput(Throughput::Elements(1));

    for &count in LISTENER_COUNTS {
        let router = EventRouter::new(Arc::new(NotificationStore::new()));
        let hits = Arc::new(AtomicU64::new(0));

        for _ in 0..count {
            let typed = Arc::clone(&hits);
            router.on(EventKey::ClassCreated, move |_| {
                typed.fetch_add(1, Ordering::Relaxed);
            });
            let generic = Arc::clone(&hits);
            router.on_notification(move |_| {
                generic.fetch_add(1, Ordering::Relaxed);
            });
        }

        group.bench_with_input(BenchmarkId::new("typed", count), &count, |b, _| {
            b.iter(|| router.dispatch(black_box(TYPED_FRAME)));
        });
        group.bench_with_input(BenchmarkId::new("untyped", count), &count, |b, _| {
            b.iter(|| router.dispatch(black_box(UNTYPED_FRAME)));
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: Store
// ============================================================================

fn bench_store_record(c: &mut Criterion) {
    let mut group = c.benchmark_group("store_record");
    group.throughput(Throughput::Elements(1));

    let notification = Notification::from_frame(InboundFrame {
        kind: "CLASS_UPDATED".to_string(),
        message: Some("Class X updated".to_string()),
        data: json!({ "id": 1, "className": "X" }),
    });

    for &capacity in CAPACITIES {
        let store = NotificationStore::with_capacity(capacity);
        for _ in 0..capacity {
            store.record(notification.clone());
        }

        // Store is full, so every record also evicts
        group.bench_with_input(BenchmarkId::new("full", capacity), &capacity, |b, _| {
            b.iter(|| store.record(black_box(notification.clone())));
        });

        group.bench_with_input(BenchmarkId::new("snapshot", capacity), &capacity, |b, _| {
            b.iter(|| black_box(store.snapshot()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_decode, bench_dispatch, bench_store_record);
criterion_main!(benches);
