//! Session Store Benchmarks
//!
//! Covers the hot paths of a broker's connect / disconnect cycle:
//! - get (hit, miss, expired)
//! - put (fresh client, replace with will)
//! - disconnect (with and without will delivery)
//! - clean_up over a bucket of expired sessions
//!
//! ## Running
//!
//! ```bash
//! cargo bench --bench session_store
//! cargo bench --bench session_store -- "session_store/get"
//! ```

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use rand::prelude::*;

use mqtt_session_store::testing::{ManualClock, MemoryPayloadStore};
use mqtt_session_store::{ClientSession, ClientSessionStore, ClientSessionWill, StoreConfig, Timestamp, WillPublish};

// =============================================================================
// Constants and Configuration
// =============================================================================

/// Fixed seed for deterministic client selection.
const BENCH_SEED: u64 = 0xDEADBEEF_CAFEBABE;

/// Client counts for scaling benchmarks.
const CLIENT_COUNTS: &[usize] = &[1_000, 10_000, 100_000];

// =============================================================================
// Helper Functions
// =============================================================================

struct Fixture {
    store: ClientSessionStore,
    payloads: Arc<MemoryPayloadStore>,
    clock: Arc<ManualClock>,
    ids: Vec<String>,
}

fn fixture(clients: usize) -> Fixture {
    let payloads = Arc::new(MemoryPayloadStore::new());
    let clock = Arc::new(ManualClock::new(Timestamp::from_millis(1_000)));
    let store = ClientSessionStore::new(StoreConfig::default(), payloads.clone())
        .unwrap()
        .with_clock(clock.clone());
    let ids: Vec<String> = (0..clients).map(|i| format!("client-{:08}", i)).collect();
    for id in &ids {
        store
            .put_by_id(id, ClientSession::new(true, 60), Timestamp::from_millis(1_000))
            .unwrap();
    }
    Fixture {
        store,
        payloads,
        clock,
        ids,
    }
}

fn will(payloads: &MemoryPayloadStore) -> ClientSessionWill {
    let payload_id = payloads.add(vec![0u8; 64]);
    ClientSessionWill::new(WillPublish::new("devices/state", None), payload_id)
}

// =============================================================================
// Benchmarks
// =============================================================================

fn bench_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("session_store/get");
    group.throughput(Throughput::Elements(1));

    for &clients in CLIENT_COUNTS {
        let f = fixture(clients);
        let mut rng = StdRng::seed_from_u64(BENCH_SEED);

        group.bench_with_input(BenchmarkId::new("hit", clients), &clients, |b, _| {
            b.iter(|| {
                let id = &f.ids[rng.gen_range(0..f.ids.len())];
                black_box(f.store.get_session_by_id(id).unwrap())
            });
        });

        group.bench_with_input(BenchmarkId::new("miss", clients), &clients, |b, _| {
            b.iter(|| black_box(f.store.get_session_by_id("no-such-client").unwrap()));
        });
    }

    let f = fixture(1_000);
    for id in &f.ids {
        f.store.disconnect_by_id(id, Timestamp::from_millis(1_000), false, Some(1)).unwrap();
    }
    f.clock.advance_millis(10_000);
    group.bench_function("expired", |b| {
        b.iter(|| black_box(f.store.get_session_by_id(&f.ids[0]).unwrap()));
    });

    group.finish();
}

fn bench_put(c: &mut Criterion) {
    let mut group = c.benchmark_group("session_store/put");
    group.throughput(Throughput::Elements(1));

    let f = fixture(10_000);
    let mut next = 0u64;
    group.bench_function("fresh_client", |b| {
        b.iter(|| {
            next += 1;
            let id = format!("fresh-{}", next);
            f.store
                .put_by_id(&id, ClientSession::new(true, 60), Timestamp::from_millis(2_000))
                .unwrap();
        });
    });

    group.bench_function("replace_with_will", |b| {
        b.iter(|| {
            let session = ClientSession::with_will(true, 60, will(&f.payloads));
            f.store.put_by_id(&f.ids[0], session, Timestamp::from_millis(2_000)).unwrap();
        });
    });

    group.finish();
}

fn bench_disconnect(c: &mut Criterion) {
    let mut group = c.benchmark_group("session_store/disconnect");
    group.throughput(Throughput::Elements(1));

    let f = fixture(10_000);
    for send_will in [false, true] {
        group.bench_with_input(BenchmarkId::new("send_will", send_will), &send_will, |b, &send_will| {
            b.iter_batched(
                || {
                    let session = ClientSession::with_will(true, 60, will(&f.payloads));
                    f.store.put_by_id(&f.ids[1], session, Timestamp::from_millis(2_000)).unwrap();
                },
                |_| {
                    black_box(
                        f.store
                            .disconnect_by_id(&f.ids[1], Timestamp::from_millis(3_000), send_will, None)
                            .unwrap(),
                    )
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

fn bench_clean_up(c: &mut Criterion) {
    let mut group = c.benchmark_group("session_store/clean_up");

    group.bench_function("expired_bucket", |b| {
        b.iter_batched(
            || {
                let f = fixture(1_000);
                for id in &f.ids {
                    f.store.disconnect_by_id(id, Timestamp::from_millis(1_000), false, Some(1)).unwrap();
                }
                f.clock.advance_millis(10_000);
                f
            },
            |f| {
                for bucket in 0..f.store.bucket_count() {
                    black_box(f.store.clean_up(bucket).unwrap());
                }
            },
            BatchSize::LargeInput,
        );
    });

    group.finish();
}

criterion_group!(benches, bench_get, bench_put, bench_disconnect, bench_clean_up);
criterion_main!(benches);
