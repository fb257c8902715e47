//! Concurrency tests for the session store
//!
//! - Writers on different buckets never corrupt each other's counters
//! - Writers contending on one bucket stay serialized
//! - Readers never observe a partially updated session

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use session_core::{ClientSession, ClientSessionWill, Timestamp, WillPublish};
use session_storage::testing::MemoryPayloadStore;
use session_storage::{ClientSessionStore, StoreConfig};

fn store(bucket_count: usize) -> (Arc<ClientSessionStore>, Arc<MemoryPayloadStore>) {
    let payloads = Arc::new(MemoryPayloadStore::new());
    let store = ClientSessionStore::new(
        StoreConfig::new().with_bucket_count(bucket_count),
        payloads.clone(),
    )
    .unwrap();
    (Arc::new(store), payloads)
}

#[test]
fn test_concurrent_writers_different_clients() {
    let (store, _) = store(16);

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for i in 0..200 {
                    let id = format!("t{}-client{}", t, i);
                    let now = Timestamp::now();
                    store.put_by_id(&id, ClientSession::new(true, i % 3), now).unwrap();
                    if i % 2 == 0 {
                        store.disconnect_by_id(&id, now, false, None).unwrap();
                    }
                    if i % 5 == 0 {
                        store.remove_by_id(&id).unwrap();
                    }
                }
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(store.sessions_count(), store.recount_sessions());
    assert_eq!(store.memory_size(), store.recompute_memory_size());
    assert_eq!(store.total_entries(), 8 * (200 - 40));
}

#[test]
fn test_contended_bucket_keeps_references_paired() {
    let (store, payloads) = store(1);

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let store = Arc::clone(&store);
            let payloads = Arc::clone(&payloads);
            thread::spawn(move || {
                for i in 0..300i64 {
                    let id = format!("shared-{}", i % 4);
                    let now = Timestamp::now();
                    match (t + i) % 4 {
                        0 | 1 => {
                            let payload_id = payloads.add(vec![t as u8]);
                            let will = ClientSessionWill::new(WillPublish::new("w", None), payload_id);
                            store
                                .put(&id, ClientSession::with_will(true, i % 2, will), now, 0)
                                .unwrap();
                        }
                        2 => {
                            store.disconnect(&id, now, i % 3 == 0, 0, None).unwrap();
                        }
                        _ => {
                            store.remove_with_timestamp(&id, 0).unwrap();
                        }
                    }
                }
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }

    let live_wills = store
        .get_all_clients(0)
        .unwrap()
        .iter()
        .filter_map(|id| store.get_session(id, 0, false, false).unwrap())
        .filter(|session| session.will().is_some())
        .count() as i64;
    assert_eq!(payloads.outstanding_references(), live_wills);
    assert_eq!(store.sessions_count(), store.recount_sessions());
    assert_eq!(store.memory_size(), store.recompute_memory_size());
}

#[test]
fn test_readers_never_see_torn_sessions() {
    let (store, _) = store(2);
    let stop = Arc::new(AtomicBool::new(false));
    store.put("flip", ClientSession::new(true, 10), Timestamp::now(), 0).unwrap();

    let writer = {
        let store = Arc::clone(&store);
        let stop = Arc::clone(&stop);
        thread::spawn(move || {
            let mut connected = true;
            while !stop.load(Ordering::Relaxed) {
                connected = !connected;
                // connected sessions always carry expiry 10, disconnected ones 20
                let expiry = if connected { 10 } else { 20 };
                store
                    .put("flip", ClientSession::new(connected, expiry), Timestamp::now(), 0)
                    .unwrap();
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for _ in 0..5_000 {
                    let session = store.get_session("flip", 0, false, false).unwrap().unwrap();
                    let expected = if session.is_connected() { 10 } else { 20 };
                    assert_eq!(session.session_expiry_interval(), expected);
                }
            })
        })
        .collect();

    for r in readers {
        r.join().unwrap();
    }
    stop.store(true, Ordering::Relaxed);
    writer.join().unwrap();

    assert_eq!(store.sessions_count(), 1);
}

#[test]
fn test_random_mixed_workload() {
    use rand::prelude::*;

    let (store, payloads) = store(4);

    let handles: Vec<_> = (0..6u64)
        .map(|seed| {
            let store = Arc::clone(&store);
            let payloads = Arc::clone(&payloads);
            thread::spawn(move || {
                let mut rng = StdRng::seed_from_u64(seed);
                for _ in 0..1_000 {
                    let id = format!("client-{}", rng.gen_range(0..32));
                    let now = Timestamp::now();
                    match rng.gen_range(0..5) {
                        0 => {
                            let payload_id = payloads.add(vec![0u8; rng.gen_range(0..16)]);
                            let will = ClientSessionWill::new(WillPublish::new("w", None), payload_id);
                            let session = ClientSession::with_will(rng.gen(), rng.gen_range(0..3), will);
                            store.put_by_id(&id, session, now).unwrap();
                        }
                        1 => {
                            store.put_by_id(&id, ClientSession::new(rng.gen(), rng.gen_range(0..3)), now).unwrap();
                        }
                        2 => {
                            let expiry = if rng.gen_bool(0.5) { Some(rng.gen_range(0..3)) } else { None };
                            store.disconnect_by_id(&id, now, rng.gen(), expiry).unwrap();
                        }
                        3 => {
                            store.remove_will_by_id(&id).unwrap();
                        }
                        _ => {
                            let _ = store.get_session_by_id(&id).unwrap();
                        }
                    }
                }
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(store.sessions_count(), store.recount_sessions());
    assert_eq!(store.memory_size(), store.recompute_memory_size());

    for bucket in 0..store.bucket_count() {
        for id in store.get_all_clients(bucket).unwrap() {
            store.remove_with_timestamp(&id, bucket).unwrap();
        }
    }
    assert_eq!(payloads.outstanding_references(), 0);
    assert_eq!(store.sessions_count(), 0);
}
