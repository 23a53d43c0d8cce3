use std::time::{Duration, Instant};

use depot::transaction::Transaction;
use depot::transaction::registry::{Admission, Registry};

const IDLE: Duration = Duration::from_secs(60);

fn txn(descriptor: usize) -> Transaction<()> {
    Transaction::new((), descriptor, 64)
}

fn must_accept(registry: &mut Registry<()>, descriptor: usize, now: Instant) {
    match registry.allocate(txn(descriptor), now) {
        Admission::Accepted { .. } => {}
        Admission::Refused(_) => panic!("descriptor {descriptor} refused"),
    }
}

#[test]
fn test_allocate_lookup_release() {
    let mut registry: Registry<()> = Registry::new(8, IDLE);
    let now = Instant::now();

    must_accept(&mut registry, 5, now);
    assert_eq!(registry.len(), 1);
    assert!(registry.lookup(5).is_some());
    assert!(registry.lookup(6).is_none());

    let released = registry.release(5);
    assert_eq!(released.map(|t| t.descriptor), Some(5));
    assert!(registry.lookup(5).is_none());
    assert!(registry.is_empty());
}

#[test]
fn test_release_absent_is_noop() {
    let mut registry: Registry<()> = Registry::new(8, IDLE);
    assert!(registry.release(42).is_none());
    assert_eq!(registry.len(), 0);
}

#[test]
fn test_colliding_descriptors_coexist() {
    // Descriptors 3, 11, 19 all hash to the same bucket of an 8-wide table.
    let mut registry: Registry<()> = Registry::new(8, IDLE);
    let now = Instant::now();
    for fd in [3, 11, 19] {
        must_accept(&mut registry, fd, now);
    }
    for fd in [3, 11, 19] {
        assert_eq!(registry.lookup(fd).map(|t| t.descriptor), Some(fd));
    }

    // Removing the middle of the chain leaves the others reachable.
    assert!(registry.release(11).is_some());
    assert!(registry.lookup(3).is_some());
    assert!(registry.lookup(11).is_none());
    assert!(registry.lookup(19).is_some());
}

#[test]
fn test_full_table_refuses_fresh_entries() {
    let mut registry: Registry<()> = Registry::new(2, IDLE);
    let now = Instant::now();
    must_accept(&mut registry, 1, now);
    must_accept(&mut registry, 2, now);

    match registry.allocate(txn(3), now) {
        Admission::Refused(rejected) => assert_eq!(rejected.descriptor, 3),
        Admission::Accepted { .. } => panic!("accepted beyond capacity"),
    }
    assert_eq!(registry.len(), 2);
}

#[test]
fn test_full_table_evicts_expired_lru() {
    let mut registry: Registry<()> = Registry::new(2, IDLE);
    let now = Instant::now();
    must_accept(&mut registry, 1, now);
    must_accept(&mut registry, 2, now);

    // Age descriptor 1 past the idle timeout; 2 stays fresh.
    registry.lookup(1).unwrap().last_active = now - Duration::from_secs(120);
    registry.touch(2, now);

    match registry.allocate(txn(3), now) {
        Admission::Accepted { evicted } => {
            assert_eq!(evicted.map(|t| t.descriptor), Some(1));
        }
        Admission::Refused(_) => panic!("expired entry not evicted"),
    }
    assert_eq!(registry.len(), 2);
    assert!(registry.lookup(1).is_none());
    assert!(registry.lookup(2).is_some());
    assert!(registry.lookup(3).is_some());
}

#[test]
fn test_eviction_spares_recently_active() {
    let mut registry: Registry<()> = Registry::new(2, IDLE);
    let now = Instant::now();
    must_accept(&mut registry, 1, now);
    must_accept(&mut registry, 2, now);

    // Both idle beyond the timeout, but 1 is touched back to life; the
    // LRU tail is then 2, and only 2 may go.
    registry.lookup(1).unwrap().last_active = now - Duration::from_secs(120);
    registry.lookup(2).unwrap().last_active = now - Duration::from_secs(120);
    registry.touch(1, now);

    match registry.allocate(txn(3), now) {
        Admission::Accepted { evicted } => {
            assert_eq!(evicted.map(|t| t.descriptor), Some(2));
        }
        Admission::Refused(_) => panic!("expired tail not evicted"),
    }
    assert!(registry.lookup(1).is_some());
}

#[test]
fn test_capacity_invariant_holds_under_churn() {
    let mut registry: Registry<()> = Registry::new(4, IDLE);
    let now = Instant::now();

    for fd in 0..32 {
        let _ = registry.allocate(txn(fd), now);
        assert!(registry.len() <= 4);
        if fd % 3 == 0 {
            registry.release(fd / 2);
        }
    }
    assert!(registry.len() <= 4);
}
