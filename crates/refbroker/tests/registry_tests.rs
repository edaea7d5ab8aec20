//! Registry tests

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use pretty_assertions::assert_eq;
use refbroker::*;

// ═══════════════════════════════════════════════════════════════════════
// Basic Operations
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_registry_new_is_empty() {
    let registry = ReferenceRegistry::new();
    assert!(registry.is_empty());
    assert_eq!(registry.len(), 0);
}

#[test]
fn test_handles_issue_in_order() {
    let registry = ReferenceRegistry::new();
    let handles: Vec<i64> = (0..3)
        .map(|i| registry.track_object(Arc::new(i)).raw())
        .collect();
    assert_eq!(handles, vec![1, 2, 3]);
    assert_eq!(registry.len(), 3);
}

#[test]
fn test_resolve_immediately_after_track() {
    let registry = ReferenceRegistry::new();
    let obj: TrackedObject = Arc::new(vec![1u8, 2, 3]);
    let handle = registry.track_object(obj.clone());

    let found = registry.find_object(handle).unwrap();
    assert!(Arc::ptr_eq(&obj, &found));
    assert_eq!(found.downcast_ref::<Vec<u8>>(), Some(&vec![1, 2, 3]));
}

// ═══════════════════════════════════════════════════════════════════════
// Release
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_release_then_resolve_is_not_found() {
    let registry = ReferenceRegistry::new();
    let handle = registry.track_object(Arc::new("x"));
    registry.release(handle);

    match registry.resolve(handle) {
        Err(BrokerError::NotFound { handle: missing }) => assert_eq!(missing, handle),
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[test]
fn test_release_twice_and_unknown() {
    let registry = ReferenceRegistry::new();
    let handle = registry.track_object(Arc::new(1));
    registry.release(handle);
    registry.release(handle);
    registry.release(Handle::from_raw(12345));
    registry.release(Handle::NONE);
    assert!(registry.is_empty());
}

#[test]
fn test_release_leaves_other_handles() {
    let registry = ReferenceRegistry::new();
    let a = registry.track_object(Arc::new('a'));
    let b = registry.track_object(Arc::new('b'));
    registry.release(a);
    assert!(!registry.contains(a));
    assert!(registry.contains(b));
}

#[test]
fn test_handle_from_other_registry_not_found() {
    let first = ReferenceRegistry::new();
    let second = ReferenceRegistry::new();
    let handle = first.track_object(Arc::new(()));
    assert!(second.resolve(handle).unwrap_err().is_not_found());
}

// ═══════════════════════════════════════════════════════════════════════
// Concurrency
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_concurrent_tracking_issues_distinct_handles() {
    const THREADS: usize = 8;
    const PER_THREAD: usize = 500;

    let registry = ReferenceRegistry::new();

    let per_thread: Vec<Vec<Handle>> = thread::scope(|s| {
        let workers: Vec<_> = (0..THREADS)
            .map(|t| {
                let registry = &registry;
                s.spawn(move || {
                    (0..PER_THREAD)
                        .map(|i| registry.track_object(Arc::new((t, i))))
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        workers.into_iter().map(|w| w.join().unwrap()).collect()
    });

    // Strictly increasing as observed by each thread
    for handles in &per_thread {
        assert!(handles.windows(2).all(|w| w[0] < w[1]));
    }

    let all: HashSet<Handle> = per_thread.iter().flatten().copied().collect();
    assert_eq!(all.len(), THREADS * PER_THREAD);
    assert!(all.iter().all(|h| h.raw() >= 1));
    assert_eq!(registry.len(), THREADS * PER_THREAD);
}

#[test]
fn test_concurrent_track_resolve_release() {
    let registry = ReferenceRegistry::new();

    thread::scope(|s| {
        for t in 0..4u32 {
            let registry = &registry;
            s.spawn(move || {
                for i in 0..250u32 {
                    let obj: TrackedObject = Arc::new(t * 1000 + i);
                    let handle = registry.track_object(obj.clone());
                    let found = registry.resolve(handle).unwrap();
                    assert!(Arc::ptr_eq(&obj, &found));
                    registry.release(handle);
                    // Racing double release is harmless
                    registry.release(handle);
                    assert!(registry.resolve(handle).is_err());
                }
            });
        }
    });

    assert!(registry.is_empty());
}

#[test]
fn test_resolve_from_other_thread_after_track() {
    let registry = ReferenceRegistry::new();
    let handle = registry.track_object(Arc::new(String::from("shared")));

    thread::scope(|s| {
        s.spawn(|| {
            let found = registry.resolve(handle).unwrap();
            assert_eq!(found.downcast_ref::<String>().unwrap(), "shared");
        });
    });
}
