//! Integration tests for the pool manager

#![allow(unsafe_code)]

use std::collections::HashSet;
use std::ptr::NonNull;

use mempool::{ManagerConfig, MemoryError, PoolBox, PoolConfig, PoolManager, WORD_SIZE, api};
use pretty_assertions::assert_eq;
use rstest::rstest;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}

fn bytes(ptr: NonNull<u8>, len: usize) -> &'static [u8] {
    // SAFETY: tests only read allocations they currently hold.
    unsafe { std::slice::from_raw_parts(ptr.as_ptr(), len) }
}

#[test]
fn test_class_table_doubles_from_word() {
    let manager = PoolManager::new(256).expect("valid ceiling");
    let expected: Vec<usize> = std::iter::successors(Some(WORD_SIZE), |c| Some(c * 2))
        .take_while(|&c| c <= 256)
        .collect();
    assert_eq!(manager.size_classes(), expected.as_slice());
    assert_eq!(manager.max_class(), 256);
}

#[test]
fn test_non_power_of_two_ceiling_rounds_up() {
    let manager = PoolManager::new(300).expect("valid ceiling");
    assert_eq!(manager.max_class(), 512);
    assert!(manager.find_or_create_pool(300).is_some());
    assert!(manager.find_or_create_pool(512).is_some());
    assert!(manager.find_or_create_pool(513).is_none());
}

#[test]
fn test_unrepresentable_ceiling_is_rejected() {
    let err = PoolManager::new(usize::MAX).unwrap_err();
    assert!(matches!(err, MemoryError::InvalidConfig { .. }));
}

#[rstest]
#[case(256, 257)]
#[case(256, 4096)]
#[case(64, 65)]
fn test_no_pool_above_ceiling(#[case] max_size: usize, #[case] size: usize) {
    let manager = PoolManager::new(max_size).expect("valid ceiling");
    assert!(manager.find_or_create_pool(size).is_none());
    assert!(manager.try_allocate(size, false).is_none());
    assert!(manager.stats().is_empty());
}

#[test]
fn test_fallback_allocation_round_trip() {
    init_tracing();
    let manager = PoolManager::new(128).expect("valid ceiling");

    let ptr = manager.allocate(1000, true);
    assert!(bytes(ptr, 1000).iter().all(|&b| b == 0));
    assert_eq!(ptr.as_ptr() as usize % WORD_SIZE, 0);
    unsafe { manager.release(1000, ptr) };

    // The fallback path never creates a pool
    assert!(manager.stats().is_empty());
}

#[test]
fn test_zeroed_allocation_after_dirty_release() {
    let manager = PoolManager::new(256).expect("valid ceiling");

    let ptr = manager.allocate(48, false);
    unsafe { std::ptr::write_bytes(ptr.as_ptr(), 0xEE, 48) };
    unsafe { manager.release(48, ptr) };

    let again = manager.allocate(48, true);
    assert_eq!(again, ptr);
    // The whole 64-byte slot is cleared, not only the requested 48 bytes
    assert!(bytes(again, 64).iter().all(|&b| b == 0));
    unsafe { manager.release(48, again) };
}

#[test]
fn test_lifo_reuse_does_not_grow() {
    let manager = PoolManager::new(256).expect("valid ceiling");

    let held: Vec<_> = (0..10).map(|_| manager.allocate(16, false)).collect();
    let before = manager.pool(16).expect("created").stats();

    for &ptr in held.iter().rev() {
        unsafe { manager.release(16, ptr) };
    }
    let reused: Vec<_> = (0..10).map(|_| manager.allocate(16, false)).collect();

    assert_eq!(reused, held);
    let after = manager.pool(16).expect("created").stats();
    assert_eq!(after.blocks, before.blocks);
    assert_eq!(after.carved, before.carved);

    for ptr in reused {
        unsafe { manager.release(16, ptr) };
    }
}

#[rstest]
#[case(8, 1)]
#[case(8, 2)]
#[case(512, 3)]
fn test_growth_adds_one_block_per_exhaustion(#[case] size: usize, #[case] k: usize) {
    let manager = PoolManager::new(1024).expect("valid ceiling");
    let pool = manager.find_or_create_pool(size).expect("within ceiling");
    let per_block = pool.objects_per_block();

    let held: Vec<_> = (0..k * per_block + 1).map(|_| pool.allocate(false)).collect();
    assert_eq!(pool.stats().blocks, k + 1);

    let mut starts: Vec<usize> = held.iter().map(|p| p.as_ptr() as usize).collect();
    starts.sort_unstable();
    assert_eq!(starts.iter().collect::<HashSet<_>>().len(), held.len());
    assert!(starts.windows(2).all(|w| w[1] - w[0] >= size));

    for ptr in held {
        unsafe { pool.release(ptr) };
    }
}

#[rstest]
#[case(40, 400)]
#[case(400, 40)]
#[case(100, 1000)]
#[case(2000, 16)]
#[case(24, 24)]
fn test_reallocate_preserves_prefix(#[case] old_size: usize, #[case] new_size: usize) {
    let manager = PoolManager::new(256).expect("valid ceiling");

    let ptr = manager.allocate(old_size, false);
    for i in 0..old_size {
        unsafe { ptr.as_ptr().add(i).write(i as u8) };
    }

    let moved = unsafe { manager.reallocate(ptr, old_size, new_size) };
    assert_ne!(moved, ptr);
    let kept = old_size.min(new_size);
    let expected: Vec<u8> = (0..kept).map(|i| i as u8).collect();
    assert_eq!(bytes(moved, kept), expected.as_slice());

    unsafe { manager.release(new_size, moved) };
}

#[test]
fn test_checked_release_in_debug_mode() {
    init_tracing();
    let manager = PoolManager::with_config(ManagerConfig::debug(256)).expect("valid config");

    let ptr = manager.allocate(32, false);
    manager.checked_release(32, ptr).expect("live slot");

    let err = manager.checked_release(32, ptr).unwrap_err();
    assert_eq!(err.code(), "MEM:POOL:DOUBLE_FREE");
    assert!(err.is_misuse());

    let big = manager.allocate(300, false);
    let err = manager.checked_release(300, big).unwrap_err();
    assert!(matches!(err, MemoryError::ExceedsMaxSize { size: 300, max_size: 256 }));
    unsafe { manager.release(300, big) };
}

#[test]
fn test_checked_release_without_tracking() {
    let manager = PoolManager::new(64).expect("valid ceiling");
    let ptr = manager.allocate(8, false);
    let err = manager.checked_release(8, ptr).unwrap_err();
    assert_eq!(err.code(), "MEM:POOL:UNTRACKED");
    unsafe { manager.release(8, ptr) };
}

#[test]
fn test_zero_on_free_config() {
    let config = ManagerConfig::new(64).with_pool(PoolConfig {
        zero_on_free: true,
        track_slots: false,
    });
    let manager = PoolManager::with_config(config).expect("valid config");

    let ptr = manager.allocate(64, false);
    unsafe { std::ptr::write_bytes(ptr.as_ptr(), 0x11, 64) };
    unsafe { manager.release(64, ptr) };
    assert!(bytes(ptr, 64)[WORD_SIZE..].iter().all(|&b| b == 0));
}

#[test]
fn test_pool_box_uses_covering_class() {
    let manager = PoolManager::new(256).expect("valid ceiling");

    let boxed = PoolBox::new_in((1u32, 2u64, [3u8; 20]), &manager).expect("fits");
    assert_eq!(PoolBox::pool(&boxed).object_size(), 32);
    assert_eq!(boxed.2, [3u8; 20]);
    drop(boxed);

    let err = PoolBox::new_in([0u8; 300], &manager).unwrap_err();
    assert!(matches!(err, MemoryError::ExceedsMaxSize { size: 300, .. }));
}

#[test]
#[cfg(target_pointer_width = "64")]
fn test_bootstrap_holds_one_slot_per_created_class() {
    let manager = PoolManager::new(256).expect("valid ceiling");
    for size in [1, 9, 17, 100, 256, 9000] {
        let ptr = manager.allocate(size, false);
        unsafe { manager.release(size, ptr) };
    }
    let bootstrap = manager.bootstrap_stats();
    assert_eq!(bootstrap.live, 5);
    assert_eq!(
        manager.stats().iter().map(|s| s.object_size).collect::<Vec<_>>(),
        vec![8, 16, 32, 128, 256]
    );
}

#[test]
fn test_handle_api() {
    let mp = api::init(128).expect("valid ceiling");
    let ptr = api::alloc(&mp, 10, true);
    assert!(bytes(ptr, 10).iter().all(|&b| b == 0));
    unsafe { ptr.as_ptr().write(7) };

    let grown = unsafe { api::realloc(&mp, ptr, 10, 200) };
    assert_eq!(bytes(grown, 1), &[7]);
    unsafe { api::free(&mp, 200, grown) };
    api::teardown(mp);
}
