//! Cache model tests.
//!
//! A small deterministic cache makes the geometry auditable:
//! 256 bytes, 64-byte blocks, 2 ways -> 2 sets.
//!
//!   set index = (addr / 64) % 2
//!   tag       = (addr / 64) / 2

use m2sim_core::config::CacheConfig;
use m2sim_core::core::units::cache::{BackingStore, Cache};
use m2sim_core::mem::Memory;

fn test_config() -> CacheConfig {
    CacheConfig {
        enabled: true,
        size_bytes: 256,
        line_bytes: 64,
        ways: 2,
        hit_latency: 1,
        miss_latency: 10,
    }
}

fn cache_and_memory() -> (Cache, Memory) {
    (Cache::new(&test_config()), Memory::new(2, None))
}

// ══════════════════════════════════════════════════════════
// 1. Hit/miss basics
// ══════════════════════════════════════════════════════════

#[test]
fn cold_miss_then_warm_hit() {
    let (mut cache, mut mem) = cache_and_memory();

    let first = cache.read(0x1000, 8, &mut mem).unwrap();
    assert!(!first.hit, "first touch is a compulsory miss");
    assert_eq!(first.latency, 10 + 2, "miss latency plus backing fill");

    let second = cache.read(0x1000, 8, &mut mem).unwrap();
    assert!(second.hit);
    assert_eq!(second.latency, 1);
}

/// Accesses within one block hit after the first.
#[test]
fn same_block_different_offset_hits() {
    let (mut cache, mut mem) = cache_and_memory();
    let _ = cache.read(0x1000, 4, &mut mem).unwrap();
    assert!(cache.read(0x1020, 4, &mut mem).unwrap().hit);
    assert!(cache.read(0x103C, 4, &mut mem).unwrap().hit);
}

/// The bytes at block_end and block_end+1 belong to different blocks and
/// each takes its own cold miss.
#[test]
fn block_boundary_splits_cold_misses() {
    let (mut cache, mut mem) = cache_and_memory();
    let last = cache.read(0x103F, 1, &mut mem).unwrap();
    assert!(!last.hit);
    let next = cache.read(0x1040, 1, &mut mem).unwrap();
    assert!(!next.hit, "next byte lives in the next block");
}

/// A read spanning the boundary touches both blocks.
#[test]
fn straddling_read_touches_both_blocks() {
    let (mut cache, mut mem) = cache_and_memory();
    mem.write_u64(0x103C, 0x1122_3344_5566_7788).unwrap();

    let access = cache.read(0x103C, 8, &mut mem).unwrap();
    assert!(!access.hit);
    assert_eq!(access.data, 0x1122_3344_5566_7788);
    assert_eq!(cache.misses, 2);

    // Both halves now resident.
    assert!(cache.read(0x103C, 8, &mut mem).unwrap().hit);
}

// ══════════════════════════════════════════════════════════
// 2. Data correctness
// ══════════════════════════════════════════════════════════

/// write-then-read without conflict returns the value and reports a hit.
#[test]
fn write_then_read_hits_with_value() {
    let (mut cache, mut mem) = cache_and_memory();
    let _ = cache.write(0x2000, 8, 0xCAFE_F00D, &mut mem).unwrap();
    let access = cache.read(0x2000, 8, &mut mem).unwrap();
    assert!(access.hit);
    assert_eq!(access.data, 0xCAFE_F00D);
}

/// Write-back: dirty data reaches memory only on eviction or flush.
#[test]
fn write_back_defers_memory_update() {
    let (mut cache, mut mem) = cache_and_memory();
    let _ = cache.write(0x2000, 8, 0xAA55, &mut mem).unwrap();
    assert_eq!(mem.read_u64(0x2000), 0, "write-back must not reach memory yet");

    cache.flush(&mut mem).unwrap();
    assert_eq!(mem.read_u64(0x2000), 0xAA55);

    // Flush cleared dirty bits but kept the block resident.
    assert!(cache.read(0x2000, 8, &mut mem).unwrap().hit);
}

/// Evicting a dirty block writes it back and reports the evicted address.
#[test]
fn dirty_eviction_writes_back() {
    let (mut cache, mut mem) = cache_and_memory();
    // Three block addresses all mapping to set 0 (multiples of 128).
    let _ = cache.write(0, 8, 0x1111, &mut mem).unwrap();
    let _ = cache.read(128, 8, &mut mem).unwrap();
    let third = cache.read(256, 8, &mut mem).unwrap();

    assert_eq!(third.evicted, Some(0), "LRU victim is the dirty block at 0");
    assert_eq!(mem.read_u64(0), 0x1111, "victim written back");
}

// ══════════════════════════════════════════════════════════
// 3. Associativity invariants
// ══════════════════════════════════════════════════════════

/// A 2-way set holds at most two blocks; the third distinct block evicts
/// exactly one, and eviction count tracks distinct blocks minus ways.
#[test]
fn set_holds_at_most_n_ways() {
    let (mut cache, mut mem) = cache_and_memory();
    // Five distinct blocks in set 0.
    for i in 0..5u64 {
        let _ = cache.read(i * 128, 8, &mut mem).unwrap();
        assert!(cache.live_blocks_in_set(0) <= 2);
    }
    assert_eq!(cache.live_blocks_in_set(0), 2);
    assert_eq!(cache.misses, 5);
}

/// LRU: re-touching the older block makes the other one the victim.
#[test]
fn lru_replacement_order() {
    let (mut cache, mut mem) = cache_and_memory();
    let _ = cache.read(0, 8, &mut mem).unwrap(); // block A
    let _ = cache.read(128, 8, &mut mem).unwrap(); // block B
    let _ = cache.read(0, 8, &mut mem).unwrap(); // touch A -> B is LRU
    let _ = cache.read(256, 8, &mut mem).unwrap(); // evicts B

    assert!(cache.read(0, 8, &mut mem).unwrap().hit, "A must survive");
    assert!(!cache.read(128, 8, &mut mem).unwrap().hit, "B was evicted");
}

// ══════════════════════════════════════════════════════════
// 4. Hierarchy composition
// ══════════════════════════════════════════════════════════

/// An L1 miss fills from L2; a second L1 miss to the same L2 block hits in
/// L2 (chained through the BackingStore adapter).
#[test]
fn l1_fills_through_l2() {
    use m2sim_core::core::units::cache::CacheChain;

    let mut l1 = Cache::new(&test_config());
    let mut l2 = Cache::new(&CacheConfig {
        enabled: true,
        size_bytes: 1024,
        line_bytes: 128,
        ways: 2,
        hit_latency: 5,
        miss_latency: 50,
    });
    let mut mem = Memory::new(2, None);
    mem.write_u64(0x1000, 0xDADA).unwrap();

    let access = {
        let mut chain = CacheChain {
            cache: &mut l2,
            next: &mut mem,
        };
        l1.read(0x1000, 8, &mut chain).unwrap()
    };
    assert!(!access.hit);
    assert_eq!(access.data, 0xDADA);
    assert_eq!(l2.misses, 1);

    // Evict nothing, touch the sibling L1 block inside the same L2 block.
    let access = {
        let mut chain = CacheChain {
            cache: &mut l2,
            next: &mut mem,
        };
        l1.read(0x1040, 8, &mut chain).unwrap()
    };
    assert!(!access.hit, "different L1 block");
    assert_eq!(l2.hits, 1, "same L2 block: the fill hits in L2");
}

// ══════════════════════════════════════════════════════════
// 5. BackingStore contract
// ══════════════════════════════════════════════════════════

/// Memory charges one transaction latency per block transfer.
#[test]
fn memory_backing_charges_flat_latency() {
    let mut mem = Memory::new(7, None);
    let mut buf = [0u8; 64];
    assert_eq!(mem.read_block(0x100, &mut buf).unwrap(), 7);
    assert_eq!(mem.write_block(0x100, &buf).unwrap(), 7);
}
