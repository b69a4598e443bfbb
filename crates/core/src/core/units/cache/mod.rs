//! Set-associative cache model.
//!
//! A data-carrying N-way set-associative write-back write-allocate cache
//! with LRU replacement, layered over a [`BackingStore`]. It provides:
//! 1. **Typed accesses:** `read`/`write` return hit status, latency, data,
//!    and the address of any dirty block written back.
//! 2. **Composition:** `Memory` is a backing store, and [`CacheChain`]
//!    makes a cache-plus-backing pair one as well, so L1 → L2 → memory
//!    hierarchies compose without back-references.
//! 3. **Maintenance:** `flush` writes back every dirty block; `invalidate`
//!    additionally drops contents (used around syscalls).
//!
//! Accesses that straddle a block boundary split into per-block accesses,
//! each with its own hit/miss accounting. Block fills and write-backs move
//! through the backing store in one transaction of ≤8-byte chunks.

use crate::config::CacheConfig;
use crate::error::SimError;
use crate::mem::Memory;

/// Transfer chunk size for backing-store transactions, in bytes.
const CHUNK_BYTES: usize = 8;

/// Something a cache can fetch blocks from and write blocks back to.
///
/// Implementations return the latency of the transaction in cycles.
pub trait BackingStore {
    /// Reads `buf.len()` bytes starting at `addr`.
    fn read_block(&mut self, addr: u64, buf: &mut [u8]) -> Result<u64, SimError>;

    /// Writes `data` starting at `addr`.
    fn write_block(&mut self, addr: u64, data: &[u8]) -> Result<u64, SimError>;
}

impl BackingStore for Memory {
    fn read_block(&mut self, addr: u64, buf: &mut [u8]) -> Result<u64, SimError> {
        for (i, chunk) in buf.chunks_mut(CHUNK_BYTES).enumerate() {
            self.read_bytes(addr + (i * CHUNK_BYTES) as u64, chunk);
        }
        Ok(self.latency)
    }

    fn write_block(&mut self, addr: u64, data: &[u8]) -> Result<u64, SimError> {
        for (i, chunk) in data.chunks(CHUNK_BYTES).enumerate() {
            self.write_bytes(addr + (i * CHUNK_BYTES) as u64, chunk)?;
        }
        Ok(self.latency)
    }
}

/// A cache together with its next level, viewed as a backing store.
///
/// Lets an upper cache treat `L2 → memory` (or deeper chains) as a single
/// backing store without owning it.
pub struct CacheChain<'a> {
    /// The cache at this level.
    pub cache: &'a mut Cache,
    /// The level behind it.
    pub next: &'a mut dyn BackingStore,
}

impl BackingStore for CacheChain<'_> {
    fn read_block(&mut self, addr: u64, buf: &mut [u8]) -> Result<u64, SimError> {
        self.cache.read_bytes(addr, buf, self.next)
    }

    fn write_block(&mut self, addr: u64, data: &[u8]) -> Result<u64, SimError> {
        self.cache.write_bytes(addr, data, self.next)
    }
}

/// Outcome of a single cache access.
#[derive(Clone, Copy, Debug, Default)]
pub struct CacheAccess {
    /// Every touched block was resident.
    pub hit: bool,
    /// Total latency in cycles, including backing-store costs on a miss.
    pub latency: u64,
    /// Loaded data (little-endian assembled; zero for writes).
    pub data: u64,
    /// Block address of a dirty victim written back, if any.
    pub evicted: Option<u64>,
}

/// Cache block: tag, state bits, LRU stamp, and the data payload.
#[derive(Clone, Debug, Default)]
struct CacheBlock {
    tag: u64,
    valid: bool,
    dirty: bool,
    last_used: u64,
    data: Vec<u8>,
}

/// Set-associative write-back write-allocate LRU cache.
#[derive(Debug)]
pub struct Cache {
    blocks: Vec<CacheBlock>, // index = set * ways + way
    num_sets: usize,
    ways: usize,
    block_bytes: usize,
    hit_latency: u64,
    miss_latency: u64,
    access_counter: u64,
    /// Accesses satisfied from a resident block.
    pub hits: u64,
    /// Accesses that required a fill.
    pub misses: u64,
}

impl Cache {
    /// Creates a cache from a level configuration.
    pub fn new(config: &CacheConfig) -> Self {
        let block_bytes = config.line_bytes.max(1);
        let ways = config.ways.max(1);
        let num_blocks = (config.size_bytes / block_bytes).max(ways);
        let num_sets = (num_blocks / ways).max(1);

        let blocks = vec![
            CacheBlock {
                data: vec![0; block_bytes],
                ..CacheBlock::default()
            };
            num_sets * ways
        ];

        Self {
            blocks,
            num_sets,
            ways,
            block_bytes,
            hit_latency: config.hit_latency,
            miss_latency: config.miss_latency,
            access_counter: 0,
            hits: 0,
            misses: 0,
        }
    }

    /// Block size in bytes.
    pub fn block_bytes(&self) -> usize {
        self.block_bytes
    }

    fn set_and_tag(&self, addr: u64) -> (usize, u64) {
        let block = addr / self.block_bytes as u64;
        ((block as usize) % self.num_sets, block / self.num_sets as u64)
    }

    fn block_base(&self, set: usize, tag: u64) -> u64 {
        (tag * self.num_sets as u64 + set as u64) * self.block_bytes as u64
    }

    fn find(&self, set: usize, tag: u64) -> Option<usize> {
        let base = set * self.ways;
        (0..self.ways).find(|&way| {
            let b = &self.blocks[base + way];
            b.valid && b.tag == tag
        })
    }

    /// Selects the eviction victim in `set`: an invalid way if one exists,
    /// else the least recently used.
    fn victim(&self, set: usize) -> usize {
        let base = set * self.ways;
        let mut victim = 0;
        let mut oldest = u64::MAX;
        for way in 0..self.ways {
            let b = &self.blocks[base + way];
            if !b.valid {
                return way;
            }
            if b.last_used < oldest {
                oldest = b.last_used;
                victim = way;
            }
        }
        victim
    }

    /// Installs the block containing `addr`, writing back a dirty victim.
    ///
    /// Returns `(way, latency, evicted)`.
    fn fill(
        &mut self,
        set: usize,
        tag: u64,
        backing: &mut dyn BackingStore,
    ) -> Result<(usize, u64, Option<u64>), SimError> {
        let way = self.victim(set);
        let idx = set * self.ways + way;
        let mut latency = 0;
        let mut evicted = None;

        if self.blocks[idx].valid && self.blocks[idx].dirty {
            let victim_addr = self.block_base(set, self.blocks[idx].tag);
            let data = std::mem::take(&mut self.blocks[idx].data);
            latency += backing.write_block(victim_addr, &data)?;
            self.blocks[idx].data = data;
            evicted = Some(victim_addr);
        }

        let base = self.block_base(set, tag);
        let mut data = std::mem::take(&mut self.blocks[idx].data);
        latency += backing.read_block(base, &mut data)?;
        self.blocks[idx] = CacheBlock {
            tag,
            valid: true,
            dirty: false,
            last_used: self.access_counter,
            data,
        };
        Ok((way, latency, evicted))
    }

    /// Looks up (filling on miss) and touches the block containing `addr`.
    ///
    /// Returns `(block_index, hit, latency, evicted)`; the caller copies
    /// data in or out of the block payload. This is the unit of hit/miss
    /// accounting: one lookup per touched block, however many bytes move.
    fn access_block(
        &mut self,
        addr: u64,
        backing: &mut dyn BackingStore,
    ) -> Result<(usize, bool, u64, Option<u64>), SimError> {
        self.access_counter += 1;
        let (set, tag) = self.set_and_tag(addr);

        let (way, hit, latency, evicted) = match self.find(set, tag) {
            Some(way) => (way, true, self.hit_latency, None),
            None => {
                let (way, fill_latency, evicted) = self.fill(set, tag, backing)?;
                (way, false, self.miss_latency + fill_latency, evicted)
            }
        };
        if hit {
            self.hits += 1;
        } else {
            self.misses += 1;
        }

        let idx = set * self.ways + way;
        self.blocks[idx].last_used = self.access_counter;
        Ok((idx, hit, latency, evicted))
    }

    /// One block-local access; `addr..addr+len` must not cross a boundary.
    fn access_one(
        &mut self,
        addr: u64,
        len: usize,
        write: Option<u64>,
        backing: &mut dyn BackingStore,
    ) -> Result<CacheAccess, SimError> {
        let (idx, hit, latency, evicted) = self.access_block(addr, backing)?;
        let block = &mut self.blocks[idx];
        let offset = (addr % self.block_bytes as u64) as usize;

        let mut data = 0u64;
        match write {
            Some(value) => {
                for i in 0..len {
                    block.data[offset + i] = (value >> (8 * i)) as u8;
                }
                block.dirty = true;
            }
            None => {
                for i in 0..len {
                    data |= u64::from(block.data[offset + i]) << (8 * i);
                }
            }
        }

        Ok(CacheAccess {
            hit,
            latency,
            data,
            evicted,
        })
    }

    /// Performs an access of `size` bytes, splitting at block boundaries.
    fn access(
        &mut self,
        addr: u64,
        size: usize,
        write: Option<u64>,
        backing: &mut dyn BackingStore,
    ) -> Result<CacheAccess, SimError> {
        debug_assert!(size >= 1 && size <= 8);
        let block = self.block_bytes as u64;
        let first_len = ((block - addr % block) as usize).min(size);

        let mut result = self.access_one(addr, first_len, write, backing)?;
        if first_len < size {
            let rest_len = size - first_len;
            let rest_write = write.map(|v| v >> (8 * first_len));
            let rest = self.access_one(addr + first_len as u64, rest_len, rest_write, backing)?;
            result.hit = result.hit && rest.hit;
            result.latency += rest.latency;
            result.data |= rest.data << (8 * first_len);
            result.evicted = rest.evicted.or(result.evicted);
        }
        Ok(result)
    }

    /// Reads `size` bytes (1..=8) at `addr`, little-endian.
    pub fn read(
        &mut self,
        addr: u64,
        size: usize,
        backing: &mut dyn BackingStore,
    ) -> Result<CacheAccess, SimError> {
        self.access(addr, size, None, backing)
    }

    /// Writes the low `size` bytes of `value` at `addr` (write-allocate).
    pub fn write(
        &mut self,
        addr: u64,
        size: usize,
        value: u64,
        backing: &mut dyn BackingStore,
    ) -> Result<CacheAccess, SimError> {
        self.access(addr, size, Some(value), backing)
    }

    /// Reads an arbitrary byte run through the cache.
    ///
    /// Each touched block counts as one aggregated transaction, however
    /// many bytes it contributes.
    pub fn read_bytes(
        &mut self,
        addr: u64,
        buf: &mut [u8],
        backing: &mut dyn BackingStore,
    ) -> Result<u64, SimError> {
        let block = self.block_bytes as u64;
        let mut latency = 0;
        let mut done = 0;
        while done < buf.len() {
            let at = addr + done as u64;
            let len = ((block - at % block) as usize).min(buf.len() - done);
            let (idx, _, lat, _) = self.access_block(at, backing)?;
            let offset = (at % block) as usize;
            buf[done..done + len].copy_from_slice(&self.blocks[idx].data[offset..offset + len]);
            latency += lat;
            done += len;
        }
        Ok(latency)
    }

    /// Writes an arbitrary byte run through the cache (write-allocate).
    pub fn write_bytes(
        &mut self,
        addr: u64,
        data: &[u8],
        backing: &mut dyn BackingStore,
    ) -> Result<u64, SimError> {
        let block = self.block_bytes as u64;
        let mut latency = 0;
        let mut done = 0;
        while done < data.len() {
            let at = addr + done as u64;
            let len = ((block - at % block) as usize).min(data.len() - done);
            let (idx, _, lat, _) = self.access_block(at, backing)?;
            let offset = (at % block) as usize;
            self.blocks[idx].data[offset..offset + len].copy_from_slice(&data[done..done + len]);
            self.blocks[idx].dirty = true;
            latency += lat;
            done += len;
        }
        Ok(latency)
    }

    /// Writes back every dirty block and clears dirty bits.
    pub fn flush(&mut self, backing: &mut dyn BackingStore) -> Result<(), SimError> {
        for idx in 0..self.blocks.len() {
            if self.blocks[idx].valid && self.blocks[idx].dirty {
                let set = idx / self.ways;
                let addr = self.block_base(set, self.blocks[idx].tag);
                let data = std::mem::take(&mut self.blocks[idx].data);
                let _ = backing.write_block(addr, &data)?;
                self.blocks[idx].data = data;
                self.blocks[idx].dirty = false;
            }
        }
        Ok(())
    }

    /// Flushes and then drops all cached contents.
    pub fn invalidate(&mut self, backing: &mut dyn BackingStore) -> Result<(), SimError> {
        self.flush(backing)?;
        for block in &mut self.blocks {
            block.valid = false;
        }
        Ok(())
    }

    /// Number of valid blocks currently resident in the set containing
    /// `addr` (test support).
    pub fn live_blocks_in_set(&self, addr: u64) -> usize {
        let (set, _) = self.set_and_tag(addr);
        let base = set * self.ways;
        (0..self.ways)
            .filter(|&w| self.blocks[base + w].valid)
            .count()
    }
}
