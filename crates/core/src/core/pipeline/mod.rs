//! Cycle-accurate 5-stage in-order superscalar timing model.
//!
//! Five stages (IF, ID, EX, MEM, WB) separated by slot-vector latches, with
//! an issue width of 1 to 8. Each `tick` advances one cycle, running the
//! stages back-to-front (WB, MEM, EX, ID, IF) so that every stage observes
//! the pre-tick values of the latch ahead of it, as edge-triggered
//! registers would.
//!
//! The model provides register forwarding, load-use and structural hazard
//! stalls, branch prediction with misprediction recovery, CMP+B.cond
//! macro-op fusion, zero-cycle folding of high-confidence branches (with
//! in-flight verification for conditional ones), and an L1I/L1D/L2 cache
//! hierarchy on the fetch and memory paths. Retired effects are computed by
//! the same dataflow function as the functional emulator.

/// Data hazards and the forwarding network.
pub mod hazards;
/// Inter-stage slot records.
pub mod latches;
/// The five stage functions.
pub mod stages;

use crate::config::Config;
use crate::core::arch::regs::RegFile;
use crate::core::pipeline::hazards::Frame;
use crate::core::pipeline::latches::{ExMemSlot, IdExSlot, IfIdSlot, MemWbSlot};
use crate::core::units::bru::BranchPredictor;
use crate::core::units::cache::{Cache, CacheChain};
use crate::error::SimError;
use crate::isa::cond::Cond;
use crate::mem::Memory;
use crate::os::Linux;
use crate::sim::loader::LoadedImage;
use crate::sim::{RunResult, StopReason};
use crate::stats::SimStats;

/// A branch consumed at fetch, awaiting verification.
///
/// Conditional folded branches carry the condition to re-evaluate once the
/// instruction fetched immediately before them (`anchor_seq`) has executed;
/// a failed check flushes to `fallthrough`.
#[derive(Clone, Copy, Debug)]
pub(crate) struct FoldedBranch {
    /// Address of the folded branch.
    pub pc: u64,
    /// Target it was folded toward.
    pub target: u64,
    /// Address of the next sequential instruction.
    pub fallthrough: u64,
    /// Sequence number of the last real instruction fetched before it.
    pub anchor_seq: u64,
    /// Condition to verify.
    pub cond: Cond,
}

/// The timing model.
#[derive(Debug)]
pub struct Pipeline {
    /// Architectural registers (shared semantics with the emulator).
    pub regs: RegFile,
    /// Guest memory behind the cache hierarchy.
    pub mem: Memory,
    /// Syscall handler state.
    pub os: Linux,
    /// Branch prediction unit.
    pub predictor: BranchPredictor,
    /// L1 instruction cache.
    pub l1i: Option<Cache>,
    /// L1 data cache.
    pub l1d: Option<Cache>,
    /// Unified L2 cache.
    pub l2: Option<Cache>,
    /// Statistics block.
    pub stats: SimStats,

    pub(crate) if_id: Vec<IfIdSlot>,
    pub(crate) id_ex: Vec<IdExSlot>,
    pub(crate) ex_mem: Vec<ExMemSlot>,
    pub(crate) mem_wb: Vec<MemWbSlot>,

    pub(crate) pc: u64,
    pub(crate) width: usize,
    pub(crate) alu_ports: usize,
    pub(crate) fusion: bool,
    pub(crate) fold_branches: bool,
    pub(crate) fold_confidence: u8,
    pub(crate) div_latency: u64,

    /// Sequence number of the most recently fetched instruction.
    pub(crate) seq: u64,
    /// Sequence number of the most recently executed instruction.
    pub(crate) last_executed_seq: u64,
    /// Sequence number of the most recently retired instruction.
    pub(crate) last_retired_seq: u64,
    /// Folded branches awaiting verification, oldest first.
    pub(crate) folded: Vec<FoldedBranch>,

    pub(crate) mem_stall: u64,
    pub(crate) ex_stall: u64,
    pub(crate) fetch_stall: u64,
    /// A dispatched syscall has not yet retired; fetch and decode hold.
    pub(crate) syscall_in_flight: bool,

    pub(crate) exit: Option<u8>,
    pub(crate) fatal: Option<SimError>,

    max_cycles: u64,
    max_instructions: u64,
    pub(crate) trace: bool,
}

impl Pipeline {
    /// Creates a pipeline from configuration.
    pub fn new(config: &Config) -> Self {
        let enable = |cfg: &crate::config::CacheConfig| {
            if cfg.enabled { Some(Cache::new(cfg)) } else { None }
        };
        Self {
            regs: RegFile::new(),
            mem: Memory::new(config.memory.latency, config.memory.max_pages),
            os: Linux::new(config.general.output),
            predictor: BranchPredictor::new(&config.predictor),
            l1i: enable(&config.cache.l1_i),
            l1d: enable(&config.cache.l1_d),
            l2: enable(&config.cache.l2),
            stats: SimStats::default(),
            if_id: Vec::new(),
            id_ex: Vec::new(),
            ex_mem: Vec::new(),
            mem_wb: Vec::new(),
            pc: 0,
            width: config.pipeline.width.clamp(1, 8),
            alu_ports: config.pipeline.alu_ports.max(1),
            fusion: config.pipeline.fusion,
            fold_branches: config.pipeline.fold_branches,
            fold_confidence: config.pipeline.fold_confidence,
            div_latency: config.pipeline.div_latency,
            seq: 0,
            last_executed_seq: 0,
            last_retired_seq: 0,
            folded: Vec::new(),
            mem_stall: 0,
            ex_stall: 0,
            fetch_stall: 0,
            syscall_in_flight: false,
            exit: None,
            fatal: None,
            max_cycles: config.general.max_cycles,
            max_instructions: config.general.max_instructions,
            trace: config.general.trace,
        }
    }

    /// Places an image into memory and initializes PC, SP, and the break.
    pub fn load(&mut self, image: &LoadedImage) -> Result<(), SimError> {
        for (addr, data) in &image.segments {
            self.mem.load_segment(*addr, data)?;
        }
        self.pc = image.entry;
        self.regs.pc = image.entry;
        self.regs.sp = image.initial_sp;
        self.os.set_brk(image.end());
        Ok(())
    }

    /// Advances the model by exactly one cycle.
    pub fn tick(&mut self) {
        self.stats.cycles += 1;

        // Multi-cycle memory or divide operations hold every latch.
        if self.mem_stall > 0 {
            self.mem_stall -= 1;
            self.stats.stalls_mem += 1;
            return;
        }
        if self.ex_stall > 0 {
            self.ex_stall -= 1;
            self.stats.stalls_ex += 1;
            return;
        }

        // Snapshots of the pre-tick latch state feed the forwarding network
        // and the load-use check, so stages running later in this tick still
        // observe edge-triggered values.
        let fwd_ex_mem = Frame::of_ex_mem(&self.ex_mem);
        let fwd_mem_wb = Frame::of_mem_wb(&self.mem_wb);
        let loads_entering_ex = hazards::load_dests(&self.id_ex);

        stages::writeback::writeback_stage(self);
        if self.exit.is_some() {
            return;
        }
        stages::memory::memory_stage(self);
        stages::execute::execute_stage(self, &fwd_ex_mem, &fwd_mem_wb);
        stages::decode::decode_stage(self, &loads_entering_ex);

        if self.fetch_stall > 0 {
            self.fetch_stall -= 1;
            self.stats.stalls_fetch += 1;
        } else {
            stages::fetch::fetch_stage(self);
        }
    }

    /// Runs until guest exit, a fatal error, or the cycle bound.
    pub fn run_until_exit(&mut self) -> Result<RunResult, SimError> {
        loop {
            if let Some(err) = self.fatal.take() {
                return Err(err);
            }
            if let Some(code) = self.exit {
                self.sync_cache_stats();
                return Ok(RunResult {
                    reason: StopReason::Exited(code),
                    stats: self.stats.clone(),
                });
            }
            if self.stats.cycles >= self.max_cycles
                || self.stats.instructions_retired >= self.max_instructions
            {
                let reason = if self.stats.cycles >= self.max_cycles {
                    StopReason::CycleLimit
                } else {
                    StopReason::InstructionLimit
                };
                self.drain_caches()?;
                self.sync_cache_stats();
                return Ok(RunResult {
                    reason,
                    stats: self.stats.clone(),
                });
            }
            self.tick();
        }
    }

    /// Reads an instruction word through the I-side hierarchy.
    ///
    /// Returns the word and the access latency (0 when uncached).
    pub(crate) fn fetch_word(&mut self, addr: u64) -> (u32, u64) {
        let Some(icache) = self.l1i.as_mut() else {
            return (self.mem.read_u32(addr), 0);
        };
        let access = match self.l2.as_mut() {
            Some(l2) => {
                let mut chain = CacheChain {
                    cache: l2,
                    next: &mut self.mem,
                };
                icache.read(addr, 4, &mut chain)
            }
            None => icache.read(addr, 4, &mut self.mem),
        };
        match access {
            Ok(a) => (a.data as u32, a.latency),
            Err(e) => {
                self.fatal = Some(e);
                (0, 0)
            }
        }
    }

    /// Reads data through the D-side hierarchy (or flat memory).
    ///
    /// Returns `(value, latency)`.
    pub(crate) fn data_read(&mut self, addr: u64, size: usize) -> Result<(u64, u64), SimError> {
        match self.l1d.as_mut() {
            Some(dcache) => {
                let access = match self.l2.as_mut() {
                    Some(l2) => {
                        let mut chain = CacheChain {
                            cache: l2,
                            next: &mut self.mem,
                        };
                        dcache.read(addr, size, &mut chain)?
                    }
                    None => dcache.read(addr, size, &mut self.mem)?,
                };
                Ok((access.data, access.latency))
            }
            None => Ok((self.mem.read_int(addr, size), self.mem.latency)),
        }
    }

    /// Writes data through the D-side hierarchy (or flat memory).
    ///
    /// Returns the access latency.
    pub(crate) fn data_write(
        &mut self,
        addr: u64,
        size: usize,
        value: u64,
    ) -> Result<u64, SimError> {
        match self.l1d.as_mut() {
            Some(dcache) => {
                let access = match self.l2.as_mut() {
                    Some(l2) => {
                        let mut chain = CacheChain {
                            cache: l2,
                            next: &mut self.mem,
                        };
                        dcache.write(addr, size, value, &mut chain)?
                    }
                    None => dcache.write(addr, size, value, &mut self.mem)?,
                };
                Ok(access.latency)
            }
            None => {
                self.mem.write_int(addr, size, value)?;
                Ok(self.mem.latency)
            }
        }
    }

    /// Writes back and invalidates the data-side caches so memory holds the
    /// authoritative contents (used around syscalls and at run end).
    pub(crate) fn drain_caches(&mut self) -> Result<(), SimError> {
        if let Some(dcache) = self.l1d.as_mut() {
            match self.l2.as_mut() {
                Some(l2) => {
                    let mut chain = CacheChain {
                        cache: l2,
                        next: &mut self.mem,
                    };
                    dcache.invalidate(&mut chain)?;
                }
                None => dcache.invalidate(&mut self.mem)?,
            }
        }
        if let Some(l2) = self.l2.as_mut() {
            l2.invalidate(&mut self.mem)?;
        }
        Ok(())
    }

    /// Copies per-cache hit/miss counters into the statistics block.
    pub(crate) fn sync_cache_stats(&mut self) {
        if let Some(c) = &self.l1i {
            self.stats.icache_hits = c.hits;
            self.stats.icache_misses = c.misses;
        }
        if let Some(c) = &self.l1d {
            self.stats.dcache_hits = c.hits;
            self.stats.dcache_misses = c.misses;
        }
        if let Some(c) = &self.l2 {
            self.stats.l2_hits = c.hits;
            self.stats.l2_misses = c.misses;
        }
    }

    /// Output captured by the syscall layer (capture sink only).
    pub fn captured_output(&self) -> &[u8] {
        self.os.captured()
    }

    /// Discards wrong-path state after a redirect: clears the front-end
    /// latches and every folded-branch record at or past `flush_seq`.
    pub(crate) fn flush_front_end(&mut self, flush_seq: u64) {
        self.if_id.clear();
        self.folded.retain(|f| f.anchor_seq < flush_seq);
    }
}
