//! Configuration system for the simulator.
//!
//! This module defines all configuration structures used to parameterize the
//! simulator. It provides:
//! 1. **Defaults:** Baseline hardware constants calibrated against the Apple
//!    M2 performance core (issue width, ALU ports, cache geometry, predictor
//!    sizes).
//! 2. **Structures:** Hierarchical config for general, pipeline, predictor,
//!    cache, and memory settings.
//!
//! Configuration is supplied as JSON (`serde_json`) or via `Config::default()`.

use serde::Deserialize;

/// Default configuration constants for the simulator.
///
/// These values define the baseline hardware configuration when not
/// explicitly overridden.
mod defaults {
    /// Default issue width (instructions fetched/retired per cycle).
    ///
    /// The M2 performance core is modeled as 8-wide.
    pub const ISSUE_WIDTH: usize = 8;

    /// Integer ALU ports available per cycle (M2 has six integer units).
    pub const ALU_PORTS: usize = 6;

    /// Iterative divider occupancy in cycles (UDIV/SDIV).
    pub const DIV_LATENCY: u64 = 8;

    /// BTB confidence required before a predicted-taken branch may be folded
    /// at fetch.
    pub const FOLD_CONFIDENCE: u8 = 3;

    /// Branch history table size (log2 entries).
    pub const BHT_BITS: usize = 12;

    /// Global history length in bits.
    pub const HISTORY_BITS: usize = 12;

    /// Branch target buffer entries.
    pub const BTB_SIZE: usize = 1024;

    /// Return stack buffer depth.
    pub const RSB_SIZE: usize = 16;

    /// L1 instruction cache: 192 KiB, 6-way, 64-byte lines, hit 1 / miss 12.
    pub const L1I_SIZE: usize = 192 * 1024;
    /// L1 instruction cache associativity.
    pub const L1I_WAYS: usize = 6;
    /// L1 instruction cache line size in bytes.
    pub const L1I_LINE: usize = 64;
    /// L1 instruction cache hit latency in cycles.
    pub const L1I_HIT: u64 = 1;
    /// L1 instruction cache miss latency in cycles.
    pub const L1I_MISS: u64 = 12;

    /// L1 data cache: 128 KiB, 8-way, 64-byte lines, hit 4 / miss 12.
    pub const L1D_SIZE: usize = 128 * 1024;
    /// L1 data cache associativity.
    pub const L1D_WAYS: usize = 8;
    /// L1 data cache line size in bytes.
    pub const L1D_LINE: usize = 64;
    /// L1 data cache hit latency in cycles.
    pub const L1D_HIT: u64 = 4;
    /// L1 data cache miss latency in cycles.
    pub const L1D_MISS: u64 = 12;

    /// Shared L2: 24 MiB, 16-way, 128-byte lines, hit 12 / miss 150.
    pub const L2_SIZE: usize = 24 * 1024 * 1024;
    /// L2 cache associativity.
    pub const L2_WAYS: usize = 16;
    /// L2 cache line size in bytes.
    pub const L2_LINE: usize = 128;
    /// L2 cache hit latency in cycles.
    pub const L2_HIT: u64 = 12;
    /// L2 cache miss latency in cycles.
    pub const L2_MISS: u64 = 150;

    /// Flat memory latency per block transaction, in cycles.
    pub const MEM_LATENCY: u64 = 1;

    /// Sparse memory page budget (4 KiB pages). 1 Mi pages = 4 GiB of guest
    /// address space, far above anything a benchmark touches.
    pub const MEM_MAX_PAGES: usize = 1 << 20;

    /// Timing-model cycle bound.
    pub const MAX_CYCLES: u64 = 200_000_000;

    /// Functional-engine instruction bound.
    pub const MAX_INSTRUCTIONS: u64 = 1_000_000_000;
}

/// Destination for guest writes to file descriptors 1 and 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum OutputSink {
    /// Forward guest stdout/stderr to the host stdout.
    #[default]
    Stdout,
    /// Forward guest stdout/stderr to the host stderr.
    Stderr,
    /// Capture guest output in an in-memory buffer (used by tests and the
    /// benchmark harness).
    Capture,
}

/// Root configuration structure containing all simulator settings.
///
/// # Examples
///
/// ```
/// use m2sim_core::config::Config;
///
/// let config = Config::default();
/// assert_eq!(config.pipeline.width, 8);
/// assert_eq!(config.cache.l1_d.ways, 8);
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// General simulation settings.
    #[serde(default)]
    pub general: GeneralConfig,
    /// Pipeline shape and issue resources.
    #[serde(default)]
    pub pipeline: PipelineConfig,
    /// Branch predictor parameters.
    #[serde(default)]
    pub predictor: PredictorConfig,
    /// Cache hierarchy configuration.
    #[serde(default)]
    pub cache: CacheHierarchyConfig,
    /// Main memory configuration.
    #[serde(default)]
    pub memory: MemoryConfig,
}

/// General simulation settings and run bounds.
#[derive(Debug, Clone, Deserialize)]
pub struct GeneralConfig {
    /// Enable per-stage diagnostic tracing to stderr.
    #[serde(default)]
    pub trace: bool,

    /// Timing-model cycle bound; exceeding it stops the run with a
    /// cycle-limit indicator.
    #[serde(default = "GeneralConfig::default_max_cycles")]
    pub max_cycles: u64,

    /// Functional-engine instruction bound.
    #[serde(default = "GeneralConfig::default_max_instructions")]
    pub max_instructions: u64,

    /// Where guest writes to fds 1 and 2 go.
    #[serde(default)]
    pub output: OutputSink,
}

impl GeneralConfig {
    /// Returns the default cycle bound.
    fn default_max_cycles() -> u64 {
        defaults::MAX_CYCLES
    }

    /// Returns the default instruction bound.
    fn default_max_instructions() -> u64 {
        defaults::MAX_INSTRUCTIONS
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            trace: false,
            max_cycles: defaults::MAX_CYCLES,
            max_instructions: defaults::MAX_INSTRUCTIONS,
            output: OutputSink::default(),
        }
    }
}

/// Pipeline shape and per-cycle issue resources.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Issue width (1, 2, 4, 6, or 8 slots per stage).
    #[serde(default = "PipelineConfig::default_width")]
    pub width: usize,

    /// Independent ALU issues allowed per cycle.
    #[serde(default = "PipelineConfig::default_alu_ports")]
    pub alu_ports: usize,

    /// Enable CMP+B.cond macro-op fusion.
    #[serde(default = "PipelineConfig::default_true")]
    pub fusion: bool,

    /// Enable zero-cycle branch folding at fetch.
    #[serde(default = "PipelineConfig::default_true")]
    pub fold_branches: bool,

    /// BTB confidence required before a branch may be folded.
    #[serde(default = "PipelineConfig::default_fold_confidence")]
    pub fold_confidence: u8,

    /// Iterative divider occupancy in cycles.
    #[serde(default = "PipelineConfig::default_div_latency")]
    pub div_latency: u64,
}

impl PipelineConfig {
    /// Returns the default issue width.
    fn default_width() -> usize {
        defaults::ISSUE_WIDTH
    }

    /// Returns the default ALU port count.
    fn default_alu_ports() -> usize {
        defaults::ALU_PORTS
    }

    /// Returns the default fold-confidence threshold.
    fn default_fold_confidence() -> u8 {
        defaults::FOLD_CONFIDENCE
    }

    /// Returns the default divider occupancy.
    fn default_div_latency() -> u64 {
        defaults::DIV_LATENCY
    }

    /// Serde helper for flags that default on.
    fn default_true() -> bool {
        true
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            width: defaults::ISSUE_WIDTH,
            alu_ports: defaults::ALU_PORTS,
            fusion: true,
            fold_branches: true,
            fold_confidence: defaults::FOLD_CONFIDENCE,
            div_latency: defaults::DIV_LATENCY,
        }
    }
}

/// Branch predictor parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct PredictorConfig {
    /// Branch history table size (log2 entries).
    #[serde(default = "PredictorConfig::default_bht_bits")]
    pub bht_bits: usize,

    /// Global history length in bits.
    #[serde(default = "PredictorConfig::default_history_bits")]
    pub history_bits: usize,

    /// Branch target buffer entries (power of two).
    #[serde(default = "PredictorConfig::default_btb_size")]
    pub btb_size: usize,

    /// Return stack buffer depth.
    #[serde(default = "PredictorConfig::default_rsb_size")]
    pub rsb_size: usize,

    /// Enable the tournament chooser (local vs gshare). When disabled the
    /// local BHT alone predicts direction.
    #[serde(default = "PredictorConfig::default_tournament")]
    pub tournament: bool,
}

impl PredictorConfig {
    /// Returns the default BHT size in log2 entries.
    fn default_bht_bits() -> usize {
        defaults::BHT_BITS
    }

    /// Returns the default global history length.
    fn default_history_bits() -> usize {
        defaults::HISTORY_BITS
    }

    /// Returns the default BTB entry count.
    fn default_btb_size() -> usize {
        defaults::BTB_SIZE
    }

    /// Returns the default RSB depth.
    fn default_rsb_size() -> usize {
        defaults::RSB_SIZE
    }

    /// Tournament selection defaults on.
    fn default_tournament() -> bool {
        true
    }
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            bht_bits: defaults::BHT_BITS,
            history_bits: defaults::HISTORY_BITS,
            btb_size: defaults::BTB_SIZE,
            rsb_size: defaults::RSB_SIZE,
            tournament: true,
        }
    }
}

/// Cache hierarchy configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheHierarchyConfig {
    /// L1 instruction cache.
    #[serde(default = "CacheConfig::default_l1i")]
    pub l1_i: CacheConfig,
    /// L1 data cache.
    #[serde(default = "CacheConfig::default_l1d")]
    pub l1_d: CacheConfig,
    /// Unified L2 cache.
    #[serde(default = "CacheConfig::default_l2")]
    pub l2: CacheConfig,
}

impl Default for CacheHierarchyConfig {
    fn default() -> Self {
        Self {
            l1_i: CacheConfig::default_l1i(),
            l1_d: CacheConfig::default_l1d(),
            l2: CacheConfig::default_l2(),
        }
    }
}

/// Individual cache level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Enable this cache level.
    #[serde(default = "CacheConfig::default_enabled")]
    pub enabled: bool,

    /// Total cache size in bytes.
    pub size_bytes: usize,

    /// Cache line size in bytes.
    pub line_bytes: usize,

    /// Associativity (number of ways).
    pub ways: usize,

    /// Access latency on a hit, in cycles.
    pub hit_latency: u64,

    /// Access latency on a miss, in cycles (before backing-store costs).
    pub miss_latency: u64,
}

impl CacheConfig {
    /// Caches default on; the M2 model always runs with its hierarchy.
    fn default_enabled() -> bool {
        true
    }

    /// M2 L1 instruction cache geometry.
    pub fn default_l1i() -> Self {
        Self {
            enabled: true,
            size_bytes: defaults::L1I_SIZE,
            line_bytes: defaults::L1I_LINE,
            ways: defaults::L1I_WAYS,
            hit_latency: defaults::L1I_HIT,
            miss_latency: defaults::L1I_MISS,
        }
    }

    /// M2 L1 data cache geometry.
    pub fn default_l1d() -> Self {
        Self {
            enabled: true,
            size_bytes: defaults::L1D_SIZE,
            line_bytes: defaults::L1D_LINE,
            ways: defaults::L1D_WAYS,
            hit_latency: defaults::L1D_HIT,
            miss_latency: defaults::L1D_MISS,
        }
    }

    /// M2 shared L2 geometry.
    pub fn default_l2() -> Self {
        Self {
            enabled: true,
            size_bytes: defaults::L2_SIZE,
            line_bytes: defaults::L2_LINE,
            ways: defaults::L2_WAYS,
            hit_latency: defaults::L2_HIT,
            miss_latency: defaults::L2_MISS,
        }
    }
}

/// Main memory configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MemoryConfig {
    /// Flat latency per memory block transaction, in cycles. Also charged
    /// by the pipeline memory stage when the data caches are disabled.
    #[serde(default = "MemoryConfig::default_latency")]
    pub latency: u64,

    /// Sparse memory page budget; `None` disables the guard.
    #[serde(default = "MemoryConfig::default_max_pages")]
    pub max_pages: Option<usize>,
}

impl MemoryConfig {
    /// Returns the default flat memory latency.
    fn default_latency() -> u64 {
        defaults::MEM_LATENCY
    }

    /// Returns the default page budget.
    fn default_max_pages() -> Option<usize> {
        Some(defaults::MEM_MAX_PAGES)
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            latency: defaults::MEM_LATENCY,
            max_pages: Some(defaults::MEM_MAX_PAGES),
        }
    }
}
