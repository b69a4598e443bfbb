//! Simulation statistics collection and reporting.
//!
//! This module tracks performance metrics for the timing model. It provides:
//! 1. **Cycle and CPI:** Total cycles, retired instructions, and derived CPI.
//! 2. **Stalls:** RAW, structural, execute, memory, control, and fetch stalls.
//! 3. **Branch prediction:** Predictions, mispredictions, flushes, folded
//!    branches, and fused macro-ops.
//! 4. **Cache hierarchy:** Hit/miss counts for L1-I, L1-D, and L2.

/// Simulation statistics structure tracking all performance metrics.
///
/// The functional engine fills only `instructions_retired`; the pipeline
/// maintains the full block.
#[derive(Clone, Debug, Default)]
pub struct SimStats {
    /// Total simulator cycles elapsed.
    pub cycles: u64,
    /// Number of instructions committed (retired).
    pub instructions_retired: u64,

    /// Stall cycles due to RAW hazards (load-use delays).
    pub stalls_raw: u64,
    /// Stall cycles due to structural hazards (ALU/memory port contention).
    pub stalls_structural: u64,
    /// Stall cycles spent occupying the iterative execute units.
    pub stalls_ex: u64,
    /// Stall cycles waiting on the data-side memory hierarchy.
    pub stalls_mem: u64,
    /// Stall cycles due to control hazards (misprediction recovery).
    pub stalls_control: u64,
    /// Stall cycles in which fetch could not supply instructions.
    pub stalls_fetch: u64,

    /// Branch outcomes the predictor got right.
    pub branch_predictions: u64,
    /// Branch outcomes the predictor got wrong.
    pub branch_mispredictions: u64,
    /// Pipeline flushes (misprediction or folded-branch verification).
    pub flushes: u64,
    /// Branches eliminated at fetch by zero-cycle folding.
    pub eliminated_branches: u64,
    /// CMP+B.cond pairs issued as fused macro-ops.
    pub fused_ops: u64,

    /// L1 instruction cache hit count.
    pub icache_hits: u64,
    /// L1 instruction cache miss count.
    pub icache_misses: u64,
    /// L1 data cache hit count.
    pub dcache_hits: u64,
    /// L1 data cache miss count.
    pub dcache_misses: u64,
    /// L2 cache hit count.
    pub l2_hits: u64,
    /// L2 cache miss count.
    pub l2_misses: u64,
}

/// Section names for selective stats output.
///
/// Valid section identifiers: `"summary"`, `"stalls"`, `"branch"`,
/// `"memory"`. Pass an empty slice to `print_sections` to print all.
pub const STATS_SECTIONS: &[&str] = &["summary", "stalls", "branch", "memory"];

impl SimStats {
    /// Cycles per retired instruction.
    ///
    /// Returns 0.0 before any instruction has retired.
    pub fn cpi(&self) -> f64 {
        if self.instructions_retired == 0 {
            0.0
        } else {
            self.cycles as f64 / self.instructions_retired as f64
        }
    }

    /// Instructions retired per cycle.
    pub fn ipc(&self) -> f64 {
        if self.cycles == 0 {
            0.0
        } else {
            self.instructions_retired as f64 / self.cycles as f64
        }
    }

    /// Prints only the requested statistics sections to stdout.
    ///
    /// Each element of `sections` should be one of the names in
    /// [`STATS_SECTIONS`]. Pass an empty slice to print everything.
    pub fn print_sections(&self, sections: &[String]) {
        let want = |s: &str| sections.is_empty() || sections.iter().any(|x| x == s);
        let cyc = if self.cycles == 0 { 1 } else { self.cycles };

        if want("summary") {
            println!("\n==========================================================");
            println!("ARM64 TIMING SIMULATION STATISTICS");
            println!("==========================================================");
            println!("sim_cycles               {}", self.cycles);
            println!("sim_insts                {}", self.instructions_retired);
            println!("sim_ipc                  {:.4}", self.ipc());
            println!("sim_cpi                  {:.4}", self.cpi());
            println!("----------------------------------------------------------");
        }
        if want("stalls") {
            let line = |name: &str, value: u64| {
                println!(
                    "  {:<22} {} ({:.2}%)",
                    name,
                    value,
                    (value as f64 / cyc as f64) * 100.0
                );
            };
            println!("STALL BREAKDOWN");
            line("stalls.raw", self.stalls_raw);
            line("stalls.structural", self.stalls_structural);
            line("stalls.execute", self.stalls_ex);
            line("stalls.memory", self.stalls_mem);
            line("stalls.control", self.stalls_control);
            line("stalls.fetch", self.stalls_fetch);
            println!("----------------------------------------------------------");
        }
        if want("branch") {
            let total = self.branch_predictions + self.branch_mispredictions;
            let accuracy = if total > 0 {
                100.0 * (self.branch_predictions as f64 / total as f64)
            } else {
                0.0
            };
            println!("BRANCH PREDICTION");
            println!("  bp.lookups             {}", total);
            println!("  bp.mispredicts         {}", self.branch_mispredictions);
            println!("  bp.accuracy            {:.2}%", accuracy);
            println!("  bp.flushes             {}", self.flushes);
            println!("  bp.folded              {}", self.eliminated_branches);
            println!("  bp.fused               {}", self.fused_ops);
            println!("----------------------------------------------------------");
        }
        if want("memory") {
            let print_cache = |name: &str, hits: u64, misses: u64| {
                let total = hits + misses;
                let rate = if total > 0 {
                    (hits as f64 / total as f64) * 100.0
                } else {
                    0.0
                };
                println!(
                    "  {:<6} accesses: {:<10} | hits: {:<10} | miss_rate: {:.2}%",
                    name,
                    total,
                    hits,
                    100.0 - rate
                );
            };
            println!("MEMORY HIERARCHY");
            print_cache("L1-I", self.icache_hits, self.icache_misses);
            print_cache("L1-D", self.dcache_hits, self.dcache_misses);
            print_cache("L2", self.l2_hits, self.l2_misses);
        }
        println!("==========================================================");
    }

    /// Prints all statistics sections to stdout.
    pub fn print(&self) {
        self.print_sections(&[]);
    }
}
