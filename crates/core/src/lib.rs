//! ARM64 (Apple M2-class) CPU simulator library.
//!
//! This crate implements a user-space ARM64 simulator with the following:
//! 1. **ISA:** Decoding of A64 instruction words into a typed instruction model.
//! 2. **Core:** Architectural state (GPRs, SP, PC, PSTATE, vector registers),
//!    a functional emulator, and a 5-stage in-order superscalar pipeline.
//! 3. **Memory:** Sparse paged memory and a composable L1I/L1D/L2 cache model.
//! 4. **OS:** A small Linux-compatible syscall surface for user binaries.
//! 5. **Simulation:** ELF loading, run results, configuration, and statistics.

/// Simulator configuration (defaults, enums, hierarchical config structures).
pub mod config;
/// CPU core: architectural state, execution units, emulator, and pipeline.
pub mod core;
/// Fatal simulation errors (decode, loader, memory budget).
pub mod error;
/// Instruction set: decoder, instruction model, condition codes, ABI.
pub mod isa;
/// Sparse byte-addressable guest memory.
pub mod mem;
/// Linux ARM64 user-mode syscall surface.
pub mod os;
/// Simulation: binary loader and run outcomes.
pub mod sim;
/// Simulation statistics collection and reporting.
pub mod stats;

/// Root configuration type; use `Config::default()` or deserialize from JSON.
pub use crate::config::Config;
/// Functional execution engine (architectural state only, no timing).
pub use crate::core::emulator::Emulator;
/// Cycle-accurate 5-stage in-order superscalar timing model.
pub use crate::core::pipeline::Pipeline;
/// Fatal error type returned by both engines.
pub use crate::error::SimError;
/// Outcome of a completed run (stop reason plus statistics).
pub use crate::sim::{RunResult, StopReason};
/// Statistics block maintained by the timing model.
pub use crate::stats::SimStats;
