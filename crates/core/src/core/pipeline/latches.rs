//! Pipeline slot records.
//!
//! Between each pair of stages sits a bank of slot records, one vector per
//! latch, bounded by the issue width. Slots are created in fetch, decoded
//! and hazard-checked in decode, given results in execute, completed in
//! memory, and committed in writeback. On a flush the affected vectors are
//! simply cleared; only valid slots are ever stored.

use crate::core::exec::MemRequest;
use crate::isa::instruction::Instruction;

/// IF/ID slot: a fetched word plus branch-prediction metadata.
#[derive(Clone, Debug)]
pub struct IfIdSlot {
    /// Fetch sequence number (monotonic across the run).
    pub seq: u64,
    /// Address the word was fetched from.
    pub pc: u64,
    /// Raw instruction word.
    pub word: u32,
    /// The fetch stage predicted this instruction taken.
    pub pred_taken: bool,
    /// Predicted target when `pred_taken`.
    pub pred_target: u64,
}

/// ID/EX slot: a decoded instruction ready to execute.
#[derive(Clone, Debug)]
pub struct IdExSlot {
    /// Fetch sequence number.
    pub seq: u64,
    /// Instruction address.
    pub pc: u64,
    /// Decoded instruction.
    pub inst: Instruction,
    /// Fetch-stage direction prediction.
    pub pred_taken: bool,
    /// Fetch-stage target prediction.
    pub pred_target: u64,
    /// Second half of a CMP+B.cond fused pair.
    pub fused: bool,
    /// Slot already executed in decode (syscalls); carries the exit code
    /// when the syscall requested termination.
    pub done: bool,
    /// Exit code requested by a completed syscall.
    pub exit: Option<u8>,
}

/// EX/MEM slot: computed results and at most one pending memory request.
#[derive(Clone, Debug)]
pub struct ExMemSlot {
    /// Fetch sequence number.
    pub seq: u64,
    /// Instruction address.
    pub pc: u64,
    /// Decoded instruction (kept for statistics and tracing).
    pub inst: Instruction,
    /// Integer register writes produced in execute.
    pub writes: Vec<(u8, u64)>,
    /// Vector register writes produced in execute.
    pub vwrites: Vec<(u8, u128)>,
    /// Memory request to perform in the memory stage.
    pub mem: Option<MemRequest>,
    /// Exit code carried by a completed syscall slot.
    pub exit: Option<u8>,
}

/// MEM/WB slot: everything needed to commit.
#[derive(Clone, Debug)]
pub struct MemWbSlot {
    /// Fetch sequence number.
    pub seq: u64,
    /// Instruction address.
    pub pc: u64,
    /// Decoded instruction (kept for statistics and tracing).
    pub inst: Instruction,
    /// Integer register writes to commit (loads included by now).
    pub writes: Vec<(u8, u64)>,
    /// Vector register writes to commit.
    pub vwrites: Vec<(u8, u128)>,
    /// Exit code carried by a completed syscall slot.
    pub exit: Option<u8>,
}
