//! Data hazard detection and operand forwarding.
//!
//! The forwarding network resolves each source-operand read at execute
//! time, consulting in priority order:
//! 1. Results computed earlier this cycle by older slots of the same packet.
//! 2. The EX/MEM latch snapshot (one-cycle-old ALU results and address
//!    writebacks; load data is not yet available there).
//! 3. The MEM/WB latch snapshot (two-cycle-old results and just-loaded
//!    values).
//! 4. The architectural register file.
//!
//! Load-use dependencies cannot be forwarded in time: a consumer may not
//! enter execute while its producer load is in the memory stage, so decode
//! holds it back for one cycle.

use crate::core::arch::regs::RegFile;
use crate::core::pipeline::latches::{ExMemSlot, IdExSlot, MemWbSlot};
use crate::isa::abi::REG_ZR;
use crate::isa::instruction::{Instruction, VREG_BASE};

/// Snapshot of one latch's pending register writes, taken at tick start.
#[derive(Clone, Debug, Default)]
pub struct Frame {
    /// Integer writes in program order.
    pub writes: Vec<(u8, u64)>,
    /// Vector writes in program order.
    pub vwrites: Vec<(u8, u128)>,
}

impl Frame {
    /// Collects pending writes from the EX/MEM latch.
    pub fn of_ex_mem(slots: &[ExMemSlot]) -> Self {
        let mut frame = Self::default();
        for slot in slots {
            frame.writes.extend_from_slice(&slot.writes);
            frame.vwrites.extend_from_slice(&slot.vwrites);
        }
        frame
    }

    /// Collects pending writes from the MEM/WB latch.
    pub fn of_mem_wb(slots: &[MemWbSlot]) -> Self {
        let mut frame = Self::default();
        for slot in slots {
            frame.writes.extend_from_slice(&slot.writes);
            frame.vwrites.extend_from_slice(&slot.vwrites);
        }
        frame
    }
}

/// Resolves an integer operand through the forwarding chain.
pub fn resolve(
    reg: u8,
    packet: &[ExMemSlot],
    ex_mem: &Frame,
    mem_wb: &Frame,
    regs: &RegFile,
) -> u64 {
    if reg == REG_ZR {
        return 0;
    }
    for slot in packet.iter().rev() {
        for &(r, v) in slot.writes.iter().rev() {
            if r == reg {
                return v;
            }
        }
    }
    for &(r, v) in ex_mem.writes.iter().rev() {
        if r == reg {
            return v;
        }
    }
    for &(r, v) in mem_wb.writes.iter().rev() {
        if r == reg {
            return v;
        }
    }
    regs.read(reg)
}

/// Resolves a vector operand through the forwarding chain.
pub fn resolve_v(
    reg: u8,
    packet: &[ExMemSlot],
    ex_mem: &Frame,
    mem_wb: &Frame,
    regs: &RegFile,
) -> u128 {
    for slot in packet.iter().rev() {
        for &(r, v) in slot.vwrites.iter().rev() {
            if r == reg {
                return v;
            }
        }
    }
    for &(r, v) in ex_mem.vwrites.iter().rev() {
        if r == reg {
            return v;
        }
    }
    for &(r, v) in mem_wb.vwrites.iter().rev() {
        if r == reg {
            return v;
        }
    }
    regs.read_v(reg)
}

/// Destination registers whose values arrive only after the memory stage.
///
/// Collected from the load slots that will execute this cycle; decode holds
/// back any consumer of these ids for one cycle (the load-use bubble). Base
/// writebacks are excluded: those are execute-time results and forward
/// normally.
pub fn load_dests(slots: &[IdExSlot]) -> Vec<u8> {
    let mut dests = Vec::new();
    for slot in slots {
        if !slot.inst.is_load() {
            continue;
        }
        match &slot.inst {
            Instruction::Mem { vector, rt, .. } => {
                if *vector {
                    dests.push(VREG_BASE + rt);
                } else if *rt != REG_ZR {
                    dests.push(*rt);
                }
            }
            Instruction::MemPair { rt, rt2, .. } => {
                if *rt != REG_ZR {
                    dests.push(*rt);
                }
                if *rt2 != REG_ZR {
                    dests.push(*rt2);
                }
            }
            Instruction::MemLit { rt, .. } => {
                if *rt != REG_ZR {
                    dests.push(*rt);
                }
            }
            _ => {}
        }
    }
    dests
}
