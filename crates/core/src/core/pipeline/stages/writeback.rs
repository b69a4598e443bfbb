//! Writeback (WB) stage.
//!
//! Commits every MEM/WB slot to the register file in program order and
//! updates the retirement statistics. A committed syscall exit stops the
//! run. Slot ordering is asserted: committing out of fetch order would
//! mean a stale slot survived a flush, which is a model bug rather than a
//! representable architectural state.

use crate::core::pipeline::Pipeline;
use crate::isa::instruction::Instruction;

/// Executes the writeback stage.
pub fn writeback_stage(p: &mut Pipeline) {
    let slots = std::mem::take(&mut p.mem_wb);

    for slot in slots {
        debug_assert!(
            slot.seq > p.last_retired_seq,
            "stale slot reached writeback (seq {} after {})",
            slot.seq,
            p.last_retired_seq
        );
        p.last_retired_seq = slot.seq;

        for &(reg, value) in &slot.writes {
            p.regs.write(reg, value);
            if p.trace {
                eprintln!("WB  pc={:#x} r{} <= {value:#x}", slot.pc, reg);
            }
        }
        for &(reg, value) in &slot.vwrites {
            p.regs.write_v(reg, value);
        }

        p.stats.instructions_retired += 1;

        if matches!(slot.inst, Instruction::Svc { .. }) {
            p.syscall_in_flight = false;
        }

        if let Some(code) = slot.exit {
            if p.trace {
                eprintln!("WB  pc={:#x} # exit {code}", slot.pc);
            }
            p.exit = Some(code);
            break;
        }
    }
}
