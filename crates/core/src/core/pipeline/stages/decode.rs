//! Instruction Decode (ID) stage.
//!
//! For each IF/ID slot, in program order:
//! 1. Decode the word (reusing the ISA decoder). `Unknown` is fatal.
//! 2. Check the load-use hazard: a consumer of a value still being loaded
//!    may not issue this cycle.
//! 3. Check intra-packet dependencies: a source produced by an older slot
//!    of the same packet is fine when the producer is single-cycle ALU
//!    work (the forwarding network covers it); otherwise the consumer is
//!    held back.
//! 4. Enforce structural budgets: `alu_ports` ALU issues and one memory
//!    operation per cycle.
//! 5. Detect CMP+B.cond fusion: a flag-setting compare directly followed
//!    by a conditional branch issues as a fused pair.
//!
//! Slots that fail a check stay in IF/ID and carry over to the next cycle.
//! Syscalls drain the pipeline and execute here, against fully committed
//! architectural state.

use crate::core::pipeline::Pipeline;
use crate::core::pipeline::latches::IdExSlot;
use crate::error::SimError;
use crate::isa::decode::decode;
use crate::isa::instruction::{InstClass, Instruction};
use crate::os::SyscallEffect;

/// Executes the decode stage.
///
/// `loads_entering_ex` lists the destination ids of loads that entered
/// execute this cycle (pre-tick ID/EX snapshot).
pub fn decode_stage(p: &mut Pipeline, loads_entering_ex: &[u8]) {
    debug_assert!(p.id_ex.is_empty(), "execute must drain ID/EX every cycle");

    // A dispatched syscall owns the machine until it retires.
    if p.syscall_in_flight {
        return;
    }

    let fetched = std::mem::take(&mut p.if_id);
    let mut issued: Vec<IdExSlot> = Vec::with_capacity(fetched.len());
    // Destinations written by already-issued slots of this packet, with a
    // flag for whether the producer can forward within the cycle.
    let mut packet_dests: Vec<(u8, bool)> = Vec::new();
    // An already-issued slot of this packet updates NZCV but is not
    // single-cycle; a flag consumer may not issue behind it.
    let mut flags_pending_slow = false;
    let mut alu_used = 0usize;
    let mut mem_used = 0usize;
    let mut consumed = 0usize;
    let mut raw_stall = false;
    let mut structural_stall = false;

    for slot in &fetched {
        let inst = decode(slot.word);

        if let Instruction::Unknown { word } = inst {
            p.fatal = Some(SimError::UnknownInstruction { pc: slot.pc, word });
            break;
        }

        if matches!(inst, Instruction::Svc { .. }) {
            // Syscalls execute against committed state: wait until nothing
            // is in flight, then dispatch right here.
            let drained = issued.is_empty() && p.ex_mem.is_empty() && p.mem_wb.is_empty();
            if !drained {
                break;
            }
            if let Err(e) = p.drain_caches() {
                p.fatal = Some(e);
                break;
            }
            let effect = {
                let Pipeline { os, regs, mem, .. } = p;
                os.handle(regs, mem)
            };
            let exit = match effect {
                Ok(SyscallEffect::Exit(code)) => Some(code),
                Ok(SyscallEffect::Continue) => None,
                Err(e) => {
                    p.fatal = Some(e);
                    break;
                }
            };
            if p.trace {
                eprintln!("ID  pc={:#x} # syscall, exit={exit:?}", slot.pc);
            }
            p.syscall_in_flight = true;
            issued.push(IdExSlot {
                seq: slot.seq,
                pc: slot.pc,
                inst,
                pred_taken: false,
                pred_target: 0,
                fused: false,
                done: true,
                exit,
            });
            consumed += 1;
            break;
        }

        // Load-use: the producer is in execute now, its value arrives after
        // the memory stage; one bubble is unavoidable.
        let sources = inst.sources();
        if sources.iter().any(|s| loads_entering_ex.contains(s)) {
            raw_stall = true;
            break;
        }

        // Intra-packet RAW: only single-cycle producers can forward to a
        // younger slot in the same cycle. PSTATE follows the same rule:
        // flags forward within the cycle in slot order, so only a
        // multi-cycle flag producer splits the packet.
        let mut held = false;
        for src in &sources {
            if packet_dests
                .iter()
                .any(|&(dest, fwd_ok)| dest == *src && !fwd_ok)
            {
                held = true;
            }
        }
        if inst.reads_flags() && flags_pending_slow {
            held = true;
        }
        if held {
            raw_stall = true;
            break;
        }

        // Structural budgets.
        match inst.class() {
            InstClass::Alu => {
                if alu_used == p.alu_ports {
                    structural_stall = true;
                    break;
                }
                alu_used += 1;
            }
            InstClass::Mem => {
                if mem_used == 1 {
                    structural_stall = true;
                    break;
                }
                mem_used += 1;
            }
            InstClass::Branch | InstClass::System => {}
        }

        // CMP+B.cond fusion: the branch inherits the compare's flag result
        // and resolves in the same cycle.
        let fused = p.fusion
            && matches!(inst, Instruction::BranchCond { .. })
            && issued
                .last()
                .is_some_and(|prev| prev.seq + 1 == slot.seq && prev.inst.is_cmp());
        if fused {
            p.stats.fused_ops += 1;
        }

        if p.trace {
            eprintln!("ID  pc={:#x} seq={}{}", slot.pc, slot.seq, if fused { " fused" } else { "" });
        }

        let single = inst.single_cycle();
        for dest in inst.dests() {
            packet_dests.push((dest, single));
        }
        if inst.writes_flags() && !single {
            flags_pending_slow = true;
        }

        issued.push(IdExSlot {
            seq: slot.seq,
            pc: slot.pc,
            inst,
            pred_taken: slot.pred_taken,
            pred_target: slot.pred_target,
            fused,
            done: false,
            exit: None,
        });
        consumed += 1;
    }

    if consumed < fetched.len() && p.fatal.is_none() {
        if raw_stall {
            p.stats.stalls_raw += 1;
        } else if structural_stall {
            p.stats.stalls_structural += 1;
        }
        p.if_id = fetched[consumed..].to_vec();
    }

    p.id_ex = issued;
}
