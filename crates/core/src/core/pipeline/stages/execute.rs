//! Execute (EX) stage.
//!
//! Consumes every ID/EX slot in program order:
//! 1. Resolves operands through the forwarding network (same-packet
//!    results, then the EX/MEM and MEM/WB snapshots, then the register
//!    file).
//! 2. Computes ALU results, branch decisions, and effective addresses via
//!    the shared dataflow function.
//! 3. Commits NZCV immediately: no wrong-path instruction ever reaches
//!    execute, and in-order flag commit is exactly the same-cycle flag
//!    forwarding the fused CMP+B.cond path needs.
//! 4. Verifies branch predictions; a mismatch flushes every younger slot
//!    and redirects the PC.
//! 5. Verifies folded conditional branches whose anchor has now executed.
//!
//! Divides occupy the iterative unit and freeze the pipeline for
//! `div_latency - 1` extra cycles.

use crate::core::exec;
use crate::core::pipeline::hazards::{self, Frame};
use crate::core::pipeline::latches::{ExMemSlot, IdExSlot};
use crate::core::pipeline::Pipeline;
use crate::isa::instruction::{AluOp, BranchRegOp, Instruction};

/// Executes the execute stage.
pub fn execute_stage(p: &mut Pipeline, fwd_ex_mem: &Frame, fwd_mem_wb: &Frame) {
    let slots = std::mem::take(&mut p.id_ex);
    let mut results: Vec<ExMemSlot> = Vec::with_capacity(slots.len());
    let mut flush_remaining = false;

    for slot in slots {
        if flush_remaining {
            break;
        }

        // Syscall slots already executed in decode; pass through to retire.
        if slot.done {
            p.last_executed_seq = slot.seq;
            results.push(ExMemSlot {
                seq: slot.seq,
                pc: slot.pc,
                inst: slot.inst,
                writes: Vec::new(),
                vwrites: Vec::new(),
                mem: None,
                exit: slot.exit,
            });
            continue;
        }

        if p.trace {
            eprintln!("EX  pc={:#x} seq={}", slot.pc, slot.seq);
        }

        let computed = {
            let regs = &p.regs;
            let packet: &[ExMemSlot] = &results;
            exec::compute(
                &slot.inst,
                slot.pc,
                regs.pstate,
                &mut |r| hazards::resolve(r, packet, fwd_ex_mem, fwd_mem_wb, regs),
                &mut |r| hazards::resolve_v(r, packet, fwd_ex_mem, fwd_mem_wb, regs),
            )
        };

        if matches!(slot.inst, Instruction::AluReg { op: AluOp::Udiv | AluOp::Sdiv, .. }) {
            p.ex_stall += p.div_latency.saturating_sub(1);
        }

        // The decoded flag-writer set and the computed flag updates must
        // agree; a mismatch means decode hazard tracking is out of sync.
        debug_assert_eq!(computed.nzcv.is_some(), slot.inst.writes_flags());
        if let Some(flags) = computed.nzcv {
            p.regs.pstate = flags;
        }
        p.last_executed_seq = slot.seq;

        if let Some(outcome) = computed.branch {
            resolve_branch(p, &slot, outcome.taken, outcome.target, &mut flush_remaining);
        }

        results.push(ExMemSlot {
            seq: slot.seq,
            pc: slot.pc,
            inst: slot.inst,
            writes: computed.writes,
            vwrites: computed.vwrites,
            mem: computed.mem,
            exit: None,
        });
    }

    p.ex_mem = results;

    verify_folded(p);
}

/// Trains the predictor and recovers from a mispredicted branch.
fn resolve_branch(
    p: &mut Pipeline,
    slot: &IdExSlot,
    taken: bool,
    target: u64,
    flush_remaining: &mut bool,
) {
    let fallthrough = slot.pc.wrapping_add(4);
    let predicted_next = if slot.pred_taken {
        slot.pred_target
    } else {
        fallthrough
    };
    let actual_next = if taken { target } else { fallthrough };

    // Train the prediction structures.
    match &slot.inst {
        Instruction::BranchCond { .. }
        | Instruction::CompareBranch { .. }
        | Instruction::TestBranch { .. } => {
            p.predictor
                .update(slot.pc, taken, if taken { Some(target) } else { None });
        }
        Instruction::Branch { link, .. } => {
            p.predictor.train_target(slot.pc, target);
            if *link {
                p.predictor.on_call(fallthrough);
            }
        }
        Instruction::BranchReg { op, .. } => match op {
            BranchRegOp::Ret => p.predictor.on_return(),
            BranchRegOp::Br => p.predictor.train_target(slot.pc, target),
            BranchRegOp::Blr => {
                p.predictor.train_target(slot.pc, target);
                p.predictor.on_call(fallthrough);
            }
        },
        _ => {}
    }

    if predicted_next == actual_next {
        p.stats.branch_predictions += 1;
        return;
    }

    // Misprediction: younger work is wrong-path. Slots older than the
    // branch (already in `results`) are kept; everything fetched after it
    // is discarded and the PC redirected.
    p.stats.branch_mispredictions += 1;
    p.stats.flushes += 1;
    p.stats.stalls_control += 2;
    if p.trace {
        eprintln!(
            "EX  pc={:#x} # mispredict: next={actual_next:#x} (predicted {predicted_next:#x})",
            slot.pc
        );
    }
    p.pc = actual_next;
    p.flush_front_end(slot.seq);
    *flush_remaining = true;
}

/// Verifies folded conditional branches whose anchor instruction has
/// executed; a failed check flushes to the fall-through path.
fn verify_folded(p: &mut Pipeline) {
    while let Some(folded) = p.folded.first().copied() {
        if folded.anchor_seq > p.last_executed_seq {
            break;
        }
        let _ = p.folded.remove(0);

        if folded.cond.holds(p.regs.pstate) {
            p.stats.branch_predictions += 1;
            p.predictor.update(folded.pc, true, Some(folded.target));
            continue;
        }

        // The branch was folded taken but resolves not-taken.
        p.stats.branch_mispredictions += 1;
        p.stats.flushes += 1;
        p.stats.stalls_control += 2;
        if p.trace {
            eprintln!(
                "EX  pc={:#x} # folded branch fails verification, resuming at {:#x}",
                folded.pc, folded.fallthrough
            );
        }
        p.predictor.update(folded.pc, false, None);
        p.pc = folded.fallthrough;
        p.if_id.clear();
        // Everything folded after this one came from the wrong path.
        p.folded.clear();
        break;
    }
}
