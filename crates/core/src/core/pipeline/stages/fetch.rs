//! Instruction Fetch (IF) stage.
//!
//! Reads up to `width` contiguous words starting at the PC, consults the
//! branch predictor for each control-transfer instruction, and fills the
//! IF/ID slots. A predicted-taken branch ends the packet and redirects the
//! PC (at most one taken redirect per cycle). High-confidence predicted
//! branches are folded: consumed here without occupying a slot. Folded
//! conditional branches are recorded for verification in execute.
//!
//! I-cache misses charge their latency as fetch-stall cycles on the
//! following ticks.

use crate::core::pipeline::latches::IfIdSlot;
use crate::core::pipeline::{FoldedBranch, Pipeline};
use crate::isa::decode::decode;
use crate::isa::instruction::{BranchRegOp, Instruction};

/// Executes the fetch stage.
pub fn fetch_stage(p: &mut Pipeline) {
    // Decode still holds unissued slots (or a syscall owns the machine):
    // keep them, fetch nothing.
    if !p.if_id.is_empty() || p.syscall_in_flight || p.exit.is_some() || p.fatal.is_some() {
        return;
    }

    let mut packet: Vec<IfIdSlot> = Vec::with_capacity(p.width);
    let mut pc = p.pc;
    let mut miss_cycles = 0u64;

    for _ in 0..p.width {
        let (word, latency) = p.fetch_word(pc);
        if p.fatal.is_some() {
            break;
        }
        miss_cycles += latency.saturating_sub(1);

        let inst = decode(word);
        let mut pred_taken = false;
        let mut pred_target = 0;
        let mut next_pc = pc.wrapping_add(4);
        let mut end_packet = false;
        let mut folded = false;

        match inst {
            Instruction::Branch { offset, link } => {
                let target = pc.wrapping_add(offset as u64);
                match p.predictor.predict_target(pc) {
                    Some((btb_target, confidence)) => {
                        if !link && p.fold_branches && confidence >= p.fold_confidence {
                            // Unconditional direct branch with a trusted
                            // target: consumed at fetch.
                            p.stats.eliminated_branches += 1;
                            p.predictor.train_target(pc, target);
                            folded = true;
                        } else {
                            pred_taken = true;
                            pred_target = btb_target;
                        }
                        next_pc = if folded { target } else { btb_target };
                        end_packet = true;
                    }
                    // Cold branch: fall through, execute will redirect.
                    None => {}
                }
            }
            Instruction::BranchCond { cond, offset } => {
                let prediction = p.predictor.predict(pc);
                if prediction.taken {
                    if let Some(btb_target) = prediction.target {
                        if p.fold_branches && prediction.confidence >= p.fold_confidence {
                            // The target of a direct branch is exact once
                            // decoded; the BTB only gates the fold.
                            let target = pc.wrapping_add(offset as u64);
                            p.stats.eliminated_branches += 1;
                            p.folded.push(FoldedBranch {
                                pc,
                                target,
                                fallthrough: pc.wrapping_add(4),
                                anchor_seq: p.seq,
                                cond,
                            });
                            folded = true;
                            next_pc = target;
                        } else {
                            pred_taken = true;
                            pred_target = btb_target;
                            next_pc = btb_target;
                        }
                        end_packet = true;
                    }
                }
            }
            Instruction::CompareBranch { .. } | Instruction::TestBranch { .. } => {
                // Register-dependent branches predict but never fold.
                let prediction = p.predictor.predict(pc);
                if prediction.taken {
                    if let Some(target) = prediction.target {
                        pred_taken = true;
                        pred_target = target;
                        next_pc = target;
                        end_packet = true;
                    }
                }
            }
            Instruction::BranchReg { op, .. } => {
                let predicted = if op == BranchRegOp::Ret {
                    p.predictor.predict_return()
                } else {
                    p.predictor.predict_target(pc).map(|(t, _)| t)
                };
                if let Some(target) = predicted {
                    pred_taken = true;
                    pred_target = target;
                    next_pc = target;
                }
                // Indirect targets are never certain: end the packet either
                // way so at most one redirect is in flight.
                end_packet = true;
            }
            Instruction::Svc { .. } => {
                end_packet = true;
            }
            _ => {}
        }

        if !folded {
            p.seq += 1;
            if p.trace {
                eprintln!("IF  pc={pc:#x} inst={word:#010x} seq={}", p.seq);
            }
            packet.push(IfIdSlot {
                seq: p.seq,
                pc,
                word,
                pred_taken,
                pred_target,
            });
        } else if p.trace {
            eprintln!("IF  pc={pc:#x} inst={word:#010x} # folded");
        }

        pc = next_pc;
        if end_packet {
            break;
        }
    }

    if miss_cycles > 0 {
        p.fetch_stall += miss_cycles;
    }
    p.pc = pc;
    p.if_id = packet;
}
