//! Functional engine tests: scenarios S1-S5 plus the architectural
//! boundary behaviors the emulator must honor.

use m2sim_core::error::SimError;
use m2sim_core::sim::StopReason;

use crate::common::{self, asm};
use crate::common::asm::cond;

// ══════════════════════════════════════════════════════════
// 1. End-to-end scenarios
// ══════════════════════════════════════════════════════════

#[test]
fn s1_simple_exit() {
    let mut emu = common::emulator(&common::prog_simple_exit());
    let result = emu.run().unwrap();
    assert_eq!(result.reason, StopReason::Exited(42));
    assert_eq!(result.stats.instructions_retired, 3);
}

#[test]
fn s2_arithmetic() {
    let mut emu = common::emulator(&common::prog_arithmetic());
    emu.regs.write(0, 10);
    emu.regs.write(1, 5);
    let result = emu.run().unwrap();
    assert_eq!(result.reason, StopReason::Exited(15));
}

#[test]
fn s3_loop_sum() {
    let mut emu = common::emulator(&common::prog_loop_sum());
    let result = emu.run().unwrap();
    assert_eq!(result.reason, StopReason::Exited(15));
}

#[test]
fn s4_hello() {
    let mut emu = common::emulator(&common::prog_hello());
    emu.mem.write_bytes(common::HELLO_ADDR, b"Hello\n").unwrap();
    let result = emu.run().unwrap();
    assert_eq!(result.reason, StopReason::Exited(0));
    assert_eq!(emu.captured_output(), b"Hello\n");
}

#[test]
fn s5_matrix_ops() {
    let mut emu = common::emulator(&common::prog_matrix_ops());
    common::preload_matrix(&mut |addr, v| emu.mem.write_u64(addr, v).unwrap());
    let result = emu.run().unwrap();
    assert_eq!(result.reason, StopReason::Exited(110));
    // C was materialized in memory.
    for i in 0..4u64 {
        assert_eq!(
            emu.mem.read_u64(common::MATRIX_C + i * 8),
            common::MATRIX_A_VALUES[i as usize] + common::MATRIX_B_VALUES[i as usize]
        );
    }
}

// ══════════════════════════════════════════════════════════
// 2. Boundary behaviors
// ══════════════════════════════════════════════════════════

/// MOVZ clears everything outside the immediate window; MOVK preserves it.
#[test]
fn movz_clears_movk_keeps() {
    let words = vec![
        asm::movz(true, 0, 0xFFFF, 0),
        asm::movk(true, 0, 0xAAAA, 1),
        asm::movz(true, 1, 0x1234, 1), // clears the low half
        asm::movz(true, 8, 93, 0),
        asm::svc(0),
    ];
    let mut emu = common::emulator(&words);
    emu.regs.write(1, 0xFFFF_FFFF);
    let result = emu.run().unwrap();
    assert_eq!(result.exit_code(), Some((0xAAAA_FFFFu64 & 0xFF) as u8));
    assert_eq!(emu.regs.read(0), 0xAAAA_FFFF);
    assert_eq!(emu.regs.read(1), 0x1234_0000);
}

/// A LDR with base register 31 uses SP, not the zero register.
#[test]
fn ldr_from_sp_uses_sp() {
    let words = vec![
        asm::ldr_imm(0, 31, 8), // ldr x0, [sp, #8]
        asm::movz(true, 8, 93, 0),
        asm::svc(0),
    ];
    let mut emu = common::emulator(&words);
    let sp = emu.regs.sp;
    assert_ne!(sp, 0);
    emu.mem.write_u64(sp + 8, 77).unwrap();
    let result = emu.run().unwrap();
    assert_eq!(result.reason, StopReason::Exited(77));
}

/// Pre-index updates the base before the access, post-index after.
#[test]
fn pre_and_post_index_update_base() {
    let words = vec![
        asm::movz(true, 1, 0x5000, 0),
        asm::movz(true, 2, 11, 0),
        asm::str_pre(2, 1, 16),  // [x1, #16]!  -> x1 = 0x5010, store at 0x5010
        asm::str_post(2, 1, 8),  // [x1], #8    -> store at 0x5010, x1 = 0x5018
        asm::movz(true, 8, 93, 0),
        asm::svc(0),
    ];
    let mut emu = common::emulator(&words);
    let _ = emu.run().unwrap();
    assert_eq!(emu.regs.read(1), 0x5018);
    assert_eq!(emu.mem.read_u64(0x5010), 11);
}

/// LDP/STP move two adjacent registers at offsets 0 and width.
#[test]
fn store_and_load_pair() {
    let words = vec![
        asm::movz(true, 1, 0x6000, 0),
        asm::movz(true, 2, 21, 0),
        asm::movz(true, 3, 22, 0),
        asm::stp(2, 3, 1, 0),
        asm::ldp(4, 5, 1, 0),
        asm::add_reg(true, 0, 4, 5),
        asm::movz(true, 8, 93, 0),
        asm::svc(0),
    ];
    let mut emu = common::emulator(&words);
    let result = emu.run().unwrap();
    assert_eq!(result.reason, StopReason::Exited(43));
    assert_eq!(emu.mem.read_u64(0x6000), 21);
    assert_eq!(emu.mem.read_u64(0x6008), 22);
}

/// Signed loads sign-extend to the destination width.
#[test]
fn signed_load_extends() {
    let words = vec![
        asm::movz(true, 1, 0x7000, 0),
        asm::ldrsw_imm(0, 1, 0),
        asm::movz(true, 8, 93, 0),
        asm::svc(0),
    ];
    let mut emu = common::emulator(&words);
    emu.mem.write_u32(0x7000, 0xFFFF_FFFE).unwrap(); // -2
    let _ = emu.run().unwrap();
    assert_eq!(emu.regs.read(0), -2i64 as u64);
}

/// BL writes PC+4 into X30 and RET returns through it.
#[test]
fn bl_and_ret() {
    let words = vec![
        asm::movz(true, 0, 1, 0),  // 0x0
        asm::bl(3),                // 0x4 -> calls 0x10, lr = 0x8
        asm::movz(true, 8, 93, 0), // 0x8 (return lands here)
        asm::svc(0),               // 0xC
        asm::add_imm(true, 0, 0, 9), // 0x10: x0 += 9
        asm::ret(),                // 0x14
    ];
    let mut emu = common::emulator(&words);
    let result = emu.run().unwrap();
    assert_eq!(result.reason, StopReason::Exited(10));
}

/// CSEL and CSINC follow the condition over current flags.
#[test]
fn conditional_select() {
    let words = vec![
        asm::movz(true, 1, 5, 0),
        asm::movz(true, 2, 9, 0),
        asm::cmp_imm(true, 1, 5),              // Z set
        asm::csel(true, 0, 1, 2, cond::EQ),    // x0 = x1 = 5
        asm::csinc(true, 3, 1, 2, cond::NE),   // NE fails: x3 = x2 + 1 = 10
        asm::add_reg(true, 0, 0, 3),           // 15
        asm::movz(true, 8, 93, 0),
        asm::svc(0),
    ];
    let mut emu = common::emulator(&words);
    let result = emu.run().unwrap();
    assert_eq!(result.reason, StopReason::Exited(15));
}

/// CCMP installs its immediate NZCV when the condition fails.
#[test]
fn conditional_compare_failure_installs_nzcv() {
    let words = vec![
        asm::movz(true, 1, 1, 0),
        asm::cmp_imm(true, 1, 5),               // 1 < 5: NE
        // EQ fails -> install nzcv=0b0100 (Z) -> following EQ holds.
        asm::ccmp_imm(true, 1, 9, 0b0100, cond::EQ),
        asm::cset(true, 0, cond::EQ),
        asm::movz(true, 8, 93, 0),
        asm::svc(0),
    ];
    let mut emu = common::emulator(&words);
    let result = emu.run().unwrap();
    assert_eq!(result.reason, StopReason::Exited(1));
}

/// B with offset 0 loops in place; the instruction bound reports it.
#[test]
fn branch_to_self_hits_instruction_limit() {
    let mut config = common::test_config();
    config.general.max_instructions = 1000;
    let words = vec![asm::b(0)];
    let mut emu = common::emulator_with(&words, &config);
    let result = emu.run().unwrap();
    assert_eq!(result.reason, StopReason::InstructionLimit);
}

/// An undecodable word is a fatal decode error carrying the PC.
#[test]
fn unknown_instruction_is_fatal() {
    let words = vec![asm::nop(), 0x0000_0000];
    let mut emu = common::emulator(&words);
    match emu.run() {
        Err(SimError::UnknownInstruction { pc, word }) => {
            assert_eq!(pc, common::CODE_BASE + 4);
            assert_eq!(word, 0);
        }
        other => panic!("expected decode error, got {other:?}"),
    }
}

/// TBZ/TBNZ test a single bit.
#[test]
fn test_branch_on_bit() {
    let words = vec![
        asm::movz(true, 1, 0b100, 0),
        asm::tbz(1, 2, 3),          // bit 2 set: not taken
        asm::movz(true, 0, 1, 0),   // executed
        asm::tbnz(1, 2, 2),         // bit 2 set: taken, skips the next
        asm::movz(true, 0, 99, 0),  // skipped
        asm::movz(true, 8, 93, 0),
        asm::svc(0),
    ];
    let mut emu = common::emulator(&words);
    let result = emu.run().unwrap();
    assert_eq!(result.reason, StopReason::Exited(1));
}

/// Vector add/store round trip through the SIMD file.
#[test]
fn vector_add_lanes() {
    let words = vec![
        asm::movz(true, 1, 0x9000, 0),
        asm::ldr_q(0, 1, 0),
        asm::ldr_q(1, 1, 16),
        asm::vadd_4s(2, 0, 1),
        asm::str_q(2, 1, 32),
        asm::movz(true, 8, 93, 0),
        asm::svc(0),
    ];
    let mut emu = common::emulator(&words);
    // Lanes [1, 2, 3, 4] and [10, 20, 30, 40].
    for (i, v) in [1u32, 2, 3, 4].iter().enumerate() {
        emu.mem.write_u32(0x9000 + (i as u64) * 4, *v).unwrap();
    }
    for (i, v) in [10u32, 20, 30, 40].iter().enumerate() {
        emu.mem.write_u32(0x9010 + (i as u64) * 4, *v).unwrap();
    }
    let _ = emu.run().unwrap();
    for (i, v) in [11u32, 22, 33, 44].iter().enumerate() {
        assert_eq!(emu.mem.read_u32(0x9020 + (i as u64) * 4), *v);
    }
}
