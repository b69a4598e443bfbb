//! A64 instruction decoder.
//!
//! `decode` maps a 32-bit instruction word to the typed [`Instruction`]
//! model. It is a total, pure function: every word decodes, and anything
//! outside the supported surface yields [`Instruction::Unknown`], which the
//! engines treat as a fatal decode error.
//!
//! Dispatch follows the top-level encoding classes of the A64 instruction
//! set (bits 28:25), with one sub-decoder per class:
//! 1. `100x` data processing, immediate
//! 2. `101x` branches, exception generation, system
//! 3. `x1x0` loads and stores
//! 4. `x101` data processing, register
//! 5. `x111` data processing, SIMD

use crate::isa::bits::{decode_bit_masks, field, sign_extend};
use crate::isa::cond::Cond;
use crate::isa::instruction::{
    AluOp, BitfieldOp, BranchRegOp, CcmpOperand, CselOp, Dp3Op, Extend, IndexMode, Instruction,
    MemOffset, MoveOp, ShiftKind, SysOp, VecAluOp, VecArrangement,
};

/// Fixed-bit mask of the SIMD three-same format.
const SIMD_THREE_SAME_MASK: u32 = 0x9F20_0400;
/// Fixed-bit value of the SIMD three-same format.
const SIMD_THREE_SAME_BITS: u32 = 0x0E20_0400;

/// Decodes one instruction word.
pub fn decode(word: u32) -> Instruction {
    match field(word, 25, 4) {
        0b1000 | 0b1001 => decode_dp_imm(word),
        0b1010 | 0b1011 => decode_branch_sys(word),
        0b0100 | 0b0110 | 0b1100 | 0b1110 => decode_load_store(word),
        0b0101 | 0b1101 => decode_dp_reg(word),
        0b0111 | 0b1111 => decode_simd(word),
        _ => Instruction::Unknown { word },
    }
}

fn rd(word: u32) -> u8 {
    field(word, 0, 5) as u8
}

fn rn(word: u32) -> u8 {
    field(word, 5, 5) as u8
}

fn rm(word: u32) -> u8 {
    field(word, 16, 5) as u8
}

fn is64(word: u32) -> bool {
    word >> 31 == 1
}

/// Data processing, immediate (op0 = bits 25:23).
fn decode_dp_imm(word: u32) -> Instruction {
    match field(word, 23, 3) {
        0b000 | 0b001 => {
            // ADR/ADRP: imm = immhi:immlo, 21 bits.
            let immlo = field(word, 29, 2) as u64;
            let immhi = field(word, 5, 19) as u64;
            let imm = sign_extend((immhi << 2) | immlo, 21);
            Instruction::PcRel {
                page: is64(word),
                rd: rd(word),
                imm,
            }
        }
        0b010 => {
            let op = if field(word, 30, 1) == 0 {
                AluOp::Add
            } else {
                AluOp::Sub
            };
            let shift = 12 * field(word, 22, 1);
            Instruction::AluImm {
                op,
                is64: is64(word),
                set_flags: field(word, 29, 1) == 1,
                rd: rd(word),
                rn: rn(word),
                imm: u64::from(field(word, 10, 12)) << shift,
            }
        }
        0b100 => {
            let (op, set_flags) = match field(word, 29, 2) {
                0b00 => (AluOp::And, false),
                0b01 => (AluOp::Orr, false),
                0b10 => (AluOp::Eor, false),
                _ => (AluOp::And, true),
            };
            let sf = is64(word);
            let n = field(word, 22, 1);
            let immr = field(word, 16, 6);
            let imms = field(word, 10, 6);
            match decode_bit_masks(n, imms, immr, true, sf) {
                Some((wmask, _)) => Instruction::AluImm {
                    op,
                    is64: sf,
                    set_flags,
                    rd: rd(word),
                    rn: rn(word),
                    imm: wmask,
                },
                None => Instruction::Unknown { word },
            }
        }
        0b101 => {
            let op = match field(word, 29, 2) {
                0b00 => MoveOp::Movn,
                0b10 => MoveOp::Movz,
                0b11 => MoveOp::Movk,
                _ => return Instruction::Unknown { word },
            };
            let hw = field(word, 21, 2) as u8;
            if !is64(word) && hw > 1 {
                return Instruction::Unknown { word };
            }
            Instruction::MoveWide {
                op,
                is64: is64(word),
                rd: rd(word),
                imm16: field(word, 5, 16) as u16,
                hw,
            }
        }
        0b110 => {
            let op = match field(word, 29, 2) {
                0b00 => BitfieldOp::Sbfm,
                0b01 => BitfieldOp::Bfm,
                0b10 => BitfieldOp::Ubfm,
                _ => return Instruction::Unknown { word },
            };
            // N must match sf.
            if field(word, 22, 1) != field(word, 31, 1) {
                return Instruction::Unknown { word };
            }
            Instruction::Bitfield {
                op,
                is64: is64(word),
                rd: rd(word),
                rn: rn(word),
                immr: field(word, 16, 6) as u8,
                imms: field(word, 10, 6) as u8,
            }
        }
        0b111 => {
            // EXTR: op21/o0 fixed, N = sf.
            if field(word, 29, 2) != 0 || field(word, 21, 1) != 0 {
                return Instruction::Unknown { word };
            }
            if field(word, 22, 1) != field(word, 31, 1) {
                return Instruction::Unknown { word };
            }
            let lsb = field(word, 10, 6) as u8;
            if !is64(word) && lsb > 31 {
                return Instruction::Unknown { word };
            }
            Instruction::Extract {
                is64: is64(word),
                rd: rd(word),
                rn: rn(word),
                rm: rm(word),
                lsb,
            }
        }
        _ => Instruction::Unknown { word },
    }
}

/// Branches, exception generation, and system instructions.
fn decode_branch_sys(word: u32) -> Instruction {
    // B / BL: imm26, scaled by 4.
    if field(word, 26, 6) == 0b000101 || field(word, 26, 6) == 0b100101 {
        let offset = sign_extend(u64::from(field(word, 0, 26)), 26) * 4;
        return Instruction::Branch {
            offset,
            link: word >> 31 == 1,
        };
    }

    // B.cond: 0101010x with bit 4 clear.
    if field(word, 24, 8) == 0b0101_0100 && field(word, 4, 1) == 0 {
        let offset = sign_extend(u64::from(field(word, 5, 19)), 19) * 4;
        return Instruction::BranchCond {
            cond: Cond::from_bits(field(word, 0, 4) as u8),
            offset,
        };
    }

    // CBZ/CBNZ.
    if field(word, 25, 6) == 0b011010 {
        let offset = sign_extend(u64::from(field(word, 5, 19)), 19) * 4;
        return Instruction::CompareBranch {
            is64: is64(word),
            nonzero: field(word, 24, 1) == 1,
            rt: rd(word),
            offset,
        };
    }

    // TBZ/TBNZ: bit index is b5:b40.
    if field(word, 25, 6) == 0b011011 {
        let bit = ((field(word, 31, 1) << 5) | field(word, 19, 5)) as u8;
        let offset = sign_extend(u64::from(field(word, 5, 14)), 14) * 4;
        return Instruction::TestBranch {
            nonzero: field(word, 24, 1) == 1,
            rt: rd(word),
            bit,
            offset,
        };
    }

    // Unconditional branch, register: BR/BLR/RET.
    if field(word, 25, 7) == 0b1101011 {
        if field(word, 10, 11) != 0b11111_000000 || field(word, 0, 5) != 0 {
            return Instruction::Unknown { word };
        }
        let op = match field(word, 21, 4) {
            0b0000 => BranchRegOp::Br,
            0b0001 => BranchRegOp::Blr,
            0b0010 => BranchRegOp::Ret,
            _ => return Instruction::Unknown { word },
        };
        return Instruction::BranchReg { op, rn: rn(word) };
    }

    // Exception generation: only SVC is supported.
    if field(word, 24, 8) == 0b1101_0100 {
        if (word & 0xFFE0_001F) == 0xD400_0001 {
            return Instruction::Svc {
                imm: field(word, 5, 16) as u16,
            };
        }
        return Instruction::Unknown { word };
    }

    // System: hints, barriers, MRS/MSR.
    if field(word, 22, 10) == 0b11_0101_0100 {
        // Hint space (NOP, YIELD, ...): all retire as NOP.
        if (word & 0xFFFF_F01F) == 0xD503_201F {
            return Instruction::Sys(SysOp::Nop);
        }
        // Barriers (CLREX/DSB/DMB/ISB): no-ops on a single in-order core.
        if (word & 0xFFFF_F01F) == 0xD503_301F {
            return Instruction::Sys(SysOp::Nop);
        }
        let top = field(word, 20, 12);
        let reg = field(word, 5, 15) as u16;
        if top == 0xD53 {
            return Instruction::Sys(SysOp::Mrs { rt: rd(word), reg });
        }
        if top == 0xD51 {
            return Instruction::Sys(SysOp::Msr { rt: rd(word), reg });
        }
        return Instruction::Unknown { word };
    }

    Instruction::Unknown { word }
}

/// Loads and stores.
fn decode_load_store(word: u32) -> Instruction {
    // Load/store register pair.
    if field(word, 27, 3) == 0b101 {
        if field(word, 26, 1) == 1 {
            // SIMD pairs are outside the supported surface.
            return Instruction::Unknown { word };
        }
        let size: u8 = match field(word, 30, 2) {
            0b00 => 4,
            0b10 => 8,
            _ => return Instruction::Unknown { word },
        };
        let mode = match field(word, 23, 2) {
            0b01 => IndexMode::Post,
            0b10 => IndexMode::Offset,
            0b11 => IndexMode::Pre,
            _ => return Instruction::Unknown { word },
        };
        let imm = sign_extend(u64::from(field(word, 15, 7)), 7) * i64::from(size);
        return Instruction::MemPair {
            load: field(word, 22, 1) == 1,
            size,
            rt: rd(word),
            rt2: field(word, 10, 5) as u8,
            rn: rn(word),
            imm,
            mode,
        };
    }

    // Load register, literal (integer forms only).
    if field(word, 24, 6) == 0b011000 && field(word, 26, 1) == 0 {
        let offset = sign_extend(u64::from(field(word, 5, 19)), 19) * 4;
        let (size, signed) = match field(word, 30, 2) {
            0b00 => (4, false),
            0b01 => (8, false),
            0b10 => (4, true),
            // PRFM literal: hint only.
            _ => return Instruction::Sys(SysOp::Nop),
        };
        return Instruction::MemLit {
            size,
            signed,
            rt: rd(word),
            offset,
        };
    }

    // Load/store register (imm12, imm9, or register offset).
    if field(word, 27, 3) == 0b111 {
        let size_bits = field(word, 30, 2);
        let vector = field(word, 26, 1) == 1;
        let opc = field(word, 23, 2);

        let (load, size, signed, dest64) = if vector {
            // Vector width: B/H/S/D via size, Q via size=00 with opc<1> set.
            let load = opc & 1 == 1;
            let size: u8 = if size_bits == 0 && opc >= 0b10 {
                16
            } else if opc >= 0b10 {
                return Instruction::Unknown { word };
            } else {
                1 << size_bits
            };
            (load, size, false, false)
        } else {
            let size: u8 = 1 << size_bits;
            match (size_bits, opc) {
                (_, 0b00) => (false, size, false, false),
                (_, 0b01) => (true, size, false, false),
                (0b11, 0b10) => {
                    // PRFM: prefetch hint, no architectural effect.
                    return Instruction::Sys(SysOp::Nop);
                }
                (0b11, _) => return Instruction::Unknown { word },
                (0b10, 0b10) => (true, 4, true, true),
                (0b10, _) => return Instruction::Unknown { word },
                (_, 0b10) => (true, size, true, true),
                (_, _) => (true, size, true, false),
            }
        };

        let scale = size.trailing_zeros();

        let offset = if field(word, 24, 1) == 1 {
            // Unsigned scaled imm12.
            MemOffset::Imm {
                value: (u64::from(field(word, 10, 12)) << scale) as i64,
                mode: IndexMode::Offset,
            }
        } else {
            match field(word, 10, 2) {
                0b00 => MemOffset::Imm {
                    value: sign_extend(u64::from(field(word, 12, 9)), 9),
                    mode: IndexMode::Offset,
                },
                0b01 => MemOffset::Imm {
                    value: sign_extend(u64::from(field(word, 12, 9)), 9),
                    mode: IndexMode::Post,
                },
                0b11 => MemOffset::Imm {
                    value: sign_extend(u64::from(field(word, 12, 9)), 9),
                    mode: IndexMode::Pre,
                },
                _ => {
                    if field(word, 21, 1) != 1 {
                        return Instruction::Unknown { word };
                    }
                    let extend = match field(word, 13, 3) {
                        0b010 => Extend::Uxtw,
                        0b011 => Extend::Uxtx,
                        0b110 => Extend::Sxtw,
                        0b111 => Extend::Sxtx,
                        _ => return Instruction::Unknown { word },
                    };
                    let shift = if field(word, 12, 1) == 1 {
                        scale as u8
                    } else {
                        0
                    };
                    MemOffset::Reg {
                        rm: rm(word),
                        extend,
                        shift,
                    }
                }
            }
        };

        return Instruction::Mem {
            load,
            size,
            signed,
            dest64,
            vector,
            rt: rd(word),
            rn: rn(word),
            offset,
        };
    }

    Instruction::Unknown { word }
}

/// Data processing, register.
fn decode_dp_reg(word: u32) -> Instruction {
    let sf = is64(word);

    if field(word, 28, 1) == 0 {
        if field(word, 24, 1) == 0 {
            // Logical, shifted register.
            let amount = field(word, 10, 6) as u8;
            if !sf && amount > 31 {
                return Instruction::Unknown { word };
            }
            let shift = decode_shift(field(word, 22, 2));
            let n = field(word, 21, 1);
            let (op, set_flags) = match (field(word, 29, 2), n) {
                (0b00, 0) => (AluOp::And, false),
                (0b00, 1) => (AluOp::Bic, false),
                (0b01, 0) => (AluOp::Orr, false),
                (0b01, 1) => (AluOp::Orn, false),
                (0b10, 0) => (AluOp::Eor, false),
                (0b10, 1) => (AluOp::Eon, false),
                (0b11, 0) => (AluOp::And, true),
                _ => (AluOp::Bic, true),
            };
            return Instruction::AluReg {
                op,
                is64: sf,
                set_flags,
                rd: rd(word),
                rn: rn(word),
                rm: rm(word),
                shift,
                amount,
            };
        }

        let op = if field(word, 30, 1) == 0 {
            AluOp::Add
        } else {
            AluOp::Sub
        };
        let set_flags = field(word, 29, 1) == 1;

        if field(word, 21, 1) == 0 {
            // Add/subtract, shifted register.
            if field(word, 22, 2) == 0b11 {
                return Instruction::Unknown { word };
            }
            let amount = field(word, 10, 6) as u8;
            if !sf && amount > 31 {
                return Instruction::Unknown { word };
            }
            return Instruction::AluReg {
                op,
                is64: sf,
                set_flags,
                rd: rd(word),
                rn: rn(word),
                rm: rm(word),
                shift: decode_shift(field(word, 22, 2)),
                amount,
            };
        }

        // Add/subtract, extended register.
        if field(word, 22, 2) != 0 {
            return Instruction::Unknown { word };
        }
        let shift = field(word, 10, 3) as u8;
        if shift > 4 {
            return Instruction::Unknown { word };
        }
        let extend = match field(word, 13, 3) {
            0b000 => Extend::Uxtb,
            0b001 => Extend::Uxth,
            0b010 => Extend::Uxtw,
            0b011 => Extend::Uxtx,
            0b100 => Extend::Sxtb,
            0b101 => Extend::Sxth,
            0b110 => Extend::Sxtw,
            _ => Extend::Sxtx,
        };
        return Instruction::AluExt {
            op,
            is64: sf,
            set_flags,
            rd: rd(word),
            rn: rn(word),
            rm: rm(word),
            extend,
            shift,
        };
    }

    // op1 = 1 half of the register class.
    if field(word, 24, 1) == 1 {
        // Data-processing, 3-source.
        let op31 = field(word, 21, 3);
        let o0 = field(word, 15, 1);
        let op = match (op31, o0) {
            (0b000, 0) => Dp3Op::Madd,
            (0b000, 1) => Dp3Op::Msub,
            (0b001, 0) => Dp3Op::Smaddl,
            (0b001, 1) => Dp3Op::Smsubl,
            (0b010, 0) => Dp3Op::Smulh,
            (0b101, 0) => Dp3Op::Umaddl,
            (0b101, 1) => Dp3Op::Umsubl,
            (0b110, 0) => Dp3Op::Umulh,
            _ => return Instruction::Unknown { word },
        };
        if !sf && op != Dp3Op::Madd && op != Dp3Op::Msub {
            return Instruction::Unknown { word };
        }
        return Instruction::DataProc3 {
            op,
            is64: sf,
            rd: rd(word),
            rn: rn(word),
            rm: rm(word),
            ra: field(word, 10, 5) as u8,
        };
    }

    match field(word, 21, 3) {
        0b000 => {
            // Add/subtract with carry.
            if field(word, 10, 6) != 0 {
                return Instruction::Unknown { word };
            }
            let op = if field(word, 30, 1) == 0 {
                AluOp::Adc
            } else {
                AluOp::Sbc
            };
            Instruction::AluReg {
                op,
                is64: sf,
                set_flags: field(word, 29, 1) == 1,
                rd: rd(word),
                rn: rn(word),
                rm: rm(word),
                shift: ShiftKind::Lsl,
                amount: 0,
            }
        }
        0b010 => {
            // Conditional compare (register or immediate).
            if field(word, 29, 1) != 1 || field(word, 10, 1) != 0 || field(word, 4, 1) != 0 {
                return Instruction::Unknown { word };
            }
            let op2 = if field(word, 11, 1) == 1 {
                CcmpOperand::Imm(rm(word))
            } else {
                CcmpOperand::Reg(rm(word))
            };
            Instruction::CondCmp {
                is_cmp: field(word, 30, 1) == 1,
                is64: sf,
                rn: rn(word),
                op2,
                nzcv: field(word, 0, 4) as u8,
                cond: Cond::from_bits(field(word, 12, 4) as u8),
            }
        }
        0b100 => {
            // Conditional select.
            if field(word, 29, 1) != 0 {
                return Instruction::Unknown { word };
            }
            let op = match (field(word, 30, 1), field(word, 10, 2)) {
                (0, 0b00) => CselOp::Csel,
                (0, 0b01) => CselOp::Csinc,
                (1, 0b00) => CselOp::Csinv,
                (1, 0b01) => CselOp::Csneg,
                _ => return Instruction::Unknown { word },
            };
            Instruction::CondSel {
                op,
                is64: sf,
                rd: rd(word),
                rn: rn(word),
                rm: rm(word),
                cond: Cond::from_bits(field(word, 12, 4) as u8),
            }
        }
        0b110 => {
            if field(word, 30, 1) == 1 {
                // Data-processing, 1-source.
                if field(word, 16, 5) != 0 || field(word, 29, 1) != 0 {
                    return Instruction::Unknown { word };
                }
                let op = match field(word, 10, 6) {
                    0b000000 => AluOp::Rbit,
                    0b000001 => AluOp::Rev16,
                    0b000010 => AluOp::Rev32,
                    0b000011 if sf => AluOp::Rev64,
                    0b000100 => AluOp::Clz,
                    0b000101 => AluOp::Cls,
                    _ => return Instruction::Unknown { word },
                };
                Instruction::AluReg {
                    op,
                    is64: sf,
                    set_flags: false,
                    rd: rd(word),
                    rn: rn(word),
                    rm: 0,
                    shift: ShiftKind::Lsl,
                    amount: 0,
                }
            } else {
                // Data-processing, 2-source.
                if field(word, 29, 1) != 0 {
                    return Instruction::Unknown { word };
                }
                let op = match field(word, 10, 6) {
                    0b000010 => AluOp::Udiv,
                    0b000011 => AluOp::Sdiv,
                    0b001000 => AluOp::Lslv,
                    0b001001 => AluOp::Lsrv,
                    0b001010 => AluOp::Asrv,
                    0b001011 => AluOp::Rorv,
                    _ => return Instruction::Unknown { word },
                };
                Instruction::AluReg {
                    op,
                    is64: sf,
                    set_flags: false,
                    rd: rd(word),
                    rn: rn(word),
                    rm: rm(word),
                    shift: ShiftKind::Lsl,
                    amount: 0,
                }
            }
        }
        _ => Instruction::Unknown { word },
    }
}

fn decode_shift(bits: u32) -> ShiftKind {
    match bits {
        0b00 => ShiftKind::Lsl,
        0b01 => ShiftKind::Lsr,
        0b10 => ShiftKind::Asr,
        _ => ShiftKind::Ror,
    }
}

/// SIMD: only the three-same integer forms the model needs.
fn decode_simd(word: u32) -> Instruction {
    if (word & SIMD_THREE_SAME_MASK) != SIMD_THREE_SAME_BITS {
        return Instruction::Unknown { word };
    }
    let q = field(word, 30, 1) == 1;
    let u = field(word, 29, 1) == 1;
    let size = field(word, 22, 2);
    let opcode = field(word, 11, 5);

    match opcode {
        0b10000 => {
            let arr = match (size, q) {
                (0b00, false) => VecArrangement::B8,
                (0b00, true) => VecArrangement::B16,
                (0b01, false) => VecArrangement::H4,
                (0b01, true) => VecArrangement::H8,
                (0b10, false) => VecArrangement::S2,
                (0b10, true) => VecArrangement::S4,
                (0b11, true) => VecArrangement::D2,
                _ => return Instruction::Unknown { word },
            };
            Instruction::VecAlu {
                op: if u { VecAluOp::Sub } else { VecAluOp::Add },
                arr,
                rd: rd(word),
                rn: rn(word),
                rm: rm(word),
            }
        }
        0b00011 => {
            let op = match (u, size) {
                (false, 0b00) => VecAluOp::And,
                (false, 0b01) => VecAluOp::Bic,
                (false, 0b10) => VecAluOp::Orr,
                (false, 0b11) => VecAluOp::Orn,
                (true, 0b00) => VecAluOp::Eor,
                _ => return Instruction::Unknown { word },
            };
            Instruction::VecAlu {
                op,
                arr: if q {
                    VecArrangement::B16
                } else {
                    VecArrangement::B8
                },
                rd: rd(word),
                rn: rn(word),
                rm: rm(word),
            }
        }
        _ => Instruction::Unknown { word },
    }
}
