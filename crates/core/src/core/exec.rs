//! Shared architectural dataflow.
//!
//! [`compute`] maps a decoded instruction, its PC, the current flags, and
//! resolved operand values to the instruction's architectural effects:
//! register writes, a flag update, a branch outcome, and at most one memory
//! request. The functional emulator applies the effects immediately; the
//! pipeline computes them in EX, performs the memory request in MEM, and
//! commits the writes in WB. Routing both engines through one function is
//! what keeps their retired state identical.
//!
//! SVC and `Unknown` are not handled here; the engines intercept both
//! before calling `compute`.

use crate::core::arch::pstate::Pstate;
use crate::core::units::alu::{arithmetic, bitfield, logic, shifts};
use crate::core::units::{lsu, simd};
use crate::isa::abi::{self, REG_LR};
use crate::isa::instruction::{
    AluOp, BitfieldOp, BranchRegOp, CcmpOperand, CselOp, Dp3Op, Instruction, MemOffset, MoveOp,
    ShiftKind, SysOp,
};

/// Resolved branch decision.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BranchOutcome {
    /// The branch is taken.
    pub taken: bool,
    /// Target address when taken.
    pub target: u64,
}

/// A memory access requested by one instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemRequest {
    /// Integer load of one or two registers.
    Load {
        /// Access address.
        addr: u64,
        /// Per-register size in bytes.
        size: u8,
        /// Sign-extend the loaded value.
        signed: bool,
        /// Destination width for sign extension.
        dest64: bool,
        /// First destination register.
        rt: u8,
        /// Second destination register (load pair).
        rt2: Option<u8>,
    },
    /// Integer store of one or two registers.
    Store {
        /// Access address.
        addr: u64,
        /// Per-register size in bytes.
        size: u8,
        /// First value.
        data: u64,
        /// Second value (store pair).
        data2: Option<u64>,
    },
    /// Vector load.
    VLoad {
        /// Access address.
        addr: u64,
        /// Size in bytes (1..=16).
        size: u8,
        /// Destination vector register.
        rt: u8,
    },
    /// Vector store.
    VStore {
        /// Access address.
        addr: u64,
        /// Size in bytes (1..=16).
        size: u8,
        /// Value to store (low `size` bytes).
        data: u128,
    },
}

impl MemRequest {
    /// Access address.
    pub fn addr(&self) -> u64 {
        match *self {
            Self::Load { addr, .. }
            | Self::Store { addr, .. }
            | Self::VLoad { addr, .. }
            | Self::VStore { addr, .. } => addr,
        }
    }

    /// Total bytes moved.
    pub fn bytes(&self) -> usize {
        match *self {
            Self::Load { size, rt2, .. } => size as usize * if rt2.is_some() { 2 } else { 1 },
            Self::Store { size, data2, .. } => size as usize * if data2.is_some() { 2 } else { 1 },
            Self::VLoad { size, .. } | Self::VStore { size, .. } => size as usize,
        }
    }

    /// True for loads.
    pub fn is_load(&self) -> bool {
        matches!(self, Self::Load { .. } | Self::VLoad { .. })
    }
}

/// Architectural effects of one instruction.
#[derive(Clone, Debug, Default)]
pub struct Computed {
    /// Integer register writes available at execute time.
    pub writes: Vec<(u8, u64)>,
    /// Vector register writes available at execute time.
    pub vwrites: Vec<(u8, u128)>,
    /// Flag update, when the instruction sets NZCV.
    pub nzcv: Option<Pstate>,
    /// Branch decision, for control-transfer instructions.
    pub branch: Option<BranchOutcome>,
    /// Memory request, for loads and stores.
    pub mem: Option<MemRequest>,
}

/// Computes the architectural effects of `inst` at `pc`.
///
/// `read`/`read_v` supply resolved operand values; the pipeline routes them
/// through its forwarding network, the emulator reads the register file
/// directly.
pub fn compute(
    inst: &Instruction,
    pc: u64,
    pstate: Pstate,
    read: &mut dyn FnMut(u8) -> u64,
    read_v: &mut dyn FnMut(u8) -> u128,
) -> Computed {
    let mut out = Computed::default();

    match *inst {
        Instruction::AluImm {
            op,
            is64,
            set_flags,
            rd,
            rn,
            imm,
        } => {
            let (a, dest) = match op {
                // Address arithmetic: Rn/Rd=31 name SP unless setting flags.
                AluOp::Add | AluOp::Sub => (
                    read(abi::base_reg(rn)),
                    if set_flags { rd } else { abi::base_reg(rd) },
                ),
                _ => (
                    read(rn),
                    if set_flags { rd } else { abi::base_reg(rd) },
                ),
            };
            let (value, flags) = match op {
                AluOp::Add => arithmetic::add_with_carry(a, imm, false, is64),
                AluOp::Sub => arithmetic::add_with_carry(a, !imm, true, is64),
                _ => {
                    let v = logic::apply(op, a, imm, is64);
                    (v, logic::flags(v, is64))
                }
            };
            out.writes.push((dest, value));
            if set_flags {
                out.nzcv = Some(flags);
            }
        }

        Instruction::AluReg {
            op,
            is64,
            set_flags,
            rd,
            rn,
            rm,
            shift,
            amount,
        } => {
            let a = read(rn);
            let (value, flags) = match op {
                AluOp::Add | AluOp::Sub | AluOp::And | AluOp::Bic | AluOp::Orr | AluOp::Orn
                | AluOp::Eor | AluOp::Eon => {
                    let b = shifts::shift(read(rm), shift, u32::from(amount), is64);
                    match op {
                        AluOp::Add => arithmetic::add_with_carry(a, b, false, is64),
                        AluOp::Sub => {
                            let nb = if is64 { !b } else { !b & 0xFFFF_FFFF };
                            arithmetic::add_with_carry(a, nb, true, is64)
                        }
                        _ => {
                            let v = logic::apply(op, a, b, is64);
                            (v, logic::flags(v, is64))
                        }
                    }
                }
                AluOp::Adc => arithmetic::add_with_carry(a, read(rm), pstate.c, is64),
                AluOp::Sbc => {
                    let b = read(rm);
                    let nb = if is64 { !b } else { !b & 0xFFFF_FFFF };
                    arithmetic::add_with_carry(a, nb, pstate.c, is64)
                }
                AluOp::Lslv | AluOp::Lsrv | AluOp::Asrv | AluOp::Rorv => {
                    let kind = match op {
                        AluOp::Lslv => ShiftKind::Lsl,
                        AluOp::Lsrv => ShiftKind::Lsr,
                        AluOp::Asrv => ShiftKind::Asr,
                        _ => ShiftKind::Ror,
                    };
                    (shifts::variable(a, kind, read(rm), is64), Pstate::default())
                }
                AluOp::Udiv => (arithmetic::udiv(a, read(rm), is64), Pstate::default()),
                AluOp::Sdiv => (arithmetic::sdiv(a, read(rm), is64), Pstate::default()),
                AluOp::Clz => (arithmetic::clz(a, is64), Pstate::default()),
                AluOp::Cls => (arithmetic::cls(a, is64), Pstate::default()),
                AluOp::Rbit => {
                    let v = if is64 {
                        a.reverse_bits()
                    } else {
                        u64::from((a as u32).reverse_bits())
                    };
                    (v, Pstate::default())
                }
                AluOp::Rev16 => {
                    let mut v = 0u64;
                    let halves = if is64 { 4 } else { 2 };
                    for h in 0..halves {
                        let half = (a >> (16 * h)) as u16;
                        v |= u64::from(half.swap_bytes()) << (16 * h);
                    }
                    (v, Pstate::default())
                }
                AluOp::Rev32 => {
                    if is64 {
                        let lo = (a as u32).swap_bytes();
                        let hi = ((a >> 32) as u32).swap_bytes();
                        ((u64::from(hi) << 32) | u64::from(lo), Pstate::default())
                    } else {
                        (u64::from((a as u32).swap_bytes()), Pstate::default())
                    }
                }
                AluOp::Rev64 => (a.swap_bytes(), Pstate::default()),
            };
            out.writes.push((rd, value));
            if set_flags {
                out.nzcv = Some(flags);
            }
        }

        Instruction::AluExt {
            op,
            is64,
            set_flags,
            rd,
            rn,
            rm,
            extend,
            shift,
        } => {
            let a = read(abi::base_reg(rn));
            let b = lsu::extend_offset(read(rm), extend, shift);
            let b = if is64 { b } else { b & 0xFFFF_FFFF };
            let (value, flags) = if op == AluOp::Add {
                arithmetic::add_with_carry(a, b, false, is64)
            } else {
                let nb = if is64 { !b } else { !b & 0xFFFF_FFFF };
                arithmetic::add_with_carry(a, nb, true, is64)
            };
            let dest = if set_flags { rd } else { abi::base_reg(rd) };
            out.writes.push((dest, value));
            if set_flags {
                out.nzcv = Some(flags);
            }
        }

        Instruction::MoveWide {
            op,
            is64,
            rd,
            imm16,
            hw,
        } => {
            let shift = 16 * u32::from(hw);
            let field = u64::from(imm16) << shift;
            let value = match op {
                MoveOp::Movz => field,
                MoveOp::Movn => {
                    let v = !field;
                    if is64 { v } else { v & 0xFFFF_FFFF }
                }
                MoveOp::Movk => {
                    let old = read(rd);
                    let v = (old & !(0xFFFFu64 << shift)) | field;
                    if is64 { v } else { v & 0xFFFF_FFFF }
                }
            };
            out.writes.push((rd, value));
        }

        Instruction::PcRel { page, rd, imm } => {
            let value = if page {
                (pc & !0xFFF).wrapping_add((imm << 12) as u64)
            } else {
                pc.wrapping_add(imm as u64)
            };
            out.writes.push((rd, value));
        }

        Instruction::Bitfield {
            op,
            is64,
            rd,
            rn,
            immr,
            imms,
        } => {
            let src = read(rn);
            let dst = if op == BitfieldOp::Bfm { read(rd) } else { 0 };
            let value = bitfield::bitfield(op, src, dst, immr, imms, is64);
            out.writes.push((rd, value));
        }

        Instruction::Extract {
            is64,
            rd,
            rn,
            rm,
            lsb,
        } => {
            let value = bitfield::extract(read(rn), read(rm), u32::from(lsb), is64);
            out.writes.push((rd, value));
        }

        Instruction::CondSel {
            op,
            is64,
            rd,
            rn,
            rm,
            cond,
        } => {
            let value = if cond.holds(pstate) {
                read(rn)
            } else {
                let m = read(rm);
                match op {
                    CselOp::Csel => m,
                    CselOp::Csinc => m.wrapping_add(1),
                    CselOp::Csinv => !m,
                    CselOp::Csneg => (!m).wrapping_add(1),
                }
            };
            let value = if is64 { value } else { value & 0xFFFF_FFFF };
            out.writes.push((rd, value));
        }

        Instruction::CondCmp {
            is_cmp,
            is64,
            rn,
            op2,
            nzcv,
            cond,
        } => {
            let flags = if cond.holds(pstate) {
                let a = read(rn);
                let b = match op2 {
                    CcmpOperand::Reg(rm) => read(rm),
                    CcmpOperand::Imm(imm) => u64::from(imm),
                };
                if is_cmp {
                    let nb = if is64 { !b } else { !b & 0xFFFF_FFFF };
                    arithmetic::add_with_carry(a, nb, true, is64).1
                } else {
                    arithmetic::add_with_carry(a, b, false, is64).1
                }
            } else {
                Pstate::from_nzcv(nzcv)
            };
            out.nzcv = Some(flags);
        }

        Instruction::DataProc3 {
            op,
            is64,
            rd,
            rn,
            rm,
            ra,
        } => {
            let n = read(rn);
            let m = read(rm);
            let a = read(ra);
            let value = match op {
                Dp3Op::Madd => arithmetic::madd(n, m, a, false, is64),
                Dp3Op::Msub => arithmetic::madd(n, m, a, true, is64),
                Dp3Op::Smaddl => arithmetic::maddl(n, m, a, false, true),
                Dp3Op::Smsubl => arithmetic::maddl(n, m, a, true, true),
                Dp3Op::Umaddl => arithmetic::maddl(n, m, a, false, false),
                Dp3Op::Umsubl => arithmetic::maddl(n, m, a, true, false),
                Dp3Op::Smulh => arithmetic::mulh(n, m, true),
                Dp3Op::Umulh => arithmetic::mulh(n, m, false),
            };
            out.writes.push((rd, value));
        }

        Instruction::Mem {
            load,
            size,
            signed,
            dest64,
            vector,
            rt,
            rn,
            offset,
        } => {
            let base = read(abi::base_reg(rn));
            let rm_value = match offset {
                MemOffset::Reg { rm, .. } => read(rm),
                MemOffset::Imm { .. } => 0,
            };
            let (addr, writeback) = lsu::address(base, offset, rm_value);
            if let Some(updated) = writeback {
                out.writes.push((abi::base_reg(rn), updated));
            }
            out.mem = Some(if vector {
                if load {
                    MemRequest::VLoad { addr, size, rt }
                } else {
                    MemRequest::VStore {
                        addr,
                        size,
                        data: read_v(rt),
                    }
                }
            } else if load {
                MemRequest::Load {
                    addr,
                    size,
                    signed,
                    dest64,
                    rt,
                    rt2: None,
                }
            } else {
                MemRequest::Store {
                    addr,
                    size,
                    data: read(rt),
                    data2: None,
                }
            });
        }

        Instruction::MemPair {
            load,
            size,
            rt,
            rt2,
            rn,
            imm,
            mode,
        } => {
            let base = read(abi::base_reg(rn));
            let (addr, writeback) = lsu::pair_address(base, imm, mode);
            if let Some(updated) = writeback {
                out.writes.push((abi::base_reg(rn), updated));
            }
            out.mem = Some(if load {
                MemRequest::Load {
                    addr,
                    size,
                    signed: false,
                    dest64: size == 8,
                    rt,
                    rt2: Some(rt2),
                }
            } else {
                MemRequest::Store {
                    addr,
                    size,
                    data: read(rt),
                    data2: Some(read(rt2)),
                }
            });
        }

        Instruction::MemLit {
            size,
            signed,
            rt,
            offset,
        } => {
            out.mem = Some(MemRequest::Load {
                addr: pc.wrapping_add(offset as u64),
                size,
                signed,
                dest64: true,
                rt,
                rt2: None,
            });
        }

        Instruction::Branch { offset, link } => {
            if link {
                out.writes.push((REG_LR, pc.wrapping_add(4)));
            }
            out.branch = Some(BranchOutcome {
                taken: true,
                target: pc.wrapping_add(offset as u64),
            });
        }

        Instruction::BranchCond { cond, offset } => {
            out.branch = Some(BranchOutcome {
                taken: cond.holds(pstate),
                target: pc.wrapping_add(offset as u64),
            });
        }

        Instruction::BranchReg { op, rn } => {
            let target = read(rn);
            if op == BranchRegOp::Blr {
                out.writes.push((REG_LR, pc.wrapping_add(4)));
            }
            out.branch = Some(BranchOutcome {
                taken: true,
                target,
            });
        }

        Instruction::CompareBranch {
            is64,
            nonzero,
            rt,
            offset,
        } => {
            let value = if is64 {
                read(rt)
            } else {
                read(rt) & 0xFFFF_FFFF
            };
            out.branch = Some(BranchOutcome {
                taken: (value == 0) != nonzero,
                target: pc.wrapping_add(offset as u64),
            });
        }

        Instruction::TestBranch {
            nonzero,
            rt,
            bit,
            offset,
        } => {
            let set = (read(rt) >> bit) & 1 == 1;
            out.branch = Some(BranchOutcome {
                taken: set == nonzero,
                target: pc.wrapping_add(offset as u64),
            });
        }

        Instruction::Sys(op) => match op {
            SysOp::Nop | SysOp::Msr { .. } => {}
            // No system registers are modeled; MRS reads as zero.
            SysOp::Mrs { rt, .. } => out.writes.push((rt, 0)),
        },

        Instruction::VecAlu { op, arr, rd, rn, rm } => {
            let value = simd::vec_alu(op, arr, read_v(rn), read_v(rm));
            out.vwrites.push((rd, value));
        }

        Instruction::Svc { .. } | Instruction::Unknown { .. } => {
            debug_assert!(false, "SVC/Unknown must be handled before compute");
        }
    }

    out
}
