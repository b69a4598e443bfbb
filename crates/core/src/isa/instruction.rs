//! Typed A64 instruction model.
//!
//! [`Instruction`] is a sum type over instruction kinds; each variant carries
//! only its own fields, with immediates already expanded (logical immediates
//! via replicate-rotate, branch offsets pre-scaled to byte offsets).
//!
//! The introspection methods at the bottom (`sources`, `dests`, `class`,
//! flag usage) serve the pipeline's hazard detection; the execution units
//! consume the variants directly.

use crate::isa::abi::{self, REG_LR, REG_ZR};
use crate::isa::cond::Cond;

/// Register-id base for the vector file.
///
/// Vector register `Vn` appears in hazard bookkeeping as `VREG_BASE + n`,
/// keeping one flat id space for dependence checks.
pub const VREG_BASE: u8 = 64;

/// Integer ALU operation selector.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AluOp {
    /// Addition (also ADC when flags carry in).
    Add,
    /// Subtraction.
    Sub,
    /// Add with carry.
    Adc,
    /// Subtract with carry (borrow).
    Sbc,
    /// Bitwise AND.
    And,
    /// Bitwise AND NOT.
    Bic,
    /// Bitwise OR.
    Orr,
    /// Bitwise OR NOT.
    Orn,
    /// Bitwise exclusive OR.
    Eor,
    /// Bitwise exclusive OR NOT.
    Eon,
    /// Variable logical shift left.
    Lslv,
    /// Variable logical shift right.
    Lsrv,
    /// Variable arithmetic shift right.
    Asrv,
    /// Variable rotate right.
    Rorv,
    /// Unsigned division.
    Udiv,
    /// Signed division.
    Sdiv,
    /// Count leading zeros.
    Clz,
    /// Count leading sign bits.
    Cls,
    /// Reverse bit order.
    Rbit,
    /// Byte-reverse each halfword.
    Rev16,
    /// Byte-reverse each word.
    Rev32,
    /// Byte-reverse the doubleword.
    Rev64,
}

/// Shift applied to the second operand of a shifted-register ALU form.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShiftKind {
    /// Logical shift left.
    Lsl,
    /// Logical shift right.
    Lsr,
    /// Arithmetic shift right.
    Asr,
    /// Rotate right.
    Ror,
}

/// Register extension applied in extended-register and register-offset forms.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Extend {
    /// Unsigned byte.
    Uxtb,
    /// Unsigned halfword.
    Uxth,
    /// Unsigned word.
    Uxtw,
    /// Unsigned doubleword (identity / LSL).
    Uxtx,
    /// Signed byte.
    Sxtb,
    /// Signed halfword.
    Sxth,
    /// Signed word.
    Sxtw,
    /// Signed doubleword (identity).
    Sxtx,
}

/// Move-wide operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveOp {
    /// Move inverted shifted immediate.
    Movn,
    /// Move shifted immediate, clearing other bits.
    Movz,
    /// Insert immediate, keeping other bits.
    Movk,
}

/// Bitfield-move operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BitfieldOp {
    /// Signed bitfield move.
    Sbfm,
    /// Bitfield move (insert into destination).
    Bfm,
    /// Unsigned bitfield move.
    Ubfm,
}

/// Conditional-select operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CselOp {
    /// Select Rn or Rm.
    Csel,
    /// Select Rn or Rm + 1.
    Csinc,
    /// Select Rn or NOT(Rm).
    Csinv,
    /// Select Rn or -Rm.
    Csneg,
}

/// Second operand of a conditional-compare instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CcmpOperand {
    /// Register operand.
    Reg(u8),
    /// 5-bit unsigned immediate.
    Imm(u8),
}

/// Three-source data-processing operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dp3Op {
    /// Multiply-add.
    Madd,
    /// Multiply-subtract.
    Msub,
    /// Signed multiply-add long.
    Smaddl,
    /// Signed multiply-subtract long.
    Smsubl,
    /// Unsigned multiply-add long.
    Umaddl,
    /// Unsigned multiply-subtract long.
    Umsubl,
    /// Signed multiply high.
    Smulh,
    /// Unsigned multiply high.
    Umulh,
}

/// Register-indirect branch operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BranchRegOp {
    /// Branch to register.
    Br,
    /// Branch with link to register.
    Blr,
    /// Return (reads the given register, normally X30).
    Ret,
}

/// Base-register update behaviour of a load/store addressing mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IndexMode {
    /// Plain offset addressing, no base update.
    Offset,
    /// Base is updated before the access.
    Pre,
    /// Base is updated after the access.
    Post,
}

/// Load/store address offset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemOffset {
    /// Immediate offset (already scaled where the encoding scales it).
    Imm {
        /// Byte offset from the base register.
        value: i64,
        /// Base-update behaviour.
        mode: IndexMode,
    },
    /// Register offset with extension and optional shift by log2(size).
    Reg {
        /// Offset register.
        rm: u8,
        /// Extension applied to the offset register.
        extend: Extend,
        /// Left shift amount applied after extension.
        shift: u8,
    },
}

/// System-class operation (hints and system-register moves).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SysOp {
    /// No operation (all allocated hints decode here).
    Nop,
    /// Read a system register (returns 0 in this model).
    Mrs {
        /// Destination register.
        rt: u8,
        /// Encoded system-register specifier.
        reg: u16,
    },
    /// Write a system register (ignored in this model).
    Msr {
        /// Source register.
        rt: u8,
        /// Encoded system-register specifier.
        reg: u16,
    },
}

/// Vector arrangement: lane count and element width.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VecArrangement {
    /// 8 lanes of 8 bits.
    B8,
    /// 16 lanes of 8 bits.
    B16,
    /// 4 lanes of 16 bits.
    H4,
    /// 8 lanes of 16 bits.
    H8,
    /// 2 lanes of 32 bits.
    S2,
    /// 4 lanes of 32 bits.
    S4,
    /// 2 lanes of 64 bits.
    D2,
}

impl VecArrangement {
    /// Lane count and element width in bits.
    pub fn lanes(self) -> (u32, u32) {
        match self {
            Self::B8 => (8, 8),
            Self::B16 => (16, 8),
            Self::H4 => (4, 16),
            Self::H8 => (8, 16),
            Self::S2 => (2, 32),
            Self::S4 => (4, 32),
            Self::D2 => (2, 64),
        }
    }

    /// Total vector width in bytes (8 or 16).
    pub fn bytes(self) -> u32 {
        let (lanes, width) = self.lanes();
        lanes * width / 8
    }
}

/// Lane-wise vector ALU operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VecAluOp {
    /// Lane-wise addition.
    Add,
    /// Lane-wise subtraction.
    Sub,
    /// Bitwise AND.
    And,
    /// Bitwise AND NOT.
    Bic,
    /// Bitwise OR.
    Orr,
    /// Bitwise OR NOT.
    Orn,
    /// Bitwise exclusive OR.
    Eor,
}

/// Coarse instruction class used for issue-port budgeting and statistics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InstClass {
    /// Integer or vector data processing (consumes an ALU port).
    Alu,
    /// Load or store (consumes the memory port).
    Mem,
    /// Control transfer.
    Branch,
    /// SVC, hints, system-register moves.
    System,
}

/// A decoded A64 instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Instruction {
    /// Add/subtract or logical operation with an immediate operand.
    ///
    /// Add/sub immediates are pre-shifted; logical immediates are already
    /// expanded via replicate-rotate.
    AluImm {
        /// Operation (Add, Sub, And, Orr, Eor).
        op: AluOp,
        /// 64-bit operand width.
        is64: bool,
        /// Update NZCV.
        set_flags: bool,
        /// Destination register.
        rd: u8,
        /// Source register.
        rn: u8,
        /// Fully expanded immediate operand.
        imm: u64,
    },

    /// Data-processing operation between registers (shifted-register form,
    /// variable shifts, division, and the one-source bit operations).
    AluReg {
        /// Operation.
        op: AluOp,
        /// 64-bit operand width.
        is64: bool,
        /// Update NZCV.
        set_flags: bool,
        /// Destination register.
        rd: u8,
        /// First source register.
        rn: u8,
        /// Second source register (ignored by one-source operations).
        rm: u8,
        /// Shift applied to Rm.
        shift: ShiftKind,
        /// Shift amount.
        amount: u8,
    },

    /// Add/subtract with an extended register operand (SP-capable form).
    AluExt {
        /// Operation (Add or Sub).
        op: AluOp,
        /// 64-bit operand width.
        is64: bool,
        /// Update NZCV.
        set_flags: bool,
        /// Destination register (SP when 31 and not setting flags).
        rd: u8,
        /// First source register (SP when 31).
        rn: u8,
        /// Second source register.
        rm: u8,
        /// Extension applied to Rm.
        extend: Extend,
        /// Left shift (0..=4) applied after extension.
        shift: u8,
    },

    /// MOVN/MOVZ/MOVK.
    MoveWide {
        /// Operation.
        op: MoveOp,
        /// 64-bit operand width.
        is64: bool,
        /// Destination register.
        rd: u8,
        /// 16-bit immediate.
        imm16: u16,
        /// Half-word slot (shift = hw * 16).
        hw: u8,
    },

    /// ADR/ADRP.
    PcRel {
        /// True for ADRP (page-granular).
        page: bool,
        /// Destination register.
        rd: u8,
        /// Signed immediate (bytes for ADR, pages for ADRP).
        imm: i64,
    },

    /// SBFM/BFM/UBFM.
    Bitfield {
        /// Operation.
        op: BitfieldOp,
        /// 64-bit operand width.
        is64: bool,
        /// Destination register.
        rd: u8,
        /// Source register.
        rn: u8,
        /// Rotation amount.
        immr: u8,
        /// Source width specifier.
        imms: u8,
    },

    /// EXTR (and its ROR-immediate alias).
    Extract {
        /// 64-bit operand width.
        is64: bool,
        /// Destination register.
        rd: u8,
        /// High-part source register.
        rn: u8,
        /// Low-part source register.
        rm: u8,
        /// Extraction bit position.
        lsb: u8,
    },

    /// CSEL/CSINC/CSINV/CSNEG.
    CondSel {
        /// Operation.
        op: CselOp,
        /// 64-bit operand width.
        is64: bool,
        /// Destination register.
        rd: u8,
        /// Taken-path source register.
        rn: u8,
        /// Else-path source register.
        rm: u8,
        /// Condition.
        cond: Cond,
    },

    /// CCMP/CCMN.
    CondCmp {
        /// True for CCMP (subtract compare), false for CCMN (add compare).
        is_cmp: bool,
        /// 64-bit operand width.
        is64: bool,
        /// First operand register.
        rn: u8,
        /// Second operand.
        op2: CcmpOperand,
        /// Flags installed when the condition fails (packed NZCV).
        nzcv: u8,
        /// Condition.
        cond: Cond,
    },

    /// MADD/MSUB and the widening/high multiplies.
    DataProc3 {
        /// Operation.
        op: Dp3Op,
        /// 64-bit operand width.
        is64: bool,
        /// Destination register.
        rd: u8,
        /// Multiplicand register.
        rn: u8,
        /// Multiplier register.
        rm: u8,
        /// Addend register.
        ra: u8,
    },

    /// Single-register load or store (integer or vector).
    Mem {
        /// True for loads.
        load: bool,
        /// Access size in bytes (1, 2, 4, 8; vectors also 16).
        size: u8,
        /// Sign-extend the loaded value.
        signed: bool,
        /// Sign-extended loads target a 64-bit destination.
        dest64: bool,
        /// True when Rt names a vector register.
        vector: bool,
        /// Data register.
        rt: u8,
        /// Base register (SP when 31).
        rn: u8,
        /// Addressing mode.
        offset: MemOffset,
    },

    /// Load/store pair of integer registers.
    MemPair {
        /// True for LDP.
        load: bool,
        /// Per-register access size in bytes (4 or 8).
        size: u8,
        /// First data register.
        rt: u8,
        /// Second data register.
        rt2: u8,
        /// Base register (SP when 31).
        rn: u8,
        /// Scaled byte offset.
        imm: i64,
        /// Base-update behaviour.
        mode: IndexMode,
    },

    /// PC-relative load (LDR literal / LDRSW literal).
    MemLit {
        /// Access size in bytes (4 or 8).
        size: u8,
        /// Sign-extend a 32-bit load to 64 bits (LDRSW).
        signed: bool,
        /// Destination register.
        rt: u8,
        /// Byte offset from the instruction address.
        offset: i64,
    },

    /// Direct branch (B/BL). Offset is a byte offset from this instruction.
    Branch {
        /// Signed byte offset.
        offset: i64,
        /// Write the return address to X30.
        link: bool,
    },

    /// Conditional branch (B.cond).
    BranchCond {
        /// Condition.
        cond: Cond,
        /// Signed byte offset.
        offset: i64,
    },

    /// Register-indirect branch (BR/BLR/RET).
    BranchReg {
        /// Operation.
        op: BranchRegOp,
        /// Target register.
        rn: u8,
    },

    /// CBZ/CBNZ.
    CompareBranch {
        /// 64-bit comparison width.
        is64: bool,
        /// True for CBNZ.
        nonzero: bool,
        /// Tested register.
        rt: u8,
        /// Signed byte offset.
        offset: i64,
    },

    /// TBZ/TBNZ.
    TestBranch {
        /// True for TBNZ.
        nonzero: bool,
        /// Tested register.
        rt: u8,
        /// Bit position (0..=63).
        bit: u8,
        /// Signed byte offset.
        offset: i64,
    },

    /// Supervisor call.
    Svc {
        /// 16-bit immediate (0 for the Linux ABI).
        imm: u16,
    },

    /// Hints and system-register moves.
    Sys(SysOp),

    /// Lane-wise vector ALU operation.
    VecAlu {
        /// Operation.
        op: VecAluOp,
        /// Arrangement.
        arr: VecArrangement,
        /// Destination vector register.
        rd: u8,
        /// First source vector register.
        rn: u8,
        /// Second source vector register.
        rm: u8,
    },

    /// Unrecognized encoding; treated as a fatal decode error by the engines.
    Unknown {
        /// Raw instruction word.
        word: u32,
    },
}

impl Instruction {
    /// Coarse class for issue budgeting and statistics.
    pub fn class(&self) -> InstClass {
        match self {
            Self::Mem { .. } | Self::MemPair { .. } | Self::MemLit { .. } => InstClass::Mem,
            Self::Branch { .. }
            | Self::BranchCond { .. }
            | Self::BranchReg { .. }
            | Self::CompareBranch { .. }
            | Self::TestBranch { .. } => InstClass::Branch,
            Self::Svc { .. } | Self::Sys(_) | Self::Unknown { .. } => InstClass::System,
            _ => InstClass::Alu,
        }
    }

    /// True for loads (integer, pair, literal, or vector).
    pub fn is_load(&self) -> bool {
        matches!(
            self,
            Self::Mem { load: true, .. } | Self::MemPair { load: true, .. } | Self::MemLit { .. }
        )
    }

    /// True when this instruction completes in a single execute cycle and
    /// may feed a same-packet consumer through the forwarding network.
    pub fn single_cycle(&self) -> bool {
        match self {
            Self::AluReg { op, .. } => !matches!(op, AluOp::Udiv | AluOp::Sdiv),
            Self::Mem { .. } | Self::MemPair { .. } | Self::MemLit { .. } => false,
            Self::Svc { .. } | Self::Unknown { .. } => false,
            _ => true,
        }
    }

    /// True for a compare: flag-setting subtract discarding its result.
    pub fn is_cmp(&self) -> bool {
        matches!(
            self,
            Self::AluImm {
                op: AluOp::Sub,
                set_flags: true,
                rd: REG_ZR,
                ..
            } | Self::AluReg {
                op: AluOp::Sub,
                set_flags: true,
                rd: REG_ZR,
                ..
            }
        )
    }

    /// True when execution updates NZCV.
    pub fn writes_flags(&self) -> bool {
        match self {
            Self::AluImm { set_flags, .. }
            | Self::AluReg { set_flags, .. }
            | Self::AluExt { set_flags, .. } => *set_flags,
            Self::CondCmp { .. } => true,
            _ => false,
        }
    }

    /// True when execution reads NZCV.
    pub fn reads_flags(&self) -> bool {
        match self {
            Self::BranchCond { .. } | Self::CondSel { .. } | Self::CondCmp { .. } => true,
            Self::AluReg { op, .. } => matches!(op, AluOp::Adc | AluOp::Sbc),
            _ => false,
        }
    }

    /// Source register ids read by this instruction.
    ///
    /// The zero register never appears (it carries no dependence); index 31
    /// is resolved to [`abi::REG_SP`] in SP contexts, and vector registers
    /// appear offset by [`VREG_BASE`].
    pub fn sources(&self) -> Vec<u8> {
        fn push(out: &mut Vec<u8>, id: u8) {
            if id != REG_ZR {
                out.push(id);
            }
        }
        let mut out = Vec::new();
        match *self {
            Self::AluImm { op, rn, .. } => match op {
                // Add/sub immediate is address arithmetic: Rn=31 names SP.
                AluOp::Add | AluOp::Sub => push(&mut out, abi::base_reg(rn)),
                _ => push(&mut out, rn),
            },
            Self::AluReg { op, rn, rm, .. } => {
                match op {
                    AluOp::Clz | AluOp::Cls | AluOp::Rbit | AluOp::Rev16 | AluOp::Rev32
                    | AluOp::Rev64 => push(&mut out, rn),
                    _ => {
                        push(&mut out, rn);
                        push(&mut out, rm);
                    }
                }
            }
            Self::AluExt { rn, rm, .. } => {
                push(&mut out, abi::base_reg(rn));
                push(&mut out, rm);
            }
            Self::MoveWide { op, rd, .. } => {
                if op == MoveOp::Movk {
                    push(&mut out, rd);
                }
            }
            Self::PcRel { .. } => {}
            Self::Bitfield { op, rn, rd, .. } => {
                push(&mut out, rn);
                if op == BitfieldOp::Bfm {
                    push(&mut out, rd);
                }
            }
            Self::Extract { rn, rm, .. } => {
                push(&mut out, rn);
                push(&mut out, rm);
            }
            Self::CondSel { rn, rm, .. } => {
                push(&mut out, rn);
                push(&mut out, rm);
            }
            Self::CondCmp { rn, op2, .. } => {
                push(&mut out, rn);
                if let CcmpOperand::Reg(rm) = op2 {
                    push(&mut out, rm);
                }
            }
            Self::DataProc3 { rn, rm, ra, .. } => {
                push(&mut out, rn);
                push(&mut out, rm);
                push(&mut out, ra);
            }
            Self::Mem {
                load,
                vector,
                rt,
                rn,
                offset,
                ..
            } => {
                push(&mut out, abi::base_reg(rn));
                if let MemOffset::Reg { rm, .. } = offset {
                    push(&mut out, rm);
                }
                if !load {
                    if vector {
                        out.push(VREG_BASE + rt);
                    } else {
                        push(&mut out, rt);
                    }
                }
            }
            Self::MemPair {
                load, rt, rt2, rn, ..
            } => {
                push(&mut out, abi::base_reg(rn));
                if !load {
                    push(&mut out, rt);
                    push(&mut out, rt2);
                }
            }
            Self::MemLit { .. } => {}
            Self::Branch { .. } | Self::BranchCond { .. } => {}
            Self::BranchReg { rn, .. } => push(&mut out, rn),
            Self::CompareBranch { rt, .. } => push(&mut out, rt),
            Self::TestBranch { rt, .. } => push(&mut out, rt),
            Self::Svc { .. } | Self::Sys(_) | Self::Unknown { .. } => {}
            Self::VecAlu { rn, rm, .. } => {
                out.push(VREG_BASE + rn);
                out.push(VREG_BASE + rm);
            }
        }
        out
    }

    /// Destination register ids written by this instruction.
    ///
    /// Follows the same id conventions as [`Instruction::sources`].
    pub fn dests(&self) -> Vec<u8> {
        fn push(out: &mut Vec<u8>, id: u8) {
            if id != REG_ZR {
                out.push(id);
            }
        }
        let mut out = Vec::new();
        match *self {
            Self::AluImm {
                op, set_flags, rd, ..
            } => {
                // Non-flag-setting immediate forms write SP when Rd=31.
                if set_flags {
                    push(&mut out, rd);
                } else {
                    match op {
                        AluOp::Add | AluOp::Sub | AluOp::And | AluOp::Orr | AluOp::Eor => {
                            push(&mut out, abi::base_reg(rd));
                        }
                        _ => push(&mut out, rd),
                    }
                }
            }
            Self::AluReg { rd, .. } => push(&mut out, rd),
            Self::AluExt { set_flags, rd, .. } => {
                if set_flags {
                    push(&mut out, rd);
                } else {
                    push(&mut out, abi::base_reg(rd));
                }
            }
            Self::MoveWide { rd, .. }
            | Self::PcRel { rd, .. }
            | Self::Bitfield { rd, .. }
            | Self::Extract { rd, .. }
            | Self::CondSel { rd, .. }
            | Self::DataProc3 { rd, .. } => push(&mut out, rd),
            Self::CondCmp { .. } => {}
            Self::Mem {
                load,
                vector,
                rt,
                rn,
                offset,
                ..
            } => {
                if load {
                    if vector {
                        out.push(VREG_BASE + rt);
                    } else {
                        push(&mut out, rt);
                    }
                }
                if let MemOffset::Imm { mode, .. } = offset {
                    if mode != IndexMode::Offset {
                        push(&mut out, abi::base_reg(rn));
                    }
                }
            }
            Self::MemPair {
                load,
                rt,
                rt2,
                rn,
                mode,
                ..
            } => {
                if load {
                    push(&mut out, rt);
                    push(&mut out, rt2);
                }
                if mode != IndexMode::Offset {
                    push(&mut out, abi::base_reg(rn));
                }
            }
            Self::MemLit { rt, .. } => push(&mut out, rt),
            Self::Branch { link: true, .. } => push(&mut out, REG_LR),
            Self::BranchReg {
                op: BranchRegOp::Blr,
                ..
            } => push(&mut out, REG_LR),
            Self::Sys(SysOp::Mrs { rt, .. }) => push(&mut out, rt),
            Self::VecAlu { rd, .. } => out.push(VREG_BASE + rd),
            _ => {}
        }
        out
    }
}
