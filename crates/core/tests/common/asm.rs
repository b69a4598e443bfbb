//! Test-side A64 instruction builder.
//!
//! Hand-assembles the encodings the test programs need. Offsets for branch
//! builders are in instruction words (as written in assembly), not bytes.
//! Where a builder exists, `decode(builder(..))` must reproduce the operand
//! fields bit-for-bit; the decoder tests rely on that round trip.

/// Condition code encodings.
pub mod cond {
    pub const EQ: u32 = 0b0000;
    pub const NE: u32 = 0b0001;
    pub const GE: u32 = 0b1010;
    pub const LT: u32 = 0b1011;
    pub const GT: u32 = 0b1100;
    pub const LE: u32 = 0b1101;
}

fn sf(is64: bool) -> u32 {
    u32::from(is64) << 31
}

// ── Move wide ─────────────────────────────────────────────

pub fn movz(is64: bool, rd: u32, imm16: u32, hw: u32) -> u32 {
    0x5280_0000 | sf(is64) | (hw << 21) | (imm16 << 5) | rd
}

pub fn movn(is64: bool, rd: u32, imm16: u32, hw: u32) -> u32 {
    0x1280_0000 | sf(is64) | (hw << 21) | (imm16 << 5) | rd
}

pub fn movk(is64: bool, rd: u32, imm16: u32, hw: u32) -> u32 {
    0x7280_0000 | sf(is64) | (hw << 21) | (imm16 << 5) | rd
}

// ── Add/subtract immediate ────────────────────────────────

pub fn add_imm(is64: bool, rd: u32, rn: u32, imm12: u32) -> u32 {
    0x1100_0000 | sf(is64) | (imm12 << 10) | (rn << 5) | rd
}

pub fn adds_imm(is64: bool, rd: u32, rn: u32, imm12: u32) -> u32 {
    0x3100_0000 | sf(is64) | (imm12 << 10) | (rn << 5) | rd
}

pub fn sub_imm(is64: bool, rd: u32, rn: u32, imm12: u32) -> u32 {
    0x5100_0000 | sf(is64) | (imm12 << 10) | (rn << 5) | rd
}

pub fn subs_imm(is64: bool, rd: u32, rn: u32, imm12: u32) -> u32 {
    0x7100_0000 | sf(is64) | (imm12 << 10) | (rn << 5) | rd
}

/// CMP (immediate): SUBS with the result discarded.
pub fn cmp_imm(is64: bool, rn: u32, imm12: u32) -> u32 {
    subs_imm(is64, 31, rn, imm12)
}

// ── Add/subtract shifted register ─────────────────────────

pub fn add_reg(is64: bool, rd: u32, rn: u32, rm: u32) -> u32 {
    0x0B00_0000 | sf(is64) | (rm << 16) | (rn << 5) | rd
}

pub fn adds_reg(is64: bool, rd: u32, rn: u32, rm: u32) -> u32 {
    0x2B00_0000 | sf(is64) | (rm << 16) | (rn << 5) | rd
}

pub fn sub_reg(is64: bool, rd: u32, rn: u32, rm: u32) -> u32 {
    0x4B00_0000 | sf(is64) | (rm << 16) | (rn << 5) | rd
}

pub fn subs_reg(is64: bool, rd: u32, rn: u32, rm: u32) -> u32 {
    0x6B00_0000 | sf(is64) | (rm << 16) | (rn << 5) | rd
}

/// CMP (register).
pub fn cmp_reg(is64: bool, rn: u32, rm: u32) -> u32 {
    subs_reg(is64, 31, rn, rm)
}

// ── Logical shifted register ──────────────────────────────

pub fn and_reg(is64: bool, rd: u32, rn: u32, rm: u32) -> u32 {
    0x0A00_0000 | sf(is64) | (rm << 16) | (rn << 5) | rd
}

pub fn orr_reg(is64: bool, rd: u32, rn: u32, rm: u32) -> u32 {
    0x2A00_0000 | sf(is64) | (rm << 16) | (rn << 5) | rd
}

pub fn eor_reg(is64: bool, rd: u32, rn: u32, rm: u32) -> u32 {
    0x4A00_0000 | sf(is64) | (rm << 16) | (rn << 5) | rd
}

pub fn ands_reg(is64: bool, rd: u32, rn: u32, rm: u32) -> u32 {
    0x6A00_0000 | sf(is64) | (rm << 16) | (rn << 5) | rd
}

/// MOV (register): ORR Rd, ZR, Rm.
pub fn mov_reg(is64: bool, rd: u32, rm: u32) -> u32 {
    orr_reg(is64, rd, 31, rm)
}

// ── Logical immediate ─────────────────────────────────────

pub fn and_imm(is64: bool, rd: u32, rn: u32, n: u32, immr: u32, imms: u32) -> u32 {
    0x1200_0000 | sf(is64) | (n << 22) | (immr << 16) | (imms << 10) | (rn << 5) | rd
}

pub fn orr_imm(is64: bool, rd: u32, rn: u32, n: u32, immr: u32, imms: u32) -> u32 {
    0x3200_0000 | sf(is64) | (n << 22) | (immr << 16) | (imms << 10) | (rn << 5) | rd
}

// ── Bitfield / extract ────────────────────────────────────

pub fn ubfm(is64: bool, rd: u32, rn: u32, immr: u32, imms: u32) -> u32 {
    let n = u32::from(is64) << 22;
    0x5300_0000 | sf(is64) | n | (immr << 16) | (imms << 10) | (rn << 5) | rd
}

pub fn sbfm(is64: bool, rd: u32, rn: u32, immr: u32, imms: u32) -> u32 {
    let n = u32::from(is64) << 22;
    0x1300_0000 | sf(is64) | n | (immr << 16) | (imms << 10) | (rn << 5) | rd
}

/// LSL (immediate) alias of UBFM.
pub fn lsl_imm(is64: bool, rd: u32, rn: u32, shift: u32) -> u32 {
    let width = if is64 { 64 } else { 32 };
    ubfm(is64, rd, rn, (width - shift) % width, width - 1 - shift)
}

/// LSR (immediate) alias of UBFM.
pub fn lsr_imm(is64: bool, rd: u32, rn: u32, shift: u32) -> u32 {
    let width: u32 = if is64 { 64 } else { 32 };
    ubfm(is64, rd, rn, shift, width - 1)
}

/// UBFX alias of UBFM.
pub fn ubfx(is64: bool, rd: u32, rn: u32, lsb: u32, width: u32) -> u32 {
    ubfm(is64, rd, rn, lsb, lsb + width - 1)
}

/// SBFX alias of SBFM.
pub fn sbfx(is64: bool, rd: u32, rn: u32, lsb: u32, width: u32) -> u32 {
    sbfm(is64, rd, rn, lsb, lsb + width - 1)
}

pub fn extr(is64: bool, rd: u32, rn: u32, rm: u32, lsb: u32) -> u32 {
    let n = u32::from(is64) << 22;
    0x1380_0000 | sf(is64) | n | (rm << 16) | (lsb << 10) | (rn << 5) | rd
}

// ── Three-source and two-source data processing ───────────

pub fn madd(is64: bool, rd: u32, rn: u32, rm: u32, ra: u32) -> u32 {
    0x1B00_0000 | sf(is64) | (rm << 16) | (ra << 10) | (rn << 5) | rd
}

pub fn msub(is64: bool, rd: u32, rn: u32, rm: u32, ra: u32) -> u32 {
    0x1B00_8000 | sf(is64) | (rm << 16) | (ra << 10) | (rn << 5) | rd
}

/// MUL alias of MADD with XZR addend.
pub fn mul(is64: bool, rd: u32, rn: u32, rm: u32) -> u32 {
    madd(is64, rd, rn, rm, 31)
}

pub fn udiv(is64: bool, rd: u32, rn: u32, rm: u32) -> u32 {
    0x1AC0_0800 | sf(is64) | (rm << 16) | (rn << 5) | rd
}

pub fn sdiv(is64: bool, rd: u32, rn: u32, rm: u32) -> u32 {
    0x1AC0_0C00 | sf(is64) | (rm << 16) | (rn << 5) | rd
}

pub fn lslv(is64: bool, rd: u32, rn: u32, rm: u32) -> u32 {
    0x1AC0_2000 | sf(is64) | (rm << 16) | (rn << 5) | rd
}

// ── Conditional select / compare ──────────────────────────

pub fn csel(is64: bool, rd: u32, rn: u32, rm: u32, cond: u32) -> u32 {
    0x1A80_0000 | sf(is64) | (rm << 16) | (cond << 12) | (rn << 5) | rd
}

pub fn csinc(is64: bool, rd: u32, rn: u32, rm: u32, cond: u32) -> u32 {
    0x1A80_0400 | sf(is64) | (rm << 16) | (cond << 12) | (rn << 5) | rd
}

/// CSET alias: CSINC Rd, ZR, ZR, invert(cond).
pub fn cset(is64: bool, rd: u32, cond: u32) -> u32 {
    csinc(is64, rd, 31, 31, cond ^ 1)
}

pub fn ccmp_imm(is64: bool, rn: u32, imm5: u32, nzcv: u32, cond: u32) -> u32 {
    0x7A40_0800 | sf(is64) | (imm5 << 16) | (cond << 12) | (rn << 5) | nzcv
}

// ── PC-relative ───────────────────────────────────────────

pub fn adr(rd: u32, offset: i64) -> u32 {
    let imm = (offset as u64) & 0x1F_FFFF;
    let immlo = (imm & 0x3) as u32;
    let immhi = ((imm >> 2) & 0x7_FFFF) as u32;
    0x1000_0000 | (immlo << 29) | (immhi << 5) | rd
}

// ── Loads and stores ──────────────────────────────────────

/// LDR (unsigned immediate), 64-bit. `imm` is a byte offset, multiple of 8.
pub fn ldr_imm(rt: u32, rn: u32, imm: u32) -> u32 {
    0xF940_0000 | ((imm / 8) << 10) | (rn << 5) | rt
}

/// STR (unsigned immediate), 64-bit.
pub fn str_imm(rt: u32, rn: u32, imm: u32) -> u32 {
    0xF900_0000 | ((imm / 8) << 10) | (rn << 5) | rt
}

/// LDR (unsigned immediate), 32-bit.
pub fn ldr_imm32(rt: u32, rn: u32, imm: u32) -> u32 {
    0xB940_0000 | ((imm / 4) << 10) | (rn << 5) | rt
}

/// STR (unsigned immediate), 32-bit.
pub fn str_imm32(rt: u32, rn: u32, imm: u32) -> u32 {
    0xB900_0000 | ((imm / 4) << 10) | (rn << 5) | rt
}

pub fn ldrb_imm(rt: u32, rn: u32, imm: u32) -> u32 {
    0x3940_0000 | (imm << 10) | (rn << 5) | rt
}

pub fn strb_imm(rt: u32, rn: u32, imm: u32) -> u32 {
    0x3900_0000 | (imm << 10) | (rn << 5) | rt
}

/// LDRSW (unsigned immediate).
pub fn ldrsw_imm(rt: u32, rn: u32, imm: u32) -> u32 {
    0xB980_0000 | ((imm / 4) << 10) | (rn << 5) | rt
}

fn imm9(imm: i32) -> u32 {
    ((imm as u32) & 0x1FF) << 12
}

/// LDR (pre-indexed), 64-bit.
pub fn ldr_pre(rt: u32, rn: u32, imm: i32) -> u32 {
    0xF840_0C00 | imm9(imm) | (rn << 5) | rt
}

/// LDR (post-indexed), 64-bit.
pub fn ldr_post(rt: u32, rn: u32, imm: i32) -> u32 {
    0xF840_0400 | imm9(imm) | (rn << 5) | rt
}

/// STR (pre-indexed), 64-bit.
pub fn str_pre(rt: u32, rn: u32, imm: i32) -> u32 {
    0xF800_0C00 | imm9(imm) | (rn << 5) | rt
}

/// STR (post-indexed), 64-bit.
pub fn str_post(rt: u32, rn: u32, imm: i32) -> u32 {
    0xF800_0400 | imm9(imm) | (rn << 5) | rt
}

/// LDR (register offset, LSL #0), 64-bit.
pub fn ldr_reg(rt: u32, rn: u32, rm: u32) -> u32 {
    0xF860_6800 | (rm << 16) | (rn << 5) | rt
}

/// LDP (signed offset), 64-bit. `imm` is a byte offset, multiple of 8.
pub fn ldp(rt: u32, rt2: u32, rn: u32, imm: i32) -> u32 {
    let imm7 = ((imm / 8) as u32) & 0x7F;
    0xA940_0000 | (imm7 << 15) | (rt2 << 10) | (rn << 5) | rt
}

/// STP (signed offset), 64-bit.
pub fn stp(rt: u32, rt2: u32, rn: u32, imm: i32) -> u32 {
    let imm7 = ((imm / 8) as u32) & 0x7F;
    0xA900_0000 | (imm7 << 15) | (rt2 << 10) | (rn << 5) | rt
}

/// LDR (vector, 128-bit, unsigned immediate).
pub fn ldr_q(rt: u32, rn: u32, imm: u32) -> u32 {
    0x3DC0_0000 | ((imm / 16) << 10) | (rn << 5) | rt
}

/// STR (vector, 128-bit, unsigned immediate).
pub fn str_q(rt: u32, rn: u32, imm: u32) -> u32 {
    0x3D80_0000 | ((imm / 16) << 10) | (rn << 5) | rt
}

// ── Branches ──────────────────────────────────────────────

/// B with a word offset.
pub fn b(offset_words: i32) -> u32 {
    0x1400_0000 | ((offset_words as u32) & 0x03FF_FFFF)
}

/// BL with a word offset.
pub fn bl(offset_words: i32) -> u32 {
    0x9400_0000 | ((offset_words as u32) & 0x03FF_FFFF)
}

/// B.cond with a word offset.
pub fn b_cond(cond: u32, offset_words: i32) -> u32 {
    0x5400_0000 | (((offset_words as u32) & 0x7_FFFF) << 5) | cond
}

pub fn cbz(is64: bool, rt: u32, offset_words: i32) -> u32 {
    0x3400_0000 | sf(is64) | (((offset_words as u32) & 0x7_FFFF) << 5) | rt
}

pub fn cbnz(is64: bool, rt: u32, offset_words: i32) -> u32 {
    0x3500_0000 | sf(is64) | (((offset_words as u32) & 0x7_FFFF) << 5) | rt
}

pub fn tbz(rt: u32, bit: u32, offset_words: i32) -> u32 {
    let b5 = (bit >> 5) << 31;
    let b40 = (bit & 0x1F) << 19;
    0x3600_0000 | b5 | b40 | (((offset_words as u32) & 0x3FFF) << 5) | rt
}

pub fn tbnz(rt: u32, bit: u32, offset_words: i32) -> u32 {
    let b5 = (bit >> 5) << 31;
    let b40 = (bit & 0x1F) << 19;
    0x3700_0000 | b5 | b40 | (((offset_words as u32) & 0x3FFF) << 5) | rt
}

pub fn br(rn: u32) -> u32 {
    0xD61F_0000 | (rn << 5)
}

pub fn blr(rn: u32) -> u32 {
    0xD63F_0000 | (rn << 5)
}

pub fn ret() -> u32 {
    0xD65F_03C0
}

// ── System ────────────────────────────────────────────────

pub fn svc(imm: u32) -> u32 {
    0xD400_0001 | (imm << 5)
}

pub fn nop() -> u32 {
    0xD503_201F
}

// ── Vector ────────────────────────────────────────────────

/// ADD Vd.16B, Vn.16B, Vm.16B.
pub fn vadd_16b(rd: u32, rn: u32, rm: u32) -> u32 {
    0x4E20_8400 | (rm << 16) | (rn << 5) | rd
}

/// ADD Vd.4S, Vn.4S, Vm.4S.
pub fn vadd_4s(rd: u32, rn: u32, rm: u32) -> u32 {
    0x4EA0_8400 | (rm << 16) | (rn << 5) | rd
}

/// SUB Vd.16B, Vn.16B, Vm.16B.
pub fn vsub_16b(rd: u32, rn: u32, rm: u32) -> u32 {
    0x6E20_8400 | (rm << 16) | (rn << 5) | rd
}

/// EOR Vd.16B, Vn.16B, Vm.16B.
pub fn veor_16b(rd: u32, rn: u32, rm: u32) -> u32 {
    0x6E20_1C00 | (rm << 16) | (rn << 5) | rd
}
