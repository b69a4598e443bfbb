//! Bitfield move and extract operations.
//!
//! SBFM/BFM/UBFM are implemented with the architectural wmask/tmask
//! algorithm (shared with the logical-immediate expansion), which makes the
//! aliases (LSL/LSR/ASR immediate, UBFX/SBFX, UXTB/SXTW, ...) fall out of
//! the same three operations.

use crate::isa::bits::{decode_bit_masks, ones, ror};
use crate::isa::instruction::BitfieldOp;

/// Executes a bitfield move.
///
/// `dst` is the previous destination value (only BFM reads it). Reserved
/// immr/imms combinations behave as UNPREDICTABLE in hardware; the decoder
/// never produces them, and this function falls back to returning `src`
/// unchanged if the masks fail to expand.
pub fn bitfield(op: BitfieldOp, src: u64, dst: u64, immr: u8, imms: u8, is64: bool) -> u64 {
    let width: u32 = if is64 { 64 } else { 32 };
    let Some((wmask, tmask)) = decode_bit_masks(
        u32::from(is64),
        u32::from(imms),
        u32::from(immr),
        false,
        is64,
    ) else {
        return src & ones(width);
    };

    let src = src & ones(width);
    let bot = ror(src, u32::from(immr), width) & wmask;

    match op {
        BitfieldOp::Ubfm => bot & tmask,
        BitfieldOp::Sbfm => {
            // Replicate the source bit at position imms above the field.
            let top = if (src >> imms) & 1 == 1 {
                ones(width)
            } else {
                0
            };
            ((top & !tmask) | (bot & tmask)) & ones(width)
        }
        BitfieldOp::Bfm => {
            let dst = dst & ones(width);
            let merged = (dst & !wmask) | bot;
            ((dst & !tmask) | (merged & tmask)) & ones(width)
        }
    }
}

/// EXTR: extracts a register-width field from the concatenation Rn:Rm,
/// starting at `lsb`.
pub fn extract(hi: u64, lo: u64, lsb: u32, is64: bool) -> u64 {
    let width: u32 = if is64 { 64 } else { 32 };
    let hi = hi & ones(width);
    let lo = lo & ones(width);
    if lsb == 0 {
        return lo;
    }
    ((lo >> lsb) | (hi << (width - lsb))) & ones(width)
}
