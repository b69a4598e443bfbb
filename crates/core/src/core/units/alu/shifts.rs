//! Shift operations.
//!
//! `shift` implements the shifted-register operand forms (immediate
//! amount); `variable` implements LSLV/LSRV/ASRV/RORV, where the amount is
//! a register value taken modulo the operating width.

use crate::isa::bits::ror;
use crate::isa::instruction::ShiftKind;

/// Applies a shift of `amount` bits at the operating width.
pub fn shift(value: u64, kind: ShiftKind, amount: u32, is64: bool) -> u64 {
    let width: u32 = if is64 { 64 } else { 32 };
    let value = if is64 { value } else { value & 0xFFFF_FFFF };
    if amount == 0 {
        return value;
    }
    match kind {
        ShiftKind::Lsl => {
            if amount >= width {
                0
            } else if is64 {
                value << amount
            } else {
                (value << amount) & 0xFFFF_FFFF
            }
        }
        ShiftKind::Lsr => {
            if amount >= width { 0 } else { value >> amount }
        }
        ShiftKind::Asr => {
            let amount = amount.min(width - 1);
            if is64 {
                ((value as i64) >> amount) as u64
            } else {
                u64::from(((value as u32 as i32) >> amount) as u32)
            }
        }
        ShiftKind::Ror => ror(value, amount, width),
    }
}

/// Variable shift: the amount is taken modulo the operating width.
pub fn variable(value: u64, kind: ShiftKind, amount: u64, is64: bool) -> u64 {
    let width: u64 = if is64 { 64 } else { 32 };
    shift(value, kind, (amount % width) as u32, is64)
}
