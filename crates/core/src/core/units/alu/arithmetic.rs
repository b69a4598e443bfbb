//! Integer arithmetic: add/sub with carry and flags, multiplies, divides.

use crate::core::arch::pstate::Pstate;

/// The architectural add-with-carry primitive.
///
/// Computes `a + b + carry` at the operating width and derives NZCV:
/// N is the sign bit at that width, Z the zero test, C the unsigned
/// carry-out, V the signed overflow. Subtraction is expressed as
/// `add_with_carry(a, !b, true)`, which makes C the not-borrow flag by
/// construction.
pub fn add_with_carry(a: u64, b: u64, carry: bool, is64: bool) -> (u64, Pstate) {
    if is64 {
        let (s1, o1) = a.overflowing_add(b);
        let (sum, o2) = s1.overflowing_add(u64::from(carry));
        let n = sum >> 63 == 1;
        let v = ((!(a ^ b)) & (a ^ sum)) >> 63 == 1;
        (
            sum,
            Pstate {
                n,
                z: sum == 0,
                c: o1 || o2,
                v,
            },
        )
    } else {
        let a = a as u32;
        let b = b as u32;
        let (s1, o1) = a.overflowing_add(b);
        let (sum, o2) = s1.overflowing_add(u32::from(carry));
        let n = sum >> 31 == 1;
        let v = ((!(a ^ b)) & (a ^ sum)) >> 31 == 1;
        (
            u64::from(sum),
            Pstate {
                n,
                z: sum == 0,
                c: o1 || o2,
                v,
            },
        )
    }
}

/// Multiply-add: `ra + rn * rm` (or subtract), truncated to the width.
pub fn madd(rn: u64, rm: u64, ra: u64, subtract: bool, is64: bool) -> u64 {
    let product = rn.wrapping_mul(rm);
    let value = if subtract {
        ra.wrapping_sub(product)
    } else {
        ra.wrapping_add(product)
    };
    if is64 { value } else { value & 0xFFFF_FFFF }
}

/// Widening multiply-add over 32-bit sources: `ra ± (rn32 * rm32)`.
pub fn maddl(rn: u64, rm: u64, ra: u64, subtract: bool, signed: bool) -> u64 {
    let product = if signed {
        (i64::from(rn as i32)).wrapping_mul(i64::from(rm as i32)) as u64
    } else {
        u64::from(rn as u32).wrapping_mul(u64::from(rm as u32))
    };
    if subtract {
        ra.wrapping_sub(product)
    } else {
        ra.wrapping_add(product)
    }
}

/// High 64 bits of the full 128-bit product.
pub fn mulh(rn: u64, rm: u64, signed: bool) -> u64 {
    if signed {
        ((i128::from(rn as i64) * i128::from(rm as i64)) >> 64) as u64
    } else {
        ((u128::from(rn) * u128::from(rm)) >> 64) as u64
    }
}

/// Unsigned division; division by zero returns 0 without fault.
pub fn udiv(a: u64, b: u64, is64: bool) -> u64 {
    if is64 {
        if b == 0 { 0 } else { a / b }
    } else {
        let a = a as u32;
        let b = b as u32;
        u64::from(if b == 0 { 0 } else { a / b })
    }
}

/// Signed division; division by zero returns 0, INT_MIN / -1 wraps.
pub fn sdiv(a: u64, b: u64, is64: bool) -> u64 {
    if is64 {
        let a = a as i64;
        let b = b as i64;
        if b == 0 { 0 } else { a.wrapping_div(b) as u64 }
    } else {
        let a = a as i32;
        let b = b as i32;
        u64::from(if b == 0 { 0 } else { a.wrapping_div(b) as u32 })
    }
}

/// Count leading zeros at the operating width.
pub fn clz(a: u64, is64: bool) -> u64 {
    if is64 {
        u64::from(a.leading_zeros())
    } else {
        u64::from((a as u32).leading_zeros())
    }
}

/// Count leading sign bits (excluding the sign bit itself).
pub fn cls(a: u64, is64: bool) -> u64 {
    if is64 {
        let x = a as i64;
        u64::from(if x < 0 { (!a).leading_zeros() } else { a.leading_zeros() }) - 1
    } else {
        let x = a as u32;
        let lead = if (x as i32) < 0 {
            (!x).leading_zeros()
        } else {
            x.leading_zeros()
        };
        u64::from(lead) - 1
    }
}
