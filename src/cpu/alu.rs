//! Arithmetic and logic.
//!
//! Every arithmetic, bitwise, shift and compare result is computed exactly
//! as a wide signed integer and then folded back into a byte by
//! [`normalize`], which also derives the zero and carry flags.

use crate::cpu::registers::Flags;

/// Fold a raw result into a byte and derive the flags.
///
/// - `raw >= 256`: carry, result `raw mod 256`
/// - `raw == 0`: zero
/// - `raw < 0`: carry, result wraps modulo 256
/// - otherwise: no flags
///
/// The zero flag looks only at the raw value, so `normalize(512)` yields a
/// zero result with the zero flag clear.
pub fn normalize(raw: i64) -> (u8, Flags) {
    if raw >= 256 {
        ((raw % 256) as u8, Flags { zero: false, carry: true })
    } else if raw == 0 {
        (0, Flags { zero: true, carry: false })
    } else if raw < 0 {
        (raw.rem_euclid(256) as u8, Flags { zero: false, carry: true })
    } else {
        (raw as u8, Flags::default())
    }
}

#[inline]
pub fn add(a: u8, b: u8) -> (u8, Flags) {
    normalize(a as i64 + b as i64)
}

#[inline]
pub fn sub(a: u8, b: u8) -> (u8, Flags) {
    normalize(a as i64 - b as i64)
}

#[inline]
pub fn mul(a: u8, b: u8) -> (u8, Flags) {
    normalize(a as i64 * b as i64)
}

/// Integer division, `None` when dividing by zero.
#[inline]
pub fn div(a: u8, b: u8) -> Option<(u8, Flags)> {
    (b != 0).then(|| normalize((a / b) as i64))
}

#[inline]
pub fn and(a: u8, b: u8) -> (u8, Flags) {
    normalize((a & b) as i64)
}

#[inline]
pub fn or(a: u8, b: u8) -> (u8, Flags) {
    normalize((a | b) as i64)
}

#[inline]
pub fn xor(a: u8, b: u8) -> (u8, Flags) {
    normalize((a ^ b) as i64)
}

/// Bitwise complement of the full-width value: `!a == -(a + 1)`, which
/// always sets carry.
#[inline]
pub fn not(a: u8) -> (u8, Flags) {
    normalize(!(a as i64))
}

/// Mask applied to shift counts: only the low 5 bits are used, as with
/// 32-bit shifts.
const SHIFT_MASK: u8 = 31;

/// Logical left shift by `count & 31`.
///
/// The value is widened first, so bits shifted past bit 7 raise carry.
pub fn shl(a: u8, count: u8) -> (u8, Flags) {
    normalize((a as i64) << (count & SHIFT_MASK))
}

/// Logical right shift by `count & 31`; never sign-extends.
pub fn shr(a: u8, count: u8) -> (u8, Flags) {
    normalize(((a as u32) >> (count & SHIFT_MASK)) as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const CARRY: Flags = Flags { zero: false, carry: true };
    const ZERO: Flags = Flags { zero: true, carry: false };
    const NONE: Flags = Flags { zero: false, carry: false };

    #[test]
    fn test_normalize_boundaries() {
        assert_eq!(normalize(256), (0, CARRY));
        assert_eq!(normalize(0), (0, ZERO));
        assert_eq!(normalize(-1), (255, CARRY));
        assert_eq!(normalize(512), (0, CARRY));
        assert_eq!(normalize(255), (255, NONE));
        assert_eq!(normalize(300), (44, CARRY));
        assert_eq!(normalize(-255), (1, CARRY));
    }

    #[test]
    fn test_sub_borrows() {
        assert_eq!(sub(3, 5), (254, CARRY));
        assert_eq!(sub(5, 5), (0, ZERO));
        assert_eq!(sub(5, 3), (2, NONE));
    }

    #[test]
    fn test_mul_and_div() {
        assert_eq!(mul(16, 16), (0, CARRY));
        assert_eq!(mul(15, 17), (255, NONE));
        assert_eq!(div(7, 2), Some((3, NONE)));
        assert_eq!(div(1, 2), Some((0, ZERO)));
        assert_eq!(div(7, 0), None);
    }

    #[test]
    fn test_not_sets_carry() {
        assert_eq!(not(0), (255, CARRY));
        assert_eq!(not(0x0f), (0xf0, CARRY));
        assert_eq!(not(255), (0, CARRY));
    }

    #[test]
    fn test_shifts_are_logical() {
        assert_eq!(shl(0x81, 1), (0x02, CARRY));
        assert_eq!(shl(1, 7), (0x80, NONE));
        assert_eq!(shl(1, 8), (0, CARRY));
        assert_eq!(shl(1, 200), (0, CARRY));
        assert_eq!(shl(0, 200), (0, ZERO));
        assert_eq!(shr(0x80, 7), (1, NONE));
        assert_eq!(shr(0x80, 1), (0x40, NONE));
        assert_eq!(shr(0xff, 8), (0, ZERO));
        assert_eq!(shr(0xff, 255), (0, ZERO));
    }

    #[test]
    fn test_shift_count_uses_low_five_bits() {
        assert_eq!(shl(1, 32), (1, NONE));
        assert_eq!(shl(1, 33), (2, NONE));
        assert_eq!(shl(1, 24), (0, CARRY));
        assert_eq!(shl(0x80, 31), (0, CARRY));
        assert_eq!(shr(0x80, 32), (0x80, NONE));
        assert_eq!(shr(0x80, 39), (1, NONE));
        assert_eq!(shr(0x80, 40), (0, ZERO));
    }

    proptest! {
        #[test]
        fn prop_normalize_agrees_with_modular_arithmetic(raw in -70_000i64..70_000) {
            let (value, flags) = normalize(raw);
            prop_assert_eq!(value as i64, raw.rem_euclid(256));
            prop_assert_eq!(flags.zero, raw == 0);
            prop_assert_eq!(flags.carry, !(0..256).contains(&raw));
        }

        #[test]
        fn prop_add_then_sub_restores(a: u8, b: u8) {
            let (sum, _) = add(a, b);
            let (back, _) = sub(sum, b);
            prop_assert_eq!(back, a);
        }
    }
}
