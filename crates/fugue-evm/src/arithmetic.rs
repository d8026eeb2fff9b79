//! 256-bit word arithmetic with wraparound semantics
//!
//! Every result is reduced modulo 2^256. Signed variants read bit 255 as the
//! sign in two's complement. Division and modulo by zero yield zero.

use fugue_primitives::U256;
use primitive_types::U512;
use std::cmp::Ordering;

/// 2^n for n in 0..256, used by the EXP fast path
static POWERS_OF_TWO: [U256; 256] = powers_of_two();

const fn powers_of_two() -> [U256; 256] {
    let mut table = [U256([0; 4]); 256];
    let mut i = 0;
    while i < 256 {
        let mut limbs = [0u64; 4];
        limbs[i / 64] = 1u64 << (i % 64);
        table[i] = U256(limbs);
        i += 1;
    }
    table
}

fn is_negative(value: U256) -> bool {
    value.bit(255)
}

fn twos_complement(value: U256) -> U256 {
    (!value).overflowing_add(U256::one()).0
}

fn abs(value: U256) -> U256 {
    if is_negative(value) {
        twos_complement(value)
    } else {
        value
    }
}

fn narrow(value: U512) -> U256 {
    let mut buf = [0u8; 64];
    value.to_big_endian(&mut buf);
    U256::from_big_endian(&buf[32..])
}

/// a + b mod 2^256
pub fn add(a: U256, b: U256) -> U256 {
    a.overflowing_add(b).0
}

/// a - b mod 2^256
pub fn sub(a: U256, b: U256) -> U256 {
    a.overflowing_sub(b).0
}

/// a * b mod 2^256
pub fn mul(a: U256, b: U256) -> U256 {
    a.overflowing_mul(b).0
}

/// Unsigned division, zero on zero divisor
pub fn div(a: U256, b: U256) -> U256 {
    if b.is_zero() {
        U256::zero()
    } else {
        a / b
    }
}

/// Unsigned remainder, zero on zero divisor
pub fn rem(a: U256, b: U256) -> U256 {
    if b.is_zero() {
        U256::zero()
    } else {
        a % b
    }
}

/// Signed division. The quotient is negative iff exactly one operand is.
/// MIN / -1 wraps back to MIN.
pub fn sdiv(a: U256, b: U256) -> U256 {
    if b.is_zero() {
        return U256::zero();
    }
    let quotient = abs(a) / abs(b);
    if is_negative(a) != is_negative(b) {
        twos_complement(quotient)
    } else {
        quotient
    }
}

/// Signed remainder, taking the sign of the dividend.
pub fn smod(a: U256, b: U256) -> U256 {
    if b.is_zero() {
        return U256::zero();
    }
    let remainder = abs(a) % abs(b);
    if is_negative(a) {
        twos_complement(remainder)
    } else {
        remainder
    }
}

/// (a + b) % n without intermediate overflow
pub fn addmod(a: U256, b: U256, n: U256) -> U256 {
    if n.is_zero() {
        return U256::zero();
    }
    narrow((U512::from(a) + U512::from(b)) % U512::from(n))
}

/// (a * b) % n without intermediate overflow
pub fn mulmod(a: U256, b: U256, n: U256) -> U256 {
    if n.is_zero() {
        return U256::zero();
    }
    narrow(a.full_mul(b) % U512::from(n))
}

/// base ^ exponent mod 2^256
pub fn exp(base: U256, exponent: U256) -> U256 {
    if base == U256::from(2u64) && exponent < U256::from(256u64) {
        return POWERS_OF_TWO[exponent.low_u64() as usize];
    }
    base.overflowing_pow(exponent).0
}

/// Extend the sign bit of byte `b` (counted from the low end) across the word.
pub fn signextend(b: U256, x: U256) -> U256 {
    if b >= U256::from(31u64) {
        return x;
    }
    let bit = b.low_u64() as usize * 8 + 7;
    let mask = (U256::one() << bit) - U256::one();
    if x.bit(bit) {
        x | !mask
    } else {
        x & mask
    }
}

/// The i-th byte of x, counted from the most significant end.
pub fn byte(i: U256, x: U256) -> U256 {
    if i >= U256::from(32u64) {
        return U256::zero();
    }
    let shift = (31 - i.low_u64() as usize) * 8;
    (x >> shift) & U256::from(0xffu64)
}

/// Logical shift left; zero for shifts of 256 or more
pub fn shl(shift: U256, value: U256) -> U256 {
    if shift >= U256::from(256u64) {
        U256::zero()
    } else {
        value << shift.low_u64() as usize
    }
}

/// Logical shift right; zero for shifts of 256 or more
pub fn shr(shift: U256, value: U256) -> U256 {
    if shift >= U256::from(256u64) {
        U256::zero()
    } else {
        value >> shift.low_u64() as usize
    }
}

/// Arithmetic shift right, filling with the sign bit
pub fn sar(shift: U256, value: U256) -> U256 {
    let negative = is_negative(value);
    if shift >= U256::from(256u64) {
        return if negative { U256::MAX } else { U256::zero() };
    }
    let shift = shift.low_u64() as usize;
    if shift == 0 {
        return value;
    }
    let shifted = value >> shift;
    if negative {
        shifted | (U256::MAX << (256 - shift))
    } else {
        shifted
    }
}

/// Signed comparison of two words
pub fn signed_cmp(a: U256, b: U256) -> Ordering {
    match (is_negative(a), is_negative(b)) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        // Same sign: two's complement preserves unsigned ordering
        _ => a.cmp(&b),
    }
}

/// 1 for true, 0 for false
pub fn from_bool(flag: bool) -> U256 {
    if flag {
        U256::one()
    } else {
        U256::zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn w(n: u64) -> U256 {
        U256::from(n)
    }

    fn neg(n: u64) -> U256 {
        twos_complement(w(n))
    }

    fn min_signed() -> U256 {
        U256::one() << 255
    }

    #[test]
    fn test_wrapping_add_sub_mul() {
        assert_eq!(add(U256::MAX, w(1)), U256::zero());
        assert_eq!(sub(w(0), w(1)), U256::MAX);
        assert_eq!(mul(U256::MAX, w(2)), U256::MAX - w(1));
    }

    #[test]
    fn test_div_and_mod_by_zero() {
        assert_eq!(div(w(10), w(0)), U256::zero());
        assert_eq!(rem(w(10), w(0)), U256::zero());
        assert_eq!(sdiv(neg(10), w(0)), U256::zero());
        assert_eq!(smod(neg(10), w(0)), U256::zero());
        assert_eq!(addmod(w(1), w(2), w(0)), U256::zero());
        assert_eq!(mulmod(w(1), w(2), w(0)), U256::zero());
    }

    #[test]
    fn test_sdiv_signs() {
        assert_eq!(sdiv(neg(10), w(3)), neg(3));
        assert_eq!(sdiv(w(10), neg(3)), neg(3));
        assert_eq!(sdiv(neg(10), neg(3)), w(3));
        assert_eq!(sdiv(w(0), neg(3)), w(0));
    }

    #[test]
    fn test_sdiv_min_by_minus_one() {
        assert_eq!(sdiv(min_signed(), neg(1)), min_signed());
    }

    #[test]
    fn test_smod_follows_dividend() {
        assert_eq!(smod(neg(10), w(3)), neg(1));
        assert_eq!(smod(w(10), neg(3)), w(1));
        assert_eq!(smod(neg(9), w(3)), w(0));
    }

    #[test]
    fn test_addmod_mulmod_no_overflow() {
        assert_eq!(addmod(U256::MAX, w(2), w(2)), w(1));
        assert_eq!(mulmod(U256::MAX, U256::MAX, w(12)), w(9));
        assert_eq!(mulmod(w(10), w(10), w(8)), w(4));
    }

    #[test]
    fn test_exp() {
        assert_eq!(exp(w(2), w(0)), w(1));
        assert_eq!(exp(w(2), w(10)), w(1024));
        assert_eq!(exp(w(2), w(255)), min_signed());
        assert_eq!(exp(w(2), w(256)), U256::zero());
        assert_eq!(exp(w(3), w(4)), w(81));
        assert_eq!(exp(w(0), w(0)), w(1));
        // 10^78 overflows 2^256 and wraps
        assert_eq!(exp(w(10), w(78)), w(10).overflowing_pow(w(78)).0);
    }

    #[test]
    fn test_powers_of_two_table() {
        for n in [0usize, 1, 63, 64, 127, 128, 200, 255] {
            assert_eq!(POWERS_OF_TWO[n], U256::one() << n, "2^{n}");
        }
    }

    #[test]
    fn test_signextend() {
        assert_eq!(signextend(w(0), w(0xff)), U256::MAX);
        assert_eq!(signextend(w(0), w(0x7f)), w(0x7f));
        assert_eq!(signextend(w(1), w(0x80ff)), neg(0x7f01));
        assert_eq!(signextend(w(0), w(0x1ff)), U256::MAX);
        assert_eq!(signextend(w(31), w(0xff)), w(0xff));
        assert_eq!(signextend(U256::MAX, w(0xff)), w(0xff));
    }

    #[test]
    fn test_byte() {
        let x = U256::from_big_endian(&[0xab; 32]) >> 8;
        assert_eq!(byte(w(0), x), w(0));
        assert_eq!(byte(w(31), x), w(0xab));
        assert_eq!(byte(w(31), w(0x1234)), w(0x34));
        assert_eq!(byte(w(30), w(0x1234)), w(0x12));
        assert_eq!(byte(w(32), U256::MAX), w(0));
    }

    #[test]
    fn test_shifts_at_and_beyond_width() {
        assert_eq!(shl(w(256), w(1)), U256::zero());
        assert_eq!(shr(w(256), U256::MAX), U256::zero());
        assert_eq!(sar(w(256), w(1)), U256::zero());
        assert_eq!(sar(w(256), neg(1)), U256::MAX);
        assert_eq!(sar(U256::MAX, min_signed()), U256::MAX);
    }

    #[test]
    fn test_shifts() {
        assert_eq!(shl(w(4), w(1)), w(16));
        assert_eq!(shl(w(255), w(1)), min_signed());
        assert_eq!(shr(w(4), w(16)), w(1));
        assert_eq!(sar(w(4), neg(16)), neg(1));
        assert_eq!(sar(w(4), w(16)), w(1));
        assert_eq!(sar(w(0), neg(5)), neg(5));
    }

    #[test]
    fn test_signed_cmp() {
        assert_eq!(signed_cmp(neg(1), w(1)), Ordering::Less);
        assert_eq!(signed_cmp(w(1), neg(1)), Ordering::Greater);
        assert_eq!(signed_cmp(neg(2), neg(1)), Ordering::Less);
        assert_eq!(signed_cmp(w(5), w(5)), Ordering::Equal);
    }

    fn any_word() -> impl Strategy<Value = U256> {
        any::<[u64; 4]>().prop_map(U256)
    }

    proptest! {
        #[test]
        fn prop_add_matches_wide_arithmetic(a in any_word(), b in any_word()) {
            prop_assert_eq!(add(a, b), narrow(U512::from(a) + U512::from(b)));
        }

        #[test]
        fn prop_mul_matches_wide_arithmetic(a in any_word(), b in any_word()) {
            prop_assert_eq!(mul(a, b), narrow(a.full_mul(b)));
        }

        #[test]
        fn prop_sub_inverts_add(a in any_word(), b in any_word()) {
            prop_assert_eq!(sub(add(a, b), b), a);
        }

        #[test]
        fn prop_sdiv_sign_is_xor_of_signs(a in any_word(), b in any_word()) {
            let q = sdiv(a, b);
            prop_assume!(!q.is_zero() && a != min_signed());
            prop_assert_eq!(is_negative(q), is_negative(a) != is_negative(b));
        }

        #[test]
        fn prop_smod_sign_follows_dividend(a in any_word(), b in any_word()) {
            let r = smod(a, b);
            prop_assume!(!r.is_zero());
            prop_assert_eq!(is_negative(r), is_negative(a));
        }

        #[test]
        fn prop_exp_fast_path_agrees(e in 0u64..256) {
            prop_assert_eq!(exp(w(2), w(e)), w(2).overflowing_pow(w(e)).0);
        }
    }
}
