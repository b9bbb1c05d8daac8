//! Carry-propagating primitives over 64-bit limbs.
//!
//! Everything here is `const fn` so that per-prime constants can be derived at
//! compile time from the modulus alone. Carries and borrows are always `0` or
//! `1`; masks derived from them are `0` or `u64::MAX`.

pub type Limbs = [u64; 4];

/// `a + b + carry`, returning `(sum, carry_out)`.
#[inline(always)]
pub const fn adc(a: u64, b: u64, carry: u64) -> (u64, u64) {
    let t = a as u128 + b as u128 + carry as u128;
    (t as u64, (t >> 64) as u64)
}

/// `a - b - borrow`, returning `(difference, borrow_out)`.
#[inline(always)]
pub const fn sbb(a: u64, b: u64, borrow: u64) -> (u64, u64) {
    let t = (a as u128).wrapping_sub(b as u128 + borrow as u128);
    (t as u64, (t >> 127) as u64)
}

/// `a + b * c + carry`, returning `(low, high)`. Never overflows 128 bits.
#[inline(always)]
pub const fn mac(a: u64, b: u64, c: u64, carry: u64) -> (u64, u64) {
    let t = a as u128 + (b as u128) * (c as u128) + carry as u128;
    (t as u64, (t >> 64) as u64)
}

#[inline(always)]
pub const fn add(a: &Limbs, b: &Limbs) -> (Limbs, u64) {
    let (r0, c) = adc(a[0], b[0], 0);
    let (r1, c) = adc(a[1], b[1], c);
    let (r2, c) = adc(a[2], b[2], c);
    let (r3, c) = adc(a[3], b[3], c);
    ([r0, r1, r2, r3], c)
}

#[inline(always)]
pub const fn sub(a: &Limbs, b: &Limbs) -> (Limbs, u64) {
    let (r0, c) = sbb(a[0], b[0], 0);
    let (r1, c) = sbb(a[1], b[1], c);
    let (r2, c) = sbb(a[2], b[2], c);
    let (r3, c) = sbb(a[3], b[3], c);
    ([r0, r1, r2, r3], c)
}

/// Two's complement negation modulo 2^256.
pub const fn negate(a: &Limbs) -> Limbs {
    sub(&[0; 4], a).0
}

pub const fn shl1(a: &Limbs) -> Limbs {
    [
        a[0] << 1,
        (a[1] << 1) | (a[0] >> 63),
        (a[2] << 1) | (a[1] >> 63),
        (a[3] << 1) | (a[2] >> 63),
    ]
}

pub const fn geq(a: &Limbs, b: &Limbs) -> bool {
    sub(a, b).1 == 0
}

/// `a & mask` limb-wise.
#[inline(always)]
pub const fn and(a: &Limbs, mask: u64) -> Limbs {
    [a[0] & mask, a[1] & mask, a[2] & mask, a[3] & mask]
}

/// Selects `a` when `mask` is all ones and `b` when it is zero.
#[inline(always)]
pub const fn select(mask: u64, a: &Limbs, b: &Limbs) -> Limbs {
    [
        (a[0] & mask) | (b[0] & !mask),
        (a[1] & mask) | (b[1] & !mask),
        (a[2] & mask) | (b[2] & !mask),
        (a[3] & mask) | (b[3] & !mask),
    ]
}

/// `2a mod m` for `a < m < 2^255`. Compile-time use only; it branches.
pub const fn double_mod(a: &Limbs, m: &Limbs) -> Limbs {
    let d = shl1(a);
    if geq(&d, m) {
        sub(&d, m).0
    } else {
        d
    }
}
