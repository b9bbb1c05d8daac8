use std::fmt::Debug;
use std::hash::Hash;

use super::limbs::{self, Limbs};

/// Compile-time description of a 256-bit prime field in Montgomery form with
/// `R = 2^256`.
///
/// Only `MODULUS` must be supplied; every other constant is derived from it
/// during constant evaluation. The modulus must leave the top two bits of the
/// fourth limb clear, so that values in `[0, 2p)` can be added without
/// overflowing 256 bits.
pub trait FieldParams:
    'static + Copy + Clone + Debug + Default + PartialEq + Eq + Hash + Send + Sync
{
    /// Little-endian limbs of `p`.
    const MODULUS: Limbs;

    /// `2^256 - p`.
    const NOT_MODULUS: Limbs = limbs::negate(&Self::MODULUS);
    /// `2p`.
    const TWICE_MODULUS: Limbs = limbs::shl1(&Self::MODULUS);
    /// `2^256 - 2p`.
    const TWICE_NOT_MODULUS: Limbs = limbs::negate(&Self::TWICE_MODULUS);
    /// `-p^{-1} mod 2^64`.
    const R_INV: u64 = r_inv(Self::MODULUS[0]);
    /// `R mod p`, the Montgomery form of one.
    const ONE: Limbs = pow2_mod(256, &Self::MODULUS);
    /// `R^2 mod p`, used to enter Montgomery form.
    const R_SQUARED: Limbs = pow2_mod(512, &Self::MODULUS);
    /// Exponent for Fermat inversion.
    const MODULUS_MINUS_TWO: Limbs = limbs::sub(&Self::MODULUS, &[2, 0, 0, 0]).0;

    /// Number of coarse values whose plain 256-bit sum is guaranteed not to
    /// overflow. Field operations fold after every step and never need this;
    /// it bounds hand-unrolled accumulations that skip the fold.
    const MAX_UNREDUCED_SUMMANDS: usize = max_unreduced_summands(&Self::TWICE_MODULUS);

    /// Evaluated on first use of the field; rejects moduli without two spare bits.
    const SPARE_BITS: () = assert!(
        Self::MODULUS[3] >> 62 == 0,
        "modulus must be below 2^254 for coarse reduction"
    );
}

/// Fields with a large power-of-two subgroup, usable as FFT domains.
pub trait FftParams: FieldParams {
    /// Largest `s` with `2^s | p - 1`.
    const TWO_ADICITY: u32;
    /// Generator of the full multiplicative group, in canonical form.
    const GENERATOR: u64;
    /// `(p - 1) >> TWO_ADICITY`.
    const TRACE: Limbs = shr(&limbs::sub(&Self::MODULUS, &[1, 0, 0, 0]).0, Self::TWO_ADICITY);
}

const fn r_inv(m0: u64) -> u64 {
    // m0^(2^63 - 1) = m0^{-1} in the unit group of Z/2^64.
    let mut inv = 1u64;
    let mut i = 0;
    while i < 63 {
        inv = inv.wrapping_mul(inv);
        inv = inv.wrapping_mul(m0);
        i += 1;
    }
    inv.wrapping_neg()
}

const fn max_unreduced_summands(twice_m: &Limbs) -> usize {
    let mut acc = *twice_m;
    let mut k = 1;
    loop {
        let (next, carry) = limbs::add(&acc, twice_m);
        if carry == 1 {
            return k;
        }
        acc = next;
        k += 1;
    }
}

const fn pow2_mod(exp: usize, m: &Limbs) -> Limbs {
    let mut r = [1, 0, 0, 0];
    let mut i = 0;
    while i < exp {
        r = limbs::double_mod(&r, m);
        i += 1;
    }
    r
}

const fn shr(a: &Limbs, n: u32) -> Limbs {
    let words = (n / 64) as usize;
    let bits = n % 64;
    let mut r = [0u64; 4];
    let mut i = 0;
    while i + words < 4 {
        let lo = a[i + words] >> bits;
        let hi = if bits > 0 && i + words + 1 < 4 {
            a[i + words + 1] << (64 - bits)
        } else {
            0
        };
        r[i] = lo | hi;
        i += 1;
    }
    r
}

/// BN254 scalar field `r`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Bn254FrParams;

impl FieldParams for Bn254FrParams {
    const MODULUS: Limbs = [
        0x43e1f593f0000001,
        0x2833e84879b97091,
        0xb85045b68181585d,
        0x30644e72e131a029,
    ];
}

impl FftParams for Bn254FrParams {
    const TWO_ADICITY: u32 = 28;
    const GENERATOR: u64 = 5;
}

/// BN254 base field `q`. `q - 1` has two-adicity 1, so there is no FFT support.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Bn254FqParams;

impl FieldParams for Bn254FqParams {
    const MODULUS: Limbs = [
        0x3c208c16d87cfd47,
        0x97816a916871ca8d,
        0xb85045b68181585d,
        0x30644e72e131a029,
    ];
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_ff::{BigInteger, MontConfig, PrimeField};

    #[test]
    fn r_inv_matches_montgomery_identity() {
        let m0 = Bn254FrParams::MODULUS[0];
        assert_eq!(m0.wrapping_mul(Bn254FrParams::R_INV), u64::MAX);
        let q0 = Bn254FqParams::MODULUS[0];
        assert_eq!(q0.wrapping_mul(Bn254FqParams::R_INV), u64::MAX);
    }

    #[test]
    fn derived_constants_match_arkworks() {
        assert_eq!(
            Bn254FrParams::MODULUS,
            <ark_bn254::Fr as PrimeField>::MODULUS.0
        );
        assert_eq!(
            Bn254FqParams::MODULUS,
            <ark_bn254::Fq as PrimeField>::MODULUS.0
        );
        assert_eq!(Bn254FrParams::R_SQUARED, ark_bn254::FrConfig::R2.0);
        assert_eq!(Bn254FrParams::ONE, ark_bn254::FrConfig::R.0);
        assert_eq!(Bn254FqParams::R_SQUARED, ark_bn254::FqConfig::R2.0);
        assert_eq!(Bn254FqParams::ONE, ark_bn254::FqConfig::R.0);
    }

    #[test]
    fn modulus_complements() {
        let (sum, carry) = limbs::add(&Bn254FrParams::MODULUS, &Bn254FrParams::NOT_MODULUS);
        assert_eq!((sum, carry), ([0; 4], 1));
        let (sum, carry) = limbs::add(
            &Bn254FrParams::TWICE_MODULUS,
            &Bn254FrParams::TWICE_NOT_MODULUS,
        );
        assert_eq!((sum, carry), ([0; 4], 1));
    }

    #[test]
    fn bn254_fits_two_coarse_summands() {
        assert_eq!(Bn254FrParams::MAX_UNREDUCED_SUMMANDS, 2);
        assert_eq!(Bn254FqParams::MAX_UNREDUCED_SUMMANDS, 2);
    }

    #[test]
    fn trace_is_odd_part_of_p_minus_one() {
        let trace = Bn254FrParams::TRACE;
        assert_eq!(trace[0] & 1, 1);
        let mut t = ark_ff::BigInt::<4>(trace);
        for _ in 0..Bn254FrParams::TWO_ADICITY {
            t.mul2();
        }
        let mut p_minus_one = <ark_bn254::Fr as PrimeField>::MODULUS;
        p_minus_one.sub_with_borrow(&ark_ff::BigInt::from(1u64));
        assert_eq!(t, p_minus_one);
    }
}
