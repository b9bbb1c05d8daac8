use super::MontgomeryBackend;
use crate::field::limbs::{self, adc, mac, Limbs};
use crate::field::params::FieldParams;

/// Pure Rust limb arithmetic. Runs on every target and defines the reference
/// behaviour the machine-code path is checked against.
#[derive(Clone, Copy, Debug, Default)]
pub struct Portable;

/// All ones when `carry == 1`, zero when `carry == 0`.
#[inline(always)]
pub(crate) fn mask(carry: u64) -> u64 {
    carry.wrapping_neg()
}

/// All ones when `x != 0`, zero otherwise, without branching.
#[inline(always)]
pub(crate) fn nonzero_mask(x: u64) -> u64 {
    ((x | x.wrapping_neg()) >> 63).wrapping_neg()
}

/// Subtracts `m` from `a` when `a + (2^256 - m)` carries, i.e. when `a >= m`.
#[inline(always)]
fn fold(a: &Limbs, not_m: &Limbs) -> Limbs {
    let (t, carry) = limbs::add(a, not_m);
    limbs::select(mask(carry), &t, a)
}

impl MontgomeryBackend for Portable {
    #[inline(always)]
    fn add<P: FieldParams>(a: &Limbs, b: &Limbs) -> Limbs {
        let (r, _) = limbs::add(a, b);
        fold(&r, &P::TWICE_NOT_MODULUS)
    }

    #[inline(always)]
    fn sub<P: FieldParams>(a: &Limbs, b: &Limbs) -> Limbs {
        let (r, borrow) = limbs::sub(a, b);
        limbs::add(&r, &limbs::and(&P::TWICE_MODULUS, mask(borrow))).0
    }

    #[inline(always)]
    fn mul<P: FieldParams>(a: &Limbs, b: &Limbs) -> Limbs {
        let n = &P::MODULUS;
        let mut t = [0u64; 6];
        for i in 0..4 {
            let mut c = 0;
            for j in 0..4 {
                (t[j], c) = mac(t[j], a[j], b[i], c);
            }
            (t[4], t[5]) = adc(t[4], c, 0);

            let m = t[0].wrapping_mul(P::R_INV);
            let (_, mut c) = mac(t[0], m, n[0], 0);
            for j in 1..4 {
                (t[j - 1], c) = mac(t[j], m, n[j], c);
            }
            (t[3], c) = adc(t[4], c, 0);
            t[4] = t[5] + c;
        }
        [t[0], t[1], t[2], t[3]]
    }

    #[inline(always)]
    fn sqr<P: FieldParams>(a: &Limbs) -> Limbs {
        let mut t = [0u64; 8];

        // Off-diagonal products a_i * a_j with i < j.
        for i in 0..3 {
            let mut c = 0;
            for j in (i + 1)..4 {
                (t[i + j], c) = mac(t[i + j], a[i], a[j], c);
            }
            t[i + 4] = c;
        }

        t[7] = t[6] >> 63;
        for k in (2..7).rev() {
            t[k] = (t[k] << 1) | (t[k - 1] >> 63);
        }
        t[1] <<= 1;

        let mut c = 0;
        for i in 0..4 {
            let (lo, hi) = mac(0, a[i], a[i], 0);
            (t[2 * i], c) = adc(t[2 * i], lo, c);
            (t[2 * i + 1], c) = adc(t[2 * i + 1], hi, c);
        }

        reduce_wide::<P>(t)
    }

    #[inline(always)]
    fn reduce_once<P: FieldParams>(a: &Limbs) -> Limbs {
        fold(a, &P::NOT_MODULUS)
    }

    #[inline(always)]
    fn conditional_negate<P: FieldParams>(r: &mut Limbs, predicate: u64) {
        let negated = limbs::sub(&P::TWICE_MODULUS, r).0;
        let negated = fold(&negated, &P::TWICE_NOT_MODULUS);
        *r = limbs::select(nonzero_mask(predicate), &negated, r);
    }
}

/// Montgomery reduction of a 512-bit product, one limb per round.
#[inline(always)]
fn reduce_wide<P: FieldParams>(mut t: [u64; 8]) -> Limbs {
    let n = &P::MODULUS;
    for i in 0..4 {
        let m = t[i].wrapping_mul(P::R_INV);
        let mut c = 0;
        for j in 0..4 {
            (t[i + j], c) = mac(t[i + j], m, n[j], c);
        }
        for k in (i + 4)..8 {
            (t[k], c) = adc(t[k], c, 0);
        }
    }
    [t[4], t[5], t[6], t[7]]
}
