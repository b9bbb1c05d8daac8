//! x86-64 fast path.
//!
//! Reductions and additive operations are hand-written `adc`/`sbb`/`cmov`
//! sequences with no data-dependent branches. Multiplication uses BMI2 `mulx`
//! through intrinsics when the build enables it. The dedicated squaring
//! routine is only used with both BMI2 and ADX and without the `no-adx`
//! feature; every other configuration squares through multiplication.
//!
//! The `mulx` routines are always compiled with their target features enabled
//! per function, so they can be checked on any CPU that reports BMI2 and ADX at
//! run time, whatever the build flags.

use std::arch::asm;

#[cfg(not(target_feature = "bmi2"))]
use super::portable::Portable;
use super::MontgomeryBackend;
use crate::field::limbs::Limbs;
use crate::field::params::FieldParams;

#[derive(Clone, Copy, Debug, Default)]
pub struct X64Asm;

impl MontgomeryBackend for X64Asm {
    #[inline(always)]
    fn add<P: FieldParams>(a: &Limbs, b: &Limbs) -> Limbs {
        let k = P::TWICE_NOT_MODULUS;
        let mut r = *a;
        unsafe {
            asm!(
                "add {r0}, qword ptr [{b}]",
                "adc {r1}, qword ptr [{b} + 8]",
                "adc {r2}, qword ptr [{b} + 16]",
                "adc {r3}, qword ptr [{b} + 24]",
                "mov {t0}, {r0}",
                "mov {t1}, {r1}",
                "mov {t2}, {r2}",
                "mov {t3}, {r3}",
                "add {t0}, qword ptr [{k}]",
                "adc {t1}, qword ptr [{k} + 8]",
                "adc {t2}, qword ptr [{k} + 16]",
                "adc {t3}, qword ptr [{k} + 24]",
                "cmovc {r0}, {t0}",
                "cmovc {r1}, {t1}",
                "cmovc {r2}, {t2}",
                "cmovc {r3}, {t3}",
                r0 = inout(reg) r[0],
                r1 = inout(reg) r[1],
                r2 = inout(reg) r[2],
                r3 = inout(reg) r[3],
                t0 = out(reg) _,
                t1 = out(reg) _,
                t2 = out(reg) _,
                t3 = out(reg) _,
                b = in(reg) b.as_ptr(),
                k = in(reg) k.as_ptr(),
                options(pure, readonly, nostack),
            );
        }
        r
    }

    #[inline(always)]
    fn sub<P: FieldParams>(a: &Limbs, b: &Limbs) -> Limbs {
        let k = P::TWICE_MODULUS;
        let mut r = *a;
        unsafe {
            asm!(
                "sub {r0}, qword ptr [{b}]",
                "sbb {r1}, qword ptr [{b} + 8]",
                "sbb {r2}, qword ptr [{b} + 16]",
                "sbb {r3}, qword ptr [{b} + 24]",
                // all ones on borrow
                "sbb {m}, {m}",
                "mov {t0}, qword ptr [{k}]",
                "mov {t1}, qword ptr [{k} + 8]",
                "mov {t2}, qword ptr [{k} + 16]",
                "mov {t3}, qword ptr [{k} + 24]",
                "and {t0}, {m}",
                "and {t1}, {m}",
                "and {t2}, {m}",
                "and {t3}, {m}",
                "add {r0}, {t0}",
                "adc {r1}, {t1}",
                "adc {r2}, {t2}",
                "adc {r3}, {t3}",
                r0 = inout(reg) r[0],
                r1 = inout(reg) r[1],
                r2 = inout(reg) r[2],
                r3 = inout(reg) r[3],
                t0 = out(reg) _,
                t1 = out(reg) _,
                t2 = out(reg) _,
                t3 = out(reg) _,
                m = out(reg) _,
                b = in(reg) b.as_ptr(),
                k = in(reg) k.as_ptr(),
                options(pure, readonly, nostack),
            );
        }
        r
    }

    #[inline(always)]
    fn mul<P: FieldParams>(a: &Limbs, b: &Limbs) -> Limbs {
        #[cfg(target_feature = "bmi2")]
        unsafe {
            mulx::mul::<P>(a, b)
        }
        #[cfg(not(target_feature = "bmi2"))]
        {
            Portable::mul::<P>(a, b)
        }
    }

    #[inline(always)]
    fn sqr<P: FieldParams>(a: &Limbs) -> Limbs {
        #[cfg(all(
            target_feature = "bmi2",
            target_feature = "adx",
            not(feature = "no-adx")
        ))]
        unsafe {
            mulx::sqr::<P>(a)
        }
        #[cfg(not(all(
            target_feature = "bmi2",
            target_feature = "adx",
            not(feature = "no-adx")
        )))]
        {
            Self::mul::<P>(a, a)
        }
    }

    #[inline(always)]
    fn reduce_once<P: FieldParams>(a: &Limbs) -> Limbs {
        let k = P::NOT_MODULUS;
        let mut r = *a;
        unsafe {
            asm!(
                "mov {t0}, {r0}",
                "mov {t1}, {r1}",
                "mov {t2}, {r2}",
                "mov {t3}, {r3}",
                "add {t0}, qword ptr [{k}]",
                "adc {t1}, qword ptr [{k} + 8]",
                "adc {t2}, qword ptr [{k} + 16]",
                "adc {t3}, qword ptr [{k} + 24]",
                "cmovc {r0}, {t0}",
                "cmovc {r1}, {t1}",
                "cmovc {r2}, {t2}",
                "cmovc {r3}, {t3}",
                r0 = inout(reg) r[0],
                r1 = inout(reg) r[1],
                r2 = inout(reg) r[2],
                r3 = inout(reg) r[3],
                t0 = out(reg) _,
                t1 = out(reg) _,
                t2 = out(reg) _,
                t3 = out(reg) _,
                k = in(reg) k.as_ptr(),
                options(pure, readonly, nostack),
            );
        }
        r
    }

    #[inline(always)]
    fn conditional_negate<P: FieldParams>(r: &mut Limbs, predicate: u64) {
        // 2p - r lies in (0, 2p) except for r = 0, which must stay 0. Negating
        // only when both the predicate and r are nonzero covers that case.
        let k = P::TWICE_MODULUS;
        unsafe {
            asm!(
                "mov {t0}, qword ptr [{k}]",
                "mov {t1}, qword ptr [{k} + 8]",
                "mov {t2}, qword ptr [{k} + 16]",
                "mov {t3}, qword ptr [{k} + 24]",
                "sub {t0}, {r0}",
                "sbb {t1}, {r1}",
                "sbb {t2}, {r2}",
                "sbb {t3}, {r3}",
                "mov {z}, {r0}",
                "or {z}, {r1}",
                "or {z}, {r2}",
                "or {z}, {r3}",
                "test {p}, {p}",
                "cmovz {z}, {p}",
                "test {z}, {z}",
                "cmovnz {r0}, {t0}",
                "cmovnz {r1}, {t1}",
                "cmovnz {r2}, {t2}",
                "cmovnz {r3}, {t3}",
                r0 = inout(reg) r[0],
                r1 = inout(reg) r[1],
                r2 = inout(reg) r[2],
                r3 = inout(reg) r[3],
                t0 = out(reg) _,
                t1 = out(reg) _,
                t2 = out(reg) _,
                t3 = out(reg) _,
                z = out(reg) _,
                p = in(reg) predicate,
                k = in(reg) k.as_ptr(),
                options(pure, readonly, nostack),
            );
        }
    }
}

/// Callers must ensure BMI2 (and ADX for `sqr`) is available, either at
/// compile time or through `is_x86_feature_detected!`.
#[cfg_attr(not(target_feature = "bmi2"), allow(dead_code))]
pub(super) mod mulx {
    use std::arch::x86_64::{_addcarry_u64, _addcarryx_u64, _mulx_u64};

    use crate::field::limbs::Limbs;
    use crate::field::params::FieldParams;

    /// `acc + a * b + carry` as `(low, high)` using `mulx`.
    #[inline]
    #[target_feature(enable = "bmi2")]
    unsafe fn mac(acc: u64, a: u64, b: u64, carry: u64) -> (u64, u64) {
        let mut hi = 0u64;
        let mut s0 = 0u64;
        let mut s1 = 0u64;
        let lo = _mulx_u64(a, b, &mut hi);
        let c0 = _addcarry_u64(0, lo, acc, &mut s0);
        let c1 = _addcarry_u64(0, s0, carry, &mut s1);
        (s1, hi + c0 as u64 + c1 as u64)
    }

    #[inline(always)]
    fn adc(a: u64, b: u64, carry: u64) -> (u64, u64) {
        let mut s = 0u64;
        let c = unsafe { _addcarry_u64(carry as u8, a, b, &mut s) };
        (s, c as u64)
    }

    #[inline]
    #[target_feature(enable = "bmi2")]
    pub(in crate::field::backend) unsafe fn mul<P: FieldParams>(a: &Limbs, b: &Limbs) -> Limbs {
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

    #[cfg_attr(
        not(all(target_feature = "adx", not(feature = "no-adx"))),
        allow(dead_code)
    )]
    #[inline]
    #[target_feature(enable = "bmi2,adx")]
    pub(in crate::field::backend) unsafe fn sqr<P: FieldParams>(a: &Limbs) -> Limbs {
        let n = &P::MODULUS;
        let mut t = [0u64; 8];
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

        let mut carry = 0u8;
        for i in 0..4 {
            let mut hi = 0u64;
            let lo = _mulx_u64(a[i], a[i], &mut hi);
            let (mut s0, mut s1) = (0u64, 0u64);
            carry = _addcarryx_u64(carry, t[2 * i], lo, &mut s0);
            carry = _addcarryx_u64(carry, t[2 * i + 1], hi, &mut s1);
            t[2 * i] = s0;
            t[2 * i + 1] = s1;
        }

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
}
