use std::fmt::{Debug, Display, Formatter};
use std::hash::{Hash, Hasher};
use std::io::{Read, Write};
use std::iter::{Product, Sum};
use std::marker::PhantomData;
use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign};

use ark_serialize::{
    CanonicalDeserialize, CanonicalSerialize, Compress, SerializationError, Valid, Validate,
};
use ark_std::{One, Zero};

use super::backend::{ActiveBackend, MontgomeryBackend};
use super::limbs::{self, Limbs};
use super::params::{Bn254FqParams, Bn254FrParams, FieldParams};
use crate::utils::errors::ArithError;

/// An element of the prime field described by `P`, held in Montgomery form.
///
/// Arithmetic results are coarse: their limbs may encode any integer in
/// `[0, 2p)`. Equality, hashing, formatting and serialization all reduce first,
/// so two coarse encodings of the same residue compare equal. Code that reads
/// [`Fp::limbs`] directly must call [`Fp::reduce_once`] if it needs the
/// canonical Montgomery encoding.
#[derive(Clone, Copy, Default)]
pub struct Fp<P: FieldParams> {
    limbs: Limbs,
    _marker: PhantomData<P>,
}

pub type Fr = Fp<Bn254FrParams>;
pub type Fq = Fp<Bn254FqParams>;

impl<P: FieldParams> Fp<P> {
    pub const ZERO: Self = Self::from_raw([0; 4]);
    pub const ONE: Self = Self::from_raw(P::ONE);
    pub const NUM_BYTES: usize = 32;

    /// Wraps limbs that are already in Montgomery form. They must be below `2p`.
    #[inline]
    pub const fn from_raw(limbs: Limbs) -> Self {
        #[allow(clippy::let_unit_value)]
        let () = P::SPARE_BITS;
        Self {
            limbs,
            _marker: PhantomData,
        }
    }

    /// Montgomery limbs as stored, possibly in coarse form.
    #[inline]
    pub const fn limbs(&self) -> &Limbs {
        &self.limbs
    }

    /// Converts a canonical little-endian integer into the field, reducing it
    /// modulo `p` if necessary.
    pub fn from_canonical_limbs(value: Limbs) -> Self {
        Self::from_raw(ActiveBackend::mul::<P>(&value, &P::R_SQUARED)).reduce_once()
    }

    /// Canonical integer in `[0, p)`, little-endian limbs.
    pub fn to_canonical_limbs(&self) -> Limbs {
        let r = ActiveBackend::mul::<P>(&self.limbs, &[1, 0, 0, 0]);
        ActiveBackend::reduce_once::<P>(&r)
    }

    #[inline]
    pub fn from_u64(n: u64) -> Self {
        Self::from_canonical_limbs([n, 0, 0, 0])
    }

    #[inline]
    pub fn from_i64(n: i64) -> Self {
        let mut r = Self::from_u64(n.unsigned_abs());
        r.conditional_negate((n < 0) as u64);
        r
    }

    /// Maps `[0, 2p)` to `[0, p)` with a single masked subtraction.
    #[inline]
    pub fn reduce_once(&self) -> Self {
        Self::from_raw(ActiveBackend::reduce_once::<P>(&self.limbs))
    }

    #[inline]
    pub fn self_reduce_once(&mut self) {
        self.limbs = ActiveBackend::reduce_once::<P>(&self.limbs);
    }

    /// Negates in place when `predicate` is nonzero, without branching on it.
    #[inline]
    pub fn conditional_negate(&mut self, predicate: u64) {
        ActiveBackend::conditional_negate::<P>(&mut self.limbs, predicate);
    }

    #[inline]
    pub fn sqr(&self) -> Self {
        Self::from_raw(ActiveBackend::sqr::<P>(&self.limbs))
    }

    #[inline]
    pub fn self_sqr(&mut self) {
        self.limbs = ActiveBackend::sqr::<P>(&self.limbs);
    }

    pub fn pow(&self, exp: u64) -> Self {
        self.pow_limbs(&[exp, 0, 0, 0])
    }

    /// Left-to-right square and multiply over a 256-bit exponent.
    pub fn pow_limbs(&self, exp: &Limbs) -> Self {
        let mut acc = Self::ONE;
        for limb in exp.iter().rev() {
            for bit in (0..64).rev() {
                acc.self_sqr();
                if (limb >> bit) & 1 == 1 {
                    acc *= self;
                }
            }
        }
        acc
    }

    /// `self^(p - 2)`. Zero maps to zero.
    pub fn invert(&self) -> Self {
        self.pow_limbs(&P::MODULUS_MINUS_TWO)
    }

    pub fn inverse(&self) -> Option<Self> {
        if self.is_zero() {
            None
        } else {
            Some(self.invert())
        }
    }

    /// Uniform sample by rejection on the bit length of `p`.
    pub fn random<R: rand_core::RngCore>(rng: &mut R) -> Self {
        let top_bits = 64 - P::MODULUS[3].leading_zeros();
        let top_mask = if top_bits == 64 {
            u64::MAX
        } else {
            (1u64 << top_bits) - 1
        };
        loop {
            let candidate = [
                rng.next_u64(),
                rng.next_u64(),
                rng.next_u64(),
                rng.next_u64() & top_mask,
            ];
            if !limbs::geq(&candidate, &P::MODULUS) {
                return Self::from_raw(candidate);
            }
        }
    }

    pub fn to_le_bytes(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        for (chunk, limb) in out.chunks_exact_mut(8).zip(self.to_canonical_limbs()) {
            chunk.copy_from_slice(&limb.to_le_bytes());
        }
        out
    }

    pub fn to_be_bytes(&self) -> [u8; 32] {
        let mut out = self.to_le_bytes();
        out.reverse();
        out
    }

    /// Decodes a canonical little-endian integer, rejecting values `>= p`.
    pub fn from_le_bytes(bytes: &[u8; 32]) -> Result<Self, ArithError> {
        let mut value = [0u64; 4];
        for (limb, chunk) in value.iter_mut().zip(bytes.chunks_exact(8)) {
            let mut word = [0u8; 8];
            word.copy_from_slice(chunk);
            *limb = u64::from_le_bytes(word);
        }
        if limbs::geq(&value, &P::MODULUS) {
            return Err(ArithError::NonCanonicalEncoding);
        }
        Ok(Self::from_canonical_limbs(value))
    }

    pub fn from_be_bytes(bytes: &[u8; 32]) -> Result<Self, ArithError> {
        let mut le = *bytes;
        le.reverse();
        Self::from_le_bytes(&le)
    }
}

impl<P: FieldParams> PartialEq for Fp<P> {
    fn eq(&self, other: &Self) -> bool {
        self.reduce_once().limbs == other.reduce_once().limbs
    }
}

impl<P: FieldParams> Eq for Fp<P> {}

impl<P: FieldParams> Hash for Fp<P> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.reduce_once().limbs.hash(state);
    }
}

impl<P: FieldParams> Display for Fp<P> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let v = self.to_canonical_limbs();
        write!(f, "0x{:016x}{:016x}{:016x}{:016x}", v[3], v[2], v[1], v[0])
    }
}

impl<P: FieldParams> Debug for Fp<P> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

impl<P: FieldParams> Zero for Fp<P> {
    #[inline]
    fn zero() -> Self {
        Self::ZERO
    }

    #[inline]
    fn is_zero(&self) -> bool {
        self.reduce_once().limbs == [0; 4]
    }
}

impl<P: FieldParams> One for Fp<P> {
    #[inline]
    fn one() -> Self {
        Self::ONE
    }
}

impl<P: FieldParams> Neg for Fp<P> {
    type Output = Self;

    #[inline]
    fn neg(mut self) -> Self {
        self.conditional_negate(1);
        self
    }
}

impl<P: FieldParams> AddAssign<&Fp<P>> for Fp<P> {
    #[inline]
    fn add_assign(&mut self, rhs: &Self) {
        self.limbs = ActiveBackend::add::<P>(&self.limbs, &rhs.limbs);
    }
}

impl<P: FieldParams> SubAssign<&Fp<P>> for Fp<P> {
    #[inline]
    fn sub_assign(&mut self, rhs: &Self) {
        self.limbs = ActiveBackend::sub::<P>(&self.limbs, &rhs.limbs);
    }
}

impl<P: FieldParams> MulAssign<&Fp<P>> for Fp<P> {
    #[inline]
    fn mul_assign(&mut self, rhs: &Self) {
        self.limbs = ActiveBackend::mul::<P>(&self.limbs, &rhs.limbs);
    }
}

impl<P: FieldParams> DivAssign<&Fp<P>> for Fp<P> {
    #[inline]
    fn div_assign(&mut self, rhs: &Self) {
        *self *= rhs.invert();
    }
}

macro_rules! forward_binop {
    ($op:ident, $fn:ident, $op_assign:ident, $fn_assign:ident) => {
        impl<P: FieldParams> $op_assign<Fp<P>> for Fp<P> {
            #[inline]
            fn $fn_assign(&mut self, rhs: Self) {
                $op_assign::$fn_assign(self, &rhs);
            }
        }

        impl<P: FieldParams> $op<Fp<P>> for Fp<P> {
            type Output = Self;

            #[inline]
            fn $fn(mut self, rhs: Self) -> Self {
                $op_assign::$fn_assign(&mut self, &rhs);
                self
            }
        }

        impl<'a, P: FieldParams> $op<&'a Fp<P>> for Fp<P> {
            type Output = Self;

            #[inline]
            fn $fn(mut self, rhs: &'a Self) -> Self {
                $op_assign::$fn_assign(&mut self, rhs);
                self
            }
        }

        impl<'a, 'b, P: FieldParams> $op<&'b Fp<P>> for &'a Fp<P> {
            type Output = Fp<P>;

            #[inline]
            fn $fn(self, rhs: &'b Fp<P>) -> Fp<P> {
                let mut r = *self;
                $op_assign::$fn_assign(&mut r, rhs);
                r
            }
        }
    };
}

forward_binop!(Add, add, AddAssign, add_assign);
forward_binop!(Sub, sub, SubAssign, sub_assign);
forward_binop!(Mul, mul, MulAssign, mul_assign);
forward_binop!(Div, div, DivAssign, div_assign);

impl<P: FieldParams> Sum for Fp<P> {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |acc, x| acc + x)
    }
}

impl<'a, P: FieldParams> Sum<&'a Fp<P>> for Fp<P> {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |acc, x| acc + x)
    }
}

impl<P: FieldParams> Product for Fp<P> {
    fn product<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ONE, |acc, x| acc * x)
    }
}

impl<'a, P: FieldParams> Product<&'a Fp<P>> for Fp<P> {
    fn product<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.fold(Self::ONE, |acc, x| acc * x)
    }
}

impl<P: FieldParams> CanonicalSerialize for Fp<P> {
    fn serialize_with_mode<W: Write>(
        &self,
        mut writer: W,
        _compress: Compress,
    ) -> Result<(), SerializationError> {
        writer.write_all(&self.to_le_bytes())?;
        Ok(())
    }

    fn serialized_size(&self, _compress: Compress) -> usize {
        Self::NUM_BYTES
    }
}

impl<P: FieldParams> Valid for Fp<P> {
    fn check(&self) -> Result<(), SerializationError> {
        Ok(())
    }
}

impl<P: FieldParams> CanonicalDeserialize for Fp<P> {
    fn deserialize_with_mode<R: Read>(
        mut reader: R,
        _compress: Compress,
        _validate: Validate,
    ) -> Result<Self, SerializationError> {
        let mut bytes = [0u8; 32];
        reader.read_exact(&mut bytes)?;
        Self::from_le_bytes(&bytes).map_err(|_| SerializationError::InvalidData)
    }
}
