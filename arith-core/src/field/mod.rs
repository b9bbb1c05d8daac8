use std::fmt::{Debug, Display};
use std::hash::Hash;
use std::ops::{Add, AddAssign, Div, Mul, MulAssign, Neg, Sub, SubAssign};

use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_std::{One, Zero};

pub mod ark;
pub mod backend;
pub mod element;
pub mod limbs;
pub mod params;

pub use element::{Fp, Fq, Fr};
pub use params::{Bn254FqParams, Bn254FrParams, FftParams, FieldParams};

pub trait FieldOps<Rhs = Self, Output = Self>:
    Add<Rhs, Output = Output>
    + Sub<Rhs, Output = Output>
    + Mul<Rhs, Output = Output>
    + Div<Rhs, Output = Output>
{
}

/// The field interface polynomials are written against.
pub trait Field:
    'static
    + Sized
    + Zero
    + One
    + Neg<Output = Self>
    + FieldOps<Self, Self>
    + for<'a> FieldOps<&'a Self, Self>
    + AddAssign<Self>
    + SubAssign<Self>
    + MulAssign<Self>
    + for<'a> AddAssign<&'a Self>
    + for<'a> SubAssign<&'a Self>
    + for<'a> MulAssign<&'a Self>
    + core::iter::Sum<Self>
    + for<'a> core::iter::Sum<&'a Self>
    + core::iter::Product<Self>
    + for<'a> core::iter::Product<&'a Self>
    + Eq
    + Copy
    + Sync
    + Send
    + Display
    + Debug
    + Default
    + CanonicalSerialize
    + CanonicalDeserialize
    + Hash
{
    /// Number of bytes occupied by a single field element.
    const NUM_BYTES: usize;

    fn random<R: rand_core::RngCore>(rng: &mut R) -> Self;
    fn from_u64(n: u64) -> Self;
    fn from_i64(n: i64) -> Self;
    fn square(&self) -> Self;
    fn pow(&self, exp: u64) -> Self;
    fn inverse(&self) -> Option<Self>;
}

/// Fields carrying a multiplicative subgroup of order `2^TWO_ADICITY`.
///
/// Radix-2 FFTs, evaluation domains and the coset transforms are only
/// available for polynomials over such fields. Instantiating them over a field
/// without this capability is a type error.
pub trait FftField: Field {
    const TWO_ADICITY: u32;

    /// Generator of the whole multiplicative group; also the default coset shift.
    fn multiplicative_generator() -> Self;

    /// A primitive `2^TWO_ADICITY`-th root of unity.
    fn two_adic_root_of_unity() -> Self;

    /// A primitive `2^log_n`-th root of unity, if the field has one.
    fn get_root_of_unity(log_n: u32) -> Option<Self> {
        if log_n > Self::TWO_ADICITY {
            return None;
        }
        let mut omega = Self::two_adic_root_of_unity();
        for _ in log_n..Self::TWO_ADICITY {
            omega = omega.square();
        }
        Some(omega)
    }
}

impl<P: FieldParams> FieldOps for Fp<P> {}
impl<P: FieldParams> FieldOps<&Fp<P>, Fp<P>> for Fp<P> {}
impl<P: FieldParams> FieldOps<&Fp<P>, Fp<P>> for &Fp<P> {}

impl<P: FieldParams> Field for Fp<P> {
    const NUM_BYTES: usize = 32;

    fn random<R: rand_core::RngCore>(rng: &mut R) -> Self {
        Fp::random(rng)
    }

    #[inline]
    fn from_u64(n: u64) -> Self {
        Fp::from_u64(n)
    }

    #[inline]
    fn from_i64(n: i64) -> Self {
        Fp::from_i64(n)
    }

    #[inline]
    fn square(&self) -> Self {
        self.sqr()
    }

    fn pow(&self, exp: u64) -> Self {
        Fp::pow(self, exp)
    }

    fn inverse(&self) -> Option<Self> {
        Fp::inverse(self)
    }
}

impl<P: FftParams> FftField for Fp<P> {
    const TWO_ADICITY: u32 = P::TWO_ADICITY;

    fn multiplicative_generator() -> Self {
        Fp::from_u64(P::GENERATOR)
    }

    fn two_adic_root_of_unity() -> Self {
        Self::multiplicative_generator().pow_limbs(&P::TRACE)
    }
}

pub trait OptimizedMul<Rhs, Output>: Sized + Mul<Rhs, Output = Output> {
    fn mul_0_optimized(self, other: Rhs) -> Self::Output;
    fn mul_1_optimized(self, other: Rhs) -> Self::Output;
    fn mul_01_optimized(self, other: Rhs) -> Self::Output;
}

impl<T> OptimizedMul<T, T> for T
where
    T: Field,
{
    #[inline(always)]
    fn mul_0_optimized(self, other: T) -> T {
        if self.is_zero() || other.is_zero() {
            Self::zero()
        } else {
            self * other
        }
    }

    #[inline(always)]
    fn mul_1_optimized(self, other: T) -> T {
        if self.is_one() {
            other
        } else if other.is_one() {
            self
        } else {
            self * other
        }
    }

    #[inline(always)]
    fn mul_01_optimized(self, other: T) -> T {
        if self.is_zero() || other.is_zero() {
            Self::zero()
        } else {
            self.mul_1_optimized(other)
        }
    }
}
