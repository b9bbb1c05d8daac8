use std::fmt;
use std::ops::{AddAssign, Deref, DerefMut, MulAssign, Range, SubAssign};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard, TryLockError};

use ark_serialize::{
    CanonicalDeserialize, CanonicalSerialize, Compress, SerializationError, Valid, Validate,
};
use rayon::prelude::*;
use sha3::{Digest, Keccak256};

use super::arithmetic;
use super::domain::EvaluationDomain;
use crate::field::{FftField, Field, OptimizedMul};
use crate::utils::errors::ArithError;
use crate::utils::math::Math;
use crate::utils::thread::unsafe_allocate_zero_vec;

/// Extra coefficients allocated past `size` so that a left shift by one can be
/// represented by moving the window instead of copying.
pub const MAXIMUM_COEFFICIENT_SHIFT: usize = 1;

const PARALLEL_THRESHOLD: usize = 1 << 12;

type Buffer<F> = Arc<RwLock<Box<[F]>>>;

/// A window `[offset, offset + size)` into a reference-counted coefficient
/// buffer.
///
/// [`Polynomial::share`] and [`Polynomial::shifted`] hand out further windows
/// into the same buffer, and writes through any of them are visible through
/// all of them. [`Clone`] is a deep copy of the window.
///
/// The buffer is not a synchronization primitive. A polynomial can be moved to
/// or read from any thread, but writes to a shared buffer must be serialized by
/// the caller. Taking write access while any view of the buffer holds a
/// [`Coeffs`] guard panics instead of blocking.
pub struct Polynomial<F: Field> {
    backing: Buffer<F>,
    offset: usize,
    size: usize,
}

/// Read guard over a polynomial's coefficients.
pub struct Coeffs<'a, F> {
    guard: RwLockReadGuard<'a, Box<[F]>>,
    range: Range<usize>,
}

impl<F> Deref for Coeffs<'_, F> {
    type Target = [F];

    fn deref(&self) -> &[F] {
        &self.guard[self.range.clone()]
    }
}

/// Write guard over a polynomial's coefficients.
pub struct CoeffsMut<'a, F> {
    guard: RwLockWriteGuard<'a, Box<[F]>>,
    range: Range<usize>,
}

impl<F> Deref for CoeffsMut<'_, F> {
    type Target = [F];

    fn deref(&self) -> &[F] {
        &self.guard[self.range.clone()]
    }
}

impl<F> DerefMut for CoeffsMut<'_, F> {
    fn deref_mut(&mut self) -> &mut [F] {
        &mut self.guard[self.range.clone()]
    }
}

impl<F: Field> Polynomial<F> {
    fn from_backing(mut backing: Vec<F>, size: usize) -> Self {
        debug_assert!(backing.len() <= size + MAXIMUM_COEFFICIENT_SHIFT);
        backing.resize(size + MAXIMUM_COEFFICIENT_SHIFT, F::zero());
        Self {
            backing: Arc::new(RwLock::new(backing.into_boxed_slice())),
            offset: 0,
            size,
        }
    }

    /// `size` zero coefficients.
    pub fn new(size: usize) -> Self {
        Self::from_backing(vec![F::zero(); size + MAXIMUM_COEFFICIENT_SHIFT], size)
    }

    /// `size` zero coefficients obtained from a single zeroed allocation, for
    /// buffers that are about to be overwritten in bulk.
    pub fn new_unzeroed(size: usize) -> Self {
        Self::from_backing(unsafe_allocate_zero_vec(size + MAXIMUM_COEFFICIENT_SHIFT), size)
    }

    pub fn from_coeffs(coeffs: &[F]) -> Self {
        let mut backing = Vec::with_capacity(coeffs.len() + MAXIMUM_COEFFICIENT_SHIFT);
        backing.extend_from_slice(coeffs);
        Self::from_backing(backing, coeffs.len())
    }

    pub fn from_vec(coeffs: Vec<F>) -> Self {
        let size = coeffs.len();
        Self::from_backing(coeffs, size)
    }

    /// Copy of `other`, zero-padded to `max(target_size, other.size())`.
    pub fn with_target_size(other: &Self, target_size: usize) -> Self {
        let size = target_size.max(other.size);
        let mut backing = Vec::with_capacity(size + MAXIMUM_COEFFICIENT_SHIFT);
        backing.extend_from_slice(&other.coeffs());
        Self::from_backing(backing, size)
    }

    /// The polynomial of degree `< points.len()` through `(points[i], evals[i])`.
    pub fn from_interpolation(points: &[F], evals: &[F]) -> Result<Self, ArithError> {
        arithmetic::compute_interpolation(points, evals).map(Self::from_vec)
    }

    pub fn random<R: rand_core::RngCore>(size: usize, rng: &mut R) -> Self {
        Self::from_vec((0..size).map(|_| F::random(rng)).collect())
    }

    /// A new view of the same window over the same buffer.
    pub fn share(&self) -> Self {
        Self {
            backing: Arc::clone(&self.backing),
            offset: self.offset,
            size: self.size,
        }
    }

    /// For coefficients `(0, a_1, …, a_{n-1})`, a view of `(a_1, …, a_{n-1})`
    /// over the same buffer.
    pub fn shifted(&self) -> Self {
        debug_assert!(self.size > 0, "cannot shift an empty polynomial");
        debug_assert!(self.at(0).is_zero(), "shifted polynomial must start with 0");
        Self {
            backing: Arc::clone(&self.backing),
            offset: self.offset + 1,
            size: self.size.saturating_sub(1),
        }
    }

    /// Empties the window. The buffer is kept so `capacity()` stays addressable.
    pub fn clear(&mut self) {
        self.size = 0;
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn capacity(&self) -> usize {
        self.size + MAXIMUM_COEFFICIENT_SHIFT
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn is_zero(&self) -> bool {
        if self.is_empty() {
            tracing::error!("Checking is_zero on an empty Polynomial!");
            debug_assert!(false, "is_zero on an empty polynomial");
        }
        self.coeffs().iter().all(|c| c.is_zero())
    }

    fn read_buffer(&self) -> RwLockReadGuard<'_, Box<[F]>> {
        match self.backing.try_read() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                panic!("coefficient buffer is being written through another view")
            }
        }
    }

    fn write_buffer(&self) -> RwLockWriteGuard<'_, Box<[F]>> {
        match self.backing.try_write() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                panic!("coefficient buffer is borrowed through another view")
            }
        }
    }

    /// The `size` coefficients of the window.
    pub fn coeffs(&self) -> Coeffs<'_, F> {
        Coeffs {
            guard: self.read_buffer(),
            range: self.offset..self.offset + self.size,
        }
    }

    /// Mutable access to the window. Panics if any view of the buffer holds a
    /// [`Coeffs`] guard.
    pub fn coeffs_mut(&mut self) -> CoeffsMut<'_, F> {
        CoeffsMut {
            guard: self.write_buffer(),
            range: self.offset..self.offset + self.size,
        }
    }

    fn padded_coeffs(&self) -> Coeffs<'_, F> {
        Coeffs {
            guard: self.read_buffer(),
            range: self.offset..self.offset + self.capacity(),
        }
    }

    pub fn to_vec(&self) -> Vec<F> {
        self.coeffs().to_vec()
    }

    pub fn get(&self, i: usize) -> Option<F> {
        self.coeffs().get(i).copied()
    }

    /// Coefficient `i`, where `i` may reach into the shift slack.
    pub fn at(&self, i: usize) -> F {
        debug_assert!(i < self.capacity());
        self.read_buffer()[self.offset + i]
    }

    pub fn set(&mut self, i: usize, value: F) {
        debug_assert!(i < self.capacity());
        self.write_buffer()[self.offset + i] = value;
    }

    pub fn set_if_valid_index(&mut self, i: usize, value: F) {
        self.set(i, value);
    }

    /// Keccak-256 of the canonical coefficient encoding.
    pub fn hash(&self) -> [u8; 32] {
        let mut bytes = Vec::with_capacity(self.size * F::NUM_BYTES);
        for c in self.coeffs().iter() {
            c.serialize_uncompressed(&mut bytes).unwrap();
        }
        Keccak256::new().chain_update(&bytes).finalize().into()
    }

    pub fn evaluate(&self, z: F) -> F {
        arithmetic::evaluate(&self.coeffs(), z)
    }

    /// Evaluates the first `target_size` coefficients, reading anything past
    /// `size` as zero.
    pub fn evaluate_with_target_size(&self, z: F, target_size: usize) -> F {
        let coeffs = self.coeffs();
        arithmetic::evaluate(&coeffs[..target_size.min(self.size)], z)
    }

    /// Evaluates the multilinear extension of the `2^m` coefficients at
    /// `u = (u_0, …, u_{m-1})`, `u_0` binding the least significant index bit.
    ///
    /// With `shift`, evaluates the extension of `(a_1, …, a_{n-1}, 0)`, i.e. of
    /// the table whose `i`-th entry is `a_{i+1}`; `a_0` must be zero. This is
    /// not `1·L_0 + Σ_{i≥1} a_{i-1}·L_i`: the shifted table starts at `a_1`
    /// and nothing is substituted for index 0.
    #[tracing::instrument(skip_all, name = "Polynomial::evaluate_mle")]
    pub fn evaluate_mle(&self, u: &[F], shift: bool) -> F {
        if self.is_empty() {
            return F::zero();
        }
        let m = u.len();
        debug_assert_eq!(self.size, m.pow2());

        let padded = self.padded_coeffs();
        let table = if shift {
            debug_assert!(padded[0].is_zero());
            debug_assert!(padded[self.size].is_zero());
            &padded[1..]
        } else {
            &padded[..self.size]
        };
        if m == 0 {
            return table[0];
        }

        let mut current = fold_adjacent(table, u[0]);
        drop(padded);
        for u_l in &u[1..] {
            current = fold_adjacent(&current, *u_l);
        }
        current[0]
    }

    /// Binds the last `k` of the `d` variables to `u = (u_0, …, u_{k-1})`, with
    /// `u_{k-1}` binding the most significant index bit, and returns the
    /// resulting `2^{d-k}` coefficients.
    ///
    /// Each round combines entry `i` with entry `i + n/2`.
    #[tracing::instrument(skip_all, name = "Polynomial::partial_evaluate_mle")]
    pub fn partial_evaluate_mle(&self, u: &[F]) -> Self {
        let coeffs = self.coeffs();
        let m = u.len();
        debug_assert!(self.size.is_power_of_two());
        debug_assert!(self.size >= m.pow2());
        if m == 0 {
            return Self::from_coeffs(&coeffs);
        }

        let mut n_l = self.size / 2;
        let (left, right) = coeffs.split_at(n_l);
        let u_last = u[m - 1];
        let mut intermediate: Vec<F> = left
            .par_iter()
            .zip(right.par_iter())
            .with_min_len(PARALLEL_THRESHOLD)
            .map(|(a, b)| *a + u_last.mul_01_optimized(*b - *a))
            .collect();
        drop(coeffs);

        for u_l in u[..m - 1].iter().rev() {
            n_l /= 2;
            let (left, right) = intermediate[..2 * n_l].split_at_mut(n_l);
            left.par_iter_mut()
                .zip(right.par_iter())
                .with_min_len(PARALLEL_THRESHOLD)
                .for_each(|(a, b)| *a += u_l.mul_01_optimized(*b - *a));
        }
        intermediate.truncate(n_l);
        Self::from_vec(intermediate)
    }

    /// Replaces `p(X)` with `(p(X) - p(z)) / (X - z)` and returns `p(z)`.
    #[tracing::instrument(skip_all, name = "Polynomial::compute_kate_opening_coefficients")]
    pub fn compute_kate_opening_coefficients(&mut self, z: F) -> F {
        arithmetic::compute_kate_opening_coefficients(&mut self.coeffs_mut(), z)
    }

    /// Divides by `(X - r_1)⋯(X - r_m)` in place. Every `r_j` must be a root;
    /// nothing checks the remainder.
    pub fn factor_roots(&mut self, roots: &[F]) {
        arithmetic::factor_roots(&mut self.coeffs_mut(), roots);
    }

    pub fn factor_root(&mut self, root: F) {
        arithmetic::factor_root(&mut self.coeffs_mut(), root);
    }

    /// `self += scalar * other`. `other` must not be longer than `self`.
    pub fn add_scaled(&mut self, other: &[F], scalar: F) {
        debug_assert!(other.len() <= self.size);
        self.coeffs_mut()[..other.len()]
            .par_iter_mut()
            .zip(other.par_iter())
            .with_min_len(PARALLEL_THRESHOLD)
            .for_each(|(a, b)| *a += scalar * b);
    }

    /// [`Self::add_scaled`] where `other` may be a view of the same buffer.
    pub fn add_scaled_polynomial(&mut self, other: &Self, scalar: F) {
        self.with_operand(other, |this, other| this.add_scaled(other, scalar));
    }

    /// Runs `f` with `other`'s coefficients, snapshotting them first when both
    /// views share a buffer.
    fn with_operand(&mut self, other: &Self, f: impl FnOnce(&mut Self, &[F])) {
        if Arc::ptr_eq(&self.backing, &other.backing) {
            let snapshot = other.to_vec();
            f(self, &snapshot);
        } else {
            f(self, &other.coeffs());
        }
    }

    /// Sets `self` to `X^shift_size · coeffs_in`, truncated to `coeffs_in.len()`
    /// coefficients, in a fresh buffer. The last `shift_size` inputs must be
    /// zero so nothing is lost.
    pub fn set_to_right_shifted(&mut self, coeffs_in: &[F], shift_size: usize) {
        let size_in = coeffs_in.len();
        debug_assert!(size_in > 0);
        debug_assert!(shift_size <= size_in);
        debug_assert!(
            coeffs_in[size_in - shift_size..].iter().all(|c| c.is_zero()),
            "right shift would drop nonzero coefficients"
        );

        let mut backing = Vec::with_capacity(size_in + MAXIMUM_COEFFICIENT_SHIFT);
        backing.resize(shift_size, F::zero());
        backing.extend_from_slice(&coeffs_in[..size_in - shift_size]);
        *self = Self::from_backing(backing, size_in);
    }
}

/// `(a_{2i}, a_{2i+1}) -> a_{2i} + r (a_{2i+1} - a_{2i})`.
fn fold_adjacent<F: Field>(evals: &[F], r: F) -> Vec<F> {
    evals
        .par_chunks_exact(2)
        .with_min_len(PARALLEL_THRESHOLD)
        .map(|pair| pair[0] + r.mul_01_optimized(pair[1] - pair[0]))
        .collect()
}

impl<F: FftField> Polynomial<F> {
    fn window_for(&mut self, domain_size: usize) -> CoeffsMut<'_, F> {
        debug_assert!(
            self.size >= domain_size,
            "polynomial of size {} cannot hold {} evaluations",
            self.size,
            domain_size
        );
        self.coeffs_mut()
    }

    #[tracing::instrument(skip_all, name = "Polynomial::fft")]
    pub fn fft(&mut self, domain: &EvaluationDomain<F>) {
        arithmetic::fft(&mut self.window_for(domain.size), domain);
    }

    pub fn partial_fft(&mut self, domain: &EvaluationDomain<F>, constant: F, is_coset: bool) {
        arithmetic::partial_fft(&mut self.window_for(domain.size), domain, constant, is_coset);
    }

    #[tracing::instrument(skip_all, name = "Polynomial::coset_fft")]
    pub fn coset_fft(&mut self, domain: &EvaluationDomain<F>) {
        arithmetic::coset_fft(&mut self.window_for(domain.size), domain);
    }

    /// Coset FFT of the first `domain.size` coefficients over the
    /// `extension`-times larger `large_domain`.
    #[tracing::instrument(skip_all, name = "Polynomial::coset_fft_extended")]
    pub fn coset_fft_extended(
        &mut self,
        domain: &EvaluationDomain<F>,
        large_domain: &EvaluationDomain<F>,
        extension: usize,
    ) {
        arithmetic::coset_fft_extended(
            &mut self.window_for(large_domain.size),
            domain,
            large_domain,
            extension,
        );
    }

    pub fn coset_fft_with_constant(&mut self, domain: &EvaluationDomain<F>, constant: F) {
        arithmetic::coset_fft_with_constant(&mut self.window_for(domain.size), domain, constant);
    }

    pub fn coset_fft_with_generator_shift(&mut self, domain: &EvaluationDomain<F>, constant: F) {
        arithmetic::coset_fft_with_generator_shift(
            &mut self.window_for(domain.size),
            domain,
            constant,
        );
    }

    #[tracing::instrument(skip_all, name = "Polynomial::ifft")]
    pub fn ifft(&mut self, domain: &EvaluationDomain<F>) {
        arithmetic::ifft(&mut self.window_for(domain.size), domain);
    }

    pub fn ifft_with_constant(&mut self, domain: &EvaluationDomain<F>, constant: F) {
        arithmetic::ifft_with_constant(&mut self.window_for(domain.size), domain, constant);
    }

    #[tracing::instrument(skip_all, name = "Polynomial::coset_ifft")]
    pub fn coset_ifft(&mut self, domain: &EvaluationDomain<F>) {
        arithmetic::coset_ifft(&mut self.window_for(domain.size), domain);
    }

    /// Treats the coefficients as evaluations over `domain` and evaluates the
    /// interpolant at `z`.
    pub fn compute_barycentric_evaluation(&self, z: F, domain: &EvaluationDomain<F>) -> F {
        arithmetic::compute_barycentric_evaluation(&self.coeffs(), z, domain)
    }

    /// Treats the coefficients as evaluations over the coset of `large_domain`
    /// of a polynomial of degree `< small_domain.size` and evaluates it at `z`.
    pub fn evaluate_from_fft(
        &self,
        large_domain: &EvaluationDomain<F>,
        z: F,
        small_domain: &EvaluationDomain<F>,
    ) -> F {
        arithmetic::evaluate_from_fft(&self.coeffs(), large_domain, z, small_domain)
    }
}

impl<F: Field> Default for Polynomial<F> {
    fn default() -> Self {
        Self::new(0)
    }
}

impl<F: Field> Clone for Polynomial<F> {
    fn clone(&self) -> Self {
        Self::with_target_size(self, self.size)
    }
}

impl<F: Field> PartialEq for Polynomial<F> {
    fn eq(&self, other: &Self) -> bool {
        self.size == other.size && *self.coeffs() == *other.coeffs()
    }
}

impl<F: Field> Eq for Polynomial<F> {}

impl<F: Field> AddAssign<&[F]> for Polynomial<F> {
    fn add_assign(&mut self, other: &[F]) {
        debug_assert!(other.len() <= self.size);
        self.coeffs_mut()[..other.len()]
            .par_iter_mut()
            .zip(other.par_iter())
            .with_min_len(PARALLEL_THRESHOLD)
            .for_each(|(a, b)| *a += b);
    }
}

impl<F: Field> SubAssign<&[F]> for Polynomial<F> {
    fn sub_assign(&mut self, other: &[F]) {
        debug_assert!(other.len() <= self.size);
        self.coeffs_mut()[..other.len()]
            .par_iter_mut()
            .zip(other.par_iter())
            .with_min_len(PARALLEL_THRESHOLD)
            .for_each(|(a, b)| *a -= b);
    }
}

impl<F: Field> AddAssign<&Polynomial<F>> for Polynomial<F> {
    fn add_assign(&mut self, other: &Polynomial<F>) {
        self.with_operand(other, |this, other| *this += other);
    }
}

impl<F: Field> SubAssign<&Polynomial<F>> for Polynomial<F> {
    fn sub_assign(&mut self, other: &Polynomial<F>) {
        self.with_operand(other, |this, other| *this -= other);
    }
}

impl<F: Field> MulAssign<F> for Polynomial<F> {
    fn mul_assign(&mut self, scalar: F) {
        self.coeffs_mut()
            .par_iter_mut()
            .with_min_len(PARALLEL_THRESHOLD)
            .for_each(|c| *c *= scalar);
    }
}

impl<F: Field> fmt::Display for Polynomial<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let coeffs = self.coeffs();
        match coeffs.len() {
            0 => write!(f, "[]"),
            1 => write!(f, "[ data {}]", coeffs[0]),
            n => write!(
                f,
                "[ data\n  {},\n  {},\n  ... ,\n  {},\n  {},\n]",
                coeffs[0],
                coeffs[1],
                coeffs[n - 2],
                coeffs[n - 1]
            ),
        }
    }
}

impl<F: Field> fmt::Debug for Polynomial<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Polynomial")
            .field("size", &self.size)
            .field("coeffs", &&*self.coeffs())
            .finish()
    }
}

impl<F: Field> CanonicalSerialize for Polynomial<F> {
    fn serialize_with_mode<W: std::io::Write>(
        &self,
        writer: W,
        compress: Compress,
    ) -> Result<(), SerializationError> {
        self.coeffs().to_vec().serialize_with_mode(writer, compress)
    }

    fn serialized_size(&self, compress: Compress) -> usize {
        self.coeffs().to_vec().serialized_size(compress)
    }
}

impl<F: Field> Valid for Polynomial<F> {
    fn check(&self) -> Result<(), SerializationError> {
        self.coeffs().iter().try_for_each(|c| c.check())
    }
}

impl<F: Field> CanonicalDeserialize for Polynomial<F> {
    fn deserialize_with_mode<R: std::io::Read>(
        reader: R,
        compress: Compress,
        validate: Validate,
    ) -> Result<Self, SerializationError> {
        Vec::<F>::deserialize_with_mode(reader, compress, validate).map(Self::from_vec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{Fq, Fr};
    use crate::poly::PolynomialSpan;
    use ark_std::{test_rng, One, Zero};
    use rand_chacha::ChaCha20Rng;
    use rand_core::SeedableRng;

    fn fr(values: &[u64]) -> Vec<Fr> {
        values.iter().map(|v| Fr::from_u64(*v)).collect()
    }

    #[test]
    fn concrete_evaluations() {
        let p = Polynomial::from_coeffs(&fr(&[1, 2, 3, 4]));
        assert_eq!(p.evaluate(Fr::from_u64(2)), Fr::from_u64(49));
        assert_eq!(p.evaluate_mle(&fr(&[0, 0]), false), Fr::from_u64(1));
        assert_eq!(p.evaluate_mle(&fr(&[1, 0]), false), Fr::from_u64(2));
        assert_eq!(p.evaluate_mle(&fr(&[0, 1]), false), Fr::from_u64(3));
        assert_eq!(p.evaluate_mle(&fr(&[1, 1]), false), Fr::from_u64(4));
    }

    #[test]
    fn evaluate_with_target_size() {
        let p = Polynomial::from_coeffs(&fr(&[1, 2, 3, 4]));
        let z = Fr::from_u64(3);
        assert_eq!(p.evaluate_with_target_size(z, 2), Fr::from_u64(7));
        assert_eq!(p.evaluate_with_target_size(z, 16), p.evaluate(z));

        let padded = Polynomial::with_target_size(&p, 16);
        assert_eq!(padded.size(), 16);
        assert_eq!(padded.evaluate(z), p.evaluate(z));
    }

    #[test]
    fn mle_matches_table_on_hypercube() {
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        let m = 5;
        let p = Polynomial::<Fr>::random(1 << m, &mut rng);
        for index in 0..1usize << m {
            let u: Vec<Fr> = (0..m).map(|k| Fr::from_u64(((index >> k) & 1) as u64)).collect();
            assert_eq!(p.evaluate_mle(&u, false), p.at(index));
        }
    }

    #[test]
    fn mle_is_multilinear_in_each_variable() {
        let mut rng = test_rng();
        let p = Polynomial::<Fr>::random(16, &mut rng);
        let u: Vec<Fr> = (0..4).map(|_| <Fr as Field>::random(&mut rng)).collect();
        for k in 0..4 {
            let at = |x: Fr| {
                let mut point = u.clone();
                point[k] = x;
                p.evaluate_mle(&point, false)
            };
            let (e0, e1) = (at(Fr::zero()), at(Fr::one()));
            assert_eq!(at(u[k]), e0 + u[k] * (e1 - e0));
        }
    }

    #[test]
    fn shifted_mle_reads_next_entry() {
        let mut rng = test_rng();
        let mut coeffs: Vec<Fr> = (0..8).map(|_| <Fr as Field>::random(&mut rng)).collect();
        coeffs[0] = Fr::zero();
        let p = Polynomial::from_coeffs(&coeffs);

        for index in 0..8usize {
            let u: Vec<Fr> = (0..3).map(|k| Fr::from_u64(((index >> k) & 1) as u64)).collect();
            let expected = if index < 7 { coeffs[index + 1] } else { Fr::zero() };
            assert_eq!(p.evaluate_mle(&u, true), expected);
        }

        let u: Vec<Fr> = (0..3).map(|_| <Fr as Field>::random(&mut rng)).collect();
        let mut shifted_table = coeffs[1..].to_vec();
        shifted_table.push(Fr::zero());
        assert_eq!(
            p.evaluate_mle(&u, true),
            Polynomial::from_vec(shifted_table).evaluate_mle(&u, false)
        );
    }

    #[test]
    fn mle_of_empty_and_constant() {
        assert!(Polynomial::<Fr>::new(0).evaluate_mle(&[], false).is_zero());
        let p = Polynomial::from_coeffs(&fr(&[9]));
        assert_eq!(p.evaluate_mle(&[], false), Fr::from_u64(9));
    }

    #[test]
    fn partial_evaluation_binds_trailing_variables() {
        let mut rng = test_rng();
        let p = Polynomial::<Fr>::random(32, &mut rng);
        let u: Vec<Fr> = (0..5).map(|_| <Fr as Field>::random(&mut rng)).collect();

        let g = p.partial_evaluate_mle(&u[3..]);
        assert_eq!(g.size(), 8);
        assert_eq!(g.evaluate_mle(&u[..3], false), p.evaluate_mle(&u, false));

        let full = p.partial_evaluate_mle(&u);
        assert_eq!(full.size(), 1);
        assert_eq!(full.at(0), p.evaluate_mle(&u, false));

        assert_eq!(p.partial_evaluate_mle(&[]), p);
    }

    #[test]
    fn partial_evaluation_composes() {
        let mut rng = test_rng();
        let p = Polynomial::<Fr>::random(64, &mut rng);
        let u: Vec<Fr> = (0..4).map(|_| <Fr as Field>::random(&mut rng)).collect();

        let mut stepwise = p.clone();
        for u_l in u.iter().rev() {
            stepwise = stepwise.partial_evaluate_mle(std::slice::from_ref(u_l));
        }
        assert_eq!(stepwise, p.partial_evaluate_mle(&u));
    }

    #[test]
    fn fft_round_trips() {
        let mut rng = test_rng();
        let domain = EvaluationDomain::<Fr>::new(256).unwrap();
        let p = Polynomial::<Fr>::random(256, &mut rng);

        let mut q = p.clone();
        q.fft(&domain);
        assert_eq!(q.at(3), p.evaluate(domain.element(3)));
        q.ifft(&domain);
        assert_eq!(q, p);

        q.coset_fft(&domain);
        assert_eq!(q.at(5), p.evaluate(domain.generator * domain.element(5)));
        q.coset_ifft(&domain);
        assert_eq!(q, p);

        let c = Fr::from_u64(17);
        q.fft(&domain);
        q.ifft_with_constant(&domain, c);
        let mut expected = p.clone();
        expected *= c;
        assert_eq!(q, expected);
    }

    #[test]
    fn fft_only_touches_domain_prefix() {
        let mut rng = test_rng();
        let domain = EvaluationDomain::<Fr>::new(8).unwrap();
        let p = Polynomial::<Fr>::random(12, &mut rng);
        let mut q = p.clone();
        q.fft(&domain);
        q.ifft(&domain);
        assert_eq!(q, p);
        assert_eq!(q.at(10), p.at(10));
    }

    #[test]
    fn extended_coset_fft() {
        let mut rng = test_rng();
        let small = EvaluationDomain::<Fr>::new(8).unwrap();
        let large = EvaluationDomain::<Fr>::new(32).unwrap();
        let p = Polynomial::<Fr>::random(8, &mut rng);

        let mut q = Polynomial::with_target_size(&p, 32);
        q.coset_fft_extended(&small, &large, 4);
        for k in [0, 1, 7, 31] {
            assert_eq!(q.at(k), p.evaluate(large.generator * large.element(k)));
        }
        assert_eq!(q.evaluate_from_fft(&large, Fr::from_u64(5), &small), p.evaluate(Fr::from_u64(5)));
    }

    #[test]
    fn barycentric_evaluation() {
        let mut rng = test_rng();
        let domain = EvaluationDomain::<Fr>::new(32).unwrap();
        let p = Polynomial::<Fr>::random(32, &mut rng);
        let mut evals = p.clone();
        evals.fft(&domain);
        let z = <Fr as Field>::random(&mut rng);
        assert_eq!(evals.compute_barycentric_evaluation(z, &domain), p.evaluate(z));
    }

    #[test]
    fn partial_fft_rows() {
        let mut rng = test_rng();
        let domain = EvaluationDomain::<Fr>::new(8).unwrap();
        let p = Polynomial::<Fr>::random(8, &mut rng);
        let mut q = p.clone();
        q.partial_fft(&domain, Fr::one(), false);
        // Row 3 (s = 0) holds Σ_j Y_{i+2j} ω^{i+2j}.
        let expected: Fr = (0..4)
            .map(|j| p.at(1 + 2 * j) * domain.element(1 + 2 * j))
            .sum();
        assert_eq!(q.at(6 + 1), expected);
    }

    #[test]
    fn kate_opening() {
        let mut rng = test_rng();
        let p = Polynomial::<Fr>::random(16, &mut rng);
        let z = <Fr as Field>::random(&mut rng);
        let mut q = p.clone();
        let f = q.compute_kate_opening_coefficients(z);
        assert_eq!(f, p.evaluate(z));

        let x = Fr::from_u64(1234);
        assert_eq!(q.evaluate(x) * (x - z), p.evaluate(x) - f);
    }

    #[test]
    fn synthetic_division_by_root() {
        let mut rng = test_rng();
        let mut p = Polynomial::<Fr>::random(10, &mut rng);
        let r = <Fr as Field>::random(&mut rng);
        // Force p(r) = 0.
        let value = p.evaluate(r);
        p.set(0, p.at(0) - value);
        let original = p.clone();

        p.factor_roots(&[r]);
        assert!(p.at(9).is_zero());
        for x in [2u64, 3, 99] {
            let x = Fr::from_u64(x);
            assert_eq!(p.evaluate(x), original.evaluate(x) / (x - r));
        }

        let mut single = original.clone();
        single.factor_root(r);
        assert_eq!(single, p);
    }

    #[test]
    fn factor_zero_and_nonzero_roots() {
        // X^2 (X - 3)(X - 4)
        let mut p = Polynomial::from_coeffs(&[
            Fr::zero(),
            Fr::zero(),
            Fr::from_u64(12),
            Fr::from_i64(-7),
            Fr::one(),
            Fr::zero(),
        ]);
        p.factor_roots(&[Fr::from_u64(3), Fr::zero(), Fr::from_u64(4), Fr::zero()]);
        let mut expected = vec![Fr::one()];
        expected.resize(6, Fr::zero());
        assert_eq!(p.to_vec(), expected);
    }

    #[test]
    fn interpolation() {
        let points = fr(&[1, 2, 3, 0]);
        let evals = fr(&[5, 11, 21, 3]);
        // 2X^2 + 3
        let p = Polynomial::from_interpolation(&points, &evals).unwrap();
        assert_eq!(p.to_vec(), fr(&[3, 0, 2, 0]));
        assert!(Polynomial::from_interpolation(&points, &evals[..3]).is_err());
    }

    #[test]
    fn shared_views_alias() {
        let mut p = Polynomial::from_coeffs(&fr(&[0, 1, 2, 3]));
        let view = p.share();
        let shifted = p.shifted();
        p.set(1, Fr::from_u64(10));

        assert_eq!(view.at(1), Fr::from_u64(10));
        assert_eq!(shifted.size(), 3);
        assert_eq!(shifted.to_vec(), fr(&[10, 2, 3]));
        assert_eq!(shifted.at(3), Fr::zero());

        let deep = p.clone();
        p.set(2, Fr::from_u64(20));
        assert_eq!(deep.at(2), Fr::from_u64(2));
        assert_eq!(view.at(2), Fr::from_u64(20));
    }

    #[test]
    fn linear_combinations() {
        let mut p = Polynomial::from_coeffs(&fr(&[1, 2, 3, 4]));
        p += fr(&[1, 1]).as_slice();
        assert_eq!(p.to_vec(), fr(&[2, 3, 3, 4]));
        p -= fr(&[2, 3, 3]).as_slice();
        assert_eq!(p.to_vec(), fr(&[0, 0, 0, 4]));
        p.add_scaled(&fr(&[1, 2, 3, 4]), Fr::from_u64(2));
        assert_eq!(p.to_vec(), fr(&[2, 4, 6, 12]));
        p *= Fr::from_u64(3);
        assert_eq!(p.to_vec(), fr(&[6, 12, 18, 36]));
    }

    #[test]
    fn operations_between_views_of_one_buffer() {
        let mut p = Polynomial::from_coeffs(&fr(&[0, 1, 2, 3]));
        let shifted = p.shifted();
        p += &shifted;
        assert_eq!(p.to_vec(), fr(&[1, 3, 5, 3]));

        let view = p.share();
        p -= &view;
        assert!(p.is_zero());

        let other = Polynomial::from_coeffs(&fr(&[1, 1]));
        p.add_scaled_polynomial(&other, Fr::from_u64(5));
        assert_eq!(p.to_vec(), fr(&[5, 5, 0, 0]));
        let view = p.share();
        p.add_scaled_polynomial(&view, Fr::from_u64(2));
        assert_eq!(p.to_vec(), fr(&[15, 15, 0, 0]));
    }

    #[test]
    fn operations_with_spans_of_one_buffer() {
        let mut p = Polynomial::from_coeffs(&fr(&[0, 1, 2, 3]));
        let view = p.shifted();
        let span = PolynomialSpan::from(&view);
        p.add_scaled(&span, Fr::one());
        assert_eq!(p.to_vec(), fr(&[1, 3, 5, 3]));
        assert_eq!(view.to_vec(), fr(&[3, 5, 3]));

        p += &span[..];
        assert_eq!(p.to_vec(), fr(&[2, 5, 8, 3]));
        p -= &span.subspan(0, 2)[..];
        assert_eq!(p.to_vec(), fr(&[1, 3, 8, 3]));
    }

    #[test]
    #[should_panic(expected = "coefficient buffer is borrowed through another view")]
    fn write_while_another_view_is_read() {
        let mut p = Polynomial::from_coeffs(&fr(&[0, 1, 2]));
        let view = p.share();
        let coeffs = view.coeffs();
        p.set(0, Fr::one());
        drop(coeffs);
    }

    #[test]
    fn polynomials_move_across_threads() {
        let polys: Vec<Polynomial<Fr>> = (0..4)
            .into_par_iter()
            .map(|i| Polynomial::new(1 << i))
            .collect();
        let sizes: Vec<usize> = polys.iter().map(Polynomial::size).collect();
        assert_eq!(sizes, vec![1, 2, 4, 8]);

        let p = Polynomial::from_coeffs(&fr(&[1, 2, 3]));
        let view = p.share();
        let handle = std::thread::spawn(move || p.evaluate(Fr::from_u64(2)));
        assert_eq!(handle.join().unwrap(), Fr::from_u64(17));
        assert_eq!(view.to_vec(), fr(&[1, 2, 3]));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "is_zero on an empty polynomial")]
    fn is_zero_of_empty_polynomial() {
        let _ = Polynomial::<Fr>::new(0).is_zero();
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "right shift would drop nonzero coefficients")]
    fn right_shift_dropping_coefficients() {
        let mut p = Polynomial::new(0);
        p.set_to_right_shifted(&fr(&[1, 2, 3, 4]), 2);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "shifted polynomial must start with 0")]
    fn shift_with_nonzero_constant_term() {
        let p = Polynomial::from_coeffs(&fr(&[1, 2, 3]));
        let _ = p.shifted();
    }

    #[test]
    fn right_shift() {
        let mut p = Polynomial::new(2);
        p.set_to_right_shifted(&fr(&[1, 2, 3, 0, 0]), 2);
        assert_eq!(p.to_vec(), fr(&[0, 0, 1, 2, 3]));
        assert_eq!(p.shifted().shifted().to_vec(), fr(&[1, 2, 3]));
    }

    #[test]
    fn equality_zero_and_clear() {
        let a = Polynomial::from_coeffs(&fr(&[1, 2]));
        let b = Polynomial::from_vec(fr(&[1, 2]));
        assert_eq!(a, b);
        assert_ne!(a, Polynomial::from_coeffs(&fr(&[1, 2, 0])));
        assert!(Polynomial::<Fr>::new(4).is_zero());
        assert!(Polynomial::<Fr>::new_unzeroed(4).is_zero());

        let mut c = a.clone();
        c.clear();
        assert!(c.is_empty());
        assert_eq!(c.capacity(), 1);
        assert_eq!(c, Polynomial::default());
    }

    #[test]
    fn hash_depends_on_values_only() {
        let a = Polynomial::from_coeffs(&fr(&[1, 2, 3]));
        let b = Polynomial::from_vec(fr(&[1, 2, 3]));
        assert_eq!(a.hash(), b.hash());
        assert_ne!(a.hash(), Polynomial::from_coeffs(&fr(&[1, 2, 4])).hash());
    }

    #[test]
    fn display() {
        assert_eq!(Polynomial::<Fr>::new(0).to_string(), "[]");
        let one = Polynomial::from_coeffs(&fr(&[1]));
        assert_eq!(one.to_string(), format!("[ data {}]", Fr::one()));
        let p = Polynomial::from_coeffs(&fr(&[1, 2, 3, 4, 5]));
        let expected = format!(
            "[ data\n  {},\n  {},\n  ... ,\n  {},\n  {},\n]",
            Fr::from_u64(1),
            Fr::from_u64(2),
            Fr::from_u64(4),
            Fr::from_u64(5)
        );
        assert_eq!(p.to_string(), expected);
    }

    #[test]
    fn serialization_round_trip() {
        let mut rng = test_rng();
        let p = Polynomial::<Fr>::random(9, &mut rng);
        let mut bytes = Vec::new();
        p.serialize_compressed(&mut bytes).unwrap();
        assert_eq!(bytes.len(), p.serialized_size(Compress::Yes));
        let q = Polynomial::<Fr>::deserialize_compressed(&bytes[..]).unwrap();
        assert_eq!(p, q);
    }

    #[test]
    fn base_field_polynomials_without_fft() {
        let p = Polynomial::from_coeffs(&[Fq::from_u64(1), Fq::from_u64(1)]);
        assert_eq!(p.evaluate(Fq::from_u64(41)), Fq::from_u64(42));
    }
}
