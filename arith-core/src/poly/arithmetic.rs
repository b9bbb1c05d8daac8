//! Slice-level polynomial algorithms. [`super::Polynomial`] forwards to these
//! after resolving its logical window.

use ark_std::{One, Zero};
use rayon::prelude::*;

use super::batch_inverse::par_batch_inverse;
use super::domain::EvaluationDomain;
use crate::field::{FftField, Field};
use crate::utils::errors::ArithError;
use crate::utils::thread::unsafe_allocate_zero_vec;

/// Work per task for the chunked power and Horner loops.
const CHUNK_SIZE: usize = 1 << 12;
/// Half-block size above which a single butterfly block is split across threads.
const PARALLEL_BUTTERFLY_THRESHOLD: usize = 1 << 10;

/// `base^0, …, base^{n-1}`.
pub fn compute_powers<F: Field>(base: F, n: usize) -> Vec<F> {
    let mut powers = unsafe_allocate_zero_vec(n);
    let chunk_base = base.pow(CHUNK_SIZE as u64);
    powers
        .par_chunks_mut(CHUNK_SIZE)
        .enumerate()
        .for_each(|(chunk_index, chunk)| {
            let mut acc = chunk_base.pow(chunk_index as u64);
            for p in chunk.iter_mut() {
                *p = acc;
                acc *= base;
            }
        });
    powers
}

/// `coeffs[i] <- coeffs[i] * constant * base^i`.
pub fn scale_by_powers<F: Field>(coeffs: &mut [F], constant: F, base: F) {
    let chunk_base = base.pow(CHUNK_SIZE as u64);
    coeffs
        .par_chunks_mut(CHUNK_SIZE)
        .enumerate()
        .for_each(|(chunk_index, chunk)| {
            let mut acc = constant * chunk_base.pow(chunk_index as u64);
            for c in chunk.iter_mut() {
                *c *= acc;
                acc *= base;
            }
        });
}

fn scale<F: Field>(coeffs: &mut [F], constant: F) {
    coeffs.par_iter_mut().for_each(|c| *c *= constant);
}

pub fn bit_reverse_permutation<T>(a: &mut [T]) {
    let n = a.len();
    if n <= 2 {
        return;
    }
    debug_assert!(n.is_power_of_two());
    let shift = usize::BITS - n.trailing_zeros();
    for i in 0..n {
        let j = i.reverse_bits() >> shift;
        if i < j {
            a.swap(i, j);
        }
    }
}

#[inline(always)]
fn butterfly<F: Field>(x: &mut F, y: &mut F, w: &F) {
    let t = *y * w;
    *y = *x - t;
    *x += t;
}

/// Iterative radix-2 decimation in time. `twiddles[k] = ω^k` for `k < n/2`.
fn fft_inner<F: Field>(a: &mut [F], twiddles: &[F]) {
    let n = a.len();
    if n <= 1 {
        return;
    }
    debug_assert!(n.is_power_of_two());
    debug_assert_eq!(twiddles.len(), n / 2);
    bit_reverse_permutation(a);

    let mut half = 1;
    while half < n {
        let stride = n / (2 * half);
        a.par_chunks_mut(2 * half).for_each(|block| {
            let (lo, hi) = block.split_at_mut(half);
            if half >= PARALLEL_BUTTERFLY_THRESHOLD {
                lo.par_iter_mut()
                    .zip(hi.par_iter_mut())
                    .enumerate()
                    .for_each(|(j, (x, y))| butterfly(x, y, &twiddles[j * stride]));
            } else {
                for (j, (x, y)) in lo.iter_mut().zip(hi.iter_mut()).enumerate() {
                    butterfly(x, y, &twiddles[j * stride]);
                }
            }
        });
        half *= 2;
    }
}

/// Coefficients to evaluations over `domain`, in place.
#[tracing::instrument(skip_all, name = "arithmetic::fft")]
pub fn fft<F: FftField>(coeffs: &mut [F], domain: &EvaluationDomain<F>) {
    fft_inner(&mut coeffs[..domain.size], domain.roots());
}

#[tracing::instrument(skip_all, name = "arithmetic::ifft")]
pub fn ifft<F: FftField>(coeffs: &mut [F], domain: &EvaluationDomain<F>) {
    ifft_with_constant(coeffs, domain, F::one());
}

/// Inverse FFT whose output is additionally scaled by `constant`.
pub fn ifft_with_constant<F: FftField>(coeffs: &mut [F], domain: &EvaluationDomain<F>, constant: F) {
    let coeffs = &mut coeffs[..domain.size];
    fft_inner(coeffs, domain.inverse_roots());
    scale(coeffs, domain.domain_inverse * constant);
}

/// Evaluations over `g·H` where `g` is the domain's coset generator.
pub fn coset_fft<F: FftField>(coeffs: &mut [F], domain: &EvaluationDomain<F>) {
    coset_fft_with_constant(coeffs, domain, F::one());
}

/// Coset FFT of `constant * p(X)`.
pub fn coset_fft_with_constant<F: FftField>(
    coeffs: &mut [F],
    domain: &EvaluationDomain<F>,
    constant: F,
) {
    scale_by_powers(&mut coeffs[..domain.size], constant, domain.generator);
    fft(coeffs, domain);
}

/// Evaluations of `p(X)` over `(g·c)·H`.
pub fn coset_fft_with_generator_shift<F: FftField>(
    coeffs: &mut [F],
    domain: &EvaluationDomain<F>,
    constant: F,
) {
    scale_by_powers(
        &mut coeffs[..domain.size],
        F::one(),
        domain.generator * constant,
    );
    fft(coeffs, domain);
}

pub fn coset_ifft<F: FftField>(coeffs: &mut [F], domain: &EvaluationDomain<F>) {
    ifft(coeffs, domain);
    scale_by_powers(
        &mut coeffs[..domain.size],
        F::one(),
        domain.generator_inverse,
    );
}

/// Evaluates the first `small_domain.size` coefficients over the coset of the
/// `extension` times larger domain, writing `large_domain.size` evaluations.
///
/// Point `k = i·extension + j` of `g·H_large` equals `g·ω_large^j·ω_small^i`,
/// so each residue class `j` is one small coset FFT.
#[tracing::instrument(skip_all, name = "arithmetic::coset_fft_extended")]
pub fn coset_fft_extended<F: FftField>(
    coeffs: &mut [F],
    small_domain: &EvaluationDomain<F>,
    large_domain: &EvaluationDomain<F>,
    extension: usize,
) {
    let n = small_domain.size;
    debug_assert_eq!(large_domain.size, n * extension);
    debug_assert!(coeffs.len() >= large_domain.size);

    let source = coeffs[..n].to_vec();
    let evaluations: Vec<Vec<F>> = (0..extension)
        .into_par_iter()
        .map(|j| {
            let shift = small_domain.generator * large_domain.element(j);
            let mut v = source.clone();
            scale_by_powers(&mut v, F::one(), shift);
            fft(&mut v, small_domain);
            v
        })
        .collect();

    coeffs[..large_domain.size]
        .par_chunks_mut(extension)
        .enumerate()
        .for_each(|(i, chunk)| {
            for (j, c) in chunk.iter_mut().enumerate() {
                *c = evaluations[j][i];
            }
        });
}

/// Two rounds of a radix-4 style split used when committing to a quotient of
/// four times the circuit size.
///
/// With `N = domain.size`, `n = N / 4` and `Y` the (scaled) input, row `3 - s`
/// receives `R_{i,s} = Σ_{j<4} Y_{i+jn} · ω^{(i+jn)(s+1)}` for `i < n`. Input is
/// scaled by `constant^k` when `is_coset`, else by `constant`.
#[tracing::instrument(skip_all, name = "arithmetic::partial_fft")]
pub fn partial_fft<F: FftField>(
    coeffs: &mut [F],
    domain: &EvaluationDomain<F>,
    constant: F,
    is_coset: bool,
) {
    let size = domain.size;
    debug_assert!(size >= 4);
    let n = size >> 2;
    let full_mask = size - 1;
    let m = size >> 1;
    let half_mask = m - 1;
    let roots = domain.roots();

    let mut scratch = coeffs[..size].to_vec();
    if is_coset {
        scale_by_powers(&mut scratch, F::one(), constant);
    } else {
        scale(&mut scratch, constant);
    }

    coeffs[..size]
        .par_chunks_mut(n)
        .enumerate()
        .for_each(|(row, target)| {
            let s = 3 - row;
            for (i, t) in target.iter_mut().enumerate() {
                let mut acc = F::zero();
                for j in 0..4 {
                    let k = i + j * n;
                    let root_index = (k * (s + 1)) & full_mask;
                    let w = if root_index < m {
                        roots[root_index & half_mask]
                    } else {
                        -roots[root_index & half_mask]
                    };
                    acc += w * scratch[k];
                }
                *t = acc;
            }
        });
}

fn horner<F: Field>(coeffs: &[F], z: F) -> F {
    coeffs
        .iter()
        .rev()
        .fold(F::zero(), |acc, c| acc * z + c)
}

/// `Σ coeffs[i] z^i`, Horner per chunk with chunks combined by powers of `z`.
pub fn evaluate<F: Field>(coeffs: &[F], z: F) -> F {
    if coeffs.len() <= CHUNK_SIZE {
        return horner(coeffs, z);
    }
    let z_chunk = z.pow(CHUNK_SIZE as u64);
    coeffs
        .par_chunks(CHUNK_SIZE)
        .enumerate()
        .map(|(i, chunk)| horner(chunk, z) * z_chunk.pow(i as u64))
        .sum()
}

/// Evaluates at `z` the polynomial whose values over `domain` are `evals`:
/// `f(z) = (z^n - 1)/n · Σ f(ω^i) / (z·ω^{-i} - 1)`.
///
/// Missing trailing evaluations are taken as zero.
#[tracing::instrument(skip_all, name = "arithmetic::compute_barycentric_evaluation")]
pub fn compute_barycentric_evaluation<F: FftField>(
    evals: &[F],
    z: F,
    domain: &EvaluationDomain<F>,
) -> F {
    let num_evals = evals.len().min(domain.size);
    let evals = &evals[..num_evals];

    let mut z_pow_n = z;
    for _ in 0..domain.log2_size {
        z_pow_n = z_pow_n.square();
    }
    if z_pow_n.is_one() {
        // z lies in the domain; the formula degenerates.
        return (0..num_evals)
            .find(|&i| domain.element(i) == z)
            .map_or(F::zero(), |i| evals[i]);
    }

    let numerator = (z_pow_n - F::one()) * domain.domain_inverse;
    let denominators: Vec<F> = compute_powers(domain.root_inverse, num_evals)
        .into_par_iter()
        .map(|w| w * z - F::one())
        .collect();
    let mut inverses = unsafe_allocate_zero_vec(num_evals);
    par_batch_inverse(&denominators, &mut inverses);

    let sum: F = evals
        .par_iter()
        .zip(inverses.par_iter())
        .map(|(e, d)| *e * d)
        .sum();
    sum * numerator
}

/// Evaluates at `z` from evaluations over the coset of `large_domain`, using
/// only the points that form a coset of `small_domain`. The polynomial must
/// have degree below `small_domain.size`.
pub fn evaluate_from_fft<F: FftField>(
    coset_evals: &[F],
    large_domain: &EvaluationDomain<F>,
    z: F,
    small_domain: &EvaluationDomain<F>,
) -> F {
    let stride = large_domain.size / small_domain.size;
    let subsampled: Vec<F> = (0..small_domain.size)
        .into_par_iter()
        .map(|i| coset_evals[i * stride])
        .collect();
    compute_barycentric_evaluation(&subsampled, z * large_domain.generator_inverse, small_domain)
}

/// Replaces `p(X)` with `(p(X) - p(z)) / (X - z)` and returns `p(z)`.
pub fn compute_kate_opening_coefficients<F: Field>(coeffs: &mut [F], z: F) -> F {
    let f = evaluate(coeffs, z);
    let n = coeffs.len();
    if n == 0 {
        return f;
    }
    match z.inverse() {
        None => {
            coeffs.copy_within(1.., 0);
        }
        Some(z_inv) => {
            let divisor = -z_inv;
            let mut prev = f;
            for c in coeffs.iter_mut() {
                prev = (*c - prev) * divisor;
                *c = prev;
            }
        }
    }
    coeffs[n - 1] = F::zero();
    f
}

/// Divides by `(X - root)` in place, trusting that `root` is a root.
pub fn factor_root<F: Field>(coeffs: &mut [F], root: F) {
    let size = coeffs.len();
    if size == 0 {
        return;
    }
    match (-root).inverse() {
        None => {
            debug_assert!(coeffs[0].is_zero(), "0 is not a root");
            coeffs.copy_within(1.., 0);
        }
        Some(root_inverse) => {
            // b_i = (a_i - b_{i-1}) / (-r)
            let mut prev = F::zero();
            for c in coeffs[..size - 1].iter_mut() {
                prev = (*c - prev) * root_inverse;
                *c = prev;
            }
        }
    }
    coeffs[size - 1] = F::zero();
}

/// Divides by `Π (X - r_i)` in place, trusting that every `r_i` is a root.
///
/// Zero roots are a left shift and are removed first; the remaining roots are
/// divided out together in one pass over the coefficients, with one running
/// quotient coefficient cached per root.
#[tracing::instrument(skip_all, name = "arithmetic::factor_roots")]
pub fn factor_roots<F: Field>(coeffs: &mut [F], roots: &[F]) {
    let size = coeffs.len();
    debug_assert!(roots.len() < size);

    let num_zero_roots = roots.iter().filter(|r| r.is_zero()).count();
    let coeffs = if num_zero_roots > 0 {
        debug_assert!(
            coeffs[..num_zero_roots].iter().all(|c| c.is_zero()),
            "0 is not a root of the expected multiplicity"
        );
        coeffs.copy_within(num_zero_roots.., 0);
        coeffs[size - num_zero_roots..].fill(F::zero());
        &mut coeffs[..size - num_zero_roots]
    } else {
        coeffs
    };

    let non_zero_roots: Vec<F> = roots.iter().filter(|r| !r.is_zero()).copied().collect();
    match non_zero_roots.len() {
        0 => {}
        1 => factor_root(coeffs, non_zero_roots[0]),
        num_roots => {
            let minus_root_inverses: Vec<F> = non_zero_roots
                .iter()
                .map(|r| -r.inverse().unwrap_or_else(F::zero))
                .collect();
            let new_size = coeffs.len() - num_roots;
            let mut division_cache = vec![F::zero(); num_roots];
            for c in coeffs[..new_size].iter_mut() {
                let mut temp = *c;
                for (cached, minus_inv) in division_cache.iter_mut().zip(&minus_root_inverses) {
                    temp = (temp - *cached) * minus_inv;
                    *cached = temp;
                }
                *c = temp;
            }
            coeffs[new_size..].fill(F::zero());
        }
    }
}

/// Coefficients of the unique polynomial of degree `< n` through the `n`
/// pairs `(points[i], evals[i])`.
///
/// Uses `T(X) = Σ y_i / d_i · N(X) / (X - x_i)` with `N(X) = Π (X - x_j)` and
/// `d_i = Π_{j≠i} (x_i - x_j)`. The division by `(X - x_i)` runs from the
/// leading coefficient down, so a zero point needs no special case.
#[tracing::instrument(skip_all, name = "arithmetic::compute_interpolation")]
pub fn compute_interpolation<F: Field>(points: &[F], evals: &[F]) -> Result<Vec<F>, ArithError> {
    let n = points.len();
    if evals.len() != n {
        return Err(ArithError::InvalidInputLength(n, evals.len()));
    }
    if n == 0 {
        return Ok(Vec::new());
    }

    // N(X), n + 1 coefficients.
    let mut numerator = vec![F::zero(); n + 1];
    numerator[0] = F::one();
    for (deg, x) in points.iter().enumerate() {
        for k in (0..=deg + 1).rev() {
            let lower = if k > 0 { numerator[k - 1] } else { F::zero() };
            numerator[k] = lower - *x * numerator[k];
        }
    }

    let quotient = |x: F| -> Vec<F> {
        let mut q = vec![F::zero(); n];
        q[n - 1] = numerator[n];
        for k in (1..n).rev() {
            q[k - 1] = numerator[k] + x * q[k];
        }
        q
    };

    let denominators: Vec<F> = points
        .par_iter()
        .map(|x| evaluate(&quotient(*x), *x))
        .collect();
    if denominators.iter().any(|d| d.is_zero()) {
        return Err(ArithError::RepeatedInterpolationPoint);
    }
    let mut inverses = unsafe_allocate_zero_vec(n);
    par_batch_inverse(&denominators, &mut inverses);

    let result = points
        .par_iter()
        .zip(evals.par_iter().zip(inverses.par_iter()))
        .map(|(x, (y, d_inv))| {
            let weight = *y * d_inv;
            let mut q = quotient(*x);
            q.iter_mut().for_each(|c| *c *= weight);
            q
        })
        .reduce(
            || vec![F::zero(); n],
            |mut acc, q| {
                acc.iter_mut().zip(q).for_each(|(a, b)| *a += b);
                acc
            },
        );
    Ok(result)
}
