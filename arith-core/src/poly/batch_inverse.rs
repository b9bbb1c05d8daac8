use crate::field::Field;
use rayon::prelude::*;
use std::iter::zip;

/// Inverses all `src` values into `dst` using Montgomery batch inversion.
///
/// # Panics
///
/// Panics if one of the values is zero.
pub fn batch_inverse<F: Field>(src: &[F], dst: &mut [F]) {
    let mut acc = F::one();
    zip(src, &mut *dst).for_each(|(src_v, dst_v)| {
        *dst_v = acc;
        acc *= *src_v;
    });
    let mut acc_inv = acc.inverse().unwrap();
    zip(src, &mut *dst).rev().for_each(|(src_v, dst_v)| {
        *dst_v = acc_inv * *dst_v;
        acc_inv *= *src_v;
    });
}

pub fn par_batch_inverse<F: Field>(src: &[F], dst: &mut [F]) {
    (src.par_chunks(4096), dst.par_chunks_mut(4096))
        .into_par_iter()
        .for_each(|(src_chunk, dst_chunk)| batch_inverse(src_chunk, dst_chunk));
}

#[cfg(test)]
mod tests {
    use super::{batch_inverse, par_batch_inverse};
    use crate::field::{Field, Fr};
    use ark_std::{test_rng, Zero};
    use std::array;

    #[test]
    fn test_batch_inverse() {
        let vals: [Fr; 10] = array::from_fn(|i| Fr::from_u64(i as u64 + 1));

        let mut inv_vals = [Fr::zero(); 10];
        batch_inverse(&vals, &mut inv_vals);

        assert_eq!(inv_vals, vals.map(|v| v.inverse().unwrap()));
    }

    #[test]
    fn test_par_batch_inverse() {
        let mut rng = test_rng();
        let vals: Vec<Fr> = (0..10_000).map(|_| <Fr as Field>::random(&mut rng)).collect();
        let mut inv_vals = vec![Fr::zero(); vals.len()];
        par_batch_inverse(&vals, &mut inv_vals);
        for (v, inv) in vals.iter().zip(&inv_vals) {
            assert_eq!(*v * inv, Fr::from_u64(1));
        }
    }
}
