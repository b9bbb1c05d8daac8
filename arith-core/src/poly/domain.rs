use ark_std::One;

use crate::field::FftField;
use crate::poly::arithmetic::compute_powers;
use crate::utils::errors::ArithError;

/// Multiplicative subgroup of size `2^k` together with the constants the FFT
/// family needs.
///
/// `roots` holds `ω^0, …, ω^{n/2 - 1}` for the primitive `n`-th root `ω`; the
/// butterflies at every level index into it with a stride. The coset shift is
/// the field's multiplicative generator, which is never in the subgroup.
#[derive(Clone, Debug)]
pub struct EvaluationDomain<F: FftField> {
    pub size: usize,
    pub log2_size: usize,
    pub root: F,
    pub root_inverse: F,
    /// `n` as a field element.
    pub domain: F,
    pub domain_inverse: F,
    pub generator: F,
    pub generator_inverse: F,
    roots: Vec<F>,
    inverse_roots: Vec<F>,
}

impl<F: FftField> EvaluationDomain<F> {
    #[tracing::instrument(skip_all, name = "EvaluationDomain::new")]
    pub fn new(size: usize) -> Result<Self, ArithError> {
        if size == 0 || !size.is_power_of_two() {
            return Err(ArithError::InvalidDomainSize(size));
        }
        let log2_size = size.trailing_zeros();
        let root = F::get_root_of_unity(log2_size).ok_or(ArithError::DomainTooLarge {
            log_size: log2_size,
            two_adicity: F::TWO_ADICITY,
        })?;
        let root_inverse = root.pow(size as u64 - 1);
        let domain = F::from_u64(size as u64);
        let domain_inverse = domain
            .inverse()
            .ok_or(ArithError::InvalidDomainSize(size))?;
        let generator = F::multiplicative_generator();
        let generator_inverse = generator
            .inverse()
            .ok_or(ArithError::InvalidDomainSize(size))?;

        Ok(Self {
            size,
            log2_size: log2_size as usize,
            root,
            root_inverse,
            domain,
            domain_inverse,
            generator,
            generator_inverse,
            roots: compute_powers(root, size / 2),
            inverse_roots: compute_powers(root_inverse, size / 2),
        })
    }

    /// `ω^0, …, ω^{n/2 - 1}`.
    pub fn roots(&self) -> &[F] {
        &self.roots
    }

    /// `ω^0, …, ω^{-(n/2 - 1)}`.
    pub fn inverse_roots(&self) -> &[F] {
        &self.inverse_roots
    }

    /// The `i`-th element `ω^i` of the subgroup.
    pub fn element(&self, i: usize) -> F {
        if self.size == 1 {
            return F::one();
        }
        let i = i & (self.size - 1);
        let half = self.size / 2;
        if i < half {
            self.roots[i]
        } else {
            -self.roots[i - half]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{Field, Fr};

    #[test]
    fn constants_are_consistent() {
        let domain = EvaluationDomain::<Fr>::new(16).unwrap();
        assert_eq!(domain.log2_size, 4);
        assert_eq!(domain.root * domain.root_inverse, Fr::one());
        assert_eq!(domain.domain * domain.domain_inverse, Fr::one());
        assert_eq!(domain.generator * domain.generator_inverse, Fr::one());
        assert_eq!(Field::pow(&domain.root, 16), Fr::one());
        assert_ne!(Field::pow(&domain.root, 8), Fr::one());
        for i in 0..16 {
            assert_eq!(domain.element(i), Field::pow(&domain.root, i as u64));
        }
        assert_eq!(domain.roots().len(), 8);
        assert_eq!(domain.roots()[3] * domain.inverse_roots()[3], Fr::one());
    }

    #[test]
    fn rejects_bad_sizes() {
        assert_eq!(
            EvaluationDomain::<Fr>::new(12).unwrap_err(),
            ArithError::InvalidDomainSize(12)
        );
        assert_eq!(
            EvaluationDomain::<Fr>::new(0).unwrap_err(),
            ArithError::InvalidDomainSize(0)
        );
        assert!(matches!(
            EvaluationDomain::<Fr>::new(1 << 29),
            Err(ArithError::DomainTooLarge { .. })
        ));
    }

    #[test]
    fn trivial_domain() {
        let domain = EvaluationDomain::<Fr>::new(1).unwrap();
        assert_eq!(domain.root, Fr::one());
        assert!(domain.roots().is_empty());
        assert_eq!(domain.element(0), Fr::one());
    }
}
