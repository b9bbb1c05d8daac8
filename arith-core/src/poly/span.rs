use std::borrow::Cow;
use std::ops::Deref;

use super::polynomial::Polynomial;
use crate::field::Field;

/// Coefficients `start_index .. start_index + len` of some longer polynomial.
///
/// A span over a plain slice borrows it. A span taken from a [`Polynomial`]
/// holds a copy of the window, so the polynomial and every view of its buffer
/// stay writable while the span is alive.
pub struct PolynomialSpan<'a, F: Clone> {
    pub start_index: usize,
    coeffs: Cow<'a, [F]>,
}

impl<'a, F: Clone> PolynomialSpan<'a, F> {
    pub fn new(start_index: usize, coeffs: &'a [F]) -> Self {
        Self {
            start_index,
            coeffs: Cow::Borrowed(coeffs),
        }
    }

    pub fn size(&self) -> usize {
        self.coeffs.len()
    }

    pub fn end_index(&self) -> usize {
        self.start_index + self.size()
    }

    /// The part of this span lying in `[offset, offset + size)` of the full
    /// index space, or an empty span if they do not overlap.
    pub fn subspan(self, offset: usize, size: usize) -> Self {
        let (start_index, skip, take) = if offset > self.start_index {
            let skip = (offset - self.start_index).min(self.size());
            (offset, skip, size.min(self.size() - skip))
        } else {
            let overlap = (offset + size).saturating_sub(self.start_index);
            (self.start_index, 0, overlap.min(self.size()))
        };
        let coeffs = match self.coeffs {
            Cow::Borrowed(c) => Cow::Borrowed(&c[skip..skip + take]),
            Cow::Owned(mut c) => {
                c.truncate(skip + take);
                c.drain(..skip);
                Cow::Owned(c)
            }
        };
        Self {
            start_index,
            coeffs,
        }
    }
}

impl<F: Clone> Deref for PolynomialSpan<'_, F> {
    type Target = [F];

    fn deref(&self) -> &[F] {
        &self.coeffs
    }
}

impl<F: Field> From<&Polynomial<F>> for PolynomialSpan<'_, F> {
    fn from(poly: &Polynomial<F>) -> Self {
        Self {
            start_index: 0,
            coeffs: Cow::Owned(poly.to_vec()),
        }
    }
}
