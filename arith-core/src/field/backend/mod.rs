//! Limb-level Montgomery arithmetic behind a backend trait.
//!
//! Every routine accepts operands in coarse form (`[0, 2p)`) and returns coarse
//! results, except `reduce_once`, which returns the strict form (`[0, p)`).
//! Backends must agree bit for bit on every input; the conformance tests below
//! run the same suite against each of them.

use super::limbs::Limbs;
use super::params::FieldParams;

pub mod portable;
#[cfg(target_arch = "x86_64")]
pub mod x64;

pub use portable::Portable;
#[cfg(target_arch = "x86_64")]
pub use x64::X64Asm;

pub trait MontgomeryBackend {
    fn add<P: FieldParams>(a: &Limbs, b: &Limbs) -> Limbs;
    fn sub<P: FieldParams>(a: &Limbs, b: &Limbs) -> Limbs;
    /// `a * b * R^{-1}`, coarse. No final subtraction.
    fn mul<P: FieldParams>(a: &Limbs, b: &Limbs) -> Limbs;
    fn sqr<P: FieldParams>(a: &Limbs) -> Limbs;
    /// Subtracts `p` iff `a >= p`.
    fn reduce_once<P: FieldParams>(a: &Limbs) -> Limbs;
    /// Replaces `r` with `2p - r` when `predicate != 0`. A zero `r` stays zero.
    fn conditional_negate<P: FieldParams>(r: &mut Limbs, predicate: u64);
}

/// Backend used by [`crate::field::Fp`].
#[cfg(all(target_arch = "x86_64", feature = "asm"))]
pub type ActiveBackend = X64Asm;
#[cfg(not(all(target_arch = "x86_64", feature = "asm")))]
pub type ActiveBackend = Portable;
