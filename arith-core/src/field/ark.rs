//! Conversions to and from the arkworks BN254 fields.
//!
//! arkworks uses the same Montgomery radix, so the raw limbs carry over as is
//! once ours are fully reduced.

use ark_ff::BigInt;

use super::element::{Fq, Fr};

impl From<ark_bn254::Fr> for Fr {
    fn from(value: ark_bn254::Fr) -> Self {
        Fr::from_raw(value.0 .0)
    }
}

impl From<Fr> for ark_bn254::Fr {
    fn from(value: Fr) -> Self {
        ark_bn254::Fr::new_unchecked(BigInt(*value.reduce_once().limbs()))
    }
}

impl From<ark_bn254::Fq> for Fq {
    fn from(value: ark_bn254::Fq) -> Self {
        Fq::from_raw(value.0 .0)
    }
}

impl From<Fq> for ark_bn254::Fq {
    fn from(value: Fq) -> Self {
        ark_bn254::Fq::new_unchecked(BigInt(*value.reduce_once().limbs()))
    }
}
