//! Bit decomposition and range checks.
//!
//! Values are decomposed into boolean witnesses and the weighted sum is tied
//! back to the original variable, so `value < 2^num_bits` holds for any
//! satisfying assignment.

use ark_bn254::Fr;
use ark_ff::{BigInteger, PrimeField};
use ark_r1cs_std::{fields::fp::FpVar, prelude::*};
use ark_relations::r1cs::{ConstraintSystemRef, SynthesisError};

use crate::constants::BALANCE_BITS;

/// Decompose `value` into `num_bits` little-endian booleans bound to it.
pub fn enforce_bits(
    cs: ConstraintSystemRef<Fr>,
    value: &FpVar<Fr>,
    num_bits: usize,
) -> Result<Vec<Boolean<Fr>>, SynthesisError> {
    let mut bits = Vec::with_capacity(num_bits);
    for i in 0..num_bits {
        let bit = Boolean::new_witness(cs.clone(), || {
            Ok(value.value()?.into_bigint().get_bit(i))
        })?;
        bits.push(bit);
    }

    let mut recomposed = FpVar::<Fr>::zero();
    let mut coeff = Fr::from(1u64);
    for bit in &bits {
        recomposed += FpVar::from(bit.clone()) * coeff;
        coeff += coeff;
    }
    recomposed.enforce_equal(value)?;

    Ok(bits)
}

/// value in [0, 2^64)
pub fn enforce_u64(cs: ConstraintSystemRef<Fr>, value: &FpVar<Fr>) -> Result<(), SynthesisError> {
    enforce_bits(cs, value, BALANCE_BITS).map(|_| ())
}

/// Bind a tree index to exactly `depth` bits, returning them LSB first.
pub fn index_bits(
    cs: ConstraintSystemRef<Fr>,
    index: &FpVar<Fr>,
    depth: usize,
) -> Result<Vec<Boolean<Fr>>, SynthesisError> {
    enforce_bits(cs, index, depth)
}

/// a <= b for values already known to be u64.
///
/// b - a either stays below 2^64 or wraps to something close to the field
/// modulus, which the decomposition rejects.
pub fn enforce_le(
    cs: ConstraintSystemRef<Fr>,
    a: &FpVar<Fr>,
    b: &FpVar<Fr>,
) -> Result<(), SynthesisError> {
    let diff = b - a;
    enforce_u64(cs, &diff)
}
