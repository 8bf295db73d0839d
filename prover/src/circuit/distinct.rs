//! Pairwise distinctness of allocated values.
//!
//! `x != 0` holds exactly when some `inv` satisfies `x * inv == 1`, so each
//! pair costs one witness and one constraint.

use ark_bn254::Fr;
use ark_ff::Field;
use ark_r1cs_std::{fields::fp::FpVar, prelude::*};
use ark_relations::r1cs::{ConstraintSystemRef, SynthesisError};

pub fn enforce_nonzero(cs: ConstraintSystemRef<Fr>, x: &FpVar<Fr>) -> Result<(), SynthesisError> {
    // A zero value gets a zero "inverse", leaving the constraint unsatisfied
    // instead of aborting synthesis.
    let inv = FpVar::new_witness(cs, || {
        Ok(x.value()?.inverse().unwrap_or(Fr::from(0u64)))
    })?;
    x.mul_equals(&inv, &FpVar::one())
}

/// No two of `values` are equal.
pub fn enforce_distinct(
    cs: ConstraintSystemRef<Fr>,
    values: &[FpVar<Fr>],
) -> Result<(), SynthesisError> {
    for (i, a) in values.iter().enumerate() {
        for b in &values[i + 1..] {
            enforce_nonzero(cs.clone(), &(a - b))?;
        }
    }
    Ok(())
}
