use ark_bn254::Fr;
use ark_ec::AffineRepr;
use ark_ed_on_bn254::{EdwardsAffine, Fr as EdScalar, constraints::EdwardsVar};
use ark_ff::{BigInteger, PrimeField};
use ark_r1cs_std::{fields::fp::FpVar, prelude::*};
use ark_relations::r1cs::{ConstraintSystemRef, SynthesisError};

use crate::{
    circuit::hash::challenge_var,
    signature::{PublicKey, Signature},
};

/// Allocate a curve point as a private witness.
///
/// Allocation constrains the point to the prime-order subgroup, so small
/// torsion components cannot be smuggled into a key or nonce.
pub fn alloc_point(
    cs: ConstraintSystemRef<Fr>,
    point: &EdwardsAffine,
) -> Result<EdwardsVar, SynthesisError> {
    EdwardsVar::new_witness(cs, || Ok(point.into_group()))
}

pub fn alloc_public_key(
    cs: ConstraintSystemRef<Fr>,
    public_key: &PublicKey,
) -> Result<EdwardsVar, SynthesisError> {
    alloc_point(cs, public_key.point())
}

#[derive(Clone, Debug)]
pub struct SignatureVar {
    pub r: EdwardsVar,
    /// s in little-endian bits, curve scalar field width
    pub s: Vec<Boolean<Fr>>,
}

impl SignatureVar {
    pub fn new_witness(
        cs: ConstraintSystemRef<Fr>,
        signature: &Signature,
    ) -> Result<Self, SynthesisError> {
        let r = alloc_point(cs.clone(), &signature.r)?;
        let s = signature
            .s
            .into_bigint()
            .to_bits_le()
            .into_iter()
            .take(EdScalar::MODULUS_BIT_SIZE as usize)
            .map(|bit| Boolean::new_witness(cs.clone(), || Ok(bit)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { r, s })
    }
}

/// Enforce [s]G == R + [h]A for h = H(R, A, message).
pub fn enforce_signature(
    cs: ConstraintSystemRef<Fr>,
    public_key: &EdwardsVar,
    message: &FpVar<Fr>,
    signature: &SignatureVar,
) -> Result<(), SynthesisError> {
    let h = challenge_var(cs, &signature.r, public_key, message)?;
    let h_bits = h.to_bits_le()?;

    let generator = EdwardsVar::constant(EdwardsAffine::generator().into_group());
    let lhs = generator.scalar_mul_le(signature.s.iter())?;
    let rhs = signature.r.clone() + public_key.scalar_mul_le(h_bits.iter())?;

    lhs.enforce_equal(&rhs)
}
