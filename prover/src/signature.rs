//! EdDSA over Baby Jubjub (ed-on-bn254) with a Poseidon challenge.
//!
//! Verification equation: [s]G == R + [h]A with h = H(R, A, m). The curve's
//! base field is BN254's scalar field, so public keys and R are native
//! circuit values.

use std::fmt;

use ark_bn254::Fr;
use ark_ec::{AffineRepr, CurveGroup};
use ark_ed_on_bn254::{EdwardsAffine, Fr as EdScalar};
use ark_ff::{BigInteger, PrimeField, UniformRand, Zero};
use ark_std::rand::Rng;

use crate::{circuit::hash::challenge, constants::NONCE_DOMAIN};

/// Reduce a BN254 scalar (the challenge digest) into the curve's scalar field.
pub fn challenge_scalar(h: Fr) -> EdScalar {
    EdScalar::from_le_bytes_mod_order(&h.into_bigint().to_bytes_le())
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub struct SecretKey(EdScalar);

impl SecretKey {
    /// Derive a key from arbitrary seed bytes. Meant for fixtures and tests.
    pub fn from_seed(seed: &[u8]) -> Self {
        let digest = blake3::hash(seed);
        Self(EdScalar::from_le_bytes_mod_order(digest.as_bytes()))
    }

    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self(EdScalar::rand(rng))
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey((EdwardsAffine::generator() * self.0).into_affine())
    }

    /// Deterministic signature: the nonce is derived from the key and message.
    pub fn sign(&self, message: Fr) -> Signature {
        let mut hasher = blake3::Hasher::new();
        hasher.update(NONCE_DOMAIN);
        hasher.update(&self.0.into_bigint().to_bytes_le());
        hasher.update(&message.into_bigint().to_bytes_le());
        let nonce = EdScalar::from_le_bytes_mod_order(hasher.finalize().as_bytes());

        let r = (EdwardsAffine::generator() * nonce).into_affine();
        let public_key = self.public_key();
        let h = challenge_scalar(challenge(&r, &public_key.0, message));

        Signature {
            r,
            s: nonce + h * self.0,
        }
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(..)")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PublicKey(pub EdwardsAffine);

impl PublicKey {
    pub fn point(&self) -> &EdwardsAffine {
        &self.0
    }

    pub fn verify(&self, message: Fr, signature: &Signature) -> bool {
        let h = challenge_scalar(challenge(&signature.r, &self.0, message));
        let lhs = EdwardsAffine::generator() * signature.s;
        let rhs = signature.r.into_group() + self.0 * h;
        lhs == rhs
    }

    /// Identity point. Only used to give setup a shaped witness.
    pub(crate) fn placeholder() -> Self {
        Self(EdwardsAffine::zero())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Signature {
    pub r: EdwardsAffine,
    pub s: EdScalar,
}

impl Signature {
    pub(crate) fn placeholder() -> Self {
        Self {
            r: EdwardsAffine::zero(),
            s: EdScalar::zero(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::hash::transfer_message;

    fn alice() -> SecretKey {
        SecretKey::from_seed(b"alice")
    }

    #[test]
    fn sign_and_verify() {
        let sk = alice();
        let msg = transfer_message(0, 1, 20);
        let sig = sk.sign(msg);
        assert!(sk.public_key().verify(msg, &sig));
    }

    #[test]
    fn signing_is_deterministic() {
        let sk = alice();
        let msg = Fr::from(42u64);
        assert_eq!(sk.sign(msg), sk.sign(msg));
    }

    #[test]
    fn wrong_message_fails() {
        let sk = alice();
        let sig = sk.sign(transfer_message(0, 1, 20));
        assert!(!sk.public_key().verify(transfer_message(0, 1, 21), &sig));
        // Replaying at the next nonce is a different message.
        assert!(!sk.public_key().verify(transfer_message(1, 1, 20), &sig));
    }

    #[test]
    fn wrong_key_fails() {
        let sig = alice().sign(Fr::from(7u64));
        let bob = SecretKey::from_seed(b"bob").public_key();
        assert!(!bob.verify(Fr::from(7u64), &sig));
    }

    #[test]
    fn tampered_s_fails() {
        let sk = alice();
        let mut sig = sk.sign(Fr::from(7u64));
        sig.s += EdScalar::from(1u64);
        assert!(!sk.public_key().verify(Fr::from(7u64), &sig));
    }

    #[test]
    fn secret_key_debug_is_redacted() {
        assert_eq!(format!("{:?}", alice()), "SecretKey(..)");
    }
}
