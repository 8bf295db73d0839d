//! Poseidon hashing, native and in-circuit.
//!
//! Both sides absorb the same elements in the same order through the same
//! parameter set, so a digest computed by the operator is exactly the value
//! the constraint system recomputes.

use ark_bn254::Fr;
use ark_crypto_primitives::sponge::{
    CryptographicSponge,
    constraints::CryptographicSpongeVar,
    poseidon::{PoseidonSponge, constraints::PoseidonSpongeVar},
};
use ark_ed_on_bn254::EdwardsAffine;
use ark_ed_on_bn254::constraints::EdwardsVar;
use ark_ff::PrimeField;
use ark_r1cs_std::fields::fp::FpVar;
use ark_relations::r1cs::{ConstraintSystemRef, SynthesisError};
use rollup_account::Account;

use super::poseidon::poseidon_config;
use crate::constants::{CHALLENGE_DOMAIN, LEAF_DOMAIN, MESSAGE_DOMAIN};

/// Map a domain tag onto a field element.
pub fn domain(tag: &[u8]) -> Fr {
    Fr::from_le_bytes_mod_order(tag)
}

// ============================================================================
// Native
// ============================================================================

/// Poseidon over an arbitrary number of field elements
pub fn hash(inputs: &[Fr]) -> Fr {
    let mut sponge = PoseidonSponge::<Fr>::new(poseidon_config());
    for input in inputs {
        sponge.absorb(input);
    }
    let out: Vec<Fr> = sponge.squeeze_field_elements(1);
    out[0]
}

/// Interior tree node
pub fn hash2(left: Fr, right: Fr) -> Fr {
    hash(&[left, right])
}

/// Leaf committing to an account and its owner's key
pub fn account_leaf(public_key: &EdwardsAffine, account: &Account) -> Fr {
    hash(&[
        domain(LEAF_DOMAIN),
        public_key.x,
        public_key.y,
        Fr::from(account.index),
        Fr::from(account.nonce),
        Fr::from(account.balance),
    ])
}

/// The value a sender signs to authorize a transfer.
///
/// Binding the sender's pre-transfer nonce makes every signature single use.
pub fn transfer_message(sender_nonce: u64, receiver_index: u64, amount: u64) -> Fr {
    hash(&[
        domain(MESSAGE_DOMAIN),
        Fr::from(sender_nonce),
        Fr::from(receiver_index),
        Fr::from(amount),
    ])
}

/// EdDSA challenge h = H(R, A, m)
pub fn challenge(r: &EdwardsAffine, public_key: &EdwardsAffine, message: Fr) -> Fr {
    hash(&[
        domain(CHALLENGE_DOMAIN),
        r.x,
        r.y,
        public_key.x,
        public_key.y,
        message,
    ])
}

// ============================================================================
// In-circuit
// ============================================================================

/// Poseidon over field variables INSIDE the circuit
pub fn hash_var(
    cs: ConstraintSystemRef<Fr>,
    inputs: &[FpVar<Fr>],
) -> Result<FpVar<Fr>, SynthesisError> {
    let mut sponge = PoseidonSpongeVar::new(cs, poseidon_config());
    for input in inputs {
        sponge.absorb(input)?;
    }
    let mut out = sponge.squeeze_field_elements(1)?;
    Ok(out.remove(0))
}

pub fn hash2_var(
    cs: ConstraintSystemRef<Fr>,
    left: &FpVar<Fr>,
    right: &FpVar<Fr>,
) -> Result<FpVar<Fr>, SynthesisError> {
    hash_var(cs, &[left.clone(), right.clone()])
}

pub fn account_leaf_var(
    cs: ConstraintSystemRef<Fr>,
    public_key: &EdwardsVar,
    index: &FpVar<Fr>,
    nonce: &FpVar<Fr>,
    balance: &FpVar<Fr>,
) -> Result<FpVar<Fr>, SynthesisError> {
    hash_var(
        cs,
        &[
            FpVar::Constant(domain(LEAF_DOMAIN)),
            public_key.x.clone(),
            public_key.y.clone(),
            index.clone(),
            nonce.clone(),
            balance.clone(),
        ],
    )
}

pub fn transfer_message_var(
    cs: ConstraintSystemRef<Fr>,
    sender_nonce: &FpVar<Fr>,
    receiver_index: &FpVar<Fr>,
    amount: &FpVar<Fr>,
) -> Result<FpVar<Fr>, SynthesisError> {
    hash_var(
        cs,
        &[
            FpVar::Constant(domain(MESSAGE_DOMAIN)),
            sender_nonce.clone(),
            receiver_index.clone(),
            amount.clone(),
        ],
    )
}

pub fn challenge_var(
    cs: ConstraintSystemRef<Fr>,
    r: &EdwardsVar,
    public_key: &EdwardsVar,
    message: &FpVar<Fr>,
) -> Result<FpVar<Fr>, SynthesisError> {
    hash_var(
        cs,
        &[
            FpVar::Constant(domain(CHALLENGE_DOMAIN)),
            r.x.clone(),
            r.y.clone(),
            public_key.x.clone(),
            public_key.y.clone(),
            message.clone(),
        ],
    )
}
