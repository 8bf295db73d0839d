//! Transition constraints for a single transfer.
//!
//! A slot is satisfiable exactly when its after-states are the result of
//! applying the signed transfer to before-states committed under the batch
//! root.

use ark_bn254::Fr;
use ark_ed_on_bn254::constraints::EdwardsVar;
use ark_r1cs_std::{fields::fp::FpVar, prelude::*};
use ark_relations::r1cs::{ConstraintSystemRef, SynthesisError};
use rollup_account::{Account, ReceiverNonce, Visibility, WitnessLayout};

use crate::{
    circuit::{
        eddsa::{SignatureVar, alloc_public_key, enforce_signature},
        hash::{account_leaf_var, transfer_message_var},
        merkle::{MerklePathVar, enforce_membership},
        range::{enforce_le, enforce_u64, index_bits},
    },
    witness::{BatchSlot, CircuitShape, TransferWitness},
};

/// Allocate a ledger value as a public input or a private witness.
pub fn alloc_value(
    cs: ConstraintSystemRef<Fr>,
    value: u64,
    visibility: Visibility,
) -> Result<FpVar<Fr>, SynthesisError> {
    match visibility {
        Visibility::Public => FpVar::new_input(cs, || Ok(Fr::from(value))),
        Visibility::Private => FpVar::new_witness(cs, || Ok(Fr::from(value))),
    }
}

#[derive(Clone, Debug)]
pub struct AccountVar {
    pub index: FpVar<Fr>,
    pub nonce: FpVar<Fr>,
    pub balance: FpVar<Fr>,
}

impl AccountVar {
    pub fn new(
        cs: ConstraintSystemRef<Fr>,
        account: &Account,
        layout: &WitnessLayout,
    ) -> Result<Self, SynthesisError> {
        Ok(Self {
            index: alloc_value(cs.clone(), account.index, layout.account_index)?,
            nonce: alloc_value(cs.clone(), account.nonce, layout.account_nonce)?,
            balance: alloc_value(cs, account.balance, layout.account_balance)?,
        })
    }

    pub fn leaf(
        &self,
        cs: ConstraintSystemRef<Fr>,
        public_key: &EdwardsVar,
    ) -> Result<FpVar<Fr>, SynthesisError> {
        account_leaf_var(cs, public_key, &self.index, &self.nonce, &self.balance)
    }
}

#[derive(Clone, Debug)]
pub struct TransferVar {
    pub amount: FpVar<Fr>,
    pub sender_public_key: EdwardsVar,
    pub receiver_public_key: EdwardsVar,
    pub signature: SignatureVar,
    pub sender_path: MerklePathVar,
    pub receiver_path: MerklePathVar,
}

impl TransferVar {
    /// `amount` is allocated by the caller so it lands in the right public
    /// input position.
    pub fn new(
        cs: ConstraintSystemRef<Fr>,
        transfer: &TransferWitness,
        amount: FpVar<Fr>,
    ) -> Result<Self, SynthesisError> {
        Ok(Self {
            amount,
            sender_public_key: alloc_public_key(cs.clone(), &transfer.sender_public_key)?,
            receiver_public_key: alloc_public_key(cs.clone(), &transfer.receiver_public_key)?,
            signature: SignatureVar::new_witness(cs.clone(), &transfer.signature)?,
            sender_path: MerklePathVar::new_witness(cs.clone(), &transfer.sender_proof)?,
            receiver_path: MerklePathVar::new_witness(cs, &transfer.receiver_proof)?,
        })
    }
}

/// All variables of one batch slot.
#[derive(Clone, Debug)]
pub struct SlotVar {
    pub sender_before: AccountVar,
    pub receiver_before: AccountVar,
    pub sender_after: AccountVar,
    pub receiver_after: AccountVar,
    pub transfer: TransferVar,
}

impl SlotVar {
    /// Public values are allocated first, in the order `Batch::public_inputs`
    /// lists them.
    pub fn new(
        cs: ConstraintSystemRef<Fr>,
        slot: &BatchSlot,
        layout: &WitnessLayout,
    ) -> Result<Self, SynthesisError> {
        let sender_before = AccountVar::new(cs.clone(), &slot.sender_before, layout)?;
        let receiver_before = AccountVar::new(cs.clone(), &slot.receiver_before, layout)?;
        let sender_after = AccountVar::new(cs.clone(), &slot.sender_after, layout)?;
        let receiver_after = AccountVar::new(cs.clone(), &slot.receiver_after, layout)?;
        let amount = alloc_value(cs.clone(), slot.transfer.amount, layout.transfer_amount)?;
        let transfer = TransferVar::new(cs, &slot.transfer, amount)?;

        Ok(Self {
            sender_before,
            receiver_before,
            sender_after,
            receiver_after,
            transfer,
        })
    }
}

/// Per-shape parameters of the transition rules
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransitionRules {
    pub tree_depth: usize,
    pub receiver_nonce: ReceiverNonce,
}

impl From<&CircuitShape> for TransitionRules {
    fn from(shape: &CircuitShape) -> Self {
        Self {
            tree_depth: shape.tree_depth,
            receiver_nonce: shape.receiver_nonce,
        }
    }
}

/// Assert that `slot` is one correctly applied, authorized transfer between
/// accounts committed under `account_root`.
pub fn enforce_transition(
    cs: ConstraintSystemRef<Fr>,
    account_root: &FpVar<Fr>,
    slot: &SlotVar,
    rules: &TransitionRules,
) -> Result<(), SynthesisError> {
    let SlotVar {
        sender_before,
        receiver_before,
        sender_after,
        receiver_after,
        transfer,
    } = slot;
    let one = Fr::from(1u64);

    // Nonces
    sender_after
        .nonce
        .enforce_equal(&(&sender_before.nonce + one))?;
    match rules.receiver_nonce {
        ReceiverNonce::Increment => receiver_after
            .nonce
            .enforce_equal(&(&receiver_before.nonce + one))?,
        ReceiverNonce::Unchanged => receiver_after.nonce.enforce_equal(&receiver_before.nonce)?,
    }

    // Positions are immutable
    sender_after.index.enforce_equal(&sender_before.index)?;
    receiver_after.index.enforce_equal(&receiver_before.index)?;

    // Every balance and the amount are u64, so the arithmetic below cannot
    // wrap around the field.
    enforce_u64(cs.clone(), &transfer.amount)?;
    for account in [sender_before, receiver_before, sender_after, receiver_after] {
        enforce_u64(cs.clone(), &account.balance)?;
    }

    // Solvency
    enforce_le(cs.clone(), &transfer.amount, &sender_before.balance)?;

    // Balances
    sender_after
        .balance
        .enforce_equal(&(&sender_before.balance - &transfer.amount))?;
    receiver_after
        .balance
        .enforce_equal(&(&receiver_before.balance + &transfer.amount))?;

    // Authorization over (sender nonce, receiver index, amount)
    let message = transfer_message_var(
        cs.clone(),
        &sender_before.nonce,
        &receiver_before.index,
        &transfer.amount,
    )?;
    enforce_signature(
        cs.clone(),
        &transfer.sender_public_key,
        &message,
        &transfer.signature,
    )?;

    // Membership of both before-states
    let sender_bits = index_bits(cs.clone(), &sender_before.index, rules.tree_depth)?;
    let sender_leaf = sender_before.leaf(cs.clone(), &transfer.sender_public_key)?;
    enforce_membership(
        cs.clone(),
        account_root,
        &sender_leaf,
        &sender_bits,
        &transfer.sender_path,
    )?;

    let receiver_bits = index_bits(cs.clone(), &receiver_before.index, rules.tree_depth)?;
    let receiver_leaf = receiver_before.leaf(cs.clone(), &transfer.receiver_public_key)?;
    enforce_membership(
        cs,
        account_root,
        &receiver_leaf,
        &receiver_bits,
        &transfer.receiver_path,
    )
}
