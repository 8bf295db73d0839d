//! Batch circuit for the transfer rollup.
//!
//! Proves that every slot of a batch is a correctly applied, signed transfer
//! between accounts committed under one account root. Groth16 over BN254.
//!
//! Public inputs (order matters for the verifier):
//! 1. account_root  - Merkle root the before-states are proven against
//! 2. per slot, for sender-before, receiver-before, sender-after and
//!    receiver-after: index, nonce and balance, each only if public in the
//!    layout
//! 3. per slot, after its accounts: amount, if public
//!
//! Private witness:
//! - every account field the layout keeps private
//! - public keys, signatures and inclusion proofs
//!
//! Every slot opens its accounts against the same root, so the before-state
//! indices of all slots must be pairwise distinct. Otherwise one balance
//! could be spent once per slot.

use ark_bn254::Fr;
use ark_r1cs_std::{fields::fp::FpVar, prelude::*};
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystemRef, SynthesisError};

use crate::{
    circuit::{
        distinct::enforce_distinct,
        transition::{SlotVar, TransitionRules, enforce_transition},
    },
    witness::{Batch, CircuitShape},
};

#[derive(Clone, Debug)]
pub struct RollupCircuit {
    batch: Batch,
}

impl RollupCircuit {
    pub fn new(batch: Batch) -> Self {
        Self { batch }
    }

    /// Circuit with the right shape and placeholder values, for compiling and
    /// key generation.
    pub fn dummy(shape: CircuitShape) -> Self {
        Self {
            batch: Batch::placeholder(shape),
        }
    }

    pub fn shape(&self) -> &CircuitShape {
        self.batch.shape()
    }
}

impl ConstraintSynthesizer<Fr> for RollupCircuit {
    fn generate_constraints(self, cs: ConstraintSystemRef<Fr>) -> Result<(), SynthesisError> {
        let shape = *self.batch.shape();
        let rules = TransitionRules::from(&shape);

        let account_root = FpVar::new_input(cs.clone(), || Ok(self.batch.account_root()))?;

        let mut total_before = FpVar::<Fr>::zero();
        let mut total_after = FpVar::<Fr>::zero();
        let mut touched = Vec::with_capacity(2 * shape.batch_size);

        for (i, slot) in self.batch.slots().iter().enumerate() {
            let before = cs.num_constraints();

            let vars = SlotVar::new(cs.clone(), slot, &shape.layout)?;
            enforce_transition(cs.clone(), &account_root, &vars, &rules)?;

            total_before += &vars.sender_before.balance + &vars.receiver_before.balance;
            total_after += &vars.sender_after.balance + &vars.receiver_after.balance;
            touched.push(vars.sender_before.index.clone());
            touched.push(vars.receiver_before.index.clone());

            log::debug!(
                "slot {}: {} constraints",
                i,
                cs.num_constraints() - before
            );
        }

        // Also rules out sender == receiver within a slot.
        enforce_distinct(cs.clone(), &touched)?;

        // Each slot already conserves value. The batch-wide sum additionally
        // ties the public balances together for verifiers that only see them.
        if shape.enforce_conservation {
            total_before.enforce_equal(&total_after)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_relations::r1cs::{ConstraintSystem, SynthesisMode};
    use rollup_account::Account;

    use crate::{
        signature::SecretKey,
        witness::{BatchSlot, TransferWitness},
        witness_builder::{BatchBuilder, Ledger, TransferIntent, sign_transfer},
    };

    fn satisfied(batch: Batch) -> bool {
        let cs = ConstraintSystem::<Fr>::new_ref();
        RollupCircuit::new(batch)
            .generate_constraints(cs.clone())
            .unwrap();
        cs.is_satisfied().unwrap()
    }

    #[test]
    fn dummy_synthesizes_in_setup_mode() {
        let shape = CircuitShape::new(2, 4).unwrap();
        let cs = ConstraintSystem::<Fr>::new_ref();
        cs.set_mode(SynthesisMode::Setup);
        RollupCircuit::dummy(shape)
            .generate_constraints(cs.clone())
            .unwrap();

        assert_eq!(cs.num_instance_variables(), 1 + shape.num_public_inputs());
        assert!(cs.num_constraints() > 0);
        println!("batch of 2, depth 4: {} constraints", cs.num_constraints());
    }

    #[test]
    fn constraint_count_grows_with_batch_size() {
        let count = |batch_size| {
            let cs = ConstraintSystem::<Fr>::new_ref();
            cs.set_mode(SynthesisMode::Setup);
            RollupCircuit::dummy(CircuitShape::new(batch_size, 3).unwrap())
                .generate_constraints(cs.clone())
                .unwrap();
            cs.num_constraints()
        };
        let one = count(1);
        let two = count(2);
        let three = count(3);
        assert!(two > one);
        // Slots cost the same, the distinctness pairs grow quadratically.
        assert!(three - two > two - one);
    }

    #[test]
    fn balance_spent_in_two_slots_is_unsatisfiable() {
        // Account 0 holds 100 and signs its whole balance away twice, each
        // transfer valid on its own against the same root.
        let alice = SecretKey::from_seed(b"alice");
        let mut ledger = Ledger::new(4).unwrap();
        ledger.open_account(0, 100, alice.public_key()).unwrap();
        ledger
            .open_account(1, 0, SecretKey::from_seed(b"bob").public_key())
            .unwrap();
        ledger
            .open_account(2, 0, SecretKey::from_seed(b"carol").public_key())
            .unwrap();

        let single = BatchBuilder::new(CircuitShape::new(1, 4).unwrap());
        let spend = |to| TransferIntent {
            from: 0,
            to,
            amount: 100,
            signature: sign_transfer(&alice, ledger.account(0).unwrap(), to, 100),
        };
        let first = single.build(&mut ledger.clone(), &[spend(1)]).unwrap();
        let second = single.build(&mut ledger.clone(), &[spend(2)]).unwrap();
        assert_eq!(first.pre_root, second.pre_root);
        assert!(satisfied(first.batch.clone()));
        assert!(satisfied(second.batch.clone()));

        let shape = CircuitShape::new(2, 4).unwrap();
        let slots = vec![
            first.batch.slots()[0].clone(),
            second.batch.slots()[0].clone(),
        ];
        assert!(Batch::new(shape, first.pre_root, slots.clone()).is_err());

        let batch = Batch::unchecked(shape, first.pre_root, slots);
        assert_eq!(batch.balance_totals(), (200, 200));
        assert!(!satisfied(batch));
    }

    #[test]
    fn transfer_to_self_is_unsatisfiable() {
        // Sender and receiver both open leaf 0; without the index check this
        // would credit 120 while debiting to 80.
        let alice = SecretKey::from_seed(b"alice");
        let mut ledger = Ledger::new(4).unwrap();
        ledger.open_account(0, 100, alice.public_key()).unwrap();

        let before = *ledger.account(0).unwrap();
        let proof = ledger.proof(0).unwrap();
        let slot = BatchSlot {
            sender_before: before,
            receiver_before: before,
            sender_after: Account::new(0, 1, 80),
            receiver_after: Account::new(0, 1, 120),
            transfer: TransferWitness {
                amount: 20,
                sender_public_key: alice.public_key(),
                receiver_public_key: alice.public_key(),
                signature: sign_transfer(&alice, &before, 0, 20),
                sender_proof: proof.clone(),
                receiver_proof: proof,
            },
        };

        let shape = CircuitShape::new(1, 4).unwrap();
        assert!(Batch::new(shape, ledger.root(), vec![slot.clone()]).is_err());
        assert!(!satisfied(Batch::unchecked(shape, ledger.root(), vec![slot])));
    }
}
