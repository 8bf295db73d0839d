//! Transition rules at the constraint level: every check here synthesizes the
//! full witness and asks whether the constraint system is satisfied.

mod common;

use ark_bn254::Fr;
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystem};
use prover::{
    Account, Batch, BatchBuilder, CircuitShape, Groth16Pipeline, ProveError, ReceiverNonce,
    RollupCircuit, WitnessLayout, sign_transfer,
};

use common::{DEPTH, edit, legacy_batch, legacy_shape, ledger, secret, transfer};

fn assert_satisfied(batch: &Batch) {
    if let Err(e) = Groth16Pipeline::check_satisfied(batch) {
        panic!("expected a satisfiable witness, got {}", e);
    }
}

fn assert_unsatisfied(batch: &Batch) {
    match Groth16Pipeline::check_satisfied(batch) {
        Err(ProveError::Unsatisfied { constraint }) => {
            println!("rejected at {}", constraint);
        }
        other => panic!("expected an unsatisfied witness, got {:?}", other),
    }
}

// ============================================================================
// Completeness
// ============================================================================

#[test]
fn legacy_example_is_satisfiable() {
    let built = legacy_batch(legacy_shape());
    let slot = &built.batch.slots()[0];
    assert_eq!(slot.sender_after, Account::new(0, 1, 80));
    assert_eq!(slot.receiver_after, Account::new(1, 1, 20));
    assert_satisfied(&built.batch);
}

#[test]
fn multi_slot_batch_is_satisfiable() {
    let shape = CircuitShape::new(3, DEPTH).unwrap();
    let mut ledger = ledger(DEPTH, &[100, 0, 50, 7, 1_000, 0]);
    let intents = [
        transfer(&ledger, 0, 1, 20),
        transfer(&ledger, 2, 3, 50),
        transfer(&ledger, 4, 5, 1),
    ];
    let built = BatchBuilder::new(shape).build(&mut ledger, &intents).unwrap();
    assert_satisfied(&built.batch);
}

#[test]
fn sending_entire_balance_is_satisfiable() {
    let shape = legacy_shape();
    let mut ledger = ledger(DEPTH, &[100, 0]);
    let intent = transfer(&ledger, 0, 1, 100);
    let built = BatchBuilder::new(shape).build(&mut ledger, &[intent]).unwrap();
    assert_eq!(built.batch.slots()[0].sender_after.balance, 0);
    assert_satisfied(&built.batch);
}

#[test]
fn zero_amount_transfer_is_satisfiable() {
    let shape = legacy_shape();
    let mut ledger = ledger(DEPTH, &[100, 0]);
    let intent = transfer(&ledger, 0, 1, 0);
    let built = BatchBuilder::new(shape).build(&mut ledger, &[intent]).unwrap();
    assert_satisfied(&built.batch);
}

#[test]
fn accounts_at_high_indices_are_satisfiable() {
    let shape = legacy_shape();
    let mut ledger = ledger(DEPTH, &[]);
    for index in [13u64, 15] {
        ledger
            .open_account(index, 500, secret(index).public_key())
            .unwrap();
    }
    let intent = transfer(&ledger, 15, 13, 250);
    let built = BatchBuilder::new(shape).build(&mut ledger, &[intent]).unwrap();
    assert_satisfied(&built.batch);
}

#[test]
fn second_batch_chains_from_post_root() {
    let shape = legacy_shape();
    let builder = BatchBuilder::new(shape);
    let mut ledger = ledger(DEPTH, &[100, 0]);

    let intent = transfer(&ledger, 0, 1, 20);
    let first = builder.build(&mut ledger, &[intent]).unwrap();
    let intent = transfer(&ledger, 1, 0, 5);
    let second = builder.build(&mut ledger, &[intent]).unwrap();

    assert_eq!(second.pre_root, first.post_root);
    assert_eq!(second.batch.slots()[0].sender_before, Account::new(1, 1, 20));
    assert_satisfied(&second.batch);
}

// ============================================================================
// Soundness
// ============================================================================

#[test]
fn overdraft_is_unsatisfiable() {
    // Sender holds 100 and signs for 150. No after-balance makes this valid.
    let built = legacy_batch(legacy_shape());
    for sender_after_balance in [0u64, 100u64.wrapping_sub(150), 50] {
        let batch = edit(&built.batch, |slots| {
            let slot = &mut slots[0];
            slot.transfer.amount = 150;
            slot.transfer.signature = sign_transfer(&secret(0), &slot.sender_before, 1, 150);
            slot.sender_after.balance = sender_after_balance;
            slot.receiver_after.balance = 150;
        });
        assert_unsatisfied(&batch);
    }
}

#[test]
fn receiver_overflow_is_unsatisfiable() {
    let shape = legacy_shape();
    let mut ledger = ledger(DEPTH, &[100, u64::MAX - 10]);
    let intent = transfer(&ledger, 0, 1, 5);
    let built = BatchBuilder::new(shape).build(&mut ledger, &[intent]).unwrap();
    assert_satisfied(&built.batch);

    let batch = edit(&built.batch, |slots| {
        let slot = &mut slots[0];
        slot.transfer.amount = 20;
        slot.transfer.signature = sign_transfer(&secret(0), &slot.sender_before, 1, 20);
        slot.sender_after.balance = 80;
        slot.receiver_after.balance = u64::MAX;
    });
    assert_unsatisfied(&batch);
}

#[test]
fn sender_index_is_immutable() {
    let built = legacy_batch(legacy_shape());
    for index in [1u64, 5, 15] {
        let batch = edit(&built.batch, |slots| slots[0].sender_after.index = index);
        assert_unsatisfied(&batch);
    }
}

#[test]
fn receiver_index_is_immutable() {
    let built = legacy_batch(legacy_shape());
    let batch = edit(&built.batch, |slots| slots[0].receiver_after.index = 0);
    assert_unsatisfied(&batch);
}

#[test]
fn sender_nonce_must_advance_by_one() {
    let built = legacy_batch(legacy_shape());
    for nonce in [0u64, 2] {
        let batch = edit(&built.batch, |slots| slots[0].sender_after.nonce = nonce);
        assert_unsatisfied(&batch);
    }
}

#[test]
fn balances_must_be_conserved() {
    let built = legacy_batch(legacy_shape());
    let (before, after) = built.batch.balance_totals();
    assert_eq!(before, after);

    let minted = edit(&built.batch, |slots| slots[0].receiver_after.balance = 21);
    assert_unsatisfied(&minted);

    let burned = edit(&built.batch, |slots| slots[0].sender_after.balance = 79);
    assert_unsatisfied(&burned);
}

#[test]
fn per_slot_rules_conserve_without_batch_constraint() {
    let shape = legacy_shape().with_conservation(false);
    let built = legacy_batch(shape);
    assert_satisfied(&built.batch);

    let minted = edit(&built.batch, |slots| slots[0].receiver_after.balance = 21);
    assert_unsatisfied(&minted);
}

#[test]
fn receiver_nonce_follows_policy() {
    let built = legacy_batch(legacy_shape());
    let unchanged = edit(&built.batch, |slots| slots[0].receiver_after.nonce = 0);
    assert_unsatisfied(&unchanged);

    let shape = legacy_shape().with_receiver_nonce(ReceiverNonce::Unchanged);
    let built = legacy_batch(shape);
    assert_eq!(built.batch.slots()[0].receiver_after.nonce, 0);
    assert_satisfied(&built.batch);

    let incremented = edit(&built.batch, |slots| slots[0].receiver_after.nonce = 1);
    assert_unsatisfied(&incremented);
}

// ============================================================================
// Authorization
// ============================================================================

#[test]
fn signature_from_another_key_is_unsatisfiable() {
    let built = legacy_batch(legacy_shape());
    let batch = edit(&built.batch, |slots| {
        let slot = &mut slots[0];
        slot.transfer.signature = sign_transfer(&secret(1), &slot.sender_before, 1, 20);
    });
    assert_unsatisfied(&batch);
}

#[test]
fn signature_over_other_amount_is_unsatisfiable() {
    let built = legacy_batch(legacy_shape());
    let batch = edit(&built.batch, |slots| {
        let slot = &mut slots[0];
        slot.transfer.signature = sign_transfer(&secret(0), &slot.sender_before, 1, 10);
    });
    assert_unsatisfied(&batch);
}

#[test]
fn tampered_signature_scalar_is_unsatisfiable() {
    let built = legacy_batch(legacy_shape());
    let batch = edit(&built.batch, |slots| {
        slots[0].transfer.signature.s += ark_ed_on_bn254::Fr::from(1u64);
    });
    assert_unsatisfied(&batch);
}

#[test]
fn substituted_sender_key_fails_membership() {
    // A self-consistent key and signature that are not the ones committed in
    // the tree for account 0.
    let built = legacy_batch(legacy_shape());
    let batch = edit(&built.batch, |slots| {
        let slot = &mut slots[0];
        let impostor = secret(99);
        slot.transfer.sender_public_key = impostor.public_key();
        slot.transfer.signature = sign_transfer(&impostor, &slot.sender_before, 1, 20);
    });
    assert_unsatisfied(&batch);
}

// ============================================================================
// Membership
// ============================================================================

#[test]
fn wrong_root_is_unsatisfiable() {
    let built = legacy_batch(legacy_shape());
    let batch = Batch::new(
        *built.batch.shape(),
        built.post_root,
        built.batch.slots().to_vec(),
    )
    .unwrap();
    assert_unsatisfied(&batch);
}

#[test]
fn tampered_path_is_unsatisfiable() {
    let built = legacy_batch(legacy_shape());
    let batch = edit(&built.batch, |slots| {
        slots[0].transfer.receiver_proof.siblings[DEPTH - 1] += Fr::from(1u64);
    });
    assert_unsatisfied(&batch);
}

#[test]
fn inflated_before_balance_fails_membership() {
    let built = legacy_batch(legacy_shape());
    let batch = edit(&built.batch, |slots| {
        let slot = &mut slots[0];
        slot.sender_before.balance = 1_000;
        slot.sender_after.balance = 980;
    });
    assert_unsatisfied(&batch);
}

#[test]
fn unopened_receiver_fails_membership() {
    let built = legacy_batch(legacy_shape());
    let ledger = ledger(DEPTH, &[100, 0]);
    assert!(ledger.account(7).is_none());
    let empty_proof = ledger.proof(7).unwrap();
    let batch = edit(&built.batch, |slots| {
        let slot = &mut slots[0];
        slot.receiver_before = Account::new(7, 0, 0);
        slot.receiver_after = Account::new(7, 1, 20);
        slot.transfer.receiver_proof = empty_proof;
        slot.transfer.signature = sign_transfer(&secret(0), &slot.sender_before, 7, 20);
    });
    assert_unsatisfied(&batch);
}

// ============================================================================
// Public inputs
// ============================================================================

fn instance_values(batch: &Batch) -> Vec<Fr> {
    let cs = ConstraintSystem::<Fr>::new_ref();
    RollupCircuit::new(batch.clone())
        .generate_constraints(cs.clone())
        .unwrap();
    let inner = cs.borrow().unwrap();
    // Skip the constant-one variable.
    inner.instance_assignment[1..].to_vec()
}

#[test]
fn public_inputs_match_circuit_allocation() {
    let built = legacy_batch(legacy_shape());
    let expected: Vec<Fr> = std::iter::once(built.pre_root)
        .chain([100u64, 0, 80, 20, 20].into_iter().map(Fr::from))
        .collect();
    assert_eq!(built.batch.public_inputs(), expected);
    assert_eq!(instance_values(&built.batch), expected);
}

#[test]
fn private_layout_exposes_only_the_root() {
    let shape = legacy_shape().with_layout(WitnessLayout::all_private());
    let built = legacy_batch(shape);
    assert_eq!(shape.num_public_inputs(), 1);
    assert_eq!(instance_values(&built.batch), vec![built.pre_root]);
    assert_satisfied(&built.batch);
}
