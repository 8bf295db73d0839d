#![allow(dead_code)]

use std::sync::OnceLock;

use prover::{
    Batch, BatchBuilder, BatchSlot, BuiltBatch, CircuitShape, Groth16Pipeline, KeyPair, Ledger,
    SecretKey, TransferIntent, sign_transfer,
};

/// Small tree to keep setup fast
pub const DEPTH: usize = 4;

pub fn secret(index: u64) -> SecretKey {
    SecretKey::from_seed(&index.to_le_bytes())
}

/// Ledger where account i holds balances[i].
pub fn ledger(depth: usize, balances: &[u64]) -> Ledger {
    let mut ledger = Ledger::new(depth).unwrap();
    for (index, balance) in balances.iter().enumerate() {
        let index = index as u64;
        ledger
            .open_account(index, *balance, secret(index).public_key())
            .unwrap();
    }
    ledger
}

pub fn transfer(ledger: &Ledger, from: u64, to: u64, amount: u64) -> TransferIntent {
    let sender = ledger.account(from).unwrap();
    TransferIntent {
        from,
        to,
        amount,
        signature: sign_transfer(&secret(from), sender, to, amount),
    }
}

/// {index 0, nonce 0, balance 100} sends 20 to {index 1, nonce 0, balance 0}.
pub fn legacy_batch(shape: CircuitShape) -> BuiltBatch {
    let mut ledger = ledger(shape.tree_depth, &[100, 0]);
    let intent = transfer(&ledger, 0, 1, 20);
    BatchBuilder::new(shape).build(&mut ledger, &[intent]).unwrap()
}

pub fn legacy_shape() -> CircuitShape {
    CircuitShape::new(1, DEPTH).unwrap()
}

/// Copy of `batch` with its slots edited. Only structural checks run, so
/// the result may well be unsatisfiable.
pub fn edit(batch: &Batch, f: impl FnOnce(&mut Vec<BatchSlot>)) -> Batch {
    let mut slots = batch.slots().to_vec();
    f(&mut slots);
    Batch::new(*batch.shape(), batch.account_root(), slots).unwrap()
}

/// Seeded keys for `legacy_shape`, generated once per test binary.
pub fn keys() -> &'static KeyPair {
    static KEYS: OnceLock<KeyPair> = OnceLock::new();
    KEYS.get_or_init(|| {
        let compiled = Groth16Pipeline::compile(&legacy_shape()).unwrap();
        Groth16Pipeline::setup_seeded(&compiled, 42).unwrap()
    })
}
