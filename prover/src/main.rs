//! Batch transfer prover demo
//!
//! Runs the whole pipeline once in memory: opens a ledger, signs one transfer
//! per batch slot, builds the batch, runs setup, proves and verifies.
//!
//! Slot k moves 20 from account 2k (balance 100) to account 2k+1 (balance 0).

use anyhow::{Context, Result, bail};

use prover::{
    BatchBuilder, CircuitShape, Groth16Pipeline, Ledger, SecretKey, TransferIntent,
    proof_calldata, sign_transfer,
};
use rollup_config::RollupConfig;

const OPENING_BALANCE: u64 = 100;
const AMOUNT: u64 = 20;
const DEMO_SEED: u64 = 0;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = RollupConfig::load()?;
    let shape = CircuitShape::from_config(&config).context("Invalid circuit configuration")?;
    let accounts = 2 * shape.batch_size as u64;
    if accounts > shape.capacity() {
        bail!(
            "tree of depth {} cannot hold {} demo accounts",
            shape.tree_depth,
            accounts
        );
    }

    println!("Batch Transfer Prover");
    println!("=====================");
    println!();

    let mut ledger = Ledger::new(shape.tree_depth)?;
    let mut secrets = Vec::with_capacity(accounts as usize);
    for index in 0..accounts {
        let secret = SecretKey::from_seed(&index.to_le_bytes());
        let balance = if index % 2 == 0 { OPENING_BALANCE } else { 0 };
        ledger.open_account(index, balance, secret.public_key())?;
        secrets.push(secret);
    }

    let mut intents = Vec::with_capacity(shape.batch_size);
    for slot in 0..shape.batch_size as u64 {
        let (from, to) = (2 * slot, 2 * slot + 1);
        let sender = ledger
            .account(from)
            .with_context(|| format!("account {} missing", from))?;
        let signature = sign_transfer(&secrets[from as usize], sender, to, AMOUNT);
        intents.push(TransferIntent {
            from,
            to,
            amount: AMOUNT,
            signature,
        });
    }

    let built = BatchBuilder::new(shape).build(&mut ledger, &intents)?;
    for (i, slot) in built.batch.slots().iter().enumerate() {
        println!(
            "slot {}: {:?} -> {:?}, {:?} -> {:?}",
            i, slot.sender_before, slot.sender_after, slot.receiver_before, slot.receiver_after
        );
    }
    println!("pre-batch root:  {}", built.pre_root);
    println!("post-batch root: {}", built.post_root);
    println!();

    let compiled = Groth16Pipeline::compile(&shape)?;
    println!(
        "Circuit: {} constraints, {} public inputs",
        compiled.num_constraints, compiled.num_public_inputs
    );

    let seed = config.keys.setup_seed.unwrap_or(DEMO_SEED);
    let keys = Groth16Pipeline::setup_seeded(&compiled, seed)?;
    let proof = Groth16Pipeline::prove_deterministic(&keys, &built.batch)?;
    println!("Proof calldata: {}", hex::encode(proof_calldata(&proof.proof)));

    let public_inputs = built.batch.public_inputs();
    match Groth16Pipeline::verify(keys.verifier(), &proof, &public_inputs) {
        Ok(()) => println!("verification succeeded"),
        Err(e) => {
            log::error!("{}", e);
            println!("verification failed");
        }
    }

    Ok(())
}
