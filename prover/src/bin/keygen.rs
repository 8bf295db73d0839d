//! Key Generation CLI for the batch transfer circuit
//!
//! Generates the proving and verifying keys for the circuit shape described by
//! the configuration, plus the verifier artifact for external verifiers.
//!
//! Usage:
//!   cargo run --package rollup-prover --bin keygen -- --pk-out ./keys/proving.key --vk-out ./keys/verifying.key
//!
//! Note: Key generation is a one-time operation. Keys must be regenerated if the
//! batch size, tree depth, receiver nonce policy or visibility layout changes.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

use prover::{CircuitShape, Groth16Pipeline, VerifierArtifact};
use rollup_config::RollupConfig;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();

    let mut config_path: Option<PathBuf> = None;
    let mut pk_out: Option<String> = None;
    let mut vk_out: Option<String> = None;
    let mut artifact_out: Option<String> = None;
    let mut seed: Option<u64> = None;
    let mut force = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                i += 1;
                if i < args.len() {
                    config_path = Some(PathBuf::from(&args[i]));
                }
            }
            "--pk-out" => {
                i += 1;
                if i < args.len() {
                    pk_out = Some(args[i].clone());
                }
            }
            "--vk-out" => {
                i += 1;
                if i < args.len() {
                    vk_out = Some(args[i].clone());
                }
            }
            "--artifact-out" => {
                i += 1;
                if i < args.len() {
                    artifact_out = Some(args[i].clone());
                }
            }
            "--seed" => {
                i += 1;
                if i < args.len() {
                    seed = Some(
                        args[i]
                            .parse()
                            .with_context(|| format!("Invalid seed: {}", args[i]))?,
                    );
                }
            }
            "--force" | "-f" => {
                force = true;
            }
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_help();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let config = match &config_path {
        Some(path) => RollupConfig::load_from(path)?,
        None => RollupConfig::load()?,
    };
    let shape = CircuitShape::from_config(&config).context("Invalid circuit configuration")?;

    let pk_path = pk_out.unwrap_or_else(|| config.keys.proving_key_path.clone());
    let vk_path = vk_out.unwrap_or_else(|| config.keys.verifying_key_path.clone());
    let artifact_path = artifact_out.unwrap_or_else(|| config.keys.verifier_artifact_path.clone());
    let seed = seed.or(config.keys.setup_seed);

    // Check if keys already exist
    if !force && Path::new(&pk_path).exists() && Path::new(&vk_path).exists() {
        println!("Keys already exist at:");
        println!("  Proving key:   {}", pk_path);
        println!("  Verifying key: {}", vk_path);
        println!("\nUse --force to regenerate keys.");
        return Ok(());
    }

    println!("Batch Transfer Circuit Key Generation");
    println!("=====================================");
    println!();
    println!("Circuit shape:");
    println!("  Batch size:      {}", shape.batch_size);
    println!("  Tree depth:      {} ({} accounts)", shape.tree_depth, shape.capacity());
    println!("  Receiver nonce:  {:?}", shape.receiver_nonce);
    println!(
        "  Visibility:      index {}, nonce {}, balance {}, amount {}",
        shape.layout.account_index,
        shape.layout.account_nonce,
        shape.layout.account_balance,
        shape.layout.transfer_amount
    );
    println!("  Conservation:    {}", shape.enforce_conservation);
    println!("  Public inputs:   {}", shape.num_public_inputs());
    println!("  Shape id:        {}", hex::encode(shape.id()));
    println!();

    let compiled = Groth16Pipeline::compile(&shape).context("Failed to compile circuit")?;
    println!("  Constraints:     {}", compiled.num_constraints);
    println!("  Witness vars:    {}", compiled.num_witness_variables);
    println!();

    println!("Performing Groth16 circuit-specific setup...");
    println!("This may take a few minutes...");
    let start = std::time::Instant::now();

    let keys = match seed {
        Some(seed) => {
            println!("WARNING: fixed setup seed {}; keys are for development only", seed);
            Groth16Pipeline::setup_seeded(&compiled, seed)
        }
        None => Groth16Pipeline::setup_from_os_entropy(&compiled),
    }
    .context("Failed to perform circuit setup")?;

    println!("Setup complete in {:?}", start.elapsed());
    println!();

    keys.save(Path::new(&pk_path), Path::new(&vk_path))
        .context("Failed to save keys")?;
    let pk_size = std::fs::metadata(&pk_path).map(|m| m.len()).unwrap_or(0);
    let vk_size = std::fs::metadata(&vk_path).map(|m| m.len()).unwrap_or(0);
    println!("Saved proving key to {}", pk_path);
    println!(
        "  Size: {} bytes ({:.2} MB)",
        pk_size,
        pk_size as f64 / 1024.0 / 1024.0
    );
    println!("Saved verifying key to {}", vk_path);
    println!("  Size: {} bytes", vk_size);

    let artifact = VerifierArtifact::new(keys.verifier());
    if artifact.num_public_inputs != shape.num_public_inputs() {
        bail!(
            "verifier expects {} public inputs, shape declares {}",
            artifact.num_public_inputs,
            shape.num_public_inputs()
        );
    }
    artifact.write(Path::new(&artifact_path))?;
    println!("Saved verifier artifact to {}", artifact_path);

    println!();
    println!("Verification key hash (blake3):");
    println!("  {}", artifact.vk_hash);

    println!();
    println!("Key generation complete!");
    println!();
    println!("To use these keys, set environment variables:");
    println!("  export ROLLUP_PROVING_KEY={}", pk_path);
    println!("  export ROLLUP_VERIFYING_KEY={}", vk_path);

    Ok(())
}

fn print_help() {
    println!("Batch Transfer Circuit Key Generation Tool");
    println!();
    println!("USAGE:");
    println!("    keygen [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    --config, -c <PATH>     Configuration file (default: rollup.toml lookup)");
    println!("    --pk-out <PATH>         Path for proving key output (default: from config)");
    println!("    --vk-out <PATH>         Path for verifying key output (default: from config)");
    println!("    --artifact-out <PATH>   Path for verifier JSON output (default: from config)");
    println!("    --seed <N>              Deterministic setup seed (development only)");
    println!("    --force, -f             Overwrite existing keys");
    println!("    --help, -h              Show this help message");
    println!();
    println!("EXAMPLES:");
    println!("    keygen --pk-out ./keys/proving.key --vk-out ./keys/verifying.key");
    println!("    keygen --seed 0 -f  # Reproducible development keys");
}
