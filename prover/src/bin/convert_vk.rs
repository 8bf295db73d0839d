//! Convert a verifying key to the verifier artifact JSON
//!
//! Usage:
//!   cargo run --package rollup-prover --bin convert_vk -- \
//!     --vk-in ./keys/verifying.key \
//!     --vk-out ./keys/verifier.json
//!
//! The key must have been generated for the circuit shape in the current
//! configuration; a key for any other shape is refused.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use prover::{CircuitShape, VerifierArtifact, VerifierKey};
use rollup_config::RollupConfig;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();

    let mut config_path: Option<PathBuf> = None;
    let mut vk_in: Option<String> = None;
    let mut vk_out: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                i += 1;
                if i < args.len() {
                    config_path = Some(PathBuf::from(&args[i]));
                }
            }
            "--vk-in" => {
                i += 1;
                if i < args.len() {
                    vk_in = Some(args[i].clone());
                }
            }
            "--vk-out" => {
                i += 1;
                if i < args.len() {
                    vk_out = Some(args[i].clone());
                }
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
    let vk_in_path = vk_in.unwrap_or_else(|| config.keys.verifying_key_path.clone());
    let vk_out_path = vk_out.unwrap_or_else(|| config.keys.verifier_artifact_path.clone());

    println!("Verifying Key Conversion Tool");
    println!("=============================");
    println!();

    if !Path::new(&vk_in_path).exists() {
        eprintln!("Error: Verifying key not found at {}", vk_in_path);
        eprintln!();
        eprintln!("Generate keys first with:");
        eprintln!("  cargo run --package rollup-prover --bin keygen");
        std::process::exit(1);
    }

    println!("Loading verifying key from {}...", vk_in_path);
    let key = VerifierKey::load(Path::new(&vk_in_path), shape)
        .with_context(|| format!("Failed to load verifying key for shape {}", hex::encode(shape.id())))?;

    let artifact = VerifierArtifact::new(&key);
    println!(
        "  IC points: {} (for {} public inputs)",
        artifact.ic.len(),
        artifact.num_public_inputs
    );
    println!("  alpha_g1: {} bytes", artifact.alpha_g1.len());
    println!("  beta_g2: {} bytes", artifact.beta_g2.len());
    println!("  gamma_g2: {} bytes", artifact.gamma_g2.len());
    println!("  delta_g2: {} bytes", artifact.delta_g2.len());

    println!("Writing output to {}...", vk_out_path);
    artifact.write(Path::new(&vk_out_path))?;

    println!();
    println!("Conversion complete!");
    println!("  Output: {}", vk_out_path);
    println!("  VK hash: {}", artifact.vk_hash);

    Ok(())
}

fn print_help() {
    println!("Verifying Key Conversion Tool");
    println!();
    println!("Converts a verifying key written by keygen into the JSON artifact");
    println!("consumed by external verifiers.");
    println!();
    println!("USAGE:");
    println!("    convert_vk [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    --config, -c <PATH>  Configuration file (default: rollup.toml lookup)");
    println!("    --vk-in <PATH>       Path to verifying key (default: from config)");
    println!("    --vk-out <PATH>      Path for JSON output (default: from config)");
    println!("    --help, -h           Show this help message");
    println!();
    println!("EXAMPLE:");
    println!("    convert_vk --vk-in ./keys/verifying.key --vk-out ./keys/verifier.json");
}
