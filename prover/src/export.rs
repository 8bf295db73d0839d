//! Verifier export.
//!
//! Points are written as little-endian affine coordinates, 32 bytes per base
//! field element: G1 is (x, y) = 64 bytes, G2 is (x.c0, x.c1, y.c0, y.c1) =
//! 128 bytes. The point at infinity is all zeros.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use ark_bn254::{Bn254, G1Affine, G2Affine};
use ark_ec::AffineRepr;
use ark_ff::{BigInteger, PrimeField};
use ark_groth16::{Proof, VerifyingKey};
use serde::{Deserialize, Serialize};

use crate::keys::VerifierKey;

/// Size of `proof_calldata`: -A (64) || B (128) || C (64)
pub const PROOF_CALLDATA_LEN: usize = 256;

fn put_field<F: PrimeField>(out: &mut [u8], f: &F) {
    let bytes = f.into_bigint().to_bytes_le();
    let n = bytes.len().min(32);
    out[..n].copy_from_slice(&bytes[..n]);
}

pub fn g1_to_bytes(p: &G1Affine) -> [u8; 64] {
    let mut bytes = [0u8; 64];
    if !p.is_zero() {
        put_field(&mut bytes[..32], &p.x);
        put_field(&mut bytes[32..], &p.y);
    }
    bytes
}

pub fn g2_to_bytes(p: &G2Affine) -> [u8; 128] {
    let mut bytes = [0u8; 128];
    if !p.is_zero() {
        put_field(&mut bytes[0..32], &p.x.c0);
        put_field(&mut bytes[32..64], &p.x.c1);
        put_field(&mut bytes[64..96], &p.y.c0);
        put_field(&mut bytes[96..128], &p.y.c1);
    }
    bytes
}

/// Groth16 proof laid out for a pairing-precompile verifier. A is negated so
/// the check becomes a single product of pairings equal to one.
pub fn proof_calldata(proof: &Proof<Bn254>) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(PROOF_CALLDATA_LEN);
    bytes.extend_from_slice(&g1_to_bytes(&(-proof.a)));
    bytes.extend_from_slice(&g2_to_bytes(&proof.b));
    bytes.extend_from_slice(&g1_to_bytes(&proof.c));
    bytes
}

/// Verifying key in a form an external verifier can store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifierArtifact {
    /// Alpha G1 point (64 bytes)
    #[serde(with = "hex")]
    pub alpha_g1: Vec<u8>,
    /// Beta G2 point (128 bytes)
    #[serde(with = "hex")]
    pub beta_g2: Vec<u8>,
    #[serde(with = "hex")]
    pub gamma_g2: Vec<u8>,
    #[serde(with = "hex")]
    pub delta_g2: Vec<u8>,
    /// IC points, hex encoded, 64 bytes each. ic[0] is the constant term.
    pub ic: Vec<String>,
    pub num_public_inputs: usize,
    pub batch_size: usize,
    pub tree_depth: usize,
    /// Fingerprint of the circuit shape, as stamped on proofs
    pub shape_id: String,
    /// blake3 of the compressed verifying key
    pub vk_hash: String,
}

impl VerifierArtifact {
    pub fn from_verifying_key(vk: &VerifyingKey<Bn254>, key: &VerifierKey) -> Self {
        Self {
            alpha_g1: g1_to_bytes(&vk.alpha_g1).to_vec(),
            beta_g2: g2_to_bytes(&vk.beta_g2).to_vec(),
            gamma_g2: g2_to_bytes(&vk.gamma_g2).to_vec(),
            delta_g2: g2_to_bytes(&vk.delta_g2).to_vec(),
            ic: vk
                .gamma_abc_g1
                .iter()
                .map(|p| hex::encode(g1_to_bytes(p)))
                .collect(),
            num_public_inputs: vk.gamma_abc_g1.len().saturating_sub(1),
            batch_size: key.shape().batch_size,
            tree_depth: key.shape().tree_depth,
            shape_id: hex::encode(key.shape().id()),
            vk_hash: hex::encode(key.verifying_key_hash()),
        }
    }

    pub fn new(key: &VerifierKey) -> Self {
        Self::from_verifying_key(key.verifying_key(), key)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize verifier artifact")
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).context("Failed to create output directory")?;
            }
        }
        fs::write(path, self.to_json()?)
            .with_context(|| format!("Failed to write {}", path.display()))
    }

    pub fn read(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&json).context("Failed to parse verifier artifact")
    }
}
