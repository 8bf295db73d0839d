//! Prover backends and the async proving service.

use std::path::Path;

use ark_bn254::Fr;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use crate::{
    error::{KeyError, ProveError, VerifyError},
    keys::KeyPair,
    pipeline::{BatchProof, Groth16Pipeline},
    witness::{Batch, CircuitShape},
};

// ============================================================================
// Prover Trait
// ============================================================================

/// Anything that can prove and check batches for one circuit shape.
pub trait BatchProver: Send + Sync {
    /// Generate a proof for a batch
    fn prove(&self, batch: &Batch) -> Result<BatchProof, ProveError>;

    /// Check a proof against the batch's public inputs
    fn verify(&self, proof: &BatchProof, public_inputs: &[Fr]) -> Result<(), VerifyError>;

    /// Hash of the verifying key, for whoever checks proofs downstream
    fn verification_key_hash(&self) -> [u8; 32];
}

// ============================================================================
// Groth16 Prover
// ============================================================================

pub struct Groth16Prover {
    keys: KeyPair,
}

impl Groth16Prover {
    pub fn new(keys: KeyPair) -> Self {
        Self { keys }
    }

    pub fn from_files(
        pk_path: &Path,
        vk_path: &Path,
        shape: CircuitShape,
    ) -> Result<Self, KeyError> {
        let keys = KeyPair::load(pk_path, vk_path, shape)?;
        log::info!(
            "Loaded Groth16 prover, vk hash {}",
            hex::encode(keys.verifying_key_hash())
        );
        Ok(Self { keys })
    }

    pub fn keys(&self) -> &KeyPair {
        &self.keys
    }
}

impl BatchProver for Groth16Prover {
    /// Proof randomness is derived from the witness.
    fn prove(&self, batch: &Batch) -> Result<BatchProof, ProveError> {
        Groth16Pipeline::prove_deterministic(&self.keys, batch)
    }

    fn verify(&self, proof: &BatchProof, public_inputs: &[Fr]) -> Result<(), VerifyError> {
        Groth16Pipeline::verify(self.keys.verifier(), proof, public_inputs)
    }

    fn verification_key_hash(&self) -> [u8; 32] {
        self.keys.verifying_key_hash()
    }
}

// ============================================================================
// Async Prover Service
// ============================================================================

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("prover service unavailable")]
    Unavailable,

    #[error("prover crashed")]
    Crashed,

    #[error(transparent)]
    Prove(#[from] ProveError),
}

/// Request to prove a batch
struct ProveRequest {
    batch_id: u64,
    batch: Batch,
    reply: oneshot::Sender<Result<BatchProof, ProveError>>,
}

/// Runs proving on a dedicated thread so CPU-bound work stays off the
/// async runtime. Requests are served one at a time, in submission order.
#[derive(Clone)]
pub struct ProverService {
    request_tx: mpsc::Sender<ProveRequest>,
}

impl ProverService {
    pub fn start<P: BatchProver + 'static>(prover: P) -> Self {
        let (request_tx, mut request_rx) = mpsc::channel::<ProveRequest>(32);

        std::thread::spawn(move || {
            while let Some(request) = request_rx.blocking_recv() {
                let result = prover.prove(&request.batch);
                match &result {
                    Ok(_) => log::info!("Batch {} proved", request.batch_id),
                    Err(e) => log::warn!("Batch {} failed to prove: {}", request.batch_id, e),
                }
                let _ = request.reply.send(result);
            }
            log::debug!("Prover service stopped");
        });

        Self { request_tx }
    }

    /// Submit a batch for proving and wait for the result.
    pub async fn prove(&self, batch_id: u64, batch: Batch) -> Result<BatchProof, ServiceError> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.request_tx
            .send(ProveRequest {
                batch_id,
                batch,
                reply: reply_tx,
            })
            .await
            .map_err(|_| ServiceError::Unavailable)?;

        Ok(reply_rx.await.map_err(|_| ServiceError::Crashed)??)
    }
}
