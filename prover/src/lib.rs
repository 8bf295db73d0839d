pub mod constants;
pub mod error;
pub mod export;
pub mod keys;
pub mod pipeline;
pub mod service;
pub mod signature;
pub mod tree;
pub mod witness;
pub mod witness_builder;

pub mod circuit;
pub mod rollup_circuit;

// Re-export key types for external usage
pub use error::{
    BatchError, BuildError, CompileError, KeyError, ProveError, SetupError, VerifyError,
};
pub use export::{VerifierArtifact, proof_calldata};
pub use keys::{KeyPair, VerifierKey};
pub use pipeline::{BatchProof, CompiledCircuit, Groth16Pipeline};
pub use rollup_account::{Account, ReceiverNonce, Visibility, WitnessLayout};
pub use rollup_circuit::RollupCircuit;
pub use service::{BatchProver, Groth16Prover, ProverService, ServiceError};
pub use signature::{PublicKey, SecretKey, Signature};
pub use tree::{AccountTree, MerkleProof};
pub use witness::{Batch, BatchSlot, CircuitShape, TransferWitness};
pub use witness_builder::{BatchBuilder, BuiltBatch, Ledger, TransferIntent, sign_transfer};
