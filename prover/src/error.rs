//! Error taxonomy for the batch prover.
//!
//! Structural problems with a batch are caught before any constraint is
//! emitted. Everything after that is reported per pipeline stage, and a proof
//! that fails to verify is its own variant rather than a generic failure.

use ark_relations::r1cs::SynthesisError;
use thiserror::Error;

/// Malformed batch shape, detected before constraint emission
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BatchError {
    #[error("batch size must be at least 1")]
    EmptyBatch,

    #[error("tree depth must be between 1 and {max}, got {depth}")]
    TreeDepth { depth: usize, max: usize },

    #[error("expected {expected} transfer slots, got {got}")]
    SlotCount { expected: usize, got: usize },

    #[error("slot {slot}: {role} inclusion proof has {got} siblings, expected {expected}")]
    ProofDepth {
        slot: usize,
        role: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("slot {slot}: {role} index {index} does not fit a tree of {capacity} leaves")]
    IndexOutOfRange {
        slot: usize,
        role: &'static str,
        index: u64,
        capacity: u64,
    },

    #[error("slot {slot}: sender and receiver are both account {index}")]
    SelfTransfer { slot: usize, index: u64 },

    #[error("account {index} appears in slot {first} and slot {second}")]
    AccountReused {
        index: u64,
        first: usize,
        second: usize,
    },
}

#[derive(Error, Debug)]
pub enum CompileError {
    #[error("invalid circuit shape: {0}")]
    Structural(#[from] BatchError),

    #[error("constraint synthesis failed: {0}")]
    Synthesis(SynthesisError),
}

impl From<SynthesisError> for CompileError {
    fn from(e: SynthesisError) -> Self {
        CompileError::Synthesis(e)
    }
}

#[derive(Error, Debug)]
pub enum SetupError {
    #[error("circuit-specific setup failed: {0}")]
    Synthesis(SynthesisError),

    #[error("verifying key preparation failed: {0}")]
    Prepare(SynthesisError),

    #[error("operating system entropy unavailable: {0}")]
    Entropy(String),
}

impl From<SynthesisError> for SetupError {
    fn from(e: SynthesisError) -> Self {
        SetupError::Synthesis(e)
    }
}

#[derive(Error, Debug)]
pub enum ProveError {
    #[error("invalid batch: {0}")]
    Structural(#[from] BatchError),

    #[error("batch shape does not match the proving key")]
    ShapeMismatch,

    /// The assignment violates at least one asserted relation.
    #[error("witness does not satisfy the circuit (first failing constraint: {constraint})")]
    Unsatisfied { constraint: String },

    #[error("proof generation failed: {0}")]
    Synthesis(SynthesisError),
}

impl From<SynthesisError> for ProveError {
    fn from(e: SynthesisError) -> Self {
        match e {
            SynthesisError::Unsatisfiable => ProveError::Unsatisfied {
                constraint: "constant assertion".into(),
            },
            other => ProveError::Synthesis(other),
        }
    }
}

#[derive(Error, Debug)]
pub enum VerifyError {
    /// The proof is well formed but does not attest to these public inputs.
    #[error("verification failed")]
    Rejected,

    #[error("proof was produced for a different circuit shape")]
    ShapeMismatch,

    #[error("expected {expected} public inputs, got {got}")]
    PublicInputCount { expected: usize, got: usize },

    #[error("malformed proof: {0}")]
    Malformed(String),

    #[error("verifier error: {0}")]
    Synthesis(SynthesisError),
}

impl VerifyError {
    /// True for the legitimate "does not verify" outcome, false for errors.
    pub fn is_rejection(&self) -> bool {
        matches!(self, VerifyError::Rejected)
    }
}

#[derive(Error, Debug)]
pub enum KeyError {
    #[error("key file i/o: {0}")]
    Io(#[from] std::io::Error),

    #[error("key serialization: {0}")]
    Serialization(String),

    #[error("key was generated for a different circuit shape")]
    ShapeMismatch,

    #[error("verifying key preparation failed: {0}")]
    Prepare(SynthesisError),
}

/// Operator-side failures while assembling a batch from ledger state
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error(transparent)]
    Structural(#[from] BatchError),

    #[error("ledger depth {ledger} does not match circuit depth {circuit}")]
    DepthMismatch { ledger: usize, circuit: usize },

    #[error("expected {expected} transfers for this batch, got {got}")]
    IntentCount { expected: usize, got: usize },

    #[error("unknown account {0}")]
    UnknownAccount(u64),

    #[error("account {0} already exists")]
    AccountExists(u64),

    #[error("account {index} does not fit a tree of {capacity} leaves")]
    IndexOutOfRange { index: u64, capacity: u64 },

    #[error("account {index} holds {balance}, cannot send {amount}")]
    InsufficientBalance { index: u64, balance: u64, amount: u64 },

    #[error("crediting account {0} overflows its balance")]
    BalanceOverflow(u64),

    #[error("signature on transfer from account {0} does not verify")]
    InvalidSignature(u64),
}
