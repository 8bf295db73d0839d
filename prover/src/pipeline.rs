//! Groth16 pipeline: compile, setup, prove, verify.
//!
//! Thin adapter over arkworks. The one behavior added on top is that `prove`
//! checks the witness against the constraint system first, since Groth16
//! itself would happily produce a proof for an unsatisfied assignment that
//! then fails to verify.

use std::time::Instant;

use ark_bn254::{Bn254, Fr};
use ark_groth16::{Groth16, Proof};
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystem, SynthesisMode};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize, SerializationError};
use ark_snark::SNARK;
use ark_std::rand::{CryptoRng, RngCore, SeedableRng, rngs::StdRng};
use rand_core::{OsRng, TryRngCore};

use crate::{
    error::{CompileError, ProveError, SetupError, VerifyError},
    keys::{KeyPair, VerifierKey},
    rollup_circuit::RollupCircuit,
    witness::{Batch, BatchSlot, CircuitShape},
};

/// Size of a synthesized constraint system
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CompiledCircuit {
    pub shape: CircuitShape,
    pub num_constraints: usize,
    /// Public inputs, not counting the constant-one variable
    pub num_public_inputs: usize,
    pub num_witness_variables: usize,
}

/// A Groth16 proof stamped with the shape it was produced for.
#[derive(Clone, Debug, PartialEq)]
pub struct BatchProof {
    pub shape_id: [u8; 32],
    pub proof: Proof<Bn254>,
}

impl BatchProof {
    /// shape id (32 bytes) followed by the compressed proof
    pub fn to_bytes(&self) -> Result<Vec<u8>, SerializationError> {
        let mut bytes = Vec::with_capacity(32 + self.proof.compressed_size());
        bytes.extend_from_slice(&self.shape_id);
        self.proof.serialize_compressed(&mut bytes)?;
        Ok(bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, VerifyError> {
        if bytes.len() < 32 {
            return Err(VerifyError::Malformed(format!(
                "proof too short ({} bytes)",
                bytes.len()
            )));
        }
        let (id, body) = bytes.split_at(32);
        let mut shape_id = [0u8; 32];
        shape_id.copy_from_slice(id);

        let proof = Proof::<Bn254>::deserialize_compressed(body)
            .map_err(|e| VerifyError::Malformed(e.to_string()))?;
        Ok(Self { shape_id, proof })
    }
}

pub struct Groth16Pipeline;

impl Groth16Pipeline {
    /// Synthesize the circuit without a witness and report its size.
    pub fn compile(shape: &CircuitShape) -> Result<CompiledCircuit, CompileError> {
        shape.validate()?;
        let start = Instant::now();

        let cs = ConstraintSystem::<Fr>::new_ref();
        cs.set_mode(SynthesisMode::Setup);
        RollupCircuit::dummy(*shape).generate_constraints(cs.clone())?;
        cs.finalize();

        let compiled = CompiledCircuit {
            shape: *shape,
            num_constraints: cs.num_constraints(),
            num_public_inputs: cs.num_instance_variables() - 1,
            num_witness_variables: cs.num_witness_variables(),
        };
        log::info!(
            "Compiled circuit (batch {}, depth {}): {} constraints, {} public inputs in {:?}",
            shape.batch_size,
            shape.tree_depth,
            compiled.num_constraints,
            compiled.num_public_inputs,
            start.elapsed()
        );
        Ok(compiled)
    }

    /// Circuit-specific setup. Run once per shape and share the result.
    pub fn setup<R: RngCore + CryptoRng>(
        compiled: &CompiledCircuit,
        rng: &mut R,
    ) -> Result<KeyPair, SetupError> {
        let start = Instant::now();
        let (proving_key, _) =
            Groth16::<Bn254>::circuit_specific_setup(RollupCircuit::dummy(compiled.shape), rng)?;
        let keys = KeyPair::from_parts(compiled.shape, proving_key).map_err(SetupError::Prepare)?;

        log::info!(
            "Setup complete in {:?}, vk hash {}",
            start.elapsed(),
            hex::encode(keys.verifying_key_hash())
        );
        Ok(keys)
    }

    /// Setup seeded from operating system entropy. The seed is dropped as
    /// soon as setup returns.
    pub fn setup_from_os_entropy(compiled: &CompiledCircuit) -> Result<KeyPair, SetupError> {
        let mut seed = [0u8; 32];
        OsRng
            .try_fill_bytes(&mut seed)
            .map_err(|e| SetupError::Entropy(e.to_string()))?;
        Self::setup(compiled, &mut StdRng::from_seed(seed))
    }

    /// Setup from a fixed seed. Anyone who knows the seed can forge proofs.
    pub fn setup_seeded(compiled: &CompiledCircuit, seed: u64) -> Result<KeyPair, SetupError> {
        log::warn!(
            "Running setup with fixed seed {}; keys are NOT suitable for production",
            seed
        );
        Self::setup(compiled, &mut StdRng::seed_from_u64(seed))
    }

    /// Synthesize with the full witness and report the first violated
    /// constraint, if any.
    pub fn check_satisfied(batch: &Batch) -> Result<(), ProveError> {
        let cs = ConstraintSystem::<Fr>::new_ref();
        RollupCircuit::new(batch.clone()).generate_constraints(cs.clone())?;

        if !cs.is_satisfied()? {
            let constraint = cs
                .which_is_unsatisfied()?
                .unwrap_or_else(|| "unknown".to_string());
            log::debug!("unsatisfied constraint: {}", constraint);
            return Err(ProveError::Unsatisfied { constraint });
        }
        Ok(())
    }

    pub fn prove<R: RngCore + CryptoRng>(
        keys: &KeyPair,
        batch: &Batch,
        rng: &mut R,
    ) -> Result<BatchProof, ProveError> {
        if batch.shape() != keys.shape() {
            return Err(ProveError::ShapeMismatch);
        }

        let start = Instant::now();
        Self::check_satisfied(batch)?;

        let proof =
            Groth16::<Bn254>::prove(keys.proving_key(), RollupCircuit::new(batch.clone()), rng)?;
        log::info!(
            "Proved batch of {} transfers in {:?}",
            batch.slots().len(),
            start.elapsed()
        );

        Ok(BatchProof {
            shape_id: keys.shape().id(),
            proof,
        })
    }

    /// Prove with randomness derived from the whole witness. The same batch
    /// always yields the same proof.
    pub fn prove_deterministic(keys: &KeyPair, batch: &Batch) -> Result<BatchProof, ProveError> {
        let mut rng = StdRng::from_seed(batch.witness_digest());
        Self::prove(keys, batch, &mut rng)
    }

    /// Prove a raw assignment: the slots are checked against the key's shape
    /// before anything is synthesized.
    pub fn prove_assignment<R: RngCore + CryptoRng>(
        keys: &KeyPair,
        account_root: Fr,
        slots: Vec<BatchSlot>,
        rng: &mut R,
    ) -> Result<(BatchProof, Vec<Fr>), ProveError> {
        let batch = Batch::new(*keys.shape(), account_root, slots)?;
        let proof = Self::prove(keys, &batch, rng)?;
        Ok((proof, batch.public_inputs()))
    }

    /// `Ok(())` only if the proof attests to exactly these public inputs.
    pub fn verify(
        key: &VerifierKey,
        proof: &BatchProof,
        public_inputs: &[Fr],
    ) -> Result<(), VerifyError> {
        if proof.shape_id != key.shape().id() {
            return Err(VerifyError::ShapeMismatch);
        }
        let expected = key.shape().num_public_inputs();
        if public_inputs.len() != expected {
            return Err(VerifyError::PublicInputCount {
                expected,
                got: public_inputs.len(),
            });
        }

        let valid =
            Groth16::<Bn254>::verify_with_processed_vk(key.prepared(), public_inputs, &proof.proof)
                .map_err(VerifyError::Synthesis)?;
        if valid {
            Ok(())
        } else {
            log::warn!("Batch proof rejected");
            Err(VerifyError::Rejected)
        }
    }
}
