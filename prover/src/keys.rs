//! Proving and verifying keys.
//!
//! Keys are produced once per circuit shape and then shared read-only. On
//! disk each key is the 32-byte shape fingerprint followed by the compressed
//! canonical encoding, so a key can never be loaded for the wrong shape.

use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use ark_bn254::Bn254;
use ark_groth16::{Groth16, PreparedVerifyingKey, ProvingKey, VerifyingKey};
use ark_relations::r1cs::SynthesisError;
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_snark::SNARK;

use crate::{error::KeyError, witness::CircuitShape};

const SHAPE_ID_LEN: usize = 32;

fn encode<T: CanonicalSerialize>(shape: &CircuitShape, key: &T) -> Result<Vec<u8>, KeyError> {
    let mut bytes = Vec::with_capacity(SHAPE_ID_LEN + key.compressed_size());
    bytes.extend_from_slice(&shape.id());
    key.serialize_compressed(&mut bytes)
        .map_err(|e| KeyError::Serialization(e.to_string()))?;
    Ok(bytes)
}

fn decode<T: CanonicalDeserialize>(bytes: &[u8], shape: &CircuitShape) -> Result<T, KeyError> {
    if bytes.len() < SHAPE_ID_LEN {
        return Err(KeyError::Serialization(format!(
            "key file too short ({} bytes)",
            bytes.len()
        )));
    }
    let (id, body) = bytes.split_at(SHAPE_ID_LEN);
    if id != shape.id().as_slice() {
        return Err(KeyError::ShapeMismatch);
    }
    T::deserialize_compressed(body).map_err(|e| KeyError::Serialization(e.to_string()))
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<(), KeyError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, bytes)?;
    Ok(())
}

/// Everything a verifier needs. Cheap to clone.
#[derive(Clone)]
pub struct VerifierKey {
    shape: CircuitShape,
    key: Arc<VerifyingKey<Bn254>>,
    prepared: Arc<PreparedVerifyingKey<Bn254>>,
    hash: [u8; 32],
}

impl VerifierKey {
    pub fn new(shape: CircuitShape, key: VerifyingKey<Bn254>) -> Result<Self, SynthesisError> {
        let prepared = Groth16::<Bn254>::process_vk(&key)?;

        let mut bytes = Vec::new();
        key.serialize_compressed(&mut bytes)
            .map_err(|_| SynthesisError::MalformedVerifyingKey)?;
        let hash = *blake3::hash(&bytes).as_bytes();

        Ok(Self {
            shape,
            key: Arc::new(key),
            prepared: Arc::new(prepared),
            hash,
        })
    }

    pub fn shape(&self) -> &CircuitShape {
        &self.shape
    }

    pub fn verifying_key(&self) -> &VerifyingKey<Bn254> {
        &self.key
    }

    pub fn prepared(&self) -> &PreparedVerifyingKey<Bn254> {
        &self.prepared
    }

    /// blake3 of the compressed verifying key
    pub fn verifying_key_hash(&self) -> [u8; 32] {
        self.hash
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, KeyError> {
        encode(&self.shape, self.key.as_ref())
    }

    pub fn from_bytes(bytes: &[u8], shape: CircuitShape) -> Result<Self, KeyError> {
        let key = decode::<VerifyingKey<Bn254>>(bytes, &shape)?;
        Self::new(shape, key).map_err(KeyError::Prepare)
    }

    pub fn save(&self, path: &Path) -> Result<(), KeyError> {
        write_file(path, &self.to_bytes()?)
    }

    pub fn load(path: &Path, shape: CircuitShape) -> Result<Self, KeyError> {
        Self::from_bytes(&fs::read(path)?, shape)
    }
}

impl fmt::Debug for VerifierKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerifierKey")
            .field("shape", &self.shape)
            .field("hash", &hex::encode(self.hash))
            .finish()
    }
}

/// Proving key plus its verifier half.
#[derive(Clone)]
pub struct KeyPair {
    proving_key: Arc<ProvingKey<Bn254>>,
    verifier: VerifierKey,
}

impl KeyPair {
    pub fn from_parts(
        shape: CircuitShape,
        proving_key: ProvingKey<Bn254>,
    ) -> Result<Self, SynthesisError> {
        let verifier = VerifierKey::new(shape, proving_key.vk.clone())?;
        Ok(Self {
            proving_key: Arc::new(proving_key),
            verifier,
        })
    }

    pub fn shape(&self) -> &CircuitShape {
        self.verifier.shape()
    }

    pub fn proving_key(&self) -> &ProvingKey<Bn254> {
        &self.proving_key
    }

    pub fn verifier(&self) -> &VerifierKey {
        &self.verifier
    }

    pub fn verifying_key_hash(&self) -> [u8; 32] {
        self.verifier.verifying_key_hash()
    }

    pub fn save(&self, pk_path: &Path, vk_path: &Path) -> Result<(), KeyError> {
        write_file(pk_path, &encode(self.shape(), self.proving_key.as_ref())?)?;
        self.verifier.save(vk_path)?;
        log::info!(
            "Saved keys: {} (proving), {} (verifying)",
            pk_path.display(),
            vk_path.display()
        );
        Ok(())
    }

    /// Load both keys and check that they belong together.
    pub fn load(pk_path: &Path, vk_path: &Path, shape: CircuitShape) -> Result<Self, KeyError> {
        let proving_key = decode::<ProvingKey<Bn254>>(&fs::read(pk_path)?, &shape)?;
        let verifier = VerifierKey::load(vk_path, shape)?;

        let mut embedded = Vec::new();
        proving_key
            .vk
            .serialize_compressed(&mut embedded)
            .map_err(|e| KeyError::Serialization(e.to_string()))?;
        if *blake3::hash(&embedded).as_bytes() != verifier.verifying_key_hash() {
            return Err(KeyError::Serialization(
                "verifying key does not belong to the proving key".into(),
            ));
        }
        Ok(Self {
            proving_key: Arc::new(proving_key),
            verifier,
        })
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("verifier", &self.verifier)
            .finish_non_exhaustive()
    }
}
