//! Batch model: what a prover commits to and what a verifier sees of it.

use std::collections::HashMap;

use ark_bn254::Fr;
use ark_ff::{BigInteger, PrimeField};
use rollup_account::{Account, ReceiverNonce, WitnessLayout};
use rollup_config::RollupConfig;

use crate::{
    constants::MAX_TREE_DEPTH,
    error::BatchError,
    signature::{PublicKey, Signature},
    tree::MerkleProof,
};

/// Everything that changes the constraint system.
///
/// Keys are only valid for the shape they were generated with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CircuitShape {
    pub batch_size: usize,
    pub tree_depth: usize,
    pub receiver_nonce: ReceiverNonce,
    pub enforce_conservation: bool,
    pub layout: WitnessLayout,
}

impl CircuitShape {
    pub fn new(batch_size: usize, tree_depth: usize) -> Result<Self, BatchError> {
        let shape = Self {
            batch_size,
            tree_depth,
            receiver_nonce: ReceiverNonce::default(),
            enforce_conservation: true,
            layout: WitnessLayout::default(),
        };
        shape.validate()?;
        Ok(shape)
    }

    pub fn from_config(config: &RollupConfig) -> Result<Self, BatchError> {
        let shape = Self {
            batch_size: config.circuit.batch_size,
            tree_depth: config.circuit.tree_depth,
            receiver_nonce: config.circuit.receiver_nonce,
            enforce_conservation: config.circuit.enforce_conservation,
            layout: config.visibility,
        };
        shape.validate()?;
        Ok(shape)
    }

    pub fn with_receiver_nonce(mut self, policy: ReceiverNonce) -> Self {
        self.receiver_nonce = policy;
        self
    }

    pub fn with_layout(mut self, layout: WitnessLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_conservation(mut self, enforce: bool) -> Self {
        self.enforce_conservation = enforce;
        self
    }

    pub fn validate(&self) -> Result<(), BatchError> {
        if self.batch_size == 0 {
            return Err(BatchError::EmptyBatch);
        }
        if self.tree_depth == 0 || self.tree_depth > MAX_TREE_DEPTH {
            return Err(BatchError::TreeDepth {
                depth: self.tree_depth,
                max: MAX_TREE_DEPTH,
            });
        }
        Ok(())
    }

    /// Number of leaves addressable by the tree
    pub fn capacity(&self) -> u64 {
        1u64 << self.tree_depth
    }

    /// Account root plus the public fields of every slot
    pub fn num_public_inputs(&self) -> usize {
        1 + self.batch_size * self.layout.public_fields_per_slot()
    }

    /// Stable fingerprint, stamped on keys and proofs.
    pub fn id(&self) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"rollup:circuit-shape:v1");
        hasher.update(&(self.batch_size as u64).to_le_bytes());
        hasher.update(&(self.tree_depth as u64).to_le_bytes());
        hasher.update(&[
            matches!(self.receiver_nonce, ReceiverNonce::Increment) as u8,
            self.enforce_conservation as u8,
            self.layout.account_index.is_public() as u8,
            self.layout.account_nonce.is_public() as u8,
            self.layout.account_balance.is_public() as u8,
            self.layout.transfer_amount.is_public() as u8,
        ]);
        *hasher.finalize().as_bytes()
    }
}

/// Private material proving one transfer is authorized and well placed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferWitness {
    pub amount: u64,
    pub sender_public_key: PublicKey,
    pub receiver_public_key: PublicKey,
    /// Sender's signature over (sender nonce, receiver index, amount)
    pub signature: Signature,
    /// Inclusion of the sender's before-state under the batch root
    pub sender_proof: MerkleProof,
    pub receiver_proof: MerkleProof,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchSlot {
    pub sender_before: Account,
    pub receiver_before: Account,
    pub sender_after: Account,
    pub receiver_after: Account,
    pub transfer: TransferWitness,
}

impl BatchSlot {
    /// The four account states in allocation order.
    pub fn accounts(&self) -> [&Account; 4] {
        [
            &self.sender_before,
            &self.receiver_before,
            &self.sender_after,
            &self.receiver_after,
        ]
    }

    fn placeholder(depth: usize) -> Self {
        Self {
            sender_before: Account::default(),
            receiver_before: Account::default(),
            sender_after: Account::default(),
            receiver_after: Account::default(),
            transfer: TransferWitness {
                amount: 0,
                sender_public_key: PublicKey::placeholder(),
                receiver_public_key: PublicKey::placeholder(),
                signature: Signature::placeholder(),
                sender_proof: MerkleProof::empty(depth),
                receiver_proof: MerkleProof::empty(depth),
            },
        }
    }
}

/// A structurally valid batch of transfers against one account root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Batch {
    shape: CircuitShape,
    account_root: Fr,
    slots: Vec<BatchSlot>,
}

impl Batch {
    pub fn new(
        shape: CircuitShape,
        account_root: Fr,
        slots: Vec<BatchSlot>,
    ) -> Result<Self, BatchError> {
        shape.validate()?;
        if slots.len() != shape.batch_size {
            return Err(BatchError::SlotCount {
                expected: shape.batch_size,
                got: slots.len(),
            });
        }

        let mut seen: HashMap<u64, usize> = HashMap::new();
        for (i, slot) in slots.iter().enumerate() {
            let t = &slot.transfer;
            for (role, proof) in [("sender", &t.sender_proof), ("receiver", &t.receiver_proof)] {
                if proof.depth() != shape.tree_depth {
                    return Err(BatchError::ProofDepth {
                        slot: i,
                        role,
                        expected: shape.tree_depth,
                        got: proof.depth(),
                    });
                }
            }

            for (role, account) in [
                ("sender", &slot.sender_before),
                ("receiver", &slot.receiver_before),
            ] {
                if account.index >= shape.capacity() {
                    return Err(BatchError::IndexOutOfRange {
                        slot: i,
                        role,
                        index: account.index,
                        capacity: shape.capacity(),
                    });
                }
            }

            if slot.sender_before.index == slot.receiver_before.index {
                return Err(BatchError::SelfTransfer {
                    slot: i,
                    index: slot.sender_before.index,
                });
            }

            for index in [slot.sender_before.index, slot.receiver_before.index] {
                if let Some(&first) = seen.get(&index) {
                    return Err(BatchError::AccountReused {
                        index,
                        first,
                        second: i,
                    });
                }
                seen.insert(index, i);
            }
        }

        Ok(Self {
            shape,
            account_root,
            slots,
        })
    }

    /// Batch with no structural checks, for exercising the circuit on
    /// witnesses `new` refuses.
    #[cfg(test)]
    pub(crate) fn unchecked(shape: CircuitShape, account_root: Fr, slots: Vec<BatchSlot>) -> Self {
        Self {
            shape,
            account_root,
            slots,
        }
    }

    /// Correctly shaped, all-zero batch for synthesis without a witness.
    pub(crate) fn placeholder(shape: CircuitShape) -> Self {
        Self {
            shape,
            account_root: Fr::from(0u64),
            slots: (0..shape.batch_size)
                .map(|_| BatchSlot::placeholder(shape.tree_depth))
                .collect(),
        }
    }

    pub fn shape(&self) -> &CircuitShape {
        &self.shape
    }

    pub fn account_root(&self) -> Fr {
        self.account_root
    }

    pub fn slots(&self) -> &[BatchSlot] {
        &self.slots
    }

    /// The values a verifier checks the proof against, in allocation order.
    pub fn public_inputs(&self) -> Vec<Fr> {
        let layout = &self.shape.layout;
        let mut inputs = Vec::with_capacity(self.shape.num_public_inputs());
        inputs.push(self.account_root);

        for slot in &self.slots {
            for account in slot.accounts() {
                if layout.account_index.is_public() {
                    inputs.push(Fr::from(account.index));
                }
                if layout.account_nonce.is_public() {
                    inputs.push(Fr::from(account.nonce));
                }
                if layout.account_balance.is_public() {
                    inputs.push(Fr::from(account.balance));
                }
            }
            if layout.transfer_amount.is_public() {
                inputs.push(Fr::from(slot.transfer.amount));
            }
        }
        inputs
    }

    /// Sum of balances touched by the batch, before and after.
    pub fn balance_totals(&self) -> (u128, u128) {
        self.slots.iter().fold((0, 0), |(before, after), slot| {
            (
                before + slot.sender_before.balance as u128 + slot.receiver_before.balance as u128,
                after + slot.sender_after.balance as u128 + slot.receiver_after.balance as u128,
            )
        })
    }

    /// Digest over every value in the batch, public and private.
    pub fn witness_digest(&self) -> [u8; 32] {
        fn field(hasher: &mut blake3::Hasher, f: &Fr) {
            hasher.update(&f.into_bigint().to_bytes_le());
        }

        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.shape.id());
        field(&mut hasher, &self.account_root);
        for slot in &self.slots {
            for account in slot.accounts() {
                hasher.update(&account.index.to_le_bytes());
                hasher.update(&account.nonce.to_le_bytes());
                hasher.update(&account.balance.to_le_bytes());
            }
            let t = &slot.transfer;
            hasher.update(&t.amount.to_le_bytes());
            for point in [t.sender_public_key.point(), t.receiver_public_key.point(), &t.signature.r] {
                field(&mut hasher, &point.x);
                field(&mut hasher, &point.y);
            }
            hasher.update(&t.signature.s.into_bigint().to_bytes_le());
            for sibling in t.sender_proof.siblings.iter().chain(&t.receiver_proof.siblings) {
                field(&mut hasher, sibling);
            }
        }
        *hasher.finalize().as_bytes()
    }
}
