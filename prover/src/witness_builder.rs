//! Witness builder
//!
//! Turns signed transfer intents into a provable [`Batch`]. The operator keeps
//! a [`Ledger`] of accounts and applies each batch to it only once the whole
//! batch has been checked natively.

use std::collections::BTreeMap;

use ark_bn254::Fr;
use rollup_account::Account;

use crate::{
    circuit::hash::{account_leaf, transfer_message},
    error::{BatchError, BuildError},
    signature::{PublicKey, SecretKey, Signature},
    tree::{AccountTree, MerkleProof, TreeError},
    witness::{Batch, BatchSlot, CircuitShape, TransferWitness},
};

impl From<TreeError> for BuildError {
    fn from(err: TreeError) -> Self {
        match err {
            TreeError::IndexOutOfRange { index, capacity } => {
                BuildError::IndexOutOfRange { index, capacity }
            }
            TreeError::Depth { depth, max } => {
                BuildError::Structural(BatchError::TreeDepth { depth, max })
            }
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct LedgerEntry {
    account: Account,
    public_key: PublicKey,
}

/// Accounts, their owners' keys and the tree committing to both.
#[derive(Clone, Debug)]
pub struct Ledger {
    tree: AccountTree,
    entries: BTreeMap<u64, LedgerEntry>,
}

impl Ledger {
    pub fn new(depth: usize) -> Result<Self, BuildError> {
        Ok(Self {
            tree: AccountTree::new(depth)?,
            entries: BTreeMap::new(),
        })
    }

    pub fn depth(&self) -> usize {
        self.tree.depth()
    }

    pub fn root(&self) -> Fr {
        self.tree.root()
    }

    /// Create an account at nonce zero.
    pub fn open_account(
        &mut self,
        index: u64,
        balance: u64,
        public_key: PublicKey,
    ) -> Result<(), BuildError> {
        if self.entries.contains_key(&index) {
            return Err(BuildError::AccountExists(index));
        }
        self.store(Account::new(index, 0, balance), public_key)
    }

    pub fn account(&self, index: u64) -> Option<&Account> {
        self.entries.get(&index).map(|e| &e.account)
    }

    pub fn public_key(&self, index: u64) -> Option<&PublicKey> {
        self.entries.get(&index).map(|e| &e.public_key)
    }

    pub fn proof(&self, index: u64) -> Result<MerkleProof, BuildError> {
        Ok(self.tree.proof(index)?)
    }

    /// Number of open accounts
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry(&self, index: u64) -> Result<LedgerEntry, BuildError> {
        self.entries
            .get(&index)
            .copied()
            .ok_or(BuildError::UnknownAccount(index))
    }

    fn store(&mut self, account: Account, public_key: PublicKey) -> Result<(), BuildError> {
        self.tree
            .insert(account.index, account_leaf(public_key.point(), &account))?;
        self.entries.insert(
            account.index,
            LedgerEntry {
                account,
                public_key,
            },
        );
        Ok(())
    }
}

/// A signed request to move `amount` from account `from` to account `to`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransferIntent {
    pub from: u64,
    pub to: u64,
    pub amount: u64,
    pub signature: Signature,
}

/// Sign a transfer out of `sender` at its current nonce.
pub fn sign_transfer(
    secret: &SecretKey,
    sender: &Account,
    receiver_index: u64,
    amount: u64,
) -> Signature {
    secret.sign(transfer_message(sender.nonce, receiver_index, amount))
}

/// A batch together with the roots on either side of it.
#[derive(Clone, Debug)]
pub struct BuiltBatch {
    pub batch: Batch,
    /// Root the batch is proven against
    pub pre_root: Fr,
    /// Root of the ledger after the batch was applied
    pub post_root: Fr,
}

pub struct BatchBuilder {
    shape: CircuitShape,
}

impl BatchBuilder {
    pub fn new(shape: CircuitShape) -> Self {
        Self { shape }
    }

    pub fn shape(&self) -> &CircuitShape {
        &self.shape
    }

    /// Build a batch from exactly `batch_size` intents and apply it to the
    /// ledger. On error the ledger is left untouched.
    pub fn build(
        &self,
        ledger: &mut Ledger,
        intents: &[TransferIntent],
    ) -> Result<BuiltBatch, BuildError> {
        if ledger.depth() != self.shape.tree_depth {
            return Err(BuildError::DepthMismatch {
                ledger: ledger.depth(),
                circuit: self.shape.tree_depth,
            });
        }
        if intents.len() != self.shape.batch_size {
            return Err(BuildError::IntentCount {
                expected: self.shape.batch_size,
                got: intents.len(),
            });
        }

        let pre_root = ledger.root();
        let mut slots = Vec::with_capacity(intents.len());
        let mut keys = Vec::with_capacity(intents.len());

        for intent in intents {
            let sender = ledger.entry(intent.from)?;
            let receiver = ledger.entry(intent.to)?;

            let message = transfer_message(sender.account.nonce, intent.to, intent.amount);
            if !sender.public_key.verify(message, &intent.signature) {
                return Err(BuildError::InvalidSignature(intent.from));
            }

            let insufficient = BuildError::InsufficientBalance {
                index: intent.from,
                balance: sender.account.balance,
                amount: intent.amount,
            };
            let sender_after = sender.account.debit(intent.amount).ok_or(insufficient)?;
            let receiver_after = receiver
                .account
                .credit(intent.amount, self.shape.receiver_nonce)
                .ok_or(BuildError::BalanceOverflow(intent.to))?;

            slots.push(BatchSlot {
                sender_before: sender.account,
                receiver_before: receiver.account,
                sender_after,
                receiver_after,
                transfer: TransferWitness {
                    amount: intent.amount,
                    sender_public_key: sender.public_key,
                    receiver_public_key: receiver.public_key,
                    signature: intent.signature,
                    sender_proof: ledger.proof(intent.from)?,
                    receiver_proof: ledger.proof(intent.to)?,
                },
            });
            keys.push((sender.public_key, receiver.public_key));
        }

        let batch = Batch::new(self.shape, pre_root, slots)?;

        for (slot, (sender_key, receiver_key)) in batch.slots().iter().zip(keys) {
            ledger.store(slot.sender_after, sender_key)?;
            ledger.store(slot.receiver_after, receiver_key)?;
        }
        let post_root = ledger.root();

        log::debug!(
            "Built batch of {} transfers, root {} -> {}",
            intents.len(),
            pre_root,
            post_root
        );
        Ok(BuiltBatch {
            batch,
            pre_root,
            post_root,
        })
    }
}
