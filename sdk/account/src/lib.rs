//! Ledger account model for the batch rollup.
//!
//! An [`Account`] is one entry of the committed account tree at a point in
//! time. Transfers move balance from a sender to a receiver; the rules for how
//! both sides update live here so that the operator's native bookkeeping and
//! the constraint system agree on a single definition.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The state of an account.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Account {
    /// Position in the committed account tree. Never changes.
    pub index: u64,
    /// Number of transfers originated by this account so far.
    pub nonce: u64,
    pub balance: u64,
}

impl Account {
    pub fn new(index: u64, nonce: u64, balance: u64) -> Self {
        Self {
            index,
            nonce,
            balance,
        }
    }

    /// Sender side of a transfer: nonce advances by one, balance drops by
    /// `amount`. Returns `None` if the balance does not cover the amount.
    pub fn debit(&self, amount: u64) -> Option<Account> {
        Some(Account {
            index: self.index,
            nonce: self.nonce.checked_add(1)?,
            balance: self.balance.checked_sub(amount)?,
        })
    }

    /// Receiver side of a transfer. Returns `None` on balance overflow.
    pub fn credit(&self, amount: u64, policy: ReceiverNonce) -> Option<Account> {
        let nonce = match policy {
            ReceiverNonce::Increment => self.nonce.checked_add(1)?,
            ReceiverNonce::Unchanged => self.nonce,
        };
        Some(Account {
            index: self.index,
            nonce,
            balance: self.balance.checked_add(amount)?,
        })
    }
}

/// How a receiver's nonce moves when it is credited.
///
/// `Increment` reproduces the legacy rollup behaviour where both parties of a
/// transfer advance their nonce. `Unchanged` is conventional ledger
/// semantics where only the originator's counter moves.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReceiverNonce {
    #[default]
    Increment,
    Unchanged,
}

impl FromStr for ReceiverNonce {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "increment" => Ok(Self::Increment),
            "unchanged" => Ok(Self::Unchanged),
            _ => Err(ParseError::ReceiverNonce(s.to_string())),
        }
    }
}

// ============================================================================
// Field Visibility
// ============================================================================

/// Whether a witness value is revealed to the verifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
}

impl Visibility {
    pub fn is_public(self) -> bool {
        matches!(self, Visibility::Public)
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Visibility::Public => f.write_str("public"),
            Visibility::Private => f.write_str("private"),
        }
    }
}

impl FromStr for Visibility {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "public" => Ok(Self::Public),
            "private" => Ok(Self::Private),
            _ => Err(ParseError::Visibility(s.to_string())),
        }
    }
}

/// Per-field visibility of every account and transfer value in a batch slot.
///
/// The same layout drives variable allocation in the circuit and the
/// extraction of public inputs for verification, so the two can never
/// disagree about which values the verifier sees.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WitnessLayout {
    #[serde(default = "private")]
    pub account_index: Visibility,
    #[serde(default = "private")]
    pub account_nonce: Visibility,
    #[serde(default = "public")]
    pub account_balance: Visibility,
    #[serde(default = "public")]
    pub transfer_amount: Visibility,
}

fn private() -> Visibility {
    Visibility::Private
}

fn public() -> Visibility {
    Visibility::Public
}

impl Default for WitnessLayout {
    fn default() -> Self {
        Self {
            account_index: Visibility::Private,
            account_nonce: Visibility::Private,
            account_balance: Visibility::Public,
            transfer_amount: Visibility::Public,
        }
    }
}

impl WitnessLayout {
    /// Everything hidden except what the circuit always exposes.
    pub fn all_private() -> Self {
        Self {
            account_index: Visibility::Private,
            account_nonce: Visibility::Private,
            account_balance: Visibility::Private,
            transfer_amount: Visibility::Private,
        }
    }

    /// Number of public values one account contributes.
    pub fn public_fields_per_account(&self) -> usize {
        [self.account_index, self.account_nonce, self.account_balance]
            .iter()
            .filter(|v| v.is_public())
            .count()
    }

    /// Number of public values one batch slot contributes
    /// (four accounts plus the transfer amount).
    pub fn public_fields_per_slot(&self) -> usize {
        4 * self.public_fields_per_account() + usize::from(self.transfer_amount.is_public())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("unknown visibility `{0}` (expected `public` or `private`)")]
    Visibility(String),
    #[error("unknown receiver nonce policy `{0}` (expected `increment` or `unchanged`)")]
    ReceiverNonce(String),
}
