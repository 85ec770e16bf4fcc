// Copyright (C) 2025 Category Labs, Inc.
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Manager operation model.
//!
//! Operation contents are a closed set of variants, so a content can only
//! carry the fields its kind forges. Batches are validated once at
//! construction and are immutable afterwards.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::encoding::{BlockHash, PublicKey, PublicKeyHash};

/// Errors raised while assembling a batch.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ForgeError {
    #[error("Operation batch has no contents")]
    EmptyBatch,

    #[error("Operation source mismatch: expected {expected}, got {got}")]
    SourceMismatch { expected: String, got: String },

    #[error("Non-contiguous counter at position {index}: expected {expected}, got {got}")]
    CounterGap { index: usize, expected: u64, got: u64 },

    #[error("Revealed key hashes to {key_hash}, but the source is {address}")]
    RevealKeyMismatch { key_hash: String, address: String },
}

/// Fields shared by every manager operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerFields {
    /// Account paying the fee and owning the counter
    pub source: PublicKeyHash,
    /// Fee in mutez
    pub fee: u64,
    /// Account counter this content consumes
    pub counter: u64,
    /// Gas limit for this content
    pub gas_limit: u64,
    /// Storage limit in bytes
    pub storage_limit: u64,
}

/// Entrypoints of the staking pseudo-contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Entrypoint {
    Stake,
    Unstake,
    FinalizeUnstake,
}

impl Entrypoint {
    /// Reserved entrypoint tag in the binary parameters encoding.
    pub fn tag(self) -> u8 {
        match self {
            Entrypoint::Stake => 6,
            Entrypoint::Unstake => 7,
            Entrypoint::FinalizeUnstake => 8,
        }
    }

    /// Entrypoint name as it appears in RPC JSON.
    pub fn name(self) -> &'static str {
        match self {
            Entrypoint::Stake => "stake",
            Entrypoint::Unstake => "unstake",
            Entrypoint::FinalizeUnstake => "finalize_unstake",
        }
    }
}

/// A single manager operation.
///
/// Transactions are always addressed to their own source; the staking
/// pseudo-contract is reached through the entrypoint, not the destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OperationContent {
    Reveal {
        #[serde(flatten)]
        manager: ManagerFields,
        public_key: PublicKey,
    },
    Delegation {
        #[serde(flatten)]
        manager: ManagerFields,
        delegate: Option<PublicKeyHash>,
    },
    Transaction {
        #[serde(flatten)]
        manager: ManagerFields,
        amount: u64,
        entrypoint: Entrypoint,
    },
}

impl OperationContent {
    /// Manager fields, whatever the kind.
    pub fn manager(&self) -> &ManagerFields {
        match self {
            OperationContent::Reveal { manager, .. }
            | OperationContent::Delegation { manager, .. }
            | OperationContent::Transaction { manager, .. } => manager,
        }
    }

    /// Counter of this content.
    pub fn counter(&self) -> u64 {
        self.manager().counter
    }

    /// RPC `kind` of the content.
    pub fn kind(&self) -> &'static str {
        match self {
            OperationContent::Reveal { .. } => "reveal",
            OperationContent::Delegation { .. } => "delegation",
            OperationContent::Transaction { .. } => "transaction",
        }
    }
}

/// Ordered contents anchored on a branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationBatch {
    branch: BlockHash,
    contents: Vec<OperationContent>,
}

impl OperationBatch {
    /// Validate and assemble a batch.
    ///
    /// All contents must share one source, counters must increase by
    /// exactly one in content order, and a revealed key must belong to the
    /// source.
    pub fn new(branch: BlockHash, contents: Vec<OperationContent>) -> Result<Self, ForgeError> {
        let first = contents.first().ok_or(ForgeError::EmptyBatch)?;
        let source = first.manager().source;
        let base = first.counter();

        for (index, content) in contents.iter().enumerate() {
            let manager = content.manager();
            if manager.source != source {
                return Err(ForgeError::SourceMismatch {
                    expected: source.to_string(),
                    got: manager.source.to_string(),
                });
            }

            let expected = base + index as u64;
            if manager.counter != expected {
                return Err(ForgeError::CounterGap {
                    index,
                    expected,
                    got: manager.counter,
                });
            }

            if let OperationContent::Reveal { public_key, .. } = content {
                let key_hash = public_key.hash();
                if key_hash != source {
                    return Err(ForgeError::RevealKeyMismatch {
                        key_hash: key_hash.to_string(),
                        address: source.to_string(),
                    });
                }
            }
        }

        Ok(Self { branch, contents })
    }

    /// Block hash the batch is anchored on.
    pub fn branch(&self) -> &BlockHash {
        &self.branch
    }

    /// Contents in forging order.
    pub fn contents(&self) -> &[OperationContent] {
        &self.contents
    }

    /// Source shared by every content.
    pub fn source(&self) -> &PublicKeyHash {
        // Non-empty by construction.
        &self.contents[0].manager().source
    }
}
