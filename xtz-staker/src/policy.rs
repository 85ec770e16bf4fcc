//! Counter allocation and static fee parameters.

use serde::{Deserialize, Serialize};
use xtz_forge::{ManagerFields, PublicKeyHash};

/// Fee per content, in mutez.
pub const DEFAULT_FEE: u64 = 1300;
/// Gas limit per content.
pub const DEFAULT_GAS_LIMIT: u64 = 10100;
/// Storage limit per content; none of the operations allocate storage.
pub const DEFAULT_STORAGE_LIMIT: u64 = 0;

/// Fee, gas and storage limits applied to every content.
///
/// These are fixed values, not simulated per operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeePolicy {
    /// Fee in mutez.
    pub fee: u64,
    /// Gas limit per content
    pub gas_limit: u64,
    /// Storage limit per content
    pub storage_limit: u64,
}

impl Default for FeePolicy {
    fn default() -> Self {
        Self {
            fee: DEFAULT_FEE,
            gas_limit: DEFAULT_GAS_LIMIT,
            storage_limit: DEFAULT_STORAGE_LIMIT,
        }
    }
}

impl FeePolicy {
    /// Manager fields for a content from `source` at `counter`.
    pub fn manager(&self, source: PublicKeyHash, counter: u64) -> ManagerFields {
        ManagerFields {
            source,
            fee: self.fee,
            counter,
            gas_limit: self.gas_limit,
            storage_limit: self.storage_limit,
        }
    }
}

/// Hands out counters C+1, C+2, ... after the on-chain counter C.
#[derive(Debug, Clone)]
pub struct CounterAllocator {
    next: u64,
}

impl CounterAllocator {
    /// Start allocating after the last counter used on chain.
    pub fn after(onchain: u64) -> Self {
        Self { next: onchain + 1 }
    }

    /// Next counter; each call advances by one.
    pub fn allocate(&mut self) -> u64 {
        let counter = self.next;
        self.next += 1;
        counter
    }
}
