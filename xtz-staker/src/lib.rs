//! Custodial-signed Tezos staking.
//!
//! Drives delegation and staking operations for accounts whose keys live
//! in a custodial vault. The chain node and the vault are both reached
//! through oracle traits so the pipeline can run against mocks.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐  address, key, sign  ┌─────────────────┐
//! │     Staker      │ ◄──────────────────► │   VaultOracle   │
//! │  (this crate)   │                      └─────────────────┘
//! │                 │  head, counter,      ┌─────────────────┐
//! │                 │  inject, blocks      │  LedgerOracle   │
//! │                 │ ◄──────────────────► │  (node RPC)     │
//! └─────────────────┘                      └─────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! xtz-staker --config /etc/xtz-staker/config.json --account 12 \
//!     delegate tz1MCGdC9qYbSjtWEbup9i17WkohvzwCm2HV --reveal
//! xtz-staker --account 12 stake 1500 --await-hash <previous operation hash>
//! ```

pub mod builder;
pub mod config;
pub mod confirmation;
pub mod error;
pub mod ledger;
pub mod orchestrator;
pub mod policy;

#[cfg(test)]
mod mock;

pub use builder::{AccountState, Intent};
pub use config::{ConfigError, StakerConfig};
pub use confirmation::{ConfirmationStatus, ConfirmationTracker, ConfirmationWindow};
pub use error::StakingError;
pub use ledger::{Block, BlockHeader, BlockId, HttpLedgerClient, LedgerError, LedgerOracle};
pub use orchestrator::Staker;
pub use policy::{CounterAllocator, FeePolicy};
