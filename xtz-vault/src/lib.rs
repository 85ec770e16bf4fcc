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

//! Custodial vault signing for Tezos operations.
//!
//! Private keys never leave the vault. This crate submits the 32-byte
//! signing digest of a forged operation as a raw-signing request, polls
//! the request until the vault reports a terminal status, and turns the
//! returned signature into injectable bytes.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐   submit digest   ┌─────────────────┐
//! │  RemoteSigner   │ ────────────────► │  Vault (REST)   │
//! │  (this crate)   │ ◄──── poll ────── │  approvals/MPC  │
//! └─────────────────┘   status + sig    └─────────────────┘
//! ```
//!
//! A blocked, failed, rejected or cancelled request is final: an operator
//! has to act in the vault before a new attempt makes sense, so nothing
//! here retries.

pub mod client;
pub mod protocol;
pub mod session;
pub mod signer;

pub use client::{HttpVaultClient, VaultConfig, VaultError, VaultOracle, DEFAULT_VAULT_URL};
pub use protocol::{
    AccountId, DepositAddress, Network, PublicKeyInfo, RawSignature, RequestId, SigningStatus,
    StatusReport,
};
pub use session::{SessionPoll, SigningSession};
pub use signer::{assemble_signed, PollPolicy, RemoteSigner, SignerError};
