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

//! Tezos manager-operation forging.
//!
//! Builds the canonical binary form of reveal, delegation and staking
//! transaction batches and derives the watermarked digest a remote signer
//! signs. Nothing here touches the network.
//!
//! ```text
//! OperationBatch ──forge──► ForgedOperation ──signing_digest──► SigningDigest
//!                                 │                                  │
//!                                 │                         (remote signer)
//!                                 ▼                                  ▼
//!                           attach_signature ◄──────────────── Signature
//!                                 │
//!                                 ▼
//!                          SignedOperation
//! ```

pub mod encoding;
pub mod forge;
pub mod operation;

pub use encoding::{BlockHash, Curve, EncodingError, PublicKey, PublicKeyHash, Signature};
pub use forge::{forge, ForgedOperation, SignedOperation, SigningDigest, GENERIC_WATERMARK};
pub use operation::{Entrypoint, ForgeError, ManagerFields, OperationBatch, OperationContent};
