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

//! Binary forging and signing digests.

use std::fmt;

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};

use crate::encoding::{b58check_encode, Signature, OPERATION};
use crate::operation::{ManagerFields, OperationBatch, OperationContent};

/// Watermark for generic (manager) operations.
pub const GENERIC_WATERMARK: u8 = 0x03;

const TAG_REVEAL: u8 = 107;
const TAG_TRANSACTION: u8 = 108;
const TAG_DELEGATION: u8 = 110;

/// Micheline `Unit`: a primitive with no arguments and no annotations.
const MICHELINE_UNIT: [u8; 2] = [0x03, 0x0b];

type Blake2b256 = Blake2b<U32>;

/// Canonical binary form of an operation batch, not yet signed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForgedOperation {
    bytes: Vec<u8>,
}

/// 32-byte BLAKE2b digest of the watermarked forged bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SigningDigest([u8; 32]);

/// Forged bytes followed by the signature bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedOperation {
    bytes: Vec<u8>,
}

/// Serialize a batch: branch, then each content in order.
pub fn forge(batch: &OperationBatch) -> ForgedOperation {
    let mut out = Vec::with_capacity(32 + batch.contents().len() * 64);
    out.extend_from_slice(batch.branch().as_bytes());
    for content in batch.contents() {
        forge_content(&mut out, content);
    }
    ForgedOperation { bytes: out }
}

fn forge_content(out: &mut Vec<u8>, content: &OperationContent) {
    match content {
        OperationContent::Reveal {
            manager,
            public_key,
        } => {
            forge_manager(out, TAG_REVEAL, manager);
            out.push(public_key.curve().tag());
            out.extend_from_slice(public_key.as_bytes());
        }
        OperationContent::Delegation { manager, delegate } => {
            forge_manager(out, TAG_DELEGATION, manager);
            match delegate {
                Some(delegate) => {
                    out.push(0xff);
                    out.extend_from_slice(&delegate.to_bytes());
                }
                None => out.push(0x00),
            }
        }
        OperationContent::Transaction {
            manager,
            amount,
            entrypoint,
        } => {
            forge_manager(out, TAG_TRANSACTION, manager);
            write_zarith(out, *amount);
            out.extend_from_slice(&manager.source.to_contract_bytes());
            // Parameters are always present: entrypoint tag, then the
            // length-prefixed Micheline value.
            out.push(0xff);
            out.push(entrypoint.tag());
            out.extend_from_slice(&(MICHELINE_UNIT.len() as u32).to_be_bytes());
            out.extend_from_slice(&MICHELINE_UNIT);
        }
    }
}

fn forge_manager(out: &mut Vec<u8>, tag: u8, manager: &ManagerFields) {
    out.push(tag);
    out.extend_from_slice(&manager.source.to_bytes());
    write_zarith(out, manager.fee);
    write_zarith(out, manager.counter);
    write_zarith(out, manager.gas_limit);
    write_zarith(out, manager.storage_limit);
}

/// Zarith natural: little-endian 7-bit groups, high bit set on all but the last.
fn write_zarith(out: &mut Vec<u8>, mut value: u64) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

impl ForgedOperation {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Lowercase hex of the unsigned bytes.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }

    /// Digest the vault signs: BLAKE2b-256 over `watermark ‖ bytes`.
    pub fn signing_digest(&self) -> SigningDigest {
        let mut hasher = Blake2b256::new();
        hasher.update([GENERIC_WATERMARK]);
        hasher.update(&self.bytes);
        SigningDigest(hasher.finalize().into())
    }

    /// Append a signature, producing the injectable bytes.
    pub fn attach_signature(&self, signature: &Signature) -> SignedOperation {
        let mut bytes = Vec::with_capacity(self.bytes.len() + signature.as_bytes().len());
        bytes.extend_from_slice(&self.bytes);
        bytes.extend_from_slice(signature.as_bytes());
        SignedOperation { bytes }
    }
}

impl SigningDigest {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex, as submitted to the vault.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for SigningDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl SignedOperation {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Lowercase hex of the injectable bytes.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }

    /// Operation hash the node will assign (`o…`), BLAKE2b-256 of the signed bytes.
    pub fn operation_hash(&self) -> String {
        let digest = Blake2b256::digest(&self.bytes);
        b58check_encode(OPERATION, &digest)
    }
}
