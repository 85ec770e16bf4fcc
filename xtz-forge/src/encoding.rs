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

//! Tezos text encodings.
//!
//! Addresses, public keys, block hashes and signatures travel as
//! base58check strings with a type-specific version prefix. This module
//! owns those prefixes and the fixed-width binary forms used by the
//! forger.

use std::fmt;
use std::str::FromStr;

use blake2::digest::consts::U20;
use blake2::{Blake2b, Digest};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

const TZ1: &[u8] = &[6, 161, 159];
const TZ2: &[u8] = &[6, 161, 161];
const TZ3: &[u8] = &[6, 161, 164];
const EDPK: &[u8] = &[13, 15, 37, 217];
const SPPK: &[u8] = &[3, 254, 226, 86];
const P2PK: &[u8] = &[3, 178, 139, 127];
const EDSIG: &[u8] = &[9, 245, 205, 134, 18];
const SPSIG: &[u8] = &[13, 115, 101, 19, 63];
const P2SIG: &[u8] = &[54, 240, 44, 52];
const BLOCK: &[u8] = &[1, 52];
pub(crate) const OPERATION: &[u8] = &[5, 116];

/// Bytes in an address hash, without the curve tag.
pub const PUBLIC_KEY_HASH_LEN: usize = 20;
/// Bytes in a block hash.
pub const BLOCK_HASH_LEN: usize = 32;
/// Bytes in a signature on any supported curve.
pub const SIGNATURE_LEN: usize = 64;

/// Errors decoding chain text or raw key material.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodingError {
    #[error("Invalid base58check string {value:?}: {reason}")]
    Base58 { value: String, reason: String },

    #[error("Unexpected prefix for {kind}: {value:?}")]
    Prefix { kind: &'static str, value: String },

    #[error("Invalid {kind} length: expected {expected} bytes, got {got}")]
    Length {
        kind: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("Invalid hex: {0}")]
    Hex(String),

    #[error("Unsupported signing algorithm: {0}")]
    Algorithm(String),
}

/// Signature scheme of an implicit account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Curve {
    Ed25519,
    Secp256k1,
    P256,
}

impl Curve {
    /// Tag byte used in binary public key and key hash encodings.
    pub fn tag(self) -> u8 {
        match self {
            Curve::Ed25519 => 0,
            Curve::Secp256k1 => 1,
            Curve::P256 => 2,
        }
    }

    fn public_key_len(self) -> usize {
        match self {
            Curve::Ed25519 => 32,
            Curve::Secp256k1 | Curve::P256 => 33,
        }
    }

    fn hash_prefix(self) -> &'static [u8] {
        match self {
            Curve::Ed25519 => TZ1,
            Curve::Secp256k1 => TZ2,
            Curve::P256 => TZ3,
        }
    }

    fn key_prefix(self) -> &'static [u8] {
        match self {
            Curve::Ed25519 => EDPK,
            Curve::Secp256k1 => SPPK,
            Curve::P256 => P2PK,
        }
    }

    fn signature_prefix(self) -> &'static [u8] {
        match self {
            Curve::Ed25519 => EDSIG,
            Curve::Secp256k1 => SPSIG,
            Curve::P256 => P2SIG,
        }
    }

    /// Map a vault signing algorithm name (e.g. `MPC_EDDSA_ED25519`) to a curve.
    pub fn from_algorithm(algorithm: &str) -> Result<Self, EncodingError> {
        match algorithm {
            "MPC_EDDSA_ED25519" => Ok(Curve::Ed25519),
            "MPC_ECDSA_SECP256K1" => Ok(Curve::Secp256k1),
            "MPC_ECDSA_SECP256R1" => Ok(Curve::P256),
            other => Err(EncodingError::Algorithm(other.to_string())),
        }
    }
}

pub(crate) fn b58check_encode(prefix: &[u8], payload: &[u8]) -> String {
    let mut data = Vec::with_capacity(prefix.len() + payload.len());
    data.extend_from_slice(prefix);
    data.extend_from_slice(payload);
    bs58::encode(data).with_check().into_string()
}

fn b58check_decode(
    kind: &'static str,
    value: &str,
    prefix: &[u8],
    expected: usize,
) -> Result<Vec<u8>, EncodingError> {
    let data = bs58::decode(value)
        .with_check(None)
        .into_vec()
        .map_err(|e| EncodingError::Base58 {
            value: value.to_string(),
            reason: e.to_string(),
        })?;
    let payload = data
        .strip_prefix(prefix)
        .ok_or_else(|| EncodingError::Prefix {
            kind,
            value: value.to_string(),
        })?;
    if payload.len() != expected {
        return Err(EncodingError::Length {
            kind,
            expected,
            got: payload.len(),
        });
    }
    Ok(payload.to_vec())
}

fn decode_hex(value: &str) -> Result<Vec<u8>, EncodingError> {
    let trimmed = value.strip_prefix("0x").unwrap_or(value);
    hex::decode(trimmed).map_err(|e| EncodingError::Hex(e.to_string()))
}

/// Implicit account address (`tz1`, `tz2`, `tz3`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKeyHash {
    curve: Curve,
    hash: [u8; PUBLIC_KEY_HASH_LEN],
}

impl PublicKeyHash {
    /// Wrap a raw 20-byte key hash.
    pub fn new(curve: Curve, hash: [u8; PUBLIC_KEY_HASH_LEN]) -> Self {
        Self { curve, hash }
    }

    pub fn curve(&self) -> Curve {
        self.curve
    }

    /// Raw 20-byte hash.
    pub fn hash(&self) -> &[u8; PUBLIC_KEY_HASH_LEN] {
        &self.hash
    }

    /// 21-byte binary form: curve tag followed by the hash.
    pub fn to_bytes(&self) -> [u8; PUBLIC_KEY_HASH_LEN + 1] {
        let mut out = [0u8; PUBLIC_KEY_HASH_LEN + 1];
        out[0] = self.curve.tag();
        out[1..].copy_from_slice(&self.hash);
        out
    }

    /// 22-byte contract id form used for transaction destinations.
    pub fn to_contract_bytes(&self) -> [u8; PUBLIC_KEY_HASH_LEN + 2] {
        let mut out = [0u8; PUBLIC_KEY_HASH_LEN + 2];
        out[1..].copy_from_slice(&self.to_bytes());
        out
    }
}

impl fmt::Display for PublicKeyHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&b58check_encode(self.curve.hash_prefix(), &self.hash))
    }
}

impl FromStr for PublicKeyHash {
    type Err = EncodingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let curve = match s.get(..3) {
            Some("tz1") => Curve::Ed25519,
            Some("tz2") => Curve::Secp256k1,
            Some("tz3") => Curve::P256,
            _ => {
                return Err(EncodingError::Prefix {
                    kind: "address",
                    value: s.to_string(),
                })
            }
        };
        let payload = b58check_decode("address", s, curve.hash_prefix(), PUBLIC_KEY_HASH_LEN)?;
        let mut hash = [0u8; PUBLIC_KEY_HASH_LEN];
        hash.copy_from_slice(&payload);
        Ok(Self { curve, hash })
    }
}

/// Public key of an implicit account.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PublicKey {
    curve: Curve,
    bytes: Vec<u8>,
}

impl PublicKey {
    /// Wrap raw key bytes, checking the length for the curve.
    pub fn from_bytes(curve: Curve, bytes: &[u8]) -> Result<Self, EncodingError> {
        if bytes.len() != curve.public_key_len() {
            return Err(EncodingError::Length {
                kind: "public key",
                expected: curve.public_key_len(),
                got: bytes.len(),
            });
        }
        Ok(Self {
            curve,
            bytes: bytes.to_vec(),
        })
    }

    /// Parse a raw hex key as returned by the vault.
    pub fn from_hex(curve: Curve, value: &str) -> Result<Self, EncodingError> {
        Self::from_bytes(curve, &decode_hex(value)?)
    }

    pub fn curve(&self) -> Curve {
        self.curve
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The address controlled by this key (BLAKE2b-160 of the raw key).
    pub fn hash(&self) -> PublicKeyHash {
        let digest = Blake2b::<U20>::digest(&self.bytes);
        let mut hash = [0u8; PUBLIC_KEY_HASH_LEN];
        hash.copy_from_slice(&digest);
        PublicKeyHash::new(self.curve, hash)
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&b58check_encode(self.curve.key_prefix(), &self.bytes))
    }
}

impl FromStr for PublicKey {
    type Err = EncodingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let curve = match s.get(..4) {
            Some("edpk") => Curve::Ed25519,
            Some("sppk") => Curve::Secp256k1,
            Some("p2pk") => Curve::P256,
            _ => {
                return Err(EncodingError::Prefix {
                    kind: "public key",
                    value: s.to_string(),
                })
            }
        };
        let bytes = b58check_decode("public key", s, curve.key_prefix(), curve.public_key_len())?;
        Ok(Self { curve, bytes })
    }
}

/// Hash of a block, used as the branch of an operation batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockHash([u8; BLOCK_HASH_LEN]);

impl BlockHash {
    /// Wrap a raw 32-byte block hash.
    pub fn new(bytes: [u8; BLOCK_HASH_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; BLOCK_HASH_LEN] {
        &self.0
    }
}

impl fmt::Display for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&b58check_encode(BLOCK, &self.0))
    }
}

impl FromStr for BlockHash {
    type Err = EncodingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let payload = b58check_decode("block hash", s, BLOCK, BLOCK_HASH_LEN)?;
        let mut bytes = [0u8; BLOCK_HASH_LEN];
        bytes.copy_from_slice(&payload);
        Ok(Self(bytes))
    }
}

/// A 64-byte signature in the chain's curve-specific text format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature {
    curve: Curve,
    bytes: [u8; SIGNATURE_LEN],
}

impl Signature {
    /// Wrap raw signature bytes; must be exactly 64 bytes.
    pub fn from_bytes(curve: Curve, bytes: &[u8]) -> Result<Self, EncodingError> {
        let bytes: [u8; SIGNATURE_LEN] =
            bytes.try_into().map_err(|_| EncodingError::Length {
                kind: "signature",
                expected: SIGNATURE_LEN,
                got: bytes.len(),
            })?;
        Ok(Self { curve, bytes })
    }

    /// Parse the raw hex signature reported by the vault.
    pub fn from_hex(curve: Curve, value: &str) -> Result<Self, EncodingError> {
        Self::from_bytes(curve, &decode_hex(value)?)
    }

    /// Decode a prefixed signature string for the given curve.
    pub fn from_base58(curve: Curve, value: &str) -> Result<Self, EncodingError> {
        let payload = b58check_decode("signature", value, curve.signature_prefix(), SIGNATURE_LEN)?;
        Self::from_bytes(curve, &payload)
    }

    pub fn curve(&self) -> Curve {
        self.curve
    }

    pub fn as_bytes(&self) -> &[u8; SIGNATURE_LEN] {
        &self.bytes
    }

    /// Prefixed text form (`edsig`, `spsig` or `p2sig`).
    pub fn to_base58(&self) -> String {
        b58check_encode(self.curve.signature_prefix(), &self.bytes)
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base58())
    }
}

macro_rules! serde_via_str {
    ($ty:ty) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

serde_via_str!(PublicKeyHash);
serde_via_str!(PublicKey);
serde_via_str!(BlockHash);
