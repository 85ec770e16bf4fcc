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

//! Wire types for the custodial vault REST API.
//!
//! Field names follow the vault's camelCase JSON. Only the fields this
//! crate reads are modelled; unknown fields are ignored.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::client::VaultError;

/// Which staking asset variant a vault account is addressed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Mainnet,
    Testnet,
}

impl Network {
    /// Select the network from a boolean testnet switch.
    pub fn from_testnet_flag(testnet: bool) -> Self {
        if testnet {
            Network::Testnet
        } else {
            Network::Mainnet
        }
    }

    /// Vault asset identifier for this network.
    pub fn asset_id(self) -> &'static str {
        match self {
            Network::Mainnet => "XTZ",
            Network::Testnet => "XTZ_TEST",
        }
    }
}

/// Vault account identifier.
///
/// Ids end up as a URL path segment and in the signed token `uri`, so only
/// ASCII alphanumerics, `-` and `_` are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountId(String);

impl AccountId {
    /// Trim and validate a caller-supplied id.
    pub fn parse(value: &str) -> Result<Self, VaultError> {
        let trimmed = value.trim();
        let valid = !trimmed.is_empty()
            && trimmed
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
        if !valid {
            return Err(VaultError::InvalidAccountId(value.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// The validated id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for AccountId {
    type Error = VaultError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<AccountId> for String {
    fn from(id: AccountId) -> Self {
        id.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of an outstanding raw-signing request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub String);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Status of a raw-signing request as reported by the vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SigningStatus {
    Submitted,
    Pending,
    Completed,
    Blocked,
    Failed,
    Rejected,
    Cancelled,
}

impl SigningStatus {
    /// Collapse the vault's fine-grained status strings.
    ///
    /// Queued, authorization and screening states all count as pending.
    pub fn from_vault(status: &str) -> Self {
        match status {
            "SUBMITTED" => SigningStatus::Submitted,
            "COMPLETED" => SigningStatus::Completed,
            "BLOCKED" => SigningStatus::Blocked,
            "FAILED" | "TIMEOUT" => SigningStatus::Failed,
            "REJECTED" => SigningStatus::Rejected,
            "CANCELLED" => SigningStatus::Cancelled,
            _ => SigningStatus::Pending,
        }
    }

    /// True once the vault will not change the status again.
    pub fn is_terminal(self) -> bool {
        !matches!(self, SigningStatus::Submitted | SigningStatus::Pending)
    }
}

impl fmt::Display for SigningStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SigningStatus::Submitted => "SUBMITTED",
            SigningStatus::Pending => "PENDING",
            SigningStatus::Completed => "COMPLETED",
            SigningStatus::Blocked => "BLOCKED",
            SigningStatus::Failed => "FAILED",
            SigningStatus::Rejected => "REJECTED",
            SigningStatus::Cancelled => "CANCELLED",
        };
        f.write_str(s)
    }
}

/// One deposit address of a vault account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositAddress {
    /// Chain address of the account
    pub address: String,
}

/// Public key of a vault account's address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyInfo {
    /// Hex-encoded raw public key
    pub public_key: String,
    /// Vault algorithm name; ed25519 when absent
    #[serde(default)]
    pub algorithm: Option<String>,
}

/// Raw signature of one signed message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSignature {
    /// Hex-encoded signature bytes.
    pub full_sig: String,
    /// Vault algorithm name, e.g. `MPC_EDDSA_ED25519`.
    pub algorithm: Option<String>,
}

/// Current state of a signing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    /// Collapsed request status
    pub status: SigningStatus,
    /// Vault detail for the status, if any
    pub sub_status: Option<String>,
    /// Present once the request completed
    pub signature: Option<RawSignature>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateRawTransaction<'a> {
    pub operation: &'static str,
    pub source: TransferPeer<'a>,
    pub asset_id: &'static str,
    pub note: &'a str,
    pub extra_parameters: ExtraParameters,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct TransferPeer<'a> {
    #[serde(rename = "type")]
    pub peer_type: &'static str,
    pub id: &'a str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ExtraParameters {
    pub raw_message_data: RawMessageData,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct RawMessageData {
    pub messages: Vec<UnsignedMessage>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct UnsignedMessage {
    pub content: String,
}

impl<'a> CreateRawTransaction<'a> {
    pub fn new(account: &'a AccountId, network: Network, digest_hex: String, note: &'a str) -> Self {
        Self {
            operation: "RAW",
            source: TransferPeer {
                peer_type: "VAULT_ACCOUNT",
                id: account.as_str(),
            },
            asset_id: network.asset_id(),
            note,
            extra_parameters: ExtraParameters {
                raw_message_data: RawMessageData {
                    messages: vec![UnsignedMessage {
                        content: digest_hex,
                    }],
                },
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CreateTransactionResponse {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TransactionDetails {
    pub status: String,
    #[serde(default)]
    pub sub_status: Option<String>,
    #[serde(default)]
    pub signed_messages: Vec<SignedMessage>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SignedMessage {
    #[serde(default)]
    pub algorithm: Option<String>,
    pub signature: MessageSignature,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MessageSignature {
    pub full_sig: String,
}

impl From<TransactionDetails> for StatusReport {
    fn from(details: TransactionDetails) -> Self {
        let signature = details.signed_messages.into_iter().next().map(|m| RawSignature {
            full_sig: m.signature.full_sig,
            algorithm: m.algorithm,
        });
        Self {
            status: SigningStatus::from_vault(&details.status),
            sub_status: details.sub_status.filter(|s| !s.is_empty()),
            signature,
        }
    }
}
