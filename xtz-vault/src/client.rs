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

//! Vault oracle interface and its HTTP implementation.
//!
//! The vault authenticates every request with an API key header plus a
//! short-lived RS256 token bound to the request path and a SHA-256 hash
//! of the request body.
//!
//! ## Usage
//!
//! ```ignore
//! use xtz_vault::client::{HttpVaultClient, VaultConfig};
//!
//! let config = VaultConfig {
//!     base_url: "https://api.fireblocks.io".to_string(),
//!     api_key: "f704b8d8-...".to_string(),
//!     api_secret_path: Some(PathBuf::from("/etc/xtz-staker/vault.key")),
//! };
//!
//! let vault = HttpVaultClient::new(&config)?;
//! ```

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::{Algorithm, EncodingKey, Header};
use rand::Rng;
use reqwest::blocking::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::debug;
use xtz_forge::SigningDigest;

use crate::protocol::{
    AccountId, CreateRawTransaction, CreateTransactionResponse, DepositAddress, Network,
    PublicKeyInfo, RequestId, StatusReport, TransactionDetails,
};

/// Production vault API endpoint.
pub const DEFAULT_VAULT_URL: &str = "https://api.fireblocks.io";

/// Token lifetime in seconds.
const TOKEN_TTL_SECS: u64 = 55;

/// Connection settings for the vault API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// API base URL, without a trailing slash
    pub base_url: String,
    /// API key sent as `X-API-Key` and as the token subject
    pub api_key: String,
    /// PEM-encoded RSA private key used to sign request tokens.
    pub api_secret_path: Option<PathBuf>,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_VAULT_URL.to_string(),
            api_key: String::new(),
            api_secret_path: None,
        }
    }
}

/// Errors talking to the vault.
#[derive(Debug, Error)]
pub enum VaultError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Vault returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Token signing error: {0}")]
    Auth(#[from] jsonwebtoken::errors::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid vault account id: {0:?}")]
    InvalidAccountId(String),

    #[error("Missing configuration: {0}")]
    Config(&'static str),

    #[error("Protocol error: {0}")]
    Protocol(String),
}

/// The custodial vault as seen by the signing pipeline.
pub trait VaultOracle {
    /// Deposit addresses of an account for the network's asset.
    fn deposit_addresses(
        &self,
        account: &AccountId,
        network: Network,
    ) -> Result<Vec<DepositAddress>, VaultError>;

    /// Public key of the account's first address (change 0, index 0).
    fn public_key_info(
        &self,
        account: &AccountId,
        network: Network,
    ) -> Result<PublicKeyInfo, VaultError>;

    /// Submit a raw-signing request for `digest`. `note` is shown to vault approvers.
    fn submit_raw_sign(
        &self,
        account: &AccountId,
        network: Network,
        digest: &SigningDigest,
        note: &str,
    ) -> Result<RequestId, VaultError>;

    fn signing_status(&self, request_id: &RequestId) -> Result<StatusReport, VaultError>;
}

impl<T: VaultOracle + ?Sized> VaultOracle for &T {
    fn deposit_addresses(
        &self,
        account: &AccountId,
        network: Network,
    ) -> Result<Vec<DepositAddress>, VaultError> {
        (**self).deposit_addresses(account, network)
    }

    fn public_key_info(
        &self,
        account: &AccountId,
        network: Network,
    ) -> Result<PublicKeyInfo, VaultError> {
        (**self).public_key_info(account, network)
    }

    fn submit_raw_sign(
        &self,
        account: &AccountId,
        network: Network,
        digest: &SigningDigest,
        note: &str,
    ) -> Result<RequestId, VaultError> {
        (**self).submit_raw_sign(account, network, digest, note)
    }

    fn signing_status(&self, request_id: &RequestId) -> Result<StatusReport, VaultError> {
        (**self).signing_status(request_id)
    }
}

#[derive(Serialize)]
struct Claims<'a> {
    uri: &'a str,
    nonce: String,
    iat: u64,
    exp: u64,
    sub: &'a str,
    #[serde(rename = "bodyHash")]
    body_hash: String,
}

/// Blocking HTTP client for the vault REST API.
pub struct HttpVaultClient {
    base_url: String,
    api_key: String,
    signing_key: EncodingKey,
    http: Client,
}

impl HttpVaultClient {
    /// Create a client, reading the API secret from `config.api_secret_path`.
    pub fn new(config: &VaultConfig) -> Result<Self, VaultError> {
        let path = config
            .api_secret_path
            .as_ref()
            .ok_or(VaultError::Config("api_secret_path"))?;
        let secret = std::fs::read_to_string(path)?;
        Self::with_secret(&config.base_url, &config.api_key, &secret)
    }

    /// Create a client from an in-memory PEM secret.
    pub fn with_secret(base_url: &str, api_key: &str, secret_pem: &str) -> Result<Self, VaultError> {
        if api_key.is_empty() {
            return Err(VaultError::Config("api_key"));
        }
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            signing_key: EncodingKey::from_rsa_pem(secret_pem.as_bytes())?,
            http: Client::new(),
        })
    }

    fn token(&self, path: &str, body: &str) -> Result<String, VaultError> {
        let iat = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        let nonce: u64 = rand::thread_rng().gen();
        let claims = Claims {
            uri: path,
            nonce: format!("{:016x}", nonce),
            iat,
            exp: iat + TOKEN_TTL_SECS,
            sub: &self.api_key,
            body_hash: hex::encode(Sha256::digest(body.as_bytes())),
        };
        Ok(jsonwebtoken::encode(
            &Header::new(Algorithm::RS256),
            &claims,
            &self.signing_key,
        )?)
    }

    fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, VaultError> {
        debug!("Vault GET {}", path);
        let response = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .header("X-API-Key", &self.api_key)
            .header(AUTHORIZATION, format!("Bearer {}", self.token(path, "")?))
            .send()?;
        Self::decode(response)
    }

    fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T, VaultError> {
        let body = serde_json::to_string(body)?;
        debug!("Vault POST {} ({} bytes)", path, body.len());
        let token = self.token(path, &body)?;
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .header("X-API-Key", &self.api_key)
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()?;
        Self::decode(response)
    }

    fn decode<T: DeserializeOwned>(response: reqwest::blocking::Response) -> Result<T, VaultError> {
        let status = response.status();
        let body = response.text()?;
        if !status.is_success() {
            return Err(VaultError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(serde_json::from_str(&body)?)
    }
}

impl VaultOracle for HttpVaultClient {
    fn deposit_addresses(
        &self,
        account: &AccountId,
        network: Network,
    ) -> Result<Vec<DepositAddress>, VaultError> {
        self.get(&format!(
            "/v1/vault/accounts/{}/{}/addresses",
            account,
            network.asset_id()
        ))
    }

    fn public_key_info(
        &self,
        account: &AccountId,
        network: Network,
    ) -> Result<PublicKeyInfo, VaultError> {
        self.get(&format!(
            "/v1/vault/accounts/{}/{}/0/0/public_key_info?compressed=true",
            account,
            network.asset_id()
        ))
    }

    fn submit_raw_sign(
        &self,
        account: &AccountId,
        network: Network,
        digest: &SigningDigest,
        note: &str,
    ) -> Result<RequestId, VaultError> {
        let request = CreateRawTransaction::new(account, network, digest.to_hex(), note);
        let response: CreateTransactionResponse = self.post("/v1/transactions", &request)?;
        Ok(RequestId(response.id))
    }

    fn signing_status(&self, request_id: &RequestId) -> Result<StatusReport, VaultError> {
        let details: TransactionDetails = self.get(&format!("/v1/transactions/{}", request_id))?;
        Ok(details.into())
    }
}
