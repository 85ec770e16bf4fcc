//! Ledger oracle: the Tezos node RPC.

use std::fmt;

use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use xtz_forge::{BlockHash, PublicKeyHash, SignedOperation};

/// Errors talking to the node.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The node answered with a non-success status.
    #[error("Node returned {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Protocol error: {0}")]
    Protocol(String),
}

/// Header fields the pipeline reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Block hash, used as the operation branch
    pub hash: BlockHash,
    /// Block height
    pub level: u64,
}

/// A block reference for RPC paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockId {
    Head,
    Level(u64),
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockId::Head => f.write_str("head"),
            BlockId::Level(level) => write!(f, "{}", level),
        }
    }
}

/// A block and the operations it includes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// Header of the block
    pub header: BlockHeader,
    /// Hashes of every operation included in the block, all validation passes.
    pub operation_hashes: Vec<String>,
}

impl Block {
    /// Whether `operation_hash` is included in this block.
    pub fn contains(&self, operation_hash: &str) -> bool {
        self.operation_hashes.iter().any(|h| h == operation_hash)
    }
}

/// The chain node as seen by the pipeline.
pub trait LedgerOracle {
    fn head_header(&self) -> Result<BlockHeader, LedgerError>;

    /// Last counter used by `address` on chain.
    fn counter(&self, address: &PublicKeyHash) -> Result<u64, LedgerError>;

    /// Inject signed bytes; returns the operation hash.
    fn broadcast(&self, signed: &SignedOperation) -> Result<String, LedgerError>;

    fn block(&self, id: BlockId) -> Result<Block, LedgerError>;
}

impl<T: LedgerOracle + ?Sized> LedgerOracle for &T {
    fn head_header(&self) -> Result<BlockHeader, LedgerError> {
        (**self).head_header()
    }

    fn counter(&self, address: &PublicKeyHash) -> Result<u64, LedgerError> {
        (**self).counter(address)
    }

    fn broadcast(&self, signed: &SignedOperation) -> Result<String, LedgerError> {
        (**self).broadcast(signed)
    }

    fn block(&self, id: BlockId) -> Result<Block, LedgerError> {
        (**self).block(id)
    }
}

/// Blocking client for the node RPC.
pub struct HttpLedgerClient {
    base_url: String,
    http: Client,
}

impl HttpLedgerClient {
    /// Create a client for the node at `base_url`.
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, LedgerError> {
        Ok(serde_json::from_str(&self.get_text(path)?)?)
    }

    fn get_text(&self, path: &str) -> Result<String, LedgerError> {
        debug!("RPC GET {}", path);
        let response = self.http.get(self.url(path)).send()?;
        Self::text(response)
    }

    fn decode<T: DeserializeOwned>(response: reqwest::blocking::Response) -> Result<T, LedgerError> {
        Ok(serde_json::from_str(&Self::text(response)?)?)
    }

    /// Body of a successful response; any other status is a rejection.
    fn text(response: reqwest::blocking::Response) -> Result<String, LedgerError> {
        let status = response.status();
        let body = response.text()?;
        if !status.is_success() {
            return Err(LedgerError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}

impl LedgerOracle for HttpLedgerClient {
    fn head_header(&self) -> Result<BlockHeader, LedgerError> {
        self.get("/chains/main/blocks/head/header")
    }

    fn counter(&self, address: &PublicKeyHash) -> Result<u64, LedgerError> {
        let body = self.get_text(&format!(
            "/chains/main/blocks/head/context/contracts/{}/counter",
            address
        ))?;
        parse_counter(&body)
    }

    fn broadcast(&self, signed: &SignedOperation) -> Result<String, LedgerError> {
        debug!("RPC POST {} ({} bytes)", INJECTION_PATH, signed.as_bytes().len());
        let response = self
            .http
            .post(self.url(INJECTION_PATH))
            .header(CONTENT_TYPE, "application/json")
            .body(injection_body(signed)?)
            .send()?;
        Self::decode(response)
    }

    fn block(&self, id: BlockId) -> Result<Block, LedgerError> {
        let header: BlockHeader = self.get(&format!("/chains/main/blocks/{}/header", id))?;
        // Pin the level so both requests describe the same block.
        let body = self.get_text(&format!(
            "/chains/main/blocks/{}/operation_hashes",
            header.level
        ))?;
        Ok(Block {
            header,
            operation_hashes: parse_operation_hashes(&body)?,
        })
    }
}

const INJECTION_PATH: &str = "/injection/operation?chain=main";

/// Counters are Zarith naturals and travel as JSON strings.
fn parse_counter(body: &str) -> Result<u64, LedgerError> {
    let counter: String = serde_json::from_str(body)?;
    counter
        .parse()
        .map_err(|_| LedgerError::Protocol(format!("Invalid counter {:?}", counter)))
}

/// The node takes the signed bytes as a JSON string of hex.
fn injection_body(signed: &SignedOperation) -> Result<String, LedgerError> {
    Ok(serde_json::to_string(&signed.to_hex())?)
}

/// Hashes come grouped by validation pass.
fn parse_operation_hashes(body: &str) -> Result<Vec<String>, LedgerError> {
    let passes: Vec<Vec<String>> = serde_json::from_str(body)?;
    Ok(passes.into_iter().flatten().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::FeePolicy;
    use xtz_forge::{forge, Curve, OperationBatch, OperationContent, Signature};

    #[test]
    fn test_block_id_paths() {
        assert_eq!(BlockId::Head.to_string(), "head");
        assert_eq!(BlockId::Level(5_000_123).to_string(), "5000123");
    }

    #[test]
    fn test_header_from_node_json() {
        let body = r#"{
            "protocol": "PsParisCZo7KAh1Z1smVd9ZMZ1HHn5gkzbM94V3PLCpknFWhUAi",
            "chain_id": "NetXdQprcVkpaWU",
            "hash": "BKyKE3qEuxs3kKGKft7pdgQpeHHsaPC9Twkqe6A2W7jAfFUeAx8",
            "level": 5000123,
            "proto": 19,
            "predecessor": "BKyKE3qEuxs3kKGKft7pdgQpeHHsaPC9Twkqe6A2W7jAfFUeAx8"
        }"#;
        let header: BlockHeader = serde_json::from_str(body).unwrap();
        assert_eq!(header.level, 5_000_123);
        assert_eq!(header.hash.as_bytes(), &[0x22; 32]);
    }

    #[test]
    fn test_block_contains() {
        let block = Block {
            header: BlockHeader {
                hash: BlockHash::new([0; 32]),
                level: 1,
            },
            operation_hashes: vec!["ooA".into(), "ooB".into()],
        };
        assert!(block.contains("ooB"));
        assert!(!block.contains("ooC"));
    }

    #[test]
    fn test_counter_is_a_json_string() {
        assert_eq!(parse_counter(r#""41""#).unwrap(), 41);
        assert_eq!(parse_counter("\"18446744073709551615\"\n").unwrap(), u64::MAX);
        assert!(matches!(
            parse_counter(r#""forty-one""#),
            Err(LedgerError::Protocol(_))
        ));
        assert!(matches!(
            parse_counter("41"),
            Err(LedgerError::Serialization(_))
        ));
    }

    #[test]
    fn test_injection_body_is_quoted_hex() {
        let source = PublicKeyHash::new(Curve::Ed25519, [0x11; 20]);
        let batch = OperationBatch::new(
            BlockHash::new([0x22; 32]),
            vec![OperationContent::Delegation {
                manager: FeePolicy::default().manager(source, 1),
                delegate: None,
            }],
        )
        .unwrap();
        let signature = Signature::from_bytes(Curve::Ed25519, &[1; 64]).unwrap();
        let signed = forge(&batch).attach_signature(&signature);

        let body = injection_body(&signed).unwrap();
        assert_eq!(body, format!("\"{}\"", signed.to_hex()));
        assert!(body.ends_with(&format!("{}\"", "01".repeat(64))));
        assert_eq!(INJECTION_PATH, "/injection/operation?chain=main");
    }

    #[test]
    fn test_operation_hashes_flatten_passes() {
        let body = r#"[["ooA"],[],["ooB","ooC"],[]]"#;
        assert_eq!(
            parse_operation_hashes(body).unwrap(),
            vec!["ooA", "ooB", "ooC"]
        );
    }

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = HttpLedgerClient::new("https://rpc.tzbeta.net/");
        assert_eq!(
            client.url("/chains/main/blocks/head/header"),
            "https://rpc.tzbeta.net/chains/main/blocks/head/header"
        );
    }
}
