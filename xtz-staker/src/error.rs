//! Failure taxonomy of a lifecycle step.

use thiserror::Error;
use xtz_forge::ForgeError;
use xtz_vault::{SignerError, SigningStatus, VaultError};

use crate::ledger::LedgerError;

/// Why a lifecycle step failed.
///
/// Every variant keeps the detail reported by the vault or the node.
#[derive(Debug, Error)]
pub enum StakingError {
    /// Rejected before any network call.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("No usable deposit address for vault account {account}: {detail}")]
    AddressResolution { account: String, detail: String },

    #[error("Forge failure: {0}")]
    Forge(#[from] ForgeError),

    /// The vault finished the signing request without a signature.
    /// An operator has to act in the vault.
    #[error("Signing request {request_id} ended with status {status} (sub-status: {})", sub_status.as_deref().unwrap_or("none"))]
    SigningTerminal {
        request_id: String,
        status: SigningStatus,
        sub_status: Option<String>,
    },

    #[error("Signing request {request_id} still pending after {attempts} polls")]
    SigningTimeout { request_id: String, attempts: u32 },

    #[error("Invalid signature from vault: {0}")]
    InvalidSignature(String),

    #[error("Injection rejected: {0}")]
    InjectionRejected(String),

    /// The operation may still land later; this is not a rollback.
    #[error("Operation {operation_hash} not seen within {blocks} blocks")]
    NotConfirmed { operation_hash: String, blocks: u32 },

    #[error("Vault error: {0}")]
    Vault(#[from] VaultError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

impl StakingError {
    /// Short name of the failure kind, stable for logs and exit handling.
    pub fn kind(&self) -> &'static str {
        match self {
            StakingError::InvalidInput(_) => "InvalidInput",
            StakingError::AddressResolution { .. } => "AddressResolutionFailure",
            StakingError::Forge(_) => "ForgeFailure",
            StakingError::SigningTerminal { .. } => "SigningTerminalFailure",
            StakingError::SigningTimeout { .. } => "SigningTimeout",
            StakingError::InvalidSignature(_) => "InvalidSignature",
            StakingError::InjectionRejected(_) => "InjectionRejected",
            StakingError::NotConfirmed { .. } => "NotConfirmed",
            StakingError::Vault(_) => "VaultUnavailable",
            StakingError::Ledger(_) => "LedgerUnavailable",
        }
    }
}

impl From<SignerError> for StakingError {
    fn from(e: SignerError) -> Self {
        match e {
            SignerError::Vault(e) => StakingError::Vault(e),
            SignerError::Terminal {
                request_id,
                status,
                sub_status,
            } => StakingError::SigningTerminal {
                request_id: request_id.0,
                status,
                sub_status,
            },
            SignerError::Timeout {
                request_id,
                attempts,
            } => StakingError::SigningTimeout {
                request_id: request_id.0,
                attempts,
            },
            SignerError::MissingSignature(request_id) => StakingError::InvalidSignature(format!(
                "request {} completed without a signature",
                request_id
            )),
            SignerError::Encoding(e) => StakingError::InvalidSignature(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xtz_vault::RequestId;

    #[test]
    fn test_signer_errors_keep_their_kind() {
        let terminal: StakingError = SignerError::Terminal {
            request_id: RequestId("tx-9".into()),
            status: SigningStatus::Blocked,
            sub_status: Some("BLOCKED_BY_POLICY".into()),
        }
        .into();
        assert_eq!(terminal.kind(), "SigningTerminalFailure");
        assert!(terminal.to_string().contains("BLOCKED_BY_POLICY"));

        let timeout: StakingError = SignerError::Timeout {
            request_id: RequestId("tx-9".into()),
            attempts: 30,
        }
        .into();
        assert!(matches!(
            timeout,
            StakingError::SigningTimeout { attempts: 30, .. }
        ));
    }

    #[test]
    fn test_not_confirmed_message() {
        let err = StakingError::NotConfirmed {
            operation_hash: "ooTest".into(),
            blocks: 5,
        };
        assert_eq!(err.kind(), "NotConfirmed");
        assert_eq!(err.to_string(), "Operation ooTest not seen within 5 blocks");
    }
}
