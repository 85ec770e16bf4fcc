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

//! Remote signer: digest submission, status polling and signature assembly.

use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info};
use xtz_forge::{Curve, EncodingError, ForgedOperation, PublicKey, Signature, SignedOperation};

use crate::client::{VaultError, VaultOracle};
use crate::protocol::{AccountId, Network, RawSignature, RequestId, SigningStatus};
use crate::session::{SessionPoll, SigningSession};

/// Errors from a signing attempt.
#[derive(Debug, Error)]
pub enum SignerError {
    #[error("Vault error: {0}")]
    Vault(#[from] VaultError),

    #[error("Signing request {request_id} ended with status {status} (sub-status: {})", sub_status.as_deref().unwrap_or("none"))]
    Terminal {
        request_id: RequestId,
        status: SigningStatus,
        sub_status: Option<String>,
    },

    #[error("Signing request {request_id} still pending after {attempts} polls")]
    Timeout { request_id: RequestId, attempts: u32 },

    #[error("Signing request {0} completed without a signature")]
    MissingSignature(RequestId),

    #[error("Invalid signature material: {0}")]
    Encoding(#[from] EncodingError),
}

/// How the signing-status loop waits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Delay between status queries
    pub interval: Duration,
    /// `None` polls until the vault reports a terminal status.
    pub max_attempts: Option<u32>,
}

impl PollPolicy {
    /// True once `polls` status queries use up the budget. `Some(0)` allows none.
    pub fn exhausted(&self, polls: u32) -> bool {
        self.max_attempts.is_some_and(|max| polls >= max)
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_attempts: None,
        }
    }
}

/// Signs forged operations through a vault.
pub struct RemoteSigner<'a, V: ?Sized> {
    vault: &'a V,
    policy: PollPolicy,
}

impl<'a, V: VaultOracle + ?Sized> RemoteSigner<'a, V> {
    /// Create a signer over `vault`.
    pub fn new(vault: &'a V, policy: PollPolicy) -> Self {
        Self { vault, policy }
    }

    /// Fetch the account's public key in chain format.
    pub fn public_key(&self, account: &AccountId, network: Network) -> Result<PublicKey, SignerError> {
        let info = self.vault.public_key_info(account, network)?;
        let curve = match info.algorithm.as_deref() {
            Some(algorithm) => Curve::from_algorithm(algorithm)?,
            None => Curve::Ed25519,
        };
        let key = PublicKey::from_hex(curve, &info.public_key)?;
        debug!("Vault account {} public key: {}", account, key);
        Ok(key)
    }

    /// Sign `forged` and return the injectable bytes.
    ///
    /// Blocks the calling thread between polls.
    pub fn sign(
        &self,
        account: &AccountId,
        network: Network,
        forged: &ForgedOperation,
        note: &str,
    ) -> Result<SignedOperation, SignerError> {
        let digest = forged.signing_digest();
        let request_id = self.vault.submit_raw_sign(account, network, &digest, note)?;
        info!(
            "Raw signing request submitted: id={}, digest={}",
            request_id, digest
        );

        let mut session = SigningSession::submitted(request_id);
        let raw = loop {
            if self.policy.exhausted(session.polls()) {
                return Err(SignerError::Timeout {
                    request_id: session.request_id().clone(),
                    attempts: session.polls(),
                });
            }
            match session.poll(self.vault)? {
                SessionPoll::Completed(raw) => break raw,
                SessionPoll::Pending(_) => {
                    if !self.policy.exhausted(session.polls()) {
                        std::thread::sleep(self.policy.interval);
                    }
                }
            }
        };

        let signed = assemble_signed(forged, &raw)?;
        info!(
            "Signing request {} completed after {} polls",
            session.request_id(),
            session.polls()
        );
        Ok(signed)
    }
}

/// Re-encode a raw vault signature into chain format and append it.
///
/// The signature goes through its prefixed text form and back, so a
/// malformed signature fails here rather than at injection.
pub fn assemble_signed(
    forged: &ForgedOperation,
    raw: &RawSignature,
) -> Result<SignedOperation, SignerError> {
    let curve = match raw.algorithm.as_deref() {
        Some(algorithm) => Curve::from_algorithm(algorithm)?,
        None => Curve::Ed25519,
    };
    let prefixed = Signature::from_hex(curve, &raw.full_sig)?.to_base58();
    debug!("Signature to inject: {}", prefixed);
    let signature = Signature::from_base58(curve, &prefixed)?;
    Ok(forged.attach_signature(&signature))
}
