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

//! Raw-signing session state machine.
//!
//! A session is created once the vault has accepted a request and is
//! advanced by [`SigningSession::poll`], one status query per call. The
//! caller decides how to wait between polls.
//!
//! ```text
//! Submitted ──► Pending ──► Completed
//!     │            │
//!     └────────────┴──► Blocked | Failed | Rejected | Cancelled
//! ```

use tracing::{debug, info, warn};

use crate::client::VaultOracle;
use crate::protocol::{RawSignature, RequestId, SigningStatus};
use crate::signer::SignerError;

/// Outcome of a single poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionPoll {
    /// Still waiting; carries the latest non-terminal status.
    Pending(SigningStatus),
    Completed(RawSignature),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum SessionState {
    Open(SigningStatus),
    Completed(RawSignature),
    Failed {
        status: SigningStatus,
        sub_status: Option<String>,
    },
}

/// One outstanding signing exchange with the vault.
#[derive(Debug, Clone)]
pub struct SigningSession {
    request_id: RequestId,
    state: SessionState,
    polls: u32,
}

impl SigningSession {
    /// Start tracking a request the vault has accepted.
    pub fn submitted(request_id: RequestId) -> Self {
        Self {
            request_id,
            state: SessionState::Open(SigningStatus::Submitted),
            polls: 0,
        }
    }

    /// Vault id of the request.
    pub fn request_id(&self) -> &RequestId {
        &self.request_id
    }

    /// Number of status queries issued so far.
    pub fn polls(&self) -> u32 {
        self.polls
    }

    /// Latest known status.
    pub fn status(&self) -> SigningStatus {
        match &self.state {
            SessionState::Open(status) => *status,
            SessionState::Completed(_) => SigningStatus::Completed,
            SessionState::Failed { status, .. } => *status,
        }
    }

    /// Query the vault once and advance.
    ///
    /// Terminal states are sticky: polling a finished session does not
    /// contact the vault again.
    pub fn poll<V: VaultOracle + ?Sized>(&mut self, vault: &V) -> Result<SessionPoll, SignerError> {
        match &self.state {
            SessionState::Completed(signature) => return Ok(SessionPoll::Completed(signature.clone())),
            SessionState::Failed { status, sub_status } => {
                return Err(SignerError::Terminal {
                    request_id: self.request_id.clone(),
                    status: *status,
                    sub_status: sub_status.clone(),
                })
            }
            SessionState::Open(_) => {}
        }

        self.polls += 1;
        let report = vault.signing_status(&self.request_id)?;
        let previous = self.status();
        if report.status != previous {
            info!(
                "Signing request {} status: {} -> {}",
                self.request_id, previous, report.status
            );
        } else {
            debug!(
                "Signing request {} still {} (poll {})",
                self.request_id, report.status, self.polls
            );
        }

        match report.status {
            SigningStatus::Completed => {
                let signature = report
                    .signature
                    .ok_or_else(|| SignerError::MissingSignature(self.request_id.clone()))?;
                self.state = SessionState::Completed(signature.clone());
                Ok(SessionPoll::Completed(signature))
            }
            status if status.is_terminal() => {
                warn!(
                    "Signing request {} ended with status {} (sub-status: {})",
                    self.request_id,
                    status,
                    report.sub_status.as_deref().unwrap_or("none")
                );
                self.state = SessionState::Failed {
                    status,
                    sub_status: report.sub_status.clone(),
                };
                Err(SignerError::Terminal {
                    request_id: self.request_id.clone(),
                    status,
                    sub_status: report.sub_status,
                })
            }
            status => {
                self.state = SessionState::Open(status);
                Ok(SessionPoll::Pending(status))
            }
        }
    }
}
