//! Staking lifecycle orchestrator.
//!
//! Every operation runs the same step: validate input, optionally wait for
//! a previous operation, resolve the account address, read the chain
//! state, build, forge, sign in the vault, inject. Calls for the same
//! account must not overlap since each reads the on-chain counter.

use tracing::{debug, info};
use xtz_forge::{forge, PublicKeyHash};
use xtz_vault::{AccountId, Network, RemoteSigner, VaultOracle};

use crate::builder::{self, AccountState, Intent};
use crate::confirmation::ConfirmationTracker;
use crate::config::StakerConfig;
use crate::error::StakingError;
use crate::ledger::{LedgerError, LedgerOracle};

/// Runs lifecycle operations for vault accounts.
/// 
/// Holds no per-account state; `Send + Sync` whenever both oracles are.
pub struct Staker<V, L> {
    vault: V,
    ledger: L,
    config: StakerConfig,
}

impl<V: VaultOracle, L: LedgerOracle> Staker<V, L> {
    /// Create an orchestrator over the given oracles.
    pub fn new(vault: V, ledger: L, config: StakerConfig) -> Self {
        Self {
            vault,
            ledger,
            config,
        }
    }

    /// The vault oracle.
    pub fn vault(&self) -> &V {
        &self.vault
    }

    /// The ledger oracle.
    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Active configuration.
    pub fn config(&self) -> &StakerConfig {
        &self.config
    }

    /// Delegate to `destination`, or remove the delegate when it is `None`
    /// or empty. `reveal` prepends a reveal of the account key.
    pub fn delegate(
        &self,
        account: &str,
        destination: Option<&str>,
        reveal: bool,
        network: Network,
        await_hash: Option<&str>,
    ) -> Result<String, StakingError> {
        let account = builder::parse_account(account)?;
        let delegate = builder::parse_delegate(destination)?;
        self.run(&account, Intent::Delegate { delegate, reveal }, network, await_hash)
    }

    /// Remove the account's delegate.
    pub fn undelegate(
        &self,
        account: &str,
        network: Network,
        await_hash: Option<&str>,
    ) -> Result<String, StakingError> {
        self.delegate(account, None, false, network, await_hash)
    }

    /// Stake `amount` tez from the account's spendable balance.
    pub fn stake(
        &self,
        account: &str,
        amount: &str,
        network: Network,
        await_hash: Option<&str>,
    ) -> Result<String, StakingError> {
        let account = builder::parse_account(account)?;
        let amount = builder::parse_amount(amount)?;
        self.run(&account, Intent::Stake { amount }, network, await_hash)
    }

    /// Request unstaking of `amount` tez. Funds become finalizable after the unstake delay.
    pub fn unstake(
        &self,
        account: &str,
        amount: &str,
        network: Network,
        await_hash: Option<&str>,
    ) -> Result<String, StakingError> {
        let account = builder::parse_account(account)?;
        let amount = builder::parse_amount(amount)?;
        self.run(&account, Intent::Unstake { amount }, network, await_hash)
    }

    /// Move finalizable unstaked funds back to the spendable balance.
    pub fn finalize_unstake(
        &self,
        account: &str,
        network: Network,
        await_hash: Option<&str>,
    ) -> Result<String, StakingError> {
        let account = builder::parse_account(account)?;
        self.run(&account, Intent::FinalizeUnstake, network, await_hash)
    }

    /// Wait until `operation_hash` is included, counting blocks from the
    /// current head. Returns the inclusion level.
    pub fn await_confirmation(&self, operation_hash: &str) -> Result<u64, StakingError> {
        self.tracker().wait(&self.ledger, operation_hash)
    }

    fn tracker(&self) -> ConfirmationTracker {
        ConfirmationTracker::new(self.config.confirmation_blocks, self.config.poll_interval())
    }

    fn run(
        &self,
        account: &AccountId,
        intent: Intent,
        network: Network,
        await_hash: Option<&str>,
    ) -> Result<String, StakingError> {
        if let Some(hash) = await_hash.map(str::trim).filter(|h| !h.is_empty()) {
            self.await_confirmation(hash)?;
        }

        let source = self.resolve_address(account, network)?;
        let head = self.ledger.head_header()?;
        let counter = self.ledger.counter(&source)?;
        info!(
            "Account {} ({}): counter {}, branch {} at level {}",
            account, source, counter, head.hash, head.level
        );

        let signer = RemoteSigner::new(&self.vault, self.config.sign_policy());
        let reveal_key = if intent.reveals() {
            Some(signer.public_key(account, network)?)
        } else {
            None
        };

        let state = AccountState {
            source,
            counter,
            branch: head.hash,
        };
        let batch = builder::build(&intent, &state, &self.config.fees, reveal_key.as_ref())?;
        if let Ok(json) = serde_json::to_string(&batch) {
            debug!("Operation batch: {}", json);
        }

        let forged = forge(&batch);
        debug!("Forged {} bytes: {}", forged.as_bytes().len(), forged.to_hex());

        let signed = signer.sign(account, network, &forged, &intent.note())?;
        let operation_hash = self.ledger.broadcast(&signed).map_err(|e| match e {
            LedgerError::Rejected { status, body } => {
                StakingError::InjectionRejected(format!("node returned {}: {}", status, body))
            }
            e => StakingError::Ledger(e),
        })?;
        info!("Injected operation {}", operation_hash);

        if self.config.confirm_after_inject {
            self.await_confirmation(&operation_hash)?;
        }
        Ok(operation_hash)
    }

    /// The account's chain address: its first deposit address.
    fn resolve_address(
        &self,
        account: &AccountId,
        network: Network,
    ) -> Result<PublicKeyHash, StakingError> {
        let addresses = self.vault.deposit_addresses(account, network)?;
        let first = addresses
            .first()
            .ok_or_else(|| StakingError::AddressResolution {
                account: account.to_string(),
                detail: format!("no {} deposit address", network.asset_id()),
            })?;
        let address = first
            .address
            .parse::<PublicKeyHash>()
            .map_err(|e| StakingError::AddressResolution {
                account: account.to_string(),
                detail: format!("{:?}: {}", first.address, e),
            })?;
        info!("Vault account {} resolves to {}", account, address);
        Ok(address)
    }
}
