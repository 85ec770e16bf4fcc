//! Scripted in-memory oracles for tests.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};

use xtz_forge::{BlockHash, PublicKeyHash, SignedOperation, SigningDigest};
use xtz_vault::{
    AccountId, DepositAddress, Network, PublicKeyInfo, RawSignature, RequestId, SigningStatus,
    StatusReport, VaultError, VaultOracle,
};

use crate::ledger::{Block, BlockHeader, BlockId, LedgerError, LedgerOracle};

pub const RAW_KEY: &str = "d670f72efd9475b62275fae773eb5f5eb1fea4f2a0880e6d21983273bf95a0af";
/// Hash of [`RAW_KEY`].
pub const SOURCE: &str = "tz1VSUr8wwNhLAzempoch5d6hLRiTh8Cjcjb";
pub const BAKER: &str = "tz1MCGdC9qYbSjtWEbup9i17WkohvzwCm2HV";
pub const INJECTED_HASH: &str = "onvYJ4Ze5mqSPQpNWbJ9ipE6G7ptjf6nTV4bUGSZAb3U9SCAekA";
pub const SIGNATURE: [u8; 64] = [7; 64];

pub struct MockVault {
    addresses: Vec<DepositAddress>,
    statuses: RefCell<VecDeque<SigningStatus>>,
    sub_status: Option<String>,
    submitted: RefCell<Vec<(String, String)>>,
    calls: Cell<u32>,
}

impl MockVault {
    /// Completes every signing request on the second poll.
    pub fn new() -> Self {
        Self {
            addresses: vec![DepositAddress {
                address: SOURCE.to_string(),
            }],
            statuses: RefCell::new(vec![SigningStatus::Pending, SigningStatus::Completed].into()),
            sub_status: None,
            submitted: RefCell::new(Vec::new()),
            calls: Cell::new(0),
        }
    }

    pub fn with_addresses(mut self, addresses: Vec<&str>) -> Self {
        self.addresses = addresses
            .into_iter()
            .map(|address| DepositAddress {
                address: address.to_string(),
            })
            .collect();
        self
    }

    pub fn with_statuses(self, statuses: Vec<SigningStatus>, sub_status: Option<&str>) -> Self {
        Self {
            statuses: RefCell::new(statuses.into()),
            sub_status: sub_status.map(str::to_string),
            ..self
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.get()
    }

    /// `(digest hex, note)` of every submitted signing request.
    pub fn submitted(&self) -> Vec<(String, String)> {
        self.submitted.borrow().clone()
    }

    fn count(&self) {
        self.calls.set(self.calls.get() + 1);
    }
}

impl VaultOracle for MockVault {
    fn deposit_addresses(
        &self,
        _: &AccountId,
        _: Network,
    ) -> Result<Vec<DepositAddress>, VaultError> {
        self.count();
        Ok(self.addresses.clone())
    }

    fn public_key_info(&self, _: &AccountId, _: Network) -> Result<PublicKeyInfo, VaultError> {
        self.count();
        Ok(PublicKeyInfo {
            public_key: RAW_KEY.to_string(),
            algorithm: Some("MPC_EDDSA_ED25519".to_string()),
        })
    }

    fn submit_raw_sign(
        &self,
        _: &AccountId,
        _: Network,
        digest: &SigningDigest,
        note: &str,
    ) -> Result<RequestId, VaultError> {
        self.count();
        self.submitted
            .borrow_mut()
            .push((digest.to_hex(), note.to_string()));
        Ok(RequestId(format!("req-{}", self.submitted.borrow().len())))
    }

    fn signing_status(&self, _: &RequestId) -> Result<StatusReport, VaultError> {
        self.count();
        let status = self
            .statuses
            .borrow_mut()
            .pop_front()
            .unwrap_or(SigningStatus::Completed);
        let signature = (status == SigningStatus::Completed).then(|| RawSignature {
            full_sig: hex::encode(SIGNATURE),
            algorithm: Some("MPC_EDDSA_ED25519".to_string()),
        });
        Ok(StatusReport {
            status,
            sub_status: self.sub_status.clone(),
            signature,
        })
    }
}

pub struct MockLedger {
    head: Cell<u64>,
    head_step: Cell<u64>,
    head_reads: Cell<u32>,
    counter: u64,
    blocks: RefCell<HashMap<u64, Vec<String>>>,
    fetched: RefCell<Vec<u64>>,
    broadcasts: RefCell<Vec<String>>,
    rejection: Option<(u16, String)>,
    calls: Cell<u32>,
}

impl MockLedger {
    pub fn new(head: u64, counter: u64) -> Self {
        Self {
            head: Cell::new(head),
            head_step: Cell::new(0),
            head_reads: Cell::new(0),
            counter,
            blocks: RefCell::new(HashMap::new()),
            fetched: RefCell::new(Vec::new()),
            broadcasts: RefCell::new(Vec::new()),
            rejection: None,
            calls: Cell::new(0),
        }
    }

    pub fn rejecting(mut self, status: u16, body: &str) -> Self {
        self.rejection = Some((status, body.to_string()));
        self
    }

    pub fn add_block(&self, level: u64, operation_hashes: Vec<String>) {
        self.blocks.borrow_mut().insert(level, operation_hashes);
    }

    pub fn set_head(&self, level: u64) {
        self.head.set(level);
    }

    /// Move the head forward by `step` after every head read.
    pub fn advance_head_per_poll(&self, step: u64) {
        self.head_step.set(step);
    }

    pub fn head_reads(&self) -> u32 {
        self.head_reads.get()
    }

    pub fn fetched_levels(&self) -> Vec<u64> {
        self.fetched.borrow().clone()
    }

    /// Hex of every broadcast operation.
    pub fn broadcasts(&self) -> Vec<String> {
        self.broadcasts.borrow().clone()
    }

    pub fn calls(&self) -> u32 {
        self.calls.get()
    }

    fn count(&self) {
        self.calls.set(self.calls.get() + 1);
    }

    fn header(level: u64) -> BlockHeader {
        BlockHeader {
            hash: BlockHash::new([0x22; 32]),
            level,
        }
    }
}

impl LedgerOracle for MockLedger {
    fn head_header(&self) -> Result<BlockHeader, LedgerError> {
        self.count();
        self.head_reads.set(self.head_reads.get() + 1);
        let level = self.head.get();
        self.head.set(level + self.head_step.get());
        Ok(Self::header(level))
    }

    fn counter(&self, _: &PublicKeyHash) -> Result<u64, LedgerError> {
        self.count();
        Ok(self.counter)
    }

    fn broadcast(&self, signed: &SignedOperation) -> Result<String, LedgerError> {
        self.count();
        if let Some((status, body)) = &self.rejection {
            return Err(LedgerError::Rejected {
                status: *status,
                body: body.clone(),
            });
        }
        self.broadcasts.borrow_mut().push(signed.to_hex());
        Ok(INJECTED_HASH.to_string())
    }

    fn block(&self, id: BlockId) -> Result<Block, LedgerError> {
        self.count();
        let level = match id {
            BlockId::Head => self.head.get(),
            BlockId::Level(level) => level,
        };
        self.fetched.borrow_mut().push(level);
        let operation_hashes = self.blocks.borrow().get(&level).cloned().ok_or_else(|| {
            LedgerError::Rejected {
                status: 404,
                body: format!("no block at level {}", level),
            }
        })?;
        Ok(Block {
            header: Self::header(level),
            operation_hashes,
        })
    }
}
