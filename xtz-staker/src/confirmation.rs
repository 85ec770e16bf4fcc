//! Inclusion tracking for injected operations.
//!
//! A [`ConfirmationWindow`] covers levels `start..=start + bound`. Each
//! [`poll`](ConfirmationWindow::poll) reads the head and scans every level
//! not yet seen, up to the head or the end of the window.

use std::time::Duration;

use tracing::{debug, info};

use crate::error::StakingError;
use crate::ledger::{BlockId, LedgerOracle};

/// Result of one confirmation poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationStatus {
    Pending,
    Confirmed { level: u64 },
}

/// Search for one operation hash in a bounded range of levels.
#[derive(Debug, Clone)]
pub struct ConfirmationWindow {
    operation_hash: String,
    start_level: u64,
    bound: u32,
    next_level: u64,
    confirmed: Option<u64>,
}

impl ConfirmationWindow {
    /// Track `operation_hash` from `start_level` for `bound` blocks.
    pub fn new(operation_hash: impl Into<String>, start_level: u64, bound: u32) -> Self {
        Self {
            operation_hash: operation_hash.into(),
            start_level,
            bound,
            next_level: start_level,
            confirmed: None,
        }
    }

    /// Hash being searched for.
    pub fn operation_hash(&self) -> &str {
        &self.operation_hash
    }

    /// Highest level the window scans.
    pub fn last_level(&self) -> u64 {
        self.start_level + u64::from(self.bound)
    }

    /// Scan newly produced levels.
    ///
    /// Once confirmed, further polls report the same level without
    /// querying the ledger.
    pub fn poll<L: LedgerOracle + ?Sized>(
        &mut self,
        ledger: &L,
    ) -> Result<ConfirmationStatus, StakingError> {
        if let Some(level) = self.confirmed {
            return Ok(ConfirmationStatus::Confirmed { level });
        }

        let head = ledger.head_header()?.level;
        let until = head.min(self.last_level());
        while self.next_level <= until {
            let level = self.next_level;
            let block = ledger.block(BlockId::Level(level))?;
            self.next_level += 1;
            if block.contains(&self.operation_hash) {
                info!(
                    "Operation {} included at level {} ({} after start)",
                    self.operation_hash,
                    level,
                    level - self.start_level
                );
                self.confirmed = Some(level);
                return Ok(ConfirmationStatus::Confirmed { level });
            }
            debug!("Operation {} not in level {}", self.operation_hash, level);
        }

        if self.next_level > self.last_level() {
            return Err(StakingError::NotConfirmed {
                operation_hash: self.operation_hash.clone(),
                blocks: self.bound,
            });
        }
        Ok(ConfirmationStatus::Pending)
    }
}

/// Blocking driver for [`ConfirmationWindow`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmationTracker {
    /// Blocks after the start level to search
    pub bound: u32,
    /// Delay between head polls
    pub interval: Duration,
}

impl ConfirmationTracker {
    /// Create a tracker with the given window and poll interval.
    pub fn new(bound: u32, interval: Duration) -> Self {
        Self { bound, interval }
    }

    /// Wait for `operation_hash`, counting blocks from the current head.
    pub fn wait<L: LedgerOracle + ?Sized>(
        &self,
        ledger: &L,
        operation_hash: &str,
    ) -> Result<u64, StakingError> {
        let start = ledger.head_header()?.level;
        self.wait_from(ledger, operation_hash, start)
    }

    /// Returns the inclusion level.
    pub fn wait_from<L: LedgerOracle + ?Sized>(
        &self,
        ledger: &L,
        operation_hash: &str,
        start_level: u64,
    ) -> Result<u64, StakingError> {
        info!(
            "Awaiting operation {} within {} blocks of level {}",
            operation_hash, self.bound, start_level
        );
        let mut window = ConfirmationWindow::new(operation_hash, start_level, self.bound);
        loop {
            match window.poll(ledger)? {
                ConfirmationStatus::Confirmed { level } => return Ok(level),
                ConfirmationStatus::Pending => std::thread::sleep(self.interval),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockLedger;

    const HASH: &str = "ooUX4CFegCxQcHQ95QbUupLbinqcr3rHfyzKD5AQeDZSg4tHfJj";
    const START: u64 = 100;

    fn ledger_with_hash_at(k: Option<u64>) -> MockLedger {
        let ledger = MockLedger::new(START, 0);
        for level in START..=START + 10 {
            let hashes = if Some(level - START) == k {
                vec!["ooOther".to_string(), HASH.to_string()]
            } else {
                vec!["ooOther".to_string()]
            };
            ledger.add_block(level, hashes);
        }
        ledger
    }

    fn tracker() -> ConfirmationTracker {
        ConfirmationTracker::new(5, Duration::ZERO)
    }

    #[test]
    fn test_found_within_bound() {
        for k in 0..=5 {
            let ledger = ledger_with_hash_at(Some(k));
            ledger.advance_head_per_poll(1);
            let level = tracker().wait_from(&ledger, HASH, START).unwrap();
            assert_eq!(level, START + k, "k = {k}");
        }
    }

    #[test]
    fn test_beyond_bound_is_not_confirmed() {
        let ledger = ledger_with_hash_at(Some(6));
        ledger.advance_head_per_poll(1);
        let err = tracker().wait_from(&ledger, HASH, START).unwrap_err();
        assert!(matches!(
            err,
            StakingError::NotConfirmed { ref operation_hash, blocks: 5 } if operation_hash == HASH
        ));
        // Level 106 is never fetched.
        assert!(!ledger.fetched_levels().contains(&(START + 6)));
    }

    #[test]
    fn test_never_included_is_not_confirmed() {
        let ledger = ledger_with_hash_at(None);
        ledger.advance_head_per_poll(2);
        assert!(matches!(
            tracker().wait_from(&ledger, HASH, START),
            Err(StakingError::NotConfirmed { .. })
        ));
    }

    #[test]
    fn test_head_jump_scans_intermediate_levels() {
        let ledger = ledger_with_hash_at(Some(2));
        let mut window = ConfirmationWindow::new(HASH, START, 5);

        assert_eq!(window.poll(&ledger).unwrap(), ConfirmationStatus::Pending);
        assert_eq!(ledger.fetched_levels(), vec![START]);

        ledger.set_head(START + 4);
        assert_eq!(
            window.poll(&ledger).unwrap(),
            ConfirmationStatus::Confirmed { level: START + 2 }
        );
        assert_eq!(ledger.fetched_levels(), vec![START, START + 1, START + 2]);
    }

    #[test]
    fn test_confirmation_reported_once() {
        let ledger = ledger_with_hash_at(Some(1));
        ledger.set_head(START + 3);
        let mut window = ConfirmationWindow::new(HASH, START, 5);

        assert_eq!(
            window.poll(&ledger).unwrap(),
            ConfirmationStatus::Confirmed { level: START + 1 }
        );
        let fetched = ledger.fetched_levels().len();
        let heads = ledger.head_reads();

        assert_eq!(
            window.poll(&ledger).unwrap(),
            ConfirmationStatus::Confirmed { level: START + 1 }
        );
        assert_eq!(ledger.fetched_levels().len(), fetched);
        assert_eq!(ledger.head_reads(), heads);
    }

    #[test]
    fn test_wait_starts_at_current_head() {
        let ledger = ledger_with_hash_at(Some(0));
        assert_eq!(tracker().wait(&ledger, HASH).unwrap(), START);
    }
}
