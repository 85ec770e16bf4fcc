//! Operation builder: validated caller intents into operation batches.
//!
//! The `parse_*` functions run before any network call; everything they
//! reject surfaces as [`StakingError::InvalidInput`].

use xtz_forge::{BlockHash, Entrypoint, OperationBatch, OperationContent, PublicKey, PublicKeyHash};
use xtz_vault::AccountId;

use crate::error::StakingError;
use crate::policy::{CounterAllocator, FeePolicy};

/// Mutez per tez.
pub const MUTEZ_PER_TEZ: u64 = 1_000_000;
/// Mutez amounts are signed 64-bit on chain.
pub const MAX_MUTEZ: u64 = i64::MAX as u64;
const TEZ_DECIMALS: usize = 6;

/// What the caller wants the account to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// `delegate: None` removes the current delegate.
    Delegate {
        delegate: Option<PublicKeyHash>,
        reveal: bool,
    },
    Stake { amount: u64 },
    Unstake { amount: u64 },
    FinalizeUnstake,
}

impl Intent {
    /// Whether the batch starts with a reveal.
    pub fn reveals(&self) -> bool {
        matches!(self, Intent::Delegate { reveal: true, .. })
    }

    /// Human-readable description attached to the signing request.
    pub fn note(&self) -> String {
        match self {
            Intent::Delegate {
                delegate: Some(delegate),
                ..
            } => format!("Delegating Tezos to the following Baker's address: {}", delegate),
            Intent::Delegate { delegate: None, .. } => "Removing Tezos delegation".to_string(),
            Intent::Stake { amount } => format!("Staking {} XTZ", format_tez(*amount)),
            Intent::Unstake { amount } => format!("Unstaking {} XTZ", format_tez(*amount)),
            Intent::FinalizeUnstake => "Finalizing unstaked XTZ".to_string(),
        }
    }
}

/// On-chain state a batch is built against. Read fresh for every step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountState {
    /// Resolved chain address of the vault account
    pub source: PublicKeyHash,
    /// Last counter used on chain.
    pub counter: u64,
    /// Head block hash the batch is anchored on
    pub branch: BlockHash,
}

/// Validate a vault account id before any network call.
pub fn parse_account(account: &str) -> Result<AccountId, StakingError> {
    AccountId::parse(account).map_err(|e| StakingError::InvalidInput(e.to_string()))
}

/// Parse a baker address. An empty string means "no delegate".
pub fn parse_delegate(destination: Option<&str>) -> Result<Option<PublicKeyHash>, StakingError> {
    match destination.map(str::trim) {
        None | Some("") => Ok(None),
        Some(address) => address.parse::<PublicKeyHash>().map(Some).map_err(|e| {
            StakingError::InvalidInput(format!("Invalid baker address {:?}: {}", address, e))
        }),
    }
}

/// Parse a positive decimal tez amount into mutez, rounding half up at
/// the sixth decimal.
pub fn parse_amount(amount: &str) -> Result<u64, StakingError> {
    let invalid = |reason: &str| StakingError::InvalidInput(format!("{}: {:?}", reason, amount));

    let trimmed = amount.trim();
    if trimmed.is_empty() {
        return Err(invalid("Amount is required"));
    }
    if trimmed.starts_with('-') {
        return Err(invalid("Amount must be greater than 0"));
    }

    let (whole, fraction) = match trimmed.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (trimmed, ""),
    };
    let is_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if (whole.is_empty() && fraction.is_empty()) || !is_digits(whole) || !is_digits(fraction) {
        return Err(invalid("Amount must be a number"));
    }

    let too_large = || invalid("Amount is too large");
    let mut mutez: u64 = 0;
    for digit in whole.bytes() {
        mutez = mutez
            .checked_mul(10)
            .and_then(|m| m.checked_add(u64::from(digit - b'0')))
            .ok_or_else(too_large)?;
    }
    mutez = mutez.checked_mul(MUTEZ_PER_TEZ).ok_or_else(too_large)?;

    let digits = fraction.as_bytes();
    let mut scale = MUTEZ_PER_TEZ / 10;
    for &digit in digits.iter().take(TEZ_DECIMALS) {
        mutez = mutez
            .checked_add(u64::from(digit - b'0') * scale)
            .ok_or_else(too_large)?;
        scale /= 10;
    }
    if digits.get(TEZ_DECIMALS).is_some_and(|&d| d >= b'5') {
        mutez = mutez.checked_add(1).ok_or_else(too_large)?;
    }

    if mutez == 0 {
        return Err(invalid("Amount must be greater than 0"));
    }
    if mutez > MAX_MUTEZ {
        return Err(too_large());
    }
    Ok(mutez)
}

/// Render mutez as a tez decimal without trailing zeros.
pub fn format_tez(mutez: u64) -> String {
    let whole = mutez / MUTEZ_PER_TEZ;
    let fraction = mutez % MUTEZ_PER_TEZ;
    if fraction == 0 {
        return whole.to_string();
    }
    let fraction = format!("{:06}", fraction);
    format!("{}.{}", whole, fraction.trim_end_matches('0'))
}

/// Build the batch for `intent`.
///
/// `reveal_key` must be present when the intent reveals.
pub fn build(
    intent: &Intent,
    state: &AccountState,
    fees: &FeePolicy,
    reveal_key: Option<&PublicKey>,
) -> Result<OperationBatch, StakingError> {
    let mut counters = CounterAllocator::after(state.counter);
    let mut contents = Vec::with_capacity(2);

    match intent {
        Intent::Delegate { delegate, reveal } => {
            if *reveal {
                let public_key = reveal_key.ok_or_else(|| {
                    StakingError::InvalidInput(
                        "Reveal requested without the account public key".to_string(),
                    )
                })?;
                contents.push(OperationContent::Reveal {
                    manager: fees.manager(state.source, counters.allocate()),
                    public_key: public_key.clone(),
                });
            }
            contents.push(OperationContent::Delegation {
                manager: fees.manager(state.source, counters.allocate()),
                delegate: *delegate,
            });
        }
        Intent::Stake { amount } => {
            contents.push(transaction(state, fees, &mut counters, *amount, Entrypoint::Stake));
        }
        Intent::Unstake { amount } => {
            contents.push(transaction(state, fees, &mut counters, *amount, Entrypoint::Unstake));
        }
        Intent::FinalizeUnstake => {
            contents.push(transaction(
                state,
                fees,
                &mut counters,
                0,
                Entrypoint::FinalizeUnstake,
            ));
        }
    }

    Ok(OperationBatch::new(state.branch, contents)?)
}

fn transaction(
    state: &AccountState,
    fees: &FeePolicy,
    counters: &mut CounterAllocator,
    amount: u64,
    entrypoint: Entrypoint,
) -> OperationContent {
    OperationContent::Transaction {
        manager: fees.manager(state.source, counters.allocate()),
        amount,
        entrypoint,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xtz_forge::{Curve, ForgeError};

    const RAW_KEY: &str = "d670f72efd9475b62275fae773eb5f5eb1fea4f2a0880e6d21983273bf95a0af";
    const BAKER: &str = "tz1MCGdC9qYbSjtWEbup9i17WkohvzwCm2HV";

    fn key() -> PublicKey {
        PublicKey::from_hex(Curve::Ed25519, RAW_KEY).unwrap()
    }

    fn state(counter: u64) -> AccountState {
        AccountState {
            source: key().hash(),
            counter,
            branch: BlockHash::new([0x22; 32]),
        }
    }

    fn baker() -> PublicKeyHash {
        BAKER.parse().unwrap()
    }

    #[test]
    fn test_delegate_without_reveal() {
        for counter in [0, 41, 999_999] {
            let intent = Intent::Delegate {
                delegate: Some(baker()),
                reveal: false,
            };
            let batch = build(&intent, &state(counter), &FeePolicy::default(), None).unwrap();

            assert_eq!(batch.contents().len(), 1);
            match &batch.contents()[0] {
                OperationContent::Delegation { manager, delegate } => {
                    assert_eq!(manager.counter, counter + 1);
                    assert_eq!(*delegate, Some(baker()));
                }
                other => panic!("Expected delegation, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_delegate_with_reveal() {
        let intent = Intent::Delegate {
            delegate: Some(baker()),
            reveal: true,
        };
        let batch = build(&intent, &state(41), &FeePolicy::default(), Some(&key())).unwrap();

        let contents = batch.contents();
        assert_eq!(contents.len(), 2);
        assert!(matches!(&contents[0], OperationContent::Reveal { public_key, .. } if *public_key == key()));
        assert!(matches!(&contents[1], OperationContent::Delegation { .. }));
        assert_eq!(contents[0].counter(), 42);
        assert_eq!(contents[1].counter(), 43);
    }

    #[test]
    fn test_reveal_without_key_is_rejected() {
        let intent = Intent::Delegate {
            delegate: None,
            reveal: true,
        };
        assert!(matches!(
            build(&intent, &state(1), &FeePolicy::default(), None),
            Err(StakingError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_reveal_of_foreign_key_is_forge_failure() {
        let intent = Intent::Delegate {
            delegate: None,
            reveal: true,
        };
        let mut state = state(1);
        state.source = baker();
        assert!(matches!(
            build(&intent, &state, &FeePolicy::default(), Some(&key())),
            Err(StakingError::Forge(ForgeError::RevealKeyMismatch { .. }))
        ));
    }

    #[test]
    fn test_undelegate_has_no_delegate() {
        let intent = Intent::Delegate {
            delegate: None,
            reveal: false,
        };
        let batch = build(&intent, &state(7), &FeePolicy::default(), None).unwrap();
        assert!(matches!(
            &batch.contents()[0],
            OperationContent::Delegation { delegate: None, .. }
        ));
    }

    #[test]
    fn test_stake_and_unstake_are_self_transactions() {
        for (intent, expected) in [
            (Intent::Stake { amount: 1_500_000 }, Entrypoint::Stake),
            (Intent::Unstake { amount: 1_500_000 }, Entrypoint::Unstake),
        ] {
            let state = state(10);
            let batch = build(&intent, &state, &FeePolicy::default(), None).unwrap();

            assert_eq!(batch.contents().len(), 1);
            match &batch.contents()[0] {
                OperationContent::Transaction {
                    manager,
                    amount,
                    entrypoint,
                } => {
                    assert_eq!(*amount, 1_500_000);
                    assert_eq!(*entrypoint, expected);
                    assert_eq!(manager.counter, 11);
                    assert_eq!(manager.source, state.source);
                }
                other => panic!("Expected transaction, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_finalize_unstake_has_zero_amount() {
        let batch = build(&Intent::FinalizeUnstake, &state(3), &FeePolicy::default(), None).unwrap();
        assert!(matches!(
            &batch.contents()[0],
            OperationContent::Transaction {
                amount: 0,
                entrypoint: Entrypoint::FinalizeUnstake,
                ..
            }
        ));
    }

    #[test]
    fn test_fee_overrides_apply() {
        let fees = FeePolicy {
            fee: 5000,
            gas_limit: 20000,
            storage_limit: 100,
        };
        let batch = build(&Intent::FinalizeUnstake, &state(3), &fees, None).unwrap();
        let manager = batch.contents()[0].manager();
        assert_eq!(manager.fee, 5000);
        assert_eq!(manager.gas_limit, 20000);
        assert_eq!(manager.storage_limit, 100);
    }

    #[test]
    fn test_parse_amount_converts_to_mutez() {
        assert_eq!(parse_amount("1").unwrap(), 1_000_000);
        assert_eq!(parse_amount("1.5").unwrap(), 1_500_000);
        assert_eq!(parse_amount("0.000001").unwrap(), 1);
        assert_eq!(parse_amount(" 12.345678 ").unwrap(), 12_345_678);
        assert_eq!(parse_amount(".25").unwrap(), 250_000);
        assert_eq!(parse_amount("3.").unwrap(), 3_000_000);
        // Rounded at the sixth decimal.
        assert_eq!(parse_amount("0.0000015").unwrap(), 2);
        assert_eq!(parse_amount("0.0000014").unwrap(), 1);
    }

    #[test]
    fn test_parse_amount_rejects_invalid() {
        for amount in ["0", "-5", "abc", "", "  ", "0.0000004", "1.2.3", "1e6", ".", "0x10"] {
            assert!(
                matches!(parse_amount(amount), Err(StakingError::InvalidInput(_))),
                "{amount:?} should be rejected"
            );
        }
        assert!(parse_amount("99999999999999999999").is_err());
    }

    #[test]
    fn test_parse_amount_rejects_overflow() {
        // Whole part fits in u64 mutez, the fraction pushes it over.
        for amount in [
            "18446744073709.999999",
            "18446744073709.5516155",
            "9223372036854.775808",
        ] {
            assert!(
                matches!(parse_amount(amount), Err(StakingError::InvalidInput(_))),
                "{amount:?} should be rejected"
            );
        }
        assert_eq!(parse_amount("9223372036854.775807").unwrap(), MAX_MUTEZ);
    }

    #[test]
    fn test_parse_delegate() {
        assert_eq!(parse_delegate(None).unwrap(), None);
        assert_eq!(parse_delegate(Some("")).unwrap(), None);
        assert_eq!(parse_delegate(Some(BAKER)).unwrap(), Some(baker()));
        assert!(matches!(
            parse_delegate(Some("baker1")),
            Err(StakingError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_parse_account() {
        assert!(parse_account("0").is_ok());
        assert!(matches!(parse_account(""), Err(StakingError::InvalidInput(_))));
        assert!(matches!(
            parse_account("0/../1"),
            Err(StakingError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_notes() {
        let intent = Intent::Delegate {
            delegate: Some(baker()),
            reveal: false,
        };
        assert_eq!(
            intent.note(),
            format!("Delegating Tezos to the following Baker's address: {BAKER}")
        );
        assert_eq!(Intent::Stake { amount: 1_500_000 }.note(), "Staking 1.5 XTZ");
        assert_eq!(Intent::Unstake { amount: 2_000_000 }.note(), "Unstaking 2 XTZ");
    }

    #[test]
    fn test_format_tez() {
        assert_eq!(format_tez(0), "0");
        assert_eq!(format_tez(1), "0.000001");
        assert_eq!(format_tez(12_340_000), "12.34");
    }
}
