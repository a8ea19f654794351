use ethers::types::{Address, U256};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{Error, Result};

/// Largest value either side of a record can hold (2^128 - 1).
pub const MAX_BALANCE: u128 = u128::MAX;

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawAccountRecord")]
pub struct AccountRecord {
    /// Funds prefunded into the tank.
    pub deposit: u128,

    /// Funds consumed by metered executions and not yet paid out.
    pub used: u128,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid account record: used {used} exceeds deposit {deposit}")]
pub struct InvalidRecord {
    pub deposit: u128,
    pub used: u128,
}

/// Record as found in a snapshot, before its balances are checked.
#[derive(Deserialize)]
struct RawAccountRecord {
    deposit: u128,
    used: u128,
}

impl TryFrom<RawAccountRecord> for AccountRecord {
    type Error = InvalidRecord;

    fn try_from(raw: RawAccountRecord) -> std::result::Result<Self, Self::Error> {
        if raw.used > raw.deposit {
            return Err(InvalidRecord {
                deposit: raw.deposit,
                used: raw.used,
            });
        }
        Ok(AccountRecord {
            deposit: raw.deposit,
            used: raw.used,
        })
    }
}

impl AccountRecord {
    pub fn spendable(&self) -> u128 {
        self.deposit.saturating_sub(self.used)
    }

    pub fn is_empty(&self) -> bool {
        self.deposit == 0 && self.used == 0
    }
}

/// Per-account balances. Records are created on first write and dropped
/// again once both fields are back at zero.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    accounts: BTreeMap<Address, AccountRecord>,
}

impl Ledger {
    pub fn new() -> Ledger {
        Ledger::default()
    }

    pub fn record(&self, account: Address) -> AccountRecord {
        self.accounts.get(&account).copied().unwrap_or_default()
    }

    pub fn spendable(&self, account: Address) -> U256 {
        self.record(account).spendable().into()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Address, &AccountRecord)> {
        self.accounts.iter()
    }

    pub fn credit(&mut self, account: Address, amount: U256) -> Result<()> {
        let overflow = || Error::Overflow { account, amount };
        let mut record = self.record(account);
        record.deposit = record
            .deposit
            .checked_add(to_balance(amount).ok_or_else(overflow)?)
            .ok_or_else(overflow)?;
        self.store(account, record);
        Ok(())
    }

    pub fn debit_used(&mut self, account: Address, amount: U256) -> Result<()> {
        let mut record = self.record(account);
        let insufficient = || Error::InsufficientFunds {
            account,
            required: amount,
            available: record.spendable().into(),
        };
        let used = to_balance(amount)
            .and_then(|amount| record.used.checked_add(amount))
            .filter(|used| *used <= record.deposit)
            .ok_or_else(insufficient)?;
        record.used = used;
        self.store(account, record);
        Ok(())
    }

    pub fn settle(&mut self, account: Address, amount: U256) -> Result<()> {
        let mut record = self.record(account);
        let amount = to_balance(amount)
            .filter(|amount| *amount <= record.used && *amount <= record.deposit)
            .ok_or(Error::SettlementExceedsBalance { account, amount })?;
        record.deposit -= amount;
        record.used -= amount;
        self.store(account, record);
        Ok(())
    }

    /// Zeroes the spendable remainder and returns it. The caller must make
    /// sure the account is not in the middle of a metered execution.
    pub fn release_remainder(&mut self, account: Address) -> U256 {
        let mut record = self.record(account);
        let remainder = record.spendable();
        record.deposit = record.used;
        self.store(account, record);
        remainder.into()
    }

    fn store(&mut self, account: Address, record: AccountRecord) {
        debug_assert!(record.used <= record.deposit);
        if record.is_empty() {
            self.accounts.remove(&account);
        } else {
            self.accounts.insert(account, record);
        }
    }
}

fn to_balance(amount: U256) -> Option<u128> {
    if amount > U256::from(MAX_BALANCE) {
        None
    } else {
        Some(amount.as_u128())
    }
}
