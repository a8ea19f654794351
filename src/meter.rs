use ethers::types::{Address, Bytes, U256};
use std::ops::{Deref, DerefMut};
use tracing::{info, trace, warn};

use crate::error::{Error, Result};
use crate::tank::GasTank;

/// A call forwarded by the tank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub to: Address,
    pub value: U256,
    pub data: Bytes,
}

impl Call {
    pub fn new(to: Address, data: Bytes) -> Call {
        Call {
            to,
            value: U256::zero(),
            data,
        }
    }
}

/// What the execution environment reports back for a forwarded call.
/// Failure is a status, never a panic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallOutcome {
    pub success: bool,
    pub gas_used: U256,
    pub return_data: Bytes,
}

impl CallOutcome {
    pub fn success(gas_used: U256) -> CallOutcome {
        CallOutcome {
            success: true,
            gas_used,
            return_data: Bytes::default(),
        }
    }

    pub fn failure(gas_used: U256) -> CallOutcome {
        CallOutcome {
            success: false,
            gas_used,
            return_data: Bytes::default(),
        }
    }
}

/// The environment the tank runs in: it executes forwarded calls, moves
/// value out of the tank and knows the prevailing gas price.
pub trait Executor {
    /// Price of one unit of gas, in the balance unit.
    fn gas_price(&self) -> U256;

    /// Forwards `call`. The target may call back into `tank` while it runs.
    fn call(&mut self, tank: &mut GasTank, call: &Call) -> CallOutcome;

    /// Sends `amount` from the tank to `to`. Returns `false` when the
    /// recipient rejects the transfer.
    fn transfer(&mut self, to: Address, amount: U256) -> bool;
}

/// Receipt of a metered execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metered {
    pub account: Address,
    pub gas_used: U256,
    pub cost: U256,
    pub return_data: Bytes,
}

/// Marks an account as executing for as long as it is alive. Dropping the
/// lock releases the account, whichever way the execution ended.
#[derive(Debug)]
pub struct AccountLock<'a> {
    tank: &'a mut GasTank,
    account: Address,
}

impl<'a> AccountLock<'a> {
    pub fn account(&self) -> Address {
        self.account
    }
}

impl<'a> Deref for AccountLock<'a> {
    type Target = GasTank;

    fn deref(&self) -> &GasTank {
        self.tank
    }
}

impl<'a> DerefMut for AccountLock<'a> {
    fn deref_mut(&mut self) -> &mut GasTank {
        self.tank
    }
}

impl<'a> Drop for AccountLock<'a> {
    fn drop(&mut self) {
        trace!("Releasing account {:?}.", self.account);
        self.tank.in_use.remove(&self.account);
        if let Some(position) = self
            .tank
            .executing
            .iter()
            .rposition(|account| *account == self.account)
        {
            self.tank.executing.remove(position);
        }
    }
}

/// Counts a forwarded call as in flight for as long as it is alive.
struct Forwarding<'a> {
    tank: &'a mut GasTank,
}

impl<'a> Deref for Forwarding<'a> {
    type Target = GasTank;

    fn deref(&self) -> &GasTank {
        self.tank
    }
}

impl<'a> DerefMut for Forwarding<'a> {
    fn deref_mut(&mut self) -> &mut GasTank {
        self.tank
    }
}

impl<'a> Drop for Forwarding<'a> {
    fn drop(&mut self) {
        self.tank.forwarding -= 1;
    }
}

impl GasTank {
    /// Hands `call` to the executor. No value leaves the tank until the
    /// call returns.
    pub(crate) fn forward<E: Executor + ?Sized>(
        &mut self,
        call: &Call,
        executor: &mut E,
    ) -> CallOutcome {
        self.forwarding += 1;
        let mut forwarding = Forwarding { tank: self };
        executor.call(&mut forwarding, call)
    }

    pub fn lock(&mut self, account: Address) -> Result<AccountLock<'_>> {
        if !self.in_use.insert(account) {
            warn!("Account {:?} is already in use.", account);
            return Err(Error::AccountInUse(account));
        }
        self.executing.push(account);
        Ok(AccountLock {
            tank: self,
            account,
        })
    }

    /// `(gas_used + base_gas) * gas_price + surcharge`, or `None` on overflow.
    /// `base_gas` is always metered, so a call reporting no gas still costs
    /// `base_gas * gas_price`.
    pub fn metered_cost(&self, gas_used: U256, gas_price: U256, surcharge: U256) -> Option<U256> {
        gas_used
            .checked_add(self.config.base_gas)?
            .checked_mul(gas_price)?
            .checked_add(surcharge)
    }

    /// Forwards `call` while `account` is locked and charges its cost plus
    /// `surcharge` to `account`. Nothing sticks unless the whole thing
    /// succeeds, including whatever the target did to the tank meanwhile.
    #[tracing::instrument(level = "trace", skip_all)]
    pub(crate) fn meter_and_forward<E: Executor + ?Sized>(
        &mut self,
        account: Address,
        call: Call,
        surcharge: U256,
        executor: &mut E,
    ) -> Result<Metered> {
        trace!(
            "Forwarding call to {:?} on behalf of {:?}.",
            call.to,
            account
        );

        self.atomically(|tank| {
            let outcome = {
                let mut lock = tank.lock(account)?;
                lock.forward(&call, executor)
            };

            if !outcome.success {
                warn!("Forwarded call to {:?} failed.", call.to);
                return Err(Error::CallFailed { target: call.to });
            }

            let gas_price = executor.gas_price();
            let cost = tank
                .metered_cost(outcome.gas_used, gas_price, surcharge)
                .ok_or_else(|| Error::InsufficientFunds {
                    account,
                    required: U256::MAX,
                    available: tank.ledger.spendable(account),
                })?;
            tank.ledger.debit_used(account, cost)?;

            info!(
                "Charged {} to {:?} for {} gas at {} per gas.",
                cost, account, outcome.gas_used, gas_price
            );

            Ok(Metered {
                account,
                gas_used: outcome.gas_used,
                cost,
                return_data: outcome.return_data,
            })
        })
    }
}
