use ethers::types::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{info, trace, warn};

use crate::error::{Error, Result};
use crate::guard::Owner;
use crate::ledger::{AccountRecord, Ledger};
use crate::meter::{Call, CallOutcome, Executor, Metered};
use crate::selector::{Selector, EXEC_TRANSACTION};

// Default values.
pub const DEFAULT_FEE_PER_CALL: u64 = 20_000_000_000;
pub const DEFAULT_BASE_GAS: u64 = 21_000;

/// Who may withdraw the spendable remainder of an account.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WithdrawPolicy {
    Owner,
    AccountHolder,
    #[default]
    OwnerOrAccountHolder,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TankConfig {
    /// The only identifier allowed to run privileged operations.
    pub owner: Owner,

    /// The only method that untrusted callers may forward.
    pub allowed_method: Selector,

    /// Surcharge added on top of the metered cost of every fee-charging relay.
    pub fee_per_call: U256,

    pub withdraw_policy: WithdrawPolicy,

    /// Gas added to every metered call to cover the tank's own bookkeeping.
    pub base_gas: U256,

    /// Asset the tank was deployed for, if any.
    pub token: Option<Address>,
}

impl TankConfig {
    pub fn new(owner: Address) -> TankConfig {
        TankConfig {
            owner: Owner::new(owner),
            allowed_method: EXEC_TRANSACTION,
            fee_per_call: DEFAULT_FEE_PER_CALL.into(),
            withdraw_policy: WithdrawPolicy::default(),
            base_gas: DEFAULT_BASE_GAS.into(),
            token: None,
        }
    }

    pub fn set_allowed_method(mut self, allowed_method: Selector) -> TankConfig {
        self.allowed_method = allowed_method;
        self
    }

    pub fn set_fee_per_call(mut self, fee_per_call: U256) -> TankConfig {
        self.fee_per_call = fee_per_call;
        self
    }

    pub fn set_withdraw_policy(mut self, withdraw_policy: WithdrawPolicy) -> TankConfig {
        self.withdraw_policy = withdraw_policy;
        self
    }

    pub fn set_base_gas(mut self, base_gas: U256) -> TankConfig {
        self.base_gas = base_gas;
        self
    }

    pub fn set_token(mut self, token: Option<Address>) -> TankConfig {
        self.token = token;
        self
    }
}

/// Durable part of a tank. The in-use flags are transient and never saved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TankSnapshot {
    pub config: TankConfig,
    pub ledger: Ledger,
}

#[derive(Debug, Clone)]
pub struct GasTank {
    pub(crate) config: TankConfig,
    pub(crate) ledger: Ledger,

    /// Accounts with a metered execution in progress.
    pub(crate) in_use: BTreeSet<Address>,

    /// Same accounts, innermost execution last.
    pub(crate) executing: Vec<Address>,

    /// Forwarded calls currently on the stack, metered or not.
    pub(crate) forwarding: usize,

    /// Credits made while a call was forwarded. They survive a rollback, the
    /// value having already reached the tank.
    pub(crate) arrivals: Vec<(Address, U256)>,
}

/// Views.
impl GasTank {
    pub fn new(config: TankConfig) -> GasTank {
        GasTank {
            config,
            ledger: Ledger::new(),
            in_use: BTreeSet::new(),
            executing: Vec::new(),
            forwarding: 0,
            arrivals: Vec::new(),
        }
    }

    pub fn from_snapshot(snapshot: TankSnapshot) -> GasTank {
        GasTank {
            ledger: snapshot.ledger,
            ..GasTank::new(snapshot.config)
        }
    }

    pub fn snapshot(&self) -> TankSnapshot {
        TankSnapshot {
            config: self.config.clone(),
            ledger: self.ledger.clone(),
        }
    }

    pub fn config(&self) -> &TankConfig {
        &self.config
    }

    pub fn owner(&self) -> Address {
        self.config.owner.address()
    }

    pub fn account(&self, account: Address) -> AccountRecord {
        self.ledger.record(account)
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn is_in_use(&self, account: Address) -> bool {
        self.in_use.contains(&account)
    }

    /// The account whose metered execution is currently running, if any.
    pub fn executing_account(&self) -> Option<Address> {
        self.executing.last().copied()
    }

    pub fn is_forwarding(&self) -> bool {
        self.forwarding > 0
    }
}

/// Operations.
impl GasTank {
    #[tracing::instrument(level = "trace", skip_all)]
    pub fn deposit(&mut self, account: Address, amount: U256) -> Result<()> {
        self.ledger.credit(account, amount)?;
        if self.is_forwarding() {
            self.arrivals.push((account, amount));
        }
        info!("Deposited {} for {:?}.", amount, account);
        Ok(())
    }

    /// Deposits `amount` sent by `sender` for `beneficiary`, or for the
    /// sender itself when there is no beneficiary.
    pub fn deposit_for(
        &mut self,
        sender: Address,
        beneficiary: Option<Address>,
        amount: U256,
    ) -> Result<()> {
        self.deposit(beneficiary.unwrap_or(sender), amount)
    }

    /// Plain value transfer into the tank. Value arriving from inside a
    /// metered execution tops up the executing account.
    #[tracing::instrument(level = "trace", skip_all)]
    pub fn receive(&mut self, sender: Address, value: U256) -> Result<()> {
        let account = self.executing_account().unwrap_or(sender);
        trace!("Received {} from {:?}, crediting {:?}.", value, sender, account);
        self.deposit(account, value)
    }

    /// Forwards a call paid for by the caller's own deposit.
    #[tracing::instrument(level = "trace", skip_all)]
    pub fn execute<E: Executor + ?Sized>(
        &mut self,
        caller: Address,
        target: Address,
        data: Bytes,
        executor: &mut E,
    ) -> Result<Metered> {
        self.check_method(&data)?;
        self.meter_and_forward(caller, Call::new(target, data), U256::zero(), executor)
    }

    /// Owner-only variant of `execute` that charges an arbitrary account.
    #[tracing::instrument(level = "trace", skip_all)]
    pub fn execute_for<E: Executor + ?Sized>(
        &mut self,
        caller: Address,
        account: Address,
        target: Address,
        data: Bytes,
        executor: &mut E,
    ) -> Result<Metered> {
        self.config.owner.require_owner(caller)?;
        self.meter_and_forward(account, Call::new(target, data), U256::zero(), executor)
    }

    /// Settles the used balance of every listed account, in order, and sends
    /// the total to the owner in one transfer.
    #[tracing::instrument(level = "trace", skip_all)]
    pub fn payout<E: Executor + ?Sized>(
        &mut self,
        caller: Address,
        accounts: &[Address],
        executor: &mut E,
    ) -> Result<U256> {
        self.config.owner.require_owner(caller)?;

        self.atomically(|tank| {
            let mut total = U256::zero();
            for &account in accounts {
                if tank.is_in_use(account) {
                    warn!("Tried to pay out {:?} during its own execution.", account);
                    return Err(Error::AccountInUse(account));
                }

                let used = U256::from(tank.ledger.record(account).used);
                if used.is_zero() {
                    continue;
                }
                tank.ledger.settle(account, used)?;
                total += used;
                trace!("Settled {} for {:?}.", used, account);
            }

            if total.is_zero() {
                return Err(Error::NothingToPayout);
            }

            if tank.is_forwarding() {
                warn!("Tried to pay out during a forwarded call.");
                return Err(Error::CallInProgress);
            }

            let owner = tank.owner();
            if !executor.transfer(owner, total) {
                warn!("Owner {:?} rejected a payout of {}.", owner, total);
                return Err(Error::PayoutTransferFailed {
                    recipient: owner,
                    amount: total,
                });
            }

            info!("Paid out {} to {:?}.", total, owner);
            Ok(total)
        })
    }

    /// Sends the spendable remainder of `account` back to it.
    #[tracing::instrument(level = "trace", skip_all)]
    pub fn withdraw<E: Executor + ?Sized>(
        &mut self,
        caller: Address,
        account: Address,
        executor: &mut E,
    ) -> Result<U256> {
        self.authorize_withdraw(caller, account)?;
        if self.is_in_use(account) {
            warn!("Tried to withdraw for {:?} during its own execution.", account);
            return Err(Error::AccountInUse(account));
        }
        if self.is_forwarding() {
            warn!("Tried to withdraw for {:?} during a forwarded call.", account);
            return Err(Error::CallInProgress);
        }

        self.atomically(|tank| {
            let amount = tank.ledger.release_remainder(account);
            if amount.is_zero() {
                return Err(Error::NothingToWithdraw(account));
            }

            if !executor.transfer(account, amount) {
                warn!("{:?} rejected a withdrawal of {}.", account, amount);
                return Err(Error::WithdrawTransferFailed {
                    recipient: account,
                    amount,
                });
            }

            info!("Withdrew {} for {:?}.", amount, account);
            Ok(amount)
        })
    }

    /// Emergency hatch: forwards an arbitrary call without metering.
    #[tracing::instrument(level = "trace", skip_all)]
    pub fn unstuck<E: Executor + ?Sized>(
        &mut self,
        caller: Address,
        target: Address,
        data: Bytes,
        executor: &mut E,
    ) -> Result<CallOutcome> {
        self.config.owner.require_owner(caller)?;

        self.atomically(|tank| {
            let outcome = tank.forward(&Call::new(target, data), executor);
            if !outcome.success {
                return Err(Error::CallFailed { target });
            }
            warn!("Owner forwarded an unmetered call to {:?}.", target);
            Ok(outcome)
        })
    }

    pub fn change_owner(&mut self, caller: Address, new_owner: Address) -> Result<()> {
        self.config.owner.change_owner(caller, new_owner)
    }
}

impl GasTank {
    /// Runs `f` and puts the tank back the way it was if it fails, except
    /// for the value that arrived meanwhile.
    pub(crate) fn atomically<T>(
        &mut self,
        f: impl FnOnce(&mut GasTank) -> Result<T>,
    ) -> Result<T> {
        let checkpoint = self.clone();
        let result = f(self);
        if result.is_err() {
            let kept = checkpoint.arrivals.len().min(self.arrivals.len());
            let arrivals = self.arrivals.split_off(kept);
            *self = checkpoint;
            for (account, amount) in arrivals {
                match self.ledger.credit(account, amount) {
                    Ok(()) => self.arrivals.push((account, amount)),
                    Err(err) => warn!(
                        "Could not keep {} that arrived for {:?}: {}.",
                        amount, account, err
                    ),
                }
            }
        }
        if !self.is_forwarding() {
            self.arrivals.clear();
        }
        result
    }

    pub(crate) fn check_method(&self, data: &[u8]) -> Result<()> {
        let expected = self.config.allowed_method;
        match Selector::of(data) {
            Some(actual) if actual == expected => Ok(()),
            actual => Err(Error::MethodNotAllowed { expected, actual }),
        }
    }

    fn authorize_withdraw(&self, caller: Address, account: Address) -> Result<()> {
        let owner = &self.config.owner;
        match self.config.withdraw_policy {
            WithdrawPolicy::Owner => owner.require_owner(caller),
            WithdrawPolicy::AccountHolder if caller == account => Ok(()),
            WithdrawPolicy::OwnerOrAccountHolder if caller == account => Ok(()),
            WithdrawPolicy::OwnerOrAccountHolder => owner.require_owner(caller),
            WithdrawPolicy::AccountHolder => Err(Error::NotAuthorized { caller }),
        }
    }
}
