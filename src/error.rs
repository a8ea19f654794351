use ethers::types::{Address, U256};

use crate::selector::Selector;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("not authorized: {caller:?} is not the owner")]
    NotAuthorized { caller: Address },

    #[error("overflow: balance of {account:?} cannot grow by {amount}")]
    Overflow { account: Address, amount: U256 },

    #[error("insufficient funds: {account:?} needs {required}, has {available}")]
    InsufficientFunds {
        account: Address,
        required: U256,
        available: U256,
    },

    #[error("settlement of {amount} exceeds the balance of {account:?}")]
    SettlementExceedsBalance { account: Address, amount: U256 },

    #[error("account in use: {0:?}")]
    AccountInUse(Address),

    #[error("cannot move funds out while a forwarded call is running")]
    CallInProgress,

    #[error("nothing to payout")]
    NothingToPayout,

    #[error("nothing to withdraw for {0:?}")]
    NothingToWithdraw(Address),

    #[error("payout transfer of {amount} to {recipient:?} failed")]
    PayoutTransferFailed { recipient: Address, amount: U256 },

    #[error("withdraw transfer of {amount} to {recipient:?} failed")]
    WithdrawTransferFailed { recipient: Address, amount: U256 },

    #[error("call to {target:?} failed")]
    CallFailed { target: Address },

    #[error("method not allowed (expected: {expected}, got: {actual:?})")]
    MethodNotAllowed {
        expected: Selector,
        actual: Option<Selector>,
    },

    #[error("not enough confirmations (required: {required}, provided: {provided})")]
    InsufficientConfirmations { required: usize, provided: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
