pub mod config;
pub mod database;
pub mod error;
pub mod guard;
pub mod ledger;
pub mod meter;
pub mod refunder;
pub mod relay;
pub mod safe;
pub mod selector;
pub mod tank;

pub use error::{Error, Result};
pub use ledger::{AccountRecord, Ledger};
pub use meter::{AccountLock, Call, CallOutcome, Executor, Metered};
pub use relay::{ItxRelay, RelayError, RelayNetwork, Relayer};
pub use safe::{SafeService, SafeTransaction, SafeTransactionService};
pub use selector::{Method, Selector};
pub use tank::{GasTank, TankConfig, TankSnapshot, WithdrawPolicy};
