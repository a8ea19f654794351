mod utilities;

pub mod mocks;

pub use utilities::{address, ether, setup_tracing, Account, ACCOUNT1, ACCOUNT2};
