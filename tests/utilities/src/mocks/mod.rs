mod database;
mod executor;
mod relay_network;
mod safe_service;

pub use database::{DatabaseStateError, MockDatabase};
pub use executor::{MockExecutor, Reentry};
pub use relay_network::{MockRelayNetwork, MockRelayNetworkError};
pub use safe_service::{MockSafeService, MockSafeServiceError};
