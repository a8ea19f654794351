use async_trait::async_trait;
use ethers::types::H256;

use gas_tank::safe::SafeService;
use gas_tank::SafeTransaction;

#[derive(Debug)]
pub struct MockSafeService {
    pub transaction_output: Option<SafeTransaction>,
}

impl MockSafeService {
    pub fn new(transaction_output: Option<SafeTransaction>) -> Self {
        Self { transaction_output }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MockSafeServiceError {
    #[error("safe service mock error: transaction {0:?} not found")]
    NotFound(H256),
}

#[async_trait]
impl SafeService for MockSafeService {
    type Error = MockSafeServiceError;

    async fn transaction(&self, safe_tx_hash: H256) -> Result<SafeTransaction, Self::Error> {
        self.transaction_output
            .clone()
            .ok_or(MockSafeServiceError::NotFound(safe_tx_hash))
    }
}
