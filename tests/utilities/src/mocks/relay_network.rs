use async_trait::async_trait;
use ethers::types::{Address, Bytes, Signature, U256};
use std::sync::Mutex;

use gas_tank::relay::RelayTransaction;
use gas_tank::RelayNetwork;

#[derive(Debug)]
pub struct MockRelayNetwork {
    pub chain_id_output: Option<U256>,
    pub balance_output: Option<U256>,
    pub estimate_gas_output: Option<U256>,
    pub send_transaction_output: Option<()>,
    pub sent: Mutex<Vec<(RelayTransaction, Signature)>>,
}

impl MockRelayNetwork {
    pub fn new() -> Self {
        Global::setup();
        Self {
            chain_id_output: Some(U256::from(4)),
            balance_output: Some(U256::exp10(18)),
            estimate_gas_output: Some(U256::from(100_000)),
            send_transaction_output: Some(()),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn global() -> &'static Global {
        unsafe { &GLOBAL }
    }

    pub fn sent(&self) -> Vec<(RelayTransaction, Signature)> {
        self.sent.lock().unwrap().clone()
    }
}

impl Default for MockRelayNetwork {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MockRelayNetworkError {
    #[error("relay network mock error: chain id")]
    ChainId,

    #[error("relay network mock error: balance")]
    Balance,

    #[error("relay network mock error: estimate gas")]
    EstimateGas,

    #[error("relay network mock error: send transaction")]
    SendTransaction,
}

#[async_trait]
impl RelayNetwork for MockRelayNetwork {
    type Error = MockRelayNetworkError;

    async fn chain_id(&self) -> Result<U256, Self::Error> {
        self.chain_id_output.ok_or(MockRelayNetworkError::ChainId)
    }

    async fn balance(&self, _: Address) -> Result<U256, Self::Error> {
        unsafe { GLOBAL.balance_n += 1 };
        self.balance_output.ok_or(MockRelayNetworkError::Balance)
    }

    async fn estimate_gas(&self, _: Address, _: &Bytes) -> Result<U256, Self::Error> {
        unsafe { GLOBAL.estimate_gas_n += 1 };
        self.estimate_gas_output
            .ok_or(MockRelayNetworkError::EstimateGas)
    }

    async fn send_transaction(
        &self,
        transaction: &RelayTransaction,
        signature: &Signature,
    ) -> Result<(), Self::Error> {
        unsafe { GLOBAL.send_transaction_n += 1 };
        self.send_transaction_output
            .ok_or(MockRelayNetworkError::SendTransaction)?;
        self.sent
            .lock()
            .unwrap()
            .push((transaction.clone(), *signature));
        Ok(())
    }
}

pub struct Global {
    pub balance_n: i32,
    pub estimate_gas_n: i32,
    pub send_transaction_n: i32,
}

static mut GLOBAL: Global = Global::default();

impl Global {
    const fn default() -> Global {
        Global {
            balance_n: 0,
            estimate_gas_n: 0,
            send_transaction_n: 0,
        }
    }

    fn setup() {
        unsafe {
            GLOBAL = Global::default();
        }
    }
}
