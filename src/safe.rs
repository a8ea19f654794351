use async_trait::async_trait;
use ethers::abi::{self, Token};
use ethers::types::{Address, Bytes, H256, U256};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use tracing::{trace, warn};
use url::Url;

use crate::error::{self, Error};
use crate::meter::Call;
use crate::selector::EXEC_TRANSACTION;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafeConfirmation {
    pub owner: Address,
    pub signature: Bytes,
}

/// A pending multisig transaction, as served by the Safe transaction service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafeTransaction {
    pub safe: Address,
    pub to: Address,
    #[serde(with = "decimal")]
    pub value: U256,
    #[serde(default)]
    pub data: Option<Bytes>,
    pub operation: u8,
    pub gas_token: Address,
    pub safe_tx_gas: u64,
    pub base_gas: u64,
    #[serde(with = "decimal")]
    pub gas_price: U256,
    pub refund_receiver: Address,
    pub nonce: u64,
    pub confirmations_required: usize,
    #[serde(default)]
    pub confirmations: Vec<SafeConfirmation>,
}

impl SafeTransaction {
    pub fn validate(&self) -> error::Result<()> {
        let provided = self.confirmations.len();
        if provided < self.confirmations_required {
            warn!(
                "Safe transaction has {} of {} confirmations.",
                provided, self.confirmations_required
            );
            return Err(Error::InsufficientConfirmations {
                required: self.confirmations_required,
                provided,
            });
        }
        Ok(())
    }

    /// Builds the `execTransaction` call on the safe. Fails before encoding
    /// anything if the transaction is not confirmed enough.
    pub fn encode(&self) -> error::Result<Call> {
        self.validate()?;

        let arguments = abi::encode(&[
            Token::Address(self.to),
            Token::Uint(self.value),
            Token::Bytes(self.data.clone().unwrap_or_default().to_vec()),
            Token::Uint(self.operation.into()),
            Token::Uint(self.safe_tx_gas.into()),
            Token::Uint(self.base_gas.into()),
            Token::Uint(self.gas_price),
            Token::Address(self.gas_token),
            Token::Address(self.refund_receiver),
            Token::Bytes(signatures(&self.confirmations).to_vec()),
        ]);

        let mut data = EXEC_TRANSACTION.as_bytes().to_vec();
        data.extend(arguments);
        Ok(Call::new(self.safe, data.into()))
    }
}

/// Concatenates the signatures ordered by ascending signer. The safe checks
/// signatures in that order, so any other order is rejected on chain.
/// Ascending address bytes is the same order as case-insensitive hex.
pub fn signatures(confirmations: &[SafeConfirmation]) -> Bytes {
    let mut sorted: Vec<&SafeConfirmation> = confirmations.iter().collect();
    sorted.sort_by_key(|confirmation| confirmation.owner);
    sorted
        .into_iter()
        .flat_map(|confirmation| confirmation.signature.iter().copied())
        .collect::<Vec<u8>>()
        .into()
}

#[async_trait]
pub trait SafeService: Debug {
    type Error: std::error::Error + Send + Sync;

    async fn transaction(&self, safe_tx_hash: H256) -> Result<SafeTransaction, Self::Error>;
}

// Implementation using the Safe transaction service HTTP API.

#[derive(Debug, thiserror::Error)]
pub enum SafeServiceError {
    #[error("invalid service URL: {0}")]
    Url(url::ParseError),

    #[error("GET request error: {0}")]
    Request(reqwest::Error),

    #[error("invalid status code: {0}")]
    StatusCode(reqwest::StatusCode),

    #[error("could not parse the request's response: {0}")]
    ParseResponse(serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct SafeTransactionService {
    base_url: Url,
}

impl SafeTransactionService {
    pub fn new(base_url: Url) -> SafeTransactionService {
        SafeTransactionService { base_url }
    }

    /// The hosted service of the given network (e.g. "rinkeby").
    pub fn for_network(network: &str) -> Result<SafeTransactionService, SafeServiceError> {
        let base_url = format!("https://safe-transaction.{}.gnosis.io/", network);
        Url::parse(&base_url)
            .map(SafeTransactionService::new)
            .map_err(SafeServiceError::Url)
    }

    pub fn transaction_url(&self, safe_tx_hash: H256) -> Result<Url, SafeServiceError> {
        self.base_url
            .join(&format!("api/v1/multisig-transactions/{:?}/", safe_tx_hash))
            .map_err(SafeServiceError::Url)
    }
}

#[async_trait]
impl SafeService for SafeTransactionService {
    type Error = SafeServiceError;

    #[tracing::instrument(level = "trace", skip_all)]
    async fn transaction(&self, safe_tx_hash: H256) -> Result<SafeTransaction, Self::Error> {
        let url = self.transaction_url(safe_tx_hash)?;

        let res = reqwest::get(url)
            .await
            .map_err(SafeServiceError::Request)?;
        if res.status() != StatusCode::OK {
            return Err(SafeServiceError::StatusCode(res.status()));
        }

        let bytes = &res.bytes().await.map_err(SafeServiceError::Request)?;
        let transaction: SafeTransaction =
            serde_json::from_slice(bytes).map_err(SafeServiceError::ParseResponse)?;
        trace!("safe transaction: {:?}", transaction);
        Ok(transaction)
    }
}

/// The service encodes large integers as decimal strings.
mod decimal {
    use ethers::types::U256;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Decimal {
            String(String),
            Number(u64),
        }

        match Decimal::deserialize(deserializer)? {
            Decimal::String(s) => U256::from_dec_str(&s).map_err(de::Error::custom),
            Decimal::Number(n) => Ok(n.into()),
        }
    }
}
