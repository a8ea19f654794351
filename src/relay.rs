//! Client side of the gas-sponsorship relay network (Infura ITX).
//!
//! The relayer wraps a call into `execute(target, data)` on the tank, signs the
//! envelope with the sponsor key and hands it to the network, which submits it
//! and pays for the gas out of the sponsor's balance.

use async_trait::async_trait;
use ethers::abi::{self, Token};
use ethers::providers::{JsonRpcClient, Middleware, Provider, ProviderError};
use ethers::signers::Signer;
use ethers::types::{Address, Bytes, Signature, TransactionRequest, TxHash, H256, U256};
use ethers::utils::keccak256;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt::Debug;
use tracing::{info, trace};

use crate::error::Error;
use crate::safe::SafeService;
use crate::selector::Method;

/// ITX deposit contract on the public networks.
pub const ITX_DEPOSIT_CONTRACT: &str = "0x015C7C7A7D65bbdb117C573007219107BD7486f9";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelayTransaction {
    pub to: Address,
    pub data: Bytes,
    #[serde(serialize_with = "decimal")]
    pub gas: U256,
}

impl RelayTransaction {
    /// `keccak256(abi.encode(to, data, gas, chainId))`, the digest the
    /// sponsor signs.
    pub fn hash(&self, chain_id: U256) -> H256 {
        keccak256(abi::encode(&[
            Token::Address(self.to),
            Token::Bytes(self.data.to_vec()),
            Token::Uint(self.gas),
            Token::Uint(chain_id),
        ]))
        .into()
    }
}

fn decimal<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

/// Call data of `execute(target, data)` on the tank.
pub fn encode_execute(target: Address, data: &Bytes) -> Bytes {
    let mut encoded = Method::Execute.selector().as_bytes().to_vec();
    encoded.extend(abi::encode(&[
        Token::Address(target),
        Token::Bytes(data.to_vec()),
    ]));
    encoded.into()
}

#[async_trait]
pub trait RelayNetwork: Debug {
    type Error: std::error::Error + Send + Sync;

    async fn chain_id(&self) -> Result<U256, Self::Error>;

    /// Gas tank balance the network holds for `sponsor`.
    async fn balance(&self, sponsor: Address) -> Result<U256, Self::Error>;

    async fn estimate_gas(&self, to: Address, data: &Bytes) -> Result<U256, Self::Error>;

    async fn send_transaction(
        &self,
        transaction: &RelayTransaction,
        signature: &Signature,
    ) -> Result<(), Self::Error>;
}

// Implementation using the ITX JSON-RPC methods.

#[derive(Debug, thiserror::Error)]
pub enum ItxError {
    #[error("provider error: {0}")]
    Provider(ProviderError),

    #[error("could not parse balance `{0}`")]
    Balance(String),
}

#[derive(Debug)]
pub struct ItxRelay<P: JsonRpcClient> {
    provider: Provider<P>,
}

impl<P: JsonRpcClient> ItxRelay<P> {
    pub fn new(provider: Provider<P>) -> ItxRelay<P> {
        ItxRelay { provider }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum ItxBalance {
    Object { balance: String },
    Plain(String),
}

#[derive(Debug, Serialize)]
struct CallRequest<'a> {
    to: Address,
    data: &'a Bytes,
}

#[async_trait]
impl<P: JsonRpcClient> RelayNetwork for ItxRelay<P> {
    type Error = ItxError;

    async fn chain_id(&self) -> Result<U256, Self::Error> {
        self.provider
            .request("eth_chainId", ())
            .await
            .map_err(ItxError::Provider)
    }

    #[tracing::instrument(level = "trace", skip_all)]
    async fn balance(&self, sponsor: Address) -> Result<U256, Self::Error> {
        let response: ItxBalance = self
            .provider
            .request("relay_getBalance", [sponsor])
            .await
            .map_err(ItxError::Provider)?;
        let balance = match response {
            ItxBalance::Object { balance } => balance,
            ItxBalance::Plain(balance) => balance,
        };
        parse_quantity(&balance).ok_or(ItxError::Balance(balance))
    }

    #[tracing::instrument(level = "trace", skip_all)]
    async fn estimate_gas(&self, to: Address, data: &Bytes) -> Result<U256, Self::Error> {
        self.provider
            .request("eth_estimateGas", [CallRequest { to, data }])
            .await
            .map_err(ItxError::Provider)
    }

    #[tracing::instrument(level = "trace", skip_all)]
    async fn send_transaction(
        &self,
        transaction: &RelayTransaction,
        signature: &Signature,
    ) -> Result<(), Self::Error> {
        let signature = Bytes::from(signature.to_vec());
        let response: serde_json::Value = self
            .provider
            .request(
                "relay_sendTransaction",
                (transaction.clone(), signature),
            )
            .await
            .map_err(ItxError::Provider)?;
        trace!("relay_sendTransaction response: {}", response);
        Ok(())
    }
}

fn parse_quantity(s: &str) -> Option<U256> {
    match s.strip_prefix("0x") {
        Some(hex) => U256::from_str_radix(hex, 16).ok(),
        None => U256::from_dec_str(s).ok(),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RelayError<R: RelayNetwork, S: Signer> {
    #[error("relay network: {0}")]
    Network(R::Error),

    #[error("signer: {0}")]
    Signer(S::Error),

    #[error("safe service: {0}")]
    SafeService(Box<dyn std::error::Error + Send + Sync>),

    #[error(transparent)]
    Validation(Error),
}

/// Submits calls through the tank at `tank`, sponsored by `signer`.
#[derive(Debug)]
pub struct Relayer<R: RelayNetwork, S: Signer> {
    network: R,
    signer: S,
    tank: Address,
}

impl<R: RelayNetwork, S: Signer> Relayer<R, S>
where
    R: Send + Sync,
{
    pub fn new(network: R, signer: S, tank: Address) -> Relayer<R, S> {
        Relayer {
            network,
            signer,
            tank,
        }
    }

    pub fn network(&self) -> &R {
        &self.network
    }

    /// Relays `data` to `target` through the tank and returns the relay hash.
    #[tracing::instrument(level = "trace", skip_all)]
    pub async fn relay(&self, target: Address, data: Bytes) -> Result<H256, RelayError<R, S>> {
        trace!("Relaying call to {:?} with data {:?}.", target, data);

        let sponsor = self.signer.address();
        let balance = self.balance().await?;
        info!("The relay balance for {:?} is {}.", sponsor, balance);

        let relay_data = encode_execute(target, &data);
        let estimate = self
            .network
            .estimate_gas(self.tank, &relay_data)
            .await
            .map_err(RelayError::Network)?;
        trace!("Estimated gas limit: {}.", estimate);

        let transaction = RelayTransaction {
            to: self.tank,
            data: relay_data,
            gas: padded_gas(estimate),
        };
        let chain_id = self.network.chain_id().await.map_err(RelayError::Network)?;
        let hash = transaction.hash(chain_id);

        let signature = self
            .signer
            .sign_message(hash.as_bytes())
            .await
            .map_err(RelayError::Signer)?;
        self.network
            .send_transaction(&transaction, &signature)
            .await
            .map_err(RelayError::Network)?;
        info!("Relayed transaction with relay hash {:?}.", hash);

        let balance = self.balance().await?;
        info!("The new relay balance for {:?} is {}.", sponsor, balance);

        Ok(hash)
    }

    /// Fetches a confirmed multisig transaction and relays its execution.
    #[tracing::instrument(level = "trace", skip_all)]
    pub async fn relay_safe_transaction<SS>(
        &self,
        service: &SS,
        safe_tx_hash: H256,
    ) -> Result<H256, RelayError<R, S>>
    where
        SS: SafeService + Sync,
        SS::Error: 'static,
    {
        let transaction = service
            .transaction(safe_tx_hash)
            .await
            .map_err(|err| RelayError::SafeService(Box::new(err)))?;
        let call = transaction.encode().map_err(RelayError::Validation)?;
        self.relay(call.to, call.data).await
    }

    pub async fn balance(&self) -> Result<U256, RelayError<R, S>> {
        self.network
            .balance(self.signer.address())
            .await
            .map_err(RelayError::Network)
    }
}

/// Gas limit sent to the network: 1.5 times the estimate.
pub fn padded_gas(estimate: U256) -> U256 {
    estimate.saturating_mul(3.into()) / 2
}

/// Value-bearing transaction that tops up the relay balance of `beneficiary`
/// (or of `from` when there is none) at the deposit contract `itx`.
pub fn deposit_transaction(
    from: Address,
    itx: Address,
    beneficiary: Option<Address>,
    amount: U256,
) -> TransactionRequest {
    let request = TransactionRequest::new().from(from).to(itx).value(amount);
    match beneficiary {
        Some(beneficiary) => {
            let mut data = Method::DepositFor.selector().as_bytes().to_vec();
            data.extend(abi::encode(&[Token::Address(beneficiary)]));
            request.data(data)
        }
        None => request,
    }
}

#[tracing::instrument(level = "trace", skip_all)]
pub async fn deposit_to_itx<M: Middleware>(
    middleware: &M,
    from: Address,
    itx: Address,
    beneficiary: Option<Address>,
    amount: U256,
) -> Result<TxHash, M::Error> {
    let transaction = deposit_transaction(from, itx, beneficiary, amount);
    let pending = middleware.send_transaction(transaction, None).await?;
    let hash = *pending;
    info!("Deposited {} into the relay network: {:?}.", amount, hash);
    Ok(hash)
}
