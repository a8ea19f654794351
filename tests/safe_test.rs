use ethers::signers::LocalWallet;
use ethers::types::{Address, Bytes, H256, U256};
use serial_test::serial;

use gas_tank::relay::encode_execute;
use gas_tank::safe::SafeConfirmation;
use gas_tank::{Error, RelayError, Relayer, SafeTransaction};

use utilities::{
    address, assert_err, assert_ok,
    mocks::{MockRelayNetwork, MockSafeService},
    ACCOUNT1, ACCOUNT2,
};

type MockRelayError = RelayError<MockRelayNetwork, LocalWallet>;

fn safe_transaction(signers: &[(Address, u8)]) -> SafeTransaction {
    SafeTransaction {
        safe: address(50),
        to: address(51),
        value: U256::exp10(17),
        data: None,
        operation: 0,
        gas_token: Address::zero(),
        safe_tx_gas: 0,
        base_gas: 0,
        gas_price: U256::zero(),
        refund_receiver: Address::zero(),
        nonce: 3,
        confirmations_required: 2,
        confirmations: signers
            .iter()
            .map(|(owner, byte)| SafeConfirmation {
                owner: *owner,
                signature: Bytes::from(vec![*byte; 65]),
            })
            .collect(),
    }
}

#[tokio::test]
#[serial]
async fn test_relay_safe_transaction() {
    utilities::setup_tracing();

    // ACCOUNT2 sorts after ACCOUNT1, so its signature goes last.
    let transaction =
        safe_transaction(&[(ACCOUNT2.address(), 0xbb), (ACCOUNT1.address(), 0xaa)]);
    let service = MockSafeService::new(Some(transaction.clone()));
    let relayer = Relayer::new(MockRelayNetwork::new(), ACCOUNT1.wallet(), address(100));

    let result = relayer
        .relay_safe_transaction(&service, H256::from_low_u64_be(1))
        .await;
    assert_ok!(result);

    let sent = relayer.network().sent();
    assert_eq!(sent.len(), 1);
    let call = transaction.encode().unwrap();
    assert_eq!(sent[0].0.data, encode_execute(transaction.safe, &call.data));

    let sent_data = hex::encode(&sent[0].0.data);
    let blob = format!("{}{}", "aa".repeat(65), "bb".repeat(65));
    assert!(sent_data.contains(&blob));
}

#[tokio::test]
#[serial]
async fn test_relay_safe_transaction_errors() {
    utilities::setup_tracing();
    let hash = H256::from_low_u64_be(1);

    // Not enough confirmations: nothing reaches the network.
    {
        let transaction = safe_transaction(&[(ACCOUNT1.address(), 0xaa)]);
        let service = MockSafeService::new(Some(transaction));
        let relayer = Relayer::new(MockRelayNetwork::new(), ACCOUNT1.wallet(), address(100));

        let result = relayer.relay_safe_transaction(&service, hash).await;
        let expected_err: MockRelayError = RelayError::Validation(Error::InsufficientConfirmations {
            required: 2,
            provided: 1,
        });
        assert_err!(result, expected_err);

        let global = MockRelayNetwork::global();
        assert_eq!(global.balance_n, 0);
        assert_eq!(global.estimate_gas_n, 0);
        assert_eq!(global.send_transaction_n, 0);
    }

    // Unknown transaction.
    {
        let service = MockSafeService::new(None);
        let relayer = Relayer::new(MockRelayNetwork::new(), ACCOUNT1.wallet(), address(100));

        let result = relayer.relay_safe_transaction(&service, hash).await;
        assert_err!(
            result,
            format!(
                "safe service: safe service mock error: transaction {:?} not found",
                hash
            )
        );
        assert!(relayer.network().sent().is_empty());
    }
}
