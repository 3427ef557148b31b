use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use alloy::primitives::{Address, Bytes, TxHash, U256};
use payout::{
    ChainClient, ChainError, ContractTarget, DispatchConfig, Dispatcher, FailureKind, Method,
    Outcome, PayoutError, ReadCall, ReadValue, Receipt, SignedTransaction, SigningIdentity,
    TransactionParams, TxStatus, UnsignedTransaction, WithdrawalRequest,
};

const DESTINATION: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";
const OPERATOR_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

#[derive(Debug, Clone, Copy)]
enum Behavior {
    Succeed,
    Revert,
    BroadcastError(&'static str),
    /// Receipt wait times out; the follow-up status query returns this.
    Timeout(TxStatus),
}

/// Recording chain double. Every trait call bumps `calls`; broadcasts
/// consume a nonce like a real node would. With `yielding` set, reads hand
/// control back to the runtime so concurrent dispatches can interleave.
struct MockChain {
    calls: AtomicUsize,
    connected: bool,
    yielding: bool,
    gas_price_fails: bool,
    gas_balance: U256,
    token_balance: U256,
    decimals: U256,
    metadata_fails: HashSet<Address>,
    behaviors: HashMap<(Address, Method), Behavior>,
    nonce: Mutex<u64>,
    nonce_reads: AtomicUsize,
    built: Mutex<Vec<TransactionParams>>,
    hashes: Mutex<HashMap<TxHash, (Address, Method)>>,
    broadcasts: Mutex<Vec<(Address, Method)>>,
    events: Mutex<Vec<&'static str>>,
}

impl MockChain {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            connected: true,
            yielding: false,
            gas_price_fails: false,
            gas_balance: U256::from(10u64).pow(U256::from(18u64)),
            token_balance: U256::MAX,
            decimals: U256::from(6u64),
            metadata_fails: HashSet::new(),
            behaviors: HashMap::new(),
            nonce: Mutex::new(0),
            nonce_reads: AtomicUsize::new(0),
            built: Mutex::new(Vec::new()),
            hashes: Mutex::new(HashMap::new()),
            broadcasts: Mutex::new(Vec::new()),
            events: Mutex::new(Vec::new()),
        }
    }

    async fn pause(&self) {
        if self.yielding {
            tokio::task::yield_now().await;
        }
    }

    fn event(&self, name: &'static str) {
        self.events.lock().unwrap().push(name);
    }

    fn with(mut self, contract: &ContractTarget, method: Method, behavior: Behavior) -> Self {
        self.behaviors.insert((contract.address, method), behavior);
        self
    }

    fn behavior(&self, key: (Address, Method)) -> Behavior {
        self.behaviors.get(&key).copied().unwrap_or(Behavior::Revert)
    }

    fn key_for(&self, hash: TxHash) -> (Address, Method) {
        self.hashes.lock().unwrap()[&hash]
    }

    fn tick(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn broadcasts(&self) -> Vec<(Address, Method)> {
        self.broadcasts.lock().unwrap().clone()
    }

    fn built(&self) -> Vec<TransactionParams> {
        self.built.lock().unwrap().clone()
    }

    fn receipt(&self, status: bool) -> Receipt {
        Receipt {
            status,
            block_number: 4_242,
            gas_used: 50_000,
            effective_gas_price: 1_200,
        }
    }
}

impl ChainClient for MockChain {
    async fn is_connected(&self) -> bool {
        self.tick();
        self.connected
    }

    async fn gas_price(&self) -> Result<u128, ChainError> {
        self.tick();
        if self.gas_price_fails {
            return Err(ChainError::Rpc("header not found".to_string()));
        }
        Ok(1_000)
    }

    async fn next_nonce(&self, _address: Address) -> Result<u64, ChainError> {
        self.tick();
        self.nonce_reads.fetch_add(1, Ordering::SeqCst);
        let nonce = *self.nonce.lock().unwrap();
        self.pause().await;
        Ok(nonce)
    }

    async fn chain_id(&self) -> Result<u64, ChainError> {
        self.tick();
        self.pause().await;
        Ok(11_155_111)
    }

    async fn call(&self, contract: Address, call: ReadCall) -> Result<ReadValue, ChainError> {
        self.tick();
        match call {
            ReadCall::BalanceOf(_) => Ok(ReadValue::Number(self.token_balance)),
            _ if self.metadata_fails.contains(&contract) => {
                Err(ChainError::Rpc("execution reverted".to_string()))
            }
            ReadCall::Symbol => Ok(ReadValue::Text("RWD".to_string())),
            ReadCall::Decimals => Ok(ReadValue::Number(self.decimals)),
        }
    }

    fn build_transaction(
        &self,
        params: &TransactionParams,
    ) -> Result<UnsignedTransaction, ChainError> {
        self.tick();
        self.event("build");
        self.built.lock().unwrap().push(params.clone());
        Ok(UnsignedTransaction {
            from: params.from,
            to: params.contract,
            input: Bytes::from(vec![params.method as u8]),
            nonce: params.nonce,
            gas_limit: params.gas_limit,
            gas_price: params.gas_price,
            chain_id: params.chain_id,
        })
    }

    fn sign(
        &self,
        tx: &UnsignedTransaction,
        _identity: &SigningIdentity,
    ) -> Result<SignedTransaction, ChainError> {
        self.tick();
        let method = if tx.input[0] == Method::Mint as u8 {
            Method::Mint
        } else {
            Method::Transfer
        };
        let mut hashes = self.hashes.lock().unwrap();
        let hash = TxHash::with_last_byte(hashes.len() as u8 + 1);
        hashes.insert(hash, (tx.to, method));
        Ok(SignedTransaction {
            hash,
            raw: tx.input.clone(),
        })
    }

    async fn broadcast(&self, tx: &SignedTransaction) -> Result<TxHash, ChainError> {
        self.tick();
        let key = self.key_for(tx.hash);
        if let Behavior::BroadcastError(msg) = self.behavior(key) {
            return Err(ChainError::Rpc(msg.to_string()));
        }
        *self.nonce.lock().unwrap() += 1;
        self.broadcasts.lock().unwrap().push(key);
        self.event("broadcast");
        Ok(tx.hash)
    }

    async fn wait_for_receipt(
        &self,
        tx_hash: TxHash,
        timeout: Duration,
    ) -> Result<Receipt, ChainError> {
        self.tick();
        self.pause().await;
        self.event("receipt");
        match self.behavior(self.key_for(tx_hash)) {
            Behavior::Succeed => Ok(self.receipt(true)),
            Behavior::Timeout(_) => Err(ChainError::ConfirmationTimeout {
                tx_hash,
                waited: timeout,
            }),
            Behavior::Revert | Behavior::BroadcastError(_) => Ok(self.receipt(false)),
        }
    }

    async fn transaction_status(&self, tx_hash: TxHash) -> Result<TxStatus, ChainError> {
        self.tick();
        match self.behavior(self.key_for(tx_hash)) {
            Behavior::Timeout(status) => Ok(status),
            Behavior::Succeed => Ok(TxStatus::Mined(self.receipt(true))),
            _ => Ok(TxStatus::Mined(self.receipt(false))),
        }
    }

    async fn balance(&self, _address: Address) -> Result<U256, ChainError> {
        self.tick();
        Ok(self.gas_balance)
    }
}

fn contracts() -> Vec<ContractTarget> {
    vec![
        ContractTarget::new(1, "Alpha", Address::repeat_byte(0xaa)),
        ContractTarget::new(2, "Beta", Address::repeat_byte(0xbb)),
        ContractTarget::new(3, "Gamma", Address::repeat_byte(0xcc)),
    ]
}

fn identity() -> SigningIdentity {
    SigningIdentity::from_private_key(OPERATOR_KEY).unwrap()
}

fn request(amount: &str) -> WithdrawalRequest {
    WithdrawalRequest::new(DESTINATION, amount)
}

#[tokio::test]
async fn first_attempt_success_returns_first_contract() {
    let targets = contracts();
    let chain = MockChain::new().with(&targets[0], Method::Mint, Behavior::Succeed);

    let result = Dispatcher::default()
        .dispatch(&request("10"), Some(&identity()), &targets, &chain)
        .await
        .unwrap();

    assert_eq!(result.contract, targets[0]);
    assert_eq!(result.method, Method::Mint);
    assert_eq!(result.attempts.len(), 1);
    assert_eq!(result.block_number, 4_242);
    assert_eq!(result.symbol, "RWD");
    assert_eq!(result.amount_units, U256::from(10_000_000u64));
    assert_eq!(chain.broadcasts().len(), 1);
}

#[tokio::test]
async fn preferred_contract_is_attempted_first() {
    let targets = contracts();
    let chain = MockChain::new().with(&targets[1], Method::Mint, Behavior::Succeed);
    let preferred = format!("{:#x}", targets[1].address).to_uppercase().replace("0X", "0x");

    let result = Dispatcher::default()
        .dispatch(
            &request("1").with_preferred_contract(preferred),
            Some(&identity()),
            &targets,
            &chain,
        )
        .await
        .unwrap();

    assert_eq!(result.contract, targets[1]);
    assert_eq!(result.attempts.len(), 1);
    assert_eq!(chain.built()[0].contract, targets[1].address);
}

#[tokio::test]
async fn preferred_contract_still_falls_back_to_the_rest() {
    let targets = contracts();
    let chain = MockChain::new().with(&targets[0], Method::Transfer, Behavior::Succeed);

    let result = Dispatcher::default()
        .dispatch(
            &request("1").with_preferred_contract(format!("{}", targets[2].address)),
            Some(&identity()),
            &targets,
            &chain,
        )
        .await
        .unwrap();

    let order: Vec<(Address, Method)> = chain.broadcasts();
    assert_eq!(
        order,
        vec![
            (targets[2].address, Method::Mint),
            (targets[2].address, Method::Transfer),
            (targets[0].address, Method::Mint),
            (targets[0].address, Method::Transfer),
        ]
    );
    assert_eq!(result.contract, targets[0]);
    assert_eq!(result.method, Method::Transfer);
}

#[tokio::test]
async fn every_failure_exhausts_after_two_attempts_per_contract() {
    let targets = contracts();
    let chain = MockChain::new();

    let err = Dispatcher::default()
        .dispatch(&request("5"), Some(&identity()), &targets, &chain)
        .await
        .unwrap_err();

    match err {
        PayoutError::AllAttemptsExhausted {
            attempts,
            failures,
            outcomes,
        } => {
            assert_eq!(attempts, 2 * targets.len());
            assert_eq!(outcomes.len(), attempts);
            assert!(outcomes.iter().all(|o| !o.is_success()));
            assert_eq!(failures.len(), targets.len());
            for (failure, target) in failures.iter().zip(&targets) {
                assert_eq!(&failure.contract, target);
                assert_eq!(failure.method, Method::Transfer);
                assert_eq!(failure.kind, FailureKind::Reverted);
            }
        }
        other => panic!("expected AllAttemptsExhausted, got {other:?}"),
    }
    assert_eq!(chain.broadcasts().len(), 6);
}

#[tokio::test]
async fn mint_succeeds_on_third_contract_after_five_attempts() {
    let targets = contracts();
    let chain = MockChain::new().with(&targets[2], Method::Mint, Behavior::Succeed);

    let result = Dispatcher::default()
        .dispatch(&request("3"), Some(&identity()), &targets, &chain)
        .await
        .unwrap();

    assert_eq!(result.method, Method::Mint);
    assert_eq!(result.contract, targets[2]);
    assert_eq!(result.attempts.len(), 5);
    let sequence: Vec<(u32, Method)> = result
        .attempts
        .iter()
        .map(|a| (a.contract.id, a.method))
        .collect();
    assert_eq!(
        sequence,
        vec![
            (1, Method::Mint),
            (1, Method::Transfer),
            (2, Method::Mint),
            (2, Method::Transfer),
            (3, Method::Mint),
        ]
    );
    assert!(result.attempts.last().unwrap().is_success());
}

#[tokio::test]
async fn invalid_amounts_never_touch_the_chain() {
    let targets = contracts();
    for amount in [
        "0",
        "0.0",
        "-1",
        "1000000000.1",
        "abc",
        "",
        "1e-9223372036854775808",
    ] {
        let chain = MockChain::new();
        let err = Dispatcher::default()
            .dispatch(&request(amount), Some(&identity()), &targets, &chain)
            .await
            .unwrap_err();
        assert!(
            matches!(err, PayoutError::InvalidAmount(_)),
            "amount {amount:?} gave {err:?}"
        );
        assert_eq!(chain.call_count(), 0, "amount {amount:?} touched the chain");
    }
}

#[tokio::test]
async fn custom_ceiling_is_enforced() {
    let targets = contracts();
    let chain = MockChain::new();
    let dispatcher = Dispatcher::new(DispatchConfig {
        max_amount: U256::from(100u64),
        ..DispatchConfig::default()
    });

    let err = dispatcher
        .dispatch(&request("100.01"), Some(&identity()), &targets, &chain)
        .await
        .unwrap_err();
    assert!(matches!(err, PayoutError::InvalidAmount(_)));
    assert_eq!(chain.call_count(), 0);
}

#[tokio::test]
async fn invalid_destination_never_touches_the_chain() {
    let targets = contracts();
    for destination in [
        "0x1234",
        "not-an-address",
        // checksum broken by lower-casing one letter
        "0x70997970c51812dc3A010C7d01b50e0d17dc79C8",
    ] {
        let chain = MockChain::new();
        let err = Dispatcher::default()
            .dispatch(
                &WithdrawalRequest::new(destination, "1"),
                Some(&identity()),
                &targets,
                &chain,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PayoutError::InvalidAddress(_)));
        assert_eq!(chain.call_count(), 0);
    }
}

#[tokio::test]
async fn missing_identity_is_not_ready() {
    let targets = contracts();
    let chain = MockChain::new();
    let err = Dispatcher::default()
        .dispatch(&request("1"), None, &targets, &chain)
        .await
        .unwrap_err();
    assert!(matches!(err, PayoutError::NotReady(_)));
    assert_eq!(chain.call_count(), 0);
}

#[tokio::test]
async fn disconnected_chain_is_not_ready() {
    let targets = contracts();
    let mut chain = MockChain::new();
    chain.connected = false;
    let err = Dispatcher::default()
        .dispatch(&request("1"), Some(&identity()), &targets, &chain)
        .await
        .unwrap_err();
    assert!(matches!(err, PayoutError::NotReady(_)));
    assert!(chain.built().is_empty());
}

#[tokio::test]
async fn low_gas_balance_short_circuits() {
    let targets = contracts();
    let mut chain = MockChain::new();
    chain.gas_balance = U256::from(1_000u64);
    let err = Dispatcher::default()
        .dispatch(&request("1"), Some(&identity()), &targets, &chain)
        .await
        .unwrap_err();
    match err {
        PayoutError::InsufficientGas { balance, required } => {
            assert_eq!(balance, U256::from(1_000u64));
            assert_eq!(required, DispatchConfig::default().min_gas_balance);
        }
        other => panic!("expected InsufficientGas, got {other:?}"),
    }
    assert!(chain.built().is_empty());
}

#[tokio::test]
async fn pending_after_timeout_stops_without_fallback() {
    let targets = contracts();
    let chain = MockChain::new().with(&targets[0], Method::Mint, Behavior::Timeout(TxStatus::Pending));

    let err = Dispatcher::default()
        .dispatch(&request("1"), Some(&identity()), &targets, &chain)
        .await
        .unwrap_err();

    match err {
        PayoutError::DeliveryUnconfirmed {
            contract, method, ..
        } => {
            assert_eq!(contract, "Alpha");
            assert_eq!(method, Method::Mint);
        }
        other => panic!("expected DeliveryUnconfirmed, got {other:?}"),
    }
    assert_eq!(chain.broadcasts().len(), 1);
}

#[tokio::test]
async fn mined_after_timeout_counts_as_delivered() {
    let targets = contracts();
    let mined = Receipt {
        status: true,
        block_number: 77,
        gas_used: 40_000,
        effective_gas_price: 0,
    };
    let chain = MockChain::new().with(
        &targets[0],
        Method::Mint,
        Behavior::Timeout(TxStatus::Mined(mined)),
    );

    let result = Dispatcher::default()
        .dispatch(&request("1"), Some(&identity()), &targets, &chain)
        .await
        .unwrap();

    assert_eq!(result.method, Method::Mint);
    assert_eq!(result.block_number, 77);
    // No effective price in the receipt: cost falls back to the buffered bid (1000 * 1.2).
    assert_eq!(result.gas_cost_wei, U256::from(40_000u64 * 1_200));
    assert_eq!(chain.broadcasts().len(), 1);
}

#[tokio::test]
async fn dropped_after_timeout_falls_back_to_transfer() {
    let targets = contracts();
    let chain = MockChain::new()
        .with(&targets[0], Method::Mint, Behavior::Timeout(TxStatus::Unknown))
        .with(&targets[0], Method::Transfer, Behavior::Succeed);

    let result = Dispatcher::default()
        .dispatch(&request("1"), Some(&identity()), &targets, &chain)
        .await
        .unwrap();

    assert_eq!(result.method, Method::Transfer);
    match &result.attempts[0].outcome {
        Outcome::Failure(f) => assert_eq!(f.kind, FailureKind::Timeout),
        other => panic!("expected timeout failure, got {other:?}"),
    }
}

#[tokio::test]
async fn fresh_nonce_for_every_submission() {
    let targets = contracts();
    let chain = MockChain::new().with(&targets[0], Method::Transfer, Behavior::Succeed);

    Dispatcher::default()
        .dispatch(&request("1"), Some(&identity()), &targets, &chain)
        .await
        .unwrap();

    let nonces: Vec<u64> = chain.built().iter().map(|p| p.nonce).collect();
    assert_eq!(nonces, vec![0, 1]);
    assert_eq!(chain.nonce_reads.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn transaction_parameters_follow_config() {
    let targets = contracts();
    let chain = MockChain::new().with(&targets[0], Method::Transfer, Behavior::Succeed);
    let operator = identity();

    Dispatcher::default()
        .dispatch(&request("2.5"), Some(&operator), &targets, &chain)
        .await
        .unwrap();

    let built = chain.built();
    assert_eq!(built[0].method, Method::Mint);
    assert_eq!(built[0].gas_limit, 200_000);
    assert_eq!(built[1].method, Method::Transfer);
    assert_eq!(built[1].gas_limit, 100_000);
    for params in &built {
        assert_eq!(params.gas_price, 1_200);
        assert_eq!(params.chain_id, 11_155_111);
        assert_eq!(params.from, operator.address());
        assert_eq!(params.recipient, DESTINATION.parse::<Address>().unwrap());
        assert_eq!(params.amount, U256::from(2_500_000u64));
    }
}

#[tokio::test]
async fn metadata_failure_defaults_to_eighteen_decimals() {
    let targets = contracts();
    let mut chain = MockChain::new().with(&targets[0], Method::Mint, Behavior::Succeed);
    chain.metadata_fails.insert(targets[0].address);

    let result = Dispatcher::default()
        .dispatch(&request("1.5"), Some(&identity()), &targets, &chain)
        .await
        .unwrap();

    assert_eq!(result.symbol, "TOKEN");
    assert_eq!(
        result.amount_units,
        U256::from(1_500_000_000_000_000_000u128)
    );
}

#[tokio::test]
async fn oversized_decimals_fall_back_to_defaults() {
    let targets = contracts();
    let mut chain = MockChain::new().with(&targets[0], Method::Mint, Behavior::Succeed);
    chain.decimals = U256::from(300u64);

    let result = Dispatcher::default()
        .dispatch(&request("1.5"), Some(&identity()), &targets, &chain)
        .await
        .unwrap();

    assert_eq!(result.symbol, "TOKEN");
    assert_eq!(
        result.amount_units,
        U256::from(1_500_000_000_000_000_000u128)
    );
}

#[tokio::test]
async fn gas_price_failure_exhausts_every_contract_without_building() {
    let targets = contracts();
    let mut chain = MockChain::new();
    chain.gas_price_fails = true;

    let err = Dispatcher::default()
        .dispatch(&request("1"), Some(&identity()), &targets, &chain)
        .await
        .unwrap_err();

    match err {
        PayoutError::AllAttemptsExhausted {
            attempts,
            failures,
            outcomes,
        } => {
            assert_eq!(attempts, 2 * targets.len());
            assert_eq!(failures.len(), targets.len());
            assert!(outcomes
                .iter()
                .all(|o| o.failure().map(|f| f.kind) == Some(FailureKind::Rpc)));
            let sequence: Vec<(u32, Method)> =
                outcomes.iter().map(|o| (o.contract.id, o.method)).collect();
            assert_eq!(
                sequence,
                vec![
                    (1, Method::Mint),
                    (1, Method::Transfer),
                    (2, Method::Mint),
                    (2, Method::Transfer),
                    (3, Method::Mint),
                    (3, Method::Transfer),
                ]
            );
        }
        other => panic!("expected AllAttemptsExhausted, got {other:?}"),
    }
    assert!(chain.built().is_empty());
    assert!(chain.broadcasts().is_empty());
}

#[tokio::test]
async fn concurrent_dispatches_for_one_identity_are_serialized() {
    let targets = contracts();
    let mut chain = MockChain::new().with(&targets[0], Method::Mint, Behavior::Succeed);
    chain.yielding = true;
    let dispatcher = Dispatcher::default();
    let operator = identity();
    let first = request("1");
    let second = request("2");

    let (a, b) = tokio::join!(
        dispatcher.dispatch(&first, Some(&operator), &targets, &chain),
        dispatcher.dispatch(&second, Some(&operator), &targets, &chain),
    );
    let (a, b) = (a.unwrap(), b.unwrap());
    assert_ne!(a.tx_hash, b.tx_hash);

    let mut nonces: Vec<u64> = chain.built().iter().map(|p| p.nonce).collect();
    nonces.sort_unstable();
    assert_eq!(nonces, vec![0, 1]);

    // Each dispatch finishes its confirmation before the other builds.
    assert_eq!(
        *chain.events.lock().unwrap(),
        vec!["build", "broadcast", "receipt", "build", "broadcast", "receipt"]
    );
}

#[tokio::test]
async fn transfer_skipped_when_operator_lacks_tokens() {
    let targets = vec![contracts().remove(0)];
    let mut chain = MockChain::new();
    chain.token_balance = U256::ZERO;

    let err = Dispatcher::default()
        .dispatch(&request("1"), Some(&identity()), &targets, &chain)
        .await
        .unwrap_err();

    match err {
        PayoutError::AllAttemptsExhausted {
            attempts,
            failures,
            ..
        } => {
            assert_eq!(attempts, 2);
            assert_eq!(failures[0].kind, FailureKind::InsufficientTokenBalance);
        }
        other => panic!("expected AllAttemptsExhausted, got {other:?}"),
    }
    // Only the mint reached the chain.
    assert_eq!(chain.broadcasts(), vec![(targets[0].address, Method::Mint)]);
}

#[tokio::test]
async fn broadcast_errors_are_classified() {
    let targets = vec![contracts().remove(0)];
    let chain = MockChain::new()
        .with(
            &targets[0],
            Method::Mint,
            Behavior::BroadcastError("insufficient funds for gas * price + value"),
        )
        .with(
            &targets[0],
            Method::Transfer,
            Behavior::BroadcastError("nonce too low"),
        );

    let err = Dispatcher::default()
        .dispatch(&request("1"), Some(&identity()), &targets, &chain)
        .await
        .unwrap_err();

    match err {
        PayoutError::AllAttemptsExhausted {
            attempts,
            failures,
            outcomes,
        } => {
            assert_eq!(attempts, 2);
            assert_eq!(failures[0].kind, FailureKind::Nonce);
            assert_eq!(
                outcomes[0].failure().map(|f| f.kind),
                Some(FailureKind::InsufficientFunds)
            );
        }
        other => panic!("expected AllAttemptsExhausted, got {other:?}"),
    }
    assert!(chain.broadcasts().is_empty());
}

#[tokio::test]
async fn dust_amount_exhausts_contract_without_broadcast() {
    let targets = vec![contracts().remove(0)];
    let chain = MockChain::new();

    let err = Dispatcher::default()
        .dispatch(&request("0.0000001"), Some(&identity()), &targets, &chain)
        .await
        .unwrap_err();

    match err {
        PayoutError::AllAttemptsExhausted {
            attempts,
            failures,
            ..
        } => {
            assert_eq!(attempts, 2);
            assert_eq!(failures[0].kind, FailureKind::Unavailable);
        }
        other => panic!("expected AllAttemptsExhausted, got {other:?}"),
    }
    assert!(chain.built().is_empty());
}

#[tokio::test]
async fn gas_cost_uses_effective_price() {
    let targets = contracts();
    let chain = MockChain::new().with(&targets[0], Method::Mint, Behavior::Succeed);

    let result = Dispatcher::default()
        .dispatch(&request("1"), Some(&identity()), &targets, &chain)
        .await
        .unwrap();

    assert_eq!(result.gas_used, 50_000);
    assert_eq!(result.gas_cost_wei, U256::from(60_000_000u64));
    assert!(result.gas_cost_eth.starts_with("0.00000000006"));
}
