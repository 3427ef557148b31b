use std::sync::Arc;

use alloy::primitives::utils::format_ether;
use alloy::primitives::{Address, TxHash, U256};
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::amount::TokenAmount;
use crate::attempt::{AttemptFailure, AttemptOutcome, FailureKind, Method, Outcome};
use crate::chain::{ChainClient, ChainError, ReadCall, ReadValue, Receipt, TransactionParams, TxStatus};
use crate::constants::{DispatchConfig, DEFAULT_TOKEN_DECIMALS, DEFAULT_TOKEN_SYMBOL};
use crate::contract::{attempt_order, ContractTarget};
use crate::error::{ContractFailure, PayoutError};
use crate::identity::SigningIdentity;
use crate::request::{ValidatedRequest, WithdrawalRequest};

/// A confirmed delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchResult {
    pub contract: ContractTarget,
    pub method: Method,
    pub tx_hash: TxHash,
    pub block_number: u64,
    pub gas_used: u64,
    pub gas_cost_wei: U256,
    pub gas_cost_eth: String,
    pub symbol: String,
    pub amount: TokenAmount,
    pub amount_units: U256,
    /// Every attempt made, in order; the last one is the success.
    pub attempts: Vec<AttemptOutcome>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct TokenMetadata {
    symbol: String,
    decimals: u8,
}

impl Default for TokenMetadata {
    fn default() -> Self {
        Self {
            symbol: DEFAULT_TOKEN_SYMBOL.to_string(),
            decimals: DEFAULT_TOKEN_DECIMALS,
        }
    }
}

/// How one (contract, method) attempt ended.
enum Step {
    Delivered { tx_hash: TxHash, receipt: Receipt },
    Failed(AttemptFailure),
    /// Broadcast, but neither confirmed nor provably absent.
    Unconfirmed(TxHash),
}

/// Per-contract inputs shared by both methods.
struct ContractPlan<'a> {
    contract: &'a ContractTarget,
    metadata: TokenMetadata,
    amount_units: U256,
    gas_price: u128,
}

/// Delivers withdrawals by walking contracts and methods until one confirms.
pub struct Dispatcher {
    config: DispatchConfig,
    /// One dispatch in flight per signing identity, so attempts never race on a nonce.
    identity_locks: DashMap<Address, Arc<Mutex<()>>>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(DispatchConfig::default())
    }
}

impl Dispatcher {
    pub fn new(config: DispatchConfig) -> Self {
        Self {
            config,
            identity_locks: DashMap::new(),
        }
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    fn identity_lock(&self, address: Address) -> Arc<Mutex<()>> {
        self.identity_locks
            .entry(address)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Deliver `request.amount` tokens to `request.destination`.
    ///
    /// Input is validated before any chain interaction. Contracts are tried in
    /// priority order (the preferred one first), `mint` before `transfer`, and
    /// the first confirmed transaction wins.
    pub async fn dispatch<C: ChainClient>(
        &self,
        request: &WithdrawalRequest,
        identity: Option<&SigningIdentity>,
        contracts: &[ContractTarget],
        chain: &C,
    ) -> Result<DispatchResult, PayoutError> {
        let request = request.validate(self.config.max_amount)?;

        let identity = identity
            .ok_or_else(|| PayoutError::NotReady("signing identity not loaded".to_string()))?;
        if contracts.is_empty() {
            return Err(PayoutError::NotReady(
                "no contract targets configured".to_string(),
            ));
        }
        if !chain.is_connected().await {
            return Err(PayoutError::NotReady("chain client not connected".to_string()));
        }

        let lock = self.identity_lock(identity.address());
        let _guard = lock.lock().await;

        let chain_id = chain
            .chain_id()
            .await
            .map_err(|e| PayoutError::NotReady(format!("chain id unavailable: {e}")))?;
        self.check_gas_balance(identity, chain).await?;

        tracing::info!(
            destination = %request.destination,
            amount = %request.amount,
            contracts = contracts.len(),
            "processing withdrawal"
        );

        let mut attempts: Vec<AttemptOutcome> = Vec::new();
        let mut failures: Vec<ContractFailure> = Vec::new();

        for contract in attempt_order(contracts, request.preferred) {
            if let Some(result) = self
                .try_contract(&request, identity, contract, chain_id, chain, &mut attempts)
                .await?
            {
                return Ok(result);
            }
            if let Some(last) = attempts.last() {
                if let Some(failure) = last.failure() {
                    failures.push(ContractFailure {
                        contract: contract.clone(),
                        method: last.method,
                        kind: failure.kind,
                        reason: failure.reason.clone(),
                    });
                }
            }
        }

        tracing::error!(
            destination = %request.destination,
            attempts = attempts.len(),
            "all withdrawal attempts failed"
        );
        Err(PayoutError::AllAttemptsExhausted {
            attempts: attempts.len(),
            failures,
            outcomes: attempts,
        })
    }

    async fn check_gas_balance<C: ChainClient>(
        &self,
        identity: &SigningIdentity,
        chain: &C,
    ) -> Result<(), PayoutError> {
        let required = self.config.min_gas_balance;
        if required.is_zero() {
            return Ok(());
        }
        let balance = chain
            .balance(identity.address())
            .await
            .map_err(|e| PayoutError::NotReady(format!("gas balance unavailable: {e}")))?;
        if balance < required {
            tracing::warn!(
                operator = %identity.address(),
                balance = %format_ether(balance),
                "operator wallet needs ETH for gas"
            );
            return Err(PayoutError::InsufficientGas { balance, required });
        }
        Ok(())
    }

    /// Metadata is advisory: any read failure falls back to the defaults.
    async fn token_metadata<C: ChainClient>(&self, chain: &C, contract: Address) -> TokenMetadata {
        let symbol = chain.call(contract, ReadCall::Symbol).await;
        let decimals = chain.call(contract, ReadCall::Decimals).await;
        match (symbol, decimals) {
            (Ok(ReadValue::Text(symbol)), Ok(ReadValue::Number(decimals)))
                if decimals <= U256::from(u8::MAX) =>
            {
                TokenMetadata {
                    symbol,
                    decimals: decimals.to::<u8>(),
                }
            }
            (symbol, decimals) => {
                tracing::debug!(
                    contract = %contract,
                    symbol = ?symbol.err(),
                    decimals = ?decimals.err(),
                    "token metadata unavailable, using defaults"
                );
                TokenMetadata::default()
            }
        }
    }

    /// Try `mint` then `transfer` on one contract. `Ok(None)` means both failed.
    async fn try_contract<C: ChainClient>(
        &self,
        request: &ValidatedRequest,
        identity: &SigningIdentity,
        contract: &ContractTarget,
        chain_id: u64,
        chain: &C,
        attempts: &mut Vec<AttemptOutcome>,
    ) -> Result<Option<DispatchResult>, PayoutError> {
        let metadata = self.token_metadata(chain, contract.address).await;

        let amount_units = match request.amount.to_units(metadata.decimals) {
            Some(units) if !units.is_zero() => units,
            Some(_) => {
                exhaust(
                    attempts,
                    contract,
                    AttemptFailure::new(
                        FailureKind::Unavailable,
                        format!("amount rounds to zero at {} decimals", metadata.decimals),
                    ),
                );
                return Ok(None);
            }
            None => {
                exhaust(
                    attempts,
                    contract,
                    AttemptFailure::new(
                        FailureKind::Unavailable,
                        format!("amount overflows at {} decimals", metadata.decimals),
                    ),
                );
                return Ok(None);
            }
        };

        let gas_price = match chain.gas_price().await {
            Ok(observed) => self.config.buffered_gas_price(observed),
            Err(e) => {
                exhaust(attempts, contract, AttemptFailure::from(&e));
                return Ok(None);
            }
        };

        tracing::info!(
            contract = %contract.name,
            symbol = %metadata.symbol,
            amount_units = %amount_units,
            gas_price,
            "trying contract"
        );

        let plan = ContractPlan {
            contract,
            metadata,
            amount_units,
            gas_price,
        };

        for method in Method::ALL {
            let step = self
                .attempt(request, identity, &plan, method, chain_id, chain)
                .await;
            match step {
                Step::Delivered { tx_hash, receipt } => {
                    attempts.push(AttemptOutcome {
                        contract: contract.clone(),
                        method,
                        outcome: Outcome::Success {
                            tx_hash,
                            block_number: receipt.block_number,
                            gas_used: receipt.gas_used,
                        },
                    });
                    return Ok(Some(self.delivered(
                        request,
                        &plan,
                        method,
                        tx_hash,
                        receipt,
                        std::mem::take(attempts),
                    )));
                }
                Step::Failed(failure) => {
                    tracing::warn!(
                        contract = %contract.name,
                        method = %method,
                        kind = %failure.kind,
                        reason = %failure.reason,
                        "withdrawal attempt failed"
                    );
                    attempts.push(AttemptOutcome {
                        contract: contract.clone(),
                        method,
                        outcome: Outcome::Failure(failure),
                    });
                }
                Step::Unconfirmed(tx_hash) => {
                    tracing::error!(
                        contract = %contract.name,
                        method = %method,
                        tx = %tx_hash,
                        "transaction still unconfirmed; stopping to avoid a duplicate delivery"
                    );
                    return Err(PayoutError::DeliveryUnconfirmed {
                        contract: contract.name.clone(),
                        method,
                        tx_hash,
                    });
                }
            }
        }

        Ok(None)
    }

    async fn attempt<C: ChainClient>(
        &self,
        request: &ValidatedRequest,
        identity: &SigningIdentity,
        plan: &ContractPlan<'_>,
        method: Method,
        chain_id: u64,
        chain: &C,
    ) -> Step {
        let contract = plan.contract;

        if method == Method::Transfer && self.config.check_transfer_balance {
            if let Some(failure) = self.transfer_shortfall(identity, plan, chain).await {
                return Step::Failed(failure);
            }
        }

        // Always re-read: an earlier attempt may have consumed a nonce even if it reverted.
        let nonce = match chain.next_nonce(identity.address()).await {
            Ok(nonce) => nonce,
            Err(e) => return Step::Failed(AttemptFailure::from(&e)),
        };

        let params = TransactionParams {
            contract: contract.address,
            method,
            recipient: request.destination,
            amount: plan.amount_units,
            from: identity.address(),
            nonce,
            gas_limit: self.config.gas_limit_for(method),
            gas_price: plan.gas_price,
            chain_id,
        };

        let signed = match chain
            .build_transaction(&params)
            .and_then(|unsigned| chain.sign(&unsigned, identity))
        {
            Ok(signed) => signed,
            Err(e) => return Step::Failed(AttemptFailure::from(&e)),
        };

        let tx_hash = match chain.broadcast(&signed).await {
            Ok(hash) => hash,
            Err(e) => return Step::Failed(AttemptFailure::from(&e)),
        };
        tracing::info!(
            contract = %contract.name,
            method = %method,
            nonce,
            tx = %tx_hash,
            "transaction sent"
        );

        match chain
            .wait_for_receipt(tx_hash, self.config.confirmation_timeout)
            .await
        {
            Ok(receipt) => settle_receipt(tx_hash, receipt),
            Err(e) => self.recheck(chain, tx_hash, &e).await,
        }
    }

    /// `Some` when the operator provably lacks the tokens to transfer.
    async fn transfer_shortfall<C: ChainClient>(
        &self,
        identity: &SigningIdentity,
        plan: &ContractPlan<'_>,
        chain: &C,
    ) -> Option<AttemptFailure> {
        let read = chain
            .call(plan.contract.address, ReadCall::BalanceOf(identity.address()))
            .await;
        match read {
            Ok(ReadValue::Number(held)) if held < plan.amount_units => {
                Some(AttemptFailure::new(
                    FailureKind::InsufficientTokenBalance,
                    format!(
                        "operator holds {held} {} units, needs {}",
                        plan.metadata.symbol, plan.amount_units
                    ),
                ))
            }
            Ok(_) => None,
            Err(e) => {
                tracing::debug!(contract = %plan.contract.name, error = %e, "token balance check skipped");
                None
            }
        }
    }

    /// The receipt wait failed after broadcast. Only fall back when the
    /// transaction is known to have failed or to be gone.
    async fn recheck<C: ChainClient>(&self, chain: &C, tx_hash: TxHash, cause: &ChainError) -> Step {
        tracing::warn!(tx = %tx_hash, error = %cause, "no receipt; re-checking transaction status");
        match chain.transaction_status(tx_hash).await {
            Ok(TxStatus::Mined(receipt)) => settle_receipt(tx_hash, receipt),
            Ok(TxStatus::Unknown) => Step::Failed(AttemptFailure::new(
                FailureKind::Timeout,
                format!("{cause}; transaction no longer known to the node"),
            )),
            Ok(TxStatus::Pending) => Step::Unconfirmed(tx_hash),
            Err(e) => {
                tracing::warn!(tx = %tx_hash, error = %e, "transaction status unavailable");
                Step::Unconfirmed(tx_hash)
            }
        }
    }

    fn delivered(
        &self,
        request: &ValidatedRequest,
        plan: &ContractPlan<'_>,
        method: Method,
        tx_hash: TxHash,
        receipt: Receipt,
        attempts: Vec<AttemptOutcome>,
    ) -> DispatchResult {
        let price = if receipt.effective_gas_price == 0 {
            plan.gas_price
        } else {
            receipt.effective_gas_price
        };
        let gas_cost_wei = U256::from(receipt.gas_used).saturating_mul(U256::from(price));
        let gas_cost_eth = format_ether(gas_cost_wei);

        tracing::info!(
            contract = %plan.contract.name,
            method = %method,
            tx = %tx_hash,
            block = receipt.block_number,
            gas_used = receipt.gas_used,
            gas_cost_eth = %gas_cost_eth,
            "withdrawal delivered"
        );

        DispatchResult {
            contract: plan.contract.clone(),
            method,
            tx_hash,
            block_number: receipt.block_number,
            gas_used: receipt.gas_used,
            gas_cost_wei,
            gas_cost_eth,
            symbol: plan.metadata.symbol.clone(),
            amount: request.amount,
            amount_units: plan.amount_units,
            attempts,
        }
    }
}

fn settle_receipt(tx_hash: TxHash, receipt: Receipt) -> Step {
    if receipt.status {
        Step::Delivered { tx_hash, receipt }
    } else {
        Step::Failed(AttemptFailure::new(
            FailureKind::Reverted,
            format!(
                "transaction {tx_hash} reverted in block {}",
                receipt.block_number
            ),
        ))
    }
}

/// Record both methods of `contract` as failed without touching the chain.
fn exhaust(attempts: &mut Vec<AttemptOutcome>, contract: &ContractTarget, failure: AttemptFailure) {
    tracing::warn!(
        contract = %contract.name,
        kind = %failure.kind,
        reason = %failure.reason,
        "contract unusable, skipping both methods"
    );
    for method in Method::ALL {
        attempts.push(AttemptOutcome {
            contract: contract.clone(),
            method,
            outcome: Outcome::Failure(failure.clone()),
        });
    }
}
