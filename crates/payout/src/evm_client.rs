use std::time::Duration;

use alloy::consensus::{SignableTransaction, TxEnvelope, TxLegacy};
use alloy::eips::eip2718::Encodable2718;
use alloy::network::TxSignerSync;
use alloy::primitives::{Address, TxHash, TxKind, U256};
use alloy::providers::{Provider, RootProvider};
use alloy::rpc::types::TransactionReceipt;
use alloy::sol_types::SolCall;

use crate::attempt::Method;
use crate::chain::{
    ChainClient, ChainError, ReadCall, ReadValue, Receipt, SignedTransaction, TransactionParams,
    TxStatus, UnsignedTransaction,
};
use crate::identity::SigningIdentity;
use crate::PayoutToken;

/// Default interval between receipt polls.
const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Bound on a single RPC round trip, so a hung node cannot stall a dispatch.
const RPC_TIMEOUT: Duration = Duration::from_secs(30);

/// [`ChainClient`] over an alloy JSON-RPC provider.
///
/// Transactions are built as EIP-155 legacy transactions with an explicit gas
/// price and signed locally with the [`SigningIdentity`]; the provider is only
/// used for reads and raw broadcast.
pub struct AlloyChainClient<P> {
    provider: P,
    poll_interval: Duration,
}

impl<P> AlloyChainClient<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            poll_interval: RECEIPT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

impl AlloyChainClient<RootProvider> {
    /// Client over a plain HTTP provider.
    pub fn connect_http(rpc_url: &str) -> Result<Self, ChainError> {
        let url = rpc_url
            .parse()
            .map_err(|e| ChainError::Rpc(format!("invalid RPC URL: {e}")))?;
        Ok(Self::new(RootProvider::new_http(url)))
    }
}

async fn bounded<T, E, F>(op: &str, fut: F) -> Result<T, ChainError>
where
    F: std::future::IntoFuture<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    tokio::time::timeout(RPC_TIMEOUT, fut)
        .await
        .map_err(|_| ChainError::Rpc(format!("{op} timed out after {}s", RPC_TIMEOUT.as_secs())))?
        .map_err(|e| ChainError::Rpc(format!("{op} failed: {e}")))
}

impl From<&TransactionReceipt> for Receipt {
    fn from(receipt: &TransactionReceipt) -> Self {
        Self {
            status: receipt.status(),
            block_number: receipt.block_number.unwrap_or_default(),
            gas_used: receipt.gas_used,
            effective_gas_price: receipt.effective_gas_price,
        }
    }
}

/// ABI-encode the calldata for a delivery method.
pub fn encode_call(method: Method, recipient: Address, amount: U256) -> Vec<u8> {
    match method {
        Method::Mint => PayoutToken::mintCall {
            to: recipient,
            amount,
        }
        .abi_encode(),
        Method::Transfer => PayoutToken::transferCall {
            to: recipient,
            amount,
        }
        .abi_encode(),
    }
}

impl<P> ChainClient for AlloyChainClient<P>
where
    P: Provider + Send + Sync,
{
    async fn is_connected(&self) -> bool {
        match bounded("eth_blockNumber", self.provider.get_block_number()).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(error = %e, "chain connectivity check failed");
                false
            }
        }
    }

    async fn gas_price(&self) -> Result<u128, ChainError> {
        bounded("eth_gasPrice", self.provider.get_gas_price()).await
    }

    async fn next_nonce(&self, address: Address) -> Result<u64, ChainError> {
        bounded(
            "eth_getTransactionCount",
            self.provider.get_transaction_count(address).pending(),
        )
        .await
    }

    async fn chain_id(&self) -> Result<u64, ChainError> {
        bounded("eth_chainId", self.provider.get_chain_id()).await
    }

    async fn call(&self, contract: Address, call: ReadCall) -> Result<ReadValue, ChainError> {
        let token = PayoutToken::new(contract, &self.provider);
        match call {
            ReadCall::Symbol => bounded("symbol()", token.symbol().call())
                .await
                .map(ReadValue::Text),
            ReadCall::Decimals => bounded("decimals()", token.decimals().call())
                .await
                .map(|d| ReadValue::Number(U256::from(d))),
            ReadCall::BalanceOf(owner) => bounded("balanceOf()", token.balanceOf(owner).call())
                .await
                .map(ReadValue::Number),
        }
    }

    fn build_transaction(
        &self,
        params: &TransactionParams,
    ) -> Result<UnsignedTransaction, ChainError> {
        if params.contract == Address::ZERO {
            return Err(ChainError::Rpc("contract address is zero".to_string()));
        }
        Ok(UnsignedTransaction {
            from: params.from,
            to: params.contract,
            input: encode_call(params.method, params.recipient, params.amount).into(),
            nonce: params.nonce,
            gas_limit: params.gas_limit,
            gas_price: params.gas_price,
            chain_id: params.chain_id,
        })
    }

    fn sign(
        &self,
        tx: &UnsignedTransaction,
        identity: &SigningIdentity,
    ) -> Result<SignedTransaction, ChainError> {
        if tx.from != identity.address() {
            return Err(ChainError::Signing(format!(
                "transaction sender {} does not match signing identity {}",
                tx.from,
                identity.address()
            )));
        }

        let mut legacy = TxLegacy {
            chain_id: Some(tx.chain_id),
            nonce: tx.nonce,
            gas_price: tx.gas_price,
            gas_limit: tx.gas_limit,
            to: TxKind::Call(tx.to),
            value: U256::ZERO,
            input: tx.input.clone(),
        };
        let signature = identity
            .signer()
            .sign_transaction_sync(&mut legacy)
            .map_err(|e| ChainError::Signing(e.to_string()))?;

        let signed = legacy.into_signed(signature);
        let hash = *signed.hash();
        let envelope = TxEnvelope::from(signed);
        Ok(SignedTransaction {
            hash,
            raw: envelope.encoded_2718().into(),
        })
    }

    async fn broadcast(&self, tx: &SignedTransaction) -> Result<TxHash, ChainError> {
        let pending = bounded(
            "eth_sendRawTransaction",
            self.provider.send_raw_transaction(&tx.raw),
        )
        .await?;
        Ok(*pending.tx_hash())
    }

    async fn wait_for_receipt(
        &self,
        tx_hash: TxHash,
        timeout: Duration,
    ) -> Result<Receipt, ChainError> {
        let poll = async {
            loop {
                match self.provider.get_transaction_receipt(tx_hash).await {
                    Ok(Some(receipt)) => return Receipt::from(&receipt),
                    Ok(None) => {}
                    // Transient RPC errors while polling do not end the wait.
                    Err(e) => tracing::debug!(tx = %tx_hash, error = %e, "receipt poll failed"),
                }
                tokio::time::sleep(self.poll_interval).await;
            }
        };

        tokio::time::timeout(timeout, poll)
            .await
            .map_err(|_| ChainError::ConfirmationTimeout {
                tx_hash,
                waited: timeout,
            })
    }

    async fn transaction_status(&self, tx_hash: TxHash) -> Result<TxStatus, ChainError> {
        let receipt = bounded(
            "eth_getTransactionReceipt",
            self.provider.get_transaction_receipt(tx_hash),
        )
        .await?;
        if let Some(receipt) = receipt {
            return Ok(TxStatus::Mined(Receipt::from(&receipt)));
        }

        let tx = bounded(
            "eth_getTransactionByHash",
            self.provider.get_transaction_by_hash(tx_hash),
        )
        .await?;
        Ok(match tx {
            Some(_) => TxStatus::Pending,
            None => TxStatus::Unknown,
        })
    }

    async fn balance(&self, address: Address) -> Result<U256, ChainError> {
        bounded("eth_getBalance", self.provider.get_balance(address)).await
    }
}
