//! The chain capability the dispatcher drives.
//!
//! [`ChainClient`] is the seam between the fallback policy and the network:
//! the dispatcher decides *what* to submit and *when*, the client does the
//! RPC, ABI and signing work. [`crate::AlloyChainClient`] is the JSON-RPC
//! implementation; tests substitute their own.

use std::future::Future;
use std::time::Duration;

use alloy::primitives::{Address, Bytes, TxHash, U256};
use thiserror::Error;

use crate::attempt::Method;
use crate::identity::SigningIdentity;

/// Errors surfaced by a [`ChainClient`].
#[derive(Debug, Clone, Error)]
pub enum ChainError {
    #[error("rpc error: {0}")]
    Rpc(String),

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("no receipt for {tx_hash} after {}s", .waited.as_secs())]
    ConfirmationTimeout { tx_hash: TxHash, waited: Duration },
}

/// Read-only token calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadCall {
    Symbol,
    Decimals,
    BalanceOf(Address),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadValue {
    Text(String),
    Number(U256),
}

/// Everything needed to build one state-changing token call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionParams {
    pub contract: Address,
    pub method: Method,
    pub recipient: Address,
    pub amount: U256,
    pub from: Address,
    pub nonce: u64,
    pub gas_limit: u64,
    pub gas_price: u128,
    pub chain_id: u64,
}

/// A fully specified, unsigned legacy transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedTransaction {
    pub from: Address,
    pub to: Address,
    pub input: Bytes,
    pub nonce: u64,
    pub gas_limit: u64,
    pub gas_price: u128,
    pub chain_id: u64,
}

/// A signed, encoded transaction ready for `eth_sendRawTransaction`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub hash: TxHash,
    pub raw: Bytes,
}

/// The parts of a transaction receipt the dispatcher uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Receipt {
    pub status: bool,
    pub block_number: u64,
    pub gas_used: u64,
    pub effective_gas_price: u128,
}

/// On-chain status of a broadcast transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatus {
    Mined(Receipt),
    /// Known to the node but not yet in a block.
    Pending,
    /// Neither mined nor in the node's pool.
    Unknown,
}

/// Chain operations used by [`crate::Dispatcher`].
pub trait ChainClient: Send + Sync {
    fn is_connected(&self) -> impl Future<Output = bool> + Send;

    /// Current network gas price, in wei.
    fn gas_price(&self) -> impl Future<Output = Result<u128, ChainError>> + Send;

    /// Next usable nonce for `address`, counting pending transactions.
    fn next_nonce(&self, address: Address) -> impl Future<Output = Result<u64, ChainError>> + Send;

    fn chain_id(&self) -> impl Future<Output = Result<u64, ChainError>> + Send;

    fn call(
        &self,
        contract: Address,
        call: ReadCall,
    ) -> impl Future<Output = Result<ReadValue, ChainError>> + Send;

    fn build_transaction(&self, params: &TransactionParams)
        -> Result<UnsignedTransaction, ChainError>;

    fn sign(
        &self,
        tx: &UnsignedTransaction,
        identity: &SigningIdentity,
    ) -> Result<SignedTransaction, ChainError>;

    fn broadcast(
        &self,
        tx: &SignedTransaction,
    ) -> impl Future<Output = Result<TxHash, ChainError>> + Send;

    /// Wait up to `timeout` for a receipt.
    fn wait_for_receipt(
        &self,
        tx_hash: TxHash,
        timeout: Duration,
    ) -> impl Future<Output = Result<Receipt, ChainError>> + Send;

    fn transaction_status(
        &self,
        tx_hash: TxHash,
    ) -> impl Future<Output = Result<TxStatus, ChainError>> + Send;

    /// Native currency balance of `address`, in wei.
    fn balance(&self, address: Address) -> impl Future<Output = Result<U256, ChainError>> + Send;
}
