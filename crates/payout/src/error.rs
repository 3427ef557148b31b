use alloy::primitives::{TxHash, U256};
use serde::Serialize;
use thiserror::Error;

use crate::attempt::{AttemptOutcome, FailureKind, Method};
use crate::contract::ContractTarget;

/// Last failure recorded for a contract once both of its methods are spent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractFailure {
    pub contract: ContractTarget,
    pub method: Method,
    pub kind: FailureKind,
    pub reason: String,
}

/// Errors returned by [`crate::Dispatcher::dispatch`].
#[derive(Debug, Error)]
pub enum PayoutError {
    #[error("dispatcher not ready: {0}")]
    NotReady(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("insufficient gas balance: have {balance} wei, need at least {required} wei")]
    InsufficientGas { balance: U256, required: U256 },

    #[error("all withdrawal attempts failed after {attempts} attempts: {}", summarize(.failures))]
    AllAttemptsExhausted {
        attempts: usize,
        failures: Vec<ContractFailure>,
        /// Every attempt made, in order.
        outcomes: Vec<AttemptOutcome>,
    },

    #[error("{method} transaction {tx_hash} on {contract} is still unconfirmed; not falling back")]
    DeliveryUnconfirmed {
        contract: String,
        method: Method,
        tx_hash: TxHash,
    },

    #[error("config error: {0}")]
    ConfigError(String),
}

impl PayoutError {
    /// Attempts made before the dispatch ended; empty for errors raised
    /// before any contract was tried.
    pub fn attempts(&self) -> &[AttemptOutcome] {
        match self {
            PayoutError::AllAttemptsExhausted { outcomes, .. } => outcomes,
            _ => &[],
        }
    }
}

fn summarize(failures: &[ContractFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{} ({}): {}", f.contract.name, f.method, f.reason))
        .collect::<Vec<_>>()
        .join("; ")
}
