//! Per-attempt results.
//!
//! Every (contract, method) pair tried during a dispatch produces one
//! [`AttemptOutcome`]. Failures carry a [`FailureKind`] so operators can tell
//! an empty gas wallet from a nonce race from a plain revert without reading
//! RPC error text.

use std::fmt;

use alloy::primitives::TxHash;
use serde::Serialize;

use crate::chain::ChainError;
use crate::contract::ContractTarget;

/// Contract entry point used to deliver tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Mint,
    Transfer,
}

impl Method {
    /// Attempt order within one contract.
    pub const ALL: [Method; 2] = [Method::Mint, Method::Transfer];

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Mint => "mint",
            Method::Transfer => "transfer",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FailureKind {
    /// Operator cannot pay for gas.
    InsufficientFunds,
    /// Nonce too low/high, replacement underpriced, already known.
    Nonce,
    /// Gas limit or intrinsic gas problems.
    Gas,
    /// Mined with a failed status, or the node reported a revert.
    Reverted,
    /// No receipt in time and the transaction is no longer known to the node.
    Timeout,
    /// Operator's token balance is below the requested amount.
    InsufficientTokenBalance,
    /// The attempt never reached the chain (bad scaling, unusable contract).
    Unavailable,
    /// Any other RPC failure.
    Rpc,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::InsufficientFunds => "insufficient_funds",
            FailureKind::Nonce => "nonce",
            FailureKind::Gas => "gas",
            FailureKind::Reverted => "reverted",
            FailureKind::Timeout => "timeout",
            FailureKind::InsufficientTokenBalance => "insufficient_token_balance",
            FailureKind::Unavailable => "unavailable",
            FailureKind::Rpc => "rpc",
        }
    }

    /// Classify node error text. Order matters: "insufficient funds for gas"
    /// is a funding problem, not a gas-limit one.
    pub fn classify(message: &str) -> Self {
        let msg = message.to_ascii_lowercase();
        if msg.contains("insufficient funds") {
            FailureKind::InsufficientFunds
        } else if msg.contains("nonce")
            || msg.contains("replacement transaction underpriced")
            || msg.contains("already known")
        {
            FailureKind::Nonce
        } else if msg.contains("revert") {
            FailureKind::Reverted
        } else if msg.contains("gas") {
            FailureKind::Gas
        } else {
            FailureKind::Rpc
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptFailure {
    pub kind: FailureKind,
    pub reason: String,
}

impl AttemptFailure {
    pub fn new(kind: FailureKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
        }
    }
}

impl From<&ChainError> for AttemptFailure {
    fn from(err: &ChainError) -> Self {
        let kind = match err {
            ChainError::ConfirmationTimeout { .. } => FailureKind::Timeout,
            ChainError::Signing(_) => FailureKind::Unavailable,
            ChainError::Rpc(msg) => FailureKind::classify(msg),
        };
        Self::new(kind, err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "status")]
pub enum Outcome {
    Success {
        tx_hash: TxHash,
        block_number: u64,
        gas_used: u64,
    },
    Failure(AttemptFailure),
}

/// Result of one (contract, method) attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptOutcome {
    pub contract: ContractTarget,
    pub method: Method,
    pub outcome: Outcome,
}

impl AttemptOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Success { .. })
    }

    pub fn failure(&self) -> Option<&AttemptFailure> {
        match &self.outcome {
            Outcome::Failure(f) => Some(f),
            Outcome::Success { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn classify_common_node_errors() {
        assert_eq!(
            FailureKind::classify("insufficient funds for gas * price + value"),
            FailureKind::InsufficientFunds
        );
        assert_eq!(FailureKind::classify("nonce too low"), FailureKind::Nonce);
        assert_eq!(
            FailureKind::classify("replacement transaction underpriced"),
            FailureKind::Nonce
        );
        assert_eq!(FailureKind::classify("already known"), FailureKind::Nonce);
        assert_eq!(
            FailureKind::classify("intrinsic gas too low"),
            FailureKind::Gas
        );
        assert_eq!(
            FailureKind::classify("execution reverted: Ownable: caller is not the owner"),
            FailureKind::Reverted
        );
        assert_eq!(
            FailureKind::classify("connection refused"),
            FailureKind::Rpc
        );
    }

    #[test]
    fn chain_error_conversion() {
        let timeout = ChainError::ConfirmationTimeout {
            tx_hash: TxHash::ZERO,
            waited: Duration::from_secs(120),
        };
        assert_eq!(AttemptFailure::from(&timeout).kind, FailureKind::Timeout);

        let rpc = ChainError::Rpc("Nonce too high".to_string());
        assert_eq!(AttemptFailure::from(&rpc).kind, FailureKind::Nonce);
    }

    #[test]
    fn method_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Method::Mint).unwrap(), "\"mint\"");
        assert_eq!(Method::Transfer.to_string(), "transfer");
    }
}
