//! Withdrawal dispatch engine for ERC-20 style reward tokens.
//!
//! Given a destination wallet and a human-unit amount, the [`Dispatcher`]
//! tries to deliver tokens by calling `mint` and then `transfer` on each
//! configured contract in priority order, stopping at the first confirmed
//! success.
//!
//! # Pieces
//!
//! - [`Dispatcher`]: ordering, fallback, transaction parameter assembly
//! - [`ChainClient`]: the chain capability the dispatcher drives
//!   ([`AlloyChainClient`] is the JSON-RPC implementation)
//! - [`SigningIdentity`]: the operator key, loaded from a seed phrase or raw key
//! - [`TokenAmount`]: exact decimal amounts, scaled without floating point
//!
//! # Quick example
//!
//! ```no_run
//! use alloy::providers::RootProvider;
//! use payout::{AlloyChainClient, ContractTarget, Dispatcher, SigningIdentity, WithdrawalRequest};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let provider = RootProvider::new_http("http://localhost:8545".parse().unwrap());
//! let chain = AlloyChainClient::new(provider);
//! let identity = SigningIdentity::from_private_key("0xYOUR_KEY").unwrap();
//! let contracts = vec![ContractTarget::new(1, "Reward", "0x...".parse().unwrap())];
//!
//! let request = WithdrawalRequest::new("0x70997970C51812dc3A010C7d01b50e0d17dc79C8", "12.5");
//! let result = Dispatcher::default()
//!     .dispatch(&request, Some(&identity), &contracts, &chain)
//!     .await
//!     .unwrap();
//! println!("{} via {} in tx {}", result.contract.name, result.method, result.tx_hash);
//! # }
//! ```

pub mod amount;
pub mod attempt;
pub mod chain;
pub mod constants;
pub mod contract;
pub mod dispatcher;
pub mod error;
pub mod evm_client;
pub mod identity;
pub mod request;

use alloy::sol;

// Token surface the dispatcher relies on. `mint` is only honoured for
// privileged callers; `transfer` moves the caller's own balance.
sol! {
    #[sol(rpc)]
    interface PayoutToken {
        function mint(address to, uint256 amount) external returns (bool);
        function transfer(address to, uint256 amount) external returns (bool);
        function balanceOf(address account) external view returns (uint256);
        function decimals() external view returns (uint8);
        function symbol() external view returns (string);
    }
}

// Re-exports
pub use amount::TokenAmount;
pub use attempt::{AttemptFailure, AttemptOutcome, FailureKind, Method, Outcome};
pub use chain::{
    ChainClient, ChainError, ReadCall, ReadValue, Receipt, SignedTransaction, TransactionParams,
    TxStatus, UnsignedTransaction,
};
pub use constants::*;
pub use contract::ContractTarget;
pub use dispatcher::{DispatchResult, Dispatcher};
pub use error::{ContractFailure, PayoutError};
pub use evm_client::AlloyChainClient;
pub use identity::{IdentitySource, SigningIdentity};
pub use request::WithdrawalRequest;
