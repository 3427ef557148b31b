use alloy::providers::RootProvider;
use payout::{AlloyChainClient, ContractTarget, Dispatcher, Network, SigningIdentity};

use crate::sessions::SessionStore;

/// Chain client type used by the server.
pub type HttpChainClient = AlloyChainClient<RootProvider>;

/// Shared application state for the payout server.
pub struct AppState {
    pub dispatcher: Dispatcher,
    pub chain: HttpChainClient,
    /// `None` when no usable key was configured; withdrawals answer "not ready".
    pub identity: Option<SigningIdentity>,
    /// Priority order.
    pub contracts: Vec<ContractTarget>,
    pub network: Network,
    pub sessions: SessionStore,
    /// Bearer token for /metrics.
    pub metrics_token: Option<Vec<u8>>,
    pub public_metrics: bool,
}

impl AppState {
    pub fn is_ready(&self) -> bool {
        self.identity.is_some() && !self.contracts.is_empty()
    }
}
