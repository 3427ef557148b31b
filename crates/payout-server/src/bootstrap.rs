//! Build the shared [`AppState`] from a [`ServiceConfig`].
//!
//! A bad endpoint URL is fatal. A missing or unusable signing key is not: the
//! server still comes up, reports itself degraded, and answers withdrawals
//! with "not ready" until it is restarted with a key.

use alloy::primitives::utils::format_ether;
use alloy::primitives::U256;
use payout::{ChainClient, Dispatcher, SigningIdentity};

use crate::config::{ConfigError, ServiceConfig};
use crate::sessions::SessionStore;
use crate::state::{AppState, HttpChainClient};

/// Below this the operator wallet gets a startup warning (0.01 ETH).
const LOW_BALANCE_WARNING_WEI: u64 = 10_000_000_000_000_000;

pub async fn bootstrap(config: ServiceConfig) -> Result<AppState, ConfigError> {
    let chain = HttpChainClient::connect_http(&config.rpc_url)
        .map_err(|e| ConfigError::Invalid {
            var: "RPC_URL",
            reason: e.to_string(),
        })?
        .with_poll_interval(config.receipt_poll_interval);

    let identity = match SigningIdentity::load(
        config.seed_phrase.as_deref(),
        config.private_key.as_deref(),
    ) {
        Ok(identity) => {
            tracing::info!(
                address = %identity.address(),
                source = ?identity.source(),
                "signing identity loaded"
            );
            Some(identity)
        }
        Err(e) => {
            tracing::error!(error = %e, "no usable signing identity; withdrawals disabled");
            None
        }
    };

    if config.contracts.is_empty() {
        tracing::warn!("no payout contracts configured; withdrawals disabled");
    }
    for contract in &config.contracts {
        tracing::info!(id = contract.id, name = %contract.name, address = %contract.address, "payout contract");
    }

    if chain.is_connected().await {
        check_chain(&chain, &config, identity.as_ref()).await;
    } else {
        tracing::warn!(network = %config.network, "chain endpoint unreachable at startup");
    }

    Ok(AppState {
        dispatcher: Dispatcher::new(config.dispatch),
        chain,
        identity,
        contracts: config.contracts,
        network: config.network,
        sessions: SessionStore::new(),
        metrics_token: config.metrics_token,
        public_metrics: config.public_metrics,
    })
}

/// Startup sanity checks; failures are logged, never fatal.
async fn check_chain(
    chain: &HttpChainClient,
    config: &ServiceConfig,
    identity: Option<&SigningIdentity>,
) {
    match chain.chain_id().await {
        Ok(id) if id != config.network.chain_id() => tracing::warn!(
            network = %config.network,
            expected = config.network.chain_id(),
            actual = id,
            "endpoint chain id does not match NETWORK"
        ),
        Ok(id) => tracing::info!(network = %config.network, chain_id = id, "connected"),
        Err(e) => tracing::warn!(error = %e, "chain id unavailable"),
    }

    let Some(identity) = identity else {
        return;
    };
    match chain.balance(identity.address()).await {
        Ok(balance) if balance < U256::from(LOW_BALANCE_WARNING_WEI) => tracing::warn!(
            address = %identity.address(),
            balance = %format_ether(balance),
            "operator wallet balance is low; fund it with ETH for gas"
        ),
        Ok(balance) => tracing::info!(balance = %format_ether(balance), "operator wallet balance"),
        Err(e) => tracing::warn!(error = %e, "operator balance unavailable"),
    }
}
