//! Service configuration, read from the environment once at startup.

use std::str::FromStr;
use std::time::Duration;

use payout::{ContractTarget, DispatchConfig, Network};
use thiserror::Error;

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_RATE_LIMIT_RPM: u64 = 60;
const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Everything the server needs to boot.
pub struct ServiceConfig {
    pub network: Network,
    pub rpc_url: String,
    pub seed_phrase: Option<String>,
    pub private_key: Option<String>,
    pub contracts: Vec<ContractTarget>,
    pub dispatch: DispatchConfig,
    pub receipt_poll_interval: Duration,
    pub port: u16,
    pub rate_limit_rpm: u64,
    /// Empty means localhost only.
    pub allowed_origins: Vec<String>,
    pub metrics_token: Option<Vec<u8>>,
    pub public_metrics: bool,
}

impl std::fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("network", &self.network)
            .field("contracts", &self.contracts.len())
            .field("dispatch", &self.dispatch)
            .field("port", &self.port)
            .field("rate_limit_rpm", &self.rate_limit_rpm)
            .finish_non_exhaustive()
    }
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let network = match get("NETWORK") {
            Some(raw) => Network::from_str(&raw).map_err(|reason| ConfigError::Invalid {
                var: "NETWORK",
                reason,
            })?,
            None => Network::default(),
        };

        let rpc_url = match (get("RPC_URL"), get("ALCHEMY_API_KEY")) {
            (Some(url), _) => url,
            (None, Some(key)) => network.alchemy_url(key.trim()),
            (None, None) => return Err(ConfigError::Missing("RPC_URL or ALCHEMY_API_KEY")),
        };

        let contracts = match (get("PAYOUT_CONTRACTS"), get("REWARD_TOKEN_ADDRESS")) {
            (Some(list), _) => ContractTarget::parse_list(&list).map_err(|reason| ConfigError::Invalid {
                var: "PAYOUT_CONTRACTS",
                reason,
            })?,
            (None, Some(address)) => ContractTarget::parse_list(&format!("reward={address}"))
                .map_err(|reason| ConfigError::Invalid {
                    var: "REWARD_TOKEN_ADDRESS",
                    reason,
                })?,
            (None, None) => Vec::new(),
        };

        let defaults = DispatchConfig::default();
        let dispatch = DispatchConfig {
            max_amount: parse_or(&get, "MAX_WITHDRAW_AMOUNT", defaults.max_amount)?,
            gas_price_buffer_percent: parse_or(
                &get,
                "GAS_PRICE_BUFFER_PERCENT",
                defaults.gas_price_buffer_percent,
            )?,
            confirmation_timeout: Duration::from_secs(parse_or(
                &get,
                "CONFIRMATION_TIMEOUT_SECS",
                defaults.confirmation_timeout.as_secs(),
            )?),
            mint_gas_limit: parse_or(&get, "MINT_GAS_LIMIT", defaults.mint_gas_limit)?,
            transfer_gas_limit: parse_or(&get, "TRANSFER_GAS_LIMIT", defaults.transfer_gas_limit)?,
            min_gas_balance: parse_or(&get, "MIN_GAS_BALANCE_WEI", defaults.min_gas_balance)?,
            check_transfer_balance: parse_or(
                &get,
                "CHECK_TRANSFER_BALANCE",
                defaults.check_transfer_balance,
            )?,
        };
        if dispatch.max_amount.is_zero() {
            return Err(ConfigError::Invalid {
                var: "MAX_WITHDRAW_AMOUNT",
                reason: "must be greater than 0".to_string(),
            });
        }

        let allowed_origins = get("ALLOWED_ORIGINS")
            .map(|origins| {
                origins
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            network,
            rpc_url,
            seed_phrase: get("ADMIN_SEED_PHRASE"),
            private_key: get("ADMIN_PRIVATE_KEY"),
            contracts,
            dispatch,
            receipt_poll_interval: Duration::from_millis(parse_or(
                &get,
                "RECEIPT_POLL_INTERVAL_MS",
                DEFAULT_POLL_INTERVAL_MS,
            )?),
            port: parse_or(&get, "PORT", DEFAULT_PORT)?,
            rate_limit_rpm: parse_or(&get, "RATE_LIMIT_RPM", DEFAULT_RATE_LIMIT_RPM)?,
            allowed_origins,
            metrics_token: get("METRICS_TOKEN").map(String::into_bytes),
            public_metrics: get("PAYOUT_PUBLIC_METRICS")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        })
    }
}

fn parse_or<T, G>(get: &G, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(var) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}
