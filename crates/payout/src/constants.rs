use std::time::Duration;

use alloy::primitives::U256;

/// Default ceiling on a single withdrawal, in human token units.
pub const MAX_AMOUNT: u64 = 1_000_000_000;

/// Markup applied to the observed gas price, in percent.
pub const GAS_PRICE_BUFFER_PERCENT: u64 = 20;

/// How long to wait for a receipt before re-checking the transaction.
pub const CONFIRMATION_TIMEOUT_SECS: u64 = 120;

/// Gas limit for `mint(to, amount)`.
pub const MINT_GAS_LIMIT: u64 = 200_000;

/// Gas limit for `transfer(to, amount)`.
pub const TRANSFER_GAS_LIMIT: u64 = 100_000;

/// Minimum native balance (0.005 ether) the operator needs before dispatching.
pub const MIN_GAS_BALANCE_WEI: u64 = 5_000_000_000_000_000;

/// Symbol reported when the contract's `symbol()` cannot be read.
pub const DEFAULT_TOKEN_SYMBOL: &str = "TOKEN";

/// Decimals assumed when the contract's `decimals()` cannot be read.
pub const DEFAULT_TOKEN_DECIMALS: u8 = 18;

/// Ethereum mainnet chain ID.
pub const MAINNET_CHAIN_ID: u64 = 1;

/// Sepolia testnet chain ID.
pub const SEPOLIA_CHAIN_ID: u64 = 11_155_111;

/// Network the dispatcher is configured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Network {
    #[default]
    Mainnet,
    Sepolia,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Sepolia => "sepolia",
        }
    }

    pub fn chain_id(&self) -> u64 {
        match self {
            Network::Mainnet => MAINNET_CHAIN_ID,
            Network::Sepolia => SEPOLIA_CHAIN_ID,
        }
    }

    /// Alchemy HTTP endpoint for this network.
    pub fn alchemy_url(&self, api_key: &str) -> String {
        format!("https://eth-{}.g.alchemy.com/v2/{api_key}", self.as_str())
    }
}

impl std::str::FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mainnet" | "ethereum" => Ok(Network::Mainnet),
            "sepolia" => Ok(Network::Sepolia),
            other => Err(format!("unknown network '{other}' (expected mainnet or sepolia)")),
        }
    }
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runtime tuning for the dispatcher. Defaults match the constants above.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Largest accepted amount, in human units.
    pub max_amount: U256,
    pub gas_price_buffer_percent: u64,
    pub confirmation_timeout: Duration,
    pub mint_gas_limit: u64,
    pub transfer_gas_limit: u64,
    /// Zero disables the pre-dispatch gas balance check.
    pub min_gas_balance: U256,
    /// Read the operator's token balance before attempting `transfer`.
    pub check_transfer_balance: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_amount: U256::from(MAX_AMOUNT),
            gas_price_buffer_percent: GAS_PRICE_BUFFER_PERCENT,
            confirmation_timeout: Duration::from_secs(CONFIRMATION_TIMEOUT_SECS),
            mint_gas_limit: MINT_GAS_LIMIT,
            transfer_gas_limit: TRANSFER_GAS_LIMIT,
            min_gas_balance: U256::from(MIN_GAS_BALANCE_WEI),
            check_transfer_balance: true,
        }
    }
}

impl DispatchConfig {
    /// Apply the configured buffer to an observed gas price.
    pub fn buffered_gas_price(&self, observed: u128) -> u128 {
        observed.saturating_mul(100 + self.gas_price_buffer_percent as u128) / 100
    }

    pub fn gas_limit_for(&self, method: crate::Method) -> u64 {
        match method {
            crate::Method::Mint => self.mint_gas_limit,
            crate::Method::Transfer => self.transfer_gas_limit,
        }
    }
}
