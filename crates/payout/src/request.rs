use alloy::primitives::Address;

use crate::amount::TokenAmount;
use crate::error::PayoutError;

/// A caller's withdrawal request, as received. Validation happens in
/// [`crate::Dispatcher::dispatch`] so bad input never reaches the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WithdrawalRequest {
    pub destination: String,
    pub amount: String,
    pub preferred_contract: Option<String>,
}

impl WithdrawalRequest {
    pub fn new(destination: impl Into<String>, amount: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            amount: amount.into(),
            preferred_contract: None,
        }
    }

    pub fn with_preferred_contract(mut self, contract: impl Into<String>) -> Self {
        self.preferred_contract = Some(contract.into());
        self
    }
}

/// Parse an account address. `0x` is optional; all-lowercase and
/// all-uppercase hex are accepted as-is, mixed case must be a valid
/// EIP-55 checksum.
pub fn parse_account_address(input: &str) -> Result<Address, PayoutError> {
    let trimmed = input.trim();
    let hex = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    if hex.len() != 40 {
        return Err(PayoutError::InvalidAddress(format!(
            "'{trimmed}' must be 40 hex digits, got {}",
            hex.len()
        )));
    }
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(PayoutError::InvalidAddress(format!(
            "'{trimmed}' contains non-hex characters"
        )));
    }

    let has_lower = hex.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = hex.chars().any(|c| c.is_ascii_uppercase());
    if has_lower && has_upper {
        return Address::parse_checksummed(format!("0x{hex}"), None)
            .map_err(|_| PayoutError::InvalidAddress(format!("'{trimmed}' has a bad checksum")));
    }

    hex.parse::<Address>()
        .map_err(|e| PayoutError::InvalidAddress(format!("'{trimmed}': {e}")))
}

/// Validated form of a [`WithdrawalRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ValidatedRequest {
    pub destination: Address,
    pub amount: TokenAmount,
    pub preferred: Option<Address>,
}

impl WithdrawalRequest {
    pub(crate) fn validate(
        &self,
        max_amount: alloy::primitives::U256,
    ) -> Result<ValidatedRequest, PayoutError> {
        let destination = parse_account_address(&self.destination)?;
        if destination == Address::ZERO {
            return Err(PayoutError::InvalidAddress(
                "destination cannot be the zero address".to_string(),
            ));
        }

        let amount = TokenAmount::parse(&self.amount).map_err(PayoutError::InvalidAmount)?;
        if amount.is_zero() {
            return Err(PayoutError::InvalidAmount(
                "amount must be greater than 0".to_string(),
            ));
        }
        if amount.exceeds(max_amount) {
            return Err(PayoutError::InvalidAmount(format!(
                "amount {amount} exceeds the maximum of {max_amount}"
            )));
        }

        // An unusable preference only loses its priority; it never fails the call.
        let preferred = match self.preferred_contract.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => match raw.parse::<Address>() {
                Ok(address) => Some(address),
                Err(e) => {
                    tracing::warn!(preferred = %raw, error = %e, "ignoring unparsable preferred contract");
                    None
                }
            },
        };

        Ok(ValidatedRequest {
            destination,
            amount,
            preferred,
        })
    }
}
