//! Exact decimal amounts in human token units.
//!
//! Amounts arrive as decimal text ("12.5", "0.000001", "1e-3") and are kept as
//! an integer mantissa plus a decimal scale. Scaling into a contract's
//! smallest unit is integer-only; no `f64` anywhere in the pipeline.

use std::fmt;
use std::str::FromStr;

use alloy::primitives::U256;
use serde::{Serialize, Serializer};

/// U256 holds at most 78 decimal digits; anything with a larger scale cannot
/// be represented after shifting.
const MAX_SCALE: u32 = 77;

/// Exponents beyond this cannot produce a representable amount.
const MAX_EXPONENT: u64 = 1_000;

/// A non-negative decimal value: `mantissa / 10^scale`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenAmount {
    mantissa: U256,
    scale: u32,
}

fn pow10(exp: u32) -> Option<U256> {
    U256::from(10u8).checked_pow(U256::from(exp))
}

impl TokenAmount {
    /// A whole number of tokens.
    pub fn whole(units: u64) -> Self {
        Self {
            mantissa: U256::from(units),
            scale: 0,
        }
    }

    /// Parse decimal text. Accepts an optional fraction and an optional
    /// exponent; rejects signs, blanks and anything non-numeric.
    pub fn parse(input: &str) -> Result<Self, String> {
        let text = input.trim();
        if text.is_empty() {
            return Err("amount is empty".to_string());
        }
        if text.starts_with('-') {
            return Err(format!("amount '{text}' must be positive"));
        }

        let (number, exponent) = match text.split_once(['e', 'E']) {
            Some((n, e)) => {
                let exp: i64 = e
                    .parse()
                    .map_err(|err| format!("amount '{text}': exponent: {err}"))?;
                if exp.unsigned_abs() > MAX_EXPONENT {
                    return Err(format!("amount '{text}': exponent out of range"));
                }
                (n, exp)
            }
            None => (text, 0),
        };

        let (integer_part, fractional_part) = number.split_once('.').unwrap_or((number, ""));
        if integer_part.is_empty() && fractional_part.is_empty() {
            return Err(format!("amount '{text}' has no digits"));
        }
        if !integer_part.chars().all(|c| c.is_ascii_digit())
            || !fractional_part.chars().all(|c| c.is_ascii_digit())
        {
            return Err(format!("amount '{text}' is not a decimal number"));
        }

        let digits = format!("{integer_part}{fractional_part}");
        let digits = digits.trim_start_matches('0');
        let mut mantissa = if digits.is_empty() {
            U256::ZERO
        } else {
            U256::from_str_radix(digits, 10).map_err(|_| format!("amount '{text}' is too large"))?
        };

        // Fold the exponent into the scale; a negative scale becomes a multiplier.
        let scale = fractional_part.len() as i64 - exponent;
        let scale = if scale < 0 {
            let factor = u32::try_from(-scale)
                .ok()
                .and_then(pow10)
                .ok_or_else(|| format!("amount '{text}' is too large"))?;
            mantissa = mantissa
                .checked_mul(factor)
                .ok_or_else(|| format!("amount '{text}' is too large"))?;
            0
        } else {
            scale as u64
        };

        if scale > MAX_SCALE as u64 {
            return Err(format!("amount '{text}' has too many decimal places"));
        }

        Ok(Self {
            mantissa,
            scale: scale as u32,
        })
    }

    pub fn is_zero(&self) -> bool {
        self.mantissa.is_zero()
    }

    /// True when the amount is strictly greater than `limit` whole tokens.
    pub fn exceeds(&self, limit: U256) -> bool {
        match pow10(self.scale).and_then(|f| limit.checked_mul(f)) {
            Some(scaled_limit) => self.mantissa > scaled_limit,
            // The limit cannot even be expressed at this scale, so nothing exceeds it.
            None => false,
        }
    }

    /// Scale into a contract's smallest unit: `round(amount * 10^decimals)`,
    /// rounding half up. `None` on overflow.
    pub fn to_units(&self, decimals: u8) -> Option<U256> {
        let decimals = decimals as u32;
        if self.scale <= decimals {
            return self.mantissa.checked_mul(pow10(decimals - self.scale)?);
        }

        let divisor = pow10(self.scale - decimals)?;
        let quotient = self.mantissa / divisor;
        let remainder = self.mantissa % divisor;
        if remainder.saturating_mul(U256::from(2u8)) >= divisor {
            quotient.checked_add(U256::from(1u8))
        } else {
            Some(quotient)
        }
    }
}

impl FromStr for TokenAmount {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.mantissa.to_string();
        let scale = self.scale as usize;
        if scale == 0 {
            return f.write_str(&digits);
        }

        let padded = if digits.len() <= scale {
            format!("{}{digits}", "0".repeat(scale + 1 - digits.len()))
        } else {
            digits
        };
        let (integer, fraction) = padded.split_at(padded.len() - scale);
        let fraction = fraction.trim_end_matches('0');
        if fraction.is_empty() {
            f.write_str(integer)
        } else {
            write!(f, "{integer}.{fraction}")
        }
    }
}

impl Serialize for TokenAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
