//! Foreign-to-local currency conversion.
//!
//! Conversion never rounds. Callers round to whole local-currency units
//! only after duty and shipping have been applied, so rounding error does
//! not compound across pricing steps.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::PricingError;

/// A positive foreign→local exchange rate, fetched once per run and shared
/// read-only by every traversal of that run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct ExchangeRate(Decimal);

impl ExchangeRate {
    /// # Errors
    ///
    /// Returns [`PricingError::InvalidExchangeRate`] when `rate <= 0`.
    pub fn new(rate: Decimal) -> Result<Self, PricingError> {
        if rate <= Decimal::ZERO {
            return Err(PricingError::InvalidExchangeRate(rate));
        }
        Ok(Self(rate))
    }

    /// Identity rate for stores that already list prices in local currency.
    #[must_use]
    pub fn unit() -> Self {
        Self(Decimal::ONE)
    }

    #[must_use]
    pub fn value(self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for ExchangeRate {
    type Error = PricingError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ExchangeRate> for Decimal {
    fn from(rate: ExchangeRate) -> Self {
        rate.0
    }
}

impl std::fmt::Display for ExchangeRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Converts `amount` to local currency: `amount * rate * margin`.
///
/// `margin` is the conversion-service markup (e.g. `1.03`), not profit.
///
/// # Errors
///
/// - [`PricingError::InvalidMargin`] when `margin <= 0`.
/// - [`PricingError::OutOfRange`] when the product overflows.
pub fn convert(
    amount: Decimal,
    rate: ExchangeRate,
    margin: Decimal,
) -> Result<Decimal, PricingError> {
    if margin <= Decimal::ZERO {
        return Err(PricingError::InvalidMargin(margin));
    }
    amount
        .checked_mul(rate.value())
        .and_then(|local| local.checked_mul(margin))
        .ok_or(PricingError::OutOfRange(amount))
}
