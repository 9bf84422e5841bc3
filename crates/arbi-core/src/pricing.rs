//! Landed-cost and resale-price decisions for a single listing.
//!
//! The engine is a pure function of its inputs: the same raw price strings,
//! exchange rate and policy always produce the same [`Verdict`]. Rejection is
//! an expected outcome and is returned as [`Verdict::Rejected`], never as an
//! error.
//!
//! ## Canonical policy
//!
//! Older store scripts priced low-cost items with a stepped schedule
//! (300/400/500/600 by cost bracket under 10 000). Every store here uses the
//! continuous schedule instead:
//!
//! ```text
//! increment = max(floor(cost / 2000) * 100 + base_increment, ceil(cost * profit_rate))
//! selling   = ceil((cost + increment) / 20) * 20
//! ```
//!
//! which is non-decreasing in `cost`, so there is no tier boundary where a
//! more expensive item is offered for less.

use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::currency::{convert, ExchangeRate};
use crate::PricingError;

static PRICE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d[\d,]*(?:\.\d+)?").expect("valid price regex"));

/// Resale prices are always a multiple of this many local-currency units.
pub const PRICE_STEP: i64 = 20;

/// Cost span that adds another 100 units to the tiered increment.
const TIER_SPAN: i64 = 2000;
const TIER_STEP: i64 = 100;

/// Pricing parameters for one store. Every monetary field is in local
/// currency except where noted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingPolicy {
    /// Conversion-service markup applied on top of the exchange rate.
    pub currency_margin: Decimal,
    pub shipping_fee: Decimal,
    /// When set, shipping is only charged while the converted sale price is
    /// below this amount.
    pub free_shipping_threshold: Option<Decimal>,
    /// Multiplier covering import duty, e.g. `1.16`.
    pub duty_rate: Decimal,
    /// Source-country sales tax included in the listed price, backed out
    /// before shipping is added (e.g. `0.1` for Australian GST).
    pub source_tax_rate: Decimal,
    pub profit_rate: Decimal,
    pub base_increment: Decimal,
    /// Capture part of the unused discount headroom above the baseline.
    pub use_max_profit: bool,
    pub min_profit_floor: Decimal,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            currency_margin: Decimal::new(103, 2),
            shipping_fee: Decimal::from(850),
            free_shipping_threshold: None,
            duty_rate: Decimal::new(116, 2),
            source_tax_rate: Decimal::ZERO,
            profit_rate: Decimal::new(8, 2),
            base_increment: Decimal::from(300),
            use_max_profit: false,
            min_profit_floor: Decimal::from(500),
        }
    }
}

/// All derived prices for an accepted listing, in whole local-currency units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub original_price: i64,
    pub sale_price: i64,
    pub landed_cost: i64,
    pub selling_price: i64,
    pub profit: i64,
    /// `profit / selling_price * 100`, rounded to two decimals.
    pub profit_margin: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Rejection {
    /// The computed resale price is zero; margin is undefined.
    ZeroSellingPrice,
    /// Reselling would cost more than the store's own list price.
    AboveOriginalPrice {
        selling_price: i64,
        original_price: i64,
    },
    BelowProfitFloor { profit: i64, floor: i64 },
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rejection::ZeroSellingPrice => write!(f, "selling price is zero"),
            Rejection::AboveOriginalPrice {
                selling_price,
                original_price,
            } => write!(
                f,
                "selling price {selling_price} exceeds original price {original_price}"
            ),
            Rejection::BelowProfitFloor { profit, floor } => {
                write!(f, "profit {profit} is below floor {floor}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    Accepted(PriceQuote),
    Rejected(Rejection),
}

impl Verdict {
    #[must_use]
    pub fn quote(&self) -> Option<&PriceQuote> {
        match self {
            Verdict::Accepted(quote) => Some(quote),
            Verdict::Rejected(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PricingEngine {
    policy: PricingPolicy,
}

impl PricingEngine {
    #[must_use]
    pub fn new(policy: PricingPolicy) -> Self {
        Self { policy }
    }

    #[must_use]
    pub fn policy(&self) -> &PricingPolicy {
        &self.policy
    }

    /// Prices one listing and decides whether it is worth reselling.
    ///
    /// A missing `raw_original_price` means the item is not discounted; the
    /// original price then equals the sale price, which this policy always
    /// rejects because any positive increment exceeds it.
    ///
    /// # Errors
    ///
    /// - [`PricingError::MalformedPrice`] when either string has no numeral.
    /// - [`PricingError::InvalidMargin`] when the policy margin is not positive.
    /// - [`PricingError::OutOfRange`] when a price is too large to compute with.
    pub fn evaluate(
        &self,
        raw_sale_price: &str,
        raw_original_price: Option<&str>,
        rate: ExchangeRate,
    ) -> Result<Verdict, PricingError> {
        let policy = &self.policy;

        let sale_foreign = parse_price(raw_sale_price)?;
        let original_foreign = raw_original_price.map(parse_price).transpose()?;

        let sale_price = round_whole(convert(sale_foreign, rate, policy.currency_margin)?)?;
        let original_price = match original_foreign {
            Some(amount) => round_whole(convert(amount, rate, policy.currency_margin)?)?,
            None => sale_price,
        };

        let landed_cost = landed_cost(sale_price, policy)?;
        let mut increment = baseline_increment(landed_cost, policy)?;

        if policy.use_max_profit && original_foreign.is_some() {
            let spread = Decimal::from(original_price) - Decimal::from(landed_cost);
            if spread > increment {
                let headroom = spread
                    .checked_mul(Decimal::new(3, 1))
                    .and_then(|share| share.checked_add(increment))
                    .ok_or(PricingError::OutOfRange(spread))?;
                let half_spread = spread * Decimal::new(5, 1);
                increment = headroom.min(half_spread);
            }
        }

        let selling_price = Decimal::from(landed_cost)
            .checked_add(increment)
            .ok_or(PricingError::OutOfRange(increment))
            .and_then(round_up_to_step)?;

        if selling_price == 0 {
            return Ok(Verdict::Rejected(Rejection::ZeroSellingPrice));
        }

        if selling_price > original_price {
            return Ok(Verdict::Rejected(Rejection::AboveOriginalPrice {
                selling_price,
                original_price,
            }));
        }

        let profit = selling_price
            .checked_sub(landed_cost)
            .ok_or(PricingError::OutOfRange(Decimal::from(selling_price)))?;
        if Decimal::from(profit) < policy.min_profit_floor {
            return Ok(Verdict::Rejected(Rejection::BelowProfitFloor {
                profit,
                floor: policy.min_profit_floor.ceil().to_i64().unwrap_or(i64::MAX),
            }));
        }

        let profit_margin = (Decimal::from(profit) * Decimal::ONE_HUNDRED
            / Decimal::from(selling_price))
        .round_dp(2)
        .to_f64()
        .unwrap_or_default();

        Ok(Verdict::Accepted(PriceQuote {
            original_price,
            sale_price,
            landed_cost,
            selling_price,
            profit,
            profit_margin,
        }))
    }
}

/// Extracts the first numeral from a currency-formatted string such as
/// `"$1,000.00"` or `"AU$ 89.95"`, ignoring symbols and thousands separators.
///
/// # Errors
///
/// Returns [`PricingError::MalformedPrice`] when the string holds no numeral.
pub fn parse_price(raw: &str) -> Result<Decimal, PricingError> {
    let malformed = || PricingError::MalformedPrice {
        raw: raw.to_string(),
    };

    let numeral = PRICE_RE.find(raw).ok_or_else(malformed)?;
    numeral
        .as_str()
        .replace(',', "")
        .parse::<Decimal>()
        .map_err(|_| malformed())
}

/// Resale price for a landed cost, without max-profit adjustment.
#[must_use]
pub fn profitable_price(cost: i64, policy: &PricingPolicy) -> i64 {
    baseline_increment(cost, policy)
        .and_then(|increment| {
            Decimal::from(cost)
                .checked_add(increment)
                .ok_or(PricingError::OutOfRange(increment))
        })
        .and_then(round_up_to_step)
        .unwrap_or(i64::MAX)
}

fn landed_cost(sale_price: i64, policy: &PricingPolicy) -> Result<i64, PricingError> {
    let sale = Decimal::from(sale_price);
    let shipping = match policy.free_shipping_threshold {
        Some(threshold) if sale >= threshold => Decimal::ZERO,
        _ => policy.shipping_fee,
    };
    let cost = Decimal::ONE
        .checked_add(policy.source_tax_rate)
        .and_then(|tax_factor| sale.checked_div(tax_factor))
        .and_then(|pre_tax| pre_tax.checked_add(shipping))
        .and_then(|with_shipping| with_shipping.checked_mul(policy.duty_rate))
        .ok_or(PricingError::OutOfRange(sale))?;
    round_whole(cost)
}

fn baseline_increment(cost: i64, policy: &PricingPolicy) -> Result<Decimal, PricingError> {
    let cost = Decimal::from(cost);
    let tiers = (cost / Decimal::from(TIER_SPAN)).floor();
    let tier = tiers
        .checked_mul(Decimal::from(TIER_STEP))
        .and_then(|tier| tier.checked_add(policy.base_increment))
        .ok_or(PricingError::OutOfRange(cost))?;
    let proportional = cost
        .checked_mul(policy.profit_rate)
        .ok_or(PricingError::OutOfRange(cost))?
        .ceil();
    Ok(tier.max(proportional))
}

fn round_up_to_step(price: Decimal) -> Result<i64, PricingError> {
    let step = Decimal::from(PRICE_STEP);
    let rounded = (price / step)
        .ceil()
        .checked_mul(step)
        .ok_or(PricingError::OutOfRange(price))?;
    rounded
        .to_i64()
        .ok_or(PricingError::OutOfRange(rounded))
}

/// Rounds to whole currency units, half to even.
fn round_whole(amount: Decimal) -> Result<i64, PricingError> {
    let rounded = amount.round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven);
    rounded
        .to_i64()
        .ok_or_else(|| PricingError::OutOfRange(rounded))
}

#[cfg(test)]
#[path = "pricing_test.rs"]
mod tests;
