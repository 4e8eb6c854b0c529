use std::fmt;
use std::sync::Arc;

use alloy_primitives::Address;
use num_bigint::{BigInt, BigUint};
use serde::{Deserialize, Serialize};

use super::protocol::ProtocolKind;
use super::route::Route;
use super::token::{Token, TokenAmount};

/// Share of the total trade amount, in whole percent within `1..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Percent(u8);

impl Percent {
    pub const FULL: Percent = Percent(100);

    pub fn new(value: u8) -> Option<Self> {
        (1..=100).contains(&value).then_some(Self(value))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// `step, 2*step, ...` up to and including 100 when `step` divides it.
    pub fn distribution(step: u8) -> Vec<Percent> {
        if step == 0 || step > 100 {
            return Vec::new();
        }
        (1..=100 / step).map(|i| Percent(i * step)).collect()
    }

    /// The slice of `total` this percent represents, floored.
    pub fn of(self, total: &BigUint) -> BigUint {
        (total * BigUint::from(self.0)) / BigUint::from(100u32)
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeDirection {
    /// Amount is the input; maximize the output.
    ExactInput,
    /// Amount is the output; minimize the input.
    ExactOutput,
}

impl TradeDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeDirection::ExactInput => "exact_input",
            TradeDirection::ExactOutput => "exact_output",
        }
    }
}

/// Output of a gas model for one route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GasCostEstimate {
    pub gas_estimate: u64,
    pub gas_cost_in_token: TokenAmount,
    pub gas_cost_in_usd: TokenAmount,
}

/// A venue quote for one (route, amount) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawQuote {
    pub quote: BigUint,
    pub initialized_ticks_crossed: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuoteOutcome {
    Quoted(RawQuote),
    NoLiquidity,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmountQuote {
    pub amount: BigUint,
    pub outcome: QuoteOutcome,
}

/// Every requested amount's outcome for a single route, in request order.
#[derive(Debug, Clone)]
pub struct RouteQuotes {
    pub route: Arc<Route>,
    pub quotes: Vec<AmountQuote>,
}

impl RouteQuotes {
    pub fn unavailable(route: Arc<Route>, amounts: &[BigUint]) -> Self {
        Self {
            route,
            quotes: amounts
                .iter()
                .map(|amount| AmountQuote {
                    amount: amount.clone(),
                    outcome: QuoteOutcome::NoLiquidity,
                })
                .collect(),
        }
    }
}

/// A gas-adjusted quote for one route at one percent of the trade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteRecord {
    route: Arc<Route>,
    percent: Percent,
    amount: TokenAmount,
    raw_quote: TokenAmount,
    gas_estimate: u64,
    gas_cost_in_token: TokenAmount,
    gas_cost_in_usd: TokenAmount,
    quote_adjusted_for_gas: BigInt,
    initialized_ticks_crossed: Vec<u32>,
    pool_addresses: Vec<Address>,
    protocol: ProtocolKind,
}

impl QuoteRecord {
    pub fn new(
        route: Arc<Route>,
        percent: Percent,
        amount: TokenAmount,
        raw_quote: TokenAmount,
        initialized_ticks_crossed: Vec<u32>,
        gas: GasCostEstimate,
        direction: TradeDirection,
    ) -> Self {
        let raw = BigInt::from(raw_quote.raw.clone());
        let gas_in_token = BigInt::from(gas.gas_cost_in_token.raw.clone());
        let quote_adjusted_for_gas = match direction {
            TradeDirection::ExactInput => raw - gas_in_token,
            TradeDirection::ExactOutput => raw + gas_in_token,
        };
        let pool_addresses = route.pool_addresses();
        let protocol = route.protocol();

        Self {
            route,
            percent,
            amount,
            raw_quote,
            gas_estimate: gas.gas_estimate,
            gas_cost_in_token: gas.gas_cost_in_token,
            gas_cost_in_usd: gas.gas_cost_in_usd,
            quote_adjusted_for_gas,
            initialized_ticks_crossed,
            pool_addresses,
            protocol,
        }
    }

    pub fn route(&self) -> &Arc<Route> {
        &self.route
    }

    pub fn percent(&self) -> Percent {
        self.percent
    }

    pub fn amount(&self) -> &TokenAmount {
        &self.amount
    }

    pub fn raw_quote(&self) -> &TokenAmount {
        &self.raw_quote
    }

    pub fn gas_estimate(&self) -> u64 {
        self.gas_estimate
    }

    pub fn gas_cost_in_token(&self) -> &TokenAmount {
        &self.gas_cost_in_token
    }

    pub fn gas_cost_in_usd(&self) -> &TokenAmount {
        &self.gas_cost_in_usd
    }

    pub fn quote_adjusted_for_gas(&self) -> &BigInt {
        &self.quote_adjusted_for_gas
    }

    pub fn initialized_ticks_crossed(&self) -> &[u32] {
        &self.initialized_ticks_crossed
    }

    pub fn pool_addresses(&self) -> &[Address] {
        &self.pool_addresses
    }

    pub fn protocol(&self) -> ProtocolKind {
        self.protocol
    }

    /// Copy of this record whose amount is increased by `extra`.
    pub(crate) fn with_extra_amount(&self, extra: &BigUint) -> Self {
        let mut record = self.clone();
        record.amount.raw += extra;
        record
    }
}

impl fmt::Display for QuoteRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} = {} (gas adjusted {})",
            self.percent, self.route, self.raw_quote.raw, self.quote_adjusted_for_gas
        )
    }
}

/// The winning split and its aggregated totals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapPlan {
    pub direction: TradeDirection,
    pub amount: TokenAmount,
    pub records: Vec<QuoteRecord>,
    pub quote: TokenAmount,
    pub quote_gas_adjusted: BigInt,
    pub estimated_gas_used: u64,
    pub estimated_gas_used_usd: TokenAmount,
    pub estimated_gas_used_quote_token: TokenAmount,
}

impl SwapPlan {
    pub fn splits(&self) -> usize {
        self.records.len()
    }

    pub fn quote_token(&self) -> &Token {
        &self.quote.token
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_bounds() {
        assert!(Percent::new(0).is_none());
        assert!(Percent::new(101).is_none());
        assert_eq!(Percent::new(100), Some(Percent::FULL));
    }

    #[test]
    fn distribution_steps() {
        let percents = Percent::distribution(25);
        let values: Vec<u8> = percents.iter().map(|p| p.value()).collect();
        assert_eq!(values, vec![25, 50, 75, 100]);
        assert_eq!(Percent::distribution(5).len(), 20);
        assert!(Percent::distribution(0).is_empty());
    }

    #[test]
    fn percent_of_floors() {
        let total = BigUint::from(999u32);
        assert_eq!(Percent::new(50).unwrap().of(&total), BigUint::from(499u32));
        assert_eq!(Percent::FULL.of(&total), total);
    }
}
