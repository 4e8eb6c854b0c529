use alloy_primitives::Address;
use num_bigint::BigUint;
use num_traits::Zero;
use serde::Deserialize;
use tracing::debug;

use crate::models::protocol::ProtocolKind;
use crate::models::quote::{QuoteRecord, SwapPlan, TradeDirection};
use crate::models::token::Token;

use super::error::RouterError;

pub const BPS_DENOMINATOR: u32 = 10_000;

/// Caller-side execution parameters for turning a plan into a trade.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionConfig {
    pub recipient: Address,
    pub slippage_bps: u32,
    /// Unix timestamp after which the trade must not execute.
    #[serde(default)]
    pub deadline: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeHop {
    pub pool: Address,
    pub protocol: ProtocolKind,
    pub fee_bps: u32,
    pub token_in: Address,
    pub token_out: Address,
}

/// One split of the trade. `limit` is the minimum output for exact-input
/// trades and the maximum input for exact-output trades.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeLeg {
    pub share_bps: u32,
    pub amount: BigUint,
    pub quote: BigUint,
    pub limit: BigUint,
    pub hops: Vec<TradeHop>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedTrade {
    pub direction: TradeDirection,
    pub token_in: Token,
    pub token_out: Token,
    pub amount: BigUint,
    pub limit: BigUint,
    pub recipient: Address,
    pub slippage_bps: u32,
    pub deadline: Option<u64>,
    pub legs: Vec<TradeLeg>,
}

/// Turns a chosen plan into something executable.
#[cfg_attr(test, mockall::automock)]
pub trait TradeBuilder: Send + Sync {
    fn build(&self, plan: &SwapPlan, execution: &ExecutionConfig) -> Result<EncodedTrade, RouterError>;
}

/// Splits the trade by basis points of the total, one leg per plan record.
#[derive(Debug, Default, Clone, Copy)]
pub struct SplitTradeBuilder;

impl TradeBuilder for SplitTradeBuilder {
    fn build(&self, plan: &SwapPlan, execution: &ExecutionConfig) -> Result<EncodedTrade, RouterError> {
        if execution.slippage_bps > BPS_DENOMINATOR {
            return Err(RouterError::encoding(format!(
                "slippage_bps must be <= {BPS_DENOMINATOR}, got {}",
                execution.slippage_bps
            )));
        }
        let first = plan
            .records
            .first()
            .ok_or_else(|| RouterError::encoding("plan has no routes"))?;
        if plan.amount.is_zero() {
            return Err(RouterError::encoding("plan amount must be greater than zero"));
        }

        let amounts: Vec<&BigUint> = plan.records.iter().map(|record| &record.amount().raw).collect();
        let shares = shares_by_bps(&plan.amount.raw, &amounts)?;

        let legs: Vec<TradeLeg> = plan
            .records
            .iter()
            .zip(shares)
            .map(|(record, share_bps)| TradeLeg {
                share_bps,
                amount: record.amount().raw.clone(),
                quote: record.raw_quote().raw.clone(),
                limit: slippage_limit(plan.direction, &record.raw_quote().raw, execution.slippage_bps),
                hops: hops_of(record),
            })
            .collect();
        let limit: BigUint = legs.iter().map(|leg| &leg.limit).sum();

        let trade = EncodedTrade {
            direction: plan.direction,
            token_in: first.route().token_in().clone(),
            token_out: first.route().token_out().clone(),
            amount: plan.amount.raw.clone(),
            limit,
            recipient: execution.recipient,
            slippage_bps: execution.slippage_bps,
            deadline: execution.deadline,
            legs,
        };
        debug!(
            legs = trade.legs.len(),
            limit = %trade.limit,
            slippage_bps = trade.slippage_bps,
            "Built split trade"
        );
        Ok(trade)
    }
}

/// Share of `total` held by each amount, in basis points. The last entry
/// takes the remainder so shares always sum to 10 000.
fn shares_by_bps(total: &BigUint, amounts: &[&BigUint]) -> Result<Vec<u32>, RouterError> {
    let last_index = amounts.len().saturating_sub(1);
    let mut allocated: u32 = 0;
    let mut shares = Vec::with_capacity(amounts.len());

    for (index, amount) in amounts.iter().enumerate() {
        if index < last_index {
            let share = (*amount * BigUint::from(BPS_DENOMINATOR)) / total;
            let share = u32::try_from(share)
                .ok()
                .filter(|share| *share > 0 && *share < BPS_DENOMINATOR)
                .ok_or_else(|| {
                    RouterError::encoding(format!(
                        "leg {index} does not map to a share between 1 and 9999 bps"
                    ))
                })?;
            allocated = allocated.saturating_add(share);
            shares.push(share);
        } else {
            let remainder = BPS_DENOMINATOR.checked_sub(allocated).filter(|rest| *rest > 0);
            let remainder = remainder.ok_or_else(|| {
                RouterError::encoding("legs leave no share for the last route")
            })?;
            shares.push(remainder);
        }
    }
    Ok(shares)
}

fn slippage_limit(direction: TradeDirection, quote: &BigUint, slippage_bps: u32) -> BigUint {
    let denominator = BigUint::from(BPS_DENOMINATOR);
    match direction {
        TradeDirection::ExactInput => {
            quote * BigUint::from(BPS_DENOMINATOR - slippage_bps) / denominator
        }
        TradeDirection::ExactOutput => {
            let scaled = quote * BigUint::from(BPS_DENOMINATOR + slippage_bps);
            let limit = &scaled / &denominator;
            if (&limit * &denominator) == scaled {
                limit
            } else {
                limit + 1u32
            }
        }
    }
}

fn hops_of(record: &QuoteRecord) -> Vec<TradeHop> {
    let route = record.route();
    route
        .pools()
        .iter()
        .zip(route.token_path().windows(2))
        .map(|(pool, tokens)| TradeHop {
            pool: pool.address,
            protocol: pool.protocol,
            fee_bps: pool.fee_bps,
            token_in: tokens[0].address,
            token_out: tokens[1].address,
        })
        .collect()
}

impl EncodedTrade {
    pub fn total_shares_bps(&self) -> u32 {
        self.legs.iter().map(|leg| leg.share_bps).sum()
    }
}
