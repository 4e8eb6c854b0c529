use serde::{Deserialize, Serialize};

use crate::models::protocol::ProtocolKind;
use crate::models::quote::{QuoteRecord, TradeDirection};
use crate::services::error::RouterError;
use crate::services::router::SwapRoute;
use crate::services::trade::{EncodedTrade, ExecutionConfig, TradeHop, TradeLeg};

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RouteRequest {
    pub request_id: String,
    pub token_in: String,
    pub token_out: String,
    /// Raw integer amount in the fixed token's smallest unit: `token_in` for
    /// exact-input requests, `token_out` when `exact_out` is set.
    pub amount: String,
    #[serde(default)]
    pub exact_out: bool,
    #[serde(default)]
    pub min_splits: Option<usize>,
    #[serde(default)]
    pub max_splits: Option<usize>,
    #[serde(default)]
    pub distribution_percent: Option<u8>,
    #[serde(default)]
    pub max_hops: Option<usize>,
    #[serde(default)]
    pub protocols: Option<Vec<String>>,
    #[serde(default)]
    pub force_cross_protocol: Option<bool>,
    #[serde(default)]
    pub execution: Option<ExecutionConfig>,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RouteStatus {
    Ok,
    NoRoute,
    Error,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteResponse {
    pub request_id: String,
    pub status: RouteStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<PlanPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trade: Option<TradePayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorPayload>,
}

impl RouteResponse {
    pub fn routed(request_id: String, route: &SwapRoute) -> Self {
        Self {
            request_id,
            status: RouteStatus::Ok,
            plan: Some(PlanPayload::from_route(route)),
            trade: route.trade.as_ref().map(TradePayload::from_trade),
            error: None,
        }
    }

    pub fn no_route(request_id: String) -> Self {
        Self {
            request_id,
            status: RouteStatus::NoRoute,
            plan: None,
            trade: None,
            error: None,
        }
    }

    pub fn failed(request_id: String, kind: &str, message: impl Into<String>) -> Self {
        Self {
            request_id,
            status: RouteStatus::Error,
            plan: None,
            trade: None,
            error: Some(ErrorPayload {
                kind: kind.to_string(),
                message: message.into(),
            }),
        }
    }

    pub fn from_error(request_id: String, err: &RouterError) -> Self {
        Self::failed(request_id, err.kind().label(), err.message())
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct ErrorPayload {
    pub kind: String,
    pub message: String,
}

/// Wire form of a winning plan. Amounts are decimal strings of raw units.
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PlanPayload {
    pub direction: TradeDirection,
    pub token_in: String,
    pub token_out: String,
    pub amount: String,
    pub quote: String,
    pub quote_gas_adjusted: String,
    pub estimated_gas_used: u64,
    pub estimated_gas_used_usd: String,
    pub usd_token: String,
    pub estimated_gas_used_quote_token: String,
    pub gas_price_wei: String,
    pub routes_considered: usize,
    pub splits: Vec<SplitPayload>,
}

impl PlanPayload {
    pub fn from_route(route: &SwapRoute) -> Self {
        let plan = &route.plan;
        let (token_in, token_out) = match plan.records.first() {
            Some(record) => (
                record.route().token_in().address.to_string(),
                record.route().token_out().address.to_string(),
            ),
            None => (String::new(), String::new()),
        };
        Self {
            direction: plan.direction,
            token_in,
            token_out,
            amount: plan.amount.raw.to_string(),
            quote: plan.quote.raw.to_string(),
            quote_gas_adjusted: plan.quote_gas_adjusted.to_string(),
            estimated_gas_used: plan.estimated_gas_used,
            estimated_gas_used_usd: plan.estimated_gas_used_usd.raw.to_string(),
            usd_token: plan.estimated_gas_used_usd.token.address.to_string(),
            estimated_gas_used_quote_token: plan.estimated_gas_used_quote_token.raw.to_string(),
            gas_price_wei: route.gas_price_wei.to_string(),
            routes_considered: route.routes_considered,
            splits: plan.records.iter().map(SplitPayload::from_record).collect(),
        }
    }
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SplitPayload {
    pub percent: u8,
    pub protocol: ProtocolKind,
    pub route: String,
    pub path: Vec<String>,
    pub pools: Vec<String>,
    pub amount: String,
    pub quote: String,
    pub quote_gas_adjusted: String,
    pub gas_estimate: u64,
    pub gas_cost_in_token: String,
    pub gas_cost_in_usd: String,
    pub initialized_ticks_crossed: Vec<u32>,
}

impl SplitPayload {
    fn from_record(record: &QuoteRecord) -> Self {
        Self {
            percent: record.percent().value(),
            protocol: record.protocol(),
            route: record.route().to_string(),
            path: record
                .route()
                .token_path()
                .iter()
                .map(|token| token.address.to_string())
                .collect(),
            pools: record
                .pool_addresses()
                .iter()
                .map(ToString::to_string)
                .collect(),
            amount: record.amount().raw.to_string(),
            quote: record.raw_quote().raw.to_string(),
            quote_gas_adjusted: record.quote_adjusted_for_gas().to_string(),
            gas_estimate: record.gas_estimate(),
            gas_cost_in_token: record.gas_cost_in_token().raw.to_string(),
            gas_cost_in_usd: record.gas_cost_in_usd().raw.to_string(),
            initialized_ticks_crossed: record.initialized_ticks_crossed().to_vec(),
        }
    }
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TradePayload {
    pub recipient: String,
    pub amount: String,
    /// Minimum total output for exact-input trades, maximum total input for
    /// exact-output trades.
    pub limit: String,
    pub slippage_bps: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<u64>,
    pub legs: Vec<TradeLegPayload>,
}

impl TradePayload {
    pub fn from_trade(trade: &EncodedTrade) -> Self {
        Self {
            recipient: trade.recipient.to_string(),
            amount: trade.amount.to_string(),
            limit: trade.limit.to_string(),
            slippage_bps: trade.slippage_bps,
            deadline: trade.deadline,
            legs: trade.legs.iter().map(TradeLegPayload::from_leg).collect(),
        }
    }
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TradeLegPayload {
    pub share_bps: u32,
    pub amount: String,
    pub quote: String,
    pub limit: String,
    pub hops: Vec<TradeHopPayload>,
}

impl TradeLegPayload {
    fn from_leg(leg: &TradeLeg) -> Self {
        Self {
            share_bps: leg.share_bps,
            amount: leg.amount.to_string(),
            quote: leg.quote.to_string(),
            limit: leg.limit.to_string(),
            hops: leg.hops.iter().map(TradeHopPayload::from_hop).collect(),
        }
    }
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TradeHopPayload {
    pub pool: String,
    pub protocol: ProtocolKind,
    pub fee_bps: u32,
    pub token_in: String,
    pub token_out: String,
}

impl TradeHopPayload {
    fn from_hop(hop: &TradeHop) -> Self {
        Self {
            pool: hop.pool.to_string(),
            protocol: hop.protocol,
            fee_bps: hop.fee_bps,
            token_in: hop.token_in.to_string(),
            token_out: hop.token_out.to_string(),
        }
    }
}
