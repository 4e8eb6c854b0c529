use std::str::FromStr;
use std::time::Instant;

use alloy_primitives::Address;
use axum::{extract::State, http::StatusCode, Json};
use num_bigint::BigUint;
use tracing::{debug, info, warn};

use crate::{
    metrics::{emit_route_completion, emit_route_timeout},
    models::{
        messages::{RouteRequest, RouteResponse, RouteStatus},
        protocol::ProtocolKind,
        quote::{Percent, TradeDirection},
        state::AppState,
        token::{Token, TokenAmount},
    },
    services::search::SearchConfig,
};

const INVALID_REQUEST: &str = "invalid_request";
const TIMEOUT: &str = "timeout";

// Upper bounds on per-request search knobs; the BFS grows combinatorially in both.
pub const MAX_REQUEST_SPLITS: usize = 7;
pub const MIN_REQUEST_DISTRIBUTION_PERCENT: u8 = 5;

/// Inputs of one routing call, resolved from the wire request.
#[derive(Debug)]
struct RouteParams {
    amount: TokenAmount,
    other_token: Token,
    direction: TradeDirection,
    search: SearchConfig,
}

pub async fn post_route(
    State(state): State<AppState>,
    Json(request): Json<RouteRequest>,
) -> (StatusCode, Json<RouteResponse>) {
    let started_at = Instant::now();
    let request_id = request.request_id.clone();

    debug!(
        request_id = request_id.as_str(),
        token_in = request.token_in.as_str(),
        token_out = request.token_out.as_str(),
        amount = request.amount.as_str(),
        exact_out = request.exact_out,
        "Received route request"
    );

    let params = match resolve_params(&state, &request) {
        Ok(params) => params,
        Err(message) => {
            info!(
                scope = "handler_invalid",
                request_id = request_id.as_str(),
                error = message.as_str(),
                "Rejected route request"
            );
            emit_route_completion(RouteStatus::Error, 0);
            return (
                StatusCode::BAD_REQUEST,
                Json(RouteResponse::failed(request_id, INVALID_REQUEST, message)),
            );
        }
    };

    let request_timeout = state.request_timeout();
    let routing = state.router.route(
        params.amount,
        params.other_token,
        params.direction,
        request.execution.as_ref(),
        &params.search,
    );

    let outcome = match tokio::time::timeout(request_timeout, routing).await {
        Ok(outcome) => outcome,
        Err(_) => {
            let timeout_ms = request_timeout.as_millis() as u64;
            warn!(
                scope = "handler_timeout",
                request_id = request_id.as_str(),
                latency_ms = started_at.elapsed().as_millis() as u64,
                timeout_ms,
                "Route request timed out at request-level guard"
            );
            emit_route_timeout();
            emit_route_completion(RouteStatus::Error, 0);
            return (
                StatusCode::GATEWAY_TIMEOUT,
                Json(RouteResponse::failed(
                    request_id,
                    TIMEOUT,
                    format!("Route request timed out after {timeout_ms}ms"),
                )),
            );
        }
    };

    let latency_ms = started_at.elapsed().as_millis() as u64;
    match outcome {
        Ok(Some(route)) => {
            let splits = route.plan.splits();
            info!(
                scope = "handler_complete",
                request_id = request_id.as_str(),
                latency_ms,
                splits,
                routes_considered = route.routes_considered,
                quote = %route.plan.quote.raw,
                quote_gas_adjusted = %route.plan.quote_gas_adjusted,
                estimated_gas_used = route.plan.estimated_gas_used,
                trade = route.trade.is_some(),
                "Route request completed"
            );
            emit_route_completion(RouteStatus::Ok, splits);
            (
                StatusCode::OK,
                Json(RouteResponse::routed(request_id, &route)),
            )
        }
        Ok(None) => {
            info!(
                scope = "handler_no_route",
                request_id = request_id.as_str(),
                latency_ms,
                "No route found"
            );
            emit_route_completion(RouteStatus::NoRoute, 0);
            (StatusCode::OK, Json(RouteResponse::no_route(request_id)))
        }
        Err(err) => {
            warn!(
                scope = "handler_error",
                request_id = request_id.as_str(),
                latency_ms,
                kind = err.kind().label(),
                error = err.message(),
                "Route request failed"
            );
            emit_route_completion(RouteStatus::Error, 0);
            (
                err.status_code(),
                Json(RouteResponse::from_error(request_id, &err)),
            )
        }
    }
}

fn resolve_params(state: &AppState, request: &RouteRequest) -> Result<RouteParams, String> {
    let token_in = resolve_token(state, "tokenIn", &request.token_in)?;
    let token_out = resolve_token(state, "tokenOut", &request.token_out)?;
    let raw = BigUint::from_str(request.amount.trim())
        .map_err(|err| format!("invalid amount '{}': {err}", request.amount))?;

    let (direction, fixed, other_token) = if request.exact_out {
        (TradeDirection::ExactOutput, token_out, token_in)
    } else {
        (TradeDirection::ExactInput, token_in, token_out)
    };

    Ok(RouteParams {
        amount: TokenAmount::new(fixed, raw),
        other_token,
        direction,
        search: search_overrides(state.default_search.clone(), request)?,
    })
}

fn resolve_token(state: &AppState, field: &str, value: &str) -> Result<Token, String> {
    let address = Address::from_str(value.trim())
        .map_err(|err| format!("invalid {field} address '{value}': {err}"))?;
    state
        .token(&address)
        .ok_or_else(|| format!("{field} {address} is not traded by any known pool"))
}

// Only the request caps are checked here; range checks are left to
// `SearchConfig::validate` inside the router.
fn search_overrides(
    mut search: SearchConfig,
    request: &RouteRequest,
) -> Result<SearchConfig, String> {
    if let Some(min_splits) = request.min_splits {
        search.min_splits = min_splits;
    }
    if let Some(max_splits) = request.max_splits {
        if max_splits > MAX_REQUEST_SPLITS {
            return Err(format!(
                "maxSplits {max_splits} exceeds the limit of {MAX_REQUEST_SPLITS}"
            ));
        }
        search.max_splits = max_splits;
    }
    if let Some(step) = request.distribution_percent {
        if step < MIN_REQUEST_DISTRIBUTION_PERCENT {
            return Err(format!(
                "distributionPercent {step} is below the minimum of {MIN_REQUEST_DISTRIBUTION_PERCENT}"
            ));
        }
        search.percents = Percent::distribution(step);
    }
    if let Some(max_hops) = request.max_hops {
        search.max_hops = max_hops;
    }
    if let Some(force) = request.force_cross_protocol {
        search.force_cross_protocol = force;
    }
    if let Some(protocols) = &request.protocols {
        search.protocols = ProtocolKind::parse_list(&protocols.join(","))?;
    }
    Ok(search)
}
