use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{FuturesUnordered, StreamExt};
use num_bigint::BigUint;
use num_traits::Zero;
use tokio::task::spawn_blocking;
use tracing::{debug, info, warn};

use crate::models::pool::{Pool, PoolState, FEE_BPS_DENOMINATOR};
use crate::models::quote::{AmountQuote, QuoteOutcome, RawQuote, RouteQuotes, TradeDirection};
use crate::models::route::Route;
use crate::models::token::Token;

use super::error::QuoteProviderError;
use super::providers::QuoteProvider;

/// Quotes routes from the pools' own state. Constant-product pools use the
/// x*y=k formula with the pool fee; concentrated pools are priced on the
/// virtual reserves of their active range and report no tick crossings.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReserveQuoteProvider;

#[async_trait]
impl QuoteProvider for ReserveQuoteProvider {
    async fn get_quotes(
        &self,
        routes: &[Arc<Route>],
        amounts: &[BigUint],
        direction: TradeDirection,
    ) -> Result<Vec<RouteQuotes>, QuoteProviderError> {
        let routes = routes.to_vec();
        let amounts = amounts.to_vec();
        spawn_blocking(move || {
            routes
                .into_iter()
                .map(|route| quote_route(route, &amounts, direction))
                .collect::<Vec<_>>()
        })
        .await
        .map_err(|err| QuoteProviderError::Unavailable(format!("quote computation panicked: {err}")))
    }
}

fn quote_route(route: Arc<Route>, amounts: &[BigUint], direction: TradeDirection) -> RouteQuotes {
    let quotes = amounts
        .iter()
        .map(|amount| {
            let outcome = match direction {
                TradeDirection::ExactInput => quote_exact_input(&route, amount),
                TradeDirection::ExactOutput => quote_exact_output(&route, amount),
            }
            .map(|quote| RawQuote {
                quote,
                initialized_ticks_crossed: ticks_crossed(&route),
            })
            .map_or(QuoteOutcome::NoLiquidity, QuoteOutcome::Quoted);
            AmountQuote {
                amount: amount.clone(),
                outcome,
            }
        })
        .collect();
    RouteQuotes { route, quotes }
}

fn ticks_crossed(route: &Route) -> Vec<u32> {
    route
        .pools()
        .iter()
        .filter(|pool| matches!(pool.state, PoolState::Concentrated { .. }))
        .map(|_| 0)
        .collect()
}

fn quote_exact_input(route: &Route, amount_in: &BigUint) -> Option<BigUint> {
    let path = route.token_path();
    let mut amount = amount_in.clone();
    for (index, pool) in route.pools().iter().enumerate() {
        amount = amount_out(pool, &path[index], &amount)?;
    }
    Some(amount)
}

fn quote_exact_output(route: &Route, amount_out: &BigUint) -> Option<BigUint> {
    let path = route.token_path();
    let mut amount = amount_out.clone();
    for (index, pool) in route.pools().iter().enumerate().rev() {
        amount = amount_in(pool, &path[index], &amount)?;
    }
    Some(amount)
}

fn fee_multiplier(pool: &Pool) -> Option<BigUint> {
    FEE_BPS_DENOMINATOR
        .checked_sub(pool.fee_bps)
        .filter(|multiplier| *multiplier > 0)
        .map(BigUint::from)
}

fn amount_out(pool: &Pool, token_in: &Token, amount_in: &BigUint) -> Option<BigUint> {
    let (reserve_in, reserve_out) = pool.reserves_for(token_in)?;
    if amount_in.is_zero() || reserve_in.is_zero() || reserve_out.is_zero() {
        return None;
    }
    let in_with_fee = amount_in * fee_multiplier(pool)?;
    let numerator = &in_with_fee * &reserve_out;
    let denominator = reserve_in * BigUint::from(FEE_BPS_DENOMINATOR) + in_with_fee;
    let out = numerator / denominator;
    (!out.is_zero()).then_some(out)
}

fn amount_in(pool: &Pool, token_in: &Token, amount_out: &BigUint) -> Option<BigUint> {
    let (reserve_in, reserve_out) = pool.reserves_for(token_in)?;
    if amount_out.is_zero() || reserve_in.is_zero() || *amount_out >= reserve_out {
        return None;
    }
    let numerator = reserve_in * amount_out * BigUint::from(FEE_BPS_DENOMINATOR);
    let denominator = (reserve_out - amount_out) * fee_multiplier(pool)?;
    Some(numerator / denominator + 1u32)
}

/// Fetches quotes for every route and amount, `batch_size` routes per call,
/// with all batches in flight at once. A batch that fails or overruns
/// `batch_timeout` comes back as `NoLiquidity` for each of its routes.
/// Output keeps the order of `routes`.
pub async fn acquire_quotes(
    provider: &dyn QuoteProvider,
    routes: &[Arc<Route>],
    amounts: &[BigUint],
    direction: TradeDirection,
    batch_size: usize,
    batch_timeout: Duration,
) -> Vec<RouteQuotes> {
    let batch_size = batch_size.max(1);
    let batches: Vec<&[Arc<Route>]> = routes.chunks(batch_size).collect();

    let mut tasks = FuturesUnordered::new();
    for (index, batch) in batches.iter().enumerate() {
        tasks.push(async move {
            let result = match tokio::time::timeout(
                batch_timeout,
                provider.get_quotes(batch, amounts, direction),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(QuoteProviderError::Timeout(batch_timeout.as_millis() as u64)),
            };
            (index, result)
        });
    }

    let mut results: Vec<Option<Vec<RouteQuotes>>> = vec![None; batches.len()];
    let mut failed_batches = 0usize;
    while let Some((index, result)) = tasks.next().await {
        match result {
            Ok(quotes) => results[index] = Some(quotes),
            Err(err) => {
                failed_batches += 1;
                warn!(
                    event = "quote_batch_failed",
                    batch = index,
                    routes = batches[index].len(),
                    error = %err,
                    "Quote batch failed; treating its routes as unquoted"
                );
            }
        }
    }

    let mut quoted = Vec::with_capacity(routes.len());
    for (batch, result) in batches.iter().zip(results) {
        let mut returned = result.unwrap_or_default();
        for route in batch.iter() {
            let position = returned
                .iter()
                .position(|entry| Arc::ptr_eq(&entry.route, route) || entry.route == *route);
            let entry = match position {
                Some(position) => returned.swap_remove(position),
                None => RouteQuotes::unavailable(Arc::clone(route), amounts),
            };
            quoted.push(align_to_amounts(entry, amounts));
        }
    }

    let valid = quoted
        .iter()
        .flat_map(|entry| entry.quotes.iter())
        .filter(|quote| matches!(quote.outcome, QuoteOutcome::Quoted(_)))
        .count();
    info!(
        routes = routes.len(),
        amounts = amounts.len(),
        batches = batches.len(),
        failed_batches,
        valid_quotes = valid,
        "Quotes acquired"
    );
    quoted
}

/// One outcome per requested amount, in request order. Amounts the provider
/// skipped count as `NoLiquidity`.
fn align_to_amounts(entry: RouteQuotes, amounts: &[BigUint]) -> RouteQuotes {
    if entry.quotes.len() == amounts.len()
        && entry
            .quotes
            .iter()
            .zip(amounts)
            .all(|(quote, amount)| quote.amount == *amount)
    {
        return entry;
    }
    debug!(route = %entry.route, "Provider response did not match requested amounts");
    let RouteQuotes { route, mut quotes } = entry;
    let aligned = amounts
        .iter()
        .map(|amount| {
            quotes
                .iter()
                .position(|quote| quote.amount == *amount)
                .map(|position| quotes.swap_remove(position))
                .unwrap_or_else(|| AmountQuote {
                    amount: amount.clone(),
                    outcome: QuoteOutcome::NoLiquidity,
                })
        })
        .collect();
    RouteQuotes {
        route,
        quotes: aligned,
    }
}
