use std::sync::Arc;

use num_bigint::BigUint;
use tracing::{debug, error};

use crate::models::chain::ChainConfig;
use crate::models::pool::Pool;
use crate::models::protocol::ProtocolFamily;
use crate::models::quote::GasCostEstimate;
use crate::models::route::Route;
use crate::models::token::{Price, Token, TokenAmount};

use super::error::RouterError;
use super::observer::RoutingObserver;
use super::providers::PoolProvider;

// Constant-product venues: fixed swap cost plus a cost per extra pool.
const CP_BASE_SWAP_COST: u64 = 115_000;
const CP_COST_PER_EXTRA_HOP: u64 = 20_000;

// Concentrated venues: fixed overhead, a cost per pool, and a cost per
// initialized tick crossed.
const CL_BASE_SWAP_COST: u64 = 2_000;
const CL_COST_PER_HOP: u64 = 80_000;
const CL_COST_PER_INIT_TICK: u64 = 31_000;

/// Gas units needed to execute a swap along a route.
pub trait GasHeuristic: Send + Sync {
    fn family(&self) -> ProtocolFamily;

    fn gas_units(&self, route: &Route, initialized_ticks_crossed: &[u32]) -> u64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ConstantProductGasHeuristic;

impl GasHeuristic for ConstantProductGasHeuristic {
    fn family(&self) -> ProtocolFamily {
        ProtocolFamily::ConstantProduct
    }

    fn gas_units(&self, route: &Route, _initialized_ticks_crossed: &[u32]) -> u64 {
        let extra_hops = route.hops().saturating_sub(1) as u64;
        CP_BASE_SWAP_COST.saturating_add(CP_COST_PER_EXTRA_HOP.saturating_mul(extra_hops))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ConcentratedGasHeuristic;

impl GasHeuristic for ConcentratedGasHeuristic {
    fn family(&self) -> ProtocolFamily {
        ProtocolFamily::Concentrated
    }

    fn gas_units(&self, route: &Route, initialized_ticks_crossed: &[u32]) -> u64 {
        // Unknown tick counts are charged as a single crossing.
        let ticks = initialized_ticks_crossed
            .iter()
            .map(|ticks| u64::from(*ticks))
            .sum::<u64>()
            .max(1);
        let hops = route.hops() as u64;
        CL_BASE_SWAP_COST
            .saturating_add(CL_COST_PER_HOP.saturating_mul(hops))
            .saturating_add(CL_COST_PER_INIT_TICK.saturating_mul(ticks))
    }
}

pub fn heuristic_for(family: ProtocolFamily) -> Arc<dyn GasHeuristic> {
    match family {
        ProtocolFamily::ConstantProduct => Arc::new(ConstantProductGasHeuristic),
        ProtocolFamily::Concentrated => Arc::new(ConcentratedGasHeuristic),
    }
}

/// Prices a route's gas in native units, the quote token, and USD. Reference
/// prices are fetched once in `build` and reused for every estimate.
pub struct GasModel {
    heuristic: Arc<dyn GasHeuristic>,
    gas_price_wei: BigUint,
    native: Token,
    quote_token: Token,
    usd_token: Token,
    native_in_usd: Price,
    // None when the quote token has no pool against the native token.
    native_in_quote: Option<Price>,
}

impl GasModel {
    pub async fn build(
        heuristic: Arc<dyn GasHeuristic>,
        chain: &ChainConfig,
        gas_price_wei: BigUint,
        pool_provider: &dyn PoolProvider,
        quote_token: &Token,
        observer: &dyn RoutingObserver,
    ) -> Result<Self, RouterError> {
        let native = chain.wrapped_native.clone();
        let family = heuristic.family();

        let usd_pool = highest_liquidity_usd_pool(chain, family, pool_provider).await?;
        let native_in_usd = usd_pool.mid_price(&native).ok_or_else(|| {
            RouterError::missing_reference_pool(format!(
                "USD/{} pool {} has no usable price",
                native.symbol, usd_pool.address
            ))
        })?;
        let usd_token = native_in_usd.quote.clone();

        let native_in_quote = if quote_token.same_as(&native) {
            None
        } else {
            let pool =
                highest_liquidity_native_pool(&native, quote_token, family, pool_provider).await?;
            match pool.and_then(|pool| pool.mid_price(&native)) {
                Some(price) => Some(price),
                None => {
                    observer.on_gas_degraded(quote_token, &native);
                    None
                }
            }
        };

        debug!(
            family = ?family,
            usd_pool = %usd_pool.address,
            usd_token = %usd_token,
            quote_token = %quote_token,
            degraded = !quote_token.same_as(&native) && native_in_quote.is_none(),
            "Built gas model"
        );

        Ok(Self {
            heuristic,
            gas_price_wei,
            native,
            quote_token: quote_token.clone(),
            usd_token,
            native_in_usd,
            native_in_quote,
        })
    }

    pub fn family(&self) -> ProtocolFamily {
        self.heuristic.family()
    }

    pub fn estimate_gas_cost(&self, route: &Route, initialized_ticks_crossed: &[u32]) -> GasCostEstimate {
        let gas_estimate = self.heuristic.gas_units(route, initialized_ticks_crossed);
        let cost_native = &self.gas_price_wei * BigUint::from(gas_estimate);

        let gas_cost_in_usd =
            TokenAmount::new(self.usd_token.clone(), self.native_in_usd.quote(&cost_native));

        let gas_cost_in_token = if self.quote_token.same_as(&self.native) {
            TokenAmount::new(self.quote_token.clone(), cost_native)
        } else {
            match &self.native_in_quote {
                Some(price) => TokenAmount::new(self.quote_token.clone(), price.quote(&cost_native)),
                None => TokenAmount::zero(self.quote_token.clone()),
            }
        };

        GasCostEstimate {
            gas_estimate,
            gas_cost_in_token,
            gas_cost_in_usd,
        }
    }
}

async fn highest_liquidity_usd_pool(
    chain: &ChainConfig,
    family: ProtocolFamily,
    pool_provider: &dyn PoolProvider,
) -> Result<Arc<Pool>, RouterError> {
    let native = &chain.wrapped_native;
    if chain.usd_gas_tokens.is_empty() {
        return Err(RouterError::missing_reference_pool(format!(
            "Could not find a USD token for computing gas costs on chain {}",
            chain.chain_id
        )));
    }

    let pairs: Vec<_> = chain
        .usd_gas_tokens
        .iter()
        .map(|usd| (native.clone(), usd.clone()))
        .collect();
    let accessor = pool_provider.get_pools(&pairs).await?;

    let best = chain
        .usd_gas_tokens
        .iter()
        .flat_map(|usd| accessor.pools_for(native, usd))
        .filter(|pool| pool.protocol.family() == family && pool.mid_price(native).is_some())
        .max_by_key(|pool| pool.liquidity_weight(native));

    best.ok_or_else(|| {
        error!(
            chain_id = chain.chain_id,
            family = ?family,
            "Could not find a USD/{} pool for computing gas costs",
            native.symbol
        );
        RouterError::missing_reference_pool(format!(
            "Can't find USD/{} pool for computing gas costs",
            native.symbol
        ))
    })
}

async fn highest_liquidity_native_pool(
    native: &Token,
    token: &Token,
    family: ProtocolFamily,
    pool_provider: &dyn PoolProvider,
) -> Result<Option<Arc<Pool>>, RouterError> {
    let accessor = pool_provider
        .get_pools(&[(native.clone(), token.clone())])
        .await?;
    Ok(accessor
        .pools_for(native, token)
        .into_iter()
        .filter(|pool| pool.protocol.family() == family)
        .max_by_key(|pool| pool.liquidity_weight(native)))
}
