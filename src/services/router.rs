use std::sync::Arc;
use std::time::Duration;

use num_bigint::BigUint;
use num_traits::Zero;
use tokio::task::spawn_blocking;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::models::chain::ChainConfig;
use crate::models::protocol::ProtocolFamily;
use crate::models::quote::{QuoteOutcome, QuoteRecord, RouteQuotes, SwapPlan, TradeDirection};
use crate::models::token::{Token, TokenAmount};

use super::candidates::{candidate_pairs, compute_all_routes, filter_protocols};
use super::error::RouterError;
use super::gas::{heuristic_for, GasModel};
use super::observer::RoutingObserver;
use super::providers::{GasPriceSource, PoolProvider, QuoteProvider};
use super::quotes::acquire_quotes;
use super::search::{SearchConfig, SplitSearch};
use super::trade::{EncodedTrade, ExecutionConfig, TradeBuilder};

pub const DEFAULT_QUOTE_BATCH_SIZE: usize = 16;
pub const DEFAULT_QUOTE_TIMEOUT: Duration = Duration::from_secs(2);

/// A routed swap: the winning plan plus what was used to price it.
#[derive(Debug, Clone)]
pub struct SwapRoute {
    pub plan: SwapPlan,
    pub gas_price_wei: BigUint,
    pub routes_considered: usize,
    pub trade: Option<EncodedTrade>,
}

pub struct Router {
    chain: ChainConfig,
    pool_provider: Arc<dyn PoolProvider>,
    quote_provider: Arc<dyn QuoteProvider>,
    gas_price_source: Arc<dyn GasPriceSource>,
    trade_builder: Arc<dyn TradeBuilder>,
    observer: Arc<dyn RoutingObserver>,
    quote_batch_size: usize,
    quote_timeout: Duration,
}

impl Router {
    pub fn new(
        chain: ChainConfig,
        pool_provider: Arc<dyn PoolProvider>,
        quote_provider: Arc<dyn QuoteProvider>,
        gas_price_source: Arc<dyn GasPriceSource>,
        trade_builder: Arc<dyn TradeBuilder>,
        observer: Arc<dyn RoutingObserver>,
    ) -> Self {
        Self {
            chain,
            pool_provider,
            quote_provider,
            gas_price_source,
            trade_builder,
            observer,
            quote_batch_size: DEFAULT_QUOTE_BATCH_SIZE,
            quote_timeout: DEFAULT_QUOTE_TIMEOUT,
        }
    }

    pub fn with_quote_batching(mut self, batch_size: usize, timeout: Duration) -> Self {
        self.quote_batch_size = batch_size.max(1);
        self.quote_timeout = timeout;
        self
    }

    pub fn chain(&self) -> &ChainConfig {
        &self.chain
    }

    /// Routes `amount` against `other_token`. For exact-input trades `amount`
    /// is what is sold and `other_token` is bought; exact-output flips that.
    /// `Ok(None)` covers every "nothing to offer" case: no candidate routes,
    /// no valid quotes, or no split satisfying the search bounds.
    pub async fn route(
        &self,
        amount: TokenAmount,
        other_token: Token,
        direction: TradeDirection,
        execution: Option<&ExecutionConfig>,
        search: &SearchConfig,
    ) -> Result<Option<SwapRoute>, RouterError> {
        search.validate()?;
        if amount.is_zero() {
            return Err(RouterError::invalid_config("amount must be greater than zero"));
        }
        if amount.token.same_as(&other_token) {
            return Err(RouterError::invalid_config(
                "amount token and other token must differ",
            ));
        }

        let (token_in, token_out) = match direction {
            TradeDirection::ExactInput => (amount.token.clone(), other_token.clone()),
            TradeDirection::ExactOutput => (other_token.clone(), amount.token.clone()),
        };

        let pairs = candidate_pairs(&token_in, &token_out, &self.chain.base_tokens);
        let accessor = self.pool_provider.get_pools(&pairs).await?;
        let pools = filter_protocols(accessor.all_pools(), &search.protocols);
        let routes = compute_all_routes(&token_in, &token_out, &pools, search.max_hops);
        if routes.is_empty() {
            info!(
                token_in = %token_in.symbol,
                token_out = %token_out.symbol,
                pools = pools.len(),
                "No candidate routes"
            );
            return Ok(None);
        }

        let amounts: Vec<BigUint> = search
            .percents
            .iter()
            .map(|percent| percent.of(&amount.raw))
            .collect();
        let quotes = acquire_quotes(
            self.quote_provider.as_ref(),
            &routes,
            &amounts,
            direction,
            self.quote_batch_size,
            self.quote_timeout,
        )
        .await;

        let gas_price_wei = self.gas_price_source.current_price().await?;
        let records = self
            .build_records(&quotes, &amount, &other_token, direction, search, &gas_price_wei)
            .await?;
        if records.is_empty() {
            info!(routes = routes.len(), "No valid quotes for any route");
            return Ok(None);
        }

        let Some(plan) = self.search_splits(amount, search, records, direction).await? else {
            return Ok(None);
        };

        let trade = execution
            .map(|execution| self.trade_builder.build(&plan, execution))
            .transpose()?;

        Ok(Some(SwapRoute {
            plan,
            gas_price_wei,
            routes_considered: routes.len(),
            trade,
        }))
    }

    // The search is CPU bound, so it runs off the async workers. Dropping the
    // returned future (request guard expiry) cancels it at the next level.
    async fn search_splits(
        &self,
        amount: TokenAmount,
        search: &SearchConfig,
        records: Vec<QuoteRecord>,
        direction: TradeDirection,
    ) -> Result<Option<SwapPlan>, RouterError> {
        let cancel = CancellationToken::new();
        let _cancel_on_drop = cancel.clone().drop_guard();

        let config = search.clone();
        let chain = self.chain.clone();
        let observer = Arc::clone(&self.observer);
        let handle = spawn_blocking(move || {
            SplitSearch::new(&config, &chain, observer.as_ref())
                .with_cancellation(cancel)
                .best_swap_route(&amount, &config.percents, records, direction)
        });

        handle.await.map_err(|err| {
            warn!(error = %err, "Split search task failed");
            RouterError::internal(format!("split search task failed: {err}"))
        })?
    }

    async fn build_records(
        &self,
        quotes: &[RouteQuotes],
        amount: &TokenAmount,
        quote_token: &Token,
        direction: TradeDirection,
        search: &SearchConfig,
        gas_price_wei: &BigUint,
    ) -> Result<Vec<QuoteRecord>, RouterError> {
        // Gas models are only needed for families that produced a quote.
        let mut families: Vec<ProtocolFamily> = Vec::new();
        for entry in quotes {
            let family = entry.route.protocol().family();
            let has_quote = entry
                .quotes
                .iter()
                .any(|quote| matches!(quote.outcome, QuoteOutcome::Quoted(_)));
            if has_quote && !families.contains(&family) {
                families.push(family);
            }
        }

        let mut models = Vec::with_capacity(families.len());
        for family in families {
            let model = GasModel::build(
                heuristic_for(family),
                &self.chain,
                gas_price_wei.clone(),
                self.pool_provider.as_ref(),
                quote_token,
                self.observer.as_ref(),
            )
            .await?;
            models.push(model);
        }

        let mut records = Vec::new();
        for entry in quotes {
            let family = entry.route.protocol().family();
            let Some(model) = models.iter().find(|model| model.family() == family) else {
                continue;
            };
            for (percent, quote) in search.percents.iter().zip(&entry.quotes) {
                let QuoteOutcome::Quoted(raw) = &quote.outcome else {
                    continue;
                };
                if quote.amount.is_zero() {
                    continue;
                }
                let gas = model.estimate_gas_cost(&entry.route, &raw.initialized_ticks_crossed);
                records.push(QuoteRecord::new(
                    Arc::clone(&entry.route),
                    *percent,
                    TokenAmount::new(amount.token.clone(), quote.amount.clone()),
                    TokenAmount::new(quote_token.clone(), raw.quote.clone()),
                    raw.initialized_ticks_crossed.clone(),
                    gas,
                    direction,
                ));
            }
        }
        debug!(records = records.len(), "Built quote records");
        Ok(records)
    }
}
