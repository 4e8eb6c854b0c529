use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashSet, VecDeque};
use std::time::Instant;

use alloy_primitives::Address;
use num_bigint::{BigInt, BigUint};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::models::chain::ChainConfig;
use crate::models::protocol::{ProtocolFamily, ProtocolKind};
use crate::models::quote::{Percent, QuoteRecord, SwapPlan, TradeDirection};
use crate::models::token::TokenAmount;

use super::error::RouterError;
use super::observer::{CandidateSummary, LevelReport, RoutingObserver, SearchSummary};

pub const DEFAULT_DISTRIBUTION_PERCENT: u8 = 5;
pub const DEFAULT_MIN_SPLITS: usize = 1;
pub const DEFAULT_MAX_SPLITS: usize = 3;
pub const DEFAULT_MAX_HOPS: usize = 3;
pub const DEFAULT_EARLY_STOP_LAG: Option<usize> = Some(1);

const TOP_CANDIDATES_PER_LEVEL: usize = 5;
// The early stop only kicks in once three-way splits are being considered.
const EARLY_STOP_MIN_SPLITS: usize = 3;

/// Knobs for one optimization call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchConfig {
    /// Allocations searched, strictly increasing.
    pub percents: Vec<Percent>,
    pub min_splits: usize,
    pub max_splits: usize,
    /// Require at least two protocol families in a split when possible.
    pub force_cross_protocol: bool,
    pub max_hops: usize,
    /// Protocols routes may use; empty means all.
    pub protocols: Vec<ProtocolKind>,
    /// Stop once the best split count trails the level being explored by more
    /// than this many levels. `None` explores up to `max_splits`.
    pub early_stop_lag: Option<usize>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self::with_distribution(DEFAULT_DISTRIBUTION_PERCENT)
    }
}

impl SearchConfig {
    pub fn with_distribution(step: u8) -> Self {
        Self {
            percents: Percent::distribution(step),
            min_splits: DEFAULT_MIN_SPLITS,
            max_splits: DEFAULT_MAX_SPLITS,
            force_cross_protocol: false,
            max_hops: DEFAULT_MAX_HOPS,
            protocols: Vec::new(),
            early_stop_lag: DEFAULT_EARLY_STOP_LAG,
        }
    }

    pub fn validate(&self) -> Result<(), RouterError> {
        if self.percents.is_empty() {
            return Err(RouterError::invalid_config("percent set must not be empty"));
        }
        if self.percents.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(RouterError::invalid_config(
                "percents must be strictly increasing",
            ));
        }
        if self.min_splits == 0 || self.max_splits == 0 {
            return Err(RouterError::invalid_config(
                "min_splits and max_splits must be at least 1",
            ));
        }
        if self.min_splits > self.max_splits {
            return Err(RouterError::invalid_config(format!(
                "min_splits ({}) exceeds max_splits ({})",
                self.min_splits, self.max_splits
            )));
        }
        if self.max_hops == 0 {
            return Err(RouterError::invalid_config("max_hops must be at least 1"));
        }
        Ok(())
    }
}

/// Default ranking: larger is better. Exact-output trades want the smallest
/// gas-adjusted input, so their score is negated.
pub fn default_score(direction: TradeDirection, record: &QuoteRecord) -> BigInt {
    match direction {
        TradeDirection::ExactInput => record.quote_adjusted_for_gas().clone(),
        TradeDirection::ExactOutput => -record.quote_adjusted_for_gas().clone(),
    }
}

/// Breadth-first search over split combinations. One instance may serve any
/// number of calls; no state survives between them.
pub struct SplitSearch<'a> {
    config: &'a SearchConfig,
    chain: &'a ChainConfig,
    observer: &'a dyn RoutingObserver,
    cancel: Option<CancellationToken>,
}

struct Ranked {
    record: QuoteRecord,
    score: BigInt,
}

struct PartialSplit<'r> {
    routes: Vec<&'r Ranked>,
    remaining: u8,
    percent_index: usize,
    // Seeded from a group's second-ranked record.
    diversity_seed: bool,
}

impl<'a> SplitSearch<'a> {
    pub fn new(
        config: &'a SearchConfig,
        chain: &'a ChainConfig,
        observer: &'a dyn RoutingObserver,
    ) -> Self {
        Self {
            config,
            chain,
            observer,
            cancel: None,
        }
    }

    /// Abandon the search with a `Cancelled` error once `token` fires.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    fn check_cancelled(&self, splits: usize) -> Result<(), RouterError> {
        match &self.cancel {
            Some(token) if token.is_cancelled() => {
                debug!(splits, "Split search cancelled");
                Err(RouterError::cancelled(format!(
                    "split search cancelled while exploring {splits}-way splits"
                )))
            }
            _ => Ok(()),
        }
    }

    /// Best split of `amount` across `records`. `Ok(None)` means no
    /// combination covers 100% within the split bounds.
    pub fn best_swap_route(
        &self,
        amount: &TokenAmount,
        percents: &[Percent],
        records: Vec<QuoteRecord>,
        direction: TradeDirection,
    ) -> Result<Option<SwapPlan>, RouterError> {
        self.best_swap_route_by(amount, percents, records, direction, |record| {
            default_score(direction, record)
        })
    }

    /// Same search with a caller-supplied score (larger wins).
    pub fn best_swap_route_by<F>(
        &self,
        amount: &TokenAmount,
        percents: &[Percent],
        records: Vec<QuoteRecord>,
        direction: TradeDirection,
        score: F,
    ) -> Result<Option<SwapPlan>, RouterError>
    where
        F: Fn(&QuoteRecord) -> BigInt,
    {
        let config = self.config;
        if percents.is_empty() {
            return Err(RouterError::invalid_config("percent set must not be empty"));
        }
        if config.min_splits > config.max_splits {
            return Err(RouterError::invalid_config(format!(
                "min_splits ({}) exceeds max_splits ({})",
                config.min_splits, config.max_splits
            )));
        }

        let started = Instant::now();
        let groups = rank_by_percent(percents, records, &score);
        let mut top = self
            .observer
            .tracks_candidates()
            .then(|| TopCandidates::new(TOP_CANDIDATES_PER_LEVEL));

        let mut best: Option<(BigInt, Vec<&Ranked>)> = None;

        let full_group = percents
            .iter()
            .position(|percent| *percent == Percent::FULL)
            .map(|index| &groups[index])
            .filter(|group| !group.is_empty());
        match full_group {
            Some(group) if config.min_splits <= 1 && !config.force_cross_protocol => {
                best = Some((group[0].score.clone(), vec![&group[0]]));
                if let Some(top) = top.as_mut() {
                    for ranked in group.iter().take(TOP_CANDIDATES_PER_LEVEL) {
                        top.offer(ranked.score.clone(), &[ranked]);
                    }
                }
            }
            _ => debug!(
                groups = groups.iter().filter(|group| !group.is_empty()).count(),
                "No single-route baseline; searching splits only"
            ),
        }

        let mut queue = VecDeque::new();
        for (index, percent) in percents.iter().enumerate().rev() {
            let group = &groups[index];
            let Some(first) = group.first() else {
                continue;
            };
            queue.push_back(PartialSplit {
                routes: vec![first],
                remaining: 100 - percent.value(),
                percent_index: index,
                diversity_seed: false,
            });
            if let Some(second) = group.get(1) {
                queue.push_back(PartialSplit {
                    routes: vec![second],
                    remaining: 100 - percent.value(),
                    percent_index: index,
                    diversity_seed: true,
                });
            }
        }

        let mut splits = 1usize;
        let mut levels_explored = 0usize;
        let mut max_splits_reached = false;

        while !queue.is_empty() {
            if let Some(top) = top.as_mut() {
                self.observer.on_level_complete(&top.report(splits, queue.len()));
            }

            let layer = queue.len();
            splits += 1;
            self.check_cancelled(splits)?;

            if let (Some(lag), Some((_, best_routes))) = (config.early_stop_lag, best.as_ref()) {
                if splits >= EARLY_STOP_MIN_SPLITS && best_routes.len() + lag < splits {
                    debug!(
                        splits,
                        best_splits = best_routes.len(),
                        "Extra splits stopped improving the quote; ending search"
                    );
                    break;
                }
            }
            if splits > config.max_splits {
                max_splits_reached = true;
                self.observer.on_max_splits_reached(config.max_splits);
                break;
            }
            levels_explored += 1;

            for _ in 0..layer {
                let Some(state) = queue.pop_front() else {
                    break;
                };
                self.check_cancelled(splits)?;
                for index in (0..=state.percent_index).rev() {
                    let percent = percents[index].value();
                    if percent > state.remaining {
                        continue;
                    }
                    let Some(candidate) =
                        first_unused(&state.routes, &groups[index], config.force_cross_protocol)
                    else {
                        continue;
                    };

                    let remaining = state.remaining - percent;
                    let mut routes = state.routes.clone();
                    routes.push(candidate);

                    if remaining == 0 && splits >= config.min_splits {
                        let total: BigInt = routes.iter().map(|ranked| &ranked.score).sum();
                        if let Some(top) = top.as_mut() {
                            top.offer(total.clone(), &routes);
                        }
                        let improves = best
                            .as_ref()
                            .map_or(true, |(best_total, _)| total > *best_total);
                        if improves {
                            if state.diversity_seed {
                                debug!(splits, "Best split so far grew from a second-ranked seed");
                            }
                            best = Some((total, routes));
                        }
                    } else {
                        queue.push_back(PartialSplit {
                            routes,
                            remaining,
                            percent_index: index,
                            diversity_seed: state.diversity_seed,
                        });
                    }
                }
            }
        }

        if let Some(top) = top.as_mut() {
            if !top.is_empty() {
                self.observer.on_level_complete(&top.report(splits, queue.len()));
            }
        }

        self.observer.on_search_complete(&SearchSummary {
            direction,
            splits_found: best.as_ref().map(|(_, routes)| routes.len()),
            levels_explored,
            max_splits_reached,
            elapsed: started.elapsed(),
        });

        let Some((_, winners)) = best else {
            info!(direction = direction.as_str(), "Could not find a valid swap");
            return Ok(None);
        };
        let records = winners.into_iter().map(|ranked| ranked.record.clone()).collect();
        assemble_plan(amount, direction, self.chain, records).map(Some)
    }
}

fn rank_by_percent<F>(percents: &[Percent], records: Vec<QuoteRecord>, score: &F) -> Vec<Vec<Ranked>>
where
    F: Fn(&QuoteRecord) -> BigInt,
{
    let mut groups: Vec<Vec<Ranked>> = percents.iter().map(|_| Vec::new()).collect();
    for record in records {
        match percents.iter().position(|percent| *percent == record.percent()) {
            Some(index) => groups[index].push(Ranked {
                score: score(&record),
                record,
            }),
            None => debug!(percent = %record.percent(), "Dropping quote for unsearched percent"),
        }
    }
    // Stable: equal scores keep their input order.
    for group in &mut groups {
        group.sort_by(|a, b| b.score.cmp(&a.score));
    }
    groups
}

/// First candidate sharing no pool with `used`. With `force_cross_protocol`
/// and a single protocol family in use, a candidate of another family is
/// preferred; the first same-family candidate is the fallback.
fn first_unused<'r>(
    used: &[&'r Ranked],
    candidates: &'r [Ranked],
    force_cross_protocol: bool,
) -> Option<&'r Ranked> {
    let used_pools: HashSet<Address> = used
        .iter()
        .flat_map(|ranked| ranked.record.pool_addresses().iter().copied())
        .collect();
    let only_family = if force_cross_protocol {
        sole_family(used)
    } else {
        None
    };

    let mut fallback = None;
    for candidate in candidates {
        if candidate
            .record
            .pool_addresses()
            .iter()
            .any(|address| used_pools.contains(address))
        {
            continue;
        }
        match only_family {
            Some(family) if candidate.record.protocol().family() == family => {
                fallback.get_or_insert(candidate);
            }
            _ => return Some(candidate),
        }
    }
    fallback
}

// V2 forks share a family, so Uniswap V2 plus Sushiswap V2 is not a cross-protocol split.
fn sole_family(used: &[&Ranked]) -> Option<ProtocolFamily> {
    let first = used.first()?.record.protocol().family();
    used.iter()
        .all(|ranked| ranked.record.protocol().family() == first)
        .then_some(first)
}

fn assemble_plan(
    amount: &TokenAmount,
    direction: TradeDirection,
    chain: &ChainConfig,
    mut records: Vec<QuoteRecord>,
) -> Result<SwapPlan, RouterError> {
    let usd_token = chain.usd_reference_token().ok_or_else(|| {
        RouterError::missing_reference_pool(format!(
            "Could not find a USD token for computing gas costs on chain {}",
            chain.chain_id
        ))
    })?;
    let quote_token = records
        .first()
        .map(|record| record.raw_quote().token.clone())
        .ok_or_else(|| RouterError::internal("winning split has no records"))?;

    let quote_gas_adjusted: BigInt = records
        .iter()
        .map(|record| record.quote_adjusted_for_gas())
        .sum();
    let estimated_gas_used = records
        .iter()
        .fold(0u64, |total, record| total.saturating_add(record.gas_estimate()));
    // Each record may report gas in a different stable; they are treated as
    // pegged and merged into the chain's reference stable.
    let estimated_gas_used_usd: BigUint = records
        .iter()
        .map(|record| record.gas_cost_in_usd().rescale_to(usd_token).raw)
        .sum();
    let estimated_gas_used_quote_token: BigUint = records
        .iter()
        .map(|record| &record.gas_cost_in_token().raw)
        .sum();
    let quote: BigUint = records.iter().map(|record| &record.raw_quote().raw).sum();

    records.sort_by(|a, b| b.amount().raw.cmp(&a.amount().raw));

    // Percent slices are floored, so the split may fall a few units short.
    let allocated: BigUint = records.iter().map(|record| &record.amount().raw).sum();
    if allocated < amount.raw {
        let missing = &amount.raw - &allocated;
        info!(
            missing = %missing,
            "Split amounts did not add up to the requested total; adding the remainder to the last route"
        );
        if let Some(last) = records.last_mut() {
            *last = last.with_extra_amount(&missing);
        }
    }

    let plan = SwapPlan {
        direction,
        amount: amount.clone(),
        quote: TokenAmount::new(quote_token.clone(), quote),
        quote_gas_adjusted,
        estimated_gas_used,
        estimated_gas_used_usd: TokenAmount::new(usd_token.clone(), estimated_gas_used_usd),
        estimated_gas_used_quote_token: TokenAmount::new(quote_token, estimated_gas_used_quote_token),
        records,
    };

    info!(
        direction = direction.as_str(),
        splits = plan.splits(),
        amount = %plan.amount.raw,
        quote = %plan.quote.raw,
        quote_gas_adjusted = %plan.quote_gas_adjusted,
        estimated_gas_used = plan.estimated_gas_used,
        estimated_gas_used_usd = %plan.estimated_gas_used_usd.raw,
        routes = ?plan.records.iter().map(ToString::to_string).collect::<Vec<_>>(),
        "Found best swap route"
    );
    Ok(plan)
}

/// Bounded ranking of completed candidates for the level being explored.
struct TopCandidates {
    capacity: usize,
    seq: usize,
    heap: BinaryHeap<Reverse<RankedCandidate>>,
}

struct RankedCandidate {
    score: BigInt,
    seq: usize,
    summary: CandidateSummary,
}

impl PartialEq for RankedCandidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for RankedCandidate {}

impl PartialOrd for RankedCandidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RankedCandidate {
    // Higher score first; among equals, the earlier candidate ranks higher.
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .cmp(&other.score)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl TopCandidates {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            seq: 0,
            heap: BinaryHeap::with_capacity(capacity + 1),
        }
    }

    fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    fn offer(&mut self, score: BigInt, routes: &[&Ranked]) {
        let summary = CandidateSummary {
            quote: routes
                .iter()
                .map(|ranked| ranked.record.quote_adjusted_for_gas())
                .sum(),
            routes: routes.iter().map(|ranked| ranked.record.to_string()).collect(),
        };
        self.seq += 1;
        self.heap.push(Reverse(RankedCandidate {
            score,
            seq: self.seq,
            summary,
        }));
        if self.heap.len() > self.capacity {
            self.heap.pop();
        }
    }

    /// Drains the ranking, best first.
    fn report(&mut self, splits: usize, queued: usize) -> LevelReport {
        let top = std::mem::take(&mut self.heap)
            .into_sorted_vec()
            .into_iter()
            .map(|Reverse(candidate)| candidate.summary)
            .collect();
        LevelReport { splits, top, queued }
    }
}
