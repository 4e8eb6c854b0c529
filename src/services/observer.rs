use std::time::Duration;

use num_bigint::BigInt;
use tracing::{debug, info, warn};

use crate::metrics::{emit_gas_model_degraded, emit_max_splits_reached, emit_search_latency};
use crate::models::quote::TradeDirection;
use crate::models::token::Token;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateSummary {
    pub quote: BigInt,
    pub routes: Vec<String>,
}

/// Snapshot taken when the search finishes one split level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelReport {
    pub splits: usize,
    pub top: Vec<CandidateSummary>,
    pub queued: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchSummary {
    pub direction: TradeDirection,
    pub splits_found: Option<usize>,
    pub levels_explored: usize,
    pub max_splits_reached: bool,
    pub elapsed: Duration,
}

/// Diagnostics hook handed to the gas models and the split search. Every
/// method defaults to a no-op, so implementors only pick what they need.
pub trait RoutingObserver: Send + Sync {
    /// When false the search skips building per-level candidate rankings.
    fn tracks_candidates(&self) -> bool {
        false
    }

    fn on_level_complete(&self, _report: &LevelReport) {}

    fn on_max_splits_reached(&self, _splits: usize) {}

    fn on_search_complete(&self, _summary: &SearchSummary) {}

    fn on_gas_degraded(&self, _quote_token: &Token, _native: &Token) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl RoutingObserver for NoopObserver {}

/// Logs search progress through `tracing` and emits EMF counters.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl RoutingObserver for TracingObserver {
    fn tracks_candidates(&self) -> bool {
        true
    }

    fn on_level_complete(&self, report: &LevelReport) {
        let top: Vec<String> = report
            .top
            .iter()
            .map(|candidate| format!("{} ({})", candidate.quote, candidate.routes.join(", ")))
            .collect();
        debug!(
            event = "split_level_complete",
            splits = report.splits,
            queued = report.queued,
            top = ?top,
            "Top candidates for split level"
        );
    }

    fn on_max_splits_reached(&self, splits: usize) {
        info!(event = "max_splits_reached", splits, "Max splits reached. Stopping search.");
        emit_max_splits_reached(splits);
    }

    fn on_search_complete(&self, summary: &SearchSummary) {
        let elapsed_ms = summary.elapsed.as_millis() as u64;
        info!(
            event = "split_search_complete",
            direction = summary.direction.as_str(),
            splits_found = summary.splits_found,
            levels_explored = summary.levels_explored,
            max_splits_reached = summary.max_splits_reached,
            elapsed_ms,
            "Split search finished"
        );
        emit_search_latency(elapsed_ms);
    }

    fn on_gas_degraded(&self, quote_token: &Token, native: &Token) {
        warn!(
            event = "gas_model_degraded",
            quote_token = %quote_token,
            native = %native,
            "No native pool for quote token; routes will not account for gas"
        );
        emit_gas_model_degraded(&quote_token.symbol);
    }
}
