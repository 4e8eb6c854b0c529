use std::sync::{Arc, Mutex};

use alloy_primitives::Address;
use num_bigint::BigUint;

use crate::models::chain::{ChainConfig, LOCAL_DEVNET};
use crate::models::pool::{Pool, PoolState};
use crate::models::protocol::ProtocolKind;
use crate::models::quote::{GasCostEstimate, Percent, QuoteRecord, TradeDirection};
use crate::models::route::Route;
use crate::models::token::{Token, TokenAmount};

use super::observer::{LevelReport, RoutingObserver, SearchSummary};

pub(crate) fn token(byte: u8, symbol: &str, decimals: u8) -> Token {
    Token::new(Address::repeat_byte(byte), symbol, decimals)
}

pub(crate) fn pool_address(byte: u8) -> Address {
    let mut bytes = [0u8; 20];
    bytes[0] = 0xaa;
    bytes[19] = byte;
    Address::from(bytes)
}

pub(crate) fn cp_pool(addr: u8, token0: &Token, token1: &Token, reserve0: u128, reserve1: u128) -> Pool {
    Pool {
        address: pool_address(addr),
        token0: token0.clone(),
        token1: token1.clone(),
        protocol: ProtocolKind::UniswapV2,
        fee_bps: 30,
        state: PoolState::ConstantProduct {
            reserve0: BigUint::from(reserve0),
            reserve1: BigUint::from(reserve1),
        },
    }
}

pub(crate) fn v3_pool(
    addr: u8,
    token0: &Token,
    token1: &Token,
    sqrt_price_x96: BigUint,
    liquidity: BigUint,
) -> Pool {
    Pool {
        address: pool_address(addr),
        token0: token0.clone(),
        token1: token1.clone(),
        protocol: ProtocolKind::UniswapV3,
        fee_bps: 30,
        state: PoolState::Concentrated {
            sqrt_price_x96,
            liquidity,
        },
    }
}

pub(crate) fn devnet_chain() -> ChainConfig {
    ChainConfig::for_chain(LOCAL_DEVNET).expect("devnet chain config")
}

/// Route over throwaway pools, one `(from, to, pool byte)` per hop.
pub(crate) fn route_through(protocol: ProtocolKind, hops: &[(&Token, &Token, u8)]) -> Arc<Route> {
    let pools: Vec<Arc<Pool>> = hops
        .iter()
        .map(|(from, to, addr)| {
            let mut pool = cp_pool(*addr, from, to, 1_000_000, 1_000_000);
            pool.protocol = protocol;
            Arc::new(pool)
        })
        .collect();
    let (first, last) = (hops[0].0, hops[hops.len() - 1].1);
    Arc::new(Route::new(protocol, pools, first, last).expect("valid test route"))
}

/// Record for `percent` of `total`, quoting `raw_quote` with `gas` charged in
/// the quote token.
pub(crate) fn record(
    route: &Arc<Route>,
    percent: u8,
    total: u128,
    raw_quote: u128,
    gas: u128,
    direction: TradeDirection,
) -> QuoteRecord {
    let (amount_token, quote_token) = match direction {
        TradeDirection::ExactInput => (route.token_in().clone(), route.token_out().clone()),
        TradeDirection::ExactOutput => (route.token_out().clone(), route.token_in().clone()),
    };
    let percent = Percent::new(percent).expect("valid percent");
    let usd = devnet_chain().usd_gas_tokens[0].clone();
    QuoteRecord::new(
        route.clone(),
        percent,
        TokenAmount::new(amount_token, percent.of(&BigUint::from(total))),
        TokenAmount::new(quote_token.clone(), BigUint::from(raw_quote)),
        Vec::new(),
        GasCostEstimate {
            gas_estimate: 100_000,
            gas_cost_in_token: TokenAmount::new(quote_token, BigUint::from(gas)),
            gas_cost_in_usd: TokenAmount::new(usd, BigUint::from(gas)),
        },
        direction,
    )
}

/// Observer that keeps every callback for later assertions.
#[derive(Default)]
pub(crate) struct RecordingObserver {
    pub levels: Mutex<Vec<LevelReport>>,
    pub max_splits: Mutex<Vec<usize>>,
    pub summaries: Mutex<Vec<SearchSummary>>,
    pub degraded: Mutex<Vec<String>>,
}

impl RoutingObserver for RecordingObserver {
    fn tracks_candidates(&self) -> bool {
        true
    }

    fn on_level_complete(&self, report: &LevelReport) {
        self.levels.lock().unwrap().push(report.clone());
    }

    fn on_max_splits_reached(&self, splits: usize) {
        self.max_splits.lock().unwrap().push(splits);
    }

    fn on_search_complete(&self, summary: &SearchSummary) {
        self.summaries.lock().unwrap().push(summary.clone());
    }

    fn on_gas_degraded(&self, quote_token: &Token, _native: &Token) {
        self.degraded.lock().unwrap().push(quote_token.symbol.clone());
    }
}
