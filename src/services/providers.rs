use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use alloy_primitives::Address;
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use num_bigint::BigUint;
use serde::Deserialize;
use tracing::info;

use crate::models::pool::{Pool, PoolState};
use crate::models::protocol::ProtocolKind;
use crate::models::quote::{RouteQuotes, TradeDirection};
use crate::models::route::Route;
use crate::models::token::Token;

use super::error::{GasPriceError, PoolProviderError, QuoteProviderError};

pub type TokenPair = (Token, Token);

/// Quotes every amount for every route. Insufficient liquidity for a slice is
/// `QuoteOutcome::NoLiquidity`, not an error; errors mean the whole batch failed.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    async fn get_quotes(
        &self,
        routes: &[Arc<Route>],
        amounts: &[BigUint],
        direction: TradeDirection,
    ) -> Result<Vec<RouteQuotes>, QuoteProviderError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PoolProvider: Send + Sync {
    async fn get_pools(&self, pairs: &[TokenPair]) -> Result<PoolAccessor, PoolProviderError>;
}

/// Native-asset price per gas unit, in wei.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GasPriceSource: Send + Sync {
    async fn current_price(&self) -> Result<BigUint, GasPriceError>;
}

/// Pools returned for one lookup.
#[derive(Debug, Clone, Default)]
pub struct PoolAccessor {
    pools: Vec<Arc<Pool>>,
}

impl PoolAccessor {
    pub fn new(pools: Vec<Arc<Pool>>) -> Self {
        Self { pools }
    }

    pub fn all_pools(&self) -> &[Arc<Pool>] {
        &self.pools
    }

    pub fn pools_for(&self, a: &Token, b: &Token) -> Vec<Arc<Pool>> {
        self.pools
            .iter()
            .filter(|pool| pool.pairs(a, b))
            .cloned()
            .collect()
    }
}

/// In-memory pool set, loaded once at startup.
#[derive(Debug, Default)]
pub struct StaticPoolProvider {
    pools: Vec<Arc<Pool>>,
}

impl StaticPoolProvider {
    pub fn new(pools: Vec<Pool>) -> Self {
        Self {
            pools: pools.into_iter().map(Arc::new).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    /// Every token held by a loaded pool, first occurrence wins.
    pub fn tokens(&self) -> Vec<Token> {
        let mut seen = HashSet::new();
        self.pools
            .iter()
            .flat_map(|pool| [&pool.token0, &pool.token1])
            .filter(|token| seen.insert(token.address))
            .cloned()
            .collect()
    }

    pub fn from_snapshot_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading pool snapshot {}", path.display()))?;
        let entries: Vec<PoolSnapshotEntry> =
            serde_json::from_str(&raw).context("parsing pool snapshot")?;
        let pools = entries
            .into_iter()
            .map(PoolSnapshotEntry::into_pool)
            .collect::<anyhow::Result<Vec<_>>>()?;
        info!(pools = pools.len(), path = %path.display(), "Loaded pool snapshot");
        Ok(Self::new(pools))
    }
}

#[async_trait]
impl PoolProvider for StaticPoolProvider {
    async fn get_pools(&self, pairs: &[TokenPair]) -> Result<PoolAccessor, PoolProviderError> {
        let mut seen = HashSet::new();
        let pools = self
            .pools
            .iter()
            .filter(|pool| pairs.iter().any(|(a, b)| pool.pairs(a, b)))
            .filter(|pool| seen.insert(pool.address))
            .cloned()
            .collect();
        Ok(PoolAccessor::new(pools))
    }
}

#[derive(Debug, Clone)]
pub struct FixedGasPrice {
    wei: BigUint,
}

impl FixedGasPrice {
    pub fn new(wei: BigUint) -> Self {
        Self { wei }
    }
}

#[async_trait]
impl GasPriceSource for FixedGasPrice {
    async fn current_price(&self) -> Result<BigUint, GasPriceError> {
        Ok(self.wei.clone())
    }
}

#[derive(Debug, Deserialize)]
struct SnapshotToken {
    address: String,
    symbol: String,
    decimals: u8,
}

impl SnapshotToken {
    fn into_token(self) -> anyhow::Result<Token> {
        let address = Address::from_str(&self.address)
            .map_err(|err| anyhow!("invalid token address {}: {err}", self.address))?;
        Ok(Token::new(address, self.symbol, self.decimals))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PoolSnapshotEntry {
    address: String,
    protocol: String,
    fee_bps: u32,
    token0: SnapshotToken,
    token1: SnapshotToken,
    reserve0: Option<String>,
    reserve1: Option<String>,
    sqrt_price_x96: Option<String>,
    liquidity: Option<String>,
}

impl PoolSnapshotEntry {
    fn into_pool(self) -> anyhow::Result<Pool> {
        let address = Address::from_str(&self.address)
            .map_err(|err| anyhow!("invalid pool address {}: {err}", self.address))?;
        let protocol = ProtocolKind::from_name(&self.protocol)
            .ok_or_else(|| anyhow!("pool {} has unknown protocol {}", self.address, self.protocol))?;

        let state = match (self.reserve0, self.reserve1, self.sqrt_price_x96, self.liquidity) {
            (Some(reserve0), Some(reserve1), None, None) => PoolState::ConstantProduct {
                reserve0: parse_amount(&reserve0)?,
                reserve1: parse_amount(&reserve1)?,
            },
            (None, None, Some(sqrt_price_x96), Some(liquidity)) => PoolState::Concentrated {
                sqrt_price_x96: parse_amount(&sqrt_price_x96)?,
                liquidity: parse_amount(&liquidity)?,
            },
            _ => {
                return Err(anyhow!(
                    "pool {} must set either reserve0/reserve1 or sqrtPriceX96/liquidity",
                    self.address
                ))
            }
        };

        Ok(Pool {
            address,
            token0: self.token0.into_token()?,
            token1: self.token1.into_token()?,
            protocol,
            fee_bps: self.fee_bps,
            state,
        })
    }
}

fn parse_amount(value: &str) -> anyhow::Result<BigUint> {
    BigUint::from_str(value).map_err(|err| anyhow!("invalid amount {value}: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{cp_pool, token};

    #[tokio::test]
    async fn static_provider_filters_by_pair() {
        let a = token(1, "A", 18);
        let b = token(2, "B", 18);
        let c = token(3, "C", 18);
        let provider = StaticPoolProvider::new(vec![
            cp_pool(10, &a, &b, 1_000, 1_000),
            cp_pool(11, &b, &c, 1_000, 1_000),
        ]);

        let accessor = provider
            .get_pools(&[(b.clone(), a.clone()), (a.clone(), b.clone())])
            .await
            .expect("pools");
        assert_eq!(accessor.all_pools().len(), 1);
        assert_eq!(accessor.pools_for(&a, &b).len(), 1);
        assert!(accessor.pools_for(&a, &c).is_empty());
    }

    #[test]
    fn snapshot_entry_requires_one_state_shape() {
        let json = r#"[{
            "address": "0x0000000000000000000000000000000000000010",
            "protocol": "uniswap_v2",
            "feeBps": 30,
            "token0": {"address": "0x0000000000000000000000000000000000000001", "symbol": "A", "decimals": 18},
            "token1": {"address": "0x0000000000000000000000000000000000000002", "symbol": "B", "decimals": 6},
            "reserve0": "1000",
            "reserve1": "2000"
        }]"#;
        let entries: Vec<PoolSnapshotEntry> = serde_json::from_str(json).unwrap();
        let pools = entries
            .into_iter()
            .map(PoolSnapshotEntry::into_pool)
            .collect::<anyhow::Result<Vec<_>>>()
            .unwrap();
        assert_eq!(pools[0].protocol, ProtocolKind::UniswapV2);
        assert_eq!(pools[0].token1.decimals, 6);

        let mixed = r#"{
            "address": "0x0000000000000000000000000000000000000010",
            "protocol": "uniswap_v3",
            "feeBps": 5,
            "token0": {"address": "0x0000000000000000000000000000000000000001", "symbol": "A", "decimals": 18},
            "token1": {"address": "0x0000000000000000000000000000000000000002", "symbol": "B", "decimals": 6},
            "reserve0": "1000",
            "liquidity": "2000"
        }"#;
        let entry: PoolSnapshotEntry = serde_json::from_str(mixed).unwrap();
        assert!(entry.into_pool().is_err());
    }
}
