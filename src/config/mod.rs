mod logging;
pub use logging::init_logging;

use std::str::FromStr;

use num_bigint::BigUint;

use crate::models::chain::ChainConfig;
use crate::models::protocol::ProtocolKind;
use crate::services::search::{
    SearchConfig, DEFAULT_DISTRIBUTION_PERCENT, DEFAULT_MAX_HOPS, DEFAULT_MAX_SPLITS,
    DEFAULT_MIN_SPLITS,
};

pub fn load_config() -> AppConfig {
    dotenv::dotenv().ok();

    let port = std::env::var("PORT")
        .unwrap_or_else(|_| "3000".to_string())
        .parse()
        .expect("Invalid PORT");
    let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let _ = host.parse::<std::net::IpAddr>().expect("Invalid HOST");

    let chain_id: u64 = std::env::var("CHAIN_ID")
        .unwrap_or_else(|_| "1".to_string())
        .parse()
        .expect("Invalid CHAIN_ID");
    let chain = ChainConfig::for_chain(chain_id)
        .unwrap_or_else(|| panic!("CHAIN_ID {chain_id} has no routing configuration"));

    let pools_file = std::env::var("POOLS_FILE").unwrap_or_else(|_| "pools.json".to_string());
    // 30 gwei
    let gas_price_wei = BigUint::from_str(
        &std::env::var("GAS_PRICE_WEI").unwrap_or_else(|_| "30000000000".to_string()),
    )
    .expect("Invalid GAS_PRICE_WEI");

    let request_timeout_ms: u64 = std::env::var("REQUEST_TIMEOUT_MS")
        .unwrap_or_else(|_| "5000".to_string())
        .parse()
        .expect("Invalid REQUEST_TIMEOUT_MS");
    let quote_batch_size: usize = std::env::var("QUOTE_BATCH_SIZE")
        .unwrap_or_else(|_| "16".to_string())
        .parse()
        .expect("Invalid QUOTE_BATCH_SIZE");
    let quote_timeout_ms: u64 = std::env::var("QUOTE_TIMEOUT_MS")
        .unwrap_or_else(|_| "2000".to_string())
        .parse()
        .expect("Invalid QUOTE_TIMEOUT_MS");

    let distribution_percent: u8 = std::env::var("DISTRIBUTION_PERCENT")
        .unwrap_or_else(|_| DEFAULT_DISTRIBUTION_PERCENT.to_string())
        .parse()
        .expect("Invalid DISTRIBUTION_PERCENT");
    let min_splits: usize = std::env::var("MIN_SPLITS")
        .unwrap_or_else(|_| DEFAULT_MIN_SPLITS.to_string())
        .parse()
        .expect("Invalid MIN_SPLITS");
    let max_splits: usize = std::env::var("MAX_SPLITS")
        .unwrap_or_else(|_| DEFAULT_MAX_SPLITS.to_string())
        .parse()
        .expect("Invalid MAX_SPLITS");
    let max_hops: usize = std::env::var("MAX_HOPS")
        .unwrap_or_else(|_| DEFAULT_MAX_HOPS.to_string())
        .parse()
        .expect("Invalid MAX_HOPS");
    let force_cross_protocol: bool = std::env::var("FORCE_CROSS_PROTOCOL")
        .unwrap_or_else(|_| "false".to_string())
        .parse()
        .expect("Invalid FORCE_CROSS_PROTOCOL");
    let protocols = ProtocolKind::parse_list(&std::env::var("PROTOCOLS").unwrap_or_default())
        .expect("Invalid PROTOCOLS");
    let early_stop_lag = parse_early_stop_lag(
        &std::env::var("SPLIT_EARLY_STOP_LAG").unwrap_or_else(|_| "1".to_string()),
    )
    .expect("Invalid SPLIT_EARLY_STOP_LAG");

    assert!(request_timeout_ms > 0, "REQUEST_TIMEOUT_MS must be > 0");
    assert!(quote_timeout_ms > 0, "QUOTE_TIMEOUT_MS must be > 0");
    assert!(quote_batch_size > 0, "QUOTE_BATCH_SIZE must be > 0");
    assert!(
        distribution_percent > 0 && distribution_percent <= 100,
        "DISTRIBUTION_PERCENT must be in (0, 100]"
    );
    assert!(min_splits > 0, "MIN_SPLITS must be > 0");
    assert!(
        max_splits >= min_splits,
        "MAX_SPLITS must be >= MIN_SPLITS"
    );
    assert!(max_hops > 0, "MAX_HOPS must be > 0");

    AppConfig {
        host,
        port,
        chain,
        pools_file,
        gas_price_wei,
        request_timeout_ms,
        quote_batch_size,
        quote_timeout_ms,
        distribution_percent,
        min_splits,
        max_splits,
        max_hops,
        force_cross_protocol,
        protocols,
        early_stop_lag,
    }
}

/// `off` disables the early stop; anything else must be a level count.
fn parse_early_stop_lag(value: &str) -> Result<Option<usize>, std::num::ParseIntError> {
    match value.trim() {
        "off" | "none" => Ok(None),
        other => other.parse().map(Some),
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub chain: ChainConfig,
    pub pools_file: String,
    pub gas_price_wei: BigUint,
    pub request_timeout_ms: u64,
    pub quote_batch_size: usize,
    pub quote_timeout_ms: u64,
    pub distribution_percent: u8,
    pub min_splits: usize,
    pub max_splits: usize,
    pub max_hops: usize,
    pub force_cross_protocol: bool,
    pub protocols: Vec<ProtocolKind>,
    pub early_stop_lag: Option<usize>,
}

impl AppConfig {
    /// Search defaults applied to every request before its own overrides.
    pub fn search_config(&self) -> SearchConfig {
        SearchConfig {
            min_splits: self.min_splits,
            max_splits: self.max_splits,
            force_cross_protocol: self.force_cross_protocol,
            max_hops: self.max_hops,
            protocols: self.protocols.clone(),
            early_stop_lag: self.early_stop_lag,
            ..SearchConfig::with_distribution(self.distribution_percent)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn early_stop_lag_accepts_off() {
        assert_eq!(parse_early_stop_lag("off").unwrap(), None);
        assert_eq!(parse_early_stop_lag(" 2 ").unwrap(), Some(2));
        assert!(parse_early_stop_lag("soon").is_err());
    }
}
