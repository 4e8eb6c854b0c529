use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::Address;
use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use num_bigint::BigUint;
use serde_json::{json, Value};
use tower::ServiceExt;

use split_router::api::create_router;
use split_router::models::chain::{ChainConfig, LOCAL_DEVNET};
use split_router::models::pool::{Pool, PoolState};
use split_router::models::protocol::ProtocolKind;
use split_router::models::quote::{RouteQuotes, TradeDirection};
use split_router::models::route::Route;
use split_router::models::state::AppState;
use split_router::models::token::Token;
use split_router::services::error::QuoteProviderError;
use split_router::services::observer::NoopObserver;
use split_router::services::providers::{FixedGasPrice, QuoteProvider, StaticPoolProvider};
use split_router::services::quotes::ReserveQuoteProvider;
use split_router::services::router::Router;
use split_router::services::search::SearchConfig;
use split_router::services::trade::SplitTradeBuilder;

const E18: u128 = 1_000_000_000_000_000_000;
const E6: u128 = 1_000_000;

fn chain() -> ChainConfig {
    ChainConfig::for_chain(LOCAL_DEVNET).expect("devnet chain")
}

fn dai() -> Token {
    Token::new(Address::repeat_byte(0x03), "DAI", 18)
}

fn pool(byte: u8, protocol: ProtocolKind, t0: &Token, t1: &Token, r0: u128, r1: u128) -> Pool {
    Pool {
        address: Address::repeat_byte(byte),
        token0: t0.clone(),
        token1: t1.clone(),
        protocol,
        fee_bps: 30,
        state: PoolState::ConstantProduct {
            reserve0: BigUint::from(r0),
            reserve1: BigUint::from(r1),
        },
    }
}

/// WETH/USDC reference pool plus two equally deep WETH/DAI pools on
/// different constant-product venues.
fn market() -> Vec<Pool> {
    let chain = chain();
    let weth = chain.wrapped_native.clone();
    let usdc = chain.usd_gas_tokens[0].clone();
    vec![
        pool(0x51, ProtocolKind::UniswapV2, &weth, &usdc, 1_000 * E18, 2_000_000 * E6),
        pool(0x52, ProtocolKind::UniswapV2, &weth, &dai(), 100 * E18, 200_000 * E18),
        pool(0x53, ProtocolKind::SushiswapV2, &weth, &dai(), 100 * E18, 200_000 * E18),
    ]
}

fn app_with(
    pools: Vec<Pool>,
    quote_provider: Arc<dyn QuoteProvider>,
    request_timeout: Duration,
) -> axum::Router {
    let provider = StaticPoolProvider::new(pools);
    let tokens = provider.tokens();
    let total_pools = provider.len();
    let router = Router::new(
        chain(),
        Arc::new(provider),
        quote_provider,
        Arc::new(FixedGasPrice::new(BigUint::from(1_000_000_000u64))),
        Arc::new(SplitTradeBuilder),
        Arc::new(NoopObserver),
    );
    let state = AppState::new(
        Arc::new(router),
        tokens,
        SearchConfig::with_distribution(25),
        request_timeout,
        total_pools,
    );
    create_router(state)
}

fn app(pools: Vec<Pool>) -> axum::Router {
    app_with(pools, Arc::new(ReserveQuoteProvider), Duration::from_secs(5))
}

async fn post(app: axum::Router, body: Value) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/route")
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

fn weth_to_dai(amount: u128) -> Value {
    json!({
        "requestId": "req-1",
        "tokenIn": chain().wrapped_native.address.to_string(),
        "tokenOut": dai().address.to_string(),
        "amount": amount.to_string(),
    })
}

fn with(mut base: Value, extra: Value) -> Value {
    if let (Some(base), Some(extra)) = (base.as_object_mut(), extra.as_object()) {
        for (key, value) in extra {
            base.insert(key.clone(), value.clone());
        }
    }
    base
}

fn parse_address(value: &Value) -> Address {
    Address::from_str(value.as_str().expect("address string")).expect("address")
}

#[tokio::test]
async fn route_splits_large_trade_and_builds_trade() {
    let request = with(
        weth_to_dai(20 * E18),
        json!({
            "maxSplits": 2,
            "distributionPercent": 50,
            "execution": {
                "recipient": "0x4242424242424242424242424242424242424242",
                "slippageBps": 50,
                "deadline": 1700000000u64
            }
        }),
    );
    let (status, body) = post(app(market()), request).await;

    assert_eq!(status, StatusCode::OK, "body: {body}");
    assert_eq!(body["requestId"], json!("req-1"));
    assert_eq!(body["status"], json!("ok"));

    let plan = &body["plan"];
    assert_eq!(plan["direction"], json!("exact_input"));
    assert_eq!(parse_address(&plan["tokenIn"]), chain().wrapped_native.address);
    assert_eq!(parse_address(&plan["tokenOut"]), dai().address);
    assert_eq!(plan["routesConsidered"], json!(2));

    let splits = plan["splits"].as_array().expect("splits");
    assert_eq!(splits.len(), 2);
    let allocated: BigUint = splits
        .iter()
        .map(|split| BigUint::from_str(split["amount"].as_str().unwrap()).unwrap())
        .sum();
    assert_eq!(allocated, BigUint::from(20 * E18));
    let protocols: Vec<&str> = splits
        .iter()
        .map(|split| split["protocol"].as_str().unwrap())
        .collect();
    assert!(protocols.contains(&"uniswap_v2"));
    assert!(protocols.contains(&"sushiswap_v2"));

    let trade = &body["trade"];
    let legs = trade["legs"].as_array().expect("legs");
    assert_eq!(legs.len(), 2);
    let shares: u64 = legs.iter().map(|leg| leg["shareBps"].as_u64().unwrap()).sum();
    assert_eq!(shares, 10_000);
    assert_eq!(trade["slippageBps"], json!(50));
    assert_eq!(trade["deadline"], json!(1_700_000_000u64));
    let limit = BigUint::from_str(trade["limit"].as_str().unwrap()).unwrap();
    let quote = BigUint::from_str(plan["quote"].as_str().unwrap()).unwrap();
    assert!(limit < quote);
}

#[tokio::test]
async fn exact_out_request_quotes_input_token() {
    let request = json!({
        "requestId": "req-out",
        "tokenIn": chain().wrapped_native.address.to_string(),
        "tokenOut": dai().address.to_string(),
        "amount": (1_000 * E18).to_string(),
        "exactOut": true,
    });
    let (status, body) = post(app(market()), request).await;

    assert_eq!(status, StatusCode::OK, "body: {body}");
    assert_eq!(body["status"], json!("ok"));
    assert_eq!(body["plan"]["direction"], json!("exact_output"));
    assert_eq!(body["plan"]["amount"], json!((1_000 * E18).to_string()));
    assert!(body.get("trade").is_none());
}

#[tokio::test]
async fn unreachable_token_is_no_route() {
    let mut pools = market();
    let isolated = Token::new(Address::repeat_byte(0x07), "ISO", 18);
    let other = Token::new(Address::repeat_byte(0x08), "OTH", 18);
    pools.push(pool(0x54, ProtocolKind::UniswapV2, &isolated, &other, E18, E18));

    let request = json!({
        "requestId": "req-none",
        "tokenIn": dai().address.to_string(),
        "tokenOut": isolated.address.to_string(),
        "amount": E18.to_string(),
    });
    let (status, body) = post(app(pools), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("no_route"));
    assert!(body.get("plan").is_none());
    assert!(body.get("error").is_none());
}

#[tokio::test]
async fn unknown_token_is_bad_request() {
    let request = with(
        weth_to_dai(E18),
        json!({ "tokenOut": "0x0909090909090909090909090909090909090909" }),
    );
    let (status, body) = post(app(market()), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], json!("error"));
    assert_eq!(body["error"]["kind"], json!("invalid_request"));
}

#[tokio::test]
async fn malformed_amount_is_bad_request() {
    let request = with(weth_to_dai(E18), json!({ "amount": "1.5" }));
    let (status, body) = post(app(market()), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["kind"], json!("invalid_request"));
}

#[tokio::test]
async fn invalid_split_bounds_map_to_invalid_config() {
    let request = with(weth_to_dai(E18), json!({ "minSplits": 3, "maxSplits": 2 }));
    let (status, body) = post(app(market()), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], json!("error"));
    assert_eq!(body["error"]["kind"], json!("invalid_config"));
}

#[tokio::test]
async fn oversized_split_search_is_bad_request() {
    let request = with(
        weth_to_dai(E18),
        json!({ "maxSplits": 40, "distributionPercent": 1 }),
    );
    let (status, body) = post(app(market()), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], json!("error"));
    assert_eq!(body["error"]["kind"], json!("invalid_request"));
}

#[tokio::test]
async fn missing_usd_reference_pool_is_server_error() {
    let pools: Vec<Pool> = market().into_iter().skip(1).collect();
    let (status, body) = post(app(pools), weth_to_dai(E18)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["kind"], json!("missing_reference_pool"));
}

struct StalledQuotes;

#[async_trait]
impl QuoteProvider for StalledQuotes {
    async fn get_quotes(
        &self,
        _routes: &[Arc<Route>],
        _amounts: &[BigUint],
        _direction: TradeDirection,
    ) -> Result<Vec<RouteQuotes>, QuoteProviderError> {
        tokio::time::sleep(Duration::from_secs(10)).await;
        Err(QuoteProviderError::Unavailable("stalled".to_string()))
    }
}

#[tokio::test]
async fn request_guard_times_out_slow_quotes() {
    let app = app_with(market(), Arc::new(StalledQuotes), Duration::from_millis(50));
    let (status, body) = post(app, weth_to_dai(E18)).await;

    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(body["status"], json!("error"));
    assert_eq!(body["error"]["kind"], json!("timeout"));
}

#[tokio::test]
async fn status_reports_loaded_pools() {
    let response = app(market())
        .oneshot(Request::builder().uri("/status").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["status"], json!("ready"));
    assert_eq!(body["pools"], json!(3));
    assert_eq!(body["chain_id"], json!(LOCAL_DEVNET));

    let empty = app(Vec::new())
        .oneshot(Request::builder().uri("/status").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(empty.status(), StatusCode::SERVICE_UNAVAILABLE);
}
