use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use split_router::api::create_router;
use split_router::config::{init_logging, load_config};
use split_router::models::state::AppState;
use split_router::services::observer::TracingObserver;
use split_router::services::providers::{FixedGasPrice, StaticPoolProvider};
use split_router::services::quotes::ReserveQuoteProvider;
use split_router::services::router::Router;
use split_router::services::trade::SplitTradeBuilder;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: jemallocator::Jemalloc = jemallocator::Jemalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    init_logging();

    // Load configuration
    let config = load_config();
    info!(
        event = "config_loaded",
        chain_id = config.chain.chain_id,
        pools_file = config.pools_file.as_str(),
        gas_price_wei = %config.gas_price_wei,
        distribution_percent = config.distribution_percent,
        min_splits = config.min_splits,
        max_splits = config.max_splits,
        max_hops = config.max_hops,
        force_cross_protocol = config.force_cross_protocol,
        early_stop_lag = ?config.early_stop_lag,
        "Initializing split router..."
    );

    let pool_provider = Arc::new(StaticPoolProvider::from_snapshot_file(Path::new(
        &config.pools_file,
    ))?);
    if pool_provider.is_empty() {
        error!(
            pools_file = config.pools_file.as_str(),
            "Pool snapshot is empty; every route request will return no_route"
        );
    }
    let tokens = pool_provider.tokens();
    let total_pools = pool_provider.len();

    let router = Router::new(
        config.chain.clone(),
        pool_provider,
        Arc::new(ReserveQuoteProvider),
        Arc::new(FixedGasPrice::new(config.gas_price_wei.clone())),
        Arc::new(SplitTradeBuilder),
        Arc::new(TracingObserver),
    )
    .with_quote_batching(
        config.quote_batch_size,
        Duration::from_millis(config.quote_timeout_ms),
    );

    let app_state = AppState::new(
        Arc::new(router),
        tokens,
        config.search_config(),
        Duration::from_millis(config.request_timeout_ms),
        total_pools,
    );
    info!(
        pools = total_pools,
        tokens = app_state.tokens.len(),
        "Loaded routing state"
    );

    // Create router and start server
    let app = create_router(app_state);

    // Parse the host into IpAddr
    let ip_addr: IpAddr = config.host.parse().expect("Invalid host address");
    let addr = SocketAddr::from((ip_addr, config.port));

    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|e| {
        error!("Failed to bind to address: {}", e);
        e
    })?;

    info!("Server listening on {}", addr);

    axum::serve(listener, app.into_make_service())
        .await
        .map_err(|e| {
            error!("Server error: {}", e);
            anyhow::anyhow!("Failed to start server: {}", e)
        })?;

    Ok(())
}
