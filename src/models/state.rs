use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::Address;

use crate::models::token::Token;
use crate::services::router::Router;
use crate::services::search::SearchConfig;

#[derive(Clone)]
pub struct AppState {
    pub router: Arc<Router>,
    pub tokens: Arc<HashMap<Address, Token>>,
    pub default_search: SearchConfig,
    pub request_timeout: Duration,
    pub total_pools: usize,
}

impl AppState {
    pub fn new(
        router: Arc<Router>,
        tokens: impl IntoIterator<Item = Token>,
        default_search: SearchConfig,
        request_timeout: Duration,
        total_pools: usize,
    ) -> Self {
        let tokens = tokens
            .into_iter()
            .map(|token| (token.address, token))
            .collect();
        Self {
            router,
            tokens: Arc::new(tokens),
            default_search,
            request_timeout,
            total_pools,
        }
    }

    /// Metadata for a token known to the loaded pool set or the chain table.
    pub fn token(&self, address: &Address) -> Option<Token> {
        self.tokens
            .get(address)
            .or_else(|| self.router.chain().find_token(address))
            .cloned()
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn total_pools(&self) -> usize {
        self.total_pools
    }

    pub fn is_ready(&self) -> bool {
        self.total_pools > 0
    }
}
