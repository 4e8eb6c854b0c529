use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use alloy_primitives::Address;
use tracing::{debug, warn};

use crate::models::pool::Pool;
use crate::models::protocol::ProtocolKind;
use crate::models::route::Route;
use crate::models::token::Token;

use super::providers::TokenPair;

/// Token pairs whose pools may appear on a route between `token_in` and
/// `token_out`: the direct pair, each side against every base token, and
/// every base against every other base.
pub fn candidate_pairs(token_in: &Token, token_out: &Token, bases: &[Token]) -> Vec<TokenPair> {
    let mut pairs = Vec::new();
    let mut seen = HashSet::new();
    let mut push = |a: &Token, b: &Token| {
        if a.same_as(b) {
            return;
        }
        let key = if a.address <= b.address {
            (a.address, b.address)
        } else {
            (b.address, a.address)
        };
        if seen.insert(key) {
            pairs.push((a.clone(), b.clone()));
        }
    };

    push(token_in, token_out);
    for base in bases {
        push(token_in, base);
        push(base, token_out);
    }
    for (index, base) in bases.iter().enumerate() {
        for other in &bases[index + 1..] {
            push(base, other);
        }
    }
    pairs
}

/// Every route of at most `max_hops` pools from `token_in` to `token_out`.
/// Routes never mix protocols and never revisit a token.
pub fn compute_all_routes(
    token_in: &Token,
    token_out: &Token,
    pools: &[Arc<Pool>],
    max_hops: usize,
) -> Vec<Arc<Route>> {
    let mut by_protocol: BTreeMap<ProtocolKind, Vec<Arc<Pool>>> = BTreeMap::new();
    for pool in pools {
        by_protocol.entry(pool.protocol).or_default().push(Arc::clone(pool));
    }

    let mut routes = Vec::new();
    for (protocol, pools) in by_protocol {
        let mut walker = RouteWalker {
            protocol,
            pools: &pools,
            token_in,
            token_out,
            max_hops,
            path: Vec::new(),
            used: vec![false; pools.len()],
            visited: HashSet::from([token_in.address]),
            routes: &mut routes,
        };
        walker.walk(token_in);
    }

    debug!(
        token_in = %token_in.symbol,
        token_out = %token_out.symbol,
        max_hops,
        routes = routes.len(),
        "Computed candidate routes"
    );
    routes
}

struct RouteWalker<'a> {
    protocol: ProtocolKind,
    pools: &'a [Arc<Pool>],
    token_in: &'a Token,
    token_out: &'a Token,
    max_hops: usize,
    path: Vec<Arc<Pool>>,
    used: Vec<bool>,
    visited: HashSet<Address>,
    routes: &'a mut Vec<Arc<Route>>,
}

impl RouteWalker<'_> {
    fn walk(&mut self, frontier: &Token) {
        if !self.path.is_empty() && frontier.same_as(self.token_out) {
            match Route::new(self.protocol, self.path.clone(), self.token_in, self.token_out) {
                Ok(route) => self.routes.push(Arc::new(route)),
                Err(err) => warn!(
                    kind = err.kind().label(),
                    error = err.message(),
                    "Discarding malformed candidate route"
                ),
            }
            return;
        }
        if self.path.len() >= self.max_hops {
            return;
        }

        for index in 0..self.pools.len() {
            if self.used[index] {
                continue;
            }
            let pool = Arc::clone(&self.pools[index]);
            let Some(next) = pool.other_token(frontier).cloned() else {
                continue;
            };
            if self.visited.contains(&next.address) {
                continue;
            }

            self.used[index] = true;
            self.visited.insert(next.address);
            self.path.push(pool);

            self.walk(&next);

            self.path.pop();
            self.visited.remove(&next.address);
            self.used[index] = false;
        }
    }
}

/// Keeps pools whose protocol is listed; an empty list keeps everything.
pub fn filter_protocols(pools: &[Arc<Pool>], protocols: &[ProtocolKind]) -> Vec<Arc<Pool>> {
    pools
        .iter()
        .filter(|pool| protocols.is_empty() || protocols.contains(&pool.protocol))
        .cloned()
        .collect()
}
