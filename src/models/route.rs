use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use alloy_primitives::Address;

use super::pool::Pool;
use super::protocol::ProtocolKind;
use super::token::Token;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteErrorKind {
    Empty,
    MixedProtocols,
    RepeatedPool,
    BrokenPath,
    WrongDestination,
}

impl RouteErrorKind {
    pub fn label(&self) -> &'static str {
        match self {
            RouteErrorKind::Empty => "empty",
            RouteErrorKind::MixedProtocols => "mixed_protocols",
            RouteErrorKind::RepeatedPool => "repeated_pool",
            RouteErrorKind::BrokenPath => "broken_path",
            RouteErrorKind::WrongDestination => "wrong_destination",
        }
    }
}

/// Why a pool sequence does not form a route.
#[derive(Debug)]
pub struct RouteError {
    kind: RouteErrorKind,
    message: String,
}

impl RouteError {
    fn new<T: Into<String>>(kind: RouteErrorKind, message: T) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> RouteErrorKind {
        self.kind
    }
}

impl fmt::Display for RouteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.label(), self.message)
    }
}

impl std::error::Error for RouteError {}

/// An ordered chain of pools from `token_in` to `token_out` on a single protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    protocol: ProtocolKind,
    pools: Vec<Arc<Pool>>,
    token_path: Vec<Token>,
}

impl Route {
    pub fn new(
        protocol: ProtocolKind,
        pools: Vec<Arc<Pool>>,
        token_in: &Token,
        token_out: &Token,
    ) -> Result<Self, RouteError> {
        if pools.is_empty() {
            return Err(RouteError::new(
                RouteErrorKind::Empty,
                "route must contain at least one pool",
            ));
        }

        let mut seen = HashSet::with_capacity(pools.len());
        let mut token_path = Vec::with_capacity(pools.len() + 1);
        token_path.push(token_in.clone());
        let mut frontier = token_in.clone();

        for (index, pool) in pools.iter().enumerate() {
            if pool.protocol != protocol {
                return Err(RouteError::new(
                    RouteErrorKind::MixedProtocols,
                    format!(
                        "pool[{}] {} is {} but route is {}",
                        index, pool.address, pool.protocol, protocol
                    ),
                ));
            }
            if !seen.insert(pool.address) {
                return Err(RouteError::new(
                    RouteErrorKind::RepeatedPool,
                    format!("pool {} repeats within route", pool.address),
                ));
            }
            let next = pool.other_token(&frontier).ok_or_else(|| {
                RouteError::new(
                    RouteErrorKind::BrokenPath,
                    format!(
                        "pool[{}] {} does not trade {}",
                        index, pool.address, frontier.symbol
                    ),
                )
            })?;
            frontier = next.clone();
            token_path.push(frontier.clone());
        }

        if !frontier.same_as(token_out) {
            return Err(RouteError::new(
                RouteErrorKind::WrongDestination,
                format!(
                    "route ends at {} instead of {}",
                    frontier.symbol, token_out.symbol
                ),
            ));
        }

        Ok(Self {
            protocol,
            pools,
            token_path,
        })
    }

    pub fn protocol(&self) -> ProtocolKind {
        self.protocol
    }

    pub fn pools(&self) -> &[Arc<Pool>] {
        &self.pools
    }

    pub fn hops(&self) -> usize {
        self.pools.len()
    }

    pub fn token_path(&self) -> &[Token] {
        &self.token_path
    }

    pub fn token_in(&self) -> &Token {
        &self.token_path[0]
    }

    pub fn token_out(&self) -> &Token {
        &self.token_path[self.token_path.len() - 1]
    }

    pub fn pool_addresses(&self) -> Vec<Address> {
        self.pools.iter().map(|pool| pool.address).collect()
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.protocol, self.token_path[0].symbol)?;
        for (pool, token) in self.pools.iter().zip(self.token_path.iter().skip(1)) {
            write!(f, " -- {}bps --> {}", pool.fee_bps, token.symbol)?;
        }
        Ok(())
    }
}
