use std::fmt;

use alloy_primitives::Address;
use num_bigint::BigUint;
use num_traits::Zero;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Token {
    pub address: Address,
    pub symbol: String,
    pub decimals: u8,
}

impl Token {
    pub fn new(address: Address, symbol: impl Into<String>, decimals: u8) -> Self {
        Self {
            address,
            symbol: symbol.into(),
            decimals,
        }
    }

    /// Tokens are identified by address alone; symbol and decimals are metadata.
    pub fn same_as(&self, other: &Token) -> bool {
        self.address == other.address
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.symbol, self.address)
    }
}

/// A raw integer amount of a token, in the token's smallest unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenAmount {
    pub token: Token,
    pub raw: BigUint,
}

impl TokenAmount {
    pub fn new(token: Token, raw: BigUint) -> Self {
        Self { token, raw }
    }

    pub fn zero(token: Token) -> Self {
        Self {
            token,
            raw: BigUint::zero(),
        }
    }

    pub fn is_zero(&self) -> bool {
        self.raw.is_zero()
    }

    /// Adds two amounts of the same token. Returns `None` on a token mismatch.
    pub fn checked_add(&self, other: &TokenAmount) -> Option<TokenAmount> {
        if !self.token.same_as(&other.token) {
            return None;
        }
        Some(TokenAmount {
            token: self.token.clone(),
            raw: &self.raw + &other.raw,
        })
    }

    /// Re-expresses the amount in `target`'s decimals. Scaling down truncates.
    pub fn rescale_to(&self, target: &Token) -> TokenAmount {
        let raw = if target.decimals >= self.token.decimals {
            let diff = u32::from(target.decimals - self.token.decimals);
            &self.raw * pow10(diff)
        } else {
            let diff = u32::from(self.token.decimals - target.decimals);
            &self.raw / pow10(diff)
        };
        TokenAmount {
            token: target.clone(),
            raw,
        }
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.raw, self.token.symbol)
    }
}

fn pow10(exp: u32) -> BigUint {
    BigUint::from(10u32).pow(exp)
}

/// Exchange rate of `base` denominated in `quote`, kept as an exact fraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Price {
    pub base: Token,
    pub quote: Token,
    pub numerator: BigUint,
    pub denominator: BigUint,
}

impl Price {
    /// Returns `None` for a zero denominator.
    pub fn new(base: Token, quote: Token, numerator: BigUint, denominator: BigUint) -> Option<Self> {
        if denominator.is_zero() {
            return None;
        }
        Some(Self {
            base,
            quote,
            numerator,
            denominator,
        })
    }

    /// Converts a raw `base` amount into raw `quote` units, flooring the result.
    pub fn quote(&self, amount: &BigUint) -> BigUint {
        (amount * &self.numerator) / &self.denominator
    }

    pub fn invert(&self) -> Option<Price> {
        Price::new(
            self.quote.clone(),
            self.base.clone(),
            self.denominator.clone(),
            self.numerator.clone(),
        )
    }
}
