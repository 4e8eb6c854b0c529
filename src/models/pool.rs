use std::fmt;

use alloy_primitives::Address;
use num_bigint::BigUint;
use num_traits::{One, Zero};

use super::protocol::ProtocolKind;
use super::token::{Price, Token};

pub const FEE_BPS_DENOMINATOR: u32 = 10_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolState {
    ConstantProduct {
        reserve0: BigUint,
        reserve1: BigUint,
    },
    /// Active range of a concentrated-liquidity pool.
    Concentrated {
        sqrt_price_x96: BigUint,
        liquidity: BigUint,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pool {
    pub address: Address,
    pub token0: Token,
    pub token1: Token,
    pub protocol: ProtocolKind,
    pub fee_bps: u32,
    pub state: PoolState,
}

impl Pool {
    pub fn involves(&self, token: &Token) -> bool {
        self.token0.same_as(token) || self.token1.same_as(token)
    }

    pub fn other_token(&self, token: &Token) -> Option<&Token> {
        if self.token0.same_as(token) {
            Some(&self.token1)
        } else if self.token1.same_as(token) {
            Some(&self.token0)
        } else {
            None
        }
    }

    /// True when the pool trades exactly the unordered pair `(a, b)`.
    pub fn pairs(&self, a: &Token, b: &Token) -> bool {
        (self.token0.same_as(a) && self.token1.same_as(b))
            || (self.token0.same_as(b) && self.token1.same_as(a))
    }

    /// Reserves as `(reserve_of(token), reserve_of(other))`. Concentrated pools
    /// report the virtual reserves of their active range.
    pub fn reserves_for(&self, token: &Token) -> Option<(BigUint, BigUint)> {
        let (reserve0, reserve1) = self.reserves()?;
        if self.token0.same_as(token) {
            Some((reserve0, reserve1))
        } else if self.token1.same_as(token) {
            Some((reserve1, reserve0))
        } else {
            None
        }
    }

    fn reserves(&self) -> Option<(BigUint, BigUint)> {
        match &self.state {
            PoolState::ConstantProduct { reserve0, reserve1 } => {
                Some((reserve0.clone(), reserve1.clone()))
            }
            PoolState::Concentrated {
                sqrt_price_x96,
                liquidity,
            } => {
                if sqrt_price_x96.is_zero() {
                    return None;
                }
                let q96 = q96();
                let reserve0 = (liquidity * &q96) / sqrt_price_x96;
                let reserve1 = (liquidity * sqrt_price_x96) / &q96;
                Some((reserve0, reserve1))
            }
        }
    }

    /// Spot mid price of `base` in terms of the pool's other token.
    pub fn mid_price(&self, base: &Token) -> Option<Price> {
        let (numerator, denominator) = match &self.state {
            PoolState::ConstantProduct { reserve0, reserve1 } => {
                (reserve1.clone(), reserve0.clone())
            }
            PoolState::Concentrated { sqrt_price_x96, .. } => {
                (sqrt_price_x96 * sqrt_price_x96, q96() * q96())
            }
        };
        if numerator.is_zero() {
            return None;
        }
        let token0_price = Price::new(
            self.token0.clone(),
            self.token1.clone(),
            numerator,
            denominator,
        )?;
        if self.token0.same_as(base) {
            Some(token0_price)
        } else if self.token1.same_as(base) {
            token0_price.invert()
        } else {
            None
        }
    }

    /// Depth used to pick the most liquid reference pool: the reserve of `token`
    /// for constant-product pools, the active liquidity for concentrated pools.
    pub fn liquidity_weight(&self, token: &Token) -> BigUint {
        match &self.state {
            PoolState::ConstantProduct { reserve0, reserve1 } => {
                if self.token0.same_as(token) {
                    reserve0.clone()
                } else if self.token1.same_as(token) {
                    reserve1.clone()
                } else {
                    BigUint::zero()
                }
            }
            PoolState::Concentrated { liquidity, .. } => liquidity.clone(),
        }
    }
}

impl fmt::Display for Pool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}bps[{}]",
            self.token0.symbol, self.token1.symbol, self.fee_bps, self.protocol
        )
    }
}

pub(crate) fn q96() -> BigUint {
    BigUint::one() << 96
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{cp_pool, v3_pool, token};

    #[test]
    fn constant_product_mid_price_both_directions() {
        let weth = token(1, "WETH", 18);
        let usdc = token(2, "USDC", 6);
        // 100 WETH vs 300_000 USDC
        let pool = cp_pool(
            10,
            &weth,
            &usdc,
            100u128 * 10u128.pow(18),
            300_000u128 * 10u128.pow(6),
        );

        let price = pool.mid_price(&weth).expect("price");
        assert_eq!(
            price.quote(&BigUint::from(10u128.pow(18))),
            BigUint::from(3_000u128 * 10u128.pow(6))
        );

        let inverse = pool.mid_price(&usdc).expect("price");
        assert_eq!(
            inverse.quote(&BigUint::from(3_000u128 * 10u128.pow(6))),
            BigUint::from(10u128.pow(18))
        );
    }

    #[test]
    fn concentrated_mid_price_uses_sqrt_price() {
        let a = token(1, "A", 18);
        let b = token(2, "B", 18);
        // sqrt price of 2 => price 4
        let pool = v3_pool(11, &a, &b, q96() * BigUint::from(2u32), BigUint::from(1_000u32));
        let price = pool.mid_price(&a).expect("price");
        assert_eq!(price.quote(&BigUint::from(10u32)), BigUint::from(40u32));
        let (reserve_a, reserve_b) = pool.reserves_for(&a).expect("reserves");
        assert_eq!(reserve_a, BigUint::from(500u32));
        assert_eq!(reserve_b, BigUint::from(2_000u32));
    }

    #[test]
    fn empty_pool_has_no_price() {
        let a = token(1, "A", 18);
        let b = token(2, "B", 18);
        let pool = cp_pool(12, &a, &b, 0, 0);
        assert!(pool.mid_price(&a).is_none());
        assert!(pool.other_token(&token(3, "C", 18)).is_none());
        assert_eq!(pool.other_token(&a), Some(&b));
    }
}
