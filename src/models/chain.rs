use alloy_primitives::{address, Address};

use super::token::Token;

pub const MAINNET: u64 = 1;
pub const LOCAL_DEVNET: u64 = 31_337;

const WETH_MAINNET: Address = address!("C02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2");
const DAI_MAINNET: Address = address!("6B175474E89094C44Da98b954EedeAC495271d0F");
const USDC_MAINNET: Address = address!("A0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48");
const USDT_MAINNET: Address = address!("dAC17F958D2ee523a2206206994597C13D831ec7");
const WBTC_MAINNET: Address = address!("2260FAC5E5542a773Aa44fBCfeDf7C193bc2C599");

/// Per-chain routing constants: the wrapped native token gas is paid in, the
/// stable tokens gas costs are reported in (first entry is the normalization
/// target), and the intermediary tokens considered for multi-hop routes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainConfig {
    pub chain_id: u64,
    pub wrapped_native: Token,
    pub usd_gas_tokens: Vec<Token>,
    pub base_tokens: Vec<Token>,
}

impl ChainConfig {
    pub fn for_chain(chain_id: u64) -> Option<Self> {
        match chain_id {
            MAINNET => {
                let weth = Token::new(WETH_MAINNET, "WETH", 18);
                let dai = Token::new(DAI_MAINNET, "DAI", 18);
                let usdc = Token::new(USDC_MAINNET, "USDC", 6);
                let usdt = Token::new(USDT_MAINNET, "USDT", 6);
                let wbtc = Token::new(WBTC_MAINNET, "WBTC", 8);
                Some(Self {
                    chain_id,
                    wrapped_native: weth.clone(),
                    usd_gas_tokens: vec![dai.clone(), usdc.clone(), usdt.clone()],
                    base_tokens: vec![weth, dai, usdc, usdt, wbtc],
                })
            }
            LOCAL_DEVNET => {
                let weth = Token::new(Address::repeat_byte(0xee), "WETH", 18);
                let usdc = Token::new(Address::repeat_byte(0xdd), "USDC", 6);
                Some(Self {
                    chain_id,
                    wrapped_native: weth.clone(),
                    usd_gas_tokens: vec![usdc.clone()],
                    base_tokens: vec![weth, usdc],
                })
            }
            _ => None,
        }
    }

    pub fn usd_reference_token(&self) -> Option<&Token> {
        self.usd_gas_tokens.first()
    }

    pub fn find_token(&self, address: &Address) -> Option<&Token> {
        std::iter::once(&self.wrapped_native)
            .chain(self.usd_gas_tokens.iter())
            .chain(self.base_tokens.iter())
            .find(|token| token.address == *address)
    }
}
