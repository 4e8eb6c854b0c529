use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolKind {
    UniswapV2,
    SushiswapV2,
    PancakeswapV2,
    UniswapV3,
    PancakeswapV3,
}

/// Pricing family of a venue. Gas heuristics and quoting math are chosen per family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtocolFamily {
    ConstantProduct,
    Concentrated,
}

const PROTOCOL_NAME_ALIASES: [(&str, ProtocolKind); 7] = [
    ("v2", ProtocolKind::UniswapV2),
    ("v3", ProtocolKind::UniswapV3),
    ("uniswap_v2_pool", ProtocolKind::UniswapV2),
    ("uniswap_v3_pool", ProtocolKind::UniswapV3),
    ("sushiswap_v2_pool", ProtocolKind::SushiswapV2),
    ("pancakeswap_v2_pool", ProtocolKind::PancakeswapV2),
    ("pancakeswap_v3_pool", ProtocolKind::PancakeswapV3),
];

impl ProtocolKind {
    pub const ALL: [ProtocolKind; 5] = [
        ProtocolKind::UniswapV2,
        ProtocolKind::SushiswapV2,
        ProtocolKind::PancakeswapV2,
        ProtocolKind::UniswapV3,
        ProtocolKind::PancakeswapV3,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProtocolKind::UniswapV2 => "uniswap_v2",
            ProtocolKind::SushiswapV2 => "sushiswap_v2",
            ProtocolKind::PancakeswapV2 => "pancakeswap_v2",
            ProtocolKind::UniswapV3 => "uniswap_v3",
            ProtocolKind::PancakeswapV3 => "pancakeswap_v3",
        }
    }

    pub fn family(&self) -> ProtocolFamily {
        match self {
            ProtocolKind::UniswapV2 | ProtocolKind::SushiswapV2 | ProtocolKind::PancakeswapV2 => {
                ProtocolFamily::ConstantProduct
            }
            ProtocolKind::UniswapV3 | ProtocolKind::PancakeswapV3 => ProtocolFamily::Concentrated,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let normalized = normalize_protocol_name(name);
        ProtocolKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == normalized)
            .or_else(|| {
                PROTOCOL_NAME_ALIASES
                    .iter()
                    .find_map(|(alias, kind)| (*alias == normalized).then_some(*kind))
            })
    }

    /// Parses a comma separated protocol list. Empty input means "all protocols".
    pub fn parse_list(value: &str) -> Result<Vec<Self>, String> {
        value
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|entry| {
                Self::from_name(entry).ok_or_else(|| {
                    let valid = ProtocolKind::ALL
                        .iter()
                        .map(ProtocolKind::as_str)
                        .collect::<Vec<_>>()
                        .join(", ");
                    format!("unknown protocol '{entry}', valid options: {valid}")
                })
            })
            .collect()
    }
}

impl fmt::Display for ProtocolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn normalize_protocol_name(name: &str) -> String {
    name.trim().to_ascii_lowercase().replace(['-', ' '], "_")
}
