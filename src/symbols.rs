use std::collections::BTreeMap;

use error_stack::Report;

use crate::config::CoinConfig;
use crate::error::MarketDataError;

/// Coins available when the config declares none.
const BUILTIN_COINS: &[(&str, &str)] = &[
    ("BTC", "bitcoin"),
    ("ETH", "ethereum"),
    ("XRP", "ripple"),
    ("SOL", "solana"),
    ("BNB", "binancecoin"),
    ("DOGE", "dogecoin"),
    ("TRX", "tron"),
    ("LINK", "chainlink"),
    ("TON", "the-open-network"),
    ("SUI", "sui"),
    ("LTC", "litecoin"),
    ("PEPE", "pepe"),
];

/// Provider identifiers for one user-facing symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoinListing {
    pub symbol: String,
    pub coingecko_id: String,
    pub binance_symbol: String,
}

/// Immutable symbol → provider-id mapping, built once at startup.
#[derive(Debug, Clone)]
pub struct SymbolRegistry {
    coins: BTreeMap<String, CoinListing>,
}

impl SymbolRegistry {
    pub fn builtin() -> Self {
        Self::from_listings(BUILTIN_COINS.iter().map(|&(symbol, id)| CoinListing {
            symbol: symbol.to_owned(),
            coingecko_id: id.to_owned(),
            binance_symbol: format!("{symbol}USDT"),
        }))
    }

    /// Build from config entries, falling back to the built-in list when empty.
    pub fn from_config(coins: &[CoinConfig]) -> Self {
        if coins.is_empty() {
            return Self::builtin();
        }
        Self::from_listings(coins.iter().map(|c| {
            let symbol = c.symbol.to_uppercase();
            CoinListing {
                binance_symbol: c
                    .binance_symbol
                    .clone()
                    .unwrap_or_else(|| format!("{symbol}USDT")),
                coingecko_id: c.coingecko_id.clone(),
                symbol,
            }
        }))
    }

    fn from_listings(listings: impl Iterator<Item = CoinListing>) -> Self {
        Self {
            coins: listings.map(|l| (l.symbol.clone(), l)).collect(),
        }
    }

    /// Case-insensitive lookup.
    pub fn resolve(&self, symbol: &str) -> Result<&CoinListing, Report<MarketDataError>> {
        self.coins.get(&symbol.trim().to_uppercase()).ok_or_else(|| {
            Report::new(MarketDataError::UnsupportedSymbol {
                symbol: symbol.to_owned(),
            })
        })
    }

    pub fn listings(&self) -> impl Iterator<Item = &CoinListing> {
        self.coins.values()
    }

    pub fn len(&self) -> usize {
        self.coins.len()
    }
}
