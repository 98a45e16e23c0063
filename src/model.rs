use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Market-data provider backing an analysis request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    CoinGecko,
    Binance,
}

impl ProviderKind {
    /// Parse a config-format string into a `ProviderKind`.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "coingecko" => Some(Self::CoinGecko),
            "binance" => Some(Self::Binance),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::CoinGecko => "coingecko",
            Self::Binance => "binance",
        }
    }

    /// Shape of the raw records this provider returns.
    pub fn input_mode(self) -> InputMode {
        match self {
            Self::CoinGecko => InputMode::Pairs,
            Self::Binance => InputMode::Candles,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Declared shape of a raw provider payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputMode {
    /// `[[timestamp_ms, price], ...]`
    Pairs,
    /// `[[open_time_ms, open, high, low, close, volume, ...], ...]`
    Candles,
}

impl fmt::Display for InputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pairs => write!(f, "pairs"),
            Self::Candles => write!(f, "candles"),
        }
    }
}

/// Unparsed provider payload together with the shape it is expected to have.
#[derive(Debug, Clone)]
pub struct RawSeries {
    pub mode: InputMode,
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PricePoint {
    pub timestamp: DateTime<Utc>,
    pub close: f64,
}

/// Time-ordered closing prices, oldest first. Never empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Returns `None` for an empty point list.
    pub fn new(points: Vec<PricePoint>) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        Some(Self { points })
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }

    pub fn timestamps(&self) -> Vec<DateTime<Utc>> {
        self.points.iter().map(|p| p.timestamp).collect()
    }

    pub fn last(&self) -> &PricePoint {
        // Non-empty by construction.
        &self.points[self.points.len() - 1]
    }
}

/// One MACD output row before alignment.
///
/// `signal` and `histogram` stay `None` until the signal EMA has warmed up.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MacdValue {
    pub macd: f64,
    pub signal: Option<f64>,
    pub histogram: Option<f64>,
}

/// A fully defined MACD row, produced only by the aligner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MacdPoint {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// Labels, RSI and MACD sharing a single index space.
///
/// Only the aligner constructs this type, so `labels`, `rsi` and `macd`
/// always have the same length.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlignedSeries {
    labels: Vec<DateTime<Utc>>,
    rsi: Vec<f64>,
    macd: Vec<MacdPoint>,
}

impl AlignedSeries {
    pub(crate) fn from_parts(
        labels: Vec<DateTime<Utc>>,
        rsi: Vec<f64>,
        macd: Vec<MacdPoint>,
    ) -> Self {
        debug_assert!(labels.len() == rsi.len() && rsi.len() == macd.len());
        Self { labels, rsi, macd }
    }

    pub fn labels(&self) -> &[DateTime<Utc>] {
        &self.labels
    }

    pub fn rsi(&self) -> &[f64] {
        &self.rsi
    }

    pub fn macd(&self) -> &[MacdPoint] {
        &self.macd
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// The most recent row, if any.
    pub fn latest(&self) -> Option<(DateTime<Utc>, f64, MacdPoint)> {
        let i = self.len().checked_sub(1)?;
        Some((self.labels[i], self.rsi[i], self.macd[i]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(ms: i64, close: f64) -> PricePoint {
        PricePoint {
            timestamp: DateTime::from_timestamp_millis(ms).unwrap(),
            close,
        }
    }

    #[test]
    fn provider_kind_round_trip() {
        for kind in [ProviderKind::CoinGecko, ProviderKind::Binance] {
            assert_eq!(ProviderKind::from_str(kind.as_str()), Some(kind));
        }
        assert_eq!(ProviderKind::from_str("kraken"), None);
    }

    #[test]
    fn provider_input_modes() {
        assert_eq!(ProviderKind::CoinGecko.input_mode(), InputMode::Pairs);
        assert_eq!(ProviderKind::Binance.input_mode(), InputMode::Candles);
    }

    #[test]
    fn input_mode_deserializes_lowercase() {
        let mode: InputMode = serde_json::from_str("\"candles\"").unwrap();
        assert_eq!(mode, InputMode::Candles);
    }

    #[test]
    fn empty_price_series_rejected() {
        assert!(PriceSeries::new(Vec::new()).is_none());
    }

    #[test]
    fn price_series_accessors() {
        let series = PriceSeries::new(vec![point(1_000, 1.5), point(2_000, 2.5)]).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.closes(), vec![1.5, 2.5]);
        assert_eq!(series.timestamps()[1].timestamp_millis(), 2_000);
        assert_eq!(series.last().close, 2.5);
    }

    #[test]
    fn aligned_series_latest() {
        let empty = AlignedSeries::from_parts(Vec::new(), Vec::new(), Vec::new());
        assert!(empty.latest().is_none());

        let label = DateTime::from_timestamp_millis(5_000).unwrap();
        let row = MacdPoint {
            macd: 1.0,
            signal: 0.5,
            histogram: 0.5,
        };
        let aligned = AlignedSeries::from_parts(vec![label], vec![55.0], vec![row]);
        assert_eq!(aligned.latest(), Some((label, 55.0, row)));
    }
}
