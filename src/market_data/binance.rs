use std::sync::Arc;

use error_stack::{Report, ResultExt};
use futures::future::BoxFuture;
use governor::DefaultDirectRateLimiter;
use tracing::info;

use crate::config::MarketDataConfig;
use crate::error::MarketDataError;
use crate::market_data::{MarketData, check_status, rate_limiter};
use crate::model::{InputMode, ProviderKind, RawSeries};
use crate::symbols::CoinListing;

/// Upper bound Binance accepts for `limit` on `/api/v3/klines`.
pub const MAX_CANDLES_PER_REQUEST: usize = 1000;

pub struct Binance {
    client: reqwest::Client,
    rate_limiter: Arc<DefaultDirectRateLimiter>,
    base_url: String,
    interval: String,
    limit: usize,
}

impl Binance {
    pub fn new(client: reqwest::Client, config: &MarketDataConfig) -> Self {
        Self {
            client,
            rate_limiter: rate_limiter(config.requests_per_minute),
            base_url: config.binance_base_url.trim_end_matches('/').to_owned(),
            interval: config.interval.clone(),
            limit: config.limit.min(MAX_CANDLES_PER_REQUEST),
        }
    }
}

impl MarketData for Binance {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Binance
    }

    fn fetch_series(
        &self,
        coin: &CoinListing,
    ) -> BoxFuture<'_, Result<RawSeries, Report<MarketDataError>>> {
        let symbol = coin.binance_symbol.clone();
        Box::pin(async move {
            // Wait for rate limiter before making the request
            self.rate_limiter.until_ready().await;

            let url = format!("{}/api/v3/klines", self.base_url);
            let limit_str = self.limit.to_string();
            let params = [
                ("symbol", symbol.as_str()),
                ("interval", self.interval.as_str()),
                ("limit", limit_str.as_str()),
            ];

            let response = self
                .client
                .get(&url)
                .query(&params)
                .send()
                .await
                .change_context(MarketDataError::Request {
                    provider: "binance".into(),
                })?;

            check_status(ProviderKind::Binance, &response)?;

            // Kline rows are left raw: [open_time, open, high, low, close, volume, ...]
            let rows: Vec<serde_json::Value> =
                response
                    .json()
                    .await
                    .change_context(MarketDataError::ResponseParse {
                        provider: "binance".into(),
                    })?;

            info!(
                symbol = %symbol,
                interval = %self.interval,
                fetched = rows.len(),
                "binance kline fetch complete"
            );

            Ok(RawSeries {
                mode: InputMode::Candles,
                payload: serde_json::Value::Array(rows),
            })
        })
    }
}
