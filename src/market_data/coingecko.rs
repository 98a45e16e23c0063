use std::sync::Arc;

use error_stack::{Report, ResultExt};
use futures::future::BoxFuture;
use governor::DefaultDirectRateLimiter;
use serde::Deserialize;
use tracing::info;

use crate::config::MarketDataConfig;
use crate::error::MarketDataError;
use crate::market_data::{MarketData, check_status, rate_limiter};
use crate::model::{InputMode, ProviderKind, RawSeries};
use crate::symbols::CoinListing;

pub struct CoinGecko {
    client: reqwest::Client,
    rate_limiter: Arc<DefaultDirectRateLimiter>,
    base_url: String,
    vs_currency: String,
    days: u32,
}

impl CoinGecko {
    pub fn new(client: reqwest::Client, config: &MarketDataConfig) -> Self {
        Self {
            client,
            rate_limiter: rate_limiter(config.requests_per_minute),
            base_url: config.coingecko_base_url.trim_end_matches('/').to_owned(),
            vs_currency: config.vs_currency.clone(),
            days: config.days,
        }
    }

    fn market_chart_url(&self, coin_id: &str) -> String {
        format!("{}/api/v3/coins/{}/market_chart", self.base_url, coin_id)
    }
}

impl MarketData for CoinGecko {
    fn kind(&self) -> ProviderKind {
        ProviderKind::CoinGecko
    }

    fn fetch_series(
        &self,
        coin: &CoinListing,
    ) -> BoxFuture<'_, Result<RawSeries, Report<MarketDataError>>> {
        let coin_id = coin.coingecko_id.clone();
        Box::pin(async move {
            self.rate_limiter.until_ready().await;

            let url = self.market_chart_url(&coin_id);
            let days = self.days.to_string();
            let params = [
                ("vs_currency", self.vs_currency.as_str()),
                ("days", days.as_str()),
            ];

            let response = self
                .client
                .get(&url)
                .query(&params)
                .send()
                .await
                .change_context(MarketDataError::Request {
                    provider: "coingecko".into(),
                })?;

            check_status(ProviderKind::CoinGecko, &response)?;

            let chart: MarketChart =
                response
                    .json()
                    .await
                    .change_context(MarketDataError::ResponseParse {
                        provider: "coingecko".into(),
                    })?;

            info!(
                coin_id = %coin_id,
                days = self.days,
                fetched = chart.prices.len(),
                "coingecko market chart fetch complete"
            );

            Ok(chart.into_raw_series())
        })
    }
}

/// `market_chart` body; only the `[timestamp_ms, price]` pairs are used.
#[derive(Debug, Deserialize)]
struct MarketChart {
    prices: Vec<serde_json::Value>,
}

impl MarketChart {
    fn into_raw_series(self) -> RawSeries {
        RawSeries {
            mode: InputMode::Pairs,
            payload: serde_json::Value::Array(self.prices),
        }
    }
}
