pub mod binance;
pub mod coingecko;

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use error_stack::{Report, ResultExt};
use futures::future::BoxFuture;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use nonzero_ext::nonzero;

use crate::config::MarketDataConfig;
use crate::error::MarketDataError;
use crate::model::{ProviderKind, RawSeries};
use crate::symbols::CoinListing;

/// Source of raw price history for one coin. Object-safe, used as `dyn MarketData`.
pub trait MarketData: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Fetch the raw price history, tagged with the shape the normalizer expects.
    fn fetch_series(
        &self,
        coin: &CoinListing,
    ) -> BoxFuture<'_, Result<RawSeries, Report<MarketDataError>>>;
}

pub fn build_provider(
    kind: ProviderKind,
    config: &MarketDataConfig,
) -> Result<Arc<dyn MarketData>, Report<MarketDataError>> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .change_context(MarketDataError::Request {
            provider: kind.to_string(),
        })?;

    let provider: Arc<dyn MarketData> = match kind {
        ProviderKind::CoinGecko => Arc::new(coingecko::CoinGecko::new(client, config)),
        ProviderKind::Binance => Arc::new(binance::Binance::new(client, config)),
    };
    Ok(provider)
}

fn rate_limiter(requests_per_minute: u32) -> Arc<DefaultDirectRateLimiter> {
    let rpm = NonZeroU32::new(requests_per_minute).unwrap_or(nonzero!(30u32));
    Arc::new(RateLimiter::direct(Quota::per_minute(rpm)))
}

/// Turn a non-success HTTP status into a `Request` error.
fn check_status(
    provider: ProviderKind,
    response: &reqwest::Response,
) -> Result<(), Report<MarketDataError>> {
    if !response.status().is_success() {
        return Err(Report::new(MarketDataError::Request {
            provider: provider.to_string(),
        })
        .attach(format!("HTTP status: {}", response.status())));
    }
    Ok(())
}
