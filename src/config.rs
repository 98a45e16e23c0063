use std::path::Path;

use chrono::format::{Item, StrftimeItems};
use error_stack::{Report, ResultExt};
use serde::Deserialize;

use crate::analysis::{Analyzer, IndicatorSettings};
use crate::error::ConfigError;
use crate::market_data::binance::MAX_CANDLES_PER_REQUEST;
use crate::model::ProviderKind;

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "text".into()
}

fn default_label_format() -> String {
    "%Y-%m-%d %H:%M".into()
}

fn default_trend_samples() -> usize {
    7
}

fn default_provider() -> String {
    "coingecko".into()
}

fn default_coingecko_base_url() -> String {
    "https://api.coingecko.com".into()
}

fn default_binance_base_url() -> String {
    "https://api.binance.com".into()
}

fn default_vs_currency() -> String {
    "usd".into()
}

fn default_days() -> u32 {
    30
}

fn default_interval() -> String {
    "1d".into()
}

fn default_limit() -> usize {
    200
}

fn default_requests_per_minute() -> u32 {
    30
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_report_base_url() -> String {
    "https://api.openai.com".into()
}

fn default_model() -> String {
    "gpt-4-turbo".into()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".into()
}

fn default_temperature() -> f64 {
    0.2
}

fn default_max_tokens() -> u32 {
    1500
}

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub indicators: IndicatorSettings,
    #[serde(default)]
    pub market_data: MarketDataConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub coins: Vec<CoinConfig>,
}

#[derive(Debug, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Accepted values: `"text"` | `"json"`
    #[serde(default = "default_log_format")]
    pub log_format: String,
    /// chrono format string for chart labels
    #[serde(default = "default_label_format")]
    pub label_format: String,
    /// Approximate point count of the price-trend chart
    #[serde(default = "default_trend_samples")]
    pub trend_samples: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
            label_format: default_label_format(),
            trend_samples: default_trend_samples(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MarketDataConfig {
    /// Accepted values: `"coingecko"` | `"binance"`
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_coingecko_base_url")]
    pub coingecko_base_url: String,
    #[serde(default = "default_binance_base_url")]
    pub binance_base_url: String,
    #[serde(default = "default_vs_currency")]
    pub vs_currency: String,
    /// History window for CoinGecko `market_chart`
    #[serde(default = "default_days")]
    pub days: u32,
    /// Binance kline interval
    #[serde(default = "default_interval")]
    pub interval: String,
    /// Binance kline count
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for MarketDataConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            coingecko_base_url: default_coingecko_base_url(),
            binance_base_url: default_binance_base_url(),
            vs_currency: default_vs_currency(),
            days: default_days(),
            interval: default_interval(),
            limit: default_limit(),
            requests_per_minute: default_requests_per_minute(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ReportConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_report_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: default_report_base_url(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CoinConfig {
    pub symbol: String,
    pub coingecko_id: String,
    pub binance_symbol: Option<String>,
}

/// Load and validate an `AppConfig` from a TOML file at `path`.
pub fn load(path: &Path) -> Result<AppConfig, Report<ConfigError>> {
    let content = std::fs::read_to_string(path)
        .change_context(ConfigError::ReadFile)
        .attach_with(|| format!("path: {}", path.display()))?;

    let config: AppConfig = toml::from_str(&content).change_context(ConfigError::Parse {
        reason: "invalid TOML syntax or schema mismatch".into(),
    })?;

    validate(&config)?;

    Ok(config)
}

const VALID_LOG_FORMATS: &[&str] = &["text", "json"];

fn validate(config: &AppConfig) -> Result<(), Report<ConfigError>> {
    validate_general(config)?;
    validate_indicators(config)?;
    validate_market_data(config)?;
    validate_report(config)?;
    validate_coin_symbols_unique(config)?;
    Ok(())
}

fn invalid(field: String) -> Report<ConfigError> {
    Report::new(ConfigError::Validation { field })
}

fn validate_general(config: &AppConfig) -> Result<(), Report<ConfigError>> {
    let format = config.general.log_format.as_str();
    if !VALID_LOG_FORMATS.contains(&format) {
        return Err(invalid(format!(
            "general.log_format \"{format}\" is not valid"
        )));
    }
    let label_format = config.general.label_format.as_str();
    if StrftimeItems::new(label_format).any(|item| matches!(item, Item::Error)) {
        return Err(invalid(format!(
            "general.label_format \"{label_format}\" is not a valid strftime pattern"
        )));
    }
    if config.general.trend_samples == 0 {
        return Err(invalid("general.trend_samples must be > 0".into()));
    }
    Ok(())
}

fn validate_indicators(config: &AppConfig) -> Result<(), Report<ConfigError>> {
    Analyzer::new(config.indicators).change_context(ConfigError::Validation {
        field: "indicators".into(),
    })?;
    Ok(())
}

fn validate_market_data(config: &AppConfig) -> Result<(), Report<ConfigError>> {
    let market = &config.market_data;
    if ProviderKind::from_str(&market.provider).is_none() {
        return Err(invalid(format!(
            "market_data.provider \"{}\" is not valid",
            market.provider
        )));
    }
    if market.days == 0 {
        return Err(invalid("market_data.days must be > 0".into()));
    }
    if market.limit == 0 {
        return Err(invalid("market_data.limit must be > 0".into()));
    }
    // Invalid periods are reported by validate_indicators.
    if let Ok(analyzer) = Analyzer::new(config.indicators) {
        let effective = market.limit.min(MAX_CANDLES_PER_REQUEST);
        let required = analyzer.required_points();
        if effective < required {
            return Err(invalid(format!(
                "market_data.limit {} yields {effective} candles, indicators need at least {required}",
                market.limit
            )));
        }
    }
    if market.requests_per_minute == 0 {
        return Err(invalid("market_data.requests_per_minute must be > 0".into()));
    }
    Ok(())
}

fn validate_report(config: &AppConfig) -> Result<(), Report<ConfigError>> {
    let temperature = config.report.temperature;
    if !(0.0..=2.0).contains(&temperature) {
        return Err(invalid(format!(
            "report.temperature {temperature} must be within [0, 2]"
        )));
    }
    Ok(())
}

fn validate_coin_symbols_unique(config: &AppConfig) -> Result<(), Report<ConfigError>> {
    let mut seen = std::collections::HashSet::new();
    for coin in &config.coins {
        if !seen.insert(coin.symbol.to_uppercase()) {
            return Err(invalid(format!("coins: duplicate symbol \"{}\"", coin.symbol)));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml: &str) -> AppConfig {
        toml::from_str(toml).expect("parse failed")
    }

    #[test]
    fn valid_full_config_parses() {
        let toml = r#"
[general]
log_level = "debug"
log_format = "json"
label_format = "%m/%d"

[indicators]
rsi_period = 21
macd_fast = 8
macd_slow = 21
macd_signal = 5

[market_data]
provider = "binance"
interval = "4h"
limit = 300

[report]
enabled = true
model = "gpt-4o"
temperature = 0.5

[[coins]]
symbol = "BTC"
coingecko_id = "bitcoin"
binance_symbol = "BTCUSDT"
"#;
        let config = parse(toml);
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.indicators.rsi_period, 21);
        assert_eq!(config.indicators.macd_signal, 5);
        assert_eq!(config.market_data.provider, "binance");
        assert_eq!(config.market_data.limit, 300);
        assert!(config.report.enabled);
        assert_eq!(config.coins.len(), 1);
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn defaults_applied_when_fields_omitted() {
        let config = parse("");
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.general.log_format, "text");
        assert_eq!(config.general.trend_samples, 7);
        assert_eq!(config.indicators, IndicatorSettings::default());
        assert_eq!(config.market_data.provider, "coingecko");
        assert_eq!(config.market_data.vs_currency, "usd");
        assert_eq!(config.market_data.days, 30);
        assert!(!config.report.enabled);
        assert_eq!(config.report.api_key_env, "OPENAI_API_KEY");
        assert_eq!(config.report.max_tokens, 1500);
        assert!(config.coins.is_empty());
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn unknown_provider_rejected() {
        let config = parse("[market_data]\nprovider = \"kraken\"\n");
        assert!(validate(&config).is_err());
    }

    #[test]
    fn unknown_log_format_rejected() {
        let config = parse("[general]\nlog_format = \"xml\"\n");
        assert!(validate(&config).is_err());
    }

    #[test]
    fn bad_label_format_rejected() {
        let config = parse("[general]\nlabel_format = \"%Q\"\n");
        assert!(validate(&config).is_err());
    }

    #[test]
    fn zero_trend_samples_rejected() {
        let config = parse("[general]\ntrend_samples = 0\n");
        assert!(validate(&config).is_err());
    }

    #[test]
    fn invalid_indicator_periods_rejected() {
        let config = parse("[indicators]\nmacd_fast = 26\nmacd_slow = 12\n");
        assert!(validate(&config).is_err());

        let config = parse("[indicators]\nrsi_period = 0\n");
        assert!(validate(&config).is_err());
    }

    #[test]
    fn zero_days_rejected() {
        let config = parse("[market_data]\ndays = 0\n");
        assert!(validate(&config).is_err());
    }

    #[test]
    fn limit_below_indicator_minimum_rejected() {
        let config = parse("[market_data]\nlimit = 20\n");
        assert!(validate(&config).is_err());

        let config = parse("[market_data]\nlimit = 35\n");
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn limit_checked_against_custom_periods() {
        let config = parse("[indicators]\nrsi_period = 50\n\n[market_data]\nlimit = 40\n");
        assert!(validate(&config).is_err());

        let config = parse("[indicators]\nrsi_period = 50\n\n[market_data]\nlimit = 51\n");
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn out_of_range_temperature_rejected() {
        let config = parse("[report]\ntemperature = 3.5\n");
        assert!(validate(&config).is_err());
    }

    #[test]
    fn duplicate_coin_symbols_rejected() {
        let toml = r#"
[[coins]]
symbol = "BTC"
coingecko_id = "bitcoin"

[[coins]]
symbol = "btc"
coingecko_id = "bitcoin"
"#;
        let config = parse(toml);
        assert!(validate(&config).is_err());
    }
}
