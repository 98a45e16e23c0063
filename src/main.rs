mod align;
mod analysis;
mod chart;
mod config;
mod error;
mod indicator;
mod market_data;
mod model;
mod normalize;
mod report;
mod symbols;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use derive_more::{Display, Error};
use error_stack::{Report, ResultExt};
use serde::Serialize;
use tracing::{Instrument, info, info_span, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use analysis::{Analysis, Analyzer};
use chart::ChartData;
use config::AppConfig;
use market_data::build_provider;
use model::{InputMode, ProviderKind, RawSeries};
use report::chat::ChatCompletionReporter;
use report::{ReportGenerator, ReportRequest};
use symbols::SymbolRegistry;

/// Rows shown by the text output.
const TEXT_TAIL_ROWS: usize = 10;

#[derive(Debug, Display, Error)]
pub enum AppError {
    #[display("configuration error")]
    Config,
    #[display("market data error")]
    MarketData,
    #[display("analysis failed")]
    Analysis,
    #[display("failed to read input")]
    Input,
    #[display("runtime error")]
    Runtime,
}

#[derive(Parser)]
#[command(name = "coin-analyzer", about = "RSI/MACD chart data and strategy reports for crypto symbols")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch price history for a symbol and compute its indicators
    Analyze {
        /// Symbol such as BTC or eth
        symbol: String,
        /// Override `market_data.provider`
        #[arg(long, value_enum)]
        provider: Option<ProviderArg>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
        /// Skip the strategy report even if enabled in config
        #[arg(long)]
        no_report: bool,
    },
    /// Compute indicators from a saved provider payload
    File {
        path: PathBuf,
        #[arg(long, value_enum)]
        mode: ModeArg,
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },
    /// List supported symbols
    Symbols,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ProviderArg {
    Coingecko,
    Binance,
}

impl From<ProviderArg> for ProviderKind {
    fn from(arg: ProviderArg) -> Self {
        match arg {
            ProviderArg::Coingecko => ProviderKind::CoinGecko,
            ProviderArg::Binance => ProviderKind::Binance,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    Pairs,
    Candles,
}

impl From<ModeArg> for InputMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Pairs => InputMode::Pairs,
            ModeArg::Candles => InputMode::Candles,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Text,
}

/// Everything loaded once at startup and shared read-only by every request.
struct App {
    config: AppConfig,
    registry: SymbolRegistry,
    analyzer: Analyzer,
}

#[derive(Serialize)]
struct AnalysisOutput {
    title: String,
    source: String,
    last_price: f64,
    price_trend: ChartData,
    chart: ChartData,
    report: Option<String>,
}

#[tokio::main]
async fn main() {
    if let Err(report) = run().await {
        eprintln!("{report:?}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Report<AppError>> {
    let cli = Cli::parse();
    let config = config::load(Path::new(&cli.config)).change_context(AppError::Config)?;

    init_tracing(&config);

    let app = App {
        registry: SymbolRegistry::from_config(&config.coins),
        analyzer: Analyzer::new(config.indicators).change_context(AppError::Config)?,
        config,
    };
    info!(coins = app.registry.len(), "symbol registry loaded");

    match cli.command {
        Command::Analyze {
            symbol,
            provider,
            format,
            no_report,
        } => {
            let request_id = Uuid::new_v4();
            let span = info_span!("analysis", %request_id, symbol = %symbol);
            analyze_symbol(&app, &symbol, provider.map(Into::into), format, !no_report)
                .instrument(span)
                .await
        }
        Command::File { path, mode, format } => {
            let request_id = Uuid::new_v4();
            let span = info_span!("analysis", %request_id, path = %path.display());
            analyze_file(&app, &path, mode.into(), format)
                .instrument(span)
                .await
        }
        Command::Symbols => {
            for listing in app.registry.listings() {
                println!(
                    "{:<6} coingecko={:<20} binance={}",
                    listing.symbol, listing.coingecko_id, listing.binance_symbol
                );
            }
            Ok(())
        }
    }
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::new(&config.general.log_level);
    // stdout carries the analysis output
    match config.general.log_format.as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

async fn analyze_symbol(
    app: &App,
    symbol: &str,
    provider: Option<ProviderKind>,
    format: OutputFormat,
    with_report: bool,
) -> Result<(), Report<AppError>> {
    let coin = app
        .registry
        .resolve(symbol)
        .change_context(AppError::MarketData)?;

    // Validated at config load.
    let kind = provider
        .or_else(|| ProviderKind::from_str(&app.config.market_data.provider))
        .unwrap_or(ProviderKind::CoinGecko);
    let source = build_provider(kind, &app.config.market_data).change_context(AppError::MarketData)?;

    info!(
        provider = %source.kind(),
        mode = %kind.input_mode(),
        coin = %coin.symbol,
        "fetching price history"
    );
    let raw = source
        .fetch_series(coin)
        .await
        .change_context(AppError::MarketData)
        .attach_with(|| format!("symbol: {}", coin.symbol))?;

    let analysis = compute(app.analyzer, raw).await?;

    let report = if with_report && app.config.report.enabled {
        generate_report(app, &coin.symbol, &analysis).await
    } else {
        None
    };

    let general = &app.config.general;
    let output = AnalysisOutput {
        title: coin.symbol.clone(),
        source: kind.to_string(),
        last_price: analysis.series.last().close,
        price_trend: ChartData::price_trend(
            format!(
                "{} price ({})",
                coin.symbol,
                app.config.market_data.vs_currency.to_uppercase()
            ),
            &analysis.series,
            general.trend_samples,
            &general.label_format,
        ),
        chart: ChartData::project(
            coin.symbol.as_str(),
            &analysis.aligned,
            &general.label_format,
        ),
        report,
    };
    print_output(&output, format)
}

async fn analyze_file(
    app: &App,
    path: &Path,
    mode: InputMode,
    format: OutputFormat,
) -> Result<(), Report<AppError>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .change_context(AppError::Input)
        .attach_with(|| format!("path: {}", path.display()))?;
    let payload: serde_json::Value = serde_json::from_str(&content)
        .change_context(AppError::Input)
        .attach_with(|| format!("path: {}", path.display()))?;

    let analysis = compute(app.analyzer, RawSeries { mode, payload }).await?;

    let title = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let general = &app.config.general;
    let output = AnalysisOutput {
        price_trend: ChartData::price_trend(
            format!("{title} price"),
            &analysis.series,
            general.trend_samples,
            &general.label_format,
        ),
        chart: ChartData::project(title.as_str(), &analysis.aligned, &general.label_format),
        title,
        source: format!("file ({mode})"),
        last_price: analysis.series.last().close,
        report: None,
    };
    print_output(&output, format)
}

/// Runs the CPU-bound pipeline on the blocking pool.
async fn compute(analyzer: Analyzer, raw: RawSeries) -> Result<Analysis, Report<AppError>> {
    let analysis = tokio::task::spawn_blocking(move || analyzer.analyze(&raw))
        .await
        .change_context(AppError::Runtime)?
        .change_context(AppError::Analysis)?;

    info!(
        points = analysis.series.len(),
        aligned = analysis.aligned.len(),
        "analysis complete"
    );
    Ok(analysis)
}

/// Report failures are logged and never fail the request.
async fn generate_report(app: &App, symbol: &str, analysis: &Analysis) -> Option<String> {
    let request =
        ReportRequest::from_analysis(symbol, &app.config.market_data.vs_currency, analysis)?;

    let reporter = match ChatCompletionReporter::from_config(&app.config.report) {
        Ok(r) => r,
        Err(e) => {
            warn!(error = ?e, "report generator unavailable, skipping report");
            return None;
        }
    };

    match reporter.generate(&request).await {
        Ok(text) => Some(text),
        Err(e) => {
            warn!(error = ?e, "strategy report failed");
            None
        }
    }
}

fn print_output(output: &AnalysisOutput, format: OutputFormat) -> Result<(), Report<AppError>> {
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(output).change_context(AppError::Runtime)?;
            println!("{json}");
        }
        OutputFormat::Text => println!("{}", render_text(output)),
    }
    Ok(())
}

fn render_text(output: &AnalysisOutput) -> String {
    let chart = &output.chart;
    let (rsi, macd, signal, histogram) = (
        column(chart, "RSI"),
        column(chart, "MACD"),
        column(chart, "Signal"),
        column(chart, "Histogram"),
    );

    let mut lines = vec![
        format!(
            "{} via {} | last price {:.8}",
            output.title, output.source, output.last_price
        ),
        render_trend(&output.price_trend),
        format!(
            "{:<18} {:>8} {:>14} {:>14} {:>14}",
            "time", "rsi", "macd", "signal", "histogram"
        ),
    ];

    let start = chart.labels.len().saturating_sub(TEXT_TAIL_ROWS);
    for i in start..chart.labels.len() {
        lines.push(format!(
            "{:<18} {:>8.2} {:>14.6} {:>14.6} {:>14.6}",
            chart.labels[i], rsi[i], macd[i], signal[i], histogram[i]
        ));
    }

    if let Some(report) = &output.report {
        lines.push(String::new());
        lines.push(report.clone());
    }
    lines.join("\n")
}

fn render_trend(trend: &ChartData) -> String {
    let prices = column(trend, "Price");
    let points: Vec<String> = trend
        .labels
        .iter()
        .zip(prices)
        .map(|(label, price)| format!("{label} {price:.8}"))
        .collect();
    format!("trend: {}", points.join(" | "))
}

fn column<'a>(chart: &'a ChartData, label: &str) -> &'a [f64] {
    chart.dataset(label).map(|d| d.data.as_slice()).unwrap_or(&[])
}
