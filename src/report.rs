pub mod chat;

use chrono::{DateTime, Utc};
use error_stack::Report;
use futures::future::BoxFuture;

use crate::analysis::Analysis;
use crate::error::ReportError;
use crate::model::MacdPoint;

/// Snapshot of one analysis handed to the report writer.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRequest {
    pub symbol: String,
    pub vs_currency: String,
    pub price: f64,
    pub as_of: DateTime<Utc>,
    pub rsi: f64,
    pub macd: MacdPoint,
}

impl ReportRequest {
    /// Uses the last aligned row; `None` when nothing is aligned.
    pub fn from_analysis(symbol: &str, vs_currency: &str, analysis: &Analysis) -> Option<Self> {
        let (as_of, rsi, macd) = analysis.aligned.latest()?;
        Some(Self {
            symbol: symbol.to_uppercase(),
            vs_currency: vs_currency.to_uppercase(),
            price: analysis.series.last().close,
            as_of,
            rsi,
            macd,
        })
    }

    /// User-turn prompt text.
    pub fn prompt(&self) -> String {
        format!(
            "Symbol: {symbol}\n\
             Current price: {price:.8} {currency} (as of {as_of})\n\
             RSI: {rsi:.2}\n\
             MACD: {macd:.6}, signal: {signal:.6}, histogram: {histogram:.6}\n\n\
             Write the strategy report for {symbol} following the required format exactly.",
            symbol = self.symbol,
            price = self.price,
            currency = self.vs_currency,
            as_of = self.as_of.format("%Y-%m-%d %H:%M UTC"),
            rsi = self.rsi,
            macd = self.macd.macd,
            signal = self.macd.signal,
            histogram = self.macd.histogram,
        )
    }
}

/// Writer of the narrative strategy report.
pub trait ReportGenerator: Send + Sync {
    fn generate<'a>(
        &'a self,
        request: &'a ReportRequest,
    ) -> BoxFuture<'a, Result<String, Report<ReportError>>>;
}
