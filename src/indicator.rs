pub mod ma;
pub mod macd;
pub mod rsi;

use error_stack::Report;

use crate::error::AnalysisError;

/// A technical analysis indicator computed over closing prices.
///
/// Prices must be in ascending chronological order (oldest first).
pub trait Indicator: Send + Sync {
    /// One output row.
    type Output;

    /// Unique name of this indicator (e.g., "rsi", "macd").
    fn name(&self) -> &str;

    /// Minimum number of prices required to produce at least one output value.
    fn required_points(&self) -> usize;

    /// Number of leading prices consumed before the first output row.
    ///
    /// Output row `i` corresponds to input price `warm_up() + i`.
    fn warm_up(&self) -> usize;

    /// Calculate indicator values from closing prices.
    fn calculate(&self, prices: &[f64]) -> Result<Vec<Self::Output>, Report<AnalysisError>>;
}
