use error_stack::Report;
use serde::Deserialize;
use tracing::debug;

use crate::align::{Offsets, align};
use crate::error::AnalysisError;
use crate::indicator::Indicator;
use crate::indicator::macd::Macd;
use crate::indicator::rsi::Rsi;
use crate::model::{AlignedSeries, PriceSeries, RawSeries};
use crate::normalize::normalize;

fn default_rsi_period() -> usize {
    14
}

fn default_macd_fast() -> usize {
    12
}

fn default_macd_slow() -> usize {
    26
}

fn default_macd_signal() -> usize {
    9
}

/// Indicator periods, as read from the `[indicators]` config section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct IndicatorSettings {
    #[serde(default = "default_rsi_period")]
    pub rsi_period: usize,
    #[serde(default = "default_macd_fast")]
    pub macd_fast: usize,
    #[serde(default = "default_macd_slow")]
    pub macd_slow: usize,
    #[serde(default = "default_macd_signal")]
    pub macd_signal: usize,
}

impl Default for IndicatorSettings {
    fn default() -> Self {
        Self {
            rsi_period: default_rsi_period(),
            macd_fast: default_macd_fast(),
            macd_slow: default_macd_slow(),
            macd_signal: default_macd_signal(),
        }
    }
}

/// Output of one analysis request.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub series: PriceSeries,
    pub aligned: AlignedSeries,
}

/// Normalizer, RSI, MACD and aligner under one parameter set.
#[derive(Debug, Clone, Copy)]
pub struct Analyzer {
    rsi: Rsi,
    macd: Macd,
}

impl Analyzer {
    pub fn new(settings: IndicatorSettings) -> Result<Self, Report<AnalysisError>> {
        Ok(Self {
            rsi: Rsi::new(settings.rsi_period)?,
            macd: Macd::new(settings.macd_fast, settings.macd_slow, settings.macd_signal)?,
        })
    }

    /// Fewest raw points the normalizer accepts.
    pub fn required_points(&self) -> usize {
        self.rsi
            .required_points()
            .max(self.macd.required_points())
    }

    pub fn offsets(&self) -> Offsets {
        Offsets::new(
            self.rsi.warm_up(),
            self.macd.warm_up(),
            self.macd.signal_warm_up(),
        )
    }

    pub fn analyze(&self, raw: &RawSeries) -> Result<Analysis, Report<AnalysisError>> {
        let series = normalize(raw, self.required_points())?;
        let aligned = self.analyze_prices(&series)?;
        Ok(Analysis { series, aligned })
    }

    pub fn analyze_prices(
        &self,
        series: &PriceSeries,
    ) -> Result<AlignedSeries, Report<AnalysisError>> {
        let closes = series.closes();
        let rsi = self.rsi.calculate(&closes)?;
        let macd = self.macd.calculate(&closes)?;
        let aligned = align(self.offsets(), &series.timestamps(), &rsi, &macd)?;

        debug!(
            points = series.len(),
            rsi_indicator = self.rsi.name(),
            macd_indicator = self.macd.name(),
            rsi = rsi.len(),
            macd = macd.len(),
            aligned = aligned.len(),
            "indicators computed"
        );

        Ok(aligned)
    }
}
