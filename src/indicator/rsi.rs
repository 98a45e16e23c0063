use error_stack::{Report, bail};

use crate::error::AnalysisError;
use crate::indicator::Indicator;

/// RSI (Relative Strength Index) using Wilder's smoothing method.
#[derive(Debug, Clone, Copy)]
pub struct Rsi {
    period: usize,
}

impl Rsi {
    pub fn new(period: usize) -> Result<Self, Report<AnalysisError>> {
        if period == 0 {
            bail!(AnalysisError::InvalidParameter {
                name: "rsi period must be > 0".into(),
            });
        }
        Ok(Self { period })
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

impl Indicator for Rsi {
    type Output = f64;

    fn name(&self) -> &str {
        "rsi"
    }

    fn required_points(&self) -> usize {
        self.period + 1
    }

    fn warm_up(&self) -> usize {
        self.period
    }

    fn calculate(&self, prices: &[f64]) -> Result<Vec<f64>, Report<AnalysisError>> {
        if prices.len() < self.required_points() {
            bail!(AnalysisError::InsufficientData {
                required: self.required_points(),
                available: prices.len(),
            });
        }

        let deltas: Vec<f64> = prices.windows(2).map(|w| w[1] - w[0]).collect();
        let period = self.period as f64;

        // Seed using simple average of first `period` gains/losses
        let mut avg_gain: f64 = deltas[..self.period]
            .iter()
            .map(|&d| d.max(0.0))
            .sum::<f64>()
            / period;
        let mut avg_loss: f64 = deltas[..self.period]
            .iter()
            .map(|&d| (-d).max(0.0))
            .sum::<f64>()
            / period;

        let mut results = Vec::with_capacity(prices.len() - self.period);
        results.push(rsi_value(avg_gain, avg_loss));

        for &delta in &deltas[self.period..] {
            let gain = delta.max(0.0);
            let loss = (-delta).max(0.0);
            avg_gain = (avg_gain * (period - 1.0) + gain) / period;
            avg_loss = (avg_loss * (period - 1.0) + loss) / period;
            results.push(rsi_value(avg_gain, avg_loss));
        }

        Ok(results)
    }
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}
