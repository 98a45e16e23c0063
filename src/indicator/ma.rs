use error_stack::{Report, bail};

use crate::error::AnalysisError;
use crate::indicator::Indicator;

/// Exponential Moving Average.
#[derive(Debug, Clone, Copy)]
pub struct Ema {
    period: usize,
}

impl Ema {
    pub fn new(period: usize) -> Result<Self, Report<AnalysisError>> {
        if period == 0 {
            bail!(AnalysisError::InvalidParameter {
                name: "period must be > 0".into(),
            });
        }
        Ok(Self { period })
    }

    pub fn period(&self) -> usize {
        self.period
    }

    /// Smoothing factor `2 / (period + 1)`.
    pub fn alpha(&self) -> f64 {
        2.0 / (self.period as f64 + 1.0)
    }
}

impl Indicator for Ema {
    type Output = f64;

    fn name(&self) -> &str {
        "ema"
    }

    fn required_points(&self) -> usize {
        self.period
    }

    fn warm_up(&self) -> usize {
        self.period - 1
    }

    fn calculate(&self, prices: &[f64]) -> Result<Vec<f64>, Report<AnalysisError>> {
        if prices.len() < self.period {
            bail!(AnalysisError::InsufficientData {
                required: self.period,
                available: prices.len(),
            });
        }

        let k = self.alpha();
        // Seed with SMA of first `period` values
        let seed: f64 = prices[..self.period].iter().sum::<f64>() / self.period as f64;
        let mut ema = seed;
        let mut results = Vec::with_capacity(prices.len() - self.period + 1);
        results.push(ema);

        for &price in &prices[self.period..] {
            ema = price * k + ema * (1.0 - k);
            results.push(ema);
        }

        Ok(results)
    }
}
