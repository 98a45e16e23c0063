use error_stack::{Report, bail};

use crate::error::AnalysisError;
use crate::indicator::Indicator;
use crate::indicator::ma::Ema;
use crate::model::MacdValue;

/// MACD (Moving Average Convergence Divergence) with signal line and histogram.
#[derive(Debug, Clone, Copy)]
pub struct Macd {
    fast: Ema,
    slow: Ema,
    signal: Ema,
}

impl Macd {
    pub fn new(
        fast_period: usize,
        slow_period: usize,
        signal_period: usize,
    ) -> Result<Self, Report<AnalysisError>> {
        if fast_period == 0 || slow_period == 0 || signal_period == 0 {
            bail!(AnalysisError::InvalidParameter {
                name: "all macd periods must be > 0".into(),
            });
        }
        if fast_period >= slow_period {
            bail!(AnalysisError::InvalidParameter {
                name: "fast_period must be < slow_period".into(),
            });
        }
        Ok(Self {
            fast: Ema::new(fast_period)?,
            slow: Ema::new(slow_period)?,
            signal: Ema::new(signal_period)?,
        })
    }

    pub fn fast_period(&self) -> usize {
        self.fast.period()
    }

    pub fn slow_period(&self) -> usize {
        self.slow.period()
    }

    pub fn signal_period(&self) -> usize {
        self.signal.period()
    }

    /// MACD rows consumed before the first defined signal value.
    pub fn signal_warm_up(&self) -> usize {
        self.signal.warm_up()
    }

    /// MACD line only: `EMA(fast) - EMA(slow)` from price index `slow - 1`.
    pub fn macd_line(&self, prices: &[f64]) -> Result<Vec<f64>, Report<AnalysisError>> {
        let fast_ema = self.fast.calculate(prices)?;
        let slow_ema = self.slow.calculate(prices)?;

        // fast_ema starts at price index fast-1, slow_ema at slow-1
        let offset = self.slow_period() - self.fast_period();
        Ok(fast_ema[offset..]
            .iter()
            .zip(slow_ema.iter())
            .map(|(f, s)| f - s)
            .collect())
    }
}

impl Indicator for Macd {
    type Output = MacdValue;

    fn name(&self) -> &str {
        "macd"
    }

    fn required_points(&self) -> usize {
        self.slow_period() + self.signal_period()
    }

    fn warm_up(&self) -> usize {
        self.slow_period() - 1
    }

    /// One row per defined MACD line value.
    ///
    /// The first `signal_period - 1` rows carry no signal or histogram.
    fn calculate(&self, prices: &[f64]) -> Result<Vec<MacdValue>, Report<AnalysisError>> {
        if prices.len() < self.required_points() {
            bail!(AnalysisError::InsufficientData {
                required: self.required_points(),
                available: prices.len(),
            });
        }

        let macd_line = self.macd_line(prices)?;
        let signal_line = self.signal.calculate(&macd_line)?;
        let signal_offset = self.signal_warm_up();

        let rows = macd_line
            .iter()
            .enumerate()
            .map(|(i, &macd)| {
                let signal = i
                    .checked_sub(signal_offset)
                    .and_then(|j| signal_line.get(j).copied());
                MacdValue {
                    macd,
                    signal,
                    histogram: signal.map(|s| macd - s),
                }
            })
            .collect();

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference_ema(prices: &[f64], period: usize) -> Vec<Option<f64>> {
        let k = 2.0 / (period as f64 + 1.0);
        let mut out = vec![None; prices.len()];
        let mut ema = prices[..period].iter().sum::<f64>() / period as f64;
        out[period - 1] = Some(ema);
        for i in period..prices.len() {
            ema = prices[i] * k + ema * (1.0 - k);
            out[i] = Some(ema);
        }
        out
    }

    fn wave(len: usize) -> Vec<f64> {
        (0..len)
            .map(|i| 100.0 + (i as f64 * 0.37).sin() * 8.0 + i as f64 * 0.2)
            .collect()
    }

    #[test]
    fn macd_invalid_fast_ge_slow() {
        assert!(Macd::new(26, 12, 9).is_err());
        assert!(Macd::new(12, 12, 9).is_err());
    }

    #[test]
    fn macd_period_zero_invalid() {
        assert!(Macd::new(0, 26, 9).is_err());
        assert!(Macd::new(12, 26, 0).is_err());
    }

    #[test]
    fn macd_insufficient_data() {
        let macd = Macd::new(12, 26, 9).unwrap();
        let err = macd.calculate(&[1.0; 34]).unwrap_err();
        assert_eq!(
            *err.current_context(),
            AnalysisError::InsufficientData {
                required: 35,
                available: 34
            }
        );
    }

    #[test]
    fn macd_rejects_fifteen_points() {
        let prices = [
            10.0, 12.0, 11.0, 13.0, 15.0, 14.0, 16.0, 18.0, 17.0, 19.0, 21.0, 20.0, 22.0, 24.0,
            23.0,
        ];
        let err = Macd::new(12, 26, 9).unwrap().calculate(&prices).unwrap_err();
        assert!(matches!(
            err.current_context(),
            AnalysisError::InsufficientData { .. }
        ));
    }

    #[test]
    fn macd_output_length_and_undefined_prefix() {
        let macd = Macd::new(12, 26, 9).unwrap();
        let prices = wave(60);
        let rows = macd.calculate(&prices).unwrap();
        assert_eq!(rows.len(), 60 - 26 + 1);

        for row in &rows[..8] {
            assert!(row.signal.is_none());
            assert!(row.histogram.is_none());
        }
        for row in &rows[8..] {
            let signal = row.signal.expect("signal defined after warm-up");
            let histogram = row.histogram.expect("histogram defined after warm-up");
            assert!((histogram - (row.macd - signal)).abs() < 1e-12);
        }
    }

    #[test]
    fn macd_line_matches_independent_emas() {
        let macd = Macd::new(12, 26, 9).unwrap();
        let prices = wave(80);
        let rows = macd.calculate(&prices).unwrap();
        let fast = reference_ema(&prices, 12);
        let slow = reference_ema(&prices, 26);

        for (i, row) in rows.iter().enumerate() {
            let t = 25 + i;
            let expected = fast[t].unwrap() - slow[t].unwrap();
            assert!((row.macd - expected).abs() < 1e-9, "mismatch at {t}");
        }
    }

    #[test]
    fn macd_signal_matches_ema_of_line() {
        let macd = Macd::new(3, 5, 3).unwrap();
        let prices = wave(20);
        let rows = macd.calculate(&prices).unwrap();
        let line: Vec<f64> = rows.iter().map(|r| r.macd).collect();
        let signal = reference_ema(&line, 3);
        for (row, expected) in rows.iter().zip(signal) {
            match (row.signal, expected) {
                (Some(a), Some(b)) => assert!((a - b).abs() < 1e-9),
                (None, None) => {}
                other => panic!("definedness mismatch: {other:?}"),
            }
        }
    }

    #[test]
    fn macd_flat_prices_returns_zero() {
        let macd = Macd::new(3, 5, 3).unwrap();
        let rows = macd.calculate(&[10.0_f64; 10]).unwrap();
        for row in &rows {
            assert!(row.macd.abs() < 1e-9, "expected 0 for flat prices, got {}", row.macd);
        }
    }

    #[test]
    fn macd_rising_prices_positive_line() {
        let macd = Macd::new(3, 5, 3).unwrap();
        let prices: Vec<f64> = (1..=12).map(|i| i as f64).collect();
        let rows = macd.calculate(&prices).unwrap();
        assert!(rows.iter().all(|r| r.macd > 0.0));
    }
}
