//! Maps RSI and MACD output onto one common index space with the timestamps.
//!
//! RSI row `i` belongs to price `rsi_period + i`, MACD row `i` to price
//! `slow_period - 1 + i`, and the MACD signal is defined only from MACD row
//! `signal_period - 1`. The aligner drops the front of every array up to the
//! first price for which all of them are defined.

use chrono::{DateTime, Utc};
use error_stack::{Report, bail, ensure};

use crate::error::AnalysisError;
use crate::model::{AlignedSeries, MacdPoint, MacdValue};

/// Price index of the first defined row of each indicator output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Offsets {
    pub rsi: usize,
    pub macd_line: usize,
    pub signal: usize,
}

impl Offsets {
    /// Built from indicator warm-ups: RSI, the MACD line, and the signal EMA over that line.
    pub fn new(rsi_warm_up: usize, macd_warm_up: usize, signal_warm_up: usize) -> Self {
        Self {
            rsi: rsi_warm_up,
            macd_line: macd_warm_up,
            signal: macd_warm_up + signal_warm_up,
        }
    }

    /// Index of the first price at which every indicator is defined.
    pub fn common(&self) -> usize {
        self.rsi.max(self.signal)
    }
}

pub fn align(
    offsets: Offsets,
    timestamps: &[DateTime<Utc>],
    rsi: &[f64],
    macd: &[MacdValue],
) -> Result<AlignedSeries, Report<AnalysisError>> {
    let n = timestamps.len();
    check_len("rsi", rsi.len(), n, offsets.rsi)?;
    check_len("macd", macd.len(), n, offsets.macd_line)?;

    let common = offsets.common();
    if n <= common {
        bail!(AnalysisError::InsufficientData {
            required: common + 1,
            available: n,
        });
    }

    let labels = timestamps[common..].to_vec();
    let rsi = rsi[common - offsets.rsi..].to_vec();
    let macd = macd[common - offsets.macd_line..]
        .iter()
        .enumerate()
        .map(|(i, row)| defined_point(row, common + i))
        .collect::<Result<Vec<_>, _>>()?;

    ensure!(
        labels.len() == rsi.len() && rsi.len() == macd.len(),
        AnalysisError::AlignmentViolation {
            detail: format!(
                "labels={} rsi={} macd={}",
                labels.len(),
                rsi.len(),
                macd.len()
            ),
        }
    );

    Ok(AlignedSeries::from_parts(labels, rsi, macd))
}

fn check_len(
    name: &str,
    actual: usize,
    n: usize,
    offset: usize,
) -> Result<(), Report<AnalysisError>> {
    let expected = n.saturating_sub(offset);
    ensure!(
        actual == expected,
        AnalysisError::AlignmentViolation {
            detail: format!("{name} has {actual} rows, expected {expected} for {n} prices"),
        }
    );
    Ok(())
}

fn defined_point(row: &MacdValue, index: usize) -> Result<MacdPoint, Report<AnalysisError>> {
    match (row.signal, row.histogram) {
        (Some(signal), Some(histogram)) => Ok(MacdPoint {
            macd: row.macd,
            signal,
            histogram,
        }),
        _ => bail!(AnalysisError::AlignmentViolation {
            detail: format!("macd signal undefined at price index {index}"),
        }),
    }
}
