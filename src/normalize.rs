//! Flattens provider-specific raw records into a [`PriceSeries`].

use chrono::{DateTime, Utc};
use error_stack::{Report, bail};
use serde_json::Value;
use tracing::warn;

use crate::error::AnalysisError;
use crate::model::{InputMode, PricePoint, PriceSeries, RawSeries};

/// Index of the close price in an OHLCV candle tuple.
const CANDLE_CLOSE_INDEX: usize = 4;

/// Largest accepted close magnitude. Indicator sums over any realistic
/// series of such values stay finite.
const MAX_ABS_PRICE: f64 = 1e100;

/// Parse `raw` according to its declared mode.
///
/// Fails with `MalformedSeries` for any unparseable record or when fewer
/// than `min_points` (and never fewer than 2) points are present.
pub fn normalize(raw: &RawSeries, min_points: usize) -> Result<PriceSeries, Report<AnalysisError>> {
    let Some(records) = raw.payload.as_array() else {
        bail!(malformed(format!("{} payload is not an array", raw.mode)));
    };

    let min_points = min_points.max(2);
    if records.len() < min_points {
        bail!(malformed(format!(
            "need at least {min_points} points, got {}",
            records.len()
        )));
    }

    let points = records
        .iter()
        .enumerate()
        .map(|(index, record)| parse_record(raw.mode, index, record))
        .collect::<Result<Vec<_>, _>>()?;

    if let Some(i) = points
        .windows(2)
        .position(|w| w[1].timestamp <= w[0].timestamp)
    {
        warn!(
            index = i + 1,
            mode = %raw.mode,
            "timestamps not strictly ascending"
        );
    }

    PriceSeries::new(points).ok_or_else(|| Report::new(malformed("empty series".into())))
}

fn parse_record(
    mode: InputMode,
    index: usize,
    record: &Value,
) -> Result<PricePoint, Report<AnalysisError>> {
    let Some(fields) = record.as_array() else {
        bail!(malformed(format!("record {index} is not an array")));
    };

    let close_index = match mode {
        InputMode::Pairs => 1,
        InputMode::Candles => CANDLE_CLOSE_INDEX,
    };
    if fields.len() <= close_index {
        bail!(malformed(format!(
            "record {index} has {} fields, {mode} need at least {}",
            fields.len(),
            close_index + 1
        )));
    }

    let timestamp = parse_timestamp(&fields[0])
        .ok_or_else(|| Report::new(malformed(format!("record {index} has an invalid timestamp"))))?;
    let close = parse_price(&fields[close_index])
        .ok_or_else(|| Report::new(malformed(format!("record {index} has an invalid close"))))?;

    Ok(PricePoint { timestamp, close })
}

fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    // Some providers serialize integral millis as floats (e.g. 1.7e12).
    let ms = match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        })?,
        _ => return None,
    };
    DateTime::from_timestamp_millis(ms)
}

fn parse_price(value: &Value) -> Option<f64> {
    let price = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    (price.is_finite() && price.abs() <= MAX_ABS_PRICE).then_some(price)
}

fn malformed(reason: String) -> AnalysisError {
    AnalysisError::MalformedSeries { reason }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pairs(payload: Value) -> RawSeries {
        RawSeries {
            mode: InputMode::Pairs,
            payload,
        }
    }

    fn candles(payload: Value) -> RawSeries {
        RawSeries {
            mode: InputMode::Candles,
            payload,
        }
    }

    fn assert_malformed(result: Result<PriceSeries, Report<AnalysisError>>) {
        let err = result.unwrap_err();
        assert!(
            matches!(err.current_context(), AnalysisError::MalformedSeries { .. }),
            "unexpected error: {err:?}"
        );
    }

    #[test]
    fn pairs_parse_into_series() {
        let raw = pairs(json!([
            [1704067200000_i64, 42000.5],
            [1704153600000_i64, 42100.0],
            [1704240000000_i64, "42200.25"]
        ]));
        let series = normalize(&raw, 3).unwrap();
        assert_eq!(series.closes(), vec![42000.5, 42100.0, 42200.25]);
        assert_eq!(series.points()[0].timestamp.timestamp_millis(), 1704067200000);
    }

    #[test]
    fn candles_take_close_at_index_four() {
        let raw = candles(json!([
            [1704067200000_i64, "1.0", "2.0", "0.5", "1.5", "10.0", 1704067259999_i64],
            [1704067260000_i64, "1.5", "2.5", "1.0", "2.25", "11.0", 1704067319999_i64]
        ]));
        let series = normalize(&raw, 2).unwrap();
        assert_eq!(series.closes(), vec![1.5, 2.25]);
        assert_eq!(series.points()[1].timestamp.timestamp_millis(), 1704067260000);
    }

    #[test]
    fn float_encoded_timestamps_accepted() {
        let raw = pairs(json!([[1.0e12, 1.0], [1.0e12 + 60000.0, 2.0]]));
        let series = normalize(&raw, 2).unwrap();
        assert_eq!(series.points()[1].timestamp.timestamp_millis(), 1_000_000_060_000);
    }

    #[test]
    fn empty_series_rejected() {
        assert_malformed(normalize(&pairs(json!([])), 0));
    }

    #[test]
    fn single_element_series_rejected() {
        assert_malformed(normalize(&pairs(json!([[1704067200000_i64, 1.0]])), 1));
    }

    #[test]
    fn below_minimum_rejected() {
        let payload: Vec<Value> = (0..34).map(|i| json!([i * 1000, 1.0])).collect();
        assert_malformed(normalize(&pairs(Value::Array(payload)), 35));
    }

    #[test]
    fn non_array_payload_rejected() {
        assert_malformed(normalize(&pairs(json!({"prices": []})), 2));
    }

    #[test]
    fn short_candle_rejected() {
        let raw = candles(json!([
            [1704067200000_i64, "1.0", "2.0", "0.5"],
            [1704067260000_i64, "1.5", "2.5", "1.0"]
        ]));
        assert_malformed(normalize(&raw, 2));
    }

    #[test]
    fn unparseable_close_rejected() {
        let raw = candles(json!([
            [1704067200000_i64, "1.0", "2.0", "0.5", "abc", "1"],
            [1704067260000_i64, "1.0", "2.0", "0.5", "1.0", "1"]
        ]));
        assert_malformed(normalize(&raw, 2));
    }

    #[test]
    fn non_finite_close_rejected() {
        let raw = pairs(json!([[1000, "NaN"], [2000, 1.0]]));
        assert_malformed(normalize(&raw, 2));
    }

    #[test]
    fn overflowing_close_rejected() {
        let payload: Vec<Value> = (0..40)
            .map(|i| {
                let close = if i % 2 == 0 { 1.7e308 } else { 1.0 };
                json!([1_000 * i, close])
            })
            .collect();
        assert_malformed(normalize(&pairs(Value::Array(payload)), 35));
    }

    #[test]
    fn large_but_bounded_close_accepted() {
        let raw = pairs(json!([[1000, 1e100], [2000, "2.5e99"]]));
        let series = normalize(&raw, 2).unwrap();
        assert_eq!(series.closes(), vec![1e100, 2.5e99]);
    }

    #[test]
    fn string_timestamp_rejected() {
        let raw = pairs(json!([["1000", 1.0], [2000, 1.0]]));
        assert_malformed(normalize(&raw, 2));
    }

    #[test]
    fn out_of_order_timestamps_are_tolerated() {
        let raw = pairs(json!([[2000, 1.0], [1000, 2.0], [1000, 3.0]]));
        let series = normalize(&raw, 2).unwrap();
        assert_eq!(series.len(), 3);
    }
}
