use serde::Serialize;

use crate::model::{AlignedSeries, PriceSeries};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dataset {
    pub label: String,
    pub data: Vec<f64>,
}

/// Renderable projection of an [`AlignedSeries`]: one label per point and
/// one dataset per indicator line, all of equal length.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartData {
    pub title: String,
    pub labels: Vec<String>,
    pub datasets: Vec<Dataset>,
}

impl ChartData {
    /// `label_format` is a chrono format string applied to each label.
    pub fn project(title: impl Into<String>, aligned: &AlignedSeries, label_format: &str) -> Self {
        let labels = aligned
            .labels()
            .iter()
            .map(|t| t.format(label_format).to_string())
            .collect();

        let macd = aligned.macd();
        let datasets = vec![
            dataset("RSI", aligned.rsi().to_vec()),
            dataset("MACD", macd.iter().map(|p| p.macd).collect()),
            dataset("Signal", macd.iter().map(|p| p.signal).collect()),
            dataset("Histogram", macd.iter().map(|p| p.histogram).collect()),
        ];

        Self {
            title: title.into(),
            labels,
            datasets,
        }
    }

    /// Close-price line thinned to roughly `samples` points.
    ///
    /// Keeps every `len / samples`-th point starting from the oldest, so the
    /// result can hold a few more than `samples` points when `len` does not
    /// divide evenly.
    pub fn price_trend(
        title: impl Into<String>,
        series: &PriceSeries,
        samples: usize,
        label_format: &str,
    ) -> Self {
        let step = trend_step(series.len(), samples);
        let (labels, data): (Vec<String>, Vec<f64>) = series
            .points()
            .iter()
            .step_by(step)
            .map(|p| (p.timestamp.format(label_format).to_string(), p.close))
            .unzip();

        Self {
            title: title.into(),
            labels,
            datasets: vec![dataset("Price", data)],
        }
    }

    pub fn dataset(&self, label: &str) -> Option<&Dataset> {
        self.datasets.iter().find(|d| d.label == label)
    }
}

fn trend_step(len: usize, samples: usize) -> usize {
    (len / samples.max(1)).max(1)
}

fn dataset(label: &str, data: Vec<f64>) -> Dataset {
    Dataset {
        label: label.to_owned(),
        data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MacdPoint, PricePoint};
    use chrono::DateTime;

    fn daily_series(days: i64) -> PriceSeries {
        let points = (0..days)
            .map(|i| PricePoint {
                timestamp: DateTime::from_timestamp_millis(1704067200000 + i * 86_400_000)
                    .unwrap(),
                close: 100.0 + i as f64,
            })
            .collect();
        PriceSeries::new(points).unwrap()
    }

    fn aligned() -> AlignedSeries {
        let labels = vec![
            DateTime::from_timestamp_millis(1704067200000).unwrap(),
            DateTime::from_timestamp_millis(1704153600000).unwrap(),
        ];
        let macd = vec![
            MacdPoint {
                macd: 1.0,
                signal: 0.5,
                histogram: 0.5,
            },
            MacdPoint {
                macd: -1.0,
                signal: -0.25,
                histogram: -0.75,
            },
        ];
        AlignedSeries::from_parts(labels, vec![61.0, 39.0], macd)
    }

    #[test]
    fn projects_all_datasets() {
        let chart = ChartData::project("BTC", &aligned(), "%Y-%m-%d");
        assert_eq!(chart.labels, vec!["2024-01-01", "2024-01-02"]);
        assert_eq!(chart.dataset("RSI").unwrap().data, vec![61.0, 39.0]);
        assert_eq!(chart.dataset("MACD").unwrap().data, vec![1.0, -1.0]);
        assert_eq!(chart.dataset("Signal").unwrap().data, vec![0.5, -0.25]);
        assert_eq!(chart.dataset("Histogram").unwrap().data, vec![0.5, -0.75]);
        for d in &chart.datasets {
            assert_eq!(d.data.len(), chart.labels.len());
        }
    }

    #[test]
    fn serializes_to_json() {
        let chart = ChartData::project("ETH", &aligned(), "%H:%M");
        let json = serde_json::to_value(&chart).unwrap();
        assert_eq!(json["title"], "ETH");
        assert_eq!(json["labels"][0], "00:00");
        assert_eq!(json["datasets"].as_array().unwrap().len(), 4);
    }

    #[test]
    fn trend_step_floors_and_never_drops_to_zero() {
        assert_eq!(trend_step(168, 7), 24);
        assert_eq!(trend_step(30, 7), 4);
        assert_eq!(trend_step(5, 7), 1);
        assert_eq!(trend_step(10, 0), 10);
    }

    #[test]
    fn price_trend_samples_every_step_th_point() {
        let chart = ChartData::price_trend("BTC", &daily_series(30), 7, "%m-%d");
        let prices = &chart.dataset("Price").unwrap().data;
        // step 4 over 30 points keeps indices 0, 4, ..., 28
        assert_eq!(chart.labels.len(), 8);
        assert_eq!(prices.len(), chart.labels.len());
        assert_eq!(prices[0], 100.0);
        assert_eq!(prices[1], 104.0);
        assert_eq!(*prices.last().unwrap(), 128.0);
        assert_eq!(chart.labels[0], "01-01");
        assert_eq!(chart.labels[1], "01-05");
    }

    #[test]
    fn price_trend_keeps_short_series_whole() {
        let chart = ChartData::price_trend("ETH", &daily_series(3), 7, "%Y-%m-%d");
        assert_eq!(chart.labels, vec!["2024-01-01", "2024-01-02", "2024-01-03"]);
        assert_eq!(chart.datasets.len(), 1);
        assert_eq!(chart.datasets[0].data, vec![100.0, 101.0, 102.0]);
    }
}
