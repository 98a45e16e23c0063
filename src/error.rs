use derive_more::{Display, Error};

#[derive(Debug, Display, Error)]
pub enum ConfigError {
    #[display("failed to read config file")]
    ReadFile,
    #[display("failed to parse config: {reason}")]
    Parse { reason: String },
    #[display("invalid config: {field}")]
    Validation { field: String },
}

#[derive(Debug, Display, Error)]
pub enum MarketDataError {
    #[display("unsupported symbol: {symbol}")]
    UnsupportedSymbol { symbol: String },
    #[display("request to {provider} failed")]
    Request { provider: String },
    #[display("failed to parse response from {provider}")]
    ResponseParse { provider: String },
}

/// Failure kinds of the indicator pipeline. None of them are retried.
#[derive(Debug, Display, Error, PartialEq)]
pub enum AnalysisError {
    #[display("malformed series: {reason}")]
    MalformedSeries { reason: String },
    #[display("insufficient data: need {required}, got {available}")]
    InsufficientData { required: usize, available: usize },
    /// Unequal or mis-sized arrays reached the aligner. Always a defect.
    #[display("alignment violation: {detail}")]
    AlignmentViolation { detail: String },
    #[display("invalid parameter: {name}")]
    InvalidParameter { name: String },
}

#[derive(Debug, Display, Error)]
pub enum ReportError {
    #[display("api key not set in ${env}")]
    MissingApiKey { env: String },
    #[display("report request failed")]
    Request,
    #[display("failed to parse report response")]
    ResponseParse,
}
