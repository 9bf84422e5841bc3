use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read stores file {path}: {source}")]
    StoresFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse stores file: {0}")]
    StoresFileParse(#[from] serde_yaml::Error),

    #[error("stores validation failed: {0}")]
    Validation(String),
}

/// Failures raised while turning raw listing strings into local-currency
/// prices. Policy rejections are not errors; see [`crate::Rejection`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PricingError {
    #[error("malformed price string {raw:?}: no numeral found")]
    MalformedPrice { raw: String },

    #[error("exchange rate must be positive, got {0}")]
    InvalidExchangeRate(Decimal),

    #[error("currency margin must be positive, got {0}")]
    InvalidMargin(Decimal),

    #[error("price {0} does not fit in whole currency units")]
    OutOfRange(Decimal),
}
