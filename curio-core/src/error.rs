//! Errors in the library.
use thiserror::Error;

/// Errors in the library.
#[derive(Error, Debug)]
pub enum CurioError {
    /// Record key error.
    #[error("Record key error: {0}")]
    RecordKeyError(String),

    /// Record value type error.
    #[error("Record value type error: {0}")]
    RecordValueTypeError(String),

    /// A sample without any element was given to a statistics accumulator.
    #[error("Empty sample given for metric {0}")]
    EmptySample(String),

    /// The metric was not registered when the logger was constructed.
    #[error("Unknown metric: {0}")]
    UnknownMetric(String),

    /// The same metric was registered twice.
    #[error("Duplicate metric: {0}")]
    DuplicateMetric(String),

    /// Decimation stride must be positive.
    #[error("Invalid decimation stride: {0}")]
    InvalidDecimation(usize),

    /// The four series of a metric do not have the same length.
    #[error("Inconsistent series for {name}: mean={mean}, std={std}, min={min}, max={max}")]
    InconsistentSeries {
        /// Name of the metric.
        name: String,
        /// Length of the mean series.
        mean: usize,
        /// Length of the std series.
        std: usize,
        /// Length of the min series.
        min: usize,
        /// Length of the max series.
        max: usize,
    },

    /// Unsupported environment variant.
    #[error("Invalid variant, got {0}, should be 0 or 4")]
    InvalidEnvVariant(u8),

    /// A column is missing in the hyperparameter table.
    #[error("Hyperparameter key error: {0}")]
    HyperparamKeyError(String),

    /// A value in the hyperparameter table could not be parsed.
    #[error("Hyperparameter value error: {key}={value}")]
    HyperparamValueError {
        /// Column name.
        key: String,
        /// Raw value.
        value: String,
    },
}
