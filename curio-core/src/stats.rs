//! Running statistics of scalar streams.
//!
//! [`LogData`] accumulates the mean, standard deviation, minimum and maximum of
//! every sample it is given. [`TemporalLogger`] holds one [`LogData`] per
//! [`Metric`] of a fixed set chosen at construction, and persists them into a
//! single file keyed by metric name.
mod log_data;
mod metric;
mod temporal_logger;

pub use log_data::{LogData, StatsFile};
pub use metric::Metric;
pub use temporal_logger::TemporalLogger;
