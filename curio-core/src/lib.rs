#![warn(missing_docs)]
//! Backend-independent components of curiosity-driven A2C agents.
//!
//! * [`stats`] accumulates running statistics of scalar streams and persists them.
//! * [`hyperparams`] reads and appends the table of run configurations.
//! * [`record`] defines the key-value records exchanged with telemetry.
//! * [`summary`] compares the runs recorded for one environment.
pub mod env_name;
pub mod error;
pub mod hyperparams;
pub mod record;
pub mod stats;
pub mod summary;

/// Timestamp identifying a training run, e.g. `2020-01-31_13-45-00`.
pub fn run_timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d_%H-%M-%S").to_string()
}
