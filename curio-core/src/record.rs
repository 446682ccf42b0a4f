//! Key-value records of scalar telemetry.
//!
//! A [`Record`] is the common currency between the models and whatever
//! telemetry backend the training loop uses. Models produce records (e.g.
//! parameter statistics), and the [`TemporalLogger`](crate::stats::TemporalLogger)
//! summarizes its latest statistics as a record.
//!
//! ```rust
//! use curio_core::record::{Record, RecordValue};
//!
//! let mut record = Record::from_scalar("loss", 0.5);
//! record.insert("features", RecordValue::Array1(vec![0.1, 0.2]));
//! assert_eq!(record.get_scalar("loss").unwrap(), 0.5);
//! ```
mod base;

pub use base::{Record, RecordValue};
