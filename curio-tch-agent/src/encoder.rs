//! Feature encoder with an optional recurrent memory.
//!
//! The encoder turns a batch of stacked frames `[N, C, H, W]` into feature
//! vectors. With recurrence enabled, the flattened convolutional features go
//! through an LSTM cell whose `(hidden, cell)` state is kept per environment
//! slot and can be reset slot by slot at episode boundaries.
mod base;
mod config;
mod recurrent;
pub use base::FeatureEncoder;
pub use config::FeatureEncoderConfig;
pub use recurrent::{LstmCell, RecurrentState};
