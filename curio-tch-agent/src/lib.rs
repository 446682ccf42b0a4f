//! Curiosity-driven actor-critic networks implemented with [tch](https://crates.io/crates/tch).
//!
//! * [`a2c::A2c`] maps stacked frames to a policy and a value estimate through
//!   a [`encoder::FeatureEncoder`] with a per-slot resettable LSTM memory.
//! * [`icm::Icm`] predicts forward and inverse dynamics in its own feature space.
//! * [`agent::IcmAgent`] owns both networks and their checkpoints.
//!
//! The device on which a network lives is given once when it is built;
//! every tensor passed to it must live on the same device.
pub mod a2c;
pub mod agent;
pub mod checkpoint;
pub mod cnn;
pub mod encoder;
pub mod error;
pub mod icm;
pub mod model;
pub mod opt;
pub mod util;
pub use error::ModelError;
