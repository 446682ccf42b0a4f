//! Advantage actor-critic network.
mod base;
mod config;
mod dist;
pub use base::{A2c, ActOutput};
pub use config::A2cConfig;
pub use dist::Categorical;
