//! Intrinsic curiosity module.
//!
//! A feed-forward feature encoder embeds the current and next observations.
//! The forward dynamics net predicts the next embedding from the current one
//! and the taken action; the inverse dynamics net predicts the action from
//! both embeddings. How the prediction errors are weighted into rewards and
//! losses is left to the training loop.
mod base;
mod config;
mod dynamics;
mod head;
pub use base::{Icm, IcmOutput};
pub use config::IcmConfig;
pub use dynamics::{DynamicsNet, DynamicsNetConfig};
pub use head::AdversarialHead;
