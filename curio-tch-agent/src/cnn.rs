//! Convolutional tower shared by the feature encoders.
//!
//! Four strided convolutions halve the spatial resolution each, and a final
//! average pooling halves it once more. For 84x84 frames the flattened output
//! has 288 elements.
mod base;
mod config;
pub use base::ConvBlock;
pub use config::ConvBlockConfig;
