use crate::error::ModelError;
use serde::{Deserialize, Serialize};

/// Size of the square convolution kernels.
pub(super) const KERNEL_SIZE: i64 = 3;

/// Stride of every convolution.
pub(super) const STRIDE: i64 = 2;

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
/// Configuration of [ConvBlock](super::ConvBlock).
pub struct ConvBlockConfig {
    /// Number of stacked frames, i.e., input channels.
    pub n_stack: i64,

    /// Number of filters of every convolution.
    pub num_filters: i64,
}

impl Default for ConvBlockConfig {
    fn default() -> Self {
        Self {
            n_stack: 4,
            num_filters: 32,
        }
    }
}

impl ConvBlockConfig {
    /// Constructs a configuration with the given number of stacked frames.
    pub fn new(n_stack: i64) -> Self {
        Self {
            n_stack,
            ..Default::default()
        }
    }

    /// Sets the number of stacked frames.
    pub fn n_stack(mut self, v: i64) -> Self {
        self.n_stack = v;
        self
    }

    /// Sets the number of filters.
    pub fn num_filters(mut self, v: i64) -> Self {
        self.num_filters = v;
        self
    }

    /// Flattened output size for frames of `height` x `width` pixels.
    pub fn out_dim(&self, height: i64, width: i64) -> i64 {
        let conv = |x: i64| (x + 2 * (KERNEL_SIZE / 2) - KERNEL_SIZE) / STRIDE + 1;
        let (mut h, mut w) = (height, width);
        for _ in 0..4 {
            h = conv(h);
            w = conv(w);
        }
        self.num_filters * (h / 2) * (w / 2)
    }

    pub(crate) fn validate(&self) -> Result<(), ModelError> {
        if self.n_stack <= 0 {
            return Err(ModelError::InvalidConfig(format!(
                "n_stack must be positive, got {}",
                self.n_stack
            )));
        }
        if self.num_filters <= 0 {
            return Err(ModelError::InvalidConfig(format!(
                "num_filters must be positive, got {}",
                self.num_filters
            )));
        }
        Ok(())
    }
}
