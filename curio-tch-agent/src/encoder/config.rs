use crate::{cnn::ConvBlockConfig, error::ModelError};
use anyhow::Result;
use log::info;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
/// Configuration of [FeatureEncoder](super::FeatureEncoder).
pub struct FeatureEncoderConfig {
    /// Number of stacked frames.
    pub n_stack: i64,

    /// Flattened size of the convolutional features, the input size of the LSTM cell.
    pub feature_size: i64,

    /// Size of the hidden state of the LSTM cell.
    pub hidden_size: i64,

    /// Whether the LSTM cell is used.
    pub use_recurrence: bool,
}

impl Default for FeatureEncoderConfig {
    fn default() -> Self {
        Self {
            n_stack: 4,
            feature_size: 288,
            hidden_size: 256,
            use_recurrence: true,
        }
    }
}

impl FeatureEncoderConfig {
    /// Sets the number of stacked frames.
    pub fn n_stack(mut self, v: i64) -> Self {
        self.n_stack = v;
        self
    }

    /// Sets the flattened size of the convolutional features.
    pub fn feature_size(mut self, v: i64) -> Self {
        self.feature_size = v;
        self
    }

    /// Sets the size of the hidden state.
    pub fn hidden_size(mut self, v: i64) -> Self {
        self.hidden_size = v;
        self
    }

    /// Enables or disables the LSTM cell.
    pub fn use_recurrence(mut self, v: bool) -> Self {
        self.use_recurrence = v;
        self
    }

    /// Size of the feature vectors returned by the encoder.
    pub fn out_dim(&self) -> i64 {
        if self.use_recurrence {
            self.hidden_size
        } else {
            self.feature_size
        }
    }

    pub(crate) fn conv_config(&self) -> ConvBlockConfig {
        ConvBlockConfig::new(self.n_stack)
    }

    pub(crate) fn validate(&self) -> Result<(), ModelError> {
        if self.feature_size <= 0 {
            return Err(ModelError::InvalidConfig(format!(
                "feature_size must be positive, got {}",
                self.feature_size
            )));
        }
        if self.use_recurrence && self.hidden_size <= 0 {
            return Err(ModelError::InvalidConfig(format!(
                "hidden_size must be positive, got {}",
                self.hidden_size
            )));
        }
        self.conv_config().validate()
    }

    /// Loads [FeatureEncoderConfig] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path_ = path.as_ref().to_owned();
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        info!("Load config of feature encoder from {:?}", path_);
        Ok(b)
    }

    /// Saves [FeatureEncoderConfig].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path_ = path.as_ref().to_owned();
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        info!("Save config of feature encoder into {:?}", path_);
        Ok(())
    }
}
