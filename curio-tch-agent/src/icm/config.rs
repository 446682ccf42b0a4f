//! Configuration of the curiosity module.
use crate::{encoder::FeatureEncoderConfig, error::ModelError, opt::OptimizerConfig};
use anyhow::Result;
use log::info;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Constructs [Icm](super::Icm).
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct IcmConfig {
    /// Number of stacked frames.
    pub n_stack: i64,

    /// Size of the action space.
    pub num_actions: i64,

    /// Size of the feature vectors, the flattened convolutional output.
    pub feature_size: i64,

    /// Optimizer.
    #[serde(default)]
    pub opt_config: OptimizerConfig,
}

impl Default for IcmConfig {
    fn default() -> Self {
        Self {
            n_stack: 4,
            num_actions: 6,
            feature_size: 288,
            opt_config: OptimizerConfig::default(),
        }
    }
}

impl IcmConfig {
    /// Sets the number of stacked frames.
    pub fn n_stack(mut self, v: i64) -> Self {
        self.n_stack = v;
        self
    }

    /// Sets the size of the action space.
    pub fn num_actions(mut self, v: i64) -> Self {
        self.num_actions = v;
        self
    }

    /// Sets the size of the feature vectors.
    pub fn feature_size(mut self, v: i64) -> Self {
        self.feature_size = v;
        self
    }

    /// Sets the optimizer.
    pub fn opt_config(mut self, v: OptimizerConfig) -> Self {
        self.opt_config = v;
        self
    }

    pub(crate) fn encoder_config(&self) -> FeatureEncoderConfig {
        FeatureEncoderConfig::default()
            .n_stack(self.n_stack)
            .feature_size(self.feature_size)
            .use_recurrence(false)
    }

    pub(crate) fn validate(&self) -> Result<(), ModelError> {
        if self.num_actions <= 0 {
            return Err(ModelError::InvalidConfig(format!(
                "num_actions must be positive, got {}",
                self.num_actions
            )));
        }
        self.encoder_config().validate()
    }

    /// Loads [IcmConfig] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path_ = path.as_ref().to_owned();
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        info!("Load config of ICM from {:?}", path_);
        Ok(b)
    }

    /// Saves [IcmConfig].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path_ = path.as_ref().to_owned();
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        info!("Save config of ICM into {:?}", path_);
        Ok(())
    }
}
