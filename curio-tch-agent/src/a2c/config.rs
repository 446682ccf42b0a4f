//! Configuration of the actor-critic network.
use crate::{encoder::FeatureEncoderConfig, error::ModelError, opt::OptimizerConfig};
use anyhow::Result;
use log::info;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Constructs [A2c](super::A2c).
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct A2cConfig {
    /// Number of stacked frames.
    pub n_stack: i64,

    /// Number of parallel environments, the initial size of the recurrent memory.
    pub num_envs: i64,

    /// Size of the action space.
    pub num_actions: i64,

    /// Flattened size of the convolutional features.
    pub feature_size: i64,

    /// Size of the hidden state of the LSTM cell.
    pub hidden_size: i64,

    /// Whether the encoder has an LSTM cell.
    #[serde(default = "default_use_recurrence")]
    pub use_recurrence: bool,

    /// Optimizer.
    #[serde(default)]
    pub opt_config: OptimizerConfig,
}

fn default_use_recurrence() -> bool {
    true
}

impl Default for A2cConfig {
    fn default() -> Self {
        Self {
            n_stack: 4,
            num_envs: 4,
            num_actions: 6,
            feature_size: 288,
            hidden_size: 256,
            use_recurrence: true,
            opt_config: OptimizerConfig::default(),
        }
    }
}

impl A2cConfig {
    /// Sets the number of stacked frames.
    pub fn n_stack(mut self, v: i64) -> Self {
        self.n_stack = v;
        self
    }

    /// Sets the number of parallel environments.
    pub fn num_envs(mut self, v: i64) -> Self {
        self.num_envs = v;
        self
    }

    /// Sets the size of the action space.
    pub fn num_actions(mut self, v: i64) -> Self {
        self.num_actions = v;
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

    /// Sets the optimizer.
    pub fn opt_config(mut self, v: OptimizerConfig) -> Self {
        self.opt_config = v;
        self
    }

    pub(crate) fn encoder_config(&self) -> FeatureEncoderConfig {
        FeatureEncoderConfig::default()
            .n_stack(self.n_stack)
            .feature_size(self.feature_size)
            .hidden_size(self.hidden_size)
            .use_recurrence(self.use_recurrence)
    }

    pub(crate) fn validate(&self) -> Result<(), ModelError> {
        if self.num_actions <= 0 {
            return Err(ModelError::InvalidConfig(format!(
                "num_actions must be positive, got {}",
                self.num_actions
            )));
        }
        if self.num_envs <= 0 {
            return Err(ModelError::InvalidConfig(format!(
                "num_envs must be positive, got {}",
                self.num_envs
            )));
        }
        self.encoder_config().validate()
    }

    /// Loads [A2cConfig] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path_ = path.as_ref().to_owned();
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        info!("Load config of A2C from {:?}", path_);
        Ok(b)
    }

    /// Saves [A2cConfig].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path_ = path.as_ref().to_owned();
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        info!("Save config of A2C into {:?}", path_);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::A2cConfig;
    use crate::{error::ModelError, opt::OptimizerConfig};
    use tempdir::TempDir;

    #[test]
    fn test_serde_a2c_config() -> anyhow::Result<()> {
        let config = A2cConfig::default()
            .num_envs(8)
            .num_actions(18)
            .opt_config(OptimizerConfig::Adam { lr: 7e-4 });

        let dir = TempDir::new("a2c_config")?;
        let path = dir.path().join("a2c_config.yaml");
        config.save(&path)?;
        let config_ = A2cConfig::load(&path)?;
        assert_eq!(config, config_);
        Ok(())
    }

    #[test]
    fn test_defaults_for_missing_fields() -> anyhow::Result<()> {
        let yaml = "n_stack: 4\nnum_envs: 2\nnum_actions: 3\nfeature_size: 288\nhidden_size: 256\n";
        let config: A2cConfig = serde_yaml::from_str(yaml)?;
        assert!(config.use_recurrence);
        assert_eq!(config.opt_config, OptimizerConfig::default());
        Ok(())
    }

    #[test]
    fn test_validate() {
        assert!(A2cConfig::default().validate().is_ok());
        assert!(matches!(
            A2cConfig::default().num_actions(0).validate(),
            Err(ModelError::InvalidConfig(_))
        ));
        assert!(matches!(
            A2cConfig::default().num_envs(0).validate(),
            Err(ModelError::InvalidConfig(_))
        ));
        assert!(matches!(
            A2cConfig::default().n_stack(0).validate(),
            Err(ModelError::InvalidConfig(_))
        ));
    }
}
