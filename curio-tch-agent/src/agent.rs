//! Actor-critic and curiosity networks trained together.
use crate::{
    a2c::{A2c, A2cConfig},
    checkpoint,
    error::ModelError,
    icm::{Icm, IcmConfig},
    model::ModelBase,
    util,
};
use anyhow::Result;
use curio_core::record::Record;
use log::{info, trace};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, File},
    io::{BufReader, Write},
    path::Path,
};
use tch::{Device, Tensor};

const A2C_FILE: &str = "a2c.pt";
const ICM_FILE: &str = "icm.pt";

/// Constructs [IcmAgent].
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct IcmAgentConfig {
    /// Actor-critic network.
    pub a2c: A2cConfig,

    /// Curiosity module.
    pub icm: IcmConfig,

    /// Maximum joint gradient norm of both networks, no clipping if `None`.
    #[serde(default)]
    pub clip_grad_norm: Option<f64>,
}

impl Default for IcmAgentConfig {
    fn default() -> Self {
        Self::new(4, 4, 6)
    }
}

impl IcmAgentConfig {
    /// Configuration of both networks sharing the frame stack and the action space.
    pub fn new(n_stack: i64, num_envs: i64, num_actions: i64) -> Self {
        Self {
            a2c: A2cConfig::default()
                .n_stack(n_stack)
                .num_envs(num_envs)
                .num_actions(num_actions),
            icm: IcmConfig::default()
                .n_stack(n_stack)
                .num_actions(num_actions),
            clip_grad_norm: None,
        }
    }

    /// Sets the configuration of the actor-critic network.
    pub fn a2c(mut self, v: A2cConfig) -> Self {
        self.a2c = v;
        self
    }

    /// Sets the configuration of the curiosity module.
    pub fn icm(mut self, v: IcmConfig) -> Self {
        self.icm = v;
        self
    }

    /// Sets the maximum gradient norm.
    pub fn clip_grad_norm(mut self, v: Option<f64>) -> Self {
        self.clip_grad_norm = v;
        self
    }

    fn validate(&self) -> Result<(), ModelError> {
        if self.a2c.n_stack != self.icm.n_stack {
            return Err(ModelError::InvalidConfig(format!(
                "n_stack differs between A2C ({}) and ICM ({})",
                self.a2c.n_stack, self.icm.n_stack
            )));
        }
        if self.a2c.num_actions != self.icm.num_actions {
            return Err(ModelError::InvalidConfig(format!(
                "num_actions differs between A2C ({}) and ICM ({})",
                self.a2c.num_actions, self.icm.num_actions
            )));
        }
        match self.clip_grad_norm {
            Some(v) if v <= 0.0 => Err(ModelError::InvalidConfig(format!(
                "clip_grad_norm must be positive, got {}",
                v
            ))),
            _ => Ok(()),
        }
    }

    /// Loads [IcmAgentConfig] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path_ = path.as_ref().to_owned();
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        info!("Load config of ICM agent from {:?}", path_);
        Ok(b)
    }

    /// Saves [IcmAgentConfig].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path_ = path.as_ref().to_owned();
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        info!("Save config of ICM agent into {:?}", path_);
        Ok(())
    }
}

/// Owns the actor-critic network and the curiosity module.
///
/// The training loop computes one loss from the outputs of both networks;
/// [`IcmAgent::backward_step`] updates both with it.
pub struct IcmAgent {
    a2c: A2c,
    icm: Icm,
    clip_grad_norm: Option<f64>,
}

impl IcmAgent {
    /// Builds both networks on `device`.
    pub fn build(config: IcmAgentConfig, device: Device) -> Result<Self, ModelError> {
        config.validate()?;
        Ok(Self {
            a2c: A2c::build(config.a2c, device)?,
            icm: Icm::build(config.icm, device)?,
            clip_grad_norm: config.clip_grad_norm,
        })
    }

    /// The actor-critic network.
    pub fn a2c(&self) -> &A2c {
        &self.a2c
    }

    /// The actor-critic network.
    pub fn a2c_mut(&mut self) -> &mut A2c {
        &mut self.a2c
    }

    /// The curiosity module.
    pub fn icm(&self) -> &Icm {
        &self.icm
    }

    /// The curiosity module.
    pub fn icm_mut(&mut self) -> &mut Icm {
        &mut self.icm
    }

    /// Zeroes the gradients of both networks, backpropagates `loss`, clips the
    /// gradients if configured and steps both optimizers.
    ///
    /// Clipping uses a single norm over the gradients of both networks.
    pub fn backward_step(&mut self, loss: &Tensor) {
        self.a2c.opt_mut().zero_grad();
        self.icm.opt_mut().zero_grad();
        loss.backward();
        if let Some(max) = self.clip_grad_norm {
            let norm = util::clip_grad_norm_(&self.trainable_variables(), max);
            trace!("Gradient norm {} before clipping to {}", norm, max);
        }
        self.a2c.opt_mut().step();
        self.icm.opt_mut().step();
    }

    /// Trainable variables of both networks.
    pub fn trainable_variables(&self) -> Vec<Tensor> {
        let mut vars = self.a2c.get_var_store().trainable_variables();
        vars.extend(self.icm.get_var_store().trainable_variables());
        vars
    }

    /// Writes `a2c.pt` and `icm.pt` into `dir`.
    pub fn save(&self, dir: impl AsRef<Path>) -> Result<()> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        self.a2c.save(dir.join(A2C_FILE))?;
        self.icm.save(dir.join(ICM_FILE))?;
        info!("Save ICM agent to {:?}", dir);
        Ok(())
    }

    /// Loads both networks from `dir`.
    ///
    /// Both files are checked before either network is modified.
    pub fn load(&mut self, dir: impl AsRef<Path>) -> Result<()> {
        let dir = dir.as_ref();
        let a2c = checkpoint::read_checked(self.a2c.get_var_store(), dir.join(A2C_FILE))?;
        let icm = checkpoint::read_checked(self.icm.get_var_store(), dir.join(ICM_FILE))?;
        a2c.copy_to(self.a2c.get_var_store_mut())?;
        icm.copy_to(self.icm.get_var_store_mut())?;
        info!("Load ICM agent from {:?}", dir);
        Ok(())
    }

    /// Moves both networks to `device`.
    pub fn set_device(&mut self, device: Device) {
        self.a2c.set_device(device);
        self.icm.set_device(device);
    }

    /// Parameter statistics of both networks, keyed `a2c.*` and `icm.*`.
    pub fn param_stats(&self) -> Record {
        let mut record = Record::empty();
        for (prefix, stats) in [("a2c", self.a2c.param_stats()), ("icm", self.icm.param_stats())]
            .iter()
        {
            for (k, v) in stats.iter() {
                record.insert(format!("{}.{}", prefix, k), v.clone());
            }
        }
        record
    }
}
