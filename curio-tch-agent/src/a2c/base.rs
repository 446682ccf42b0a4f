use super::{A2cConfig, Categorical};
use crate::{
    checkpoint,
    encoder::FeatureEncoder,
    error::ModelError,
    model::{ModelBase, SubModel},
    opt::{Optimizer, OptimizerConfig},
    util::orthogonal_linear,
};
use anyhow::Result;
use curio_core::record::Record;
use log::{debug, info, trace};
use std::path::Path;
use tch::{nn, nn::Module, Device, Kind, Tensor};

/// Output of [`A2c::act`].
pub struct ActOutput {
    /// Sampled actions, `[N]` of `i64`.
    pub action: Tensor,

    /// Log-probabilities of the sampled actions, `[N]`.
    pub log_prob: Tensor,

    /// Entropy of the action distribution averaged over the batch, a scalar.
    pub entropy: Tensor,

    /// Value estimates, `[N]`.
    pub value: Tensor,

    /// Action probabilities, `[N, A]`.
    pub probs: Tensor,
}

/// Actor-critic network on top of a recurrent feature encoder.
///
/// The network owns its [`nn::VarStore`] and optimizer. Apart from the
/// parameters, its mutable state is the recurrent memory of the encoder and
/// a counter of forward passes.
pub struct A2c {
    device: Device,
    var_store: nn::VarStore,
    encoder: FeatureEncoder,
    actor: nn::Linear,
    critic: nn::Linear,
    num_actions: i64,
    num_step: usize,
    opt_config: OptimizerConfig,
    opt: Optimizer,
}

impl A2c {
    /// Constructs the network on `device` and allocates the recurrent memory
    /// for `config.num_envs` slots.
    pub fn build(config: A2cConfig, device: Device) -> Result<Self, ModelError> {
        config.validate()?;

        let var_store = nn::VarStore::new(device);
        let p = &var_store.root();
        let mut encoder = FeatureEncoder::build(&(p / "feat_enc"), config.encoder_config())?;
        let out_dim = encoder.out_dim();
        let actor = orthogonal_linear(p / "actor", out_dim, config.num_actions, 1.0);
        let critic = orthogonal_linear(p / "critic", out_dim, 1, 1.0);
        encoder.initialize_memory(config.num_envs)?;

        let opt_config = config.opt_config.clone();
        let opt = opt_config.build(&var_store)?;
        debug!(
            "Build A2C with {} actions and {} variables",
            config.num_actions,
            var_store.variables().len()
        );

        Ok(Self {
            device,
            var_store,
            encoder,
            actor,
            critic,
            num_actions: config.num_actions,
            num_step: 0,
            opt_config,
            opt,
        })
    }

    /// Returns policy logits `[N, A]` and value estimates `[N]`.
    ///
    /// Reads and updates the recurrent memory and increments the step counter.
    pub fn evaluate(&mut self, obs: &Tensor) -> Result<(Tensor, Tensor), ModelError> {
        let feature = self.encoder.encode(obs)?;
        let logits = self.actor.forward(&feature);
        let value = self.critic.forward(&feature).squeeze_dim(-1);

        self.num_step += 1;
        trace!("A2C step {}", self.num_step);
        Ok((logits, value))
    }

    /// Samples one action per slot.
    ///
    /// Gradients flow through `log_prob`, `entropy` and `value`, not through
    /// the sampled actions.
    pub fn act(&mut self, obs: &Tensor) -> Result<ActOutput, ModelError> {
        let (logits, value) = self.evaluate(obs)?;
        let dist = Categorical::from_logits(&logits);
        let action = dist.sample();
        let log_prob = dist.log_prob(&action);
        let entropy = dist.entropy().mean(Kind::Float);

        Ok(ActOutput {
            action,
            log_prob,
            entropy,
            value,
            probs: dist.probs(),
        })
    }

    /// Zeroes the recurrent memory of the slots marked `true`.
    pub fn reset_recurrent_buffers(&mut self, mask: &[bool]) -> Result<(), ModelError> {
        self.encoder.reset_memory(Some(mask))
    }

    /// Reallocates a zero recurrent memory for `num_envs` slots.
    pub fn set_recurrent_buffers(&mut self, num_envs: i64) -> Result<(), ModelError> {
        self.encoder.initialize_memory(num_envs)
    }

    /// Cuts the gradient history of the recurrent memory.
    pub fn detach_recurrent_buffers(&mut self) {
        self.encoder.detach_memory();
    }

    /// The feature encoder.
    pub fn encoder(&self) -> &FeatureEncoder {
        &self.encoder
    }

    /// Number of forward passes so far.
    pub fn num_step(&self) -> usize {
        self.num_step
    }

    /// Size of the action space.
    pub fn num_actions(&self) -> i64 {
        self.num_actions
    }

    /// Optimizer configuration.
    pub fn opt_config(&self) -> &OptimizerConfig {
        &self.opt_config
    }

    /// Device of the parameters and the recurrent memory.
    pub fn device(&self) -> Device {
        self.device
    }

    /// Moves the parameters and the recurrent memory to `device`.
    pub fn set_device(&mut self, device: Device) {
        self.var_store.set_device(device);
        self.encoder.set_device(device);
        self.device = device;
        info!("Move A2C to {:?}", device);
    }

    /// Mean and standard deviation of every parameter.
    pub fn param_stats(&self) -> Record {
        crate::util::param_stats(&self.var_store)
    }

    pub(crate) fn opt_mut(&mut self) -> &mut Optimizer {
        &mut self.opt
    }
}

impl ModelBase for A2c {
    fn backward_step(&mut self, loss: &Tensor) {
        self.opt.backward_step(loss);
    }

    fn get_var_store_mut(&mut self) -> &mut nn::VarStore {
        &mut self.var_store
    }

    fn get_var_store(&self) -> &nn::VarStore {
        &self.var_store
    }

    fn save<T: AsRef<Path>>(&self, path: T) -> Result<()> {
        checkpoint::save(&self.var_store, &path)?;
        info!("Save A2C to {:?}", path.as_ref());
        Ok(())
    }

    fn load<T: AsRef<Path>>(&mut self, path: T) -> Result<()> {
        checkpoint::load(&mut self.var_store, &path)?;
        info!("Load A2C from {:?}", path.as_ref());
        Ok(())
    }
}
