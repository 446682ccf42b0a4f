use super::{AdversarialHead, IcmConfig};
use crate::{
    checkpoint,
    encoder::FeatureEncoder,
    error::ModelError,
    model::{ModelBase, SubModel},
    opt::{Optimizer, OptimizerConfig},
};
use anyhow::Result;
use curio_core::record::Record;
use log::{debug, info};
use std::path::Path;
use tch::{nn, Device, Kind, Tensor};

/// Output of [`Icm::predict`].
#[derive(Debug)]
pub struct IcmOutput {
    /// Embedding of the next observations, `[N, F]`.
    pub next_feature: Tensor,

    /// Predicted embedding of the next observations, `[N, F]`.
    pub next_feature_pred: Tensor,

    /// Predicted action logits, `[N, A]`.
    pub action_pred: Tensor,
}

impl IcmOutput {
    /// Forward dynamics error `0.5 * |pred - actual|^2` of each row, `[N]`.
    pub fn forward_error(&self) -> Tensor {
        (&self.next_feature_pred - &self.next_feature)
            .pow_tensor_scalar(2.0)
            .sum_dim_intlist(Some(&[-1i64][..]), false, Kind::Float)
            * 0.5
    }

    /// Mean cross entropy between the predicted action logits and `actions`.
    pub fn inverse_cross_entropy(&self, actions: &Tensor) -> Tensor {
        self.action_pred
            .cross_entropy_for_logits(&actions.to_kind(Kind::Int64).view([-1]))
    }
}

/// Curiosity module with its own feed-forward encoder.
///
/// The encoder never shares weights or memory with the policy network.
pub struct Icm {
    device: Device,
    var_store: nn::VarStore,
    encoder: FeatureEncoder,
    pred_net: AdversarialHead,
    num_actions: i64,
    opt_config: OptimizerConfig,
    opt: Optimizer,
}

impl Icm {
    /// Constructs the module on `device`.
    pub fn build(config: IcmConfig, device: Device) -> Result<Self, ModelError> {
        config.validate()?;

        let var_store = nn::VarStore::new(device);
        let p = &var_store.root();
        let encoder = FeatureEncoder::build(&(p / "feat_enc"), config.encoder_config())?;
        let pred_net = AdversarialHead::build(
            &(p / "pred_net"),
            encoder.out_dim(),
            config.num_actions,
        )?;

        let opt_config = config.opt_config.clone();
        let opt = opt_config.build(&var_store)?;
        debug!(
            "Build ICM with {} actions and {} variables",
            config.num_actions,
            var_store.variables().len()
        );

        Ok(Self {
            device,
            var_store,
            encoder,
            pred_net,
            num_actions: config.num_actions,
            opt_config,
            opt,
        })
    }

    fn encode(&self, obs: &Tensor) -> Result<Tensor, ModelError> {
        let (feature, _) = self.encoder.forward(&(obs.shallow_clone(), None))?;
        Ok(feature)
    }

    /// Embeds both observation batches and predicts the dynamics between them.
    pub fn predict(
        &self,
        obs: &Tensor,
        next_obs: &Tensor,
        actions: &Tensor,
    ) -> Result<IcmOutput, ModelError> {
        let n = obs.size().first().copied().unwrap_or(0);
        if next_obs.size() != obs.size() {
            return Err(ModelError::ShapeMismatch {
                what: "next observations",
                expected: obs.size(),
                actual: next_obs.size(),
            });
        }
        if actions.size().first().copied() != Some(n) {
            return Err(ModelError::ShapeMismatch {
                what: "actions",
                expected: vec![n],
                actual: actions.size(),
            });
        }

        let feature = self.encode(obs)?;
        let next_feature = self.encode(next_obs)?;
        let (next_feature_pred, action_pred) =
            self.pred_net.forward(&feature, &next_feature, actions)?;

        Ok(IcmOutput {
            next_feature,
            next_feature_pred,
            action_pred,
        })
    }

    /// One-hot encoding of `actions`, as used by the forward dynamics net.
    pub fn one_hot(&self, actions: &Tensor) -> Result<Tensor, ModelError> {
        self.pred_net.one_hot(actions)
    }

    /// Size of the action space.
    pub fn num_actions(&self) -> i64 {
        self.num_actions
    }

    /// Size of the feature vectors.
    pub fn feature_size(&self) -> i64 {
        self.encoder.out_dim()
    }

    /// Optimizer configuration.
    pub fn opt_config(&self) -> &OptimizerConfig {
        &self.opt_config
    }

    /// Device of the parameters.
    pub fn device(&self) -> Device {
        self.device
    }

    /// Moves the parameters to `device`.
    pub fn set_device(&mut self, device: Device) {
        self.var_store.set_device(device);
        self.encoder.set_device(device);
        self.pred_net.set_device(device);
        self.device = device;
        info!("Move ICM to {:?}", device);
    }

    /// Mean and standard deviation of every parameter.
    pub fn param_stats(&self) -> Record {
        crate::util::param_stats(&self.var_store)
    }

    pub(crate) fn opt_mut(&mut self) -> &mut Optimizer {
        &mut self.opt
    }
}

impl ModelBase for Icm {
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
        info!("Save ICM to {:?}", path.as_ref());
        Ok(())
    }

    fn load<T: AsRef<Path>>(&mut self, path: T) -> Result<()> {
        checkpoint::load(&mut self.var_store, &path)?;
        info!("Load ICM from {:?}", path.as_ref());
        Ok(())
    }
}
