use crate::{
    error::ModelError,
    model::SubModel2,
    util::{check_shape, orthogonal_linear},
};
use serde::{Deserialize, Serialize};
use tch::{nn, nn::Module, Tensor};

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
/// Configuration of [DynamicsNet].
pub struct DynamicsNetConfig {
    /// Width of the concatenated input.
    pub in_dim: i64,

    /// Number of hidden units.
    pub hidden_dim: i64,

    /// Output size.
    pub out_dim: i64,
}

impl DynamicsNetConfig {
    /// Forward dynamics: `[feature, one-hot action]` to the next feature.
    pub fn forward(feature_size: i64, num_actions: i64) -> Self {
        Self {
            in_dim: feature_size + num_actions,
            hidden_dim: 256,
            out_dim: feature_size,
        }
    }

    /// Inverse dynamics: `[feature, next feature]` to action logits.
    pub fn inverse(feature_size: i64, num_actions: i64) -> Self {
        Self {
            in_dim: 2 * feature_size,
            hidden_dim: 256,
            out_dim: num_actions,
        }
    }

    /// Sets the number of hidden units.
    pub fn hidden_dim(mut self, v: i64) -> Self {
        self.hidden_dim = v;
        self
    }
}

/// Two stacked linear layers applied to the concatenation of two inputs.
///
/// There is no nonlinearity between the layers.
pub struct DynamicsNet {
    in_dim: i64,
    seq: nn::Sequential,
}

impl SubModel2 for DynamicsNet {
    type Config = DynamicsNetConfig;
    type Input1 = Tensor;
    type Input2 = Tensor;
    type Output = Tensor;

    fn build(p: &nn::Path, config: Self::Config) -> Result<Self, ModelError> {
        if config.in_dim <= 0 || config.hidden_dim <= 0 || config.out_dim <= 0 {
            return Err(ModelError::InvalidConfig(format!(
                "dynamics net dimensions must be positive, got {:?}",
                config
            )));
        }

        let seq = nn::seq()
            .add(orthogonal_linear(p / "l1", config.in_dim, config.hidden_dim, 1.0))
            .add(orthogonal_linear(p / "l2", config.hidden_dim, config.out_dim, 1.0));

        Ok(Self {
            in_dim: config.in_dim,
            seq,
        })
    }

    fn forward(&self, x1: &Tensor, x2: &Tensor) -> Result<Tensor, ModelError> {
        check_shape("dynamics input", &[-1, -1], x1)?;
        check_shape("dynamics input", &[x1.size()[0], -1], x2)?;
        let xs = Tensor::f_cat(&[x1, x2], 1)?;
        check_shape("dynamics input", &[-1, self.in_dim], &xs)?;
        Ok(self.seq.forward(&xs))
    }
}

#[cfg(test)]
mod tests {
    use super::{DynamicsNet, DynamicsNetConfig};
    use crate::{error::ModelError, model::SubModel2};
    use tch::{nn::VarStore, Device, Kind, Tensor};

    #[test]
    fn test_forward_and_inverse_shapes() -> anyhow::Result<()> {
        let vs = VarStore::new(Device::Cpu);
        let fwd = DynamicsNet::build(&(vs.root() / "fwd"), DynamicsNetConfig::forward(288, 6))?;
        let inv = DynamicsNet::build(&(vs.root() / "inv"), DynamicsNetConfig::inverse(288, 6))?;

        let feat = Tensor::randn([5, 288], (Kind::Float, Device::Cpu));
        let act = Tensor::zeros([5, 6], (Kind::Float, Device::Cpu));
        assert_eq!(fwd.forward(&feat, &act)?.size(), vec![5, 288]);
        assert_eq!(inv.forward(&feat, &feat)?.size(), vec![5, 6]);
        Ok(())
    }

    #[test]
    fn test_linear_without_activation() -> anyhow::Result<()> {
        let vs = VarStore::new(Device::Cpu);
        let net = DynamicsNet::build(&vs.root(), DynamicsNetConfig::inverse(4, 3))?;
        let a = Tensor::randn([2, 4], (Kind::Float, Device::Cpu));
        let b = Tensor::randn([2, 4], (Kind::Float, Device::Cpu));

        // Zero bias and no activation make the net linear
        let y1 = net.forward(&a, &b)? * 2.0;
        let y2 = net.forward(&(&a * 2.0), &(&b * 2.0))?;
        assert!(y1.allclose(&y2, 1e-5, 1e-5, false));
        Ok(())
    }

    #[test]
    fn test_width_mismatch() -> anyhow::Result<()> {
        let vs = VarStore::new(Device::Cpu);
        let net = DynamicsNet::build(&vs.root(), DynamicsNetConfig::forward(288, 6))?;
        let feat = Tensor::zeros([2, 288], (Kind::Float, Device::Cpu));
        let act = Tensor::zeros([2, 5], (Kind::Float, Device::Cpu));
        assert!(matches!(
            net.forward(&feat, &act),
            Err(ModelError::ShapeMismatch { .. })
        ));
        Ok(())
    }
}
