use super::{DynamicsNet, DynamicsNetConfig};
use crate::{
    error::ModelError,
    model::SubModel2,
    util::{check_device, one_hot},
};
use tch::{nn, Device, Kind, Tensor};

/// Forward and inverse dynamics nets sharing one action encoding.
pub struct AdversarialHead {
    num_actions: i64,
    device: Device,
    fwd_net: DynamicsNet,
    inv_net: DynamicsNet,
}

impl AdversarialHead {
    /// Builds both nets under `p`.
    pub fn build(p: &nn::Path, feature_size: i64, num_actions: i64) -> Result<Self, ModelError> {
        let fwd_net = DynamicsNet::build(
            &(p / "fwd_net"),
            DynamicsNetConfig::forward(feature_size, num_actions),
        )?;
        let inv_net = DynamicsNet::build(
            &(p / "inv_net"),
            DynamicsNetConfig::inverse(feature_size, num_actions),
        )?;

        Ok(Self {
            num_actions,
            device: p.device(),
            fwd_net,
            inv_net,
        })
    }

    pub(crate) fn set_device(&mut self, device: Device) {
        self.device = device;
    }

    /// Validates `actions` (`[N]` or `[N, 1]` integers) and flattens them to `[N]`.
    pub(crate) fn check_actions(&self, actions: &Tensor) -> Result<Tensor, ModelError> {
        match actions.kind() {
            Kind::Int64 | Kind::Int | Kind::Int16 | Kind::Int8 | Kind::Uint8 => {}
            kind => return Err(ModelError::ActionKind(kind)),
        }
        let size = actions.size();
        if !(size.len() == 1 || (size.len() == 2 && size[1] == 1)) {
            return Err(ModelError::ShapeMismatch {
                what: "actions",
                expected: vec![-1],
                actual: size,
            });
        }
        check_device("actions", self.device, actions)?;

        let actions = actions.to_kind(Kind::Int64).view([-1]);
        if actions.numel() > 0 {
            let min = actions.min().int64_value(&[]);
            let max = actions.max().int64_value(&[]);
            for &action in [min, max].iter() {
                if action < 0 || action >= self.num_actions {
                    return Err(ModelError::ActionOutOfRange {
                        action,
                        num_actions: self.num_actions,
                    });
                }
            }
        }
        Ok(actions)
    }

    /// One-hot rows `[N, A]` for integer actions.
    pub fn one_hot(&self, actions: &Tensor) -> Result<Tensor, ModelError> {
        let actions = self.check_actions(actions)?;
        Ok(one_hot(&actions, self.num_actions))
    }

    /// Predicts the next feature and the action logits.
    pub fn forward(
        &self,
        feature: &Tensor,
        next_feature: &Tensor,
        actions: &Tensor,
    ) -> Result<(Tensor, Tensor), ModelError> {
        let action_one_hot = self.one_hot(actions)?;
        let next_feature_pred = self.fwd_net.forward(feature, &action_one_hot)?;
        let action_pred = self.inv_net.forward(feature, next_feature)?;
        Ok((next_feature_pred, action_pred))
    }
}

#[cfg(test)]
mod tests {
    use super::AdversarialHead;
    use crate::error::ModelError;
    use std::convert::TryFrom;
    use tch::{nn::VarStore, Device, Kind, Tensor};

    fn head(vs: &VarStore) -> AdversarialHead {
        AdversarialHead::build(&vs.root(), 8, 6).unwrap()
    }

    #[test]
    fn test_one_hot_has_single_one() -> anyhow::Result<()> {
        let vs = VarStore::new(Device::Cpu);
        let head = head(&vs);
        for i in 0..6i64 {
            let row = head.one_hot(&Tensor::from_slice(&[i]))?;
            let row = Vec::<f32>::try_from(row.view([-1]))?;
            let expected = (0..6)
                .map(|j| if j == i { 1.0 } else { 0.0 })
                .collect::<Vec<f32>>();
            assert_eq!(row, expected);
        }
        Ok(())
    }

    #[test]
    fn test_one_hot_accepts_column() -> anyhow::Result<()> {
        let vs = VarStore::new(Device::Cpu);
        let head = head(&vs);
        let actions = Tensor::from_slice(&[1i32, 5, 0]).view([3, 1]);
        let xs = head.one_hot(&actions)?;
        assert_eq!(xs.size(), vec![3, 6]);
        assert_eq!(xs.double_value(&[1, 5]), 1.0);
        Ok(())
    }

    #[test]
    fn test_empty_batch() -> anyhow::Result<()> {
        let vs = VarStore::new(Device::Cpu);
        let head = head(&vs);
        let actions = Tensor::zeros([0], (Kind::Int64, Device::Cpu));
        assert_eq!(head.one_hot(&actions)?.size(), vec![0, 6]);
        Ok(())
    }

    #[test]
    fn test_invalid_actions() {
        let vs = VarStore::new(Device::Cpu);
        let head = head(&vs);
        assert!(matches!(
            head.one_hot(&Tensor::from_slice(&[0i64, 6])),
            Err(ModelError::ActionOutOfRange {
                action: 6,
                num_actions: 6
            })
        ));
        assert!(matches!(
            head.one_hot(&Tensor::from_slice(&[-1i64])),
            Err(ModelError::ActionOutOfRange { action: -1, .. })
        ));
        assert!(matches!(
            head.one_hot(&Tensor::from_slice(&[1.0f32])),
            Err(ModelError::ActionKind(Kind::Float))
        ));
        assert!(matches!(
            head.one_hot(&Tensor::zeros([2, 2], (Kind::Int64, Device::Cpu))),
            Err(ModelError::ShapeMismatch { .. })
        ));
    }
}
