//! Named parameter mappings stored on disk.
//!
//! A checkpoint maps parameter names of one network to tensors. Loading is
//! all-or-nothing: the file is read and checked against the receiving
//! [`VarStore`] before any value is copied.
use crate::error::ModelError;
use log::{info, trace};
use std::{collections::HashMap, path::Path};
use tch::{nn::VarStore, Tensor};

fn is_safetensors(path: &Path) -> bool {
    path.extension().and_then(|x| x.to_str()) == Some("safetensors")
}

/// Named tensors detached from any [`VarStore`].
pub struct NamedTensors {
    /// Tensors keyed by parameter name.
    pub named_tensors: HashMap<String, Tensor>,
}

impl NamedTensors {
    /// Reads a checkpoint file.
    ///
    /// Files with the `safetensors` extension are read as safetensors, others
    /// in the libtorch multi-tensor format.
    pub fn read(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let tensors = if is_safetensors(path) {
            Tensor::read_safetensors(path)?
        } else {
            Tensor::load_multi(path)?
        };
        trace!("Read {} tensors from {:?}", tensors.len(), path);
        Ok(Self {
            named_tensors: tensors.into_iter().collect(),
        })
    }

    /// Verifies that names and shapes match the variables of `vs` exactly.
    pub fn check_against(&self, vs: &VarStore) -> Result<(), ModelError> {
        let dest = vs.variables();

        for (name, var) in dest.iter() {
            let src = self
                .named_tensors
                .get(name)
                .ok_or_else(|| ModelError::MissingParameter(name.clone()))?;
            if src.size() != var.size() {
                return Err(ModelError::ParameterShapeMismatch {
                    name: name.clone(),
                    expected: var.size(),
                    actual: src.size(),
                });
            }
        }

        if let Some(name) = self.named_tensors.keys().find(|k| !dest.contains_key(*k)) {
            return Err(ModelError::UnexpectedParameter(name.clone()));
        }

        Ok(())
    }

    /// Copy named tensors to [VarStore] after checking them.
    pub fn copy_to(&self, vs: &mut VarStore) -> Result<(), ModelError> {
        self.check_against(vs)?;

        tch::no_grad(|| {
            for (name, mut dest) in vs.variables() {
                let src = &self.named_tensors[&name];
                dest.copy_(&src.to_device(dest.device()));
            }
        });
        Ok(())
    }
}

/// Writes the variables of `vs` to `path`.
pub fn save(vs: &VarStore, path: impl AsRef<Path>) -> Result<(), ModelError> {
    let path = path.as_ref();
    vs.save(path)?;
    for (name, _) in vs.variables().iter() {
        trace!("Save variable {}", name);
    }
    Ok(())
}

/// Reads `path` and checks it against the variables of `vs` without copying.
pub fn read_checked(vs: &VarStore, path: impl AsRef<Path>) -> Result<NamedTensors, ModelError> {
    let tensors = NamedTensors::read(path)?;
    tensors.check_against(vs)?;
    Ok(tensors)
}

/// Replaces the variables of `vs` with those stored in `path`.
pub fn load(vs: &mut VarStore, path: impl AsRef<Path>) -> Result<(), ModelError> {
    let path = path.as_ref();
    read_checked(vs, path)?.copy_to(vs)?;
    info!("Load {} variables from {:?}", vs.variables().len(), path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{load, save, NamedTensors};
    use crate::error::ModelError;
    use std::collections::HashMap;
    use tch::{
        nn::{self, Module, VarStore},
        Device, Kind, Tensor,
    };
    use tempdir::TempDir;

    fn model(vs: &VarStore, hidden: i64) -> nn::Sequential {
        nn::seq()
            .add(nn::linear(vs.root() / "layer1", 3, hidden, Default::default()))
            .add(nn::linear(vs.root() / "layer2", hidden, 2, Default::default()))
    }

    #[test]
    fn test_save_load_restores_outputs() -> anyhow::Result<()> {
        let tmp_dir = TempDir::new("checkpoint")?;
        let path = tmp_dir.path().join("model.pt");
        let xs = Tensor::ones([1, 3], (Kind::Float, Device::Cpu));

        let vs1 = VarStore::new(Device::Cpu);
        let model1 = model(&vs1, 8);
        save(&vs1, &path)?;

        let mut vs2 = VarStore::new(Device::Cpu);
        let model2 = model(&vs2, 8);
        load(&mut vs2, &path)?;

        let diff = (model1.forward(&xs) - model2.forward(&xs)).abs().max().double_value(&[]);
        assert_eq!(diff, 0.0);
        Ok(())
    }

    #[test]
    fn test_shape_mismatch_loads_nothing() -> anyhow::Result<()> {
        let tmp_dir = TempDir::new("checkpoint")?;
        let path = tmp_dir.path().join("model.pt");

        let vs1 = VarStore::new(Device::Cpu);
        let _model1 = model(&vs1, 8);
        save(&vs1, &path)?;

        let mut vs2 = VarStore::new(Device::Cpu);
        let _model2 = model(&vs2, 4);
        let before: HashMap<String, Tensor> = vs2
            .variables()
            .into_iter()
            .map(|(name, var)| (name, var.detach().copy()))
            .collect();

        let err = load(&mut vs2, &path).unwrap_err();
        assert!(matches!(err, ModelError::ParameterShapeMismatch { .. }));

        // Untouched, including the variables whose shapes would have matched
        for (name, var) in vs2.variables() {
            let diff = (&var - &before[&name]).abs().max().double_value(&[]);
            assert_eq!(diff, 0.0, "{} was modified", name);
        }
        Ok(())
    }

    #[test]
    fn test_missing_and_unexpected_parameters() -> anyhow::Result<()> {
        let tmp_dir = TempDir::new("checkpoint")?;
        let path = tmp_dir.path().join("model.pt");

        let vs1 = VarStore::new(Device::Cpu);
        let _l = nn::linear(vs1.root() / "layer1", 3, 8, Default::default());
        save(&vs1, &path)?;

        let mut vs2 = VarStore::new(Device::Cpu);
        let _model2 = model(&vs2, 8);
        assert!(matches!(
            load(&mut vs2, &path),
            Err(ModelError::MissingParameter(_))
        ));

        let vs3 = VarStore::new(Device::Cpu);
        let _model3 = model(&vs3, 8);
        save(&vs3, &path)?;
        assert!(matches!(
            NamedTensors::read(&path)?.check_against(&vs1),
            Err(ModelError::UnexpectedParameter(_))
        ));
        Ok(())
    }
}
