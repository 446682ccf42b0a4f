//! Definition of interfaces of neural networks.
use crate::error::ModelError;
use anyhow::Result;
use std::path::Path;
use tch::{nn, Tensor};

/// Base interface of a network owning its parameters.
pub trait ModelBase {
    /// Trains the network given a loss.
    fn backward_step(&mut self, loss: &Tensor);

    /// Returns `var_store` as mutable reference.
    fn get_var_store_mut(&mut self) -> &mut nn::VarStore;

    /// Returns `var_store`.
    fn get_var_store(&self) -> &nn::VarStore;

    /// Parameters of the network ordered by name.
    fn parameters(&self) -> Vec<(String, Tensor)> {
        let mut params = self
            .get_var_store()
            .variables()
            .into_iter()
            .collect::<Vec<_>>();
        params.sort_by(|a, b| a.0.cmp(&b.0));
        params
    }

    /// Save parameters of the neural network.
    fn save<T: AsRef<Path>>(&self, path: T) -> Result<()>;

    /// Load parameters of the neural network.
    ///
    /// Nothing is copied unless every parameter in the file matches the network
    /// by name and shape.
    fn load<T: AsRef<Path>>(&mut self, path: T) -> Result<()>;
}

/// Neural network module built under a path of a [`VarStore`].
///
/// Modules composing a network share the [`VarStore`] of the network; each
/// module registers its parameters under its own sub-path.
///
/// [`VarStore`]: https://docs.rs/tch/0.16.0/tch/nn/struct.VarStore.html
pub trait SubModel: Sized {
    /// Configuration from which [`SubModel`] is constructed.
    type Config;

    /// Input of the [`SubModel`].
    type Input;

    /// Output of the [`SubModel`].
    type Output;

    /// Builds [`SubModel`] under `path` with [`SubModel::Config`].
    fn build(path: &nn::Path, config: Self::Config) -> Result<Self, ModelError>;

    /// A generalized forward function.
    fn forward(&self, input: &Self::Input) -> Result<Self::Output, ModelError>;
}

/// Neural network module taking two inputs.
pub trait SubModel2: Sized {
    /// Configuration from which [`SubModel2`] is constructed.
    type Config;

    /// Input of the [`SubModel2`].
    type Input1;

    /// Input of the [`SubModel2`].
    type Input2;

    /// Output of the [`SubModel2`].
    type Output;

    /// Builds [`SubModel2`] under `path` with [`SubModel2::Config`].
    fn build(path: &nn::Path, config: Self::Config) -> Result<Self, ModelError>;

    /// A generalized forward function.
    fn forward(&self, input1: &Self::Input1, input2: &Self::Input2) -> Result<Self::Output, ModelError>;
}
