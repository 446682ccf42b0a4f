//! Errors of the models.
use tch::{Device, Kind, TchError};
use thiserror::Error;

/// Errors raised by the networks.
#[derive(Error, Debug)]
pub enum ModelError {
    /// A tensor does not have the shape the model was configured or allocated for.
    ///
    /// `-1` in `expected` stands for a dimension that is not constrained.
    #[error("Shape mismatch in {what}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        /// The tensor being checked.
        what: &'static str,
        /// Expected shape.
        expected: Vec<i64>,
        /// Actual shape.
        actual: Vec<i64>,
    },

    /// A recurrent encoder was used before its memory was allocated.
    #[error("Recurrent memory is not initialized")]
    UninitializedMemory,

    /// A tensor lives on another device than the model.
    #[error("Device mismatch in {what}: expected {expected:?}, got {actual:?}")]
    DeviceMismatch {
        /// The tensor being checked.
        what: &'static str,
        /// Device of the model.
        expected: Device,
        /// Device of the tensor.
        actual: Device,
    },

    /// An action index is not in `[0, num_actions)`.
    #[error("Action {action} out of range [0, {num_actions})")]
    ActionOutOfRange {
        /// The offending action.
        action: i64,
        /// Size of the action space.
        num_actions: i64,
    },

    /// Actions must be given as integers.
    #[error("Actions must be integers, got {0:?}")]
    ActionKind(Kind),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A parameter of the model is missing in a checkpoint.
    #[error("Parameter {0} is missing in the checkpoint")]
    MissingParameter(String),

    /// A checkpoint has a parameter the model does not have.
    #[error("Unexpected parameter {0} in the checkpoint")]
    UnexpectedParameter(String),

    /// A parameter in a checkpoint has another shape than in the model.
    #[error("Shape of parameter {name} differs: expected {expected:?}, got {actual:?}")]
    ParameterShapeMismatch {
        /// Name of the parameter.
        name: String,
        /// Shape in the model.
        expected: Vec<i64>,
        /// Shape in the checkpoint.
        actual: Vec<i64>,
    },

    /// Error from libtorch.
    #[error(transparent)]
    Tch(#[from] TchError),
}
