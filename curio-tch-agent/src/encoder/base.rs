use super::{FeatureEncoderConfig, LstmCell, RecurrentState};
use crate::{cnn::ConvBlock, error::ModelError, model::SubModel};
use log::{debug, info, trace};
use tch::{nn, Device, Tensor};

/// Convolutional tower optionally followed by an LSTM cell.
///
/// A recurrent encoder owns its memory exclusively. [`FeatureEncoder::encode`]
/// reads and updates it; [`FeatureEncoder::forward_with_state`] is the pure form
/// taking the state as a value and returning the next one.
pub struct FeatureEncoder {
    config: FeatureEncoderConfig,
    conv: ConvBlock,
    lstm: Option<LstmCell>,
    memory: Option<RecurrentState>,
    device: Device,
}

impl FeatureEncoder {
    /// Whether the encoder has an LSTM cell.
    pub fn is_recurrent(&self) -> bool {
        self.lstm.is_some()
    }

    /// Size of the returned feature vectors.
    pub fn out_dim(&self) -> i64 {
        self.config.out_dim()
    }

    /// Flattened convolutional features, `[N, feature_size]`.
    fn conv_features(&self, xs: &Tensor) -> Result<Tensor, ModelError> {
        let feature = self.conv.forward(xs)?;
        let width = feature.size()[1];
        if width != self.config.feature_size {
            return Err(ModelError::ShapeMismatch {
                what: "convolutional features",
                expected: vec![-1, self.config.feature_size],
                actual: feature.size(),
            });
        }
        Ok(feature)
    }

    fn lstm(&self) -> Result<&LstmCell, ModelError> {
        self.lstm.as_ref().ok_or_else(|| {
            ModelError::InvalidConfig("the encoder has no recurrent stage".to_string())
        })
    }

    /// Encodes `xs` starting from `state`, returning the features and the next state.
    pub fn forward_with_state(
        &self,
        xs: &Tensor,
        state: &RecurrentState,
    ) -> Result<(Tensor, RecurrentState), ModelError> {
        let lstm = self.lstm()?;
        let feature = self.conv_features(xs)?;

        let n = feature.size()[0];
        if state.batch_size() != n || state.hidden_size() != lstm.hidden_size() {
            return Err(ModelError::ShapeMismatch {
                what: "recurrent memory",
                expected: vec![n, lstm.hidden_size()],
                actual: state.hidden.size(),
            });
        }
        if state.device() != self.device {
            return Err(ModelError::DeviceMismatch {
                what: "recurrent memory",
                expected: self.device,
                actual: state.device(),
            });
        }

        let state = lstm.step(&feature, state);
        Ok((state.hidden.shallow_clone(), state))
    }

    /// Encodes `xs`, updating the recurrent memory if the encoder has one.
    pub fn encode(&mut self, xs: &Tensor) -> Result<Tensor, ModelError> {
        if !self.is_recurrent() {
            return self.conv_features(xs);
        }

        let memory = self.memory.as_ref().ok_or(ModelError::UninitializedMemory)?;
        let (feature, memory) = self.forward_with_state(xs, memory)?;
        self.memory = Some(memory);
        Ok(feature)
    }

    /// Allocates a zero memory for `batch_size` slots, discarding the previous one.
    ///
    /// No-op for a non-recurrent encoder.
    pub fn initialize_memory(&mut self, batch_size: i64) -> Result<(), ModelError> {
        let lstm = match &self.lstm {
            Some(lstm) => lstm,
            None => return Ok(()),
        };
        if batch_size <= 0 {
            return Err(ModelError::InvalidConfig(format!(
                "batch size must be positive, got {}",
                batch_size
            )));
        }

        self.memory = Some(RecurrentState::zeros(
            batch_size,
            lstm.hidden_size(),
            self.device,
        ));
        info!("Initialize recurrent memory for {} slots", batch_size);
        Ok(())
    }

    /// Resets the recurrent memory.
    ///
    /// Without a mask the whole memory is zeroed. With a mask, only the slots
    /// marked `true` are zeroed and the others are left as they are. The mask
    /// length must be the allocated batch size.
    ///
    /// No-op for a non-recurrent encoder.
    pub fn reset_memory(&mut self, mask: Option<&[bool]>) -> Result<(), ModelError> {
        if !self.is_recurrent() {
            return Ok(());
        }
        let memory = self.memory.as_ref().ok_or(ModelError::UninitializedMemory)?;

        match mask {
            None => {
                let batch_size = memory.batch_size();
                self.initialize_memory(batch_size)
            }
            Some(mask) => {
                trace!("Reset recurrent memory with mask {:?}", mask);
                self.memory = Some(memory.reset_masked(mask)?);
                Ok(())
            }
        }
    }

    /// The current recurrent memory.
    pub fn memory(&self) -> Option<&RecurrentState> {
        self.memory.as_ref()
    }

    /// Replaces the recurrent memory.
    pub fn set_memory(&mut self, state: RecurrentState) -> Result<(), ModelError> {
        let lstm = self.lstm()?;
        if state.hidden_size() != lstm.hidden_size() {
            return Err(ModelError::ShapeMismatch {
                what: "recurrent memory",
                expected: vec![-1, lstm.hidden_size()],
                actual: state.hidden.size(),
            });
        }
        self.memory = Some(state.to_device(self.device));
        Ok(())
    }

    /// Cuts the gradient history of the recurrent memory.
    pub fn detach_memory(&mut self) {
        self.memory = self.memory.as_ref().map(|m| m.detach());
    }

    /// Moves the recurrent memory to `device`.
    ///
    /// Parameters are moved by the owner of the [`nn::VarStore`].
    pub(crate) fn set_device(&mut self, device: Device) {
        self.device = device;
        self.conv.set_device(device);
        self.memory = self.memory.as_ref().map(|m| m.to_device(device));
    }
}

impl SubModel for FeatureEncoder {
    type Config = FeatureEncoderConfig;
    type Input = (Tensor, Option<RecurrentState>);
    type Output = (Tensor, Option<RecurrentState>);

    fn build(p: &nn::Path, config: Self::Config) -> Result<Self, ModelError> {
        config.validate()?;

        let conv = ConvBlock::build(&(p / "conv"), config.conv_config())?;
        let lstm = if config.use_recurrence {
            Some(LstmCell::new(
                &(p / "lstm"),
                config.feature_size,
                config.hidden_size,
            ))
        } else {
            None
        };
        debug!("Build FeatureEncoder with {:?}", config);

        Ok(Self {
            config,
            conv,
            lstm,
            memory: None,
            device: p.device(),
        })
    }

    /// Recurrent encoders require a state; non-recurrent ones ignore it.
    fn forward(&self, input: &Self::Input) -> Result<Self::Output, ModelError> {
        let (xs, state) = input;
        if !self.is_recurrent() {
            return Ok((self.conv_features(xs)?, None));
        }

        let state = state.as_ref().ok_or(ModelError::UninitializedMemory)?;
        let (feature, state) = self.forward_with_state(xs, state)?;
        Ok((feature, Some(state)))
    }
}
