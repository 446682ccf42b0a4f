use crate::error::ModelError;
use tch::{nn, Device, Kind, Tensor};

/// Hidden and cell state of an LSTM cell, one row per environment slot.
pub struct RecurrentState {
    /// Hidden state, `[N, H]`.
    pub hidden: Tensor,

    /// Cell state, `[N, H]`.
    pub cell: Tensor,
}

impl RecurrentState {
    /// Zero state for `batch_size` slots.
    pub fn zeros(batch_size: i64, hidden_size: i64, device: Device) -> Self {
        Self {
            hidden: Tensor::zeros([batch_size, hidden_size], (Kind::Float, device)),
            cell: Tensor::zeros([batch_size, hidden_size], (Kind::Float, device)),
        }
    }

    /// Number of slots.
    pub fn batch_size(&self) -> i64 {
        self.hidden.size()[0]
    }

    /// Size of the hidden state.
    pub fn hidden_size(&self) -> i64 {
        self.hidden.size()[1]
    }

    /// Device on which the state lives.
    pub fn device(&self) -> Device {
        self.hidden.device()
    }

    /// Returns the state with the rows where `mask` is `true` set to zero.
    ///
    /// The other rows keep their values and their gradient history.
    /// An all-`false` mask returns the state as it is.
    pub fn reset_masked(&self, mask: &[bool]) -> Result<Self, ModelError> {
        if mask.len() as i64 != self.batch_size() {
            return Err(ModelError::ShapeMismatch {
                what: "reset mask",
                expected: vec![self.batch_size()],
                actual: vec![mask.len() as i64],
            });
        }
        if !mask.iter().any(|&m| m) {
            return Ok(self.shallow_clone());
        }

        let mask = Tensor::from_slice(mask)
            .to_device(self.device())
            .view([-1, 1]);
        Ok(Self {
            hidden: self.hidden.masked_fill(&mask, 0.0),
            cell: self.cell.masked_fill(&mask, 0.0),
        })
    }

    /// Cuts the gradient history.
    pub fn detach(&self) -> Self {
        Self {
            hidden: self.hidden.detach(),
            cell: self.cell.detach(),
        }
    }

    /// Copies the state to `device`.
    pub fn to_device(&self, device: Device) -> Self {
        Self {
            hidden: self.hidden.to_device(device),
            cell: self.cell.to_device(device),
        }
    }

    /// Returns a state sharing the storage of this one.
    pub fn shallow_clone(&self) -> Self {
        Self {
            hidden: self.hidden.shallow_clone(),
            cell: self.cell.shallow_clone(),
        }
    }
}

impl std::fmt::Debug for RecurrentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecurrentState")
            .field("hidden", &self.hidden.size())
            .field("cell", &self.cell.size())
            .finish()
    }
}

/// LSTM cell with the gates stacked in the order input, forget, cell, output.
pub struct LstmCell {
    weight_ih: Tensor,
    weight_hh: Tensor,
    bias_ih: Tensor,
    bias_hh: Tensor,
    hidden_size: i64,
}

impl LstmCell {
    /// Creates the cell under `p`.
    ///
    /// All parameters are drawn from `U(-1/sqrt(H), 1/sqrt(H))`.
    pub fn new(p: &nn::Path, in_size: i64, hidden_size: i64) -> Self {
        let k = 1.0 / (hidden_size as f64).sqrt();
        let init = nn::Init::Uniform { lo: -k, up: k };
        let gates = 4 * hidden_size;

        Self {
            weight_ih: p.var("weight_ih", &[gates, in_size], init),
            weight_hh: p.var("weight_hh", &[gates, hidden_size], init),
            bias_ih: p.var("bias_ih", &[gates], init),
            bias_hh: p.var("bias_hh", &[gates], init),
            hidden_size,
        }
    }

    /// Size of the hidden state.
    pub fn hidden_size(&self) -> i64 {
        self.hidden_size
    }

    /// One step of the cell.
    pub fn step(&self, xs: &Tensor, state: &RecurrentState) -> RecurrentState {
        let gates = xs.matmul(&self.weight_ih.tr())
            + &self.bias_ih
            + state.hidden.matmul(&self.weight_hh.tr())
            + &self.bias_hh;
        let chunks = gates.chunk(4, 1);
        let i = chunks[0].sigmoid();
        let f = chunks[1].sigmoid();
        let g = chunks[2].tanh();
        let o = chunks[3].sigmoid();

        let cell = f * &state.cell + i * g;
        let hidden = o * cell.tanh();
        RecurrentState { hidden, cell }
    }
}

#[cfg(test)]
mod tests {
    use super::{LstmCell, RecurrentState};
    use crate::error::ModelError;
    use std::convert::TryFrom;
    use tch::{nn::VarStore, Device, Kind, Tensor};

    #[test]
    fn test_lstm_step_matches_libtorch() {
        tch::manual_seed(42);
        let vs = VarStore::new(Device::Cpu);
        let cell = LstmCell::new(&vs.root(), 5, 3);
        let xs = Tensor::randn([2, 5], (Kind::Float, Device::Cpu));
        let state = RecurrentState {
            hidden: Tensor::randn([2, 3], (Kind::Float, Device::Cpu)),
            cell: Tensor::randn([2, 3], (Kind::Float, Device::Cpu)),
        };

        let actual = cell.step(&xs, &state);
        let (h, c) = xs.lstm_cell(
            &[&state.hidden, &state.cell],
            &cell.weight_ih,
            &cell.weight_hh,
            Some(&cell.bias_ih),
            Some(&cell.bias_hh),
        );
        assert!(actual.hidden.allclose(&h, 1e-5, 1e-6, false));
        assert!(actual.cell.allclose(&c, 1e-5, 1e-6, false));
    }

    #[test]
    fn test_reset_masked_length() {
        let state = RecurrentState::zeros(3, 4, Device::Cpu);
        assert!(matches!(
            state.reset_masked(&[true, false]),
            Err(ModelError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_reset_masked_keeps_graph() -> anyhow::Result<()> {
        let x = Tensor::ones([2, 3], (Kind::Float, Device::Cpu)).set_requires_grad(true);
        let state = RecurrentState {
            hidden: &x * 2.0,
            cell: &x * 3.0,
        };
        let state = state.reset_masked(&[true, false])?;
        state.hidden.sum(Kind::Float).backward();

        let grad = x.grad();
        assert_eq!(Vec::<f32>::try_from(grad.get(0))?, vec![0.0; 3]);
        assert_eq!(Vec::<f32>::try_from(grad.get(1))?, vec![2.0; 3]);
        Ok(())
    }
}
