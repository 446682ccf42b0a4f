use tch::{Kind, Tensor};

/// Categorical distributions over the last dimension of a batch of logits.
pub struct Categorical {
    log_probs: Tensor,
}

impl Categorical {
    /// Normalizes `logits` of shape `[N, A]`.
    pub fn from_logits(logits: &Tensor) -> Self {
        Self {
            log_probs: logits.log_softmax(-1, Kind::Float),
        }
    }

    /// Probabilities, `[N, A]`.
    pub fn probs(&self) -> Tensor {
        self.log_probs.exp()
    }

    /// Log-probabilities, `[N, A]`.
    pub fn log_probs(&self) -> &Tensor {
        &self.log_probs
    }

    /// Draws one action per row, `[N]` of `i64`.
    ///
    /// The samples are not part of the computation graph.
    pub fn sample(&self) -> Tensor {
        tch::no_grad(|| self.probs().multinomial(1, true).squeeze_dim(-1))
    }

    /// Log-probability of `actions` (`[N]`), `[N]`.
    pub fn log_prob(&self, actions: &Tensor) -> Tensor {
        self.log_probs
            .gather(-1, &actions.to_kind(Kind::Int64).unsqueeze(-1), false)
            .squeeze_dim(-1)
    }

    /// Entropy of each row, `[N]`.
    pub fn entropy(&self) -> Tensor {
        -(self.probs() * &self.log_probs).sum_dim_intlist(Some(&[-1i64][..]), false, Kind::Float)
    }
}

#[cfg(test)]
mod tests {
    use super::Categorical;
    use tch::{Device, Kind, Tensor};

    fn logits() -> Tensor {
        Tensor::from_slice(&[
            1e4f32, -1e4, 0.0, 3.0, //
            1.0, 1.0, 1.0 + 1e-7, 1.0, //
            -50.0, 50.0, 49.9999, -50.0, //
            0.0, 0.0, 0.0, 0.0,
        ])
        .view([4, 4])
    }

    #[test]
    fn test_probs_sum_to_one() {
        let dist = Categorical::from_logits(&logits());
        let sums = dist.probs().sum_dim_intlist(Some(&[-1i64][..]), false, Kind::Float);
        let err = (sums - 1.0).abs().max().double_value(&[]);
        assert!(err <= 1e-5, "max error {}", err);

        tch::manual_seed(0);
        let random = Tensor::randn([64, 6], (Kind::Float, Device::Cpu)) * 1e3;
        let sums = Categorical::from_logits(&random)
            .probs()
            .sum_dim_intlist(Some(&[-1i64][..]), false, Kind::Float);
        assert!((sums - 1.0).abs().max().double_value(&[]) <= 1e-5);
    }

    #[test]
    fn test_samples_in_range() {
        tch::manual_seed(42);
        let dist = Categorical::from_logits(&logits());
        for _ in 0..200 {
            let a = dist.sample();
            assert_eq!(a.size(), vec![4]);
            assert_eq!(a.kind(), Kind::Int64);
            assert!(a.min().int64_value(&[]) >= 0);
            assert!(a.max().int64_value(&[]) < 4);
        }
    }

    #[test]
    fn test_degenerate_row_is_deterministic() {
        tch::manual_seed(1);
        let dist = Categorical::from_logits(&logits());
        for _ in 0..50 {
            assert_eq!(dist.sample().int64_value(&[0]), 0);
        }
    }

    #[test]
    fn test_log_prob_and_entropy() {
        let dist = Categorical::from_logits(&Tensor::zeros([2, 4], (Kind::Float, Device::Cpu)));
        let lp = dist.log_prob(&Tensor::from_slice(&[0i64, 3]));
        assert_eq!(lp.size(), vec![2]);
        assert!((lp.double_value(&[1]) + 4f64.ln()).abs() < 1e-6);

        let h = dist.entropy();
        assert_eq!(h.size(), vec![2]);
        assert!((h.double_value(&[0]) - 4f64.ln()).abs() < 1e-6);
    }
}
