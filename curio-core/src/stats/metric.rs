use crate::error::CurioError;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Names of the scalar streams recorded during training.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Extrinsic rewards of the environments.
    Rewards,

    /// Feature vectors produced by the encoder.
    Features,

    /// Loss values.
    Losses,

    /// Entropy of the policy.
    Entropy,

    /// Value estimates of the critic.
    Values,

    /// Rewards derived from the forward-dynamics prediction error.
    IntrinsicRewards,
}

impl Metric {
    /// All metrics, in a fixed order.
    pub const ALL: [Metric; 6] = [
        Metric::Rewards,
        Metric::Features,
        Metric::Losses,
        Metric::Entropy,
        Metric::Values,
        Metric::IntrinsicRewards,
    ];

    /// Key of the metric in persisted files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Rewards => "rewards",
            Metric::Features => "features",
            Metric::Losses => "losses",
            Metric::Entropy => "entropy",
            Metric::Values => "values",
            Metric::IntrinsicRewards => "intrinsic_rewards",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = CurioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Metric::ALL
            .iter()
            .find(|m| m.as_str() == s)
            .copied()
            .ok_or_else(|| CurioError::UnknownMetric(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::Metric;

    #[test]
    fn test_metric_names_round_trip() {
        for m in Metric::ALL.iter() {
            assert_eq!(m.as_str().parse::<Metric>().unwrap(), *m);
        }
        assert!("reward".parse::<Metric>().is_err());
    }
}
