//! Per-run summaries across all runs of one environment.
//!
//! Every row of the hyperparameter table names a run whose statistics file
//! lives next to it. A [`RunSummary`] condenses the reward and feature
//! statistics of one run into three numbers, so runs with different
//! hyperparameters can be ranked.
use crate::{
    error::CurioError,
    hyperparams::{HyperparamRow, HyperparamTable, PARAMS_FILE},
    stats::{LogData, Metric, TemporalLogger},
};
use anyhow::Result;
use log::info;
use std::path::Path;

/// Decimation applied to the series when loading runs for a summary.
pub const DEFAULT_DECIMATE_STEP: usize = 250;

/// Summary statistics of one training run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// Hyperparameters of the run.
    pub params: HyperparamRow,

    /// Average of the per-step mean reward.
    pub mean_reward: f64,

    /// Average of the per-step standard deviation of the features.
    pub mean_feat_std: f64,

    /// `mean_reward * mean_feat_std`, large when a run both earns reward and
    /// keeps its features diverse.
    pub mean_proxy: f64,
}

impl RunSummary {
    fn new(params: HyperparamRow, rewards: &LogData, features: &LogData) -> Self {
        let mean_reward = average(rewards.mean());
        let mean_feat_std = average(features.std());
        Self {
            params,
            mean_reward,
            mean_feat_std,
            mean_proxy: mean_reward * mean_feat_std,
        }
    }

    /// Timestamp of the run.
    pub fn timestamp(&self) -> &str {
        self.params.timestamp().unwrap_or_default()
    }
}

/// `NaN` for an empty series.
fn average(xs: &[f32]) -> f64 {
    xs.iter().map(|&x| x as f64).sum::<f64>() / xs.len() as f64
}

/// Loads the rewards and features statistics of every run listed in
/// `<log_dir>/<env_name>/params.tsv`, keeping every `decimate_step`-th point.
///
/// Summaries follow the row order of the table. A run whose statistics file
/// is missing or lacks one of the two metrics is an error.
pub fn summarize_runs(
    env_name: &str,
    log_dir: impl AsRef<Path>,
    decimate_step: usize,
) -> Result<Vec<RunSummary>> {
    let log_dir = log_dir.as_ref();
    let table = HyperparamTable::read(log_dir.join(env_name).join(PARAMS_FILE))?;
    let metrics = [Metric::Rewards, Metric::Features];

    let mut summaries = vec![];
    for row in table.rows().iter() {
        let timestamp = row.timestamp()?;
        let mut logger = TemporalLogger::new(env_name, timestamp, log_dir, &metrics)?;
        logger.load(&format!("time_log_{}", timestamp), decimate_step)?;

        let get = |m: Metric| {
            logger
                .get(m)
                .ok_or_else(|| CurioError::UnknownMetric(m.to_string()))
        };
        summaries.push(RunSummary::new(
            row.clone(),
            get(Metric::Rewards)?,
            get(Metric::Features)?,
        ));
    }
    info!("Summarized {} runs of {}", summaries.len(), env_name);
    Ok(summaries)
}
