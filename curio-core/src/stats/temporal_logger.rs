use super::{LogData, Metric, StatsFile};
use crate::{
    error::CurioError,
    record::{Record, RecordValue},
};
use anyhow::Result;
use log::{debug, info};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

/// Statistics of a fixed set of metrics for one training run.
///
/// Files are written to `<log_dir>/<env_name>/time_log_<timestamp>.bin`.
pub struct TemporalLogger {
    timestamp: String,
    data_dir: PathBuf,
    data: BTreeMap<Metric, LogData>,
}

impl TemporalLogger {
    /// Extension of the statistics files.
    pub const EXTENSION: &'static str = "bin";

    /// Creates a logger for `metrics`, creating the data directory if needed.
    pub fn new(
        env_name: &str,
        timestamp: impl Into<String>,
        log_dir: impl AsRef<Path>,
        metrics: &[Metric],
    ) -> Result<Self> {
        let mut data = BTreeMap::new();
        for &m in metrics.iter() {
            if data.insert(m, LogData::new()).is_some() {
                return Err(CurioError::DuplicateMetric(m.to_string()).into());
            }
        }

        let data_dir = log_dir.as_ref().join(env_name);
        fs::create_dir_all(&data_dir)?;
        debug!("Temporal logger in {:?} with {} metrics", data_dir, data.len());

        Ok(Self {
            timestamp: timestamp.into(),
            data_dir,
            data,
        })
    }

    /// Timestamp identifying the run.
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    /// Directory holding the statistics files.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Path of the statistics file of this run.
    pub fn file_path(&self) -> PathBuf {
        self.data_dir
            .join(format!("time_log_{}.{}", self.timestamp, Self::EXTENSION))
    }

    /// Registered metrics.
    pub fn metrics(&self) -> impl Iterator<Item = &Metric> {
        self.data.keys()
    }

    /// Appends the statistics of `sample` to `metric`.
    pub fn log(&mut self, metric: Metric, sample: &[f32]) -> Result<(), CurioError> {
        let data = self
            .data
            .get_mut(&metric)
            .ok_or_else(|| CurioError::UnknownMetric(metric.to_string()))?;
        data.record(sample).map_err(|e| match e {
            CurioError::EmptySample(_) => CurioError::EmptySample(metric.to_string()),
            e => e,
        })
    }

    /// Statistics of `metric`, if registered.
    pub fn get(&self, metric: Metric) -> Option<&LogData> {
        self.data.get(&metric)
    }

    /// Saves the given metrics into [`TemporalLogger::file_path`].
    pub fn save(&self, metrics: &[Metric]) -> Result<()> {
        let mut file = StatsFile::new();
        for m in metrics.iter() {
            let data = self
                .data
                .get(m)
                .ok_or_else(|| CurioError::UnknownMetric(m.to_string()))?;
            data.persist(&mut file, m.as_str());
        }
        file.write(self.file_path())
    }

    /// Loads every registered metric from a file in the data directory.
    ///
    /// `filename` may be given without extension. Each series keeps every
    /// `decimate_step`-th point.
    pub fn load(&mut self, filename: &str, decimate_step: usize) -> Result<()> {
        let suffix = format!(".{}", Self::EXTENSION);
        let filename = if filename.ends_with(&suffix) {
            filename.to_string()
        } else {
            format!("{}{}", filename, suffix)
        };
        let path = self.data_dir.join(filename);
        let file = StatsFile::read(&path)?;

        // A missing group leaves `self` untouched
        let mut restored = BTreeMap::new();
        for m in self.data.keys() {
            let mut data = LogData::new();
            data.restore(&file, m.as_str(), decimate_step)?;
            restored.insert(*m, data);
        }
        self.data = restored;
        info!("Load temporal log from {:?}", path);
        Ok(())
    }

    /// Latest mean, std, min and max of every non-empty metric.
    ///
    /// Keys are `<metric>_mean`, `<metric>_std`, `<metric>_min` and `<metric>_max`.
    pub fn latest_record(&self) -> Record {
        let mut record = Record::empty();
        for (m, data) in self.data.iter() {
            let series = [
                ("mean", data.mean()),
                ("std", data.std()),
                ("min", data.min()),
                ("max", data.max()),
            ];
            for (suffix, values) in series.iter() {
                if let Some(v) = values.last() {
                    record.insert(format!("{}_{}", m, suffix), RecordValue::Scalar(*v));
                }
            }
        }
        record
    }
}

#[cfg(test)]
mod tests {
    use super::TemporalLogger;
    use crate::{error::CurioError, stats::Metric};
    use tempdir::TempDir;
    use test_log::test;

    #[test]
    fn test_save_load_round_trip() -> anyhow::Result<()> {
        let tmp_dir = TempDir::new("temporal_logger")?;
        let metrics = [Metric::Rewards, Metric::Features];
        let mut logger = TemporalLogger::new("PongNoFrameskip-v4", "2020-01-01_00-00-00", tmp_dir.path(), &metrics)?;

        logger.log(Metric::Rewards, &[1.0, 2.0, 3.0])?;
        logger.log(Metric::Rewards, &[4.0, 5.0, 6.0])?;
        logger.log(Metric::Rewards, &[7.0, 8.0, 9.0])?;
        logger.log(Metric::Features, &[0.5, 0.5])?;
        logger.log(Metric::Features, &[1.0, 3.0])?;
        logger.log(Metric::Features, &[2.0, 2.0])?;
        logger.save(&metrics)?;
        assert!(logger.file_path().exists());

        let mut restored = TemporalLogger::new("PongNoFrameskip-v4", "other", tmp_dir.path(), &metrics)?;
        restored.load("time_log_2020-01-01_00-00-00", 1)?;
        assert_eq!(restored.get(Metric::Rewards).unwrap().mean(), &[2.0, 5.0, 8.0]);
        assert_eq!(restored.get(Metric::Features).unwrap().std(), &[0.0, 1.0, 0.0]);
        Ok(())
    }

    #[test]
    fn test_fixed_metric_set() -> anyhow::Result<()> {
        let tmp_dir = TempDir::new("temporal_logger")?;
        let dup = TemporalLogger::new("env", "ts", tmp_dir.path(), &[Metric::Losses, Metric::Losses]);
        assert!(dup.is_err());

        let mut logger = TemporalLogger::new("env", "ts", tmp_dir.path(), &[Metric::Losses])?;
        assert!(matches!(
            logger.log(Metric::Entropy, &[1.0]),
            Err(CurioError::UnknownMetric(_))
        ));
        assert!(matches!(
            logger.log(Metric::Losses, &[]),
            Err(CurioError::EmptySample(_))
        ));
        Ok(())
    }

    #[test]
    fn test_load_missing_metric_keeps_state() -> anyhow::Result<()> {
        let tmp_dir = TempDir::new("temporal_logger")?;
        let mut writer = TemporalLogger::new("env", "a", tmp_dir.path(), &[Metric::Rewards])?;
        writer.log(Metric::Rewards, &[1.0])?;
        writer.save(&[Metric::Rewards])?;

        let mut reader = TemporalLogger::new("env", "b", tmp_dir.path(), &[Metric::Rewards, Metric::Values])?;
        reader.log(Metric::Values, &[3.0])?;
        assert!(reader.load("time_log_a.bin", 1).is_err());
        assert_eq!(reader.get(Metric::Values).unwrap().mean(), &[3.0]);
        Ok(())
    }

    #[test]
    fn test_latest_record() -> anyhow::Result<()> {
        let tmp_dir = TempDir::new("temporal_logger")?;
        let mut logger = TemporalLogger::new("env", "ts", tmp_dir.path(), &[Metric::Entropy, Metric::Values])?;
        logger.log(Metric::Entropy, &[1.0, 3.0])?;
        let record = logger.latest_record();
        assert_eq!(record.get_scalar("entropy_mean")?, 2.0);
        assert_eq!(record.get_scalar("entropy_max")?, 3.0);
        assert!(record.get("values_mean").is_none());
        Ok(())
    }
}
