use crate::error::CurioError;
use anyhow::Result;
use log::{info, trace};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs::File,
    io::{BufReader, BufWriter},
    path::Path,
};

/// Statistics of a stream of samples.
///
/// Each call of [`LogData::record`] appends one element to each of the four
/// series. Restoring with a decimation stride greater than one keeps every
/// `stride`-th element only; the dropped summaries cannot be recovered. The
/// accumulated stride is persisted with the series, so decimated data stays
/// marked as such across persist and restore cycles.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LogData {
    mean: Vec<f32>,
    std: Vec<f32>,
    min: Vec<f32>,
    max: Vec<f32>,

    #[serde(default = "exact_stride")]
    stride: usize,
}

fn exact_stride() -> usize {
    1
}

/// Minimum or maximum that propagates NaN.
fn nan_fold(xs: &[f32], init: f32, f: fn(f32, f32) -> f32) -> f32 {
    xs.iter().fold(init, |acc, &x| {
        if acc.is_nan() || x.is_nan() {
            f32::NAN
        } else {
            f(acc, x)
        }
    })
}

impl Default for LogData {
    fn default() -> Self {
        Self {
            mean: vec![],
            std: vec![],
            min: vec![],
            max: vec![],
            stride: exact_stride(),
        }
    }
}

impl LogData {
    /// Creates an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the mean, population standard deviation, minimum and maximum of `sample`.
    ///
    /// A NaN in `sample` makes all four statistics NaN.
    pub fn record(&mut self, sample: &[f32]) -> Result<(), CurioError> {
        if sample.is_empty() {
            return Err(CurioError::EmptySample("sample".to_string()));
        }

        let n = sample.len() as f64;
        let mean = sample.iter().map(|&x| x as f64).sum::<f64>() / n;
        let var = sample
            .iter()
            .map(|&x| {
                let d = x as f64 - mean;
                d * d
            })
            .sum::<f64>()
            / n;
        let min = nan_fold(sample, f32::INFINITY, f32::min);
        let max = nan_fold(sample, f32::NEG_INFINITY, f32::max);

        self.mean.push(mean as f32);
        self.std.push(var.sqrt() as f32);
        self.min.push(min);
        self.max.push(max);
        Ok(())
    }

    /// Writes the four series and their decimation stride into `dest` under `name`.
    pub fn persist(&self, dest: &mut StatsFile, name: &str) {
        dest.groups.insert(name.to_string(), self.clone());
    }

    /// Reads the series stored under `name`, keeping every `stride`-th element.
    ///
    /// The resulting decimation stride is the stored one times `stride`.
    pub fn restore(&mut self, src: &StatsFile, name: &str, stride: usize) -> Result<(), CurioError> {
        if stride == 0 {
            return Err(CurioError::InvalidDecimation(stride));
        }
        let group = src
            .groups
            .get(name)
            .ok_or_else(|| CurioError::UnknownMetric(name.to_string()))?;
        group.check_lengths(name)?;

        let decimate = |v: &Vec<f32>| v.iter().step_by(stride).copied().collect::<Vec<_>>();
        self.mean = decimate(&group.mean);
        self.std = decimate(&group.std);
        self.min = decimate(&group.min);
        self.max = decimate(&group.max);
        self.stride = group.stride.max(1) * stride;
        trace!("Restored {} ({} points, stride {})", name, self.mean.len(), self.stride);
        Ok(())
    }

    fn check_lengths(&self, name: &str) -> Result<(), CurioError> {
        let n = self.mean.len();
        if self.std.len() != n || self.min.len() != n || self.max.len() != n {
            return Err(CurioError::InconsistentSeries {
                name: name.to_string(),
                mean: self.mean.len(),
                std: self.std.len(),
                min: self.min.len(),
                max: self.max.len(),
            });
        }
        Ok(())
    }

    /// Number of recorded points.
    pub fn len(&self) -> usize {
        self.mean.len()
    }

    /// Returns `true` if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.mean.is_empty()
    }

    /// Accumulated decimation stride, `1` for exact series.
    pub fn decimation_stride(&self) -> usize {
        self.stride
    }

    /// Returns `true` if no element was dropped by decimation.
    pub fn is_exact(&self) -> bool {
        self.stride == 1
    }

    /// Series of means.
    pub fn mean(&self) -> &[f32] {
        &self.mean
    }

    /// Series of standard deviations.
    pub fn std(&self) -> &[f32] {
        &self.std
    }

    /// Series of minimums.
    pub fn min(&self) -> &[f32] {
        &self.min
    }

    /// Series of maximums.
    pub fn max(&self) -> &[f32] {
        &self.max
    }
}

/// Container of [`LogData`] series keyed by metric name.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct StatsFile {
    groups: BTreeMap<String, LogData>,
}

impl StatsFile {
    /// Creates an empty container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of the stored metrics.
    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.groups.keys()
    }

    /// Returns `true` if a group named `name` exists.
    pub fn contains(&self, name: &str) -> bool {
        self.groups.contains_key(name)
    }

    /// Writes the container to a file.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = BufWriter::new(File::create(&path)?);
        bincode::serialize_into(file, self)?;
        info!("Save statistics to {:?}", path.as_ref());
        Ok(())
    }

    /// Reads a container from a file.
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let file = BufReader::new(File::open(&path)?);
        let stats = bincode::deserialize_from(file)?;
        info!("Load statistics from {:?}", path.as_ref());
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::{LogData, StatsFile};
    use crate::error::CurioError;
    use tempdir::TempDir;

    #[test]
    fn test_record_statistics() {
        let mut data = LogData::new();
        data.record(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(data.mean(), &[2.5]);
        assert!((data.std()[0] - 1.118034).abs() < 1e-6);
        assert_eq!(data.min(), &[1.0]);
        assert_eq!(data.max(), &[4.0]);
        assert!(matches!(data.record(&[]), Err(CurioError::EmptySample(_))));
        assert_eq!(data.len(), 1);
    }

    #[test]
    fn test_persist_restore_exact() -> anyhow::Result<()> {
        let tmp_dir = TempDir::new("log_data")?;
        let path = tmp_dir.path().join("stats.bin");

        let mut data = LogData::new();
        data.record(&[1.0, 2.0, 3.0])?;
        data.record(&[4.0, 5.0, 6.0])?;
        data.record(&[7.0, 8.0, 9.0])?;

        let mut file = StatsFile::new();
        data.persist(&mut file, "rewards");
        file.write(&path)?;

        let file = StatsFile::read(&path)?;
        let mut restored = LogData::new();
        restored.restore(&file, "rewards", 1)?;
        assert_eq!(restored.mean(), &[2.0, 5.0, 8.0]);
        assert_eq!(restored.min(), &[1.0, 4.0, 7.0]);
        assert_eq!(restored.max(), &[3.0, 6.0, 9.0]);
        assert_eq!(restored.decimation_stride(), 1);
        assert!(restored.is_exact());
        Ok(())
    }

    #[test]
    fn test_restore_decimated() {
        let mut data = LogData::new();
        for i in 0..10 {
            data.record(&[i as f32]).unwrap();
        }
        let mut file = StatsFile::new();
        data.persist(&mut file, "losses");

        let mut restored = LogData::new();
        restored.restore(&file, "losses", 4).unwrap();
        assert_eq!(restored.mean(), &[0.0, 4.0, 8.0]);
        assert_eq!(restored.std(), &[0.0, 0.0, 0.0]);

        assert!(matches!(
            restored.restore(&file, "losses", 0),
            Err(CurioError::InvalidDecimation(0))
        ));
        assert!(matches!(
            restored.restore(&file, "rewards", 1),
            Err(CurioError::UnknownMetric(_))
        ));
    }

    #[test]
    fn test_decimation_survives_persist() -> anyhow::Result<()> {
        let tmp_dir = TempDir::new("log_data")?;
        let path = tmp_dir.path().join("stats.bin");

        let mut data = LogData::new();
        for i in 0..10 {
            data.record(&[i as f32])?;
        }
        assert!(data.is_exact());
        let mut file = StatsFile::new();
        data.persist(&mut file, "rewards");

        let mut decimated = LogData::new();
        decimated.restore(&file, "rewards", 5)?;
        assert_eq!(decimated.mean(), &[0.0, 5.0]);
        assert_eq!(decimated.decimation_stride(), 5);

        // Saved back and read with stride 1, the series is still decimated
        let mut file = StatsFile::new();
        decimated.persist(&mut file, "rewards");
        file.write(&path)?;
        let file = StatsFile::read(&path)?;
        let mut restored = LogData::new();
        restored.restore(&file, "rewards", 1)?;
        assert_eq!(restored.mean(), &[0.0, 5.0]);
        assert_eq!(restored.decimation_stride(), 5);
        assert!(!restored.is_exact());

        restored.restore(&file, "rewards", 2)?;
        assert_eq!(restored.mean(), &[0.0]);
        assert_eq!(restored.decimation_stride(), 10);
        Ok(())
    }

    #[test]
    fn test_nan_propagates_to_every_statistic() -> anyhow::Result<()> {
        let mut data = LogData::new();
        data.record(&[1.0, f32::NAN, 2.0])?;
        data.record(&[f32::NAN])?;
        for series in [data.mean(), data.std(), data.min(), data.max()].iter() {
            assert!(series.iter().all(|x| x.is_nan()));
        }

        data.record(&[3.0, -1.0])?;
        assert_eq!(data.min()[2], -1.0);
        assert_eq!(data.max()[2], 3.0);
        Ok(())
    }
}
