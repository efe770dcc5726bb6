//! Behaviour switches for merging and finalization.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// What [`finalize`](crate::StdDev::finalize) does when no frame was accumulated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyPolicy {
    /// Return [`Error::NoFrames`].
    #[default]
    Fail,
    /// Return NaN variance, std and mean with zero sums and `num_frame == 0`.
    Nan,
}

/// How a partition merge reconciles the region counts of its two sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountMerge {
    /// Only regions present in the incoming side get the combined count.
    ///
    /// Regions known only to the destination keep their old count, so merging
    /// results with disjoint region sets leaves them inconsistent and finalization
    /// fails.
    #[default]
    IncomingKeys,
    /// Both sides must carry the same regions.
    ///
    /// A merge of two non-empty results whose region sets differ fails with
    /// [`Error::InconsistentCount`] before anything is written. An empty side is
    /// still the merge identity.
    Strict,
}

/// Configuration for [`StdDev`](crate::StdDev) and [`run_stddev`](crate::run_stddev).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StdDevConfig {
    pub empty: EmptyPolicy,
    pub count_merge: CountMerge,
    /// Upper bound on partitions folded at the same time by the driver.
    pub max_concurrent_partitions: usize,
}

impl Default for StdDevConfig {
    fn default() -> Self {
        Self {
            empty: EmptyPolicy::Fail,
            count_merge: CountMerge::IncomingKeys,
            max_concurrent_partitions: rayon::current_num_threads(),
        }
    }
}

impl StdDevConfig {
    pub fn empty(mut self, empty: EmptyPolicy) -> Self {
        self.empty = empty;
        self
    }

    pub fn count_merge(mut self, count_merge: CountMerge) -> Self {
        self.count_merge = count_merge;
        self
    }

    pub fn max_concurrent_partitions(mut self, max: usize) -> Self {
        self.max_concurrent_partitions = max;
        self
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.max_concurrent_partitions == 0 {
            return Err(Error::Config(
                "max_concurrent_partitions must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Parse and validate a YAML or JSON configuration.
    pub fn from_str_with_format(text: &str, format: common::FileFormat) -> Result<Self, Error> {
        let config: Self = common::deserialize(text, format)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a configuration file; the format follows the file extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let format = common::FileFormat::from_file_name(&path.to_string_lossy())
            .map_err(|e| Error::Config(e.to_string()))?;
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {e}", path.display())))?;
        Self::from_str_with_format(&text, format)
    }
}
