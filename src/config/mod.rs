//! Runner configuration
//!
//! Settings come from the environment, then CLI flags layer on top through
//! the `with_*` setters.

pub mod presets;

pub use presets::{get_preset, preset_ids, Preset, PresetDefaults, PRESETS};

use crate::error::{Result, RunForgeError};
use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use std::path::PathBuf;

/// Dataset path for `train` when `--dataset` is not given
pub const ENV_DATASET: &str = "RUNFORGE_DATASET";
/// Fixed "now" for golden-file tests, RFC 3339
pub const ENV_FIXED_TIME: &str = "RUNFORGE_TEST_FIXED_TIME";
/// Explicit `.runforge` workspace directory
pub const ENV_RUNFORGE_DIR: &str = "RUNFORGE_DIR";

/// Source of every timestamp a run records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunClock {
    #[default]
    System,
    Fixed(DateTime<FixedOffset>),
}

impl RunClock {
    /// Parse an RFC 3339 timestamp; a trailing `Z` is accepted.
    pub fn fixed_from_str(value: &str) -> Result<Self> {
        DateTime::parse_from_rfc3339(value.trim())
            .map(RunClock::Fixed)
            .map_err(|e| {
                RunForgeError::ConfigError(format!("Invalid {} '{}': {}", ENV_FIXED_TIME, value, e))
            })
    }

    pub fn now(&self) -> DateTime<FixedOffset> {
        match self {
            RunClock::System => Utc::now().fixed_offset(),
            RunClock::Fixed(at) => *at,
        }
    }
}

/// ISO 8601 with an explicit `+00:00` style offset
pub fn format_timestamp(at: &DateTime<FixedOffset>) -> String {
    at.to_rfc3339_opts(SecondsFormat::AutoSi, false)
}

/// Settings for a training run
#[derive(Debug, Clone, Default)]
pub struct RunnerSettings {
    pub dataset: Option<PathBuf>,
    pub runforge_dir: Option<PathBuf>,
    pub clock: RunClock,
}

impl RunnerSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read `RUNFORGE_DATASET`, `RUNFORGE_TEST_FIXED_TIME` and `RUNFORGE_DIR`.
    ///
    /// Empty values count as unset.
    pub fn from_env() -> Result<Self> {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());

        let clock = match var(ENV_FIXED_TIME) {
            Some(value) => RunClock::fixed_from_str(&value)?,
            None => RunClock::System,
        };

        Ok(Self {
            dataset: var(ENV_DATASET).map(PathBuf::from),
            runforge_dir: var(ENV_RUNFORGE_DIR).map(PathBuf::from),
            clock,
        })
    }

    pub fn with_dataset(mut self, dataset: impl Into<PathBuf>) -> Self {
        self.dataset = Some(dataset.into());
        self
    }

    pub fn with_runforge_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.runforge_dir = Some(dir.into());
        self
    }

    pub fn with_clock(mut self, clock: RunClock) -> Self {
        self.clock = clock;
        self
    }

    /// The dataset path, or a config error naming the env var
    pub fn require_dataset(&self) -> Result<&PathBuf> {
        self.dataset.as_ref().ok_or_else(|| {
            RunForgeError::ConfigError(format!(
                "{} environment variable not set. Please set it to the path of your CSV file.",
                ENV_DATASET
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock_accepts_z_suffix() {
        let clock = RunClock::fixed_from_str("2024-01-15T10:30:00Z").unwrap();
        assert_eq!(format_timestamp(&clock.now()), "2024-01-15T10:30:00+00:00");
    }

    #[test]
    fn test_fixed_clock_keeps_fraction() {
        let clock = RunClock::fixed_from_str("2024-01-15T10:30:00.123456+00:00").unwrap();
        assert_eq!(format_timestamp(&clock.now()), "2024-01-15T10:30:00.123456+00:00");
    }

    #[test]
    fn test_invalid_fixed_time() {
        assert!(matches!(
            RunClock::fixed_from_str("yesterday"),
            Err(RunForgeError::ConfigError(_))
        ));
    }

    #[test]
    fn test_require_dataset() {
        let settings = RunnerSettings::new();
        assert!(settings.require_dataset().is_err());
        let settings = settings.with_dataset("data.csv");
        assert_eq!(settings.require_dataset().unwrap(), &PathBuf::from("data.csv"));
    }
}
