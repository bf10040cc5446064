//! Dashboard defaults read from a JSON file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::data::filter::{FilterState, WorkingDayFilter, YearFilter};
use crate::data::model::Season;
use crate::error::ConfigError;

/// How a report is written to stdout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Defaults for the CLI.  Every field is optional; command-line flags win.
///
/// ```json
/// { "data_path": "train.csv", "year": 2012, "working_day": 1,
///   "seasons": ["Summer", "Fall"], "format": "json" }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Data file used when none is given on the command line.
    pub data_path: Option<PathBuf>,

    /// Default year; `None` means all years.
    pub year: Option<i32>,

    /// Default working-day flag (0 or 1); `None` means both.
    pub working_day: Option<u8>,

    /// Default season selection; `None` means all four.
    pub seasons: Option<Vec<Season>>,

    pub format: OutputFormat,
}

impl DashboardConfig {
    /// Load configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: DashboardConfig =
            serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.filter_state()?;
        Ok(config)
    }

    /// The initial filter selection described by this config.
    pub fn filter_state(&self) -> Result<FilterState, ConfigError> {
        let year = self.year.map_or(YearFilter::All, YearFilter::Year);
        let working_day = match self.working_day {
            None => WorkingDayFilter::All,
            Some(flag) => WorkingDayFilter::from_flag(flag).ok_or(ConfigError::WorkingDay(flag))?,
        };
        let seasons = match &self.seasons {
            None => Season::all(),
            Some(list) => list.iter().copied().collect(),
        };
        Ok(FilterState {
            year,
            working_day,
            seasons,
        })
    }
}
