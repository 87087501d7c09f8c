//! Report Configuration Module
//! Build-time settings: input paths, output paths, figure geometry.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Figure raster size used when the configuration does not say otherwise.
pub const DEFAULT_FIGURE_WIDTH: u32 = 1600;
pub const DEFAULT_FIGURE_HEIGHT: u32 = 900;

/// Countries labeled by name on the economic scatter panels.
pub const DEFAULT_HIGHLIGHTS: [&str; 5] = ["Cuba", "Uruguay", "Burundi", "Swaziland", "Sudan"];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Settings for one report build.
///
/// Deserialized from an optional JSON file; every field falls back to the
/// compiled-in default, so a partial file is fine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Primary nutrition table (country, sex, time_period, obs_value).
    pub nutrition_path: PathBuf,
    /// Optional second nutrition table with the same schema.
    pub extra_nutrition_path: Option<PathBuf>,
    /// Country metadata table (country, year, GDP, life expectancy).
    pub metadata_path: PathBuf,
    /// World map polygon reference (long, lat, group, order, region).
    pub world_map_path: PathBuf,
    /// Path of the generated report document.
    pub output_path: PathBuf,
    /// When set, each figure is also written here as a standalone PNG.
    pub figures_dir: Option<PathBuf>,
    /// Title shown on the first slide of the report.
    pub report_title: String,
    pub figure_width: u32,
    pub figure_height: u32,
    /// Countries labeled on the economic scatter panels.
    pub highlight_countries: Vec<String>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            nutrition_path: PathBuf::from("data/dairy_consumption.csv"),
            extra_nutrition_path: Some(PathBuf::from("data/dairy_consumption_extra.csv")),
            metadata_path: PathBuf::from("data/country_indicators.csv"),
            world_map_path: PathBuf::from("data/world_map.csv"),
            output_path: PathBuf::from("dairy_report.pptx"),
            figures_dir: None,
            report_title: "Child Dairy Consumption Analysis".to_string(),
            figure_width: DEFAULT_FIGURE_WIDTH,
            figure_height: DEFAULT_FIGURE_HEIGHT,
            highlight_countries: DEFAULT_HIGHLIGHTS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ReportConfig {
    /// Load settings from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Relocate every input table into `dir`, keeping the file names.
    pub fn rebase_inputs(&mut self, dir: &Path) {
        let rebase = |path: &mut PathBuf| {
            if let Some(name) = path.file_name() {
                *path = dir.join(name);
            }
        };
        rebase(&mut self.nutrition_path);
        if let Some(extra) = self.extra_nutrition_path.as_mut() {
            rebase(extra);
        }
        rebase(&mut self.metadata_path);
        rebase(&mut self.world_map_path);
    }
}
