//! TOML pipeline configuration: embedded defaults, optional file, and
//! command-line overrides.

use std::path::{Path, PathBuf};

use household_trends_table::TableLayout;
use household_trends_trend::{ConfigError, ExtractConfig};
use serde::{Deserialize, Serialize};

const DEFAULT_CONFIG_TOML: &str = include_str!("../config/default.toml");

/// Errors from loading or rendering the configuration.
#[derive(Debug, thiserror::Error)]
pub enum PipelineConfigError {
    /// The config file could not be read.
    #[error("Failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The config file is not valid TOML for [`PipelineConfig`].
    #[error("Failed to parse config {origin}: {source}")]
    Parse {
        origin: String,
        source: toml::de::Error,
    },

    /// The effective configuration could not be rendered.
    #[error("Failed to render config: {0}")]
    Render(#[from] toml::ser::Error),

    #[error(transparent)]
    Invalid(#[from] ConfigError),
}

/// Everything the binary needs to run an extraction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub extract: ExtractConfig,
    pub layout: TableLayout,
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Copy, Default)]
pub struct Overrides {
    pub start_year: Option<i32>,
    pub end_year: Option<i32>,
    pub threshold: Option<f64>,
    pub max_degree: Option<usize>,
    pub reference_year: Option<i32>,
    pub workers: Option<usize>,
}

impl PipelineConfig {
    fn parse(toml_str: &str, origin: &str) -> Result<Self, PipelineConfigError> {
        toml::from_str(toml_str).map_err(|source| PipelineConfigError::Parse {
            origin: origin.to_string(),
            source,
        })
    }

    /// The configuration embedded in the binary.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineConfigError::Parse`] if the embedded file is
    /// malformed.
    pub fn embedded() -> Result<Self, PipelineConfigError> {
        Self::parse(DEFAULT_CONFIG_TOML, "(embedded default)")
    }

    /// Loads `path` if given, otherwise the embedded defaults.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineConfigError::Io`] or [`PipelineConfigError::Parse`]
    /// if the file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, PipelineConfigError> {
        let Some(path) = path else {
            return Self::embedded();
        };

        log::debug!("Loading config from {}", path.display());
        let contents =
            std::fs::read_to_string(path).map_err(|source| PipelineConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        Self::parse(&contents, &path.display().to_string())
    }

    /// Applies command-line overrides, then validates the result.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineConfigError::Invalid`] if the effective
    /// configuration is invalid.
    pub fn with_overrides(mut self, overrides: Overrides) -> Result<Self, PipelineConfigError> {
        let extract = &mut self.extract;
        if let Some(start_year) = overrides.start_year {
            extract.start_year = start_year;
        }
        if let Some(end_year) = overrides.end_year {
            extract.end_year = end_year;
        }
        if let Some(threshold) = overrides.threshold {
            extract.fitness_threshold = threshold;
        }
        if let Some(max_degree) = overrides.max_degree {
            extract.max_degree = max_degree;
        }
        if overrides.reference_year.is_some() {
            extract.reference_year = overrides.reference_year;
        }
        if overrides.workers.is_some() {
            extract.workers = overrides.workers;
        }

        extract.validate()?;
        Ok(self)
    }

    /// Renders the configuration as TOML.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineConfigError::Render`] if serialization fails.
    pub fn to_toml(&self) -> Result<String, PipelineConfigError> {
        Ok(toml::to_string(self)?)
    }
}
