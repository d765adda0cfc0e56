//! Extraction settings.

use std::collections::BTreeSet;

use household_trends_trend_models::Indicator;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Highest polynomial degree the fitter accepts.
pub const MAX_SUPPORTED_DEGREE: usize = 6;

/// Year range, model-selection, and indicator settings for one extraction
/// run.
///
/// Missing keys in a deserialized config fall back to [`Default`]. Call
/// [`ExtractConfig::validate`] after applying overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// First year of the analysis range (inclusive).
    pub start_year: i32,
    /// Last year of the analysis range (inclusive).
    pub end_year: i32,
    /// Minimum fitness for a degree to be selected.
    pub fitness_threshold: f64,
    /// Highest degree tried; degrees `1..=max_degree` are fitted.
    pub max_degree: usize,
    /// Year whose raw value is reported. Defaults to the second-to-last year
    /// of the range.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_year: Option<i32>,
    /// Worker pool size. Defaults to the available parallelism.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,
    /// Tracked indicators in output order.
    pub indicators: Vec<Indicator>,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            start_year: 2009,
            end_year: 2023,
            fitness_threshold: 0.6,
            max_degree: 3,
            reference_year: None,
            workers: None,
            indicators: vec![
                Indicator::new("married", "B11002_003E"),
                Indicator::new("unmarried", "B11002_012E"),
            ],
        }
    }
}

impl ExtractConfig {
    /// Checks every setting.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.end_year <= self.start_year {
            return Err(ConfigError::InvalidYearRange {
                start: self.start_year,
                end: self.end_year,
            });
        }

        if !self.fitness_threshold.is_finite() {
            return Err(ConfigError::InvalidThreshold(self.fitness_threshold));
        }

        if !(1..=MAX_SUPPORTED_DEGREE).contains(&self.max_degree) {
            return Err(ConfigError::UnsupportedDegree {
                max_degree: self.max_degree,
                supported: MAX_SUPPORTED_DEGREE,
            });
        }

        let reference = self.reference_year();
        if !(self.start_year..=self.end_year).contains(&reference) {
            return Err(ConfigError::ReferenceYearOutOfRange {
                reference,
                start: self.start_year,
                end: self.end_year,
            });
        }

        if self.indicators.is_empty() {
            return Err(ConfigError::NoIndicators);
        }

        let mut seen = BTreeSet::new();
        for (i, indicator) in self.indicators.iter().enumerate() {
            if indicator.name.trim().is_empty() || indicator.column.trim().is_empty() {
                return Err(ConfigError::EmptyIndicator(i));
            }
            if !seen.insert(indicator.name.as_str()) {
                return Err(ConfigError::DuplicateIndicator(indicator.name.clone()));
            }
        }

        if self.workers == Some(0) {
            return Err(ConfigError::ZeroWorkers);
        }

        Ok(())
    }

    /// Every year of the range, ascending.
    #[must_use]
    pub fn years(&self) -> Vec<i32> {
        (self.start_year..=self.end_year).collect()
    }

    #[must_use]
    pub const fn penultimate_year(&self) -> i32 {
        self.end_year - 1
    }

    /// The configured reference year, or the second-to-last year of the
    /// range.
    #[must_use]
    pub fn reference_year(&self) -> i32 {
        self.reference_year.unwrap_or_else(|| self.penultimate_year())
    }

    /// Worker count, falling back to the machine's available parallelism.
    #[must_use]
    pub fn resolved_workers(&self) -> usize {
        self.workers.unwrap_or_else(|| {
            std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
        })
    }

    #[must_use]
    pub fn indicator_names(&self) -> Vec<String> {
        self.indicators.iter().map(|i| i.name.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = ExtractConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.years().len(), 15);
        assert_eq!(config.reference_year(), 2022);
        assert_eq!(config.penultimate_year(), 2022);
        assert_eq!(config.indicator_names(), ["married", "unmarried"]);
    }

    #[test]
    fn explicit_reference_year_wins() {
        let config = ExtractConfig {
            reference_year: Some(2015),
            ..ExtractConfig::default()
        };
        assert_eq!(config.reference_year(), 2015);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn rejects_single_year_range() {
        let config = ExtractConfig {
            start_year: 2020,
            end_year: 2020,
            ..ExtractConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidYearRange {
                start: 2020,
                end: 2020
            })
        );
    }

    #[test]
    fn rejects_non_finite_threshold() {
        let config = ExtractConfig {
            fitness_threshold: f64::NAN,
            ..ExtractConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidThreshold(_))));
    }

    #[test]
    fn rejects_unsupported_degrees() {
        for max_degree in [0, MAX_SUPPORTED_DEGREE + 1] {
            let config = ExtractConfig {
                max_degree,
                ..ExtractConfig::default()
            };
            assert!(matches!(
                config.validate(),
                Err(ConfigError::UnsupportedDegree { .. })
            ));
        }
    }

    #[test]
    fn rejects_reference_year_outside_range() {
        let config = ExtractConfig {
            reference_year: Some(2024),
            ..ExtractConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::ReferenceYearOutOfRange {
                reference: 2024,
                start: 2009,
                end: 2023
            })
        );
    }

    #[test]
    fn rejects_bad_indicators() {
        let empty = ExtractConfig {
            indicators: Vec::new(),
            ..ExtractConfig::default()
        };
        assert_eq!(empty.validate(), Err(ConfigError::NoIndicators));

        let blank = ExtractConfig {
            indicators: vec![Indicator::new("married", " ")],
            ..ExtractConfig::default()
        };
        assert_eq!(blank.validate(), Err(ConfigError::EmptyIndicator(0)));

        let duplicate = ExtractConfig {
            indicators: vec![Indicator::new("a", "X"), Indicator::new("a", "Y")],
            ..ExtractConfig::default()
        };
        assert_eq!(
            duplicate.validate(),
            Err(ConfigError::DuplicateIndicator("a".to_string()))
        );
    }

    #[test]
    fn rejects_zero_workers() {
        let config = ExtractConfig {
            workers: Some(0),
            ..ExtractConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroWorkers));
        assert!(ExtractConfig::default().resolved_workers() >= 1);
    }
}
