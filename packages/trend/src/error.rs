//! Error types for fitting, configuration, and batch extraction.

use household_trends_trend_models::RowWidthError;
use serde::Serialize;

/// Why a polynomial of one degree could not be fitted to a series.
///
/// Both variants mean "this degree does not qualify"; neither aborts the
/// batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FitError {
    /// The series has too few distinct years to constrain the degree.
    #[error(
        "degree {degree} needs at least {required} distinct years, series has {distinct_years}"
    )]
    InsufficientData {
        degree: usize,
        distinct_years: usize,
        required: usize,
    },

    /// The least-squares system was rank deficient or produced non-finite
    /// values.
    #[error("degree {degree} fit is numerically unstable: {reason}")]
    NumericalInstability { degree: usize, reason: String },
}

/// Invalid extraction settings.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// The year range must span at least two years.
    #[error("year range {start}..={end} must span at least two years")]
    InvalidYearRange { start: i32, end: i32 },

    /// The fitness threshold is NaN or infinite.
    #[error("fitness threshold must be finite, got {0}")]
    InvalidThreshold(f64),

    /// Maximum degree is zero or above what the fitter supports.
    #[error("max degree {max_degree} is outside 1..={supported}")]
    UnsupportedDegree { max_degree: usize, supported: usize },

    /// The reference year lies outside the configured range.
    #[error("reference year {reference} is outside {start}..={end}")]
    ReferenceYearOutOfRange { reference: i32, start: i32, end: i32 },

    /// No tracked indicators were configured.
    #[error("at least one indicator must be configured")]
    NoIndicators,

    /// An indicator has an empty name or column.
    #[error("indicator #{0} has an empty name or column")]
    EmptyIndicator(usize),

    /// Two indicators share a name.
    #[error("indicator '{0}' is configured more than once")]
    DuplicateIndicator(String),

    /// The worker pool must have at least one worker.
    #[error("worker count must be at least 1")]
    ZeroWorkers,
}

/// Batch-level extraction failures.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// The configuration failed validation.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Extraction was cancelled before every entity was processed.
    #[error("extraction cancelled after {completed} of {total} entities")]
    Cancelled { completed: usize, total: usize },

    /// A worker task panicked or could not be joined.
    #[error("worker task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),

    /// An assembled feature row did not match the table width.
    #[error(transparent)]
    RowWidth(#[from] RowWidthError),
}
