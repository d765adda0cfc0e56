#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Trend feature extraction for yearly per-county household counts.
//!
//! For every entity and tracked indicator, polynomials of increasing degree
//! are fitted to the in-range series and the lowest degree whose fitness
//! meets the threshold is kept. Its analytic slope and acceleration at the
//! last two years of the range, a steadiness flag, and the raw value at the
//! reference year form that indicator's [`FeatureVector`].
//!
//! [`extract`] runs on the calling thread; [`extract_parallel`] spreads
//! entities over a bounded pool of blocking workers and produces the same
//! table.
//!
//! [`FeatureVector`]: household_trends_trend_models::FeatureVector

pub mod assemble;
pub mod config;
pub mod derive;
pub mod error;
pub mod extract;
pub mod fit;
pub mod index;
pub mod polynomial;
pub mod progress;
pub mod select;

pub use config::ExtractConfig;
pub use error::{ConfigError, ExtractError, FitError};
pub use extract::{
    CancellationFlag, ExtractOptions, Extraction, ExtractionSummary, extract, extract_parallel,
};
pub use index::{EntityView, ObservationIndex, ObservationSet};
pub use progress::{ProgressCallback, null_progress};
