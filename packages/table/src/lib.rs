#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CSV table I/O for trend extraction.
//!
//! [`reader`] turns the wide yearly table (one row per entity per year,
//! one column per indicator) into an [`ObservationSet`]. [`writer`]
//! renders a [`FeatureTable`] with one row per entity.
//!
//! [`ObservationSet`]: household_trends_trend::ObservationSet
//! [`FeatureTable`]: household_trends_trend_models::FeatureTable

pub mod reader;
pub mod writer;

use serde::{Deserialize, Serialize};

pub use reader::{read_observations, read_observations_path};
pub use writer::{write_feature_table, write_feature_table_path};

/// Errors that can occur while reading or writing tables.
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    /// I/O error opening or flushing a file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing or serialization error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A required column is absent from the input header.
    #[error("Missing required column '{0}'")]
    MissingColumn(String),
}

/// Input column names.
///
/// The defaults match the yearly ACS extract: `NAME`, `state`, `county`,
/// `INTPTLAT`, `INTPTLON`, and `year`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableLayout {
    pub name: String,
    pub state: String,
    pub county: String,
    /// Optional; absent or unparsable cells become `None`.
    pub latitude: String,
    /// Optional; absent or unparsable cells become `None`.
    pub longitude: String,
    pub year: String,
}

impl Default for TableLayout {
    fn default() -> Self {
        Self {
            name: "NAME".to_string(),
            state: "state".to_string(),
            county: "county".to_string(),
            latitude: "INTPTLAT".to_string(),
            longitude: "INTPTLON".to_string(),
            year: "year".to_string(),
        }
    }
}
