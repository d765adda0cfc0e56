#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Entity, observation, and trend feature types.
//!
//! These types describe the yearly per-county counts consumed by the trend
//! extractor and the fixed-width feature rows it produces. They carry no
//! numerical logic of their own.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of features emitted per tracked indicator.
pub const FEATURES_PER_INDICATOR: usize = 6;

/// Composite identity of a geographic reporting unit.
///
/// Field order matters: the derived [`Ord`] sorts by display name, then state
/// code, then county code, which is the order feature rows are emitted in.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityKey {
    /// Display name (e.g. "Autauga County, Alabama").
    pub name: String,
    /// Two-digit state FIPS code.
    pub state: String,
    /// Three-digit county FIPS code.
    pub county: String,
}

impl EntityKey {
    #[must_use]
    pub fn new(name: impl Into<String>, state: impl Into<String>, county: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: state.into(),
            county: county.into(),
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}{}]", self.name, self.state, self.county)
    }
}

/// A geographic unit as it appears in the input table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub key: EntityKey,
    /// Interior point latitude. Passed through, never used for features.
    pub latitude: Option<f64>,
    /// Interior point longitude. Passed through, never used for features.
    pub longitude: Option<f64>,
}

/// One yearly value of one indicator for one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    pub entity: EntityKey,
    pub year: i32,
    /// Tracked indicator name (e.g. `"married"`).
    pub indicator: String,
    /// Non-negative count.
    pub value: f64,
}

/// A tracked indicator and the input column it is read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Indicator {
    /// Name used in output column headers (e.g. `"married"`).
    pub name: String,
    /// Input column holding the yearly value (e.g. `"B11002_003E"`).
    pub column: String,
}

impl Indicator {
    #[must_use]
    pub fn new(name: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column: column.into(),
        }
    }
}

/// The five derivative-based descriptors of one entity's indicator series.
///
/// Every field is `NaN` when no polynomial degree met the fitness threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendFeatures {
    /// Slope at the second-to-last year of the range.
    pub slope_penultimate: f64,
    /// Slope at the last year of the range.
    pub slope_last: f64,
    /// Acceleration at the second-to-last year of the range.
    pub acceleration_penultimate: f64,
    /// Acceleration at the last year of the range.
    pub acceleration_last: f64,
    /// `1.0` if the slope keeps one strict sign over the whole range,
    /// `0.0` if it does not.
    pub steadiness: f64,
}

impl TrendFeatures {
    /// The all-`NaN` vector emitted when no model qualifies.
    #[must_use]
    pub const fn sentinel() -> Self {
        Self {
            slope_penultimate: f64::NAN,
            slope_last: f64::NAN,
            acceleration_penultimate: f64::NAN,
            acceleration_last: f64::NAN,
            steadiness: f64::NAN,
        }
    }

    #[must_use]
    pub const fn is_sentinel(&self) -> bool {
        self.slope_penultimate.is_nan()
            && self.slope_last.is_nan()
            && self.acceleration_penultimate.is_nan()
            && self.acceleration_last.is_nan()
            && self.steadiness.is_nan()
    }
}

/// Trend descriptors plus the raw value observed at the reference year.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureVector {
    pub trend: TrendFeatures,
    /// `NaN` when the entity has no observation at the reference year.
    pub reference_value: f64,
}

impl FeatureVector {
    /// Flattens into output column order.
    #[must_use]
    pub const fn to_array(&self) -> [f64; FEATURES_PER_INDICATOR] {
        [
            self.trend.slope_penultimate,
            self.trend.slope_last,
            self.trend.acceleration_penultimate,
            self.trend.acceleration_last,
            self.trend.steadiness,
            self.reference_value,
        ]
    }
}

/// A feature row did not hold one vector per tracked indicator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("feature row for {key} has {actual} vectors, expected {expected}")]
pub struct RowWidthError {
    pub key: EntityKey,
    pub actual: usize,
    pub expected: usize,
}

/// Per-entity feature rows keyed by the full composite entity key.
///
/// Every row holds exactly [`FeatureTable::row_len`] values: the
/// [`FeatureVector`]s of all tracked indicators concatenated in indicator
/// order.
#[derive(Debug, Clone)]
pub struct FeatureTable {
    indicators: Vec<String>,
    penultimate_year: i32,
    last_year: i32,
    reference_year: i32,
    rows: BTreeMap<EntityKey, Vec<f64>>,
}

impl FeatureTable {
    /// Creates an empty table for the given indicator order and year labels.
    #[must_use]
    pub const fn new(
        indicators: Vec<String>,
        penultimate_year: i32,
        last_year: i32,
        reference_year: i32,
    ) -> Self {
        Self {
            indicators,
            penultimate_year,
            last_year,
            reference_year,
            rows: BTreeMap::new(),
        }
    }

    /// Number of values in every row.
    #[must_use]
    pub fn row_len(&self) -> usize {
        FEATURES_PER_INDICATOR * self.indicators.len()
    }

    #[must_use]
    pub fn indicators(&self) -> &[String] {
        &self.indicators
    }

    #[must_use]
    pub const fn reference_year(&self) -> i32 {
        self.reference_year
    }

    /// Feature column headers, `<indicator>-<feature>` in row order.
    #[must_use]
    pub fn column_names(&self) -> Vec<String> {
        let (prev, last, reference) = (self.penultimate_year, self.last_year, self.reference_year);
        self.indicators
            .iter()
            .flat_map(|indicator| {
                [
                    format!("{indicator}-slope_{prev}"),
                    format!("{indicator}-slope_{last}"),
                    format!("{indicator}-acc_{prev}"),
                    format!("{indicator}-acc_{last}"),
                    format!("{indicator}-steady_slope"),
                    format!("{indicator}-val_{reference}"),
                ]
            })
            .collect()
    }

    /// Inserts the row for `key`, one [`FeatureVector`] per indicator.
    ///
    /// Returns the previous row if the key was already present.
    ///
    /// # Errors
    ///
    /// Returns [`RowWidthError`] and leaves the table unchanged if `vectors`
    /// does not hold exactly one vector per tracked indicator.
    pub fn insert(
        &mut self,
        key: EntityKey,
        vectors: &[FeatureVector],
    ) -> Result<Option<Vec<f64>>, RowWidthError> {
        if vectors.len() != self.indicators.len() {
            return Err(RowWidthError {
                key,
                actual: vectors.len(),
                expected: self.indicators.len(),
            });
        }
        let row: Vec<f64> = vectors.iter().flat_map(FeatureVector::to_array).collect();
        Ok(self.rows.insert(key, row))
    }

    #[must_use]
    pub fn get(&self, key: &EntityKey) -> Option<&[f64]> {
        self.rows.get(key).map(Vec::as_slice)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows in composite-key order.
    pub fn iter(&self) -> impl Iterator<Item = (&EntityKey, &[f64])> {
        self.rows.iter().map(|(key, row)| (key, row.as_slice()))
    }
}
