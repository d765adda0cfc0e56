//! Per-entity feature assembly: fit, select, derive, and attach the raw
//! reference-year value for every tracked indicator.

use household_trends_trend_models::{EntityKey, FeatureVector, Indicator};
use serde::Serialize;

use crate::config::ExtractConfig;
use crate::derive::{TrendCurve, derive_features};
use crate::error::FitError;
use crate::fit::FittedModel;
use crate::index::EntityView;
use crate::select::{best_fitness, fit_candidates, select_model};

/// Everything computed for one entity and one indicator.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorAnalysis {
    pub indicator: String,
    /// In-range points the fits were computed from.
    pub points: Vec<(i32, f64)>,
    /// Fit results for degrees `1..=max_degree`, ascending.
    pub candidates: Vec<Result<FittedModel, FitError>>,
    /// Degree of the selected model, if any qualified.
    pub selected_degree: Option<usize>,
    /// Slope and acceleration over the full range for the selected model.
    pub curve: Option<TrendCurve>,
    pub features: FeatureVector,
}

impl IndicatorAnalysis {
    /// Condenses the analysis into its bookkeeping outcome.
    #[must_use]
    pub fn outcome(&self) -> IndicatorOutcome {
        IndicatorOutcome {
            selected_degree: self.selected_degree,
            best_fitness: best_fitness(&self.candidates),
            insufficient_fits: self
                .candidates
                .iter()
                .filter(|c| matches!(c, Err(FitError::InsufficientData { .. })))
                .count(),
            unstable_fits: self
                .candidates
                .iter()
                .filter(|c| matches!(c, Err(FitError::NumericalInstability { .. })))
                .count(),
            missing_reference: self.features.reference_value.is_nan(),
        }
    }
}

/// How one entity's indicator fared, for run summaries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorOutcome {
    /// `None` means no degree met the threshold.
    pub selected_degree: Option<usize>,
    pub best_fitness: Option<f64>,
    /// Degrees rejected for too few distinct years.
    pub insufficient_fits: usize,
    /// Degrees rejected as numerically unstable.
    pub unstable_fits: usize,
    /// No observation at the reference year.
    pub missing_reference: bool,
}

/// One entity's feature vectors, in indicator order, with their outcomes.
#[derive(Debug, Clone)]
pub struct EntityFeatures {
    pub key: EntityKey,
    pub vectors: Vec<FeatureVector>,
    pub outcomes: Vec<IndicatorOutcome>,
}

/// Runs fitter, selector, and deriver for one indicator of one entity.
///
/// Only observations inside the configured year range are fitted. The
/// reference value is looked up independently of whether a model qualified.
#[must_use]
pub fn analyze_indicator(
    view: &EntityView<'_>,
    indicator: &Indicator,
    config: &ExtractConfig,
    years: &[i32],
) -> IndicatorAnalysis {
    let points = view.series(&indicator.name, config.start_year, config.end_year);
    let candidates = fit_candidates(&points, config.max_degree);

    let selection = select_model(&candidates, config.fitness_threshold);
    let trend = derive_features(selection, years);
    let selected_degree = selection.model().map(FittedModel::degree);
    let curve = selection.model().map(|model| TrendCurve::evaluate(model, years));

    let reference_value = view
        .value_at(&indicator.name, config.reference_year())
        .unwrap_or(f64::NAN);

    IndicatorAnalysis {
        indicator: indicator.name.clone(),
        points,
        candidates,
        selected_degree,
        curve,
        features: FeatureVector {
            trend,
            reference_value,
        },
    }
}

/// Builds the full feature row for one entity.
///
/// Never fails: degenerate series produce the `NaN` sentinel for their
/// indicator only, and the row always holds one vector per indicator.
#[must_use]
pub fn assemble_entity(
    key: &EntityKey,
    view: &EntityView<'_>,
    config: &ExtractConfig,
    years: &[i32],
) -> EntityFeatures {
    let mut vectors = Vec::with_capacity(config.indicators.len());
    let mut outcomes = Vec::with_capacity(config.indicators.len());

    for indicator in &config.indicators {
        let analysis = analyze_indicator(view, indicator, config, years);
        let outcome = analysis.outcome();
        log_outcome(key, &analysis, &outcome);
        vectors.push(analysis.features);
        outcomes.push(outcome);
    }

    EntityFeatures {
        key: key.clone(),
        vectors,
        outcomes,
    }
}

fn log_outcome(key: &EntityKey, analysis: &IndicatorAnalysis, outcome: &IndicatorOutcome) {
    match outcome.selected_degree {
        Some(degree) => log::debug!(
            "{key}: {} degree {degree} selected from {} points",
            analysis.indicator,
            analysis.points.len()
        ),
        None => log::debug!(
            "{key}: {} has no qualifying model ({} points, best fitness {:?})",
            analysis.indicator,
            analysis.points.len(),
            outcome.best_fitness
        ),
    }
    if outcome.missing_reference {
        log::debug!("{key}: {} has no reference-year value", analysis.indicator);
    }
}
