//! Smallest-adequate-degree model selection.

use crate::error::FitError;
use crate::fit::{FittedModel, fit_polynomial};

/// Outcome of choosing among candidate fits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ModelSelection<'a> {
    /// The lowest-degree model meeting the fitness threshold.
    Selected(&'a FittedModel),
    /// No candidate met the threshold.
    NoQualifyingModel,
}

impl<'a> ModelSelection<'a> {
    #[must_use]
    pub const fn model(&self) -> Option<&'a FittedModel> {
        match self {
            Self::Selected(model) => Some(model),
            Self::NoQualifyingModel => None,
        }
    }
}

/// Fits degrees `1..=max_degree` in ascending order.
///
/// Entry `i` holds the result for degree `i + 1`.
#[must_use]
pub fn fit_candidates(
    points: &[(i32, f64)],
    max_degree: usize,
) -> Vec<Result<FittedModel, FitError>> {
    (1..=max_degree)
        .map(|degree| fit_polynomial(points, degree))
        .collect()
}

/// Picks the first candidate whose fitness is at least `threshold`.
///
/// Candidates are scanned in the order given, which must be ascending degree;
/// a lower degree therefore wins even when a higher one fits better. Failed
/// fits never qualify, nor does a `NaN` fitness.
#[must_use]
pub fn select_model(
    candidates: &[Result<FittedModel, FitError>],
    threshold: f64,
) -> ModelSelection<'_> {
    debug_assert!(
        candidates
            .iter()
            .filter_map(|c| c.as_ref().ok())
            .map(FittedModel::degree)
            .is_sorted_by(|a, b| a < b),
        "candidate fits must be in ascending degree order"
    );

    candidates
        .iter()
        .filter_map(|candidate| candidate.as_ref().ok())
        .find(|model| model.fitness() >= threshold)
        .map_or(ModelSelection::NoQualifyingModel, ModelSelection::Selected)
}

/// Highest fitness among successful candidates, if any succeeded.
#[must_use]
pub fn best_fitness(candidates: &[Result<FittedModel, FitError>]) -> Option<f64> {
    candidates
        .iter()
        .filter_map(|c| c.as_ref().ok())
        .map(FittedModel::fitness)
        .filter(|f| !f.is_nan())
        .reduce(f64::max)
}
