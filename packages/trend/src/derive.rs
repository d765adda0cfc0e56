//! Slope, acceleration, and steadiness features from a selected model.

use household_trends_trend_models::TrendFeatures;
use serde::Serialize;

use crate::fit::FittedModel;
use crate::select::ModelSelection;

/// Analytic slope and acceleration of a model at every year of the range.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendCurve {
    pub years: Vec<i32>,
    pub slopes: Vec<f64>,
    pub accelerations: Vec<f64>,
}

impl TrendCurve {
    /// Evaluates both derivatives of `model` at each of `years`.
    #[must_use]
    pub fn evaluate(model: &FittedModel, years: &[i32]) -> Self {
        Self {
            years: years.to_vec(),
            slopes: years.iter().map(|&y| model.slope_at(f64::from(y))).collect(),
            accelerations: years
                .iter()
                .map(|&y| model.acceleration_at(f64::from(y)))
                .collect(),
        }
    }

    /// `1.0` if every slope is strictly positive or every slope is strictly
    /// negative, else `0.0`.
    #[must_use]
    pub fn steadiness(&self) -> f64 {
        let rising = self.slopes.iter().all(|&s| s > 0.0);
        let falling = self.slopes.iter().all(|&s| s < 0.0);
        if rising || falling { 1.0 } else { 0.0 }
    }
}

/// Derives the five trend descriptors for one entity and indicator.
///
/// `years` is the full configured range in ascending order; slope and
/// acceleration are reported at its last two entries. Returns the all-`NaN`
/// sentinel when no model was selected or the range has fewer than two years.
#[must_use]
pub fn derive_features(selection: ModelSelection<'_>, years: &[i32]) -> TrendFeatures {
    let ModelSelection::Selected(model) = selection else {
        return TrendFeatures::sentinel();
    };
    if years.len() < 2 {
        return TrendFeatures::sentinel();
    }

    let curve = TrendCurve::evaluate(model, years);
    let n = years.len();

    TrendFeatures {
        slope_penultimate: curve.slopes[n - 2],
        slope_last: curve.slopes[n - 1],
        acceleration_penultimate: curve.accelerations[n - 2],
        acceleration_last: curve.accelerations[n - 1],
        steadiness: curve.steadiness(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fit::fit_polynomial;

    fn years() -> Vec<i32> {
        (2009..=2023).collect()
    }

    fn fit(points: &[(i32, f64)], degree: usize) -> FittedModel {
        fit_polynomial(points, degree).unwrap()
    }

    #[test]
    fn linear_trend_is_constant_slope_without_acceleration() {
        let points: Vec<(i32, f64)> = years()
            .into_iter()
            .map(|y| (y, 1000.0 + 93.0 * f64::from(y - 2009)))
            .collect();
        let model = fit(&points, 1);

        let curve = TrendCurve::evaluate(&model, &years());
        for (&slope, &acc) in curve.slopes.iter().zip(&curve.accelerations) {
            assert!((slope - 93.0).abs() < 1e-6);
            assert!(acc.abs() < f64::EPSILON);
        }

        let features = derive_features(ModelSelection::Selected(&model), &years());
        assert!((features.slope_penultimate - 93.0).abs() < 1e-6);
        assert!((features.slope_last - 93.0).abs() < 1e-6);
        assert!(features.acceleration_penultimate.abs() < f64::EPSILON);
        assert!(features.acceleration_last.abs() < f64::EPSILON);
        assert!((features.steadiness - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn declining_trend_is_steady() {
        let points: Vec<(i32, f64)> = years()
            .into_iter()
            .map(|y| (y, 5000.0 - 40.0 * f64::from(y - 2009)))
            .collect();
        let model = fit(&points, 1);
        let features = derive_features(ModelSelection::Selected(&model), &years());
        assert!(features.slope_last < 0.0);
        assert!((features.steadiness - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn interior_sign_change_breaks_steadiness() {
        // Cubic rising early, dipping mid-range, rising again at the end:
        // both boundary slopes are positive, the interior ones are not.
        let points: Vec<(i32, f64)> = years()
            .into_iter()
            .map(|y| {
                let d = f64::from(y - 2016);
                (y, 1000.0 + d * d * d - 20.0 * d)
            })
            .collect();
        let model = fit(&points, 3);
        let features = derive_features(ModelSelection::Selected(&model), &years());

        assert!(features.slope_penultimate > 0.0);
        assert!(features.slope_last > 0.0);
        assert!(features.steadiness.abs() < f64::EPSILON);
    }

    #[test]
    fn rise_then_fall_is_not_steady() {
        let points: Vec<(i32, f64)> = years()
            .into_iter()
            .map(|y| {
                let d = f64::from(y - 2014);
                (y, 900.0 - 3.0 * d * d)
            })
            .collect();
        let model = fit(&points, 2);
        let features = derive_features(ModelSelection::Selected(&model), &years());
        assert!(features.slope_penultimate < 0.0 && features.slope_last < 0.0);
        assert!(features.steadiness.abs() < f64::EPSILON);
        assert!((features.acceleration_last + 6.0).abs() < 1e-6);
    }

    #[test]
    fn flat_trend_is_not_steady() {
        let points: Vec<(i32, f64)> = years().into_iter().map(|y| (y, 10.0)).collect();
        let model = fit(&points, 1);
        let features = derive_features(ModelSelection::Selected(&model), &years());
        assert!(features.steadiness.abs() < f64::EPSILON);
    }

    #[test]
    fn no_model_yields_sentinel() {
        let features = derive_features(ModelSelection::NoQualifyingModel, &years());
        assert!(features.is_sentinel());
    }

    #[test]
    fn boundary_years_come_from_range_not_data() {
        // Data stops in 2015, features are still evaluated at 2022 and 2023.
        let points: Vec<(i32, f64)> = (2009..=2015)
            .map(|y| {
                let d = f64::from(y - 2009);
                (y, 10.0 + d * d)
            })
            .collect();
        let model = fit(&points, 2);
        let features = derive_features(ModelSelection::Selected(&model), &years());
        // slope = 2(y - 2009)
        assert!((features.slope_penultimate - 26.0).abs() < 1e-6);
        assert!((features.slope_last - 28.0).abs() < 1e-6);
        assert!((features.acceleration_last - 2.0).abs() < 1e-6);
    }
}
