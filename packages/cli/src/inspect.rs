//! Single-entity diagnostics: every candidate fit, the selected model, and
//! its slope and acceleration across the range.

use std::fmt::Write as _;

use household_trends_trend::assemble::{IndicatorAnalysis, analyze_indicator};
use household_trends_trend::{EntityView, ExtractConfig, ObservationIndex, ObservationSet};
use household_trends_trend_models::{Entity, EntityKey};
use serde::Serialize;

/// Full diagnostics for one entity.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectReport {
    pub entity: Entity,
    pub start_year: i32,
    pub end_year: i32,
    pub fitness_threshold: f64,
    pub reference_year: i32,
    pub indicators: Vec<IndicatorAnalysis>,
}

/// Analyzes `key` under `config`.
///
/// Returns `None` if the entity does not appear in `set`.
#[must_use]
pub fn inspect(
    set: &ObservationSet,
    key: &EntityKey,
    config: &ExtractConfig,
) -> Option<InspectReport> {
    let entity = set.entities().iter().find(|e| &e.key == key)?.clone();

    let index = ObservationIndex::build(set);
    let view = EntityView::new(set, &index, key);
    let years = config.years();

    let indicators = config
        .indicators
        .iter()
        .map(|indicator| analyze_indicator(&view, indicator, config, &years))
        .collect();

    Some(InspectReport {
        entity,
        start_year: config.start_year,
        end_year: config.end_year,
        fitness_threshold: config.fitness_threshold,
        reference_year: config.reference_year(),
        indicators,
    })
}

fn format_coordinate(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

impl InspectReport {
    /// Human-readable rendering for the terminal.
    #[must_use]
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{} (lat {}, lon {})",
            self.entity.key,
            format_coordinate(self.entity.latitude),
            format_coordinate(self.entity.longitude)
        );
        let _ = writeln!(
            out,
            "range {}..={}, threshold {}, reference year {}",
            self.start_year, self.end_year, self.fitness_threshold, self.reference_year
        );

        for analysis in &self.indicators {
            render_indicator(&mut out, analysis, self.reference_year);
        }

        out
    }
}

fn render_indicator(out: &mut String, analysis: &IndicatorAnalysis, reference_year: i32) {
    let _ = writeln!(out);
    let _ = writeln!(out, "{}: {} points", analysis.indicator, analysis.points.len());

    for candidate in &analysis.candidates {
        match candidate {
            Ok(model) => {
                let _ = writeln!(
                    out,
                    "  degree {}: fitness {:.6}, coefficients {:?}",
                    model.degree(),
                    model.fitness(),
                    model.coefficients()
                );
            }
            Err(e) => {
                let _ = writeln!(out, "  {e}");
            }
        }
    }

    match (analysis.selected_degree, &analysis.curve) {
        (Some(degree), Some(curve)) => {
            let _ = writeln!(out, "  selected degree {degree}");
            let _ = writeln!(out, "  {:>6} {:>14} {:>14}", "year", "slope", "acceleration");
            for ((year, slope), acceleration) in
                curve.years.iter().zip(&curve.slopes).zip(&curve.accelerations)
            {
                let _ = writeln!(out, "  {year:>6} {slope:>14.4} {acceleration:>14.4}");
            }
        }
        _ => {
            let _ = writeln!(out, "  no qualifying model");
        }
    }

    let features = &analysis.features;
    let _ = writeln!(
        out,
        "  features: slopes [{}, {}], accelerations [{}, {}], steadiness {}, value in {reference_year} {}",
        features.trend.slope_penultimate,
        features.trend.slope_last,
        features.trend.acceleration_penultimate,
        features.trend.acceleration_last,
        features.trend.steadiness,
        features.reference_value
    );
}
