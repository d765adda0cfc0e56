//! Batch extraction over every entity of an [`ObservationSet`].
//!
//! Entities are independent, so the parallel extractor splits the sorted key
//! list into fixed-size batches and runs each on a blocking worker thread. At
//! most `workers` batches are in flight, and results are collected in
//! submission order, so the produced table never depends on scheduling.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::stream::{self, StreamExt as _};
use household_trends_trend_models::{EntityKey, FeatureTable};

use crate::assemble::{EntityFeatures, IndicatorOutcome, assemble_entity};
use crate::config::ExtractConfig;
use crate::error::ExtractError;
use crate::index::{EntityView, ObservationIndex, ObservationSet};
use crate::progress::{ProgressCallback, null_progress};

/// Number of entities handed to a worker at once.
const DEFAULT_BATCH_SIZE: usize = 64;

/// Shared flag requesting that no further entities be started.
///
/// Entities already being processed run to completion.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Runtime knobs for [`extract_parallel`].
#[derive(Clone)]
pub struct ExtractOptions {
    /// Maximum number of batches processed concurrently.
    pub workers: usize,
    /// Entities per batch.
    pub batch_size: usize,
    pub cancellation: CancellationFlag,
    pub progress: Arc<dyn ProgressCallback>,
}

impl ExtractOptions {
    /// Options using the configured (or available) worker count.
    #[must_use]
    pub fn from_config(config: &ExtractConfig) -> Self {
        Self {
            workers: config.resolved_workers(),
            batch_size: DEFAULT_BATCH_SIZE,
            cancellation: CancellationFlag::new(),
            progress: null_progress(),
        }
    }

    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    #[must_use]
    pub fn with_cancellation(mut self, cancellation: CancellationFlag) -> Self {
        self.cancellation = cancellation;
        self
    }

    #[must_use]
    pub const fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }
}

/// Aggregate counts over every (entity, indicator) pair of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionSummary {
    pub entities: usize,
    /// Selected model count per degree.
    pub selected_by_degree: BTreeMap<usize, usize>,
    /// Pairs where no degree met the threshold.
    pub no_qualifying_model: usize,
    /// Individual degree fits rejected for too few distinct years.
    pub insufficient_fits: usize,
    /// Individual degree fits rejected as numerically unstable.
    pub unstable_fits: usize,
    /// Pairs without a value at the reference year.
    pub missing_reference: usize,
}

impl ExtractionSummary {
    fn record_entity(&mut self, outcomes: &[IndicatorOutcome]) {
        self.entities += 1;
        for outcome in outcomes {
            match outcome.selected_degree {
                Some(degree) => *self.selected_by_degree.entry(degree).or_default() += 1,
                None => self.no_qualifying_model += 1,
            }
            self.insufficient_fits += outcome.insufficient_fits;
            self.unstable_fits += outcome.unstable_fits;
            if outcome.missing_reference {
                self.missing_reference += 1;
            }
        }
    }
}

impl fmt::Display for ExtractionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} entities; selected degrees:", self.entities)?;
        if self.selected_by_degree.is_empty() {
            write!(f, " none")?;
        }
        for (degree, count) in &self.selected_by_degree {
            write!(f, " d{degree}={count}")?;
        }
        write!(
            f,
            "; no qualifying model: {}; insufficient fits: {}; unstable fits: {}; missing reference values: {}",
            self.no_qualifying_model,
            self.insufficient_fits,
            self.unstable_fits,
            self.missing_reference
        )
    }
}

/// A completed run.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub table: FeatureTable,
    pub summary: ExtractionSummary,
}

impl Extraction {
    fn empty(config: &ExtractConfig) -> Self {
        Self {
            table: FeatureTable::new(
                config.indicator_names(),
                config.penultimate_year(),
                config.end_year,
                config.reference_year(),
            ),
            summary: ExtractionSummary::default(),
        }
    }

    fn push(&mut self, features: EntityFeatures) -> Result<(), ExtractError> {
        self.table.insert(features.key, &features.vectors)?;
        self.summary.record_entity(&features.outcomes);
        Ok(())
    }
}

/// Extracts features for every entity on the calling thread.
///
/// # Errors
///
/// * [`ExtractError::Config`] if `config` is invalid.
/// * [`ExtractError::RowWidth`] if an assembled row does not match the table.
pub fn extract(set: &ObservationSet, config: &ExtractConfig) -> Result<Extraction, ExtractError> {
    config.validate()?;

    let index = ObservationIndex::build(set);
    let years = config.years();
    let mut extraction = Extraction::empty(config);

    for key in index.keys() {
        let view = EntityView::new(set, &index, key);
        extraction.push(assemble_entity(key, &view, config, &years))?;
    }

    Ok(extraction)
}

/// Extracts features for every entity on a bounded pool of blocking workers.
///
/// Produces exactly the table [`extract`] would. When the cancellation flag
/// is raised, entities already started finish and the rest are skipped.
///
/// # Errors
///
/// * [`ExtractError::Config`] if `config` is invalid.
/// * [`ExtractError::Cancelled`] if cancellation left entities unprocessed.
/// * [`ExtractError::Worker`] if a worker task panicked.
/// * [`ExtractError::RowWidth`] if an assembled row does not match the table.
pub async fn extract_parallel(
    set: Arc<ObservationSet>,
    config: Arc<ExtractConfig>,
    options: ExtractOptions,
) -> Result<Extraction, ExtractError> {
    config.validate()?;
    let workers = options.workers.max(1);
    let batch_size = options.batch_size.max(1);

    let index = Arc::new(ObservationIndex::build(&set));
    let keys: Vec<EntityKey> = index.keys().cloned().collect();
    let total = keys.len();

    log::info!(
        "Extracting trend features for {total} entities ({} indicators, {workers} workers)",
        config.indicators.len()
    );
    options.progress.set_total(total as u64);

    let years: Arc<[i32]> = config.years().into();
    let tasks = keys.chunks(batch_size).map(|batch| {
        let batch = batch.to_vec();
        let set = Arc::clone(&set);
        let index = Arc::clone(&index);
        let config = Arc::clone(&config);
        let years = Arc::clone(&years);
        let cancellation = options.cancellation.clone();
        let progress = Arc::clone(&options.progress);

        tokio::task::spawn_blocking(move || {
            let mut done = Vec::with_capacity(batch.len());
            for key in &batch {
                if cancellation.is_cancelled() {
                    break;
                }
                let view = EntityView::new(&set, &index, key);
                done.push(assemble_entity(key, &view, &config, &years));
                progress.inc(1);
            }
            done
        })
    });

    let batches: Vec<_> = stream::iter(tasks).buffered(workers).collect().await;

    let mut extraction = Extraction::empty(&config);
    for batch in batches {
        for features in batch? {
            extraction.push(features)?;
        }
    }

    let completed = extraction.table.len();
    if completed < total {
        log::warn!("Extraction cancelled after {completed} of {total} entities");
        options.progress.finish(format!("cancelled at {completed}/{total}"));
        return Err(ExtractError::Cancelled { completed, total });
    }

    options
        .progress
        .finish(format!("Extracted features for {total} entities"));
    log::info!("{}", extraction.summary);

    Ok(extraction)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicU64;

    use household_trends_trend_models::{Entity, Observation};

    use super::*;

    fn observation(name: &str, county: &str, year: i32, indicator: &str, value: f64) -> Observation {
        Observation {
            entity: EntityKey::new(name, "01", county),
            year,
            indicator: indicator.to_string(),
            value,
        }
    }

    /// A mix of linear, curved, sparse, and empty entities.
    fn dataset() -> ObservationSet {
        let mut observations = Vec::new();
        for i in 0..40 {
            let name = format!("County {i:02}");
            let county = format!("{i:03}");
            for year in 2009..=2023 {
                if i % 7 == 3 && year % 3 != 0 {
                    continue;
                }
                let d = f64::from(year - 2009);
                let married = f64::from(i).mul_add(d, 1000.0) - 0.3 * d * d * f64::from(i % 4);
                let unmarried = 400.0 + 25.0 * f64::from((year + i) % 3);
                observations.push(observation(&name, &county, year, "married", married));
                observations.push(observation(&name, &county, year, "unmarried", unmarried));
            }
        }
        observations.push(observation("Lonely County", "900", 2022, "married", 77.0));

        let entities = vec![Entity {
            key: EntityKey::new("Suppressed County", "01", "901"),
            latitude: None,
            longitude: Some(f64::NAN),
        }];
        ObservationSet::new(entities, observations)
    }

    fn bits(table: &FeatureTable) -> Vec<(EntityKey, Vec<u64>)> {
        table
            .iter()
            .map(|(key, row)| (key.clone(), row.iter().map(|v| v.to_bits()).collect()))
            .collect()
    }

    #[test]
    fn one_row_per_entity_with_constant_width() {
        let set = dataset();
        let config = ExtractConfig::default();
        let extraction = extract(&set, &config).unwrap();

        assert_eq!(extraction.table.len(), 42);
        assert_eq!(extraction.summary.entities, 42);
        for (_, row) in extraction.table.iter() {
            assert_eq!(row.len(), 12);
        }

        let lonely = extraction
            .table
            .get(&EntityKey::new("Lonely County", "01", "900"))
            .unwrap();
        assert!(lonely[..5].iter().all(|v| v.is_nan()));
        assert!((lonely[5] - 77.0).abs() < f64::EPSILON);
        assert!(lonely[6..].iter().all(|v| v.is_nan()));

        let suppressed = extraction
            .table
            .get(&EntityKey::new("Suppressed County", "01", "901"))
            .unwrap();
        assert!(suppressed.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn sequential_runs_are_bit_identical() {
        let set = dataset();
        let config = ExtractConfig::default();
        let first = extract(&set, &config).unwrap();
        let second = extract(&set, &config).unwrap();
        assert_eq!(bits(&first.table), bits(&second.table));
        assert_eq!(first.summary, second.summary);
    }

    #[tokio::test]
    async fn parallel_matches_sequential_for_any_worker_count() {
        let set = Arc::new(dataset());
        let config = Arc::new(ExtractConfig::default());
        let expected = extract(&set, &config).unwrap();

        for (workers, batch_size) in [(1, 64), (3, 5), (8, 1)] {
            let options = ExtractOptions::from_config(&config).with_batch_size(batch_size);
            let options = ExtractOptions { workers, ..options };
            let actual = extract_parallel(Arc::clone(&set), Arc::clone(&config), options)
                .await
                .unwrap();
            assert_eq!(bits(&actual.table), bits(&expected.table));
            assert_eq!(actual.summary, expected.summary);
        }
    }

    #[derive(Default)]
    struct RecordingProgress {
        total: AtomicU64,
        done: AtomicU64,
        finished: std::sync::Mutex<Option<String>>,
    }

    impl ProgressCallback for RecordingProgress {
        fn set_total(&self, total: u64) {
            self.total.store(total, Ordering::SeqCst);
        }

        fn inc(&self, delta: u64) {
            self.done.fetch_add(delta, Ordering::SeqCst);
        }

        fn finish(&self, msg: String) {
            *self.finished.lock().unwrap() = Some(msg);
        }
    }

    #[tokio::test]
    async fn progress_reports_every_entity() {
        let progress = Arc::new(RecordingProgress::default());
        let config = Arc::new(ExtractConfig::default());
        let options = ExtractOptions::from_config(&config)
            .with_batch_size(7)
            .with_progress(Arc::clone(&progress) as Arc<dyn ProgressCallback>);

        extract_parallel(Arc::new(dataset()), config, options).await.unwrap();

        assert_eq!(progress.total.load(Ordering::SeqCst), 42);
        assert_eq!(progress.done.load(Ordering::SeqCst), 42);
        assert_eq!(
            progress.finished.lock().unwrap().as_deref(),
            Some("Extracted features for 42 entities")
        );
    }

    #[tokio::test]
    async fn cancelled_before_start_processes_nothing() {
        let set = Arc::new(dataset());
        let config = Arc::new(ExtractConfig::default());
        let cancellation = CancellationFlag::new();
        cancellation.cancel();

        let options = ExtractOptions::from_config(&config).with_cancellation(cancellation);
        let result = extract_parallel(set, config, options).await;
        assert!(matches!(
            result,
            Err(ExtractError::Cancelled {
                completed: 0,
                total: 42
            })
        ));
    }

    #[tokio::test]
    async fn invalid_config_is_rejected_before_work() {
        let config = Arc::new(ExtractConfig {
            max_degree: 0,
            ..ExtractConfig::default()
        });
        let options = ExtractOptions::from_config(&ExtractConfig::default());
        let result = extract_parallel(Arc::new(dataset()), config, options).await;
        assert!(matches!(result, Err(ExtractError::Config(_))));
    }

    #[test]
    fn summary_counts_outcomes() {
        let set = dataset();
        let extraction = extract(&set, &ExtractConfig::default()).unwrap();
        let summary = &extraction.summary;

        let selected: usize = summary.selected_by_degree.values().sum();
        assert_eq!(selected + summary.no_qualifying_model, 42 * 2);
        // Lonely and Suppressed have no usable series for either indicator.
        assert!(summary.no_qualifying_model >= 4);
        // Suppressed has no values at all; Lonely lacks unmarried.
        assert!(summary.missing_reference >= 3);
        assert!(summary.to_string().starts_with("42 entities"));
    }

    #[test]
    fn empty_input_yields_empty_table() {
        let extraction = extract(&ObservationSet::default(), &ExtractConfig::default()).unwrap();
        assert!(extraction.table.is_empty());
        assert_eq!(extraction.table.column_names().len(), 12);
    }
}
