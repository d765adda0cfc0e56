//! Wide yearly table reader.

use std::collections::BTreeSet;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;
use household_trends_trend::ObservationSet;
use household_trends_trend_models::{Entity, EntityKey, Indicator, Observation};

use crate::{TableError, TableLayout};

/// Header positions of every column the reader uses.
struct Columns {
    name: usize,
    state: usize,
    county: usize,
    year: usize,
    latitude: Option<usize>,
    longitude: Option<usize>,
    indicators: Vec<usize>,
}

impl Columns {
    fn locate(
        headers: &StringRecord,
        layout: &TableLayout,
        indicators: &[Indicator],
    ) -> Result<Self, TableError> {
        let find = |column: &str| headers.iter().position(|h| h == column);
        let require = |column: &str| {
            find(column).ok_or_else(|| TableError::MissingColumn(column.to_string()))
        };

        Ok(Self {
            name: require(&layout.name)?,
            state: require(&layout.state)?,
            county: require(&layout.county)?,
            year: require(&layout.year)?,
            latitude: find(&layout.latitude),
            longitude: find(&layout.longitude),
            indicators: indicators
                .iter()
                .map(|indicator| require(&indicator.column))
                .collect::<Result<_, _>>()?,
        })
    }
}

#[derive(Debug, Default)]
struct ReadStats {
    rows: usize,
    malformed: usize,
    duplicates: usize,
    missing_cells: usize,
}

/// Parses a cell as an observed count. Empty, non-numeric, non-finite, and
/// negative (suppressed) values are missing.
fn parse_count(cell: &str) -> Option<f64> {
    cell.parse::<f64>()
        .ok()
        .filter(|value| value.is_finite() && *value >= 0.0)
}

fn parse_coordinate(record: &StringRecord, column: Option<usize>) -> Option<f64> {
    column
        .and_then(|i| record.get(i))
        .and_then(|cell| cell.parse::<f64>().ok())
        .filter(|value| value.is_finite())
}

/// Reads a wide observation table from any reader.
///
/// Each row is one entity in one year; each indicator's value is read from
/// its configured column. Every entity appearing in the input is kept, even
/// when all of its indicator cells are missing.
///
/// # Errors
///
/// * [`TableError::MissingColumn`] if a key, year, or indicator column is
///   absent from the header.
/// * [`TableError::Csv`] if the input is not valid CSV.
pub fn read_observations<R: Read>(
    reader: R,
    layout: &TableLayout,
    indicators: &[Indicator],
) -> Result<ObservationSet, TableError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let columns = Columns::locate(csv_reader.headers()?, layout, indicators)?;

    let mut stats = ReadStats::default();
    let mut entities = Vec::new();
    let mut seen_entities = BTreeSet::new();
    let mut seen_rows = BTreeSet::new();
    let mut observations = Vec::new();

    for result in csv_reader.records() {
        let record = result?;
        stats.rows += 1;
        let line = record.position().map_or(0, csv::Position::line);

        let (Some(name), Some(state), Some(county)) = (
            record.get(columns.name),
            record.get(columns.state),
            record.get(columns.county),
        ) else {
            log::warn!("Skipping line {line}: missing entity key fields");
            stats.malformed += 1;
            continue;
        };

        let year_cell = record.get(columns.year).unwrap_or_default();
        let Ok(year) = year_cell.parse::<i32>() else {
            log::warn!("Skipping line {line}: unparsable year '{year_cell}'");
            stats.malformed += 1;
            continue;
        };

        let key = EntityKey::new(name, state, county);

        if !seen_rows.insert((key.clone(), year)) {
            log::warn!("Skipping line {line}: duplicate row for {key} in {year}");
            stats.duplicates += 1;
            continue;
        }

        if seen_entities.insert(key.clone()) {
            entities.push(Entity {
                key: key.clone(),
                latitude: parse_coordinate(&record, columns.latitude),
                longitude: parse_coordinate(&record, columns.longitude),
            });
        }

        for (indicator, &column) in indicators.iter().zip(&columns.indicators) {
            let cell = record.get(column).unwrap_or_default();
            match parse_count(cell) {
                Some(value) => observations.push(Observation {
                    entity: key.clone(),
                    year,
                    indicator: indicator.name.clone(),
                    value,
                }),
                None => {
                    log::debug!("{key}: {} missing in {year} ('{cell}')", indicator.name);
                    stats.missing_cells += 1;
                }
            }
        }
    }

    log::info!(
        "Read {} rows: {} entities, {} observations ({} malformed rows, {} duplicates, {} missing cells)",
        stats.rows,
        entities.len(),
        observations.len(),
        stats.malformed,
        stats.duplicates,
        stats.missing_cells
    );

    Ok(ObservationSet::new(entities, observations))
}

/// Reads a wide observation table from a file.
///
/// # Errors
///
/// * [`TableError::Io`] if the file cannot be opened.
/// * Any error from [`read_observations`].
pub fn read_observations_path(
    path: &Path,
    layout: &TableLayout,
    indicators: &[Indicator],
) -> Result<ObservationSet, TableError> {
    log::info!("Reading observations from {}", path.display());
    let file = std::fs::File::open(path)?;
    read_observations(file, layout, indicators)
}
