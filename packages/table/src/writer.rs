//! Feature table writer.

use std::io::Write;
use std::path::Path;

use household_trends_trend_models::FeatureTable;

use crate::{TableError, TableLayout};

/// Renders one feature value. Missing values use the `NaN` token; finite
/// values use the shortest representation that round-trips.
fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else {
        value.to_string()
    }
}

/// Quotes a text field, doubling embedded quotes.
fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

/// Writes `table` as CSV, one row per entity in composite-key order.
///
/// The header starts with the layout's name, state, and county columns,
/// followed by [`FeatureTable::column_names`]. Header names and the three key
/// fields are always quoted, so codes such as `01` keep their leading zeros
/// in readers that infer numeric columns. Feature values are never quoted.
///
/// # Errors
///
/// Returns [`TableError::Csv`] or [`TableError::Io`] if writing fails.
pub fn write_feature_table<W: Write>(
    writer: W,
    table: &FeatureTable,
    layout: &TableLayout,
) -> Result<(), TableError> {
    let mut csv_writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Never)
        .from_writer(writer);

    let mut header = vec![quote(&layout.name), quote(&layout.state), quote(&layout.county)];
    header.extend(table.column_names().iter().map(|name| quote(name)));
    csv_writer.write_record(&header)?;

    for (key, row) in table.iter() {
        let mut record = Vec::with_capacity(3 + row.len());
        record.push(quote(&key.name));
        record.push(quote(&key.state));
        record.push(quote(&key.county));
        record.extend(row.iter().copied().map(format_value));
        csv_writer.write_record(&record)?;
    }

    csv_writer.flush()?;
    Ok(())
}

/// Writes `table` to a file, replacing any existing file.
///
/// # Errors
///
/// * [`TableError::Io`] if the file cannot be created.
/// * Any error from [`write_feature_table`].
pub fn write_feature_table_path(
    path: &Path,
    table: &FeatureTable,
    layout: &TableLayout,
) -> Result<(), TableError> {
    let file = std::fs::File::create(path)?;
    write_feature_table(file, table, layout)?;
    log::info!("Wrote {} feature rows to {}", table.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use household_trends_trend_models::{EntityKey, FeatureVector, TrendFeatures};

    use super::*;

    fn table() -> FeatureTable {
        let mut table = FeatureTable::new(vec!["married".to_string()], 2022, 2023, 2022);
        table.insert(
            EntityKey::new("Autauga County, Alabama", "01", "001"),
            &[FeatureVector {
                trend: TrendFeatures {
                    slope_penultimate: 93.0,
                    slope_last: 93.5,
                    acceleration_penultimate: 0.0,
                    acceleration_last: -0.25,
                    steadiness: 1.0,
                },
                reference_value: 2209.0,
            }],
        )
        .unwrap();
        table.insert(
            EntityKey::new("Baldwin County, Alabama", "01", "003"),
            &[FeatureVector {
                trend: TrendFeatures::sentinel(),
                reference_value: f64::NAN,
            }],
        )
        .unwrap();
        table
    }

    fn render(table: &FeatureTable, layout: &TableLayout) -> String {
        let mut out = Vec::new();
        write_feature_table(&mut out, table, layout).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn header_and_rows() {
        let csv = render(&table(), &TableLayout::default());
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(
            lines[0],
            "\"NAME\",\"state\",\"county\",\"married-slope_2022\",\"married-slope_2023\",\
             \"married-acc_2022\",\"married-acc_2023\",\"married-steady_slope\",\"married-val_2022\""
        );
        assert_eq!(
            lines[1],
            "\"Autauga County, Alabama\",\"01\",\"001\",93,93.5,0,-0.25,1,2209"
        );
        assert_eq!(
            lines[2],
            "\"Baldwin County, Alabama\",\"01\",\"003\",NaN,NaN,NaN,NaN,NaN,NaN"
        );
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn key_columns_follow_layout() {
        let layout = TableLayout {
            name: "label".to_string(),
            ..TableLayout::default()
        };
        let csv = render(&table(), &layout);
        assert!(csv.starts_with("\"label\",\"state\",\"county\","));
    }

    #[test]
    fn values_round_trip_exactly() {
        let value = 0.1 + 0.2;
        let mut table = FeatureTable::new(vec!["x".to_string()], 2022, 2023, 2022);
        table.insert(
            EntityKey::new("A", "01", "001"),
            &[FeatureVector {
                trend: TrendFeatures {
                    slope_penultimate: value,
                    ..TrendFeatures::sentinel()
                },
                reference_value: 1.0,
            }],
        )
        .unwrap();
        let csv = render(&table, &TableLayout::default());
        let row = csv.lines().nth(1).unwrap();
        let slope: f64 = row.split(',').nth(3).unwrap().parse().unwrap();
        assert_eq!(slope.to_bits(), value.to_bits());
    }

    #[test]
    fn key_fields_keep_leading_zeros_and_escape_quotes() {
        let mut table = FeatureTable::new(vec!["x".to_string()], 2022, 2023, 2022);
        table
            .insert(
                EntityKey::new("The \"Gem\" County", "06", "007"),
                &[FeatureVector {
                    trend: TrendFeatures::sentinel(),
                    reference_value: 12.0,
                }],
            )
            .unwrap();

        let csv = render(&table, &TableLayout::default());
        let row = csv.lines().nth(1).unwrap();
        assert_eq!(row, "\"The \"\"Gem\"\" County\",\"06\",\"007\",NaN,NaN,NaN,NaN,NaN,12");

        let mut reader = csv::Reader::from_reader(csv.as_bytes());
        let record = reader.records().next().unwrap().unwrap();
        assert_eq!(&record[0], "The \"Gem\" County");
        assert_eq!(&record[1], "06");
        assert_eq!(&record[2], "007");
    }

    #[test]
    fn empty_table_has_header_only() {
        let table = FeatureTable::new(vec!["a".to_string(), "b".to_string()], 2022, 2023, 2015);
        let csv = render(&table, &TableLayout::default());
        assert_eq!(csv.lines().count(), 1);
        assert!(csv.contains("\"b-val_2015\""));
    }
}
