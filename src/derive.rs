use anyhow::{anyhow, Result};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::columns;
use crate::data::{RecordSet, Value};

/// The record set after derivation, plus the per-species summary table
#[derive(Debug, Clone)]
pub struct Derived {
    pub records: RecordSet,
    pub species_means: Option<RecordSet>,
    /// Columns as loaded, before any derived column was added
    pub source_headers: Vec<String>,
}

/// Run every derivation. The input is left untouched; derivations whose
/// inputs are absent contribute nothing.
pub fn derive(records: &RecordSet) -> Derived {
    let mut derived = records.clone();

    match encode_success(records) {
        Some(encoded) => match records.with_column(columns::MIGRATION_SUCCESS_ENCODED, encoded) {
            Ok(next) => derived = next,
            Err(e) => warn!(error = %e, "success encoding not applied"),
        },
        None => debug!(
            column = columns::MIGRATION_SUCCESS,
            "source column absent, skipping success encoding"
        ),
    }

    let species_means = match species_group_means(
        records,
        columns::SPECIES,
        &[columns::AVERAGE_SPEED, columns::FLIGHT_DISTANCE],
    ) {
        Ok(Some(table)) => {
            debug!(groups = table.len(), "computed species group means");
            Some(table)
        }
        Ok(None) => {
            debug!("species group means skipped, input columns absent");
            None
        }
        Err(e) => {
            warn!(error = %e, "species group means failed");
            None
        }
    };

    Derived {
        records: derived,
        species_means,
        source_headers: records.headers.clone(),
    }
}

/// Encode `Migration_Success` as numbers. `None` when the column is absent.
pub fn encode_success(records: &RecordSet) -> Option<Vec<Value>> {
    let column = records.column(columns::MIGRATION_SUCCESS).ok()?;
    Some(column.into_iter().map(encode_success_value).collect())
}

/// "Successful" → 1, "Failed" → 0, anything else → missing
pub fn encode_success_value(value: &Value) -> Value {
    match value {
        Value::Text(s) if s == "Successful" => Value::Number(1.0),
        Value::Text(s) if s == "Failed" => Value::Number(0.0),
        _ => Value::Missing,
    }
}

/// Group rows by `group_col` and average each of `value_cols` per group.
///
/// Returns one row per distinct group value, sorted by group label. Missing
/// cells are left out of a group's mean and rows with a missing group value
/// are dropped. `Ok(None)` when any input column is absent; a value column
/// holding text is an error.
pub fn species_group_means(
    records: &RecordSet,
    group_col: &str,
    value_cols: &[&str],
) -> Result<Option<RecordSet>> {
    if !records.missing_columns(&[group_col]).is_empty()
        || !records.missing_columns(value_cols).is_empty()
    {
        return Ok(None);
    }

    let groups = records.labels(group_col)?;
    let values = value_cols
        .iter()
        .map(|c| records.numeric(c))
        .collect::<Result<Vec<_>>>()?;

    // group -> per value column (sum, count)
    let mut sums: BTreeMap<String, Vec<(f64, usize)>> = BTreeMap::new();
    for (row_idx, group) in groups.into_iter().enumerate() {
        let Some(group) = group else { continue };
        let entry = sums
            .entry(group)
            .or_insert_with(|| vec![(0.0, 0); value_cols.len()]);
        for (col_idx, column) in values.iter().enumerate() {
            if let Some(v) = column[row_idx] {
                entry[col_idx].0 += v;
                entry[col_idx].1 += 1;
            }
        }
    }

    let group_header = records
        .column_index(group_col)
        .map(|i| records.headers[i].clone())
        .ok_or_else(|| anyhow!("Column '{}' not found", group_col))?;
    let mut headers = vec![group_header];
    headers.extend(value_cols.iter().map(|c| c.to_string()));

    let rows = sums
        .into_iter()
        .map(|(group, acc)| {
            let mut row = vec![Value::Text(group)];
            row.extend(acc.into_iter().map(|(sum, count)| {
                if count == 0 {
                    Value::Missing
                } else {
                    Value::Number(sum / count as f64)
                }
            }));
            row
        })
        .collect();

    Ok(Some(RecordSet::new(headers, rows)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn text(s: &str) -> Value {
        Value::Text(s.to_string())
    }

    fn records(headers: &[&str], rows: Vec<Vec<Value>>) -> RecordSet {
        RecordSet::new(headers.iter().map(|h| h.to_string()).collect(), rows)
    }

    #[test]
    fn test_encode_success_value() {
        assert_eq!(encode_success_value(&text("Successful")), Value::Number(1.0));
        assert_eq!(encode_success_value(&text("Failed")), Value::Number(0.0));
        assert_eq!(encode_success_value(&text("Unknown")), Value::Missing);
        assert_eq!(encode_success_value(&text("successful")), Value::Missing);
        assert_eq!(encode_success_value(&Value::Number(1.0)), Value::Missing);
        assert_eq!(encode_success_value(&Value::Missing), Value::Missing);
    }

    #[test]
    fn test_encode_success_absent_column() {
        let data = records(&["Species"], vec![vec![text("Stork")]]);
        assert!(encode_success(&data).is_none());
        let derived = derive(&data);
        assert!(!derived.records.has_column(columns::MIGRATION_SUCCESS_ENCODED));
    }

    #[test]
    fn test_derive_appends_encoded_column_only() {
        let data = records(
            &["Migration_Success"],
            vec![vec![text("Successful")], vec![text("Failed")], vec![text("Unknown")]],
        );
        let derived = derive(&data);
        assert_eq!(data.headers.len(), 1);
        assert_eq!(
            derived.records.numeric(columns::MIGRATION_SUCCESS_ENCODED).unwrap(),
            vec![Some(1.0), Some(0.0), None]
        );
        assert!(derived.species_means.is_none());
    }

    #[test]
    fn test_species_group_means_three_species() {
        let species = ["Stork", "Crane", "Swan"];
        let rows: Vec<Vec<Value>> = (0..100)
            .map(|i| {
                vec![
                    text(species[i % 3]),
                    Value::Number(i as f64),
                    Value::Number(2.0 * i as f64),
                ]
            })
            .collect();
        let data = records(&["Species", "Average_Speed_kmph", "Flight_Distance_km"], rows);

        let table = species_group_means(
            &data,
            "Species",
            &["Average_Speed_kmph", "Flight_Distance_km"],
        )
        .unwrap()
        .unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(
            table.labels("Species").unwrap(),
            vec![Some("Crane".to_string()), Some("Stork".to_string()), Some("Swan".to_string())]
        );

        // Stork rows are i = 0, 3, ..., 99 (34 rows)
        let stork: Vec<f64> = (0..100).filter(|i| i % 3 == 0).map(|i| i as f64).collect();
        let expected = stork.iter().sum::<f64>() / stork.len() as f64;
        let speeds = table.numeric("Average_Speed_kmph").unwrap();
        let distances = table.numeric("Flight_Distance_km").unwrap();
        assert!((speeds[1].unwrap() - expected).abs() < 1e-9);
        assert!((distances[1].unwrap() - 2.0 * expected).abs() < 1e-9);
    }

    #[test]
    fn test_species_group_means_skips_missing() {
        let data = records(
            &["Species", "Average_Speed_kmph"],
            vec![
                vec![text("Stork"), Value::Number(10.0)],
                vec![text("Stork"), Value::Missing],
                vec![Value::Missing, Value::Number(99.0)],
                vec![text("Crane"), Value::Missing],
            ],
        );
        let table = species_group_means(&data, "Species", &["Average_Speed_kmph"])
            .unwrap()
            .unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0], vec![text("Crane"), Value::Missing]);
        assert_eq!(table.rows[1], vec![text("Stork"), Value::Number(10.0)]);
    }

    #[test]
    fn test_species_group_means_absent_column() {
        let data = records(&["Species"], vec![vec![text("Stork")]]);
        let table = species_group_means(&data, "Species", &["Average_Speed_kmph"]).unwrap();
        assert!(table.is_none());
    }

    #[test]
    fn test_species_group_means_text_value_is_error() {
        let data = records(
            &["Species", "Average_Speed_kmph", "Flight_Distance_km"],
            vec![vec![text("Stork"), text("fast"), Value::Number(100.0)]],
        );
        assert!(species_group_means(&data, "Species", &["Average_Speed_kmph"]).is_err());
        assert!(derive(&data).species_means.is_none());
    }
}
