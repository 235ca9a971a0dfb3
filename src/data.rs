use anyhow::{anyhow, Result};
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::fmt;

/// Cell spellings read as a missing value
const MISSING_MARKERS: &[&str] = &["", "NA", "N/A", "n/a", "NaN", "nan", "null", "NULL", "None", "#N/A"];

/// A single typed cell
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Text(String),
    Missing,
}

impl Value {
    /// Type a raw cell: missing marker, then number, then text
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if MISSING_MARKERS.contains(&trimmed) {
            return Value::Missing;
        }
        match trimmed.parse::<f64>() {
            Ok(n) => Value::Number(n),
            Err(_) => Value::Text(trimmed.to_string()),
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    /// Category label for this cell, `None` when missing
    pub fn label(&self) -> Option<String> {
        match self {
            Value::Missing => None,
            other => Some(other.to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::Text(s) => f.write_str(s),
            Value::Missing => f.write_str("NaN"),
        }
    }
}

/// The record set: named columns over immutable rows.
///
/// Derivation never mutates a record set in place; `with_column` returns a
/// new one with the extra column appended.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSet {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl RecordSet {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { headers, rows }
    }

    /// Create a RecordSet from raw CSV contents, typing every cell
    pub fn from_csv(csv: crate::csv_reader::CsvData) -> Self {
        let rows = csv
            .rows
            .iter()
            .map(|row| row.iter().map(|cell| Value::parse(cell)).collect())
            .collect();
        Self {
            headers: csv.headers,
            rows,
        }
    }

    /// Create a RecordSet from a JSON Array of Objects
    pub fn from_json(value: &JsonValue) -> Result<Self> {
        let array = value.as_array().ok_or_else(||
            anyhow!("Input data must be a JSON array of objects")
        )?;

        if array.is_empty() {
            return Err(anyhow!("Input data array is empty"));
        }

        // Extract headers from the first object
        let first_obj = array[0].as_object().ok_or_else(||
            anyhow!("Items in array must be objects")
        )?;

        let headers: Vec<String> = first_obj.keys().cloned().collect();

        let mut rows = Vec::new();
        for item in array {
            let obj = item.as_object().ok_or_else(||
                anyhow!("Items in array must be objects")
            )?;

            let mut row = Vec::new();
            for header in &headers {
                let value = match obj.get(header) {
                    Some(JsonValue::String(s)) => Value::parse(s),
                    Some(JsonValue::Number(n)) => n
                        .as_f64()
                        .map(Value::Number)
                        .unwrap_or(Value::Missing),
                    Some(JsonValue::Bool(b)) => Value::Text(b.to_string()),
                    Some(JsonValue::Null) | None => Value::Missing,
                    _ => return Err(anyhow!("Unsupported value type for field '{}'", header)),
                };
                row.push(value);
            }
            rows.push(row);
        }

        Ok(Self { headers, rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Case-insensitive header lookup
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.eq_ignore_ascii_case(name))
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Names from `required` that this record set does not carry, in input order
    pub fn missing_columns<S: AsRef<str>>(&self, required: &[S]) -> Vec<String> {
        required
            .iter()
            .map(|c| c.as_ref())
            .filter(|c| !self.has_column(c))
            .map(|c| c.to_string())
            .collect()
    }

    pub fn column(&self, name: &str) -> Result<Vec<&Value>> {
        let idx = self
            .column_index(name)
            .ok_or_else(|| anyhow!("Column '{}' not found", name))?;
        Ok(self.rows.iter().map(|row| &row[idx]).collect())
    }

    /// Numeric view of a column; missing cells are `None`, text cells are an error
    pub fn numeric(&self, name: &str) -> Result<Vec<Option<f64>>> {
        let idx = self
            .column_index(name)
            .ok_or_else(|| anyhow!("Column '{}' not found", name))?;
        self.rows
            .iter()
            .enumerate()
            .map(|(row_idx, row)| match &row[idx] {
                Value::Number(n) => Ok(Some(*n)),
                Value::Missing => Ok(None),
                Value::Text(s) => Err(anyhow!(
                    "Failed to parse '{}' as number in column '{}' at row {}",
                    s,
                    name,
                    row_idx + 1
                )),
            })
            .collect()
    }

    /// Categorical view of a column; missing cells are `None`
    pub fn labels(&self, name: &str) -> Result<Vec<Option<String>>> {
        Ok(self.column(name)?.into_iter().map(Value::label).collect())
    }

    /// A new record set with `values` appended as column `name`.
    /// An existing column of the same name is replaced.
    pub fn with_column(&self, name: &str, values: Vec<Value>) -> Result<Self> {
        if values.len() != self.rows.len() {
            anyhow::bail!(
                "Column '{}' has {} values but the record set has {} rows",
                name,
                values.len(),
                self.rows.len()
            );
        }

        let mut headers = self.headers.clone();
        let mut rows = self.rows.clone();
        match self.column_index(name) {
            Some(idx) => {
                for (row, value) in rows.iter_mut().zip(values) {
                    row[idx] = value;
                }
            }
            None => {
                headers.push(name.to_string());
                for (row, value) in rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }
        Ok(Self { headers, rows })
    }

    /// First `n` rows
    pub fn head(&self, n: usize) -> Self {
        Self {
            headers: self.headers.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }

    /// Projection onto `columns`, in the given order
    pub fn select<S: AsRef<str>>(&self, columns: &[S]) -> Result<Self> {
        let indices = columns
            .iter()
            .map(|c| {
                self.column_index(c.as_ref())
                    .ok_or_else(|| anyhow!("Column '{}' not found", c.as_ref()))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            headers: indices.iter().map(|&i| self.headers[i].clone()).collect(),
            rows: self
                .rows
                .iter()
                .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
                .collect(),
        })
    }

    /// Rows with no missing cell in any of `columns`
    pub fn drop_missing<S: AsRef<str>>(&self, columns: &[S]) -> Result<Self> {
        let indices = columns
            .iter()
            .map(|c| {
                self.column_index(c.as_ref())
                    .ok_or_else(|| anyhow!("Column '{}' not found", c.as_ref()))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            headers: self.headers.clone(),
            rows: self
                .rows
                .iter()
                .filter(|row| indices.iter().all(|&i| !row[i].is_missing()))
                .cloned()
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csv_reader::CsvData;
    use pretty_assertions::assert_eq;

    fn make_records() -> RecordSet {
        RecordSet::from_csv(CsvData {
            headers: vec!["Species".into(), "Flock_Size".into(), "Region".into()],
            rows: vec![
                vec!["Stork".into(), "12".into(), "Europe".into()],
                vec!["Crane".into(), "".into(), "Asia".into()],
                vec!["Swan".into(), "7.5".into(), "NA".into()],
            ],
        })
    }

    #[test]
    fn test_value_parse() {
        assert_eq!(Value::parse("3.5"), Value::Number(3.5));
        assert_eq!(Value::parse(" 12 "), Value::Number(12.0));
        assert_eq!(Value::parse("Successful"), Value::Text("Successful".into()));
        assert_eq!(Value::parse(""), Value::Missing);
        assert_eq!(Value::parse("NaN"), Value::Missing);
    }

    #[test]
    fn test_value_display() {
        assert_eq!(Value::Number(12.0).to_string(), "12");
        assert_eq!(Value::Number(2.5).to_string(), "2.5");
        assert_eq!(Value::Missing.to_string(), "NaN");
    }

    #[test]
    fn test_column_lookup_is_case_insensitive() {
        let records = make_records();
        assert_eq!(records.column_index("flock_size"), Some(1));
        assert!(records.has_column("REGION"));
        assert!(!records.has_column("Habitat"));
    }

    #[test]
    fn test_missing_columns_preserves_order() {
        let records = make_records();
        let missing = records.missing_columns(&["Habitat", "Species", "Weather_Condition"]);
        assert_eq!(missing, vec!["Habitat".to_string(), "Weather_Condition".to_string()]);
    }

    #[test]
    fn test_numeric_column() {
        let records = make_records();
        assert_eq!(records.numeric("Flock_Size").unwrap(), vec![Some(12.0), None, Some(7.5)]);
    }

    #[test]
    fn test_numeric_column_rejects_text() {
        let records = make_records();
        let err = records.numeric("Species").unwrap_err();
        assert!(err.to_string().contains("Failed to parse 'Stork'"));
    }

    #[test]
    fn test_with_column_is_pure() {
        let records = make_records();
        let extended = records
            .with_column("Encoded", vec![Value::Number(1.0), Value::Missing, Value::Number(0.0)])
            .unwrap();
        assert_eq!(records.headers.len(), 3);
        assert_eq!(extended.headers.len(), 4);
        assert_eq!(extended.rows[2][3], Value::Number(0.0));
    }

    #[test]
    fn test_with_column_length_mismatch() {
        let records = make_records();
        assert!(records.with_column("Encoded", vec![Value::Missing]).is_err());
    }

    #[test]
    fn test_drop_missing() {
        let records = make_records();
        let kept = records.drop_missing(&["Flock_Size"]).unwrap();
        assert_eq!(kept.len(), 2);
        let kept = records.drop_missing(&["Flock_Size", "Region"]).unwrap();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept.rows[0][0], Value::Text("Stork".into()));
    }

    #[test]
    fn test_select_and_head() {
        let records = make_records();
        let selected = records.select(&["Region", "Species"]).unwrap().head(2);
        assert_eq!(selected.headers, vec!["Region".to_string(), "Species".to_string()]);
        assert_eq!(selected.len(), 2);
        assert_eq!(selected.rows[1][1], Value::Text("Crane".into()));
    }

    #[test]
    fn test_from_json() {
        let json: JsonValue = serde_json::from_str(
            r#"[{"Species": "Stork", "Flock_Size": 12}, {"Species": "Crane", "Flock_Size": null}]"#,
        )
        .unwrap();
        let records = RecordSet::from_json(&json).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records.numeric("Flock_Size").unwrap(), vec![Some(12.0), None]);
    }

    #[test]
    fn test_from_json_rejects_non_array() {
        let json: JsonValue = serde_json::from_str(r#"{"Species": "Stork"}"#).unwrap();
        assert!(RecordSet::from_json(&json).is_err());
    }
}
