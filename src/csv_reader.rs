use anyhow::{Context, Result};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Raw CSV contents: header row plus untyped string cells
#[derive(Debug, Clone)]
pub struct CsvData {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Read CSV data from stdin
pub fn read_csv_from_stdin() -> Result<CsvData> {
    let stdin = io::stdin();
    read_csv(stdin.lock())
}

/// Read CSV data from a file on disk
pub fn read_csv_from_path(path: &Path) -> Result<CsvData> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open dataset '{}'", path.display()))?;
    read_csv(file).with_context(|| format!("Failed to read dataset '{}'", path.display()))
}

/// Read CSV data from any reader
pub fn read_csv<R: Read>(reader: R) -> Result<CsvData> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader
        .headers()
        .context("Failed to read CSV headers")?
        .iter()
        .enumerate()
        .map(|(i, h)| {
            // Spreadsheet exports often prefix the first header with a BOM
            if i == 0 {
                h.trim_start_matches('\u{feff}').to_string()
            } else {
                h.to_string()
            }
        })
        .collect();

    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        anyhow::bail!("CSV must have a header row");
    }

    let mut rows = Vec::new();
    for (row_idx, record) in csv_reader.records().enumerate() {
        let record =
            record.with_context(|| format!("Failed to parse CSV record at row {}", row_idx + 1))?;
        rows.push(record.iter().map(|s| s.to_string()).collect());
    }

    if rows.is_empty() {
        anyhow::bail!("CSV must contain at least one data row");
    }

    Ok(CsvData { headers, rows })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_csv_basic() {
        let input = "Species,Flock_Size\nStork,12\nCrane,40\n";
        let csv = read_csv(input.as_bytes()).unwrap();
        assert_eq!(csv.headers, vec!["Species", "Flock_Size"]);
        assert_eq!(csv.rows.len(), 2);
        assert_eq!(csv.rows[1], vec!["Crane", "40"]);
    }

    #[test]
    fn test_read_csv_trims_and_strips_bom() {
        let input = "\u{feff}Species , Region\n Stork , Europe \n";
        let csv = read_csv(input.as_bytes()).unwrap();
        assert_eq!(csv.headers, vec!["Species", "Region"]);
        assert_eq!(csv.rows[0], vec!["Stork", "Europe"]);
    }

    #[test]
    fn test_read_csv_keeps_empty_cells() {
        let input = "a,b\n1,\n,2\n";
        let csv = read_csv(input.as_bytes()).unwrap();
        assert_eq!(csv.rows[0], vec!["1", ""]);
        assert_eq!(csv.rows[1], vec!["", "2"]);
    }

    #[test]
    fn test_read_csv_no_rows() {
        let result = read_csv("a,b\n".as_bytes());
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("at least one data row"));
    }

    #[test]
    fn test_read_csv_ragged_row() {
        let result = read_csv("a,b\n1,2\n3\n".as_bytes());
        assert!(result.is_err());
    }

    #[test]
    fn test_read_csv_missing_file() {
        let result = read_csv_from_path(Path::new("/nonexistent/birds.csv"));
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Failed to open dataset"));
    }
}
