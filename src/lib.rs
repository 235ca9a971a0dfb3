// Library exports for migration-dashboard

pub mod columns;
pub mod csv_reader;
pub mod data;
pub mod derive;
pub mod error;
pub mod graph;
pub mod ir;
pub mod palette;
pub mod registry;
pub mod runtime;
pub mod sink;
pub mod stats;
pub mod transform;

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::data::RecordSet;
use crate::error::{DashboardError, Result};
use crate::registry::RegistryOptions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum OutputFormat {
    #[serde(rename = "png")]
    #[default]
    Png,
    #[serde(rename = "svg")]
    Svg,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Svg => "svg",
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(OutputFormat::Png),
            "svg" => Ok(OutputFormat::Svg),
            other => Err(DashboardError::Config(format!(
                "unknown output format '{}' (expected png or svg)",
                other
            ))),
        }
    }
}

/// Rendering options, read from an optional JSON file and then CLI flags
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RenderOptions {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default, rename = "type")]
    pub format: OutputFormat,
    #[serde(default = "default_preview_rows")]
    pub preview_rows: usize,
    #[serde(default = "default_pair_alpha")]
    pub pair_alpha: f64,
    #[serde(default = "default_pie_decimals")]
    pub pie_decimals: usize,
}

fn default_width() -> u32 { 800 }
fn default_height() -> u32 { 600 }
fn default_preview_rows() -> usize { 5 }
fn default_pair_alpha() -> f64 { 0.4 }
fn default_pie_decimals() -> usize { 1 }

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            format: OutputFormat::Png,
            preview_rows: default_preview_rows(),
            pair_alpha: default_pair_alpha(),
            pie_decimals: default_pie_decimals(),
        }
    }
}

impl RenderOptions {
    /// Parse options from a JSON document; absent fields take defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let options: RenderOptions =
            serde_json::from_str(json).map_err(|e| DashboardError::Config(e.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            DashboardError::Config(format!("cannot read '{}': {}", path.display(), e))
        })?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(DashboardError::Config("width and height must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.pair_alpha) {
            return Err(DashboardError::Config("pair_alpha must be within [0, 1]".into()));
        }
        Ok(())
    }

    pub fn registry_options(&self) -> RegistryOptions {
        RegistryOptions {
            preview_rows: self.preview_rows,
            pair_alpha: self.pair_alpha,
            pie_decimals: self.pie_decimals,
        }
    }
}

/// Load a dataset from a path: `.json` files as an array of objects,
/// anything else as CSV
pub fn load_dataset(path: &Path) -> Result<RecordSet> {
    let is_json = path
        .extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        let text = std::fs::read_to_string(path)
            .map_err(|e| DashboardError::Load(format!("cannot read '{}': {}", path.display(), e)))?;
        let value: serde_json::Value =
            serde_json::from_str(&text).map_err(|e| DashboardError::Load(e.to_string()))?;
        RecordSet::from_json(&value).map_err(|e| DashboardError::Load(format!("{:#}", e)))
    } else {
        let csv = csv_reader::read_csv_from_path(path)
            .map_err(|e| DashboardError::Load(format!("{:#}", e)))?;
        Ok(RecordSet::from_csv(csv))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_options_defaults_from_empty_json() {
        let options = RenderOptions::from_json_str("{}").unwrap();
        assert_eq!(options.width, 800);
        assert_eq!(options.height, 600);
        assert_eq!(options.format, OutputFormat::Png);
        assert_eq!(options.preview_rows, 5);
        assert_eq!(options.pair_alpha, 0.4);
        assert_eq!(options.pie_decimals, 1);
    }

    #[test]
    fn test_options_partial_json() {
        let options = RenderOptions::from_json_str(r#"{"type": "svg", "width": 1024}"#).unwrap();
        assert_eq!(options.format, OutputFormat::Svg);
        assert_eq!(options.width, 1024);
        assert_eq!(options.height, 600);
    }

    #[test]
    fn test_options_reject_bad_alpha() {
        let err = RenderOptions::from_json_str(r#"{"pair_alpha": 2.0}"#).unwrap_err();
        assert!(matches!(err, DashboardError::Config(_)));
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("SVG".parse::<OutputFormat>().unwrap(), OutputFormat::Svg);
        assert!("gif".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_load_dataset_csv_and_json() {
        let dir = tempfile::tempdir().unwrap();

        let csv_path = dir.path().join("birds.csv");
        let mut f = std::fs::File::create(&csv_path).unwrap();
        writeln!(f, "Species,Flock_Size\nStork,12\nCrane,").unwrap();
        let records = load_dataset(&csv_path).unwrap();
        assert_eq!(records.len(), 2);

        let json_path = dir.path().join("birds.json");
        std::fs::write(&json_path, r#"[{"Species": "Stork", "Flock_Size": 12}]"#).unwrap();
        let records = load_dataset(&json_path).unwrap();
        assert_eq!(records.len(), 1);
        assert!(records.has_column("Species"));
    }

    #[test]
    fn test_load_dataset_missing_file() {
        let err = load_dataset(Path::new("/nonexistent/birds.csv")).unwrap_err();
        assert!(matches!(err, DashboardError::Load(_)));
    }
}
