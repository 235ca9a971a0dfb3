//! The dashboard's fixed list of sections.
//!
//! Order is presentation order. No section depends on another having been
//! rendered first.

use std::collections::HashSet;

use crate::columns::*;
use crate::error::{DashboardError, Result};
use crate::ir::{CategoryOrder, ChartKind, ChartSpec, Entry, PaletteName, Section, Source};

pub const PAGE_TITLE: &str = "Bird Migration Visualization Dashboard";
pub const PAGE_SUBTITLE: &str =
    "Explore bird migration trends, distances, weather, and success across regions.";

/// Tunables baked into the registry
#[derive(Debug, Clone)]
pub struct RegistryOptions {
    pub preview_rows: usize,
    pub pair_alpha: f64,
    pub pie_decimals: usize,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self {
            preview_rows: 5,
            pair_alpha: 0.4,
            pie_decimals: 1,
        }
    }
}

fn section(heading: &str, title: &str, source: Source, kind: ChartKind) -> Section {
    Section {
        heading: heading.to_string(),
        entry: Entry::Chart(ChartSpec {
            title: title.to_string(),
            source,
            kind,
        }),
    }
}

fn names(cols: &[&str]) -> Vec<String> {
    cols.iter().map(|c| c.to_string()).collect()
}

/// Build the migration dashboard registry
pub fn dashboard_registry(options: &RegistryOptions) -> Vec<Section> {
    vec![
        Section {
            heading: "Dataset Overview".to_string(),
            entry: Entry::Preview { rows: options.preview_rows },
        },
        section(
            "Wind Speed vs Flight Distance",
            "Wind Speed vs Flight Distance",
            Source::Records,
            ChartKind::Scatter {
                x: WIND_SPEED.to_string(),
                y: FLIGHT_DISTANCE.to_string(),
                color: Some(MIGRATION_SUCCESS.to_string()),
                size: Some(FLOCK_SIZE.to_string()),
                hover: names(&[SPECIES, REGION]),
            },
        ),
        section(
            "Average Speed vs Flight Distance by Species",
            "Species-wise Averages",
            Source::SpeciesMeans,
            ChartKind::LabeledScatter {
                x: FLIGHT_DISTANCE.to_string(),
                y: AVERAGE_SPEED.to_string(),
                label: SPECIES.to_string(),
            },
        ),
        section(
            "Correlation Heatmap",
            "Feature Correlation",
            Source::Records,
            ChartKind::Heatmap {
                columns: names(&[
                    WIND_SPEED,
                    FLIGHT_DISTANCE,
                    FLOCK_SIZE,
                    AVERAGE_SPEED,
                    MIGRATION_SUCCESS_ENCODED,
                ]),
            },
        ),
        section(
            "Pairplot",
            "Pairwise Distributions",
            Source::Records,
            ChartKind::Pairplot {
                columns: names(&[
                    FLIGHT_DISTANCE,
                    AVERAGE_SPEED,
                    WIND_SPEED,
                    FLOCK_SIZE,
                    MIGRATION_SUCCESS_ENCODED,
                ]),
                alpha: options.pair_alpha,
            },
        ),
        section(
            "Weather Conditions During Migration",
            "Weather Conditions Frequency",
            Source::Records,
            ChartKind::CountBar {
                x: WEATHER_CONDITION.to_string(),
                order: CategoryOrder::CountDescending,
                palette: PaletteName::Set2,
                label_rotation: 45,
            },
        ),
        section(
            "Bird Habitat Types",
            "Distribution of Habitats",
            Source::Records,
            ChartKind::Pie {
                category: HABITAT.to_string(),
                palette: PaletteName::Pastel,
                decimals: options.pie_decimals,
            },
        ),
        section(
            "Flight Distance by Region",
            "Flight Distance Distribution per Region",
            Source::Records,
            ChartKind::Box {
                group: REGION.to_string(),
                y: FLIGHT_DISTANCE.to_string(),
            },
        ),
        section(
            "Migration Reason Count",
            "Reason for Migration",
            Source::Records,
            ChartKind::CountBar {
                x: MIGRATION_REASON.to_string(),
                order: CategoryOrder::FirstAppearance,
                palette: PaletteName::Husl,
                label_rotation: 0,
            },
        ),
        section(
            "Migration Success by Region",
            "Migration Success Count Across Regions",
            Source::Records,
            ChartKind::GroupedHistogram {
                x: REGION.to_string(),
                group: MIGRATION_SUCCESS.to_string(),
            },
        ),
    ]
}

/// Reject sections whose declaration is inconsistent
pub fn validate_registry(sections: &[Section]) -> Result<()> {
    for section in sections {
        match &section.entry {
            Entry::Preview { rows } => {
                if *rows == 0 {
                    return Err(malformed(&section.heading, "preview must show at least one row"));
                }
            }
            Entry::Chart(spec) => validate_spec(spec)?,
        }
    }
    Ok(())
}

fn validate_spec(spec: &ChartSpec) -> Result<()> {
    let required = spec.kind.required_columns();
    if required.iter().any(|c| c.trim().is_empty()) {
        return Err(malformed(&spec.title, "encoding references an empty column name"));
    }

    match &spec.kind {
        ChartKind::Heatmap { columns } | ChartKind::Pairplot { columns, .. } => {
            if columns.len() < 2 {
                return Err(malformed(&spec.title, "needs at least two columns"));
            }
            let mut seen = HashSet::new();
            if let Some(dup) = columns.iter().find(|c| !seen.insert(c.to_ascii_lowercase())) {
                return Err(malformed(&spec.title, &format!("column '{}' listed twice", dup)));
            }
        }
        _ => {}
    }

    if let ChartKind::Pairplot { alpha, .. } = &spec.kind {
        if !(0.0..=1.0).contains(alpha) {
            return Err(malformed(&spec.title, "alpha must be within [0, 1]"));
        }
    }
    Ok(())
}

fn malformed(title: &str, reason: &str) -> DashboardError {
    DashboardError::MalformedSpec {
        title: title.to_string(),
        reason: reason.to_string(),
    }
}
