use serde::Serialize;

use crate::data::RecordSet;
use crate::stats::BoxStats;
use crate::OutputFormat;

// =============================================================================
// Declaration: what the dashboard shows
// =============================================================================

/// One dashboard section: a heading plus what goes under it
#[derive(Debug, Clone)]
pub struct Section {
    pub heading: String,
    pub entry: Entry,
}

#[derive(Debug, Clone)]
pub enum Entry {
    /// The first `rows` rows of the record set, shown as a table
    Preview { rows: usize },
    Chart(ChartSpec),
}

/// Which frame a chart reads from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Source {
    Records,
    SpeciesMeans,
}

#[derive(Debug, Clone)]
pub struct ChartSpec {
    pub title: String,
    pub source: Source,
    pub kind: ChartKind,
}

/// Categorical palettes, named after the seaborn palettes they imitate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PaletteName {
    Category10,
    Set2,
    Pastel,
    Husl,
}

/// Ordering of categories on a count axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryOrder {
    FirstAppearance,
    CountDescending,
}

/// A chart kind together with its visual encoding
#[derive(Debug, Clone)]
pub enum ChartKind {
    Scatter {
        x: String,
        y: String,
        color: Option<String>,
        size: Option<String>,
        /// Annotation columns, used only when present
        hover: Vec<String>,
    },
    LabeledScatter {
        x: String,
        y: String,
        label: String,
    },
    Heatmap {
        columns: Vec<String>,
    },
    Pairplot {
        columns: Vec<String>,
        alpha: f64,
    },
    CountBar {
        x: String,
        order: CategoryOrder,
        palette: PaletteName,
        label_rotation: i32,
    },
    Pie {
        category: String,
        palette: PaletteName,
        decimals: usize,
    },
    Box {
        group: String,
        y: String,
    },
    GroupedHistogram {
        x: String,
        group: String,
    },
}

impl ChartKind {
    pub fn name(&self) -> &'static str {
        match self {
            ChartKind::Scatter { .. } => "scatter",
            ChartKind::LabeledScatter { .. } => "labeled_scatter",
            ChartKind::Heatmap { .. } => "heatmap",
            ChartKind::Pairplot { .. } => "pairplot",
            ChartKind::CountBar { .. } => "count_bar",
            ChartKind::Pie { .. } => "pie",
            ChartKind::Box { .. } => "box",
            ChartKind::GroupedHistogram { .. } => "grouped_histogram",
        }
    }

    /// Every column the encoding references. Hover columns are not required.
    pub fn required_columns(&self) -> Vec<String> {
        let mut cols: Vec<String> = match self {
            ChartKind::Scatter { x, y, color, size, .. } => {
                let mut v = vec![x.clone(), y.clone()];
                v.extend(color.iter().cloned());
                v.extend(size.iter().cloned());
                v
            }
            ChartKind::LabeledScatter { x, y, label } => vec![x.clone(), y.clone(), label.clone()],
            ChartKind::Heatmap { columns } | ChartKind::Pairplot { columns, .. } => columns.clone(),
            ChartKind::CountBar { x, .. } => vec![x.clone()],
            ChartKind::Pie { category, .. } => vec![category.clone()],
            ChartKind::Box { group, y } => vec![group.clone(), y.clone()],
            ChartKind::GroupedHistogram { x, group } => vec![x.clone(), group.clone()],
        };
        let mut seen = std::collections::HashSet::new();
        cols.retain(|c| seen.insert(c.to_ascii_lowercase()));
        cols
    }
}

// =============================================================================
// Preparation: chart data computed from the record set
// =============================================================================

/// A chart's data after statistics, ready for a backend to draw
#[derive(Debug, Clone, PartialEq)]
pub enum Figure {
    Scatter {
        x_label: String,
        y_label: String,
        series: Vec<PointSeries>,
        hover: Vec<String>,
    },
    LabeledScatter {
        x_label: String,
        y_label: String,
        points: Vec<LabeledPoint>,
    },
    Heatmap {
        labels: Vec<String>,
        matrix: Vec<Vec<f64>>,
    },
    Pairplot {
        labels: Vec<String>,
        /// One vector per column, all of equal length
        columns: Vec<Vec<f64>>,
        /// Diagonal density curves: (grid, density) per column
        densities: Vec<(Vec<f64>, Vec<f64>)>,
        alpha: f64,
    },
    Bars {
        x_label: String,
        bars: Vec<(String, f64)>,
        palette: PaletteName,
        label_rotation: i32,
    },
    Pie {
        slices: Vec<(String, f64)>,
        palette: PaletteName,
        decimals: usize,
    },
    Boxes {
        x_label: String,
        y_label: String,
        boxes: Vec<(String, BoxStats)>,
    },
    GroupedBars {
        x_label: String,
        categories: Vec<String>,
        /// (group key, count per category)
        groups: Vec<(String, Vec<f64>)>,
    },
}

impl Figure {
    /// Number of data rows feeding the figure
    pub fn row_count(&self) -> usize {
        match self {
            Figure::Scatter { series, .. } => series.iter().map(|s| s.points.len()).sum(),
            Figure::LabeledScatter { points, .. } => points.len(),
            Figure::Heatmap { labels, .. } => labels.len(),
            Figure::Pairplot { columns, .. } => columns.first().map_or(0, |c| c.len()),
            Figure::Bars { bars, .. } => bars.iter().map(|(_, n)| *n as usize).sum(),
            Figure::Pie { slices, .. } => slices.iter().map(|(_, n)| *n as usize).sum(),
            Figure::Boxes { boxes, .. } => boxes.iter().map(|(_, b)| b.count).sum(),
            Figure::GroupedBars { groups, .. } => groups
                .iter()
                .map(|(_, counts)| counts.iter().sum::<f64>() as usize)
                .sum(),
        }
    }
}

/// Points sharing one color category
#[derive(Debug, Clone, PartialEq)]
pub struct PointSeries {
    pub key: String,
    /// (x, y, radius in pixels)
    pub points: Vec<(f64, f64, f64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabeledPoint {
    pub x: f64,
    pub y: f64,
    pub label: String,
}

// =============================================================================
// Results
// =============================================================================

/// An encoded chart image
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    pub format: OutputFormat,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedChart {
    pub title: String,
    pub kind: &'static str,
    pub figure: Figure,
    pub image: Image,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    MissingColumns(Vec<String>),
    Failed(String),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::MissingColumns(cols) => write!(f, "missing columns: {}", cols.join(", ")),
            SkipReason::Failed(msg) => write!(f, "render failed: {}", msg),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Table(RecordSet),
    Chart(RenderedChart),
    Skip(SkipReason),
}

impl Outcome {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Outcome::Table(_) => OutcomeKind::Table,
            Outcome::Chart(_) => OutcomeKind::Chart,
            Outcome::Skip(_) => OutcomeKind::Skip,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Table,
    Chart,
    Skip,
}

/// Outcome of one registry section, in registry order
#[derive(Debug, Clone, PartialEq)]
pub struct RenderResult {
    pub index: usize,
    pub heading: String,
    pub outcome: Outcome,
}
