use anyhow::{Context, Result};
use std::collections::{BTreeMap, HashMap};

use crate::data::RecordSet;
use crate::ir::{CategoryOrder, ChartKind, ChartSpec, Figure, LabeledPoint, PointSeries};
use crate::palette::scale_linear;
use crate::stats;

/// Point radius range (pixels) for size-mapped scatter points
const SIZE_RANGE: (f64, f64) = (3.0, 12.0);
const DEFAULT_RADIUS: f64 = 4.0;
/// Resolution of the pairplot diagonal density curves
const KDE_GRID_POINTS: usize = 64;
/// Color key for rows whose color cell is empty
pub const MISSING_KEY: &str = "(missing)";

/// Turn a chart spec plus its source frame into drawable figure data.
///
/// Expects every required column to be present; the renderer checks that
/// before calling in.
pub fn prepare_figure(spec: &ChartSpec, frame: &RecordSet) -> Result<Figure> {
    match &spec.kind {
        ChartKind::Scatter { x, y, color, size, hover } => {
            prepare_scatter(frame, x, y, color.as_deref(), size.as_deref(), hover)
        }
        ChartKind::LabeledScatter { x, y, label } => prepare_labeled_scatter(frame, x, y, label),
        ChartKind::Heatmap { columns } => prepare_heatmap(frame, columns),
        ChartKind::Pairplot { columns, alpha } => prepare_pairplot(frame, columns, *alpha),
        ChartKind::CountBar { x, order, palette, label_rotation } => {
            let labels = frame.labels(x)?;
            let counts = match order {
                CategoryOrder::FirstAppearance => stats::value_counts(&labels),
                CategoryOrder::CountDescending => stats::value_counts_descending(&labels),
            };
            if counts.is_empty() {
                anyhow::bail!("Column '{}' has no values to count", x);
            }
            Ok(Figure::Bars {
                x_label: x.clone(),
                bars: counts.into_iter().map(|(k, n)| (k, n as f64)).collect(),
                palette: *palette,
                label_rotation: *label_rotation,
            })
        }
        ChartKind::Pie { category, palette, decimals } => {
            let counts = stats::value_counts_descending(&frame.labels(category)?);
            if counts.is_empty() {
                anyhow::bail!("Column '{}' has no values to count", category);
            }
            Ok(Figure::Pie {
                slices: counts.into_iter().map(|(k, n)| (k, n as f64)).collect(),
                palette: *palette,
                decimals: *decimals,
            })
        }
        ChartKind::Box { group, y } => prepare_boxes(frame, group, y),
        ChartKind::GroupedHistogram { x, group } => prepare_grouped_counts(frame, x, group),
    }
}

fn prepare_scatter(
    frame: &RecordSet,
    x_col: &str,
    y_col: &str,
    color_col: Option<&str>,
    size_col: Option<&str>,
    hover: &[String],
) -> Result<Figure> {
    let xs = frame.numeric(x_col)?;
    let ys = frame.numeric(y_col)?;
    let colors = match color_col {
        Some(c) => Some(frame.labels(c)?),
        None => None,
    };
    let sizes = match size_col {
        Some(c) => Some(frame.numeric(c)?),
        None => None,
    };
    let size_domain = sizes
        .as_ref()
        .and_then(|s| stats::min_max(s.iter().flatten().copied()));

    // color key -> points, keys sorted for a stable legend
    let mut groups: BTreeMap<String, Vec<(f64, f64, f64)>> = BTreeMap::new();
    for i in 0..frame.len() {
        let (Some(x), Some(y)) = (xs[i], ys[i]) else { continue };

        let key = match &colors {
            Some(labels) => labels[i].clone().unwrap_or_else(|| MISSING_KEY.to_string()),
            None => "default".to_string(),
        };
        let radius = match (&sizes, size_domain) {
            (Some(s), Some(domain)) => s[i]
                .map(|v| scale_linear(v, domain, SIZE_RANGE))
                .unwrap_or(SIZE_RANGE.0),
            _ => DEFAULT_RADIUS,
        };
        groups.entry(key).or_default().push((x, y, radius));
    }

    if groups.is_empty() {
        anyhow::bail!("No rows with numeric '{}' and '{}'", x_col, y_col);
    }

    Ok(Figure::Scatter {
        x_label: x_col.to_string(),
        y_label: y_col.to_string(),
        series: groups
            .into_iter()
            .map(|(key, points)| PointSeries { key, points })
            .collect(),
        hover: hover.iter().filter(|h| frame.has_column(h)).cloned().collect(),
    })
}

fn prepare_labeled_scatter(frame: &RecordSet, x_col: &str, y_col: &str, label_col: &str) -> Result<Figure> {
    let xs = frame.numeric(x_col)?;
    let ys = frame.numeric(y_col)?;
    let labels = frame.labels(label_col)?;

    let points: Vec<LabeledPoint> = xs
        .into_iter()
        .zip(ys)
        .zip(labels)
        .filter_map(|((x, y), label)| {
            Some(LabeledPoint {
                x: x?,
                y: y?,
                label: label.unwrap_or_default(),
            })
        })
        .collect();

    if points.is_empty() {
        anyhow::bail!("No rows with numeric '{}' and '{}'", x_col, y_col);
    }

    Ok(Figure::LabeledScatter {
        x_label: x_col.to_string(),
        y_label: y_col.to_string(),
        points,
    })
}

fn prepare_heatmap(frame: &RecordSet, columns: &[String]) -> Result<Figure> {
    let values = columns
        .iter()
        .map(|c| frame.numeric(c))
        .collect::<Result<Vec<_>>>()
        .context("Correlation needs numeric columns")?;

    Ok(Figure::Heatmap {
        labels: columns.to_vec(),
        matrix: stats::correlation_matrix(&values),
    })
}

fn prepare_pairplot(frame: &RecordSet, columns: &[String], alpha: f64) -> Result<Figure> {
    // Only this chart drops incomplete rows
    let complete = frame.select(columns)?.drop_missing(columns)?;
    if complete.is_empty() {
        anyhow::bail!("No rows without missing values across {}", columns.join(", "));
    }

    let values = columns
        .iter()
        .map(|c| {
            complete
                .numeric(c)
                .map(|col| col.into_iter().flatten().collect::<Vec<f64>>())
        })
        .collect::<Result<Vec<_>>>()?;

    let densities = values
        .iter()
        .map(|col| stats::kde(col, KDE_GRID_POINTS))
        .collect();

    Ok(Figure::Pairplot {
        labels: columns.to_vec(),
        columns: values,
        densities,
        alpha,
    })
}

fn prepare_boxes(frame: &RecordSet, group_col: &str, y_col: &str) -> Result<Figure> {
    let groups = frame.labels(group_col)?;
    let ys = frame.numeric(y_col)?;

    // Groups in order of first appearance
    let mut order: Vec<String> = Vec::new();
    let mut values: HashMap<String, Vec<f64>> = HashMap::new();
    for (group, y) in groups.into_iter().zip(ys) {
        let (Some(group), Some(y)) = (group, y) else { continue };
        if !values.contains_key(&group) {
            order.push(group.clone());
        }
        values.entry(group).or_default().push(y);
    }

    let boxes: Vec<_> = order
        .into_iter()
        .filter_map(|g| {
            let box_stats = stats::box_stats(&values[&g])?;
            Some((g, box_stats))
        })
        .collect();

    if boxes.is_empty() {
        anyhow::bail!("No rows with both '{}' and numeric '{}'", group_col, y_col);
    }

    Ok(Figure::Boxes {
        x_label: group_col.to_string(),
        y_label: y_col.to_string(),
        boxes,
    })
}

fn prepare_grouped_counts(frame: &RecordSet, x_col: &str, group_col: &str) -> Result<Figure> {
    let xs = frame.labels(x_col)?;
    let groups = frame.labels(group_col)?;

    let pairs: Vec<(String, String)> = xs
        .into_iter()
        .zip(groups)
        .filter_map(|(x, g)| Some((x?, g?)))
        .collect();

    if pairs.is_empty() {
        anyhow::bail!("No rows with both '{}' and '{}'", x_col, group_col);
    }

    let categories: Vec<String> = stats::value_counts(
        &pairs.iter().map(|(x, _)| Some(x.clone())).collect::<Vec<_>>(),
    )
    .into_iter()
    .map(|(k, _)| k)
    .collect();
    let group_keys: Vec<String> = stats::value_counts(
        &pairs.iter().map(|(_, g)| Some(g.clone())).collect::<Vec<_>>(),
    )
    .into_iter()
    .map(|(k, _)| k)
    .collect();

    let cat_index: HashMap<&str, usize> = categories
        .iter()
        .enumerate()
        .map(|(i, c)| (c.as_str(), i))
        .collect();

    let mut counts: Vec<Vec<f64>> = vec![vec![0.0; categories.len()]; group_keys.len()];
    for (x, g) in &pairs {
        if let Some(gi) = group_keys.iter().position(|k| k == g) {
            counts[gi][cat_index[x.as_str()]] += 1.0;
        }
    }

    Ok(Figure::GroupedBars {
        x_label: x_col.to_string(),
        categories,
        groups: group_keys.into_iter().zip(counts).collect(),
    })
}
