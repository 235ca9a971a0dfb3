use anyhow::{Context, Result};
use image::ImageEncoder;
use plotters::coord::types::RangedCoordf64;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::FontTransform;
use std::f64::consts::TAU;
use std::ops::Range;

use crate::ir::{Figure, Image, LabeledPoint, PaletteName, PointSeries};
use crate::palette::{diverging, ColorPalette};
use crate::stats::{self, BoxStats};
use crate::{OutputFormat, RenderOptions};

/// Draws a prepared figure into an encoded image.
///
/// The renderer only talks to this trait, so alternative outputs (or test
/// doubles) can stand in for plotters.
pub trait ChartBackend {
    fn draw(&self, title: &str, figure: &Figure, options: &RenderOptions) -> Result<Image>;
}

impl<T: ChartBackend + ?Sized> ChartBackend for &T {
    fn draw(&self, title: &str, figure: &Figure, options: &RenderOptions) -> Result<Image> {
        (**self).draw(title, figure, options)
    }
}

/// Bitmap/SVG output through plotters
#[derive(Debug, Default, Clone, Copy)]
pub struct PlottersBackend;

impl ChartBackend for PlottersBackend {
    fn draw(&self, title: &str, figure: &Figure, options: &RenderOptions) -> Result<Image> {
        match options.format {
            OutputFormat::Png => render_png(title, figure, options.width, options.height),
            OutputFormat::Svg => render_svg(title, figure, options.width, options.height),
        }
    }
}

fn render_png(title: &str, figure: &Figure, width: u32, height: u32) -> Result<Image> {
    let mut buffer = vec![0u8; width as usize * height as usize * 3];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        draw_figure(&root, title, figure)?;
        root.present().context("Failed to present drawing")?;
    }

    let mut png_bytes = Vec::new();
    {
        let encoder = image::codecs::png::PngEncoder::new(&mut png_bytes);
        encoder
            .write_image(&buffer, width, height, image::ColorType::Rgb8)
            .context("Failed to encode PNG")?;
    }

    Ok(Image {
        format: OutputFormat::Png,
        bytes: png_bytes,
    })
}

fn render_svg(title: &str, figure: &Figure, width: u32, height: u32) -> Result<Image> {
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (width, height)).into_drawing_area();
        draw_figure(&root, title, figure)?;
        root.present().context("Failed to present drawing")?;
    }

    Ok(Image {
        format: OutputFormat::Svg,
        bytes: svg.into_bytes(),
    })
}

fn draw_figure<DB>(root: &DrawingArea<DB, Shift>, title: &str, figure: &Figure) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&WHITE).context("Failed to fill background")?;

    match figure {
        Figure::Scatter { x_label, y_label, series, .. } => {
            draw_scatter(root, title, x_label, y_label, series)
        }
        Figure::LabeledScatter { x_label, y_label, points } => {
            draw_labeled_scatter(root, title, x_label, y_label, points)
        }
        Figure::Heatmap { labels, matrix } => draw_heatmap(root, title, labels, matrix),
        Figure::Pairplot { labels, columns, densities, alpha } => {
            draw_pairplot(root, title, labels, columns, densities, *alpha)
        }
        Figure::Bars { x_label, bars, palette, label_rotation } => {
            draw_bars(root, title, x_label, bars, *palette, *label_rotation)
        }
        Figure::Pie { slices, palette, decimals } => draw_pie(root, title, slices, *palette, *decimals),
        Figure::Boxes { x_label, y_label, boxes } => draw_boxes(root, title, x_label, y_label, boxes),
        Figure::GroupedBars { x_label, categories, groups } => {
            draw_grouped_bars(root, title, x_label, categories, groups)
        }
    }
}

/// Axis range around the data with 5% padding (±1 for a single value)
fn padded_range(min_max: Option<(f64, f64)>) -> Result<Range<f64>> {
    let (min, max) = min_max.context("Cannot create chart with no data points")?;
    let range = if min == max {
        (min - 1.0)..(max + 1.0)
    } else {
        let padding = (max - min) * 0.05;
        (min - padding)..(max + padding)
    };
    finite_range(range)
}

/// Plotters never returns on an unbounded axis
fn finite_range(range: Range<f64>) -> Result<Range<f64>> {
    if !range.start.is_finite() || !range.end.is_finite() || !(range.end - range.start).is_finite() {
        anyhow::bail!("Axis range {}..{} is not finite", range.start, range.end);
    }
    Ok(range)
}

/// Category name for an axis tick; categories sit at integer positions
fn category_label(categories: &[String], tick: f64) -> String {
    let rounded = tick.round();
    if (tick - rounded).abs() > 1e-6 || rounded < 0.0 {
        return String::new();
    }
    categories.get(rounded as usize).cloned().unwrap_or_default()
}

fn category_range(n: usize) -> Range<f64> {
    -0.5..(n as f64 - 0.5)
}

fn draw_scatter<DB>(
    root: &DrawingArea<DB, Shift>,
    title: &str,
    x_label: &str,
    y_label: &str,
    series: &[PointSeries],
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let x_range = padded_range(stats::min_max(series.iter().flat_map(|s| s.points.iter().map(|p| p.0))))?;
    let y_range = padded_range(stats::min_max(series.iter().flat_map(|s| s.points.iter().map(|p| p.1))))?;

    let mut chart = ChartBuilder::on(root)
        .margin(10)
        .caption(title, ("sans-serif", 20))
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range, y_range)
        .context("Failed to build chart")?;

    chart
        .configure_mesh()
        .x_desc(x_label)
        .y_desc(y_label)
        .draw()
        .context("Failed to draw mesh")?;

    let palette = ColorPalette::category10();
    for (i, s) in series.iter().enumerate() {
        let color = palette.pick(i);
        chart
            .draw_series(s.points.iter().map(move |&(x, y, r)| {
                Circle::new((x, y), r.round() as i32, color.mix(0.7).filled())
            }))
            .context("Failed to draw point series")?
            .label(s.key.as_str())
            .legend(move |(x, y)| Circle::new((x, y), 4, color.filled()));
    }

    if series.len() > 1 {
        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()
            .context("Failed to draw legend")?;
    }

    Ok(())
}

fn draw_labeled_scatter<DB>(
    root: &DrawingArea<DB, Shift>,
    title: &str,
    x_label: &str,
    y_label: &str,
    points: &[LabeledPoint],
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let x_range = padded_range(stats::min_max(points.iter().map(|p| p.x)))?;
    let y_range = padded_range(stats::min_max(points.iter().map(|p| p.y)))?;

    let mut chart = ChartBuilder::on(root)
        .margin(10)
        .caption(title, ("sans-serif", 20))
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range, y_range)
        .context("Failed to build chart")?;

    chart
        .configure_mesh()
        .x_desc(x_label)
        .y_desc(y_label)
        .draw()
        .context("Failed to draw mesh")?;

    let color = ColorPalette::category10().pick(0);
    chart
        .draw_series(points.iter().map(|p| {
            EmptyElement::at((p.x, p.y))
                + Circle::new((0, 0), 4, color.filled())
                + Text::new(p.label.clone(), (6, -14), ("sans-serif", 13).into_font())
        }))
        .context("Failed to draw labeled points")?;

    Ok(())
}

fn draw_heatmap<DB>(
    root: &DrawingArea<DB, Shift>,
    title: &str,
    labels: &[String],
    matrix: &[Vec<f64>],
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let k = labels.len();
    if k == 0 {
        anyhow::bail!("Cannot create heatmap with no columns");
    }

    let mut chart = ChartBuilder::on(root)
        .margin(10)
        .caption(title, ("sans-serif", 20))
        .x_label_area_size(40)
        .y_label_area_size(190)
        .build_cartesian_2d(category_range(k), category_range(k))
        .context("Failed to build chart")?;

    // Row 0 is drawn at the top
    let x_formatter = |v: &f64| category_label(labels, *v);
    let y_formatter = |v: &f64| category_label(labels, (k - 1) as f64 - *v);
    chart
        .configure_mesh()
        .disable_mesh()
        .x_labels(k)
        .y_labels(k)
        .x_label_formatter(&x_formatter)
        .y_label_formatter(&y_formatter)
        .draw()
        .context("Failed to draw mesh")?;

    let cells: Vec<(f64, f64, f64)> = matrix
        .iter()
        .enumerate()
        .flat_map(|(i, row)| {
            row.iter()
                .enumerate()
                .map(move |(j, &r)| (j as f64, (k - 1 - i) as f64, r))
        })
        .collect();

    chart
        .draw_series(cells.iter().map(|&(x, y, r)| {
            Rectangle::new([(x - 0.5, y - 0.5), (x + 0.5, y + 0.5)], diverging(r).filled())
        }))
        .context("Failed to draw heatmap cells")?;

    let cell_text = TextStyle::from(("sans-serif", 14).into_font()).pos(Pos::new(HPos::Center, VPos::Center));
    chart
        .draw_series(cells.iter().map(|&(x, y, r)| {
            let text = if r.is_nan() { "nan".to_string() } else { format!("{:.2}", r) };
            Text::new(text, (x, y), cell_text.clone())
        }))
        .context("Failed to draw heatmap values")?;

    Ok(())
}

fn draw_pairplot<DB>(
    root: &DrawingArea<DB, Shift>,
    title: &str,
    labels: &[String],
    columns: &[Vec<f64>],
    densities: &[(Vec<f64>, Vec<f64>)],
    alpha: f64,
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let k = labels.len();
    if k == 0 || columns.len() != k || densities.len() != k {
        anyhow::bail!("Pairplot needs one data column and one density per label");
    }

    let ranges = columns
        .iter()
        .map(|c| padded_range(stats::min_max(c.iter().copied())))
        .collect::<Result<Vec<_>>>()?;

    let area = root.titled(title, ("sans-serif", 20)).context("Failed to draw title")?;
    let panels = area.split_evenly((k, k));
    let color = ColorPalette::category10().pick(0);

    for (idx, panel) in panels.iter().enumerate() {
        let (row, col) = (idx / k, idx % k);
        let bottom = row == k - 1;
        let left = col == 0;

        let mut builder = ChartBuilder::on(panel);
        builder
            .margin(3)
            .x_label_area_size(if bottom { 35 } else { 0 })
            .y_label_area_size(if left { 45 } else { 0 });

        if row == col {
            let (grid, density) = &densities[row];
            let x_range = ranges[col].clone();
            let curve: Vec<(f64, f64)> = grid
                .iter()
                .copied()
                .zip(density.iter().copied())
                .filter(|(x, _)| x_range.contains(x))
                .collect();
            let peak = curve.iter().map(|p| p.1).fold(0.0, f64::max);
            let y_range = finite_range(0.0..(peak * 1.1).max(f64::EPSILON))?;
            let mut chart = builder
                .build_cartesian_2d(x_range, y_range)
                .context("Failed to build density panel")?;
            draw_panel_mesh(&mut chart, labels, row, col, bottom, left)?;
            chart
                .draw_series(LineSeries::new(curve, color.stroke_width(2)))
                .context("Failed to draw density")?;
        } else {
            let mut chart = builder
                .build_cartesian_2d(ranges[col].clone(), ranges[row].clone())
                .context("Failed to build scatter panel")?;
            draw_panel_mesh(&mut chart, labels, row, col, bottom, left)?;
            chart
                .draw_series(
                    columns[col]
                        .iter()
                        .zip(columns[row].iter())
                        .map(|(&x, &y)| Circle::new((x, y), 2, color.mix(alpha).filled())),
                )
                .context("Failed to draw pair scatter")?;
        }
    }

    Ok(())
}

fn draw_panel_mesh<DB>(
    chart: &mut ChartContext<'_, DB, Cartesian2d<RangedCoordf64, RangedCoordf64>>,
    labels: &[String],
    row: usize,
    col: usize,
    bottom: bool,
    left: bool,
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    if !bottom && !left {
        return Ok(());
    }
    let mut mesh = chart.configure_mesh();
    mesh.disable_mesh().x_labels(3).y_labels(3);
    if bottom {
        mesh.x_desc(labels[col].as_str());
    }
    if left {
        mesh.y_desc(labels[row].as_str());
    }
    mesh.draw().context("Failed to draw panel mesh")?;
    Ok(())
}

fn draw_bars<DB>(
    root: &DrawingArea<DB, Shift>,
    title: &str,
    x_label: &str,
    bars: &[(String, f64)],
    palette: PaletteName,
    label_rotation: i32,
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    if bars.is_empty() {
        anyhow::bail!("Cannot create bar chart with no data");
    }

    let n = bars.len();
    let y_max = bars.iter().map(|(_, v)| *v).fold(0.0, f64::max).max(1.0);
    let categories: Vec<String> = bars.iter().map(|(k, _)| k.clone()).collect();

    let mut chart = ChartBuilder::on(root)
        .margin(10)
        .caption(title, ("sans-serif", 20))
        .x_label_area_size(if label_rotation != 0 { 110 } else { 40 })
        .y_label_area_size(50)
        .build_cartesian_2d(category_range(n), finite_range(0.0..(y_max * 1.1))?)
        .context("Failed to build chart")?;

    let formatter = |x: &f64| category_label(&categories, *x);
    let mut mesh = chart.configure_mesh();
    mesh.disable_x_mesh()
        .x_labels(n)
        .x_label_formatter(&formatter)
        .x_desc(x_label)
        .y_desc("count");
    if label_rotation != 0 {
        // plotters rotates text by right angles only
        mesh.x_label_style(("sans-serif", 12).into_font().transform(FontTransform::Rotate90));
    }
    mesh.draw().context("Failed to draw mesh")?;

    let colors = ColorPalette::named(palette, n);
    chart
        .draw_series(bars.iter().enumerate().map(|(i, (_, y))| {
            let x = i as f64;
            Rectangle::new([(x - 0.4, 0.0), (x + 0.4, *y)], colors.pick(i).filled())
        }))
        .context("Failed to draw bars")?;

    Ok(())
}

/// Start angle and sweep (radians) of each pie slice, counter-clockwise from 3 o'clock
fn pie_angles(slices: &[(String, f64)]) -> Vec<(f64, f64)> {
    let total: f64 = slices.iter().map(|(_, v)| *v).sum();
    if total <= 0.0 {
        return Vec::new();
    }
    let mut start = 0.0;
    slices
        .iter()
        .map(|(_, v)| {
            let sweep = v / total * TAU;
            let slice = (start, sweep);
            start += sweep;
            slice
        })
        .collect()
}

fn polar(center: (i32, i32), radius: f64, angle: f64) -> (i32, i32) {
    (
        center.0 + (radius * angle.cos()).round() as i32,
        center.1 - (radius * angle.sin()).round() as i32,
    )
}

fn draw_pie<DB>(
    root: &DrawingArea<DB, Shift>,
    title: &str,
    slices: &[(String, f64)],
    palette: PaletteName,
    decimals: usize,
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let angles = pie_angles(slices);
    if angles.is_empty() {
        anyhow::bail!("Cannot create pie chart with no data");
    }

    let area = root.titled(title, ("sans-serif", 20)).context("Failed to draw title")?;
    let (w, h) = area.dim_in_pixel();
    let center = (w as i32 / 2, h as i32 / 2);
    let radius = w.min(h) as f64 * 0.35;

    let colors = ColorPalette::named(palette, slices.len());
    let label_style = TextStyle::from(("sans-serif", 14).into_font()).pos(Pos::new(HPos::Center, VPos::Center));

    for (i, ((name, _), &(start, sweep))) in slices.iter().zip(angles.iter()).enumerate() {
        let steps = ((sweep / TAU) * 180.0).ceil().max(2.0) as usize;
        let mut points = vec![center];
        points.extend((0..=steps).map(|s| polar(center, radius, start + sweep * s as f64 / steps as f64)));

        area.draw(&Polygon::new(points, colors.pick(i).filled()))
            .context("Failed to draw pie slice")?;

        let mid = start + sweep / 2.0;
        let pct = sweep / TAU * 100.0;
        area.draw(&Text::new(
            format!("{} ({:.*}%)", name, decimals, pct),
            polar(center, radius * 1.2, mid),
            label_style.clone(),
        ))
        .context("Failed to draw pie label")?;
    }

    Ok(())
}

/// Computed geometry for a single vertical boxplot
struct BoxplotGeometry {
    lower_whisker: Vec<(f64, f64)>,
    upper_whisker: Vec<(f64, f64)>,
    min_cap: Vec<(f64, f64)>,
    max_cap: Vec<(f64, f64)>,
    box_tl: (f64, f64),
    box_br: (f64, f64),
    median_line: Vec<(f64, f64)>,
    outlier_points: Vec<(f64, f64)>,
}

fn compute_boxplot_geometry(x: f64, width: f64, stats: &BoxStats) -> BoxplotGeometry {
    let half_width = width / 2.0;
    let cap_half = width * 0.2;

    BoxplotGeometry {
        lower_whisker: vec![(x, stats.lower_whisker), (x, stats.q1)],
        upper_whisker: vec![(x, stats.q3), (x, stats.upper_whisker)],
        min_cap: vec![(x - cap_half, stats.lower_whisker), (x + cap_half, stats.lower_whisker)],
        max_cap: vec![(x - cap_half, stats.upper_whisker), (x + cap_half, stats.upper_whisker)],
        box_tl: (x - half_width, stats.q3),
        box_br: (x + half_width, stats.q1),
        median_line: vec![(x - half_width, stats.median), (x + half_width, stats.median)],
        outlier_points: stats.outliers.iter().map(|&v| (x, v)).collect(),
    }
}

fn draw_boxes<DB>(
    root: &DrawingArea<DB, Shift>,
    title: &str,
    x_label: &str,
    y_label: &str,
    boxes: &[(String, BoxStats)],
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let n = boxes.len();
    let y_range = padded_range(stats::min_max(boxes.iter().flat_map(|(_, b)| {
        [b.lower_whisker, b.upper_whisker]
            .into_iter()
            .chain(b.outliers.iter().copied())
    })))?;
    let categories: Vec<String> = boxes.iter().map(|(k, _)| k.clone()).collect();

    let mut chart = ChartBuilder::on(root)
        .margin(10)
        .caption(title, ("sans-serif", 20))
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(category_range(n), y_range)
        .context("Failed to build chart")?;

    let formatter = |x: &f64| category_label(&categories, *x);
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n)
        .x_label_formatter(&formatter)
        .x_desc(x_label)
        .y_desc(y_label)
        .draw()
        .context("Failed to draw mesh")?;

    let palette = ColorPalette::category10();
    for (i, (_, box_stats)) in boxes.iter().enumerate() {
        let color = palette.pick(i);
        let geom = compute_boxplot_geometry(i as f64, 0.5, box_stats);

        chart
            .draw_series(
                [geom.lower_whisker, geom.upper_whisker, geom.min_cap, geom.max_cap]
                    .into_iter()
                    .map(|line| PathElement::new(line, color.stroke_width(2))),
            )
            .context("Failed to draw whiskers")?;
        chart
            .draw_series([
                Rectangle::new([geom.box_tl, geom.box_br], color.mix(0.5).filled()),
                Rectangle::new([geom.box_tl, geom.box_br], color.stroke_width(2)),
            ])
            .context("Failed to draw box")?;
        chart
            .draw_series(std::iter::once(PathElement::new(geom.median_line, BLACK.stroke_width(2))))
            .context("Failed to draw median")?;
        chart
            .draw_series(
                geom.outlier_points
                    .iter()
                    .map(|&p| Circle::new(p, 3, color.filled())),
            )
            .context("Failed to draw outliers")?;
    }

    Ok(())
}

fn draw_grouped_bars<DB>(
    root: &DrawingArea<DB, Shift>,
    title: &str,
    x_label: &str,
    categories: &[String],
    groups: &[(String, Vec<f64>)],
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    if categories.is_empty() || groups.is_empty() {
        anyhow::bail!("Cannot create grouped bar chart with no data");
    }

    let n = categories.len();
    let y_max = groups
        .iter()
        .flat_map(|(_, counts)| counts.iter().copied())
        .fold(0.0, f64::max)
        .max(1.0);

    let mut chart = ChartBuilder::on(root)
        .margin(10)
        .caption(title, ("sans-serif", 20))
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(category_range(n), finite_range(0.0..(y_max * 1.1))?)
        .context("Failed to build chart")?;

    let formatter = |x: &f64| category_label(categories, *x);
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n)
        .x_label_formatter(&formatter)
        .x_desc(x_label)
        .y_desc("count")
        .draw()
        .context("Failed to draw mesh")?;

    // Side-by-side bars
    let num_series = groups.len();
    let bar_width = 0.8 / num_series as f64;
    let palette = ColorPalette::category10();

    for (series_idx, (key, counts)) in groups.iter().enumerate() {
        let color = palette.pick(series_idx);
        let x_offset = (series_idx as f64 - (num_series as f64 - 1.0) / 2.0) * bar_width;

        chart
            .draw_series(counts.iter().enumerate().map(move |(cat_idx, &y)| {
                let x_center = cat_idx as f64 + x_offset;
                Rectangle::new(
                    [(x_center - bar_width / 2.0, 0.0), (x_center + bar_width / 2.0, y)],
                    color.filled(),
                )
            }))
            .context("Failed to draw bar group")?
            .label(key.as_str())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .context("Failed to draw legend")?;

    Ok(())
}
