// Summary statistics behind the dashboard charts

use std::collections::HashMap;

/// Category frequencies in order of first appearance. Missing cells are not counted.
pub fn value_counts(labels: &[Option<String>]) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();

    for label in labels.iter().flatten() {
        match positions.get(label.as_str()) {
            Some(&pos) => counts[pos].1 += 1,
            None => {
                positions.insert(label.as_str(), counts.len());
                counts.push((label.clone(), 1));
            }
        }
    }
    counts
}

/// Category frequencies, most frequent first. Ties keep first-appearance order.
pub fn value_counts_descending(labels: &[Option<String>]) -> Vec<(String, usize)> {
    let mut counts = value_counts(labels);
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}

/// Linear-interpolated percentile of already sorted data
pub fn percentile(sorted_data: &[f64], p: f64) -> f64 {
    let n = sorted_data.len();
    if n == 0 { return 0.0; }
    if n == 1 { return sorted_data[0]; }

    let rank = p * (n - 1) as f64;
    let lower_idx = rank.floor() as usize;
    let upper_idx = rank.ceil() as usize;

    if lower_idx == upper_idx {
        sorted_data[lower_idx]
    } else {
        let weight = rank - lower_idx as f64;
        sorted_data[lower_idx] * (1.0 - weight) + sorted_data[upper_idx] * weight
    }
}

/// Five-number summary plus outliers for one box
#[derive(Debug, Clone, PartialEq)]
pub struct BoxStats {
    pub lower_whisker: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub upper_whisker: f64,
    pub outliers: Vec<f64>,
    /// Values summarized
    pub count: usize,
}

/// Tukey box statistics: whiskers reach the most extreme data within 1.5 IQR.
/// `None` for empty input.
pub fn box_stats(values: &[f64]) -> Option<BoxStats> {
    if values.is_empty() {
        return None;
    }
    let mut ys = values.to_vec();
    ys.sort_by(|a, b| a.total_cmp(b));

    let q1 = percentile(&ys, 0.25);
    let median = percentile(&ys, 0.50);
    let q3 = percentile(&ys, 0.75);
    let iqr = q3 - q1;

    let lower_fence = q1 - 1.5 * iqr;
    let upper_fence = q3 + 1.5 * iqr;

    let lower_whisker = ys.iter().copied().find(|&v| v >= lower_fence).unwrap_or(q1);
    let upper_whisker = ys.iter().rev().copied().find(|&v| v <= upper_fence).unwrap_or(q3);
    let outliers = ys
        .iter()
        .copied()
        .filter(|&v| v < lower_fence || v > upper_fence)
        .collect();

    Some(BoxStats {
        lower_whisker,
        q1,
        median,
        q3,
        upper_whisker,
        outliers,
        count: ys.len(),
    })
}

/// Pearson correlation over the rows where both sides are present.
/// NaN with fewer than two complete pairs or zero variance.
pub fn pearson_pairwise(xs: &[Option<f64>], ys: &[Option<f64>]) -> f64 {
    let pairs: Vec<(f64, f64)> = xs
        .iter()
        .zip(ys.iter())
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .collect();

    let n = pairs.len() as f64;
    if pairs.len() < 2 {
        return f64::NAN;
    }

    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in &pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return f64::NAN;
    }
    (cov / (var_x.sqrt() * var_y.sqrt())).clamp(-1.0, 1.0)
}

/// Symmetric correlation matrix over the given columns
pub fn correlation_matrix(columns: &[Vec<Option<f64>>]) -> Vec<Vec<f64>> {
    let k = columns.len();
    let mut matrix = vec![vec![f64::NAN; k]; k];
    for i in 0..k {
        for j in i..k {
            let r = pearson_pairwise(&columns[i], &columns[j]);
            matrix[i][j] = r;
            matrix[j][i] = r;
        }
    }
    matrix
}

/// Silverman's rule of thumb for bandwidth selection
pub fn silverman_bandwidth(data: &[f64]) -> f64 {
    let n = data.len() as f64;
    if n < 2.0 { return 1.0; }

    let mean = data.iter().sum::<f64>() / n;
    let variance = data.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let std_dev = variance.sqrt();

    // IQR-based estimate for robustness
    let mut sorted = data.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let q1 = percentile(&sorted, 0.25);
    let q3 = percentile(&sorted, 0.75);
    let iqr = q3 - q1;

    // h = 0.9 * min(std, IQR/1.34) * n^(-1/5)
    let scale = if iqr > 0.0 { std_dev.min(iqr / 1.34) } else { std_dev };
    if scale <= 0.0 { return 1.0; }
    0.9 * scale * n.powf(-0.2)
}

fn gaussian_kernel(u: f64) -> f64 {
    const SQRT_2PI: f64 = 2.5066282746310002;
    (-0.5 * u * u).exp() / SQRT_2PI
}

/// Gaussian KDE evaluated on an evenly spaced grid.
/// Returns (grid, density); density is not normalised.
pub fn kde(data: &[f64], grid_points: usize) -> (Vec<f64>, Vec<f64>) {
    let n = data.len() as f64;
    if data.is_empty() || grid_points < 2 { return (vec![], vec![]); }

    let bandwidth = silverman_bandwidth(data);
    let min_x = data.iter().fold(f64::INFINITY, |a, &b| a.min(b));
    let max_x = data.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));

    // Extend range slightly for smooth edges
    let start = min_x - 3.0 * bandwidth;
    let end = max_x + 3.0 * bandwidth;
    let step = (end - start) / (grid_points - 1) as f64;

    let mut grid = Vec::with_capacity(grid_points);
    let mut density = Vec::with_capacity(grid_points);
    for i in 0..grid_points {
        let x = start + i as f64 * step;
        grid.push(x);
        let d: f64 = data.iter().map(|&xi| gaussian_kernel((x - xi) / bandwidth)).sum();
        density.push(d / (n * bandwidth));
    }

    (grid, density)
}

/// Minimum and maximum of finite values, `None` if there are none
pub fn min_max(values: impl IntoIterator<Item = f64>) -> Option<(f64, f64)> {
    values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn labels(values: &[&str]) -> Vec<Option<String>> {
        values
            .iter()
            .map(|v| if v.is_empty() { None } else { Some(v.to_string()) })
            .collect()
    }

    #[test]
    fn test_value_counts_first_appearance() {
        let counts = value_counts(&labels(&["Rain", "Sunny", "", "Rain", "Fog"]));
        assert_eq!(
            counts,
            vec![("Rain".to_string(), 2), ("Sunny".to_string(), 1), ("Fog".to_string(), 1)]
        );
    }

    #[test]
    fn test_value_counts_descending_stable() {
        let counts = value_counts_descending(&labels(&["Fog", "Rain", "Sunny", "Rain", "Sunny", "Sunny"]));
        assert_eq!(
            counts,
            vec![("Sunny".to_string(), 3), ("Rain".to_string(), 2), ("Fog".to_string(), 1)]
        );
    }

    #[test]
    fn test_percentile() {
        let data = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(percentile(&data, 0.0), 1.0);
        assert_eq!(percentile(&data, 0.5), 2.5);
        assert_eq!(percentile(&data, 1.0), 4.0);
        assert_eq!(percentile(&[], 0.5), 0.0);
    }

    #[test]
    fn test_box_stats_with_outlier() {
        let stats = box_stats(&[1.0, 2.0, 3.0, 4.0, 5.0, 100.0]).unwrap();
        assert_eq!(stats.median, 3.5);
        assert_eq!(stats.q1, 2.25);
        assert_eq!(stats.q3, 4.75);
        assert_eq!(stats.lower_whisker, 1.0);
        assert_eq!(stats.upper_whisker, 5.0);
        assert_eq!(stats.outliers, vec![100.0]);
        assert_eq!(stats.count, 6);
    }

    #[test]
    fn test_box_stats_empty() {
        assert!(box_stats(&[]).is_none());
    }

    #[test]
    fn test_pearson_perfect() {
        let xs = vec![Some(1.0), Some(2.0), Some(3.0)];
        let ys = vec![Some(2.0), Some(4.0), Some(6.0)];
        assert!((pearson_pairwise(&xs, &ys) - 1.0).abs() < 1e-12);
        let neg = vec![Some(3.0), Some(2.0), Some(1.0)];
        assert!((pearson_pairwise(&xs, &neg) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_pearson_pairwise_deletion() {
        let xs = vec![Some(1.0), None, Some(2.0), Some(3.0)];
        let ys = vec![Some(2.0), Some(100.0), Some(4.0), Some(6.0)];
        assert!((pearson_pairwise(&xs, &ys) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_pearson_degenerate() {
        let xs = vec![Some(1.0), Some(1.0), Some(1.0)];
        let ys = vec![Some(2.0), Some(4.0), Some(6.0)];
        assert!(pearson_pairwise(&xs, &ys).is_nan());
        assert!(pearson_pairwise(&[Some(1.0)], &[Some(2.0)]).is_nan());
    }

    #[test]
    fn test_correlation_matrix_symmetric() {
        let columns = vec![
            vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0)],
            vec![Some(1.0), Some(3.0), Some(2.0), Some(5.0)],
        ];
        let m = correlation_matrix(&columns);
        assert!((m[0][0] - 1.0).abs() < 1e-12);
        assert_eq!(m[0][1], m[1][0]);
    }

    #[test]
    fn test_kde_peaks_near_data() {
        let (grid, density) = kde(&[5.0, 5.1, 4.9, 5.0], 64);
        assert_eq!(grid.len(), 64);
        let peak = density
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| grid[i])
            .unwrap();
        assert!((peak - 5.0).abs() < 0.5);
    }

    #[test]
    fn test_min_max_ignores_nan() {
        assert_eq!(min_max(vec![3.0, f64::NAN, -1.0]), Some((-1.0, 3.0)));
        assert_eq!(min_max(Vec::<f64>::new()), None);
    }
}
