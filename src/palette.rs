use plotters::style::RGBColor;

use crate::ir::PaletteName;

/// An ordered list of colors handed out to categories in turn
#[derive(Debug, Clone)]
pub struct ColorPalette {
    colors: Vec<RGBColor>,
}

impl ColorPalette {
    pub fn category10() -> Self {
        Self {
            colors: vec![
                RGBColor(31, 119, 180),
                RGBColor(255, 127, 14),
                RGBColor(44, 160, 44),
                RGBColor(214, 39, 40),
                RGBColor(148, 103, 189),
                RGBColor(140, 86, 75),
                RGBColor(227, 119, 194),
                RGBColor(127, 127, 127),
                RGBColor(188, 189, 34),
                RGBColor(23, 190, 207),
            ],
        }
    }

    pub fn set2() -> Self {
        Self {
            colors: vec![
                RGBColor(102, 194, 165),
                RGBColor(252, 141, 98),
                RGBColor(141, 160, 203),
                RGBColor(231, 138, 195),
                RGBColor(166, 216, 84),
                RGBColor(255, 217, 47),
                RGBColor(229, 196, 148),
                RGBColor(179, 179, 179),
            ],
        }
    }

    pub fn pastel() -> Self {
        Self {
            colors: vec![
                RGBColor(161, 201, 244),
                RGBColor(255, 180, 130),
                RGBColor(141, 229, 161),
                RGBColor(255, 159, 155),
                RGBColor(208, 187, 255),
                RGBColor(222, 187, 155),
                RGBColor(250, 176, 228),
                RGBColor(207, 207, 207),
                RGBColor(255, 254, 163),
                RGBColor(185, 242, 240),
            ],
        }
    }

    /// `n` colors evenly spaced in hue
    pub fn husl(n: usize) -> Self {
        let n = n.max(1);
        let colors = (0..n)
            .map(|i| hsl_to_rgb(0.01 + i as f64 / n as f64, 0.65, 0.6))
            .collect();
        Self { colors }
    }

    /// Palette sized for `n` categories
    pub fn named(name: PaletteName, n: usize) -> Self {
        match name {
            PaletteName::Category10 => Self::category10(),
            PaletteName::Set2 => Self::set2(),
            PaletteName::Pastel => Self::pastel(),
            PaletteName::Husl => Self::husl(n),
        }
    }

    /// Color for the i-th category, cycling when categories outnumber colors
    pub fn pick(&self, i: usize) -> RGBColor {
        self.colors[i % self.colors.len()]
    }
}

fn hsl_to_rgb(h: f64, s: f64, l: f64) -> RGBColor {
    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let hp = (h.fract() * 6.0).rem_euclid(6.0);
    let x = c * (1.0 - (hp % 2.0 - 1.0).abs());
    let (r, g, b) = match hp as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = l - c / 2.0;
    let to_u8 = |v: f64| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    RGBColor(to_u8(r), to_u8(g), to_u8(b))
}

/// Diverging blue-white-red scale for values in [-1, 1]; grey for NaN
pub fn diverging(value: f64) -> RGBColor {
    if value.is_nan() {
        return RGBColor(200, 200, 200);
    }
    let t = value.clamp(-1.0, 1.0);
    let blue = (59.0, 76.0, 192.0);
    let white = (247.0, 247.0, 247.0);
    let red = (180.0, 4.0, 38.0);
    let (from, to, w) = if t < 0.0 { (white, blue, -t) } else { (white, red, t) };
    let lerp = |a: f64, b: f64| (a + (b - a) * w).round() as u8;
    RGBColor(lerp(from.0, to.0), lerp(from.1, to.1), lerp(from.2, to.2))
}

/// Map a value linearly from `domain` into `range`; the midpoint of the
/// range when the domain is degenerate
pub fn scale_linear(value: f64, domain: (f64, f64), range: (f64, f64)) -> f64 {
    let span = domain.1 - domain.0;
    if span.abs() < f64::EPSILON || !value.is_finite() {
        return (range.0 + range.1) / 2.0;
    }
    let t = ((value - domain.0) / span).clamp(0.0, 1.0);
    range.0 + t * (range.1 - range.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pick_cycles() {
        let palette = ColorPalette::set2();
        assert_eq!(palette.pick(0), palette.pick(8));
    }

    #[test]
    fn test_husl_sized() {
        let palette = ColorPalette::husl(4);
        assert_ne!(palette.pick(0), palette.pick(1));
        assert_eq!(palette.pick(0), palette.pick(4));
    }

    #[test]
    fn test_diverging_endpoints() {
        assert_eq!(diverging(0.0), RGBColor(247, 247, 247));
        assert_eq!(diverging(1.0), RGBColor(180, 4, 38));
        assert_eq!(diverging(-1.0), RGBColor(59, 76, 192));
        assert_eq!(diverging(f64::NAN), RGBColor(200, 200, 200));
    }

    #[test]
    fn test_scale_linear() {
        assert_eq!(scale_linear(5.0, (0.0, 10.0), (3.0, 13.0)), 8.0);
        assert_eq!(scale_linear(50.0, (0.0, 10.0), (3.0, 13.0)), 13.0);
        assert_eq!(scale_linear(4.0, (4.0, 4.0), (3.0, 13.0)), 8.0);
    }
}
