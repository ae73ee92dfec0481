//! Color ramps, sequential color scales and the numeric helpers the legend
//! needs (quantiles, extents, linear ticks).

use crate::types::VariableKey;
use std::fmt;

/// An sRGB color with 8-bit channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgb({}, {}, {})", self.0, self.1, self.2)
    }
}

type Scheme = [[f64; 3]; 9];

// 9-class ColorBrewer sequential schemes, light to dark.
const REDS: Scheme = [
    [255.0, 245.0, 240.0],
    [254.0, 224.0, 210.0],
    [252.0, 187.0, 161.0],
    [252.0, 146.0, 114.0],
    [251.0, 106.0, 74.0],
    [239.0, 59.0, 44.0],
    [203.0, 24.0, 29.0],
    [165.0, 15.0, 21.0],
    [103.0, 0.0, 13.0],
];

const GREENS: Scheme = [
    [247.0, 252.0, 245.0],
    [229.0, 245.0, 224.0],
    [199.0, 233.0, 192.0],
    [161.0, 217.0, 155.0],
    [116.0, 196.0, 118.0],
    [65.0, 171.0, 93.0],
    [35.0, 139.0, 69.0],
    [0.0, 109.0, 44.0],
    [0.0, 68.0, 27.0],
];

const BLUES: Scheme = [
    [247.0, 251.0, 255.0],
    [222.0, 235.0, 247.0],
    [198.0, 219.0, 239.0],
    [158.0, 202.0, 225.0],
    [107.0, 174.0, 214.0],
    [66.0, 146.0, 198.0],
    [33.0, 113.0, 181.0],
    [8.0, 81.0, 156.0],
    [8.0, 48.0, 107.0],
];

const ORANGES: Scheme = [
    [255.0, 245.0, 235.0],
    [254.0, 230.0, 206.0],
    [253.0, 208.0, 162.0],
    [253.0, 174.0, 107.0],
    [253.0, 141.0, 60.0],
    [241.0, 105.0, 19.0],
    [217.0, 72.0, 1.0],
    [166.0, 54.0, 3.0],
    [127.0, 39.0, 4.0],
];

/// Single-hue sequential ramps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ramp {
    Reds,
    Greens,
    Blues,
    Oranges,
}

impl Ramp {
    fn scheme(&self) -> &'static Scheme {
        match self {
            Ramp::Reds => &REDS,
            Ramp::Greens => &GREENS,
            Ramp::Blues => &BLUES,
            Ramp::Oranges => &ORANGES,
        }
    }

    /// Color at `t` in [0, 1]; `t` is clamped. Channels follow a uniform
    /// cubic B-spline through the scheme colors.
    pub fn interpolate(&self, t: f64) -> Rgb {
        let scheme = self.scheme();
        Rgb(
            to_byte(basis_spline(scheme, 0, t)),
            to_byte(basis_spline(scheme, 1, t)),
            to_byte(basis_spline(scheme, 2, t)),
        )
    }
}

fn to_byte(v: f64) -> u8 {
    // round half up, then clamp
    (v + 0.5).floor().clamp(0.0, 255.0) as u8
}

fn basis(t1: f64, v0: f64, v1: f64, v2: f64, v3: f64) -> f64 {
    let t2 = t1 * t1;
    let t3 = t2 * t1;
    ((1.0 - 3.0 * t1 + 3.0 * t2 - t3) * v0
        + (4.0 - 6.0 * t2 + 3.0 * t3) * v1
        + (1.0 + 3.0 * t1 + 3.0 * t2 - 3.0 * t3) * v2
        + t3 * v3)
        / 6.0
}

fn basis_spline(scheme: &Scheme, channel: usize, t: f64) -> f64 {
    let n = scheme.len() - 1;
    let (t, i) = if t.is_nan() || t <= 0.0 {
        (0.0, 0)
    } else if t >= 1.0 {
        (1.0, n - 1)
    } else {
        (t, (t * n as f64).floor() as usize)
    };
    let v1 = scheme[i][channel];
    let v2 = scheme[i + 1][channel];
    let v0 = if i > 0 { scheme[i - 1][channel] } else { 2.0 * v1 - v2 };
    let v3 = if i < n - 1 { scheme[i + 2][channel] } else { 2.0 * v2 - v1 };
    basis((t - i as f64 / n as f64) * n as f64, v0, v1, v2, v3)
}

/// Fixed variable → ramp binding.
pub fn ramp_for(variable: VariableKey) -> Ramp {
    match variable {
        VariableKey::SleepDeprivation => Ramp::Reds,
        VariableKey::MedianIncome => Ramp::Greens,
        VariableKey::EducationBaPlus => Ramp::Blues,
        VariableKey::PovertyRate => Ramp::Oranges,
    }
}

/// A sequential color scale: maps [min, max] linearly onto a ramp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorScale {
    pub ramp: Ramp,
    pub domain: (f64, f64),
}

impl ColorScale {
    pub fn new(ramp: Ramp) -> Self {
        Self {
            ramp,
            domain: (0.0, 1.0),
        }
    }

    /// Scale for `variable` with its domain set to the extent of `values`.
    pub fn activate(variable: VariableKey, values: &[f64]) -> Self {
        let mut scale = Self::new(ramp_for(variable));
        if let Some(domain) = extent(values) {
            scale.domain = domain;
        }
        scale
    }

    pub fn color(&self, value: f64) -> Rgb {
        let (x0, x1) = self.domain;
        let t = if x1 == x0 { 0.5 } else { (value - x0) / (x1 - x0) };
        self.ramp.interpolate(t)
    }
}

/// One sequential scale per variable.
#[derive(Debug, Clone)]
pub struct ScaleRegistry {
    scales: Vec<(VariableKey, ColorScale)>,
}

impl Default for ScaleRegistry {
    fn default() -> Self {
        Self {
            scales: VariableKey::ALL
                .into_iter()
                .map(|key| (key, ColorScale::new(ramp_for(key))))
                .collect(),
        }
    }
}

impl ScaleRegistry {
    /// Sets the domain of `variable`'s scale to the extent of `values` and
    /// returns it.
    pub fn activate(&mut self, variable: VariableKey, values: &[f64]) -> ColorScale {
        let activated = ColorScale::activate(variable, values);
        for (key, scale) in self.scales.iter_mut() {
            if *key == variable {
                *scale = activated;
            }
        }
        activated
    }

    pub fn get(&self, variable: VariableKey) -> Option<&ColorScale> {
        self.scales
            .iter()
            .find(|(key, _)| *key == variable)
            .map(|(_, scale)| scale)
    }
}

/// `[min, max]` of the non-NaN values, or `None` if there are none.
pub fn extent(values: &[f64]) -> Option<(f64, f64)> {
    values
        .iter()
        .copied()
        .filter(|v| !v.is_nan())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// Quantile `p` of `values` using linear interpolation between closest ranks
/// (R-7). Values need not be sorted.
pub fn quantile(values: &[f64], p: f64) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if sorted.is_empty() || p.is_nan() {
        return None;
    }
    sorted.sort_by(|a, b| a.total_cmp(b));
    let n = sorted.len();
    if p <= 0.0 || n < 2 {
        return Some(sorted[0]);
    }
    if p >= 1.0 {
        return Some(sorted[n - 1]);
    }
    let i = (n - 1) as f64 * p;
    let i0 = i.floor() as usize;
    let v0 = sorted[i0];
    let v1 = sorted[i0 + 1];
    Some(v0 + (v1 - v0) * (i - i0 as f64))
}

/// Linear scale from a numeric domain onto a pixel range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearScale {
    pub domain: (f64, f64),
    pub range: (f64, f64),
}

impl LinearScale {
    pub fn map(&self, value: f64) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        let t = if d1 == d0 { 0.5 } else { (value - d0) / (d1 - d0) };
        r0 + (r1 - r0) * t
    }

    pub fn ticks(&self, count: usize) -> Vec<f64> {
        ticks(self.domain.0, self.domain.1, count as f64)
    }
}

fn round_half_up(x: f64) -> f64 {
    (x + 0.5).floor()
}

fn tick_spec(start: f64, stop: f64, count: f64) -> (f64, f64, f64) {
    let e10 = 50f64.sqrt();
    let e5 = 10f64.sqrt();
    let e2 = 2f64.sqrt();

    let step = (stop - start) / count.max(0.0);
    let power = step.log10().floor();
    let error = step / 10f64.powf(power);
    let factor = if error >= e10 {
        10.0
    } else if error >= e5 {
        5.0
    } else if error >= e2 {
        2.0
    } else {
        1.0
    };

    let mut i1;
    let mut i2;
    let inc;
    if power < 0.0 {
        let inv = 10f64.powf(-power) / factor;
        i1 = round_half_up(start * inv);
        i2 = round_half_up(stop * inv);
        if i1 / inv < start {
            i1 += 1.0;
        }
        if i2 / inv > stop {
            i2 -= 1.0;
        }
        inc = -inv;
    } else {
        inc = 10f64.powf(power) * factor;
        i1 = round_half_up(start / inc);
        i2 = round_half_up(stop / inc);
        if i1 * inc < start {
            i1 += 1.0;
        }
        if i2 * inc > stop {
            i2 -= 1.0;
        }
    }

    if i2 < i1 && (0.5..2.0).contains(&count) {
        return tick_spec(start, stop, count * 2.0);
    }
    (i1, i2, inc)
}

/// Roughly `count` evenly spaced "nice" values covering `[start, stop]`.
pub fn ticks(start: f64, stop: f64, count: f64) -> Vec<f64> {
    if !(count > 0.0) || start.is_nan() || stop.is_nan() {
        return Vec::new();
    }
    if start == stop {
        return vec![start];
    }
    let reverse = stop < start;
    let (lo, hi) = if reverse { (stop, start) } else { (start, stop) };
    let (i1, i2, inc) = tick_spec(lo, hi, count);
    if !(i2 >= i1) {
        return Vec::new();
    }

    let n = (i2 - i1) as usize + 1;
    let mut out: Vec<f64> = (0..n)
        .map(|i| {
            let k = i1 + i as f64;
            if inc < 0.0 {
                k / -inc
            } else {
                k * inc
            }
        })
        .collect();
    if reverse {
        out.reverse();
    }
    out
}

/// Fixed-point formatting with `digits` decimals, e.g. `.1f`. Exact ties
/// round away from zero, so 0.125 becomes "0.13" at two places.
pub fn format_fixed(value: f64, digits: usize) -> String {
    if let Some(tie) = format_tie(value, digits) {
        return tie;
    }
    let formatted = format!("{:.*}", digits, value);
    // "-0.0" prints as "0.0"
    if formatted.starts_with('-') && formatted[1..].chars().all(|c| c == '0' || c == '.') {
        formatted[1..].to_string()
    } else {
        formatted
    }
}

// `value` sits exactly halfway between two `digits`-place decimals iff
// `|value| * 2^(digits + 1)` is an odd integer. Scaling by a power of two is
// exact, so the check is too.
fn format_tie(value: f64, digits: usize) -> Option<String> {
    if !value.is_finite() || digits > 20 {
        return None;
    }
    let halves = value.abs() * 2f64.powi(digits as i32 + 1);
    if halves.fract() != 0.0 || halves >= 2f64.powi(64) {
        return None;
    }
    let halves = halves as u128;
    if halves % 2 == 0 {
        return None;
    }

    let rounded = (halves * 5u128.pow(digits as u32) + 1) / 2;
    let sign = if value < 0.0 { "-" } else { "" };
    if digits == 0 {
        return Some(format!("{}{}", sign, rounded));
    }
    let scale = 10u128.pow(digits as u32);
    Some(format!(
        "{}{}.{:0width$}",
        sign,
        rounded / scale,
        rounded % scale,
        width = digits
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ramp_endpoints_match_scheme() {
        assert_eq!(Ramp::Reds.interpolate(0.0), Rgb(0xff, 0xf5, 0xf0));
        assert_eq!(Ramp::Reds.interpolate(1.0), Rgb(0x67, 0x00, 0x0d));
        assert_eq!(Ramp::Blues.interpolate(-3.0), Ramp::Blues.interpolate(0.0));
        assert_eq!(Ramp::Blues.interpolate(7.0), Rgb(0x08, 0x30, 0x6b));
    }

    #[test]
    fn ramp_values_follow_the_spline() {
        // t = 0.5 and t = 0.25 land on knots: (v[i-1] + 4 v[i] + v[i+1]) / 6
        assert_eq!(Ramp::Reds.interpolate(0.5), Rgb(249, 105, 76));
        assert_eq!(Ramp::Blues.interpolate(0.5), Rgb(109, 174, 213));
        assert_eq!(Ramp::Greens.interpolate(0.25), Rgb(198, 232, 191));
    }

    #[test]
    fn color_formats_like_css() {
        assert_eq!(Rgb(1, 2, 3).to_string(), "rgb(1, 2, 3)");
    }

    #[test]
    fn degenerate_domain_maps_to_midpoint() {
        let scale = ColorScale::activate(VariableKey::SleepDeprivation, &[42.5]);
        assert_eq!(scale.domain, (42.5, 42.5));
        assert_eq!(scale.color(42.5), Ramp::Reds.interpolate(0.5));
        assert_eq!(scale.color(0.0), Ramp::Reds.interpolate(0.5));
    }

    #[test]
    fn scale_clamps_outside_domain() {
        let scale = ColorScale::activate(VariableKey::PovertyRate, &[10.0, 20.0]);
        assert_eq!(scale.color(5.0), Ramp::Oranges.interpolate(0.0));
        assert_eq!(scale.color(25.0), Ramp::Oranges.interpolate(1.0));
    }

    #[test]
    fn registry_binds_fixed_ramps() {
        let mut registry = ScaleRegistry::default();
        assert_eq!(registry.get(VariableKey::MedianIncome).unwrap().ramp, Ramp::Greens);
        let scale = registry.activate(VariableKey::EducationBaPlus, &[3.0, 1.0, 2.0]);
        assert_eq!(scale.ramp, Ramp::Blues);
        assert_eq!(registry.get(VariableKey::EducationBaPlus).unwrap().domain, (1.0, 3.0));
    }

    #[test]
    fn quantile_interpolates_between_ranks() {
        let values = [4.0, 1.0, 3.0, 2.0];
        assert_eq!(quantile(&values, 0.0), Some(1.0));
        assert_eq!(quantile(&values, 1.0), Some(4.0));
        assert_eq!(quantile(&values, 0.5), Some(2.5));
        assert_eq!(quantile(&[7.0], 0.3), Some(7.0));
        assert_eq!(quantile(&[], 0.5), None);
    }

    #[test]
    fn extent_ignores_nan() {
        assert_eq!(extent(&[3.0, f64::NAN, -1.0]), Some((-1.0, 3.0)));
        assert_eq!(extent(&[]), None);
    }

    #[test]
    fn ticks_are_nice() {
        assert_eq!(ticks(0.0, 10.0, 5.0), vec![0.0, 2.0, 4.0, 6.0, 8.0, 10.0]);
        assert_eq!(ticks(0.0, 1.0, 5.0), vec![0.0, 0.2, 0.4, 0.6, 0.8, 1.0]);
        assert_eq!(ticks(12.3, 47.9, 5.0), vec![20.0, 30.0, 40.0]);
        assert_eq!(ticks(5.0, 5.0, 5.0), vec![5.0]);
        assert_eq!(ticks(10.0, 0.0, 5.0), vec![10.0, 8.0, 6.0, 4.0, 2.0, 0.0]);
    }

    #[test]
    fn linear_scale_inverts_range() {
        let scale = LinearScale { domain: (0.0, 10.0), range: (300.0, 0.0) };
        assert_eq!(scale.map(0.0), 300.0);
        assert_eq!(scale.map(10.0), 0.0);
        assert_eq!(scale.map(5.0), 150.0);
    }

    #[test]
    fn fixed_format() {
        assert_eq!(format_fixed(42.5, 2), "42.50");
        assert_eq!(format_fixed(0.26, 1), "0.3");
        assert_eq!(format_fixed(-0.01, 1), "0.0");
    }

    #[test]
    fn fixed_format_rounds_exact_ties_away_from_zero() {
        assert_eq!(format_fixed(0.125, 2), "0.13");
        assert_eq!(format_fixed(0.375, 2), "0.38");
        assert_eq!(format_fixed(12.625, 2), "12.63");
        assert_eq!(format_fixed(0.25, 1), "0.3");
        assert_eq!(format_fixed(-0.125, 2), "-0.13");
        assert_eq!(format_fixed(2.5, 0), "3");
        // 1.005 is stored just below the tie
        assert_eq!(format_fixed(1.005, 2), "1.00");
        assert_eq!(format_fixed(0.75, 2), "0.75");
    }
}
