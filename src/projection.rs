use crate::types::GeoFeature;
use geo::{Coord, LineString, MultiPolygon};
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};
use std::fmt::Write;

// Web Mercator latitude limit; the projection diverges at the poles.
const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// Mercator projection with a uniform scale and pixel translation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub scale: f64,
    pub translate: (f64, f64),
}

fn mercator_raw(lon: f64, lat: f64) -> (f64, f64) {
    let lambda = lon.to_radians();
    let phi = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    (lambda, (FRAC_PI_4 + phi / 2.0).tan().ln())
}

impl Projection {
    /// Fits all feature geometry into a `width` x `height` pixel box, centered.
    pub fn fit_size(width: f64, height: f64, features: &[GeoFeature]) -> Self {
        let mut bounds: Option<(f64, f64, f64, f64)> = None;
        for coord in features
            .iter()
            .filter_map(|f| f.geometry.as_ref())
            .flat_map(rings)
            .flat_map(|ring| ring.0.iter())
        {
            let (x, y) = mercator_raw(coord.x, coord.y);
            let y = -y;
            bounds = Some(match bounds {
                None => (x, y, x, y),
                Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
            });
        }

        let Some((x0, y0, x1, y1)) = bounds else {
            return Self {
                scale: 1.0,
                translate: (width / 2.0, height / 2.0),
            };
        };

        let kx = width / (x1 - x0);
        let ky = height / (y1 - y0);
        let k = match (kx.is_finite(), ky.is_finite()) {
            (true, true) => kx.min(ky),
            (true, false) => kx,
            (false, true) => ky,
            (false, false) => 1.0,
        };

        Self {
            scale: k,
            translate: ((width - k * (x1 + x0)) / 2.0, (height - k * (y1 + y0)) / 2.0),
        }
    }

    /// Longitude/latitude in degrees to pixels.
    pub fn project(&self, lon: f64, lat: f64) -> (f64, f64) {
        let (x, y) = mercator_raw(lon, lat);
        (
            x * self.scale + self.translate.0,
            self.translate.1 - y * self.scale,
        )
    }

    /// Pixels back to longitude/latitude in degrees.
    pub fn invert(&self, px: f64, py: f64) -> (f64, f64) {
        let x = (px - self.translate.0) / self.scale;
        let y = (self.translate.1 - py) / self.scale;
        let lat = 2.0 * y.exp().atan() - FRAC_PI_2;
        (x.to_degrees(), lat.to_degrees())
    }

    /// SVG path data for `geometry`: one `M…L…Z` subpath per ring.
    pub fn path(&self, geometry: &MultiPolygon<f64>) -> String {
        let mut d = String::new();
        for ring in rings(geometry) {
            let points = open_ring(ring);
            for (i, coord) in points.iter().enumerate() {
                let (x, y) = self.project(coord.x, coord.y);
                let cmd = if i == 0 { 'M' } else { 'L' };
                let _ = write!(d, "{}{},{}", cmd, fmt_coord(x), fmt_coord(y));
            }
            if !points.is_empty() {
                d.push('Z');
            }
        }
        d
    }
}

fn rings(geometry: &MultiPolygon<f64>) -> impl Iterator<Item = &LineString<f64>> {
    geometry
        .0
        .iter()
        .flat_map(|p| std::iter::once(p.exterior()).chain(p.interiors().iter()))
}

// Drops the closing coordinate; `Z` closes the subpath.
fn open_ring(ring: &LineString<f64>) -> &[Coord<f64>] {
    let coords = ring.0.as_slice();
    match (coords.first(), coords.last()) {
        (Some(first), Some(last)) if coords.len() > 1 && first == last => &coords[..coords.len() - 1],
        _ => coords,
    }
}

fn fmt_coord(v: f64) -> String {
    let rounded = (v * 1000.0).round() / 1000.0;
    if rounded == 0.0 {
        "0".to_string()
    } else {
        rounded.to_string()
    }
}
