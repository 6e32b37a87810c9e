//! Feature rasterization
//!
//! Turns one layer's matched vector geometry into a binary mask in pixel
//! space. Areal features are scan-filled with the even-odd rule; linear
//! features are buffered to half the layer's declared width in metric
//! space before filling. The projected CRS runs at one pixel per meter,
//! so metric widths translate directly into pixel widths.

use glam::DVec2;

use crate::bbox::{self, BoundingBox};
use crate::error::Result;
use crate::features::{FeatureSource, Geometry};
use crate::mask::LayerMask;
use crate::schema::Layer;

/// Rasterizes every feature matching `layer.tags` into a fresh mask.
///
/// A layer without tags never queries the source and yields an all-zero
/// mask; it only gains pixels through the compositor's base fill.
pub fn rasterize(
    layer: &Layer,
    bbox: &BoundingBox,
    source: &dyn FeatureSource,
) -> Result<LayerMask> {
    let mut mask = LayerMask::new(bbox.width, bbox.height);
    if !layer.has_tags() {
        return Ok(mask);
    }

    for geometry in source.query(&layer.tags, bbox)? {
        match geometry {
            Geometry::Areal(rings) => {
                let rings = project_rings(&rings, bbox)?;
                fill_polygon(&mut mask, &rings);
            }
            Geometry::Linear(path) => {
                // Width is mandatory for line features; without one the
                // geometry has zero area and contributes nothing.
                if let Some(width) = layer.width {
                    let path = project_path(&path, bbox)?;
                    fill_buffered_path(&mut mask, &path, width / 2.0);
                }
            }
        }
    }

    Ok(mask)
}

/// Maps a metric coordinate into continuous pixel space: columns grow
/// eastward from `min_x`, rows grow southward from `max_y`.
fn to_pixel_space(bbox: &BoundingBox, x: f64, y: f64) -> DVec2 {
    DVec2::new(x - bbox.min_x, bbox.max_y - y)
}

fn project_path(path: &[geo_types::Coord<f64>], bbox: &BoundingBox) -> Result<Vec<DVec2>> {
    path.iter()
        .map(|c| {
            let m = bbox::project(c.x, c.y)?;
            Ok(to_pixel_space(bbox, m.x, m.y))
        })
        .collect()
}

fn project_rings(
    rings: &[Vec<geo_types::Coord<f64>>],
    bbox: &BoundingBox,
) -> Result<Vec<Vec<DVec2>>> {
    rings.iter().map(|ring| project_path(ring, bbox)).collect()
}

/// Scan-fills a polygon with the even-odd rule.
///
/// All rings participate in the same parity count, so holes fall out
/// naturally: a scanline entering the exterior and then an interior ring
/// has crossed two edges and is outside again. Pixel centers sit at
/// integer coordinates; a pixel is filled when its center lies inside.
pub fn fill_polygon(mask: &mut LayerMask, rings: &[Vec<DVec2>]) {
    let height = mask.height() as i64;
    let width = mask.width() as i64;

    for row in 0..height {
        let yc = row as f64;
        let mut crossings: Vec<f64> = Vec::new();

        for ring in rings {
            if ring.len() < 2 {
                continue;
            }
            for i in 0..ring.len() {
                let a = ring[i];
                let b = ring[(i + 1) % ring.len()];
                // Half-open test skips horizontal edges and counts shared
                // vertices exactly once
                if (a.y <= yc && yc < b.y) || (b.y <= yc && yc < a.y) {
                    let t = (yc - a.y) / (b.y - a.y);
                    crossings.push(a.x + t * (b.x - a.x));
                }
            }
        }

        crossings.sort_by(|a, b| a.total_cmp(b));
        for pair in crossings.chunks_exact(2) {
            let start = pair[0].ceil().max(0.0) as i64;
            let end = ((pair[1] - 1e-9).floor()).min((width - 1) as f64) as i64;
            for col in start..=end {
                mask.set_on(col as u32, row as u32);
            }
        }
    }
}

/// Fills every pixel whose center lies within `radius` of `center`.
fn fill_disk(mask: &mut LayerMask, center: DVec2, radius: f64) {
    let height = mask.height() as i64;
    let width = mask.width() as i64;
    let r2 = radius * radius;

    let row_min = ((center.y - radius).floor() as i64).max(0);
    let row_max = ((center.y + radius).ceil() as i64).min(height - 1);
    for row in row_min..=row_max {
        let col_min = ((center.x - radius).floor() as i64).max(0);
        let col_max = ((center.x + radius).ceil() as i64).min(width - 1);
        for col in col_min..=col_max {
            let d = DVec2::new(col as f64, row as f64) - center;
            if d.length_squared() <= r2 {
                mask.set_on(col as u32, row as u32);
            }
        }
    }
}

/// Buffers an open path by `half_width` pixels and fills the result.
///
/// Each segment becomes one quad; joins and caps are closed with disks
/// at the vertices. Every piece is filled independently and OR-ed into
/// the mask, so overlap between pieces never cancels.
pub fn fill_buffered_path(mask: &mut LayerMask, path: &[DVec2], half_width: f64) {
    if path.len() < 2 || half_width <= 0.0 {
        return;
    }

    for pair in path.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let dir = b - a;
        if dir.length_squared() == 0.0 {
            continue;
        }
        let normal = DVec2::new(-dir.y, dir.x).normalize() * half_width;
        let quad = vec![a + normal, b + normal, b - normal, a - normal];
        fill_polygon(mask, &[quad]);
    }

    for &vertex in path {
        fill_disk(mask, vertex, half_width);
    }
}
