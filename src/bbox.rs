//! Bounding box and map projection for mask generation
//!
//! Converts a geographic center plus metric extents into the geographic and
//! projected-metric rectangles shared by every stage of a run, and maps
//! projected coordinates onto pixels of the output raster.

use geo_types::Coord;

use crate::error::ProjectionError;

/// Earth radius used by the spherical pseudo-Mercator projection, in meters.
const EARTH_RADIUS: f64 = 6_378_137.0;

/// Latitude limit of the pseudo-Mercator domain, in degrees.
pub const MAX_LATITUDE: f64 = 85.05113;

/// Projects geographic degrees into pseudo-Mercator meters.
pub fn project(lon: f64, lat: f64) -> Result<Coord<f64>, ProjectionError> {
    if !lon.is_finite() || !lat.is_finite() {
        return Err(ProjectionError::NonFinite(lon, lat));
    }
    if lat.abs() >= MAX_LATITUDE {
        return Err(ProjectionError::LatitudeOutOfRange(lat));
    }

    let x = EARTH_RADIUS * lon.to_radians();
    let y = EARTH_RADIUS * (std::f64::consts::FRAC_PI_4 + lat.to_radians() / 2.0).tan().ln();
    Ok(Coord { x, y })
}

/// Inverse of [`project`], returning geographic degrees (lon, lat).
pub fn unproject(x: f64, y: f64) -> Coord<f64> {
    let lon = (x / EARTH_RADIUS).to_degrees();
    let lat = (2.0 * (y / EARTH_RADIUS).exp().atan() - std::f64::consts::FRAC_PI_2).to_degrees();
    Coord { x: lon, y: lat }
}

/// Geographic and metric extents of one generation run.
///
/// Computed once at run start from the map center and requested size and
/// read-only afterward. The raster resolution is fixed at one pixel per
/// projected meter, so the pixel dimensions equal the metric extents.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundingBox {
    /// Geographic bounds in degrees
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
    /// Metric bounds in pseudo-Mercator meters
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
    /// Output raster size in pixels (rows, columns)
    pub height: u32,
    pub width: u32,
}

impl BoundingBox {
    /// Creates a bounding box centered on `(center_lat, center_lon)` with the
    /// given metric extents.
    pub fn new(
        center_lat: f64,
        center_lon: f64,
        height_m: f64,
        width_m: f64,
    ) -> Result<Self, ProjectionError> {
        Self::with_margin(center_lat, center_lon, height_m, width_m, 0.0)
    }

    /// Like [`BoundingBox::new`] but grows every side by `margin_m` meters,
    /// used when an oversized overview raster is wanted.
    pub fn with_margin(
        center_lat: f64,
        center_lon: f64,
        height_m: f64,
        width_m: f64,
        margin_m: f64,
    ) -> Result<Self, ProjectionError> {
        let center = project(center_lon, center_lat)?;

        let half_w = width_m / 2.0 + margin_m;
        let half_h = height_m / 2.0 + margin_m;

        let min_x = center.x - half_w;
        let max_x = center.x + half_w;
        let min_y = center.y - half_h;
        let max_y = center.y + half_h;

        let sw = unproject(min_x, min_y);
        let ne = unproject(max_x, max_y);

        Ok(BoundingBox {
            north: ne.y,
            south: sw.y,
            east: ne.x,
            west: sw.x,
            min_x,
            min_y,
            max_x,
            max_y,
            height: (max_y - min_y).round() as u32,
            width: (max_x - min_x).round() as u32,
        })
    }

    /// Maps a metric coordinate onto a raster pixel at one pixel per meter.
    ///
    /// Pixel rows increase southward while metric y increases northward, so
    /// the row axis is flipped. Results are clamped into the raster rather
    /// than rejected, since geometry may legitimately touch the boundary.
    pub fn pixel_of(&self, x: f64, y: f64) -> (u32, u32) {
        let col = (x - self.min_x).round();
        let row = (self.max_y - y).round();

        let col = col.clamp(0.0, (self.width - 1) as f64) as u32;
        let row = row.clamp(0.0, (self.height - 1) as f64) as u32;
        (col, row)
    }

    /// Projects a geographic coordinate straight to a raster pixel.
    pub fn pixel_of_geo(&self, lon: f64, lat: f64) -> Result<(u32, u32), ProjectionError> {
        let m = project(lon, lat)?;
        Ok(self.pixel_of(m.x, m.y))
    }

    /// Geographic bounds as (south, west, north, east), the order feature
    /// stores typically take a query rectangle in.
    pub fn geo_bounds(&self) -> (f64, f64, f64, f64) {
        (self.south, self.west, self.north, self.east)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_equator_origin() {
        let c = project(0.0, 0.0).unwrap();
        assert!(c.x.abs() < 1e-6);
        assert!(c.y.abs() < 1e-6);
    }

    #[test]
    fn test_project_unproject_roundtrip() {
        let back = {
            let m = project(13.4, 52.5).unwrap();
            unproject(m.x, m.y)
        };
        assert!((back.x - 13.4).abs() < 1e-9);
        assert!((back.y - 52.5).abs() < 1e-9);
    }

    #[test]
    fn test_project_rejects_polar_latitude() {
        assert!(matches!(
            project(0.0, 88.0),
            Err(ProjectionError::LatitudeOutOfRange(_))
        ));
        assert!(matches!(
            project(0.0, f64::NAN),
            Err(ProjectionError::NonFinite(_, _))
        ));
    }

    #[test]
    fn test_bbox_dimensions_match_extents() {
        let bbox = BoundingBox::new(45.0, 7.0, 512.0, 1024.0).unwrap();
        assert_eq!(bbox.height, 512);
        assert_eq!(bbox.width, 1024);
        assert!((bbox.max_x - bbox.min_x - 1024.0).abs() < 1e-6);
    }

    #[test]
    fn test_bbox_margin_grows_every_side() {
        let plain = BoundingBox::new(45.0, 7.0, 100.0, 100.0).unwrap();
        let padded = BoundingBox::with_margin(45.0, 7.0, 100.0, 100.0, 50.0).unwrap();
        assert_eq!(padded.width, plain.width + 100);
        assert_eq!(padded.height, plain.height + 100);
        assert!(padded.min_x < plain.min_x);
        assert!(padded.max_y > plain.max_y);
    }

    #[test]
    fn test_pixel_of_flips_rows() {
        let bbox = BoundingBox::new(0.0, 0.0, 100.0, 100.0).unwrap();

        // Top-left corner of the raster is (min_x, max_y)
        assert_eq!(bbox.pixel_of(bbox.min_x, bbox.max_y), (0, 0));
        // Moving north in metric space moves the row up
        let (_, row_low) = bbox.pixel_of(bbox.min_x, bbox.min_y + 10.0);
        let (_, row_high) = bbox.pixel_of(bbox.min_x, bbox.min_y + 20.0);
        assert!(row_high < row_low);
    }

    #[test]
    fn test_pixel_of_clamps_out_of_range() {
        let bbox = BoundingBox::new(0.0, 0.0, 100.0, 100.0).unwrap();
        assert_eq!(bbox.pixel_of(bbox.min_x - 500.0, bbox.max_y + 500.0), (0, 0));
        assert_eq!(
            bbox.pixel_of(bbox.max_x + 500.0, bbox.min_y - 500.0),
            (bbox.width - 1, bbox.height - 1)
        );
    }
}
