//! Feature acquisition interface
//!
//! The engine does not own feature storage; it consumes any
//! [`FeatureSource`] that can answer tag-filter queries over a bounding
//! box. An in-memory source is provided for embedding and tests, with a
//! GeoJSON loader for file-backed data.

use std::collections::BTreeMap;
use std::path::Path;

use geo_types::Coord;
use geojson::{GeoJson, Value};

use crate::bbox::BoundingBox;
use crate::error::{Result, TextureError};
use crate::schema::{TagFilter, filter_matches};

/// Vector geometry in geographic degrees.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    /// Filled shape; first ring is the exterior, the rest are holes
    Areal(Vec<Vec<Coord<f64>>>),
    /// Open path, rasterized only when the layer declares a width
    Linear(Vec<Coord<f64>>),
}

impl Geometry {
    /// Geographic extent as (south, west, north, east), or `None` for
    /// empty geometry.
    pub fn extent(&self) -> Option<(f64, f64, f64, f64)> {
        let coords: Box<dyn Iterator<Item = &Coord<f64>>> = match self {
            Geometry::Areal(rings) => Box::new(rings.iter().flatten()),
            Geometry::Linear(path) => Box::new(path.iter()),
        };

        let mut extent: Option<(f64, f64, f64, f64)> = None;
        for c in coords {
            extent = Some(match extent {
                None => (c.y, c.x, c.y, c.x),
                Some((s, w, n, e)) => (s.min(c.y), w.min(c.x), n.max(c.y), e.max(c.x)),
            });
        }
        extent
    }
}

/// One stored feature: geometry plus the attribute mapping tag filters
/// are evaluated against.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub geometry: Geometry,
    pub attributes: BTreeMap<String, String>,
}

/// Supplier of vector features for rasterization.
pub trait FeatureSource {
    /// Returns the geometry of every feature matching `filter` whose
    /// extent overlaps the bounding box's geographic extent.
    fn query(&self, filter: &TagFilter, bbox: &BoundingBox) -> Result<Vec<Geometry>>;
}

/// In-memory feature store.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    features: Vec<Feature>,
}

impl StaticSource {
    pub fn new(features: Vec<Feature>) -> Self {
        StaticSource { features }
    }

    pub fn push(&mut self, feature: Feature) {
        self.features.push(feature);
    }

    /// Loads a GeoJSON FeatureCollection from disk.
    ///
    /// LineString / MultiLineString become linear features, Polygon /
    /// MultiPolygon become areal features; points and other geometry are
    /// skipped. Feature `properties` become the attribute mapping, with
    /// non-string scalars stringified.
    pub fn from_geojson_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            TextureError::FeatureSource(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_geojson_str(&text)
    }

    /// Parses a GeoJSON document from a string. See [`Self::from_geojson_path`].
    pub fn from_geojson_str(text: &str) -> Result<Self> {
        let geojson: GeoJson = text
            .parse()
            .map_err(|e| TextureError::FeatureSource(format!("unparseable GeoJSON: {e}")))?;

        let mut source = StaticSource::default();
        match geojson {
            GeoJson::FeatureCollection(fc) => {
                for feature in fc.features {
                    source.push_geojson_feature(&feature);
                }
            }
            GeoJson::Feature(feature) => source.push_geojson_feature(&feature),
            GeoJson::Geometry(geometry) => {
                for g in convert_geometry(&geometry.value) {
                    source.push(Feature {
                        geometry: g,
                        attributes: BTreeMap::new(),
                    });
                }
            }
        }
        Ok(source)
    }

    fn push_geojson_feature(&mut self, feature: &geojson::Feature) {
        let attributes: BTreeMap<String, String> = feature
            .properties
            .as_ref()
            .map(|props| {
                props
                    .iter()
                    .filter_map(|(k, v)| {
                        let value = match v {
                            serde_json::Value::String(s) => s.clone(),
                            serde_json::Value::Bool(b) => b.to_string(),
                            serde_json::Value::Number(n) => n.to_string(),
                            _ => return None,
                        };
                        Some((k.clone(), value))
                    })
                    .collect()
            })
            .unwrap_or_default();

        if let Some(geometry) = &feature.geometry {
            for g in convert_geometry(&geometry.value) {
                self.push(Feature {
                    geometry: g,
                    attributes: attributes.clone(),
                });
            }
        }
    }
}

fn ring_coords(ring: &[Vec<f64>]) -> Vec<Coord<f64>> {
    ring.iter().map(|c| Coord { x: c[0], y: c[1] }).collect()
}

fn convert_geometry(value: &Value) -> Vec<Geometry> {
    match value {
        Value::LineString(path) => vec![Geometry::Linear(ring_coords(path))],
        Value::MultiLineString(paths) => paths
            .iter()
            .map(|p| Geometry::Linear(ring_coords(p)))
            .collect(),
        Value::Polygon(rings) => {
            vec![Geometry::Areal(rings.iter().map(|r| ring_coords(r)).collect())]
        }
        Value::MultiPolygon(polygons) => polygons
            .iter()
            .map(|rings| Geometry::Areal(rings.iter().map(|r| ring_coords(r)).collect()))
            .collect(),
        Value::GeometryCollection(inner) => inner
            .iter()
            .flat_map(|g| convert_geometry(&g.value))
            .collect(),
        // Points carry no area and no length
        _ => Vec::new(),
    }
}

impl FeatureSource for StaticSource {
    fn query(&self, filter: &TagFilter, bbox: &BoundingBox) -> Result<Vec<Geometry>> {
        let (south, west, north, east) = bbox.geo_bounds();

        Ok(self
            .features
            .iter()
            .filter(|f| filter_matches(filter, &f.attributes))
            .filter(|f| {
                f.geometry.extent().is_some_and(|(s, w, n, e)| {
                    n >= south && s <= north && e >= west && w <= east
                })
            })
            .map(|f| f.geometry.clone())
            .collect())
    }
}
