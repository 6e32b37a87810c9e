//! Error types for texture generation

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while generating texture masks
#[derive(Debug, Error)]
pub enum TextureError {
    /// Malformed or ambiguous layer schema
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Coordinates outside the supported projection domain
    #[error("projection error: {0}")]
    Projection(#[from] ProjectionError),

    /// A mask file could not be read or written
    #[error("I/O failure for layer '{layer}' at {path}: {source}")]
    Io {
        layer: String,
        path: PathBuf,
        source: std::io::Error,
    },

    /// A mask image could not be encoded or decoded
    #[error("image failure for layer '{layer}' at {path}: {source}")]
    Image {
        layer: String,
        path: PathBuf,
        source: image::ImageError,
    },

    /// A feature source failed to produce geometry
    #[error("feature source error: {0}")]
    FeatureSource(String),
}

/// Schema validation failures, raised before any rasterization
#[derive(Debug, Error, PartialEq)]
pub enum SchemaError {
    /// Two layers share a name
    #[error("duplicate layer name '{0}'")]
    DuplicateName(String),

    /// More than one layer declares priority 0
    #[error("multiple base layers: '{0}' and '{1}' both declare priority 0")]
    MultipleBaseLayers(String, String),

    /// A layer declares a non-positive line width
    #[error("layer '{0}' has non-positive width {1}")]
    NonPositiveWidth(String, f64),

    /// The schema document could not be parsed
    #[error("unparseable schema: {0}")]
    Parse(String),
}

/// Projection domain failures
#[derive(Debug, Error, PartialEq)]
pub enum ProjectionError {
    /// Latitude outside the pseudo-Mercator domain
    #[error("latitude {0} outside projection domain (|lat| < {max})", max = crate::bbox::MAX_LATITUDE)]
    LatitudeOutOfRange(f64),

    /// Non-finite coordinate input
    #[error("non-finite coordinate ({0}, {1})")]
    NonFinite(f64, f64),
}

/// Result type for texture generation operations
pub type Result<T> = std::result::Result<T, TextureError>;
