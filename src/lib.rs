//! terrapaint - terrain texture mask generation
//!
//! Turns geographic vector features into a set of aligned, per-category
//! 8-bit raster masks used to paint a game terrain. A declarative layer
//! schema maps named layers to feature tag filters; matched geometry is
//! rasterized into a shared pixel space, overlap is resolved by priority
//! with a base layer absorbing all unclaimed area, and multi-variant
//! layers are dissolved into disjoint weight files.

pub mod bbox;
pub mod compositor;
pub mod dissolve;
pub mod error;
pub mod features;
pub mod mask;
pub mod pipeline;
pub mod rasterize;
pub mod schema;

pub use bbox::BoundingBox;
pub use error::{ProjectionError, Result, SchemaError, TextureError};
pub use features::{Feature, FeatureSource, Geometry, StaticSource};
pub use mask::LayerMask;
pub use pipeline::{Pipeline, RunSummary};
pub use schema::{Layer, LayerSchema, Priority, TagMatch};
