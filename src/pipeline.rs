//! Run orchestration
//!
//! Drives one generation run end to end: rasterize every layer, fold the
//! raw masks through the compositor, then dissolve multi-variant layers.
//! The dissolve pass runs strictly after compositing because it depends
//! on the final, post-exclusion masks.

use std::collections::BTreeMap;
use std::path::PathBuf;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{info, warn};

use crate::bbox::BoundingBox;
use crate::compositor;
use crate::dissolve;
use crate::error::{Result, TextureError};
use crate::features::FeatureSource;
use crate::rasterize;
use crate::schema::LayerSchema;

/// Outcome of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Layers composited (including the base layer if present)
    pub layers: usize,
    /// Layers skipped because their geometry fell outside the projection
    /// domain
    pub skipped_layers: Vec<String>,
    /// Pixels claimed by non-base layers
    pub claimed_pixels: usize,
}

/// One texture generation run over a fixed schema, bounding box and
/// feature source.
pub struct Pipeline<'a> {
    schema: &'a LayerSchema,
    bbox: &'a BoundingBox,
    source: &'a dyn FeatureSource,
    out_dir: PathBuf,
    seed: Option<u64>,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        schema: &'a LayerSchema,
        bbox: &'a BoundingBox,
        source: &'a dyn FeatureSource,
        out_dir: impl Into<PathBuf>,
    ) -> Self {
        Pipeline {
            schema,
            bbox,
            source,
            out_dir: out_dir.into(),
            seed: None,
        }
    }

    /// Fixes the dissolve seed; without one the run seeds from entropy.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Runs rasterization, compositing and dissolve in order.
    ///
    /// A projection failure inside one layer's geometry skips that layer
    /// (it composites as empty) without aborting its siblings; I/O
    /// failures abort the run.
    pub fn run(&self) -> Result<RunSummary> {
        std::fs::create_dir_all(&self.out_dir).map_err(|source| TextureError::Io {
            layer: String::new(),
            path: self.out_dir.clone(),
            source,
        })?;

        let mut raw_masks = BTreeMap::new();
        let mut skipped_layers = Vec::new();

        for layer in self.schema.ordered_by_priority() {
            match rasterize::rasterize(layer, self.bbox, self.source) {
                Ok(mask) => {
                    info!(
                        layer = layer.name.as_str(),
                        pixels = mask.count_on(),
                        "rasterized layer"
                    );
                    raw_masks.insert(layer.name.clone(), mask);
                }
                Err(TextureError::Projection(err)) => {
                    warn!(
                        layer = layer.name.as_str(),
                        error = %err,
                        "layer geometry outside projection domain, skipping"
                    );
                    skipped_layers.push(layer.name.clone());
                }
                Err(other) => return Err(other),
            }
        }

        let finals = compositor::composite(self.schema, self.bbox, raw_masks, &self.out_dir)?;

        let claimed_pixels = finals
            .iter()
            .filter(|(name, _)| {
                self.schema
                    .base_layer()
                    .map_or(true, |base| base.name != **name)
            })
            .map(|(_, mask)| mask.count_on())
            .sum();

        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        for layer in self.schema.layers() {
            if let Some(mask) = finals.get(&layer.name) {
                dissolve::dissolve(layer, mask, &self.out_dir, &mut rng)?;
            }
        }

        let summary = RunSummary {
            layers: finals.len(),
            skipped_layers,
            claimed_pixels,
        };
        info!(
            layers = summary.layers,
            skipped = summary.skipped_layers.len(),
            claimed = summary.claimed_pixels,
            "run complete"
        );
        Ok(summary)
    }
}
