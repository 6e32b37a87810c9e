//! Layer compositing
//!
//! Folds per-layer raw masks into final masks under the priority ordering:
//! a pixel already claimed by an earlier-processed layer is cleared from
//! every later layer, so at most one non-base layer owns any pixel. The
//! base layer is filled last with everything still unclaimed.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::info;

use crate::bbox::BoundingBox;
use crate::error::Result;
use crate::mask::LayerMask;
use crate::schema::LayerSchema;

/// Run-scoped record of which pixels some layer has already claimed.
///
/// Single-writer: only the compositing fold mutates it, and it is
/// discarded once the base layer is filled.
pub struct CompositeState {
    claimed: LayerMask,
}

impl CompositeState {
    pub fn new(width: u32, height: u32) -> Self {
        CompositeState {
            claimed: LayerMask::new(width, height),
        }
    }

    /// Removes already-claimed pixels from `mask`, then records the
    /// survivors as claimed.
    pub fn claim(&mut self, mask: &mut LayerMask) {
        mask.subtract(&self.claimed);
        self.claimed.union_with(mask);
    }

    /// Pixels no layer has claimed.
    pub fn unclaimed(&self) -> LayerMask {
        self.claimed.complement()
    }

    /// Number of claimed pixels.
    pub fn claimed_count(&self) -> usize {
        self.claimed.count_on()
    }
}

/// Composites raw masks into final, mutually exclusive masks and persists
/// each layer's primary weight file under `out_dir`.
///
/// `raw_masks` holds the rasterizer output keyed by layer name; layers
/// without an entry are treated as empty. Weightless layers
/// (`count == 0`) participate in the fold but produce no file. Returns
/// the final mask per layer.
pub fn composite(
    schema: &LayerSchema,
    bbox: &BoundingBox,
    mut raw_masks: BTreeMap<String, LayerMask>,
    out_dir: &Path,
) -> Result<BTreeMap<String, LayerMask>> {
    let mut state = CompositeState::new(bbox.width, bbox.height);
    let mut finals: BTreeMap<String, LayerMask> = BTreeMap::new();

    for layer in schema.ordered_by_priority() {
        let mask = if layer.is_base() {
            // Structural complement of every other layer's final mask;
            // the base layer's own matches are by definition part of it
            state.unclaimed()
        } else {
            let mut mask = raw_masks
                .remove(&layer.name)
                .unwrap_or_else(|| LayerMask::new(bbox.width, bbox.height));
            state.claim(&mut mask);
            mask
        };

        if layer.count > 0 {
            let path = out_dir.join(layer.weight_file_name(1));
            mask.save(&path, &layer.name)?;
        }

        info!(
            layer = layer.name.as_str(),
            pixels = mask.count_on(),
            "composited layer"
        );
        finals.insert(layer.name.clone(), mask);
    }

    Ok(finals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Layer, Priority};

    fn bbox() -> BoundingBox {
        BoundingBox::new(0.0, 0.0, 16.0, 16.0).unwrap()
    }

    fn mask_with(pixels: &[(u32, u32)]) -> LayerMask {
        let mut mask = LayerMask::new(16, 16);
        for &(c, r) in pixels {
            mask.set_on(c, r);
        }
        mask
    }

    fn tagged(name: &str, priority: Priority) -> Layer {
        let mut layer = Layer::new(name, priority);
        layer.tags.insert(
            "kind".to_string(),
            crate::schema::TagMatch::Exact(name.to_string()),
        );
        layer
    }

    #[test]
    fn test_mutual_exclusion_between_layers() {
        let schema = LayerSchema::new(vec![
            tagged("road", Priority::Ordered(2)),
            tagged("grass", Priority::Ordered(1)),
            Layer::new("ground", Priority::Ordered(0)),
        ])
        .unwrap();

        let mut raw = BTreeMap::new();
        raw.insert("road".to_string(), mask_with(&[(1, 1), (2, 2)]));
        raw.insert("grass".to_string(), mask_with(&[(2, 2), (3, 3)]));

        let dir = tempfile::tempdir().unwrap();
        let finals = composite(&schema, &bbox(), raw, dir.path()).unwrap();

        // Higher priority processed first keeps the contested pixel
        assert!(finals["road"].is_on(2, 2));
        assert!(!finals["grass"].is_on(2, 2));
        assert!(finals["grass"].is_on(3, 3));

        for col in 0..16 {
            for row in 0..16 {
                let owners = ["road", "grass"]
                    .iter()
                    .filter(|n| finals[**n].is_on(col, row))
                    .count();
                assert!(owners <= 1, "pixel ({col},{row}) has {owners} owners");
            }
        }
    }

    #[test]
    fn test_base_layer_is_exact_complement() {
        let schema = LayerSchema::new(vec![
            tagged("grass", Priority::Ordered(1)),
            Layer::new("ground", Priority::Ordered(0)),
        ])
        .unwrap();

        let mut raw = BTreeMap::new();
        raw.insert("grass".to_string(), mask_with(&[(0, 0), (5, 5), (15, 15)]));

        let dir = tempfile::tempdir().unwrap();
        let finals = composite(&schema, &bbox(), raw, dir.path()).unwrap();

        for col in 0..16 {
            for row in 0..16 {
                assert_ne!(
                    finals["ground"].is_on(col, row),
                    finals["grass"].is_on(col, row),
                    "pixel ({col},{row})"
                );
            }
        }
    }

    #[test]
    fn test_no_base_layer_leaves_pixels_unclaimed() {
        let schema = LayerSchema::new(vec![tagged("grass", Priority::Ordered(1))]).unwrap();
        let mut raw = BTreeMap::new();
        raw.insert("grass".to_string(), mask_with(&[(5, 5)]));

        let dir = tempfile::tempdir().unwrap();
        let finals = composite(&schema, &bbox(), raw, dir.path()).unwrap();

        assert_eq!(finals.len(), 1);
        assert_eq!(finals["grass"].count_on(), 1);
    }

    #[test]
    fn test_empty_region_fills_base_entirely() {
        let schema = LayerSchema::new(vec![
            tagged("grass", Priority::Ordered(1)),
            Layer::new("ground", Priority::Ordered(0)),
        ])
        .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let finals = composite(&schema, &bbox(), BTreeMap::new(), dir.path()).unwrap();

        assert_eq!(finals["grass"].count_on(), 0);
        assert_eq!(finals["ground"].count_on(), 16 * 16);
    }

    #[test]
    fn test_unprioritized_layers_exclude_in_schema_order() {
        let schema = LayerSchema::new(vec![
            tagged("first", Priority::Unordered),
            tagged("second", Priority::Unordered),
        ])
        .unwrap();

        let mut raw = BTreeMap::new();
        raw.insert("first".to_string(), mask_with(&[(4, 4)]));
        raw.insert("second".to_string(), mask_with(&[(4, 4), (6, 6)]));

        let dir = tempfile::tempdir().unwrap();
        let finals = composite(&schema, &bbox(), raw, dir.path()).unwrap();

        assert!(finals["first"].is_on(4, 4));
        assert!(!finals["second"].is_on(4, 4));
        assert!(finals["second"].is_on(6, 6));
    }

    #[test]
    fn test_primary_files_written_except_weightless() {
        let mut decal = tagged("decal", Priority::Ordered(3));
        decal.count = 0;

        let schema = LayerSchema::new(vec![
            decal,
            tagged("grass", Priority::Ordered(1)),
            Layer::new("ground", Priority::Ordered(0)),
        ])
        .unwrap();

        let mut raw = BTreeMap::new();
        raw.insert("decal".to_string(), mask_with(&[(1, 1)]));
        raw.insert("grass".to_string(), mask_with(&[(1, 1), (2, 2)]));

        let dir = tempfile::tempdir().unwrap();
        let finals = composite(&schema, &bbox(), raw, dir.path()).unwrap();

        assert!(dir.path().join("grass01_weight.png").exists());
        assert!(dir.path().join("ground01_weight.png").exists());
        assert!(!dir.path().join("decal01_weight.png").exists());

        // Weightless layer still claimed its pixel ahead of grass
        assert!(finals["decal"].is_on(1, 1));
        assert!(!finals["grass"].is_on(1, 1));
        assert!(!finals["ground"].is_on(1, 1));
    }

    #[test]
    fn test_compositing_is_idempotent() {
        let schema = LayerSchema::new(vec![
            tagged("road", Priority::Ordered(2)),
            tagged("grass", Priority::Ordered(1)),
            Layer::new("ground", Priority::Ordered(0)),
        ])
        .unwrap();

        let raw = || {
            let mut m = BTreeMap::new();
            m.insert("road".to_string(), mask_with(&[(1, 1), (2, 2)]));
            m.insert("grass".to_string(), mask_with(&[(2, 2), (3, 3)]));
            m
        };

        let dir = tempfile::tempdir().unwrap();
        let first = composite(&schema, &bbox(), raw(), dir.path()).unwrap();
        let second = composite(&schema, &bbox(), raw(), dir.path()).unwrap();
        assert_eq!(first, second);
    }
}
