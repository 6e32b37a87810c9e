//! Weight-variant dissolve
//!
//! Splits a composited layer mask across the layer's declared number of
//! variant files so that in-engine texture blending does not repeat one
//! identical weight texture. Every "on" pixel lands in exactly one
//! variant: the union of the variants reproduces the input mask and the
//! variants are pairwise disjoint.

use std::path::Path;

use rand::Rng;
use tracing::{debug, info};

use crate::error::Result;
use crate::mask::LayerMask;
use crate::schema::Layer;

/// Partitions the claimed pixels of `mask` into `count` disjoint masks.
///
/// Each pixel is assigned a uniform-random variant, so proportions are
/// only statistically equal; coverage and disjointness hold exactly.
pub fn split(mask: &LayerMask, count: u32, rng: &mut impl Rng) -> Vec<LayerMask> {
    let mut variants: Vec<LayerMask> = (0..count)
        .map(|_| LayerMask::new(mask.width(), mask.height()))
        .collect();

    for (col, row) in mask.on_pixels() {
        let pick = rng.gen_range(0..count as usize);
        variants[pick].set_on(col, row);
    }
    variants
}

/// Dissolves one layer's composited mask into its variant files.
///
/// Applies only to tag-bearing layers with more than one variant; an
/// all-zero mask is left alone (the primary file already on disk is
/// correct). The first variant overwrites the primary weight file.
pub fn dissolve(layer: &Layer, mask: &LayerMask, out_dir: &Path, rng: &mut impl Rng) -> Result<()> {
    if !layer.has_tags() || layer.count <= 1 {
        return Ok(());
    }
    if mask.count_on() == 0 {
        debug!(layer = layer.name.as_str(), "dissolve skipped, mask empty");
        return Ok(());
    }

    let variants = split(mask, layer.count, rng);
    for (i, variant) in variants.iter().enumerate() {
        let path = out_dir.join(layer.weight_file_name(i as u32 + 1));
        variant.save(&path, &layer.name)?;
    }

    info!(
        layer = layer.name.as_str(),
        variants = layer.count,
        pixels = mask.count_on(),
        "dissolved layer"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Priority, TagMatch};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn block_mask(side: u32) -> LayerMask {
        let mut mask = LayerMask::new(64, 64);
        for row in 0..side {
            for col in 0..side {
                mask.set_on(col, row);
            }
        }
        mask
    }

    fn dissolvable(name: &str, count: u32) -> Layer {
        let mut layer = Layer::new(name, Priority::Ordered(1));
        layer
            .tags
            .insert("kind".to_string(), TagMatch::Any(true));
        layer.count = count;
        layer
    }

    #[test]
    fn test_split_preserves_coverage_and_disjointness() {
        // 900 claimed pixels across 3 variants
        let mask = block_mask(30);
        assert_eq!(mask.count_on(), 900);

        let mut rng = StdRng::seed_from_u64(7);
        let variants = split(&mask, 3, &mut rng);
        assert_eq!(variants.len(), 3);

        let mut union = LayerMask::new(64, 64);
        let mut total = 0;
        for variant in &variants {
            total += variant.count_on();
            union.union_with(variant);
            // With 900 pixels and 3 variants none should be empty
            assert!(variant.count_on() > 0);
        }

        assert_eq!(union, mask);
        // Disjoint: counts add up with no double counting
        assert_eq!(total, 900);
    }

    #[test]
    fn test_split_fewer_pixels_than_variants() {
        let mut mask = LayerMask::new(8, 8);
        mask.set_on(0, 0);
        mask.set_on(1, 0);

        let mut rng = StdRng::seed_from_u64(1);
        let variants = split(&mask, 5, &mut rng);

        let total: usize = variants.iter().map(|v| v.count_on()).sum();
        assert_eq!(total, 2);
        assert!(variants.iter().filter(|v| v.count_on() == 0).count() >= 3);
    }

    #[test]
    fn test_dissolve_writes_variant_files() {
        let dir = tempfile::tempdir().unwrap();
        let layer = dissolvable("forest", 3);
        let mask = block_mask(30);

        let mut rng = StdRng::seed_from_u64(42);
        dissolve(&layer, &mask, dir.path(), &mut rng).unwrap();

        let mut union = LayerMask::new(64, 64);
        for i in 1..=3 {
            let path = dir.path().join(format!("forest{i:02}_weight.png"));
            assert!(path.exists());
            union.union_with(&LayerMask::load(&path, "forest").unwrap());
        }
        assert_eq!(union, mask);
    }

    #[test]
    fn test_dissolve_skips_single_variant_and_untagged() {
        let dir = tempfile::tempdir().unwrap();
        let mask = block_mask(10);
        let mut rng = StdRng::seed_from_u64(0);

        let single = dissolvable("grass", 1);
        dissolve(&single, &mask, dir.path(), &mut rng).unwrap();
        assert!(!dir.path().join("grass01_weight.png").exists());

        let mut untagged = Layer::new("ground", Priority::Ordered(0));
        untagged.count = 4;
        dissolve(&untagged, &mask, dir.path(), &mut rng).unwrap();
        assert!(!dir.path().join("ground01_weight.png").exists());
    }

    #[test]
    fn test_dissolve_empty_mask_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let layer = dissolvable("forest", 3);
        let mut rng = StdRng::seed_from_u64(0);

        dissolve(&layer, &LayerMask::new(16, 16), dir.path(), &mut rng).unwrap();
        assert!(!dir.path().join("forest01_weight.png").exists());
        assert!(!dir.path().join("forest02_weight.png").exists());
    }
}
