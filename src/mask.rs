//! Single-channel layer masks
//!
//! A [`LayerMask`] is the 8-bit raster a layer paints into: 255 marks
//! pixels belonging to the layer, 0 everything else. One mask file exists
//! per (layer, variant) pair, persisted as grayscale PNG.

use std::path::Path;

use image::{GrayImage, Luma};

use crate::error::{Result, TextureError};

/// Value of a claimed pixel.
pub const ON: u8 = 255;

/// A binary mask over the run's raster, values restricted to {0, 255}.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerMask {
    image: GrayImage,
}

impl LayerMask {
    /// Creates an all-zero mask of the given pixel dimensions.
    pub fn new(width: u32, height: u32) -> Self {
        LayerMask {
            image: GrayImage::new(width, height),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// True when the pixel is claimed.
    pub fn is_on(&self, col: u32, row: u32) -> bool {
        self.image.get_pixel(col, row).0[0] == ON
    }

    /// Marks a pixel as claimed.
    pub fn set_on(&mut self, col: u32, row: u32) {
        self.image.put_pixel(col, row, Luma([ON]));
    }

    /// Clears a pixel.
    pub fn clear(&mut self, col: u32, row: u32) {
        self.image.put_pixel(col, row, Luma([0]));
    }

    /// Number of claimed pixels.
    pub fn count_on(&self) -> usize {
        self.image.pixels().filter(|p| p.0[0] == ON).count()
    }

    /// Coordinates of every claimed pixel, row-major.
    pub fn on_pixels(&self) -> Vec<(u32, u32)> {
        self.image
            .enumerate_pixels()
            .filter(|(_, _, p)| p.0[0] == ON)
            .map(|(col, row, _)| (col, row))
            .collect()
    }

    /// ORs another mask of the same dimensions into this one.
    pub fn union_with(&mut self, other: &LayerMask) {
        debug_assert_eq!(self.image.dimensions(), other.image.dimensions());
        for (dst, src) in self.image.iter_mut().zip(other.image.iter()) {
            if *src == ON {
                *dst = ON;
            }
        }
    }

    /// Clears every pixel of this mask that is claimed in `other`.
    pub fn subtract(&mut self, other: &LayerMask) {
        debug_assert_eq!(self.image.dimensions(), other.image.dimensions());
        for (dst, src) in self.image.iter_mut().zip(other.image.iter()) {
            if *src == ON {
                *dst = 0;
            }
        }
    }

    /// Returns the mask claiming exactly the pixels this one does not.
    pub fn complement(&self) -> LayerMask {
        let mut out = LayerMask::new(self.width(), self.height());
        for (dst, src) in out.image.iter_mut().zip(self.image.iter()) {
            if *src != ON {
                *dst = ON;
            }
        }
        out
    }

    /// Writes the mask as a grayscale PNG.
    ///
    /// `layer` is only used to annotate failures.
    pub fn save(&self, path: &Path, layer: &str) -> Result<()> {
        self.image.save(path).map_err(|source| TextureError::Image {
            layer: layer.to_string(),
            path: path.to_path_buf(),
            source,
        })
    }

    /// Reads a mask back from a grayscale PNG, snapping any non-zero value
    /// up to 255.
    pub fn load(path: &Path, layer: &str) -> Result<Self> {
        let image = image::open(path)
            .map_err(|source| TextureError::Image {
                layer: layer.to_string(),
                path: path.to_path_buf(),
                source,
            })?
            .into_luma8();

        let mut mask = LayerMask { image };
        for px in mask.image.iter_mut() {
            if *px != 0 {
                *px = ON;
            }
        }
        Ok(mask)
    }
}
