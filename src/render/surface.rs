// ============================================================================
// RASTER SURFACE: output target of a layer renderer
// ============================================================================

use image::{Rgba, RgbaImage};

/// The drawing primitives a [`LayerRenderer`](super::LayerRenderer) needs.
///
/// Coordinates are in document cells.  Implementations ignore writes outside
/// their own bounds.
pub trait RasterSurface: Send {
    /// `(width, height)` in cells.
    fn size(&self) -> (u32, u32);

    /// Paint one cell opaquely.  `rgb` is `0xRRGGBB`.
    fn fill_pixel(&mut self, x: u32, y: u32, rgb: u32);

    /// Blank one cell so whatever sits beneath shows through.
    fn clear_pixel(&mut self, x: u32, y: u32);

    /// Blank a rectangle.
    fn clear_region(&mut self, x: u32, y: u32, width: u32, height: u32);

    /// Read access for surfaces that keep their pixels in memory.
    fn as_rgba(&self) -> Option<&RgbaImage> {
        None
    }
}

/// In-memory surface backed by an [`RgbaImage`].  Cleared cells are
/// `[0, 0, 0, 0]`; painted cells are fully opaque.
pub struct RgbaSurface {
    image: RgbaImage,
}

impl RgbaSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::new(width, height),
        }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }
}

impl RasterSurface for RgbaSurface {
    fn size(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    fn fill_pixel(&mut self, x: u32, y: u32, rgb: u32) {
        if x < self.image.width() && y < self.image.height() {
            self.image.put_pixel(
                x,
                y,
                Rgba([(rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8, 255]),
            );
        }
    }

    fn clear_pixel(&mut self, x: u32, y: u32) {
        if x < self.image.width() && y < self.image.height() {
            self.image.put_pixel(x, y, Rgba([0, 0, 0, 0]));
        }
    }

    fn clear_region(&mut self, x: u32, y: u32, width: u32, height: u32) {
        let x_end = x.saturating_add(width).min(self.image.width());
        let y_end = y.saturating_add(height).min(self.image.height());
        for py in y..y_end {
            for px in x..x_end {
                self.image.put_pixel(px, py, Rgba([0, 0, 0, 0]));
            }
        }
    }

    fn as_rgba(&self) -> Option<&RgbaImage> {
        Some(&self.image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_and_clear_cells() {
        let mut surface = RgbaSurface::new(3, 2);
        surface.fill_pixel(2, 1, 0x10_20_30);
        assert_eq!(surface.image().get_pixel(2, 1), &Rgba([0x10, 0x20, 0x30, 255]));
        surface.clear_pixel(2, 1);
        assert_eq!(surface.image().get_pixel(2, 1), &Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn out_of_bounds_writes_are_ignored() {
        let mut surface = RgbaSurface::new(2, 2);
        surface.fill_pixel(5, 0, 0xFFFFFF);
        surface.clear_pixel(0, 9);
        surface.clear_region(1, 1, 100, 100);
        assert_eq!(surface.size(), (2, 2));
    }

    #[test]
    fn clear_region_blanks_rectangle() {
        let mut surface = RgbaSurface::new(4, 4);
        for y in 0..4 {
            for x in 0..4 {
                surface.fill_pixel(x, y, 0xFF0000);
            }
        }
        surface.clear_region(1, 1, 2, 2);
        let cleared = surface.image().pixels().filter(|p| p[3] == 0).count();
        assert_eq!(cleared, 4);
        assert_eq!(surface.image().get_pixel(0, 0)[3], 255);
        assert_eq!(surface.image().get_pixel(2, 2)[3], 0);
    }
}
