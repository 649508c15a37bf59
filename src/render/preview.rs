use image::RgbaImage;

/// Largest integer magnification offered by the preview.
pub const MAX_PREVIEW_SCALE: u32 = 16;

/// Nearest-neighbour upscale by an integer factor (clamped to `1..=MAX_PREVIEW_SCALE`),
/// so every document cell becomes a crisp `scale × scale` block.
pub fn upscale_nearest(image: &RgbaImage, scale: u32) -> RgbaImage {
    let scale = scale.clamp(1, MAX_PREVIEW_SCALE);
    if scale == 1 {
        return image.clone();
    }
    let (w, h) = image.dimensions();
    RgbaImage::from_fn(w * scale, h * scale, |x, y| *image.get_pixel(x / scale, y / scale))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn each_cell_becomes_a_block() {
        let mut image = RgbaImage::new(2, 1);
        image.put_pixel(1, 0, Rgba([255, 0, 0, 255]));
        let scaled = upscale_nearest(&image, 3);
        assert_eq!(scaled.dimensions(), (6, 3));
        for y in 0..3 {
            for x in 0..3 {
                assert_eq!(scaled.get_pixel(x, y)[3], 0);
                assert_eq!(scaled.get_pixel(x + 3, y), &Rgba([255, 0, 0, 255]));
            }
        }
    }

    #[test]
    fn scale_is_clamped() {
        let image = RgbaImage::new(1, 1);
        assert_eq!(upscale_nearest(&image, 0).dimensions(), (1, 1));
        assert_eq!(upscale_nearest(&image, 100).dimensions(), (16, 16));
    }
}
