use image::RgbaImage;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::workspace::Workspace;

/// Error type for raster export
#[derive(Debug)]
pub enum ExportError {
    Io(std::io::Error),
    Encode(String),
    /// Nothing to encode (zero-sized image).
    Empty,
}

impl std::fmt::Display for ExportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportError::Io(e) => write!(f, "I/O error: {}", e),
            ExportError::Encode(e) => write!(f, "PNG encode error: {}", e),
            ExportError::Empty => write!(f, "Nothing to export: image is empty"),
        }
    }
}

impl std::error::Error for ExportError {}

impl From<std::io::Error> for ExportError {
    fn from(e: std::io::Error) -> Self {
        ExportError::Io(e)
    }
}

impl From<png::EncodingError> for ExportError {
    fn from(e: png::EncodingError) -> Self {
        match e {
            png::EncodingError::IoError(io) => ExportError::Io(io),
            other => ExportError::Encode(other.to_string()),
        }
    }
}

/// Encode an RGBA8 image as PNG into `writer`.
pub fn encode_png<W: Write>(image: &RgbaImage, writer: W) -> Result<(), ExportError> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(ExportError::Empty);
    }

    let mut encoder = png::Encoder::new(writer, width, height);
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);

    let mut writer = encoder.write_header()?;
    writer.write_image_data(image.as_raw())?;
    writer.finish()?;
    Ok(())
}

pub fn encode_png_bytes(image: &RgbaImage) -> Result<Vec<u8>, ExportError> {
    let mut bytes = Vec::new();
    encode_png(image, &mut bytes)?;
    Ok(bytes)
}

/// Encode `image` and write it to `path`, replacing any existing file.
pub fn write_png(image: &RgbaImage, path: &Path) -> Result<(), ExportError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    encode_png(image, &mut writer)?;
    writer.flush()?;
    Ok(())
}

/// Composite the visible layers of `workspace` and write them as a PNG.
pub fn export_png(workspace: &Workspace, path: &Path) -> Result<(), ExportError> {
    let image = workspace.composite();
    write_png(&image, path)?;
    log_info!(
        "Exported {}×{} PNG to {}",
        image.width(),
        image.height(),
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{BrushShape, Pixel};
    use image::Rgba;

    #[test]
    fn red_pixel_round_trips() {
        let mut ws = Workspace::new(8, 8);
        ws.active_layer_mut().draw(3, 4, Pixel::rgb(255, 0, 0), BrushShape::Circle, 1);
        let bytes = encode_png_bytes(&ws.composite()).unwrap();

        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (8, 8));
        for (x, y, pixel) in decoded.enumerate_pixels() {
            if (x, y) == (3, 4) {
                assert_eq!(pixel, &Rgba([255, 0, 0, 255]));
            } else {
                assert_eq!(pixel[3], 0, "({}, {})", x, y);
            }
        }
    }

    #[test]
    fn erased_cells_export_opaque_white() {
        let mut ws = Workspace::new(2, 1);
        ws.active_layer_mut().draw(0, 0, Pixel::Erased, BrushShape::Square, 1);
        let bytes = encode_png_bytes(&ws.composite()).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(decoded.get_pixel(0, 0), &Rgba([255, 255, 255, 255]));
        assert_eq!(decoded.get_pixel(1, 0)[3], 0);
    }

    #[test]
    fn empty_image_is_rejected() {
        let result = encode_png_bytes(&RgbaImage::new(0, 3));
        assert!(matches!(result, Err(ExportError::Empty)));
    }

    #[test]
    fn missing_directory_is_io_error() {
        let ws = Workspace::new(2, 2);
        let path = std::env::temp_dir()
            .join("pixelpad-no-such-dir-7f3a")
            .join("out.png");
        let err = export_png(&ws, &path).unwrap_err();
        assert!(matches!(err, ExportError::Io(_)));
        assert!(err.to_string().starts_with("I/O error"));
    }
}
