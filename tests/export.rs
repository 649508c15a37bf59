use image::Rgba;

use pixelpad::PixelPadApp;
use pixelpad::canvas::{BrushShape, Pixel};
use pixelpad::io::encode_png_bytes;
use pixelpad::project::DocumentConfig;

fn temp_path(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("pixelpad-{}-{}", uuid::Uuid::new_v4(), name))
}

#[test]
fn single_red_pixel_round_trip() {
    let mut app = PixelPadApp::new();
    app.new_document(DocumentConfig::new(8, 8));
    app.workspace_mut()
        .unwrap()
        .active_layer_mut()
        .draw(3, 4, Pixel::rgb(255, 0, 0), BrushShape::Square, 1);

    let path = temp_path("red.png");
    app.export_png(&path).unwrap();
    let decoded = image::open(&path).unwrap().to_rgba8();
    std::fs::remove_file(&path).ok();

    assert_eq!(decoded.dimensions(), (8, 8));
    for (x, y, pixel) in decoded.enumerate_pixels() {
        if (x, y) == (3, 4) {
            assert_eq!(*pixel, Rgba([255, 0, 0, 255]));
        } else {
            assert_eq!(pixel[3], 0);
        }
    }

    let project = app.project().unwrap();
    assert!(!project.is_dirty);
    assert!(project.name.ends_with("red.png"));
}

#[test]
fn hidden_layers_are_left_out() {
    let mut app = PixelPadApp::new();
    app.new_document(DocumentConfig::new(4, 4));
    let ws = app.workspace_mut().unwrap();
    ws.active_layer_mut().draw(0, 0, Pixel::rgb(0, 0, 255), BrushShape::Square, 1);
    ws.add_raster_layer().draw(0, 0, Pixel::rgb(0, 255, 0), BrushShape::Square, 1);

    let top_visible = image::load_from_memory(&encode_png_bytes(&ws.composite()).unwrap())
        .unwrap()
        .to_rgba8();
    assert_eq!(top_visible.get_pixel(0, 0).0, [0, 255, 0, 255]);

    ws.layer_mut(1).unwrap().visible = false;
    let bottom_only = image::load_from_memory(&encode_png_bytes(&ws.composite()).unwrap())
        .unwrap()
        .to_rgba8();
    assert_eq!(bottom_only.get_pixel(0, 0).0, [0, 0, 255, 255]);
}

#[test]
fn export_without_document_fails() {
    let mut app = PixelPadApp::new();
    assert!(app.export_png(&temp_path("none.png")).is_err());
}
