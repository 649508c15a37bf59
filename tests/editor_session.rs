use std::sync::{Arc, Mutex};

use pixelpad::canvas::{BrushShape, Pixel};
use pixelpad::ops::stroke::line_points;
use pixelpad::project::DocumentConfig;
use pixelpad::render::RasterSurface;
use pixelpad::{PixelPadApp, Workspace};

const RED: Pixel = Pixel::rgb(255, 0, 0);

/// Surface that counts paint calls per frame.
#[derive(Clone, Default)]
struct CountingSurface {
    calls: Arc<Mutex<Vec<(u32, u32, bool)>>>,
}

impl RasterSurface for CountingSurface {
    fn size(&self) -> (u32, u32) {
        (16, 16)
    }
    fn fill_pixel(&mut self, x: u32, y: u32, _rgb: u32) {
        self.calls.lock().unwrap().push((x, y, true));
    }
    fn clear_pixel(&mut self, x: u32, y: u32) {
        self.calls.lock().unwrap().push((x, y, false));
    }
    fn clear_region(&mut self, _x: u32, _y: u32, _w: u32, _h: u32) {}
}

fn session(width: u32, height: u32) -> PixelPadApp {
    let mut app = PixelPadApp::new();
    app.new_document(DocumentConfig::new(width, height));
    app.set_color(RED);
    app.tools_mut().set_size(1);
    app
}

#[test]
fn stroke_visits_line_cells_in_order() {
    let row: Vec<_> = line_points((0, 0), (5, 0)).collect();
    assert_eq!(row, vec![(0, 0), (1, 0), (2, 0), (3, 0), (4, 0), (5, 0)]);

    let diagonal: Vec<_> = line_points((0, 0), (3, 3)).collect();
    assert_eq!(diagonal.len(), 4);
    assert!(
        diagonal
            .windows(2)
            .all(|w| (w[1].0 - w[0].0).abs() <= 1 && (w[1].1 - w[0].1).abs() <= 1)
    );
}

#[test]
fn fast_drag_leaves_no_gaps() {
    let mut app = session(32, 32);
    app.pointer_down(2, 2);
    app.tick();
    // The pointer jumps far between frames.
    app.pointer_move(20, 9);
    app.tick();
    app.pointer_move(25, 30);
    app.pointer_up();

    let model = app.workspace().unwrap().active_layer().model();
    for (x, y) in line_points((2, 2), (20, 9)).chain(line_points((20, 9), (25, 30))) {
        assert_eq!(model.get_pixel(x, y), RED, "gap at ({}, {})", x, y);
    }
}

#[test]
fn one_render_per_tick() {
    let mut app = session(16, 16);
    let surface = CountingSurface::default();
    let calls = surface.calls.clone();
    app.workspace_mut().unwrap().add_layer(Box::new(surface));
    app.set_active_layer(1);
    calls.lock().unwrap().clear();

    app.pointer_down(0, 0);
    for x in 1..=5 {
        app.pointer_move(x, 0);
    }
    assert!(app.tick());
    assert_eq!(app.frames_rendered(), 1);

    // Six committed cells, each painted exactly once.
    let mut painted = calls.lock().unwrap().clone();
    painted.sort();
    painted.dedup();
    assert_eq!(painted.len(), 6);
    assert_eq!(calls.lock().unwrap().len(), 6);
}

#[test]
fn drawing_targets_active_layer_only() {
    let mut app = session(8, 8);
    {
        let ws = app.workspace_mut().unwrap();
        ws.add_raster_layer();
        ws.add_raster_layer();
    }
    app.set_active_layer(1);
    app.pointer_down(4, 4);
    app.pointer_up();

    let ws = app.workspace().unwrap();
    assert_eq!(ws.layers()[1].model().get_pixel(4, 4), RED);
    assert_eq!(ws.layers()[0].model().get_pixel(4, 4), Pixel::Transparent);
    assert_eq!(ws.layers()[2].model().get_pixel(4, 4), Pixel::Transparent);
}

#[test]
fn sole_layer_survives_removal() {
    let mut ws = Workspace::new(6, 6);
    ws.active_layer_mut().draw(2, 2, RED, BrushShape::Circle, 5);
    let id = ws.active_layer().id;

    assert!(ws.remove_layer(0));
    assert_eq!(ws.layer_count(), 1);
    assert_eq!(ws.active_layer().id, id);
    assert_eq!(ws.active_layer().model().dirty_count(), 36);
    ws.update();
    assert!(ws.composite().pixels().all(|p| p[3] == 0));
}

#[test]
fn hover_preview_is_not_committed() {
    let mut app = session(8, 8);
    app.tools_mut().set_size(3);
    app.tools_mut().set_shape("square");
    app.pointer_move(3, 3);
    app.tick();

    let ws = app.workspace().unwrap();
    let layer = ws.active_layer();
    assert_eq!(layer.overlay().get_pixel(2, 2), RED);
    assert_eq!(layer.model().get_pixel(2, 2), Pixel::Transparent);
    let surface = layer.surface().as_rgba().unwrap();
    assert_eq!(surface.get_pixel(2, 2).0, [255, 0, 0, 255]);
    assert_eq!(ws.composite().get_pixel(2, 2)[3], 0);

    app.pointer_leave();
    app.tick();
    let layer = app.workspace().unwrap().active_layer();
    assert_eq!(layer.surface().as_rgba().unwrap().get_pixel(2, 2)[3], 0);
}

#[test]
fn background_document_exports_filled() {
    let mut app = PixelPadApp::new();
    app.new_document(DocumentConfig::new(4, 4).with_background(Pixel::WHITE));
    app.set_color(RED);
    app.tools_mut().set_size(1);
    app.pointer_down(1, 1);
    app.pointer_up();

    let image = app.workspace().unwrap().composite();
    assert_eq!(image.get_pixel(1, 1).0, [255, 0, 0, 255]);
    assert_eq!(image.get_pixel(0, 0).0, [255, 255, 255, 255]);

    // Erasing on the top layer reveals the background.
    app.tools_mut().set_active_tool("eraser");
    app.pointer_down(1, 1);
    app.pointer_up();
    let image = app.workspace().unwrap().composite();
    assert_eq!(image.get_pixel(1, 1).0, [255, 255, 255, 255]);
}
