use image::RgbaImage;
use rayon::prelude::*;

use crate::canvas::{Layer, Pixel};
use crate::render::{RasterSurface, RenderStats, RgbaSurface, upscale_nearest};

/// Ordered stack of layers sharing one document size.
///
/// `layers[0]` is the bottom of the stack; a newly added layer goes on top.
/// There is always at least one layer, and `active_layer_index` always points
/// at an existing one.
pub struct Workspace {
    width: u32,
    height: u32,
    layers: Vec<Layer>,
    active_layer_index: usize,
    /// Numbering for "Layer N" names; never reused within a document.
    next_layer_number: usize,
}

impl Workspace {
    /// A document with a single transparent layer.
    pub fn new(width: u32, height: u32) -> Self {
        let mut workspace = Self {
            width: width.max(1),
            height: height.max(1),
            layers: Vec::new(),
            active_layer_index: 0,
            next_layer_number: 1,
        };
        workspace.add_raster_layer();
        workspace
    }

    /// A document with a filled "Background" layer and a transparent layer on
    /// top of it.  The top layer is active.
    pub fn with_background(width: u32, height: u32, background: Pixel) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let mut background_layer = Layer::new(
            "Background",
            width,
            height,
            background,
            Box::new(RgbaSurface::new(width, height)),
        );
        background_layer.set_z_index(1);
        background_layer.render_full();

        let mut workspace = Self {
            width,
            height,
            layers: vec![background_layer],
            active_layer_index: 0,
            next_layer_number: 1,
        };
        workspace.add_raster_layer();
        workspace.active_layer_index = workspace.layers.len() - 1;
        workspace
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.width && (y as u32) < self.height
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer(&self, idx: usize) -> Option<&Layer> {
        self.layers.get(idx)
    }

    pub fn layer_mut(&mut self, idx: usize) -> Option<&mut Layer> {
        self.layers.get_mut(idx)
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    // ---- layer management ---------------------------------------------------

    /// Append a new transparent layer drawing onto `surface`.  It becomes the
    /// top-most layer and receives its initial full render immediately.
    pub fn add_layer(&mut self, surface: Box<dyn RasterSurface>) -> &mut Layer {
        let name = format!("Layer {}", self.next_layer_number);
        self.next_layer_number += 1;

        let mut layer = Layer::new(name, self.width, self.height, Pixel::Transparent, surface);
        layer.set_z_index(self.layers.len() + 1);
        layer.render_full();
        log_info!("Added {} ({}×{})", layer.name, self.width, self.height);

        self.layers.push(layer);
        let top = self.layers.len() - 1;
        &mut self.layers[top]
    }

    /// [`Workspace::add_layer`] with an in-memory [`RgbaSurface`].
    pub fn add_raster_layer(&mut self) -> &mut Layer {
        let surface = RgbaSurface::new(self.width, self.height);
        self.add_layer(Box::new(surface))
    }

    /// Remove the layer at `idx`.  The last remaining layer is cleared in
    /// place instead.  Returns `false` when `idx` is out of range.
    pub fn remove_layer(&mut self, idx: usize) -> bool {
        if idx >= self.layers.len() {
            return false;
        }

        if self.layers.len() == 1 {
            self.layers[0].clear();
            return true;
        }

        let removed = self.layers.remove(idx);
        log_info!("Removed {}", removed.name);

        let last = self.layers.len() - 1;
        if idx < self.active_layer_index {
            // Keep pointing at the same logical layer.
            self.active_layer_index -= 1;
        } else {
            self.active_layer_index = self.active_layer_index.min(last);
        }
        true
    }

    /// Move the layer at `from` so that it ends up at index `to`.  The active
    /// index follows the layer it pointed at before the move.
    pub fn move_layer(&mut self, from: usize, to: usize) -> bool {
        let len = self.layers.len();
        if from >= len || to >= len {
            return false;
        }
        if from == to {
            return true;
        }

        let layer = self.layers.remove(from);
        self.layers.insert(to, layer);

        let active = self.active_layer_index;
        self.active_layer_index = if active == from {
            to
        } else if from < active && to >= active {
            active - 1
        } else if from > active && to <= active {
            active + 1
        } else {
            active
        };
        true
    }

    /// Select the layer tools draw into.  Out-of-range indices are ignored.
    pub fn set_active_layer(&mut self, idx: usize) -> bool {
        if idx >= self.layers.len() {
            log_warn!(
                "set_active_layer({}) ignored: only {} layer(s)",
                idx,
                self.layers.len()
            );
            return false;
        }
        self.active_layer_index = idx;
        true
    }

    pub fn active_layer_index(&self) -> usize {
        self.active_layer_index
    }

    pub fn active_layer(&self) -> &Layer {
        &self.layers[self.active_layer_index]
    }

    pub fn active_layer_mut(&mut self) -> &mut Layer {
        &mut self.layers[self.active_layer_index]
    }

    // ---- per-frame ----------------------------------------------------------

    /// Restack (`z = position + 1`) and render every layer's pending changes.
    pub fn update(&mut self) -> RenderStats {
        let mut stats = RenderStats::default();
        for (index, layer) in self.layers.iter_mut().enumerate() {
            layer.set_z_index(index + 1);
            stats += layer.render();
        }
        stats
    }

    /// Drop every layer's hover preview and repaint what it covered.
    pub fn clear_overlays(&mut self) -> RenderStats {
        let mut stats = RenderStats::default();
        for layer in &mut self.layers {
            layer.clear_previous_overlay_box();
            stats += layer.render();
        }
        stats
    }

    // ---- composite ----------------------------------------------------------

    /// Flatten the committed pixels of all visible layers: per cell, the
    /// top-most non-`Transparent` value wins.  Overlays are not included.
    pub fn composite(&self) -> RgbaImage {
        let w = self.width as usize;
        // Top-most first.
        let sources: Vec<&[Pixel]> = self
            .layers
            .iter()
            .rev()
            .filter(|layer| layer.visible)
            .map(|layer| layer.model().pixels())
            .collect();

        let mut out = RgbaImage::new(self.width, self.height);
        out.par_chunks_mut(w * 4).enumerate().for_each(|(y, row)| {
            for x in 0..w {
                let idx = y * w + x;
                let pixel = sources
                    .iter()
                    .map(|pixels| pixels[idx])
                    .find(|p| *p != Pixel::Transparent)
                    .unwrap_or(Pixel::Transparent);
                row[x * 4..x * 4 + 4].copy_from_slice(&pixel.to_rgba().0);
            }
        });
        out
    }

    /// Composite magnified by an integer preview scale.
    pub fn preview(&self, scale: u32) -> RgbaImage {
        upscale_nearest(&self.composite(), scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::BrushShape;
    use image::Rgba;

    const RED: Pixel = Pixel::rgb(255, 0, 0);
    const GREEN: Pixel = Pixel::rgb(0, 255, 0);

    fn workspace_with(layers: usize) -> Workspace {
        let mut ws = Workspace::new(8, 8);
        for _ in 1..layers {
            ws.add_raster_layer();
        }
        ws
    }

    #[test]
    fn new_workspace_has_one_active_layer() {
        let ws = Workspace::new(16, 8);
        assert_eq!(ws.layer_count(), 1);
        assert_eq!(ws.active_layer_index(), 0);
        assert_eq!(ws.active_layer().width(), 16);
        assert_eq!(ws.active_layer().name, "Layer 1");
    }

    #[test]
    fn background_document_draws_on_top_layer() {
        let ws = Workspace::with_background(4, 4, Pixel::WHITE);
        assert_eq!(ws.layer_count(), 2);
        assert_eq!(ws.active_layer_index(), 1);
        assert_eq!(ws.layers()[0].name, "Background");
        assert_eq!(ws.layers()[0].model().dirty_count(), 0);
        let surface = ws.layers()[0].surface().as_rgba().unwrap();
        assert_eq!(surface.get_pixel(3, 3), &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn added_layer_goes_on_top() {
        let mut ws = Workspace::new(8, 8);
        let id = ws.add_raster_layer().id;
        assert_eq!(ws.layers().last().unwrap().id, id);
        assert_eq!(ws.layers()[1].name, "Layer 2");
    }

    #[test]
    fn removing_only_layer_clears_it() {
        let mut ws = Workspace::new(8, 8);
        ws.active_layer_mut().draw(3, 3, RED, BrushShape::Square, 3);
        assert!(ws.remove_layer(0));
        assert_eq!(ws.layer_count(), 1);
        assert!(ws.active_layer().model().pixels().iter().all(|p| *p == Pixel::Transparent));
    }

    #[test]
    fn removing_out_of_range_is_noop() {
        let mut ws = workspace_with(2);
        assert!(!ws.remove_layer(5));
        assert_eq!(ws.layer_count(), 2);
    }

    #[test]
    fn removing_active_top_layer_clamps() {
        let mut ws = workspace_with(3);
        ws.set_active_layer(2);
        ws.remove_layer(2);
        assert_eq!(ws.active_layer_index(), 1);
    }

    #[test]
    fn removing_active_middle_layer_keeps_index() {
        let mut ws = workspace_with(3);
        let above = ws.layers()[2].id;
        ws.set_active_layer(1);
        ws.remove_layer(1);
        assert_eq!(ws.active_layer_index(), 1);
        assert_eq!(ws.active_layer().id, above);
    }

    #[test]
    fn removing_below_active_tracks_same_layer() {
        let mut ws = workspace_with(3);
        ws.set_active_layer(2);
        let active = ws.active_layer().id;
        ws.remove_layer(0);
        assert_eq!(ws.active_layer_index(), 1);
        assert_eq!(ws.active_layer().id, active);
    }

    #[test]
    fn removing_above_active_leaves_it() {
        let mut ws = workspace_with(3);
        ws.set_active_layer(0);
        let active = ws.active_layer().id;
        ws.remove_layer(2);
        assert_eq!(ws.active_layer().id, active);
    }

    #[test]
    fn out_of_range_selection_is_ignored() {
        let mut ws = workspace_with(2);
        ws.set_active_layer(1);
        assert!(!ws.set_active_layer(7));
        assert_eq!(ws.active_layer_index(), 1);
    }

    #[test]
    fn move_layer_keeps_active_identity() {
        let mut ws = workspace_with(4);
        ws.set_active_layer(1);
        let active = ws.active_layer().id;

        assert!(ws.move_layer(0, 3));
        assert_eq!(ws.active_layer().id, active);
        assert!(ws.move_layer(3, 0));
        assert_eq!(ws.active_layer().id, active);
        assert!(ws.move_layer(ws.active_layer_index(), 2));
        assert_eq!(ws.active_layer_index(), 2);
        assert_eq!(ws.active_layer().id, active);
        assert!(!ws.move_layer(0, 9));
    }

    #[test]
    fn draw_only_touches_active_layer() {
        let mut ws = workspace_with(3);
        ws.set_active_layer(1);
        ws.active_layer_mut().draw(2, 2, RED, BrushShape::Circle, 3);
        for (idx, layer) in ws.layers().iter().enumerate() {
            let touched = layer.model().pixels().iter().any(|p| *p != Pixel::Transparent);
            assert_eq!(touched, idx == 1);
        }
    }

    #[test]
    fn update_restacks_and_drains() {
        let mut ws = workspace_with(2);
        ws.move_layer(1, 0);
        ws.active_layer_mut().draw(0, 0, RED, BrushShape::Square, 1);
        let stats = ws.update();
        assert_eq!(stats.painted, 1);
        assert_eq!(ws.layers()[0].z_index(), 1);
        assert_eq!(ws.layers()[1].z_index(), 2);
        assert!(ws.update().is_empty());
    }

    #[test]
    fn clear_overlays_removes_previews() {
        let mut ws = workspace_with(2);
        ws.active_layer_mut().draw_overlay(4, 4, GREEN, BrushShape::Square, 3);
        ws.update();
        let stats = ws.clear_overlays();
        assert_eq!(stats.cleared, 9);
        let layer = ws.active_layer();
        assert!(layer.overlay().pixels().iter().all(|p| *p == Pixel::Transparent));
        assert_eq!(layer.surface().as_rgba().unwrap().get_pixel(4, 4)[3], 0);
    }

    #[test]
    fn composite_prefers_top_visible_layer() {
        let mut ws = workspace_with(2);
        ws.layer_mut(0).unwrap().draw(1, 1, RED, BrushShape::Square, 1);
        ws.layer_mut(1).unwrap().draw(1, 1, GREEN, BrushShape::Square, 1);
        ws.layer_mut(0).unwrap().draw(2, 2, RED, BrushShape::Square, 1);

        let image = ws.composite();
        assert_eq!(image.get_pixel(1, 1), &Rgba([0, 255, 0, 255]));
        assert_eq!(image.get_pixel(2, 2), &Rgba([255, 0, 0, 255]));
        assert_eq!(image.get_pixel(0, 0), &Rgba([0, 0, 0, 0]));

        ws.layer_mut(1).unwrap().visible = false;
        assert_eq!(ws.composite().get_pixel(1, 1), &Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn composite_ignores_overlays() {
        let mut ws = Workspace::new(4, 4);
        ws.active_layer_mut().draw_overlay(0, 0, RED, BrushShape::Square, 1);
        assert_eq!(ws.composite().get_pixel(0, 0)[3], 0);
    }

    #[test]
    fn preview_is_scaled_composite() {
        let mut ws = Workspace::new(3, 2);
        ws.active_layer_mut().draw(2, 1, RED, BrushShape::Square, 1);
        let preview = ws.preview(4);
        assert_eq!(preview.dimensions(), (12, 8));
        assert_eq!(preview.get_pixel(11, 7), &Rgba([255, 0, 0, 255]));
        assert_eq!(preview.get_pixel(7, 3)[3], 0);
    }
}
