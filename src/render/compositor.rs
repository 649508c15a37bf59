// ============================================================================
// COMPOSITOR: dirty-driven layer painting
// ============================================================================
//
// Each layer owns one renderer and one output surface.  A render pass drains
// the dirty sets of the committed model and the staged overlay, resolves each
// touched cell (overlay first, unless Transparent), and issues exactly one
// paint or clear per cell.  Untouched cells are never visited.
// ============================================================================

use crate::canvas::{Pixel, PixelBuffer};

use super::surface::RasterSurface;

/// Paint calls issued by one render pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub painted: usize,
    pub cleared: usize,
}

impl RenderStats {
    pub fn total(&self) -> usize {
        self.painted + self.cleared
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

impl std::ops::AddAssign for RenderStats {
    fn add_assign(&mut self, rhs: Self) {
        self.painted += rhs.painted;
        self.cleared += rhs.cleared;
    }
}

/// Overlay value unless it is `Transparent`, otherwise the committed value.
#[inline]
pub fn effective_pixel(model: &PixelBuffer, overlay: &PixelBuffer, idx: usize) -> Pixel {
    let staged = overlay.pixel(idx);
    if staged != Pixel::Transparent {
        staged
    } else {
        model.pixel(idx)
    }
}

pub struct LayerRenderer {
    surface: Box<dyn RasterSurface>,
}

impl LayerRenderer {
    pub fn new(surface: Box<dyn RasterSurface>) -> Self {
        Self { surface }
    }

    pub fn surface(&self) -> &dyn RasterSurface {
        self.surface.as_ref()
    }

    #[inline]
    fn paint_cell(&mut self, x: u32, y: u32, pixel: Pixel, stats: &mut RenderStats) {
        match pixel {
            Pixel::Opaque(rgb) => {
                self.surface.fill_pixel(x, y, rgb);
                stats.painted += 1;
            }
            Pixel::Transparent | Pixel::Erased => {
                self.surface.clear_pixel(x, y);
                stats.cleared += 1;
            }
        }
    }

    /// Paint `model.dirty ∪ overlay.dirty`, then leave both sets empty.
    ///
    /// Both sets are drained up front, so any edit made after this call starts
    /// lands in the next pass rather than being lost.
    pub fn render(&mut self, model: &mut PixelBuffer, overlay: &mut PixelBuffer) -> RenderStats {
        let mut dirty = model.take_dirty();
        dirty.extend(overlay.take_dirty());
        let mut stats = RenderStats::default();
        if dirty.is_empty() {
            return stats;
        }
        dirty.sort_unstable();
        dirty.dedup();

        for idx in dirty {
            let (x, y) = model.coords_of(idx);
            let pixel = effective_pixel(model, overlay, idx);
            self.paint_cell(x, y, pixel, &mut stats);
        }
        stats
    }

    /// Paint every cell regardless of dirty state, then drain both sets.
    pub fn render_full(&mut self, model: &mut PixelBuffer, overlay: &mut PixelBuffer) -> RenderStats {
        let mut stats = RenderStats::default();
        for idx in 0..model.len() {
            let (x, y) = model.coords_of(idx);
            let pixel = effective_pixel(model, overlay, idx);
            self.paint_cell(x, y, pixel, &mut stats);
        }
        model.clear_dirty();
        overlay.clear_dirty();
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use std::sync::{Arc, Mutex};

    use crate::render::RgbaSurface;

    #[derive(Clone, Debug, PartialEq, Eq)]
    enum Call {
        Fill(u32, u32, u32),
        Clear(u32, u32),
    }

    struct Recorder {
        calls: Arc<Mutex<Vec<Call>>>,
    }

    impl RasterSurface for Recorder {
        fn size(&self) -> (u32, u32) {
            (8, 8)
        }
        fn fill_pixel(&mut self, x: u32, y: u32, rgb: u32) {
            self.calls.lock().unwrap().push(Call::Fill(x, y, rgb));
        }
        fn clear_pixel(&mut self, x: u32, y: u32) {
            self.calls.lock().unwrap().push(Call::Clear(x, y));
        }
        fn clear_region(&mut self, _x: u32, _y: u32, _w: u32, _h: u32) {}
    }

    fn recorder() -> (LayerRenderer, Arc<Mutex<Vec<Call>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let renderer = LayerRenderer::new(Box::new(Recorder { calls: calls.clone() }));
        (renderer, calls)
    }

    #[test]
    fn only_dirty_cells_are_painted() {
        let (mut renderer, calls) = recorder();
        let mut model = PixelBuffer::new(8, 8);
        let mut overlay = PixelBuffer::new(8, 8);
        model.set_pixel(1, 2, Pixel::from_rgb(0xABCDEF));

        let stats = renderer.render(&mut model, &mut overlay);
        assert_eq!(stats, RenderStats { painted: 1, cleared: 0 });
        assert_eq!(*calls.lock().unwrap(), vec![Call::Fill(1, 2, 0xABCDEF)]);
        assert_eq!(model.dirty_count(), 0);

        // Nothing changed since: nothing to paint.
        assert!(renderer.render(&mut model, &mut overlay).is_empty());
    }

    #[test]
    fn overlay_takes_precedence_per_cell() {
        let (mut renderer, calls) = recorder();
        let mut model = PixelBuffer::new(8, 8);
        let mut overlay = PixelBuffer::new(8, 8);
        model.set_pixel(0, 0, Pixel::from_rgb(0x111111));
        model.set_pixel(1, 0, Pixel::from_rgb(0x111111));
        overlay.set_pixel(0, 0, Pixel::from_rgb(0x222222));
        overlay.set_pixel(1, 0, Pixel::Erased);

        renderer.render(&mut model, &mut overlay);
        assert_eq!(
            *calls.lock().unwrap(),
            vec![Call::Fill(0, 0, 0x222222), Call::Clear(1, 0)]
        );
    }

    #[test]
    fn shared_dirty_index_paints_once() {
        let (mut renderer, calls) = recorder();
        let mut model = PixelBuffer::new(8, 8);
        let mut overlay = PixelBuffer::new(8, 8);
        model.set_pixel(3, 3, Pixel::from_rgb(0x010101));
        overlay.set_pixel(3, 3, Pixel::from_rgb(0x020202));
        let stats = renderer.render(&mut model, &mut overlay);
        assert_eq!(stats.total(), 1);
        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn transparent_overlay_reveals_model() {
        let (mut renderer, calls) = recorder();
        let mut model = PixelBuffer::new(8, 8);
        let mut overlay = PixelBuffer::new(8, 8);
        model.set_pixel(2, 2, Pixel::from_rgb(0x0000FF));
        overlay.set_pixel(2, 2, Pixel::from_rgb(0xFF0000));
        renderer.render(&mut model, &mut overlay);
        calls.lock().unwrap().clear();

        overlay.set_pixel(2, 2, Pixel::Transparent);
        renderer.render(&mut model, &mut overlay);
        assert_eq!(*calls.lock().unwrap(), vec![Call::Fill(2, 2, 0x0000FF)]);
    }

    #[test]
    fn full_render_visits_every_cell() {
        let (mut renderer, calls) = recorder();
        let mut model = PixelBuffer::new(4, 2);
        let mut overlay = PixelBuffer::new(4, 2);
        model.set_pixel(0, 0, Pixel::from_rgb(0x00FF00));
        let stats = renderer.render_full(&mut model, &mut overlay);
        assert_eq!(stats, RenderStats { painted: 1, cleared: 7 });
        assert_eq!(calls.lock().unwrap().len(), 8);
        assert_eq!(model.dirty_count(), 0);
    }

    #[test]
    fn renders_into_rgba_surface() {
        let mut renderer = LayerRenderer::new(Box::new(RgbaSurface::new(4, 4)));
        let mut model = PixelBuffer::new(4, 4);
        let mut overlay = PixelBuffer::new(4, 4);
        model.set_pixel(3, 1, Pixel::rgb(9, 8, 7));
        renderer.render(&mut model, &mut overlay);
        let image = renderer.surface().as_rgba().unwrap();
        assert_eq!(image.get_pixel(3, 1), &Rgba([9, 8, 7, 255]));
        assert_eq!(image.get_pixel(0, 0), &Rgba([0, 0, 0, 0]));
    }
}
