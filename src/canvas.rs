use image::Rgba;
use uuid::Uuid;

use crate::render::{LayerRenderer, RasterSurface, RenderStats};

// ============================================================================
// PIXEL VALUES
// ============================================================================

/// Packed form of [`Pixel::Transparent`].
pub const TRANSPARENT_PACKED: u32 = 0x0000_0000;
/// Packed form of [`Pixel::Erased`]: zero alpha, white RGB.
pub const ERASED_PACKED: u32 = 0x00FF_FFFF;

const OPAQUE_ALPHA: u32 = 0xFF00_0000;
const RGB_MASK: u32 = 0x00FF_FFFF;

/// A single cell of a pixel buffer.
///
/// Colors cross the crate boundary packed as `0xAARRGGBB`.  Every opaque
/// color carries alpha `0xFF`, the two sentinels carry alpha `0x00`, so a
/// paintable color can never be mistaken for a sentinel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Pixel {
    /// Nothing painted here; whatever is beneath shows through.
    #[default]
    Transparent,
    /// Explicitly erased.  Renders like `Transparent` but is a distinct value.
    Erased,
    /// Opaque color, `0xRRGGBB`.  Build with [`Pixel::rgb`] / [`Pixel::from_rgb`].
    Opaque(u32),
}

impl Pixel {
    pub const BLACK: Pixel = Pixel::Opaque(0x000000);
    pub const WHITE: Pixel = Pixel::Opaque(0xFFFFFF);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Pixel::Opaque(((r as u32) << 16) | ((g as u32) << 8) | b as u32)
    }

    /// Opaque pixel from a `0xRRGGBB` value (high byte ignored).
    pub const fn from_rgb(rgb: u32) -> Self {
        Pixel::Opaque(rgb & RGB_MASK)
    }

    /// Drop stray high bits from an opaque value so equal colors compare equal.
    pub const fn normalized(self) -> Self {
        match self {
            Pixel::Opaque(rgb) => Pixel::Opaque(rgb & RGB_MASK),
            other => other,
        }
    }

    /// `true` for both sentinels: the renderer paints nothing for these.
    pub fn is_empty(self) -> bool {
        !matches!(self, Pixel::Opaque(_))
    }

    pub fn is_opaque(self) -> bool {
        matches!(self, Pixel::Opaque(_))
    }

    pub fn pack(self) -> u32 {
        match self {
            Pixel::Transparent => TRANSPARENT_PACKED,
            Pixel::Erased => ERASED_PACKED,
            Pixel::Opaque(rgb) => OPAQUE_ALPHA | (rgb & RGB_MASK),
        }
    }

    /// Inverse of [`Pixel::pack`].  Values that are neither opaque nor the
    /// erased sentinel decode as `Transparent`.
    pub fn unpack(value: u32) -> Self {
        if value & OPAQUE_ALPHA == OPAQUE_ALPHA {
            Pixel::Opaque(value & RGB_MASK)
        } else if value == ERASED_PACKED {
            Pixel::Erased
        } else {
            Pixel::Transparent
        }
    }

    /// `[r, g, b]` of an opaque pixel.
    pub fn channels(self) -> Option<[u8; 3]> {
        match self {
            Pixel::Opaque(rgb) => Some([(rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8]),
            _ => None,
        }
    }

    /// RGBA8888 export value.  Only `Transparent` maps to alpha 0; everything
    /// else is alpha 255 with RGB taken from the low 24 bits of the packed form.
    pub fn to_rgba(self) -> Rgba<u8> {
        if self == Pixel::Transparent {
            return Rgba([0, 0, 0, 0]);
        }
        let v = self.pack();
        Rgba([(v >> 16) as u8, (v >> 8) as u8, v as u8, 255])
    }
}

// ============================================================================
// BRUSH SHAPES
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum BrushShape {
    #[default]
    Circle,
    Square,
}

impl BrushShape {
    pub fn all() -> &'static [BrushShape] {
        &[BrushShape::Circle, BrushShape::Square]
    }

    pub fn name(&self) -> &'static str {
        match self {
            BrushShape::Circle => "circle",
            BrushShape::Square => "square",
        }
    }

    /// Parse a shape name coming from a collaborator (`"circle"`, `"square"`).
    /// Unknown names are logged and rejected.
    pub fn parse(name: &str) -> Option<BrushShape> {
        match name.trim().to_ascii_lowercase().as_str() {
            "circle" => Some(BrushShape::Circle),
            "square" => Some(BrushShape::Square),
            _ => {
                log_warn!("Unknown shape: {:?}", name);
                None
            }
        }
    }
}

// ============================================================================
// PIXEL BUFFER – dense grid with dirty-index tracking
// ============================================================================

/// Insertion-ordered set of cell indices.  `marked` gives O(1) membership so
/// repeated writes to one cell never grow `order`.
#[derive(Clone, Debug, Default)]
struct DirtySet {
    marked: Vec<bool>,
    order: Vec<usize>,
}

impl DirtySet {
    fn new(len: usize) -> Self {
        Self {
            marked: vec![false; len],
            order: Vec::new(),
        }
    }

    #[inline]
    fn insert(&mut self, idx: usize) {
        if !self.marked[idx] {
            self.marked[idx] = true;
            self.order.push(idx);
        }
    }

    fn insert_all(&mut self) {
        for idx in 0..self.marked.len() {
            self.insert(idx);
        }
    }

    fn contains(&self, idx: usize) -> bool {
        self.marked.get(idx).copied().unwrap_or(false)
    }

    fn clear(&mut self) {
        for &idx in &self.order {
            self.marked[idx] = false;
        }
        self.order.clear();
    }

    fn take(&mut self) -> Vec<usize> {
        for &idx in &self.order {
            self.marked[idx] = false;
        }
        std::mem::take(&mut self.order)
    }
}

/// Fixed-size, row-major grid of [`Pixel`]s (`index = y * width + x`).
///
/// Every mutation that actually changes a cell records its index in the dirty
/// set; writes of an identical value are no-ops and leave the set untouched.
/// Coordinates are signed so that stamps centred near an edge can be clipped;
/// anything outside `[0, width) × [0, height)` is silently skipped.
#[derive(Clone, Debug)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    pixels: Vec<Pixel>,
    dirty: DirtySet,
}

impl PixelBuffer {
    // ---- construction -------------------------------------------------------

    /// Create a fully transparent buffer.
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_fill(width, height, Pixel::Transparent)
    }

    /// Create a buffer filled with `fill`.  A non-transparent fill marks every
    /// cell dirty so the first render paints it.
    pub fn with_fill(width: u32, height: u32, fill: Pixel) -> Self {
        let (width, height) = if width == 0 || height == 0 {
            log_warn!("PixelBuffer::with_fill: {}×{} is empty, clamped to at least 1×1", width, height);
            (width.max(1), height.max(1))
        } else {
            (width, height)
        };
        let len = width as usize * height as usize;
        let fill = fill.normalized();
        let mut buffer = Self {
            width,
            height,
            pixels: vec![fill; len],
            dirty: DirtySet::new(len),
        };
        if fill != Pixel::Transparent {
            buffer.dirty.insert_all();
        }
        buffer
    }

    // ---- geometry -----------------------------------------------------------

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.width && (y as u32) < self.height
    }

    /// Flat index of `(x, y)`, or `None` when out of range.
    #[inline]
    pub fn index_of(&self, x: i32, y: i32) -> Option<usize> {
        if self.contains(x, y) {
            Some(y as usize * self.width as usize + x as usize)
        } else {
            None
        }
    }

    /// `(x, y)` of a flat index.
    #[inline]
    pub fn coords_of(&self, idx: usize) -> (u32, u32) {
        let w = self.width as usize;
        ((idx % w) as u32, (idx / w) as u32)
    }

    // ---- pixel access -------------------------------------------------------

    /// Raw stored value, sentinels included.  Out of range reads as `Transparent`.
    #[inline]
    pub fn get_pixel(&self, x: i32, y: i32) -> Pixel {
        self.index_of(x, y)
            .map(|idx| self.pixels[idx])
            .unwrap_or(Pixel::Transparent)
    }

    /// Value at a flat index.  Out of range reads as `Transparent`.
    #[inline]
    pub fn pixel(&self, idx: usize) -> Pixel {
        self.pixels.get(idx).copied().unwrap_or(Pixel::Transparent)
    }

    pub fn pixels(&self) -> &[Pixel] {
        &self.pixels
    }

    #[inline]
    fn write(&mut self, idx: usize, pixel: Pixel) -> bool {
        let pixel = pixel.normalized();
        if self.pixels[idx] == pixel {
            return false;
        }
        self.pixels[idx] = pixel;
        self.dirty.insert(idx);
        true
    }

    /// Write one cell.  Returns `true` when the stored value changed.
    pub fn set_pixel(&mut self, x: i32, y: i32, pixel: Pixel) -> bool {
        match self.index_of(x, y) {
            Some(idx) => self.write(idx, pixel),
            None => false,
        }
    }

    /// Fill the inclusive span `[x0, x1]` of row `py`.  Caller clips.
    fn fill_span(&mut self, py: u32, x0: u32, x1: u32, pixel: Pixel) -> usize {
        let row = py as usize * self.width as usize;
        let mut changed = 0;
        for px in x0..=x1 {
            if self.write(row + px as usize, pixel) {
                changed += 1;
            }
        }
        changed
    }

    // ---- stamping -----------------------------------------------------------

    /// Stamp a filled disk of the given diameter centred on `(cx, cy)`.
    ///
    /// Rows use `radius = diameter / 2` and a half chord of
    /// `floor(sqrt(radius² - dy²))`, so every painted cell satisfies
    /// `dx² + dy² <= radius²`.  Returns the number of cells that changed.
    pub fn set_circle(&mut self, cx: i32, cy: i32, diameter: u32, pixel: Pixel) -> usize {
        let radius = (diameter / 2) as i64;
        let r2 = radius * radius;
        let (w, h) = (self.width as i64, self.height as i64);
        let (cx, cy) = (cx as i64, cy as i64);
        let mut changed = 0;

        for dy in -radius..=radius {
            let py = cy + dy;
            if py < 0 || py >= h {
                continue;
            }
            let dx_limit = ((r2 - dy * dy) as u64).isqrt() as i64;
            let start_x = (cx - dx_limit).max(0);
            let end_x = (cx + dx_limit).min(w - 1);
            if start_x > end_x {
                continue;
            }
            changed += self.fill_span(py as u32, start_x as u32, end_x as u32, pixel);
        }
        changed
    }

    /// Stamp an axis-aligned square covering `[c - side/2, c + side/2]` on both
    /// axes.  Returns the number of cells that changed.
    pub fn set_square(&mut self, cx: i32, cy: i32, side: u32, pixel: Pixel) -> usize {
        let half = (side / 2) as i64;
        let (w, h) = (self.width as i64, self.height as i64);
        let (cx, cy) = (cx as i64, cy as i64);

        let start_y = (cy - half).max(0);
        let end_y = (cy + half).min(h - 1);
        let start_x = (cx - half).max(0);
        let end_x = (cx + half).min(w - 1);
        if start_x > end_x || start_y > end_y {
            return 0;
        }

        let mut changed = 0;
        for py in start_y..=end_y {
            changed += self.fill_span(py as u32, start_x as u32, end_x as u32, pixel);
        }
        changed
    }

    // ---- bulk operations ----------------------------------------------------

    /// Reset every cell to `Transparent` and mark the whole buffer dirty.
    pub fn clear(&mut self) {
        self.pixels.fill(Pixel::Transparent);
        self.dirty.insert_all();
    }

    // ---- dirty tracking -----------------------------------------------------

    /// Snapshot of the dirty indices, in first-touched order.
    pub fn dirty_pixels(&self) -> Vec<usize> {
        self.dirty.order.clone()
    }

    pub fn clear_dirty(&mut self) {
        self.dirty.clear();
    }

    /// Read and reset the dirty set in one step.
    pub fn take_dirty(&mut self) -> Vec<usize> {
        self.dirty.take()
    }

    pub fn dirty_count(&self) -> usize {
        self.dirty.order.len()
    }

    pub fn is_dirty(&self, idx: usize) -> bool {
        self.dirty.contains(idx)
    }
}

// ============================================================================
// LAYER – committed model + staged overlay
// ============================================================================

/// Region of the most recent overlay stamp, remembered so the next preview
/// can erase exactly that area instead of wiping the whole overlay.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OverlayBox {
    pub x: i32,
    pub y: i32,
    pub size: u32,
}

pub struct Layer {
    pub id: Uuid,
    pub name: String,
    pub visible: bool,
    /// Exposed for collaborators; the core itself never refuses a draw.
    pub locked: bool,
    z_index: usize,
    model: PixelBuffer,
    overlay: PixelBuffer,
    previous_overlay: Option<OverlayBox>,
    renderer: LayerRenderer,
}

impl Layer {
    pub fn new(
        name: impl Into<String>,
        width: u32,
        height: u32,
        fill: Pixel,
        surface: Box<dyn RasterSurface>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            visible: true,
            locked: false,
            z_index: 0,
            model: PixelBuffer::with_fill(width, height, fill),
            overlay: PixelBuffer::new(width, height),
            previous_overlay: None,
            renderer: LayerRenderer::new(surface),
        }
    }

    pub fn width(&self) -> u32 {
        self.model.width()
    }

    pub fn height(&self) -> u32 {
        self.model.height()
    }

    /// Committed pixels.
    pub fn model(&self) -> &PixelBuffer {
        &self.model
    }

    /// Staged preview pixels.
    pub fn overlay(&self) -> &PixelBuffer {
        &self.overlay
    }

    pub fn previous_overlay(&self) -> Option<OverlayBox> {
        self.previous_overlay
    }

    pub fn z_index(&self) -> usize {
        self.z_index
    }

    pub fn set_z_index(&mut self, z: usize) {
        self.z_index = z;
    }

    pub fn surface(&self) -> &dyn RasterSurface {
        self.renderer.surface()
    }

    /// Overlay wins over the committed pixel unless it is `Transparent`.
    pub fn composited_pixel(&self, idx: usize) -> Pixel {
        crate::render::effective_pixel(&self.model, &self.overlay, idx)
    }

    fn stamp(
        buffer: &mut PixelBuffer,
        x: i32,
        y: i32,
        pixel: Pixel,
        shape: BrushShape,
        size: u32,
    ) -> usize {
        // Size 1 is always a single cell, whatever the shape.
        if size <= 1 {
            return buffer.set_pixel(x, y, pixel) as usize;
        }
        match shape {
            BrushShape::Circle => buffer.set_circle(x, y, size, pixel),
            BrushShape::Square => buffer.set_square(x, y, size, pixel),
        }
    }

    /// Commit a stamp into the model.  Returns the number of changed cells.
    pub fn draw(&mut self, x: i32, y: i32, pixel: Pixel, shape: BrushShape, size: u32) -> usize {
        Self::stamp(&mut self.model, x, y, pixel, shape, size)
    }

    /// [`Layer::draw`] with a shape name from a collaborator.  An unknown name
    /// is a logged no-op (single-pixel draws never look at the shape).
    pub fn draw_named(&mut self, x: i32, y: i32, pixel: Pixel, shape: &str, size: u32) -> usize {
        if size <= 1 {
            return self.model.set_pixel(x, y, pixel) as usize;
        }
        match BrushShape::parse(shape) {
            Some(shape) => self.draw(x, y, pixel, shape, size),
            None => 0,
        }
    }

    /// Stage a stamp into the overlay and remember its region.
    pub fn draw_overlay(
        &mut self,
        x: i32,
        y: i32,
        pixel: Pixel,
        shape: BrushShape,
        size: u32,
    ) -> usize {
        let changed = Self::stamp(&mut self.overlay, x, y, pixel, shape, size);
        self.previous_overlay = Some(OverlayBox { x, y, size });
        changed
    }

    /// Erase the last staged region from the overlay.
    ///
    /// NOTE: always clears a square of the recorded size, even when the stamp
    /// was a circle.  A circle of diameter `d` fits inside the square of side
    /// `d`, so nothing is left behind; the cost is clearing a few corner cells
    /// that were never staged.
    pub fn clear_previous_overlay_box(&mut self) {
        if let Some(region) = self.previous_overlay.take() {
            self.overlay
                .set_square(region.x, region.y, region.size, Pixel::Transparent);
        }
    }

    pub fn clear_overlay(&mut self) {
        self.overlay.clear();
        self.previous_overlay = None;
    }

    /// Clear committed and staged pixels.
    pub fn clear(&mut self) {
        self.model.clear();
        self.overlay.clear();
        self.previous_overlay = None;
    }

    /// Paint only the cells that changed since the last render.
    pub fn render(&mut self) -> RenderStats {
        self.renderer.render(&mut self.model, &mut self.overlay)
    }

    /// Paint every cell (first render of a new surface).
    pub fn render_full(&mut self) -> RenderStats {
        self.renderer.render_full(&mut self.model, &mut self.overlay)
    }
}
