// ============================================================================
// RENDER MODULE: turning layer buffers into pixels on an output surface
// ============================================================================
//
// Architecture:
//   surface.rs    RasterSurface trait (the only drawing primitives the core
//                   needs) and RgbaSurface, an in-memory implementation
//   compositor.rs LayerRenderer: dirty-index driven painting with overlay
//                   precedence, plus the full-buffer variant
//   preview.rs    integer-scale upscaling for the live preview
// ============================================================================

pub mod compositor;
pub mod preview;
pub mod surface;

pub use compositor::{LayerRenderer, RenderStats, effective_pixel};
pub use preview::{MAX_PREVIEW_SCALE, upscale_nearest};
pub use surface::{RasterSurface, RgbaSurface};
