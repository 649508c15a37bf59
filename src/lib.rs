//! PixelPad: a layered pixel-art canvas engine.
//!
//! Layers keep a committed `model` buffer and a staged `overlay` buffer; both
//! track which cells changed so a render pass repaints only those cells.  The
//! [`workspace::Workspace`] stacks layers, [`app::PixelPadApp`] turns pointer
//! input into coalesced per-frame strokes, and [`io`] exports the composite.

#[macro_use]
pub mod logger;
pub mod app;
pub mod canvas;
pub mod cli;
pub mod components;
pub mod io;
pub mod ops;
pub mod project;
pub mod render;
pub mod workspace;

pub use app::PixelPadApp;
pub use canvas::{BrushShape, Layer, Pixel, PixelBuffer};
pub use workspace::Workspace;
