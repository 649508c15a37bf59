use image::RgbaImage;
use std::path::Path;

use crate::canvas::Pixel;
use crate::components::tools::{Tool, ToolManager, ToolOutcome};
use crate::io::{self, ExportError};
use crate::ops::stroke::{Cell, clip_segment, line_points};
use crate::project::{DocumentConfig, Project};
use crate::render::RenderStats;
use crate::workspace::Workspace;

/// Pointer state between input events.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PointerState {
    pub is_drawing: bool,
    /// Last cell a stroke segment was applied to.
    pub last_cell: Option<Cell>,
}

/// The single mutation batch waiting for the next tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FrameRequest {
    /// Apply the active tool along `from → to`.  `fresh` means `from` itself
    /// has not been applied yet (first segment after pointer-down).
    Stroke { from: Cell, to: Cell, fresh: bool },
    Hover(Cell),
    Leave,
}

/// Application context: one open document, the tool registry, the current
/// color and the pointer/frame state machine.
///
/// Input glue forwards grid coordinates through `pointer_*` and calls
/// [`PixelPadApp::tick`] once per frame.  Between ticks at most one request is
/// pending; later pointer moves overwrite earlier ones, but a stroke always
/// resumes from the last applied cell so no cells are skipped.
pub struct PixelPadApp {
    project: Option<Project>,
    untitled_counter: usize,
    tools: ToolManager,
    color: Pixel,
    pointer: PointerState,
    pending: Option<FrameRequest>,
    frames_rendered: u64,
    last_stats: RenderStats,
}

impl Default for PixelPadApp {
    fn default() -> Self {
        Self {
            project: None,
            untitled_counter: 0,
            tools: ToolManager::default(),
            color: Pixel::BLACK,
            pointer: PointerState::default(),
            pending: None,
            frames_rendered: 0,
            last_stats: RenderStats::default(),
        }
    }
}

impl PixelPadApp {
    pub fn new() -> Self {
        Self::default()
    }

    // ---- document -----------------------------------------------------------

    /// Replace the open document with a fresh one.  Pointer state and any
    /// pending frame request are discarded.
    pub fn new_document(&mut self, config: DocumentConfig) -> &mut Project {
        self.untitled_counter += 1;
        self.pointer = PointerState::default();
        self.pending = None;
        log_info!(
            "New document {}×{} (background: {})",
            config.width,
            config.height,
            config.background.is_some()
        );
        self.project
            .insert(Project::new_untitled(self.untitled_counter, config))
    }

    pub fn project(&self) -> Option<&Project> {
        self.project.as_ref()
    }

    pub fn project_mut(&mut self) -> Option<&mut Project> {
        self.project.as_mut()
    }

    pub fn workspace(&self) -> Option<&Workspace> {
        self.project.as_ref().map(|p| &p.workspace)
    }

    pub fn workspace_mut(&mut self) -> Option<&mut Workspace> {
        self.project.as_mut().map(|p| &mut p.workspace)
    }

    /// Select the layer tools draw into.  Hover previews on the old layer are
    /// cleared first.
    pub fn set_active_layer(&mut self, idx: usize) -> bool {
        let Some(ws) = self.workspace_mut() else {
            return false;
        };
        if idx >= ws.layer_count() {
            return ws.set_active_layer(idx);
        }
        ws.clear_overlays();
        ws.set_active_layer(idx)
    }

    // ---- tools & color ------------------------------------------------------

    pub fn tools(&self) -> &ToolManager {
        &self.tools
    }

    pub fn tools_mut(&mut self) -> &mut ToolManager {
        &mut self.tools
    }

    pub fn color(&self) -> Pixel {
        self.color
    }

    /// Only opaque colors can be drawn with.
    pub fn set_color(&mut self, color: Pixel) -> bool {
        if !color.is_opaque() {
            return false;
        }
        self.color = color;
        true
    }

    // ---- pointer input ------------------------------------------------------

    pub fn pointer(&self) -> PointerState {
        self.pointer
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Start a stroke at `(x, y)`.  Ignored without a document, off-canvas, or
    /// when a painting tool targets a locked layer.
    pub fn pointer_down(&mut self, x: i32, y: i32) -> bool {
        let Some(ws) = self.workspace() else {
            return false;
        };
        if !ws.contains(x, y) {
            return false;
        }
        let layer = ws.active_layer();
        if layer.locked && !matches!(self.tools.active_tool(), Tool::Eyedropper) {
            log_warn!("Refusing to draw on locked layer '{}'", layer.name);
            return false;
        }

        self.pointer.is_drawing = true;
        self.pending = Some(FrameRequest::Stroke {
            from: (x, y),
            to: (x, y),
            fresh: true,
        });
        true
    }

    pub fn pointer_move(&mut self, x: i32, y: i32) {
        if self.project.is_none() {
            return;
        }

        if self.pointer.is_drawing {
            let request = match self.pending {
                Some(FrameRequest::Stroke { from, fresh, .. }) => FrameRequest::Stroke {
                    from,
                    to: (x, y),
                    fresh,
                },
                _ => match self.pointer.last_cell {
                    Some(from) => FrameRequest::Stroke {
                        from,
                        to: (x, y),
                        fresh: false,
                    },
                    None => FrameRequest::Stroke {
                        from: (x, y),
                        to: (x, y),
                        fresh: true,
                    },
                },
            };
            self.pending = Some(request);
            return;
        }

        let inside = self.workspace().is_some_and(|ws| ws.contains(x, y));
        if inside {
            self.queue(FrameRequest::Hover((x, y)));
        } else {
            self.queue(FrameRequest::Leave);
        }
    }

    /// End the stroke.  A pending segment is applied and rendered now.
    pub fn pointer_up(&mut self) {
        if !self.pointer.is_drawing {
            return;
        }
        self.pointer.is_drawing = false;
        if matches!(self.pending, Some(FrameRequest::Stroke { .. })) {
            self.tick();
        }
    }

    pub fn pointer_leave(&mut self) {
        if self.project.is_none() {
            return;
        }
        self.queue(FrameRequest::Leave);
    }

    /// Queue a non-stroke request.  A stroke still waiting is applied first so
    /// it cannot be overwritten.
    fn queue(&mut self, request: FrameRequest) {
        if matches!(self.pending, Some(FrameRequest::Stroke { .. })) {
            self.tick();
        }
        self.pending = Some(request);
    }

    // ---- frame --------------------------------------------------------------

    /// Apply the pending request and render once.  Returns `false` when there
    /// was nothing to do.
    pub fn tick(&mut self) -> bool {
        let Some(request) = self.pending.take() else {
            return false;
        };
        let Some(project) = self.project.as_mut() else {
            return false;
        };
        let tool = *self.tools.active_tool();
        let color = self.color;
        let ws = &mut project.workspace;

        let stats = match request {
            FrameRequest::Stroke { from, to, fresh } => {
                // Only the part of the segment a stamp can still reach is walked.
                let reach = tool.brush().map_or(0, |b| b.size() as i32 / 2 + 1);
                let max = (ws.width() as i32 - 1 + reach, ws.height() as i32 - 1 + reach);
                let clipped = clip_segment(from, to, (-reach, -reach), max);

                let layer = ws.active_layer_mut();
                let mut changed = 0;
                let mut picked = None;
                if let Some((start, end)) = clipped {
                    let skip = usize::from(!fresh && start == from);
                    for (x, y) in line_points(start, end).skip(skip) {
                        match tool.apply(layer, x, y, color) {
                            ToolOutcome::Painted { changed: n } => changed += n,
                            ToolOutcome::Picked(pixel) => picked = Some(pixel),
                            ToolOutcome::Nothing => {}
                        }
                    }
                }
                tool.draw_overlay(layer, to.0, to.1, color);
                self.pointer.last_cell = Some(to);

                let stats = ws.update();
                if changed > 0 {
                    project.mark_dirty();
                }
                if let Some(pixel) = picked {
                    self.color = pixel;
                }
                stats
            }
            FrameRequest::Hover((x, y)) => {
                tool.draw_overlay(ws.active_layer_mut(), x, y, color);
                ws.update()
            }
            FrameRequest::Leave => ws.clear_overlays(),
        };

        self.frames_rendered += 1;
        self.last_stats = stats;
        true
    }

    /// Number of ticks that rendered.
    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    pub fn last_stats(&self) -> RenderStats {
        self.last_stats
    }

    // ---- output -------------------------------------------------------------

    /// Export the composite of the open document.
    pub fn export_png(&mut self, path: &Path) -> Result<(), ExportError> {
        let Some(project) = self.project.as_mut() else {
            return Err(ExportError::Empty);
        };
        io::export_png(&project.workspace, path)?;
        project.path = Some(path.to_path_buf());
        project.update_name_from_path();
        project.mark_clean();
        Ok(())
    }

    /// Composite magnified by the document's preview scale.
    pub fn preview(&self) -> Option<RgbaImage> {
        self.project
            .as_ref()
            .map(|p| p.workspace.preview(p.config.preview_scale))
    }
}
