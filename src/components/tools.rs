use crate::canvas::{BrushShape, Layer, Pixel};

/// Largest brush a tool accepts, in cells.
pub const MAX_BRUSH_SIZE: u32 = 64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Brush {
    pub shape: BrushShape,
    size: u32,
}

impl Brush {
    pub fn new(shape: BrushShape, size: u32) -> Self {
        Self {
            shape,
            size: size.clamp(1, MAX_BRUSH_SIZE),
        }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn set_size(&mut self, size: u32) {
        self.size = size.clamp(1, MAX_BRUSH_SIZE);
    }
}

/// What applying a tool to one cell did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToolOutcome {
    Painted { changed: usize },
    Picked(Pixel),
    Nothing,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tool {
    Pencil(Brush),
    Eraser(Brush),
    Eyedropper,
}

impl Tool {
    pub fn pencil() -> Self {
        Tool::Pencil(Brush::new(BrushShape::Circle, 5))
    }

    pub fn eraser() -> Self {
        Tool::Eraser(Brush::new(BrushShape::Square, 1))
    }

    pub fn label(&self) -> &'static str {
        match self {
            Tool::Pencil(_) => "Pencil",
            Tool::Eraser(_) => "Eraser",
            Tool::Eyedropper => "Eyedropper",
        }
    }

    pub fn brush(&self) -> Option<&Brush> {
        match self {
            Tool::Pencil(brush) | Tool::Eraser(brush) => Some(brush),
            Tool::Eyedropper => None,
        }
    }

    pub fn brush_mut(&mut self) -> Option<&mut Brush> {
        match self {
            Tool::Pencil(brush) | Tool::Eraser(brush) => Some(brush),
            Tool::Eyedropper => None,
        }
    }

    /// Commit the tool's effect at one cell of `layer`.  Does not render.
    pub fn apply(&self, layer: &mut Layer, x: i32, y: i32, color: Pixel) -> ToolOutcome {
        match self {
            Tool::Pencil(brush) => ToolOutcome::Painted {
                changed: layer.draw(x, y, color, brush.shape, brush.size),
            },
            Tool::Eraser(brush) => ToolOutcome::Painted {
                changed: layer.draw(x, y, Pixel::Transparent, brush.shape, brush.size),
            },
            Tool::Eyedropper => match layer.model().get_pixel(x, y) {
                picked @ Pixel::Opaque(_) => ToolOutcome::Picked(picked),
                _ => ToolOutcome::Nothing,
            },
        }
    }

    /// Replace the layer's hover preview with this tool's footprint at
    /// `(x, y)`.  Does not render.
    pub fn draw_overlay(&self, layer: &mut Layer, x: i32, y: i32, color: Pixel) {
        layer.clear_previous_overlay_box();
        match self {
            Tool::Pencil(brush) => {
                layer.draw_overlay(x, y, color, brush.shape, brush.size);
            }
            Tool::Eraser(brush) => {
                layer.draw_overlay(x, y, Pixel::Erased, brush.shape, brush.size);
            }
            Tool::Eyedropper => {}
        }
    }
}

/// Registry of named tools with one active entry.
pub struct ToolManager {
    tools: Vec<(String, Tool)>,
    active: usize,
}

impl Default for ToolManager {
    fn default() -> Self {
        Self {
            tools: vec![
                ("pencil".to_string(), Tool::pencil()),
                ("eraser".to_string(), Tool::eraser()),
                ("eyedropper".to_string(), Tool::Eyedropper),
            ],
            active: 0,
        }
    }
}

impl ToolManager {
    /// Add a tool, or replace the one already registered under `name`.
    pub fn register(&mut self, name: impl Into<String>, tool: Tool) {
        let name = name.into();
        match self.tools.iter_mut().find(|(key, _)| *key == name) {
            Some((_, slot)) => *slot = tool,
            None => self.tools.push((name, tool)),
        }
    }

    pub fn set_active_tool(&mut self, name: &str) -> bool {
        match self.tools.iter().position(|(key, _)| key == name) {
            Some(idx) => {
                self.active = idx;
                true
            }
            None => {
                log_warn!("Unknown tool '{}'", name);
                false
            }
        }
    }

    pub fn active_tool(&self) -> &Tool {
        &self.tools[self.active].1
    }

    pub fn active_tool_mut(&mut self) -> &mut Tool {
        &mut self.tools[self.active].1
    }

    pub fn active_tool_name(&self) -> &str {
        &self.tools[self.active].0
    }

    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.tools.iter().find(|(key, _)| key == name).map(|(_, tool)| tool)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.iter().map(|(key, _)| key.as_str())
    }

    /// Change the active tool's brush shape.  `false` for an unknown shape or
    /// a tool without a brush.
    pub fn set_shape(&mut self, shape: &str) -> bool {
        let Some(shape) = BrushShape::parse(shape) else {
            return false;
        };
        match self.active_tool_mut().brush_mut() {
            Some(brush) => {
                brush.shape = shape;
                true
            }
            None => false,
        }
    }

    pub fn set_size(&mut self, size: u32) -> bool {
        match self.active_tool_mut().brush_mut() {
            Some(brush) => {
                brush.set_size(size);
                true
            }
            None => false,
        }
    }
}
