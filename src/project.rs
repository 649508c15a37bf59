use std::path::PathBuf;
use uuid::Uuid;

use crate::canvas::Pixel;
use crate::render::MAX_PREVIEW_SCALE;
use crate::workspace::Workspace;

/// Largest document edge, in cells.
pub const MAX_DOCUMENT_DIM: u32 = 256;
/// Edge used when none (or zero) is given.
pub const DEFAULT_DOCUMENT_DIM: u32 = 32;
pub const DEFAULT_PREVIEW_SCALE: u32 = 4;

/// Settings chosen when a document is created.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DocumentConfig {
    pub width: u32,
    pub height: u32,
    /// Fill of an extra bottom "Background" layer, if any.
    pub background: Option<Pixel>,
    pub preview_scale: u32,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self::new(DEFAULT_DOCUMENT_DIM, DEFAULT_DOCUMENT_DIM)
    }
}

impl DocumentConfig {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: clamp_dim(width),
            height: clamp_dim(height),
            background: None,
            preview_scale: DEFAULT_PREVIEW_SCALE,
        }
    }

    pub fn with_background(mut self, background: Pixel) -> Self {
        // A transparent background is the same as none.
        self.background = background.is_opaque().then_some(background);
        self
    }

    pub fn with_preview_scale(mut self, scale: u32) -> Self {
        self.preview_scale = scale.clamp(1, MAX_PREVIEW_SCALE);
        self
    }

    pub fn build_workspace(&self) -> Workspace {
        match self.background {
            Some(fill) => Workspace::with_background(self.width, self.height, fill),
            None => Workspace::new(self.width, self.height),
        }
    }
}

fn clamp_dim(value: u32) -> u32 {
    if value == 0 {
        DEFAULT_DOCUMENT_DIM
    } else {
        value.min(MAX_DOCUMENT_DIM)
    }
}

/// Single open document.
pub struct Project {
    pub id: Uuid,
    pub config: DocumentConfig,
    pub workspace: Workspace,
    /// Last export target; `None` until the first export.
    pub path: Option<PathBuf>,
    pub is_dirty: bool,

    /// Display name (derived from path or "Untitled-X")
    pub name: String,
}

impl Project {
    pub fn new_untitled(untitled_counter: usize, config: DocumentConfig) -> Self {
        Self {
            id: Uuid::new_v4(),
            workspace: config.build_workspace(),
            config,
            path: None,
            is_dirty: false,
            name: format!("Untitled-{}", untitled_counter),
        }
    }

    pub fn mark_dirty(&mut self) {
        self.is_dirty = true;
    }

    pub fn mark_clean(&mut self) {
        self.is_dirty = false;
    }

    pub fn update_name_from_path(&mut self) {
        if let Some(ref path) = self.path {
            self.name = path
                .file_name()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| "Unknown".to_string());
        }
    }

    /// Get the display title (name with dirty indicator)
    pub fn display_title(&self) -> String {
        if self.is_dirty {
            format!("{}*", self.name)
        } else {
            self.name.clone()
        }
    }
}
