// ============================================================================
// PixelPad Scripting System: Rhai-based sandboxed scripting engine
// ============================================================================
//
// Drives a whole editor session from a script: document setup, layers, tools,
// pointer events and frame ticks go through the same PixelPadApp calls the
// interactive front end uses, so scripts double as reproducible sessions.

use rhai::{AST, Engine, ImmutableString, Scope};
use std::sync::{Arc, Mutex};

use crate::app::PixelPadApp;
use crate::canvas::Pixel;
use crate::components::colors::{parse_hex, to_css};
use crate::project::DocumentConfig;

// ============================================================================
// Error type
// ============================================================================

#[derive(Debug, Clone)]
pub struct ScriptError {
    pub message: String,
    pub line: Option<usize>,
    pub column: Option<usize>,
}

impl ScriptError {
    fn from_position(message: String, pos: rhai::Position) -> Self {
        let line = pos.line().filter(|&l| l > 0);
        let column = pos.position().filter(|&c| c > 0);
        Self {
            message,
            line,
            column,
        }
    }

    /// Error explanation with line/column context and a hint.
    pub fn friendly_message(&self) -> String {
        let raw = &self.message;
        let cleaned = raw.split(" (line ").next().unwrap_or(raw);
        let mut parts = Vec::new();

        match (self.line, self.column) {
            (Some(line), Some(col)) => parts.push(format!("Error on line {}, column {}:", line, col)),
            (Some(line), None) => parts.push(format!("Error on line {}:", line)),
            _ => parts.push("Script error:".to_string()),
        }

        if raw.contains("Function not found:") {
            let fn_desc = raw
                .strip_prefix("Function not found: ")
                .map(|rest| rest.split(" (line ").next().unwrap_or(rest))
                .unwrap_or(cleaned);
            parts.push(format!("  Could not find function: {}", fn_desc.trim()));
            parts.push(String::new());
            parts.push("  Tip: Check the argument types. Coordinates and sizes are".to_string());
            parts.push("  integers, colors are strings like \"#ff0000\".".to_string());
        } else if raw.contains("Variable not found:") {
            let var_name = raw
                .split("Variable not found:")
                .nth(1)
                .map(|v| v.split('(').next().unwrap_or(v).trim())
                .unwrap_or(cleaned);
            parts.push(format!("  Variable '{}' is not defined.", var_name));
            parts.push(String::new());
            parts.push(format!("  Tip: Declare it with 'let {} = 0;' first.", var_name));
        } else if raw.contains("Syntax error") || raw.contains("Expected") {
            parts.push(format!("  Syntax error: {}", cleaned));
            parts.push(String::new());
            parts.push(
                "  Tip: Check for missing semicolons, brackets, or typos near this line."
                    .to_string(),
            );
        } else if raw.contains("Too many operations") {
            parts.push("  Script exceeded the maximum operation limit.".to_string());
            parts.push(String::new());
            parts.push("  Tip: Your script may have an infinite loop.".to_string());
        } else {
            parts.push(format!("  {}", cleaned));
        }

        parts.join("\n")
    }
}

impl std::fmt::Display for ScriptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let (Some(line), Some(col)) = (self.line, self.column) {
            write!(f, "Line {}, Col {}: {}", line, col, self.message)
        } else if let Some(line) = self.line {
            write!(f, "Line {}: {}", line, self.message)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl std::error::Error for ScriptError {}

// ============================================================================
// Script context: shared mutable state between engine and host functions
// ============================================================================

struct ScriptContext {
    app: PixelPadApp,
    console_output: Vec<String>,
}

type SharedContext = Arc<Mutex<ScriptContext>>;

/// Session state after a successful run.
pub struct ScriptOutput {
    pub app: PixelPadApp,
    pub console_output: Vec<String>,
}

fn lock(ctx: &SharedContext) -> std::sync::MutexGuard<'_, ScriptContext> {
    ctx.lock().unwrap_or_else(|e| e.into_inner())
}

fn coord(v: i64) -> i32 {
    v.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

fn document_config(w: i64, h: i64) -> DocumentConfig {
    DocumentConfig::new(w.clamp(0, u32::MAX as i64) as u32, h.clamp(0, u32::MAX as i64) as u32)
}

// ============================================================================
// Engine construction with full sandbox + API registration
// ============================================================================

fn create_engine(ctx: SharedContext) -> Engine {
    let mut engine = Engine::new();

    // ── Sandbox limits ──
    engine.set_max_operations(10_000_000);
    engine.set_max_call_levels(64);
    engine.set_max_expr_depths(64, 64);
    engine.set_max_string_size(10_000);
    engine.set_max_array_size(10_000);
    engine.set_max_map_size(1_000);

    register_document_api(&mut engine, ctx.clone());
    register_layer_api(&mut engine, ctx.clone());
    register_tool_api(&mut engine, ctx.clone());
    register_pointer_api(&mut engine, ctx.clone());
    register_drawing_api(&mut engine, ctx.clone());
    register_utility_api(&mut engine, ctx);

    engine
}

// ============================================================================
// Document API
// ============================================================================

fn register_document_api(engine: &mut Engine, ctx: SharedContext) {
    let c = ctx.clone();
    engine.register_fn("width", move || -> i64 {
        lock(&c).app.workspace().map_or(0, |ws| ws.width() as i64)
    });

    let c = ctx.clone();
    engine.register_fn("height", move || -> i64 {
        lock(&c).app.workspace().map_or(0, |ws| ws.height() as i64)
    });

    let c = ctx.clone();
    engine.register_fn("new_document", move |w: i64, h: i64| {
        lock(&c).app.new_document(document_config(w, h));
    });

    // new_document(w, h, "#rrggbb"): with a filled background layer
    let c = ctx;
    engine.register_fn(
        "new_document",
        move |w: i64, h: i64, background: ImmutableString| {
            let mut config = document_config(w, h);
            if let Some(fill) = parse_hex(&background) {
                config = config.with_background(fill);
            }
            lock(&c).app.new_document(config);
        },
    );
}

// ============================================================================
// Layer API
// ============================================================================

fn register_layer_api(engine: &mut Engine, ctx: SharedContext) {
    let c = ctx.clone();
    engine.register_fn("layer_count", move || -> i64 {
        lock(&c).app.workspace().map_or(0, |ws| ws.layer_count() as i64)
    });

    let c = ctx.clone();
    engine.register_fn("active_layer", move || -> i64 {
        lock(&c)
            .app
            .workspace()
            .map_or(-1, |ws| ws.active_layer_index() as i64)
    });

    // add_layer() -> index of the new top-most layer, which becomes active
    let c = ctx.clone();
    engine.register_fn("add_layer", move || -> i64 {
        let mut guard = lock(&c);
        let Some(ws) = guard.app.workspace_mut() else {
            return -1;
        };
        ws.add_raster_layer();
        let top = ws.layer_count() - 1;
        guard.app.set_active_layer(top);
        top as i64
    });

    let c = ctx.clone();
    engine.register_fn("remove_layer", move |idx: i64| -> bool {
        let mut guard = lock(&c);
        match (guard.app.workspace_mut(), usize::try_from(idx)) {
            (Some(ws), Ok(idx)) => {
                let removed = ws.remove_layer(idx);
                ws.update();
                removed
            }
            _ => false,
        }
    });

    let c = ctx.clone();
    engine.register_fn("select_layer", move |idx: i64| -> bool {
        match usize::try_from(idx) {
            Ok(idx) => lock(&c).app.set_active_layer(idx),
            Err(_) => false,
        }
    });

    let c = ctx.clone();
    engine.register_fn("move_layer", move |from: i64, to: i64| -> bool {
        let mut guard = lock(&c);
        match (guard.app.workspace_mut(), usize::try_from(from), usize::try_from(to)) {
            (Some(ws), Ok(from), Ok(to)) => {
                let moved = ws.move_layer(from, to);
                ws.update();
                moved
            }
            _ => false,
        }
    });

    let c = ctx.clone();
    engine.register_fn("clear_layer", move || {
        let mut guard = lock(&c);
        if let Some(ws) = guard.app.workspace_mut() {
            ws.active_layer_mut().clear();
            ws.update();
        }
    });

    let c = ctx.clone();
    engine.register_fn("set_layer_visible", move |idx: i64, visible: bool| -> bool {
        let Ok(idx) = usize::try_from(idx) else {
            return false;
        };
        let mut guard = lock(&c);
        match guard.app.workspace_mut().and_then(|ws| ws.layer_mut(idx)) {
            Some(layer) => {
                layer.visible = visible;
                true
            }
            None => false,
        }
    });

    let c = ctx;
    engine.register_fn("set_layer_locked", move |idx: i64, locked: bool| -> bool {
        let Ok(idx) = usize::try_from(idx) else {
            return false;
        };
        let mut guard = lock(&c);
        match guard.app.workspace_mut().and_then(|ws| ws.layer_mut(idx)) {
            Some(layer) => {
                layer.locked = locked;
                true
            }
            None => false,
        }
    });
}

// ============================================================================
// Tool & color API
// ============================================================================

fn register_tool_api(engine: &mut Engine, ctx: SharedContext) {
    let c = ctx.clone();
    engine.register_fn("set_tool", move |name: ImmutableString| -> bool {
        lock(&c).app.tools_mut().set_active_tool(name.as_str())
    });

    let c = ctx.clone();
    engine.register_fn("set_shape", move |shape: ImmutableString| -> bool {
        lock(&c).app.tools_mut().set_shape(shape.as_str())
    });

    let c = ctx.clone();
    engine.register_fn("set_size", move |size: i64| -> bool {
        lock(&c)
            .app
            .tools_mut()
            .set_size(size.clamp(0, u32::MAX as i64) as u32)
    });

    // set_color("#rrggbb"): sentinels and malformed strings are rejected
    let c = ctx.clone();
    engine.register_fn("set_color", move |hex: ImmutableString| -> bool {
        match parse_hex(&hex) {
            Some(color) => lock(&c).app.set_color(color),
            None => false,
        }
    });

    let c = ctx;
    engine.register_fn("color", move || -> String { to_css(lock(&c).app.color()) });
}

// ============================================================================
// Pointer API
// ============================================================================

fn register_pointer_api(engine: &mut Engine, ctx: SharedContext) {
    let c = ctx.clone();
    engine.register_fn("pointer_down", move |x: i64, y: i64| -> bool {
        lock(&c).app.pointer_down(coord(x), coord(y))
    });

    let c = ctx.clone();
    engine.register_fn("pointer_move", move |x: i64, y: i64| {
        lock(&c).app.pointer_move(coord(x), coord(y));
    });

    let c = ctx.clone();
    engine.register_fn("pointer_up", move || lock(&c).app.pointer_up());

    let c = ctx.clone();
    engine.register_fn("pointer_leave", move || lock(&c).app.pointer_leave());

    let c = ctx;
    engine.register_fn("tick", move || -> bool { lock(&c).app.tick() });
}

// ============================================================================
// Direct drawing & reads
// ============================================================================

fn register_drawing_api(engine: &mut Engine, ctx: SharedContext) {
    // draw(x, y, "#rrggbb", "circle" | "square", size): commits on the
    // active layer and renders immediately.
    let c = ctx.clone();
    engine.register_fn(
        "draw",
        move |x: i64, y: i64, hex: ImmutableString, shape: ImmutableString, size: i64| -> i64 {
            let Some(color) = parse_hex(&hex) else {
                return 0;
            };
            let mut guard = lock(&c);
            let Some(project) = guard.app.project_mut() else {
                return 0;
            };
            let size = size.clamp(1, u32::MAX as i64) as u32;
            let changed = project
                .workspace
                .active_layer_mut()
                .draw_named(coord(x), coord(y), color, &shape, size);
            project.workspace.update();
            if changed > 0 {
                project.mark_dirty();
            }
            changed as i64
        },
    );

    // stroke(x0, y0, x1, y1): a full press/drag/release with the active tool
    let c = ctx.clone();
    engine.register_fn("stroke", move |x0: i64, y0: i64, x1: i64, y1: i64| -> bool {
        let mut guard = lock(&c);
        let app = &mut guard.app;
        if !app.pointer_down(coord(x0), coord(y0)) {
            return false;
        }
        app.tick();
        app.pointer_move(coord(x1), coord(y1));
        app.pointer_up();
        true
    });

    // get_pixel(x, y) -> "#rrggbb" of the active layer's committed pixel
    let c = ctx;
    engine.register_fn("get_pixel", move |x: i64, y: i64| -> String {
        let guard = lock(&c);
        let pixel = guard
            .app
            .workspace()
            .map_or(Pixel::Transparent, |ws| ws.active_layer().model().get_pixel(coord(x), coord(y)));
        to_css(pixel)
    });
}

// ============================================================================
// Utility API
// ============================================================================

fn register_utility_api(engine: &mut Engine, ctx: SharedContext) {
    let c = ctx.clone();
    engine.register_fn("print_line", move |msg: ImmutableString| {
        lock(&c).console_output.push(msg.to_string());
    });
    // Also override built-in print
    let c = ctx;
    engine.on_print(move |msg| {
        lock(&c).console_output.push(msg.to_string());
    });
}

// ============================================================================
// Public execution API
// ============================================================================

/// Compile a script and return the AST, or a ScriptError.
pub fn compile_script(source: &str) -> Result<AST, ScriptError> {
    // Use a temp engine just for compilation (no context needed)
    let engine = Engine::new();
    engine
        .compile(source)
        .map_err(|e| ScriptError::from_position(e.to_string(), e.position()))
}

/// Run `source` against `app` on the calling thread and hand the session back.
pub fn run_script(source: &str, app: PixelPadApp) -> Result<ScriptOutput, ScriptError> {
    let ctx = Arc::new(Mutex::new(ScriptContext {
        app,
        console_output: Vec::new(),
    }));

    let engine = create_engine(ctx.clone());
    let mut scope = Scope::new();

    let ast = engine
        .compile(source)
        .map_err(|e| ScriptError::from_position(e.to_string(), e.position()))?;

    engine
        .run_ast_with_scope(&mut scope, &ast)
        .map_err(|e| ScriptError::from_position(e.to_string(), e.position()))?;
    drop(engine);

    let mut guard = lock(&ctx);
    // Release any stroke the script left open.
    guard.app.pointer_up();
    guard.app.tick();
    Ok(ScriptOutput {
        app: std::mem::take(&mut guard.app),
        console_output: std::mem::take(&mut guard.console_output),
    })
}
