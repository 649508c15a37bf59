// ============================================================================
// PixelPad CLI: headless sessions driven by Rhai scripts
// ============================================================================
//
// Usage examples:
//   pixelpad --script heart.rhai --output heart.png
//   pixelpad -s heart.rhai -W 16 -H 16 --background "#ffffff" -o heart.png
//   pixelpad -s "sprites/*.rhai" --output-dir out/ --preview-scale 8
//
// Each script runs against a fresh document on the current thread; the
// composite of its visible layers is then written as PNG.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;

use crate::app::PixelPadApp;
use crate::components::colors::parse_hex;
use crate::io::write_png;
use crate::ops::scripting::run_script;
use crate::project::{DEFAULT_DOCUMENT_DIM, DocumentConfig};

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// PixelPad headless pixel-art renderer.
#[derive(Parser, Debug)]
#[command(
    name = "pixelpad",
    about = "PixelPad headless pixel-art renderer",
    long_about = "Run Rhai scripts against a fresh pixel-art document and export the\n\
                  composite of its visible layers as PNG.\n\n\
                  Example:\n  \
                  pixelpad --script heart.rhai --output heart.png\n  \
                  pixelpad -s \"sprites/*.rhai\" --output-dir out/ --preview-scale 8"
)]
pub struct CliArgs {
    /// Rhai script file(s). Glob patterns accepted (e.g. "sprites/*.rhai").
    #[arg(short, long, required = true, num_args = 1.., value_name = "SCRIPT.rhai")]
    pub script: Vec<String>,

    /// Document width in cells (1–256).
    #[arg(short = 'W', long, default_value_t = DEFAULT_DOCUMENT_DIM)]
    pub width: u32,

    /// Document height in cells (1–256).
    #[arg(short = 'H', long, default_value_t = DEFAULT_DOCUMENT_DIM)]
    pub height: u32,

    /// Fill a bottom "Background" layer with this color (#rgb or #rrggbb).
    #[arg(short, long, value_name = "COLOR")]
    pub background: Option<String>,

    /// Output file path. Only valid for a single script.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output directory for batch runs; files are named after the script stem.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Also write `<stem>.preview.png`, magnified by this factor (1–16).
    #[arg(long, value_name = "N")]
    pub preview_scale: Option<u32>,

    /// Print script console output, timing, and mirror the log to stderr.
    #[arg(short, long)]
    pub verbose: bool,

    /// Run log location [default: pixelpad.log in the temp directory].
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run every script and return an OS exit code.
/// `0` = all scripts succeeded, `1` = one or more failed.
pub fn run(args: CliArgs) -> ExitCode {
    let scripts = resolve_inputs(&args.script);
    if scripts.is_empty() {
        eprintln!("error: no script files matched the given pattern(s).");
        return ExitCode::FAILURE;
    }

    if scripts.len() > 1 && args.output.is_some() && args.output_dir.is_none() {
        eprintln!(
            "error: {} scripts given but --output only accepts a single file path.\n\
             Use --output-dir to specify a destination directory for batch runs.",
            scripts.len()
        );
        return ExitCode::FAILURE;
    }

    let mut config = DocumentConfig::new(args.width, args.height);
    if let Some(text) = &args.background {
        match parse_hex(text) {
            Some(color) => config = config.with_background(color),
            None => {
                eprintln!("error: invalid background color '{}'.", text);
                return ExitCode::FAILURE;
            }
        }
    }
    if let Some(scale) = args.preview_scale {
        config = config.with_preview_scale(scale);
    }

    if let Some(dir) = &args.output_dir
        && let Err(e) = std::fs::create_dir_all(dir)
    {
        eprintln!(
            "error: could not create output directory '{}': {}",
            dir.display(),
            e
        );
        return ExitCode::FAILURE;
    }

    let total = scripts.len();
    let multi = total > 1;
    let mut any_failure = false;

    for (idx, script_path) in scripts.iter().enumerate() {
        if multi || args.verbose {
            println!("[{}/{}] {}", idx + 1, total, script_path.display());
        }
        let start = Instant::now();

        let Some(output_path) =
            build_output_path(script_path, args.output.as_deref(), args.output_dir.as_deref())
        else {
            eprintln!(
                "  error: cannot determine output path for '{}'.",
                script_path.display()
            );
            any_failure = true;
            continue;
        };

        match run_one(
            script_path,
            &output_path,
            config,
            args.preview_scale.is_some(),
            args.verbose,
        ) {
            Ok(()) => {
                if args.verbose || multi {
                    println!(
                        "  → {} ({:.0}ms)",
                        output_path.display(),
                        start.elapsed().as_secs_f64() * 1000.0
                    );
                }
            }
            Err(e) => {
                log_err!("{}: {}", script_path.display(), e);
                eprintln!("  error: {}", e);
                any_failure = true;
            }
        }
    }

    if any_failure {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

// ============================================================================
// Per-script pipeline
// ============================================================================

fn run_one(
    script: &Path,
    output: &Path,
    config: DocumentConfig,
    write_preview: bool,
    verbose: bool,
) -> Result<(), String> {
    // -- Step 1: Fresh document ------------------------------------------
    let source = std::fs::read_to_string(script)
        .map_err(|e| format!("could not read script: {}", e))?;
    let mut app = PixelPadApp::new();
    app.new_document(config);

    // -- Step 2: Run the session -----------------------------------------
    let session = run_script(&source, app)
        .map_err(|e| format!("script error:\n{}", e.friendly_message()))?;
    if verbose {
        for line in &session.console_output {
            println!("  [script] {}", line);
        }
    }
    let mut app = session.app;

    // -- Step 3: Export --------------------------------------------------
    app.export_png(output)
        .map_err(|e| format!("export failed: {}", e))?;

    if write_preview && let Some(preview) = app.preview() {
        let path = preview_path(output);
        write_png(&preview, &path).map_err(|e| format!("preview export failed: {}", e))?;
        if verbose {
            println!("  → {}", path.display());
        }
    }

    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

/// Expand glob patterns and literal paths into a deduplicated, ordered list.
fn resolve_inputs(patterns: &[String]) -> Vec<PathBuf> {
    let mut result: Vec<PathBuf> = Vec::new();

    for pattern in patterns {
        let as_path = Path::new(pattern);

        if as_path.exists() {
            if !result.iter().any(|p| p.as_path() == as_path) {
                result.push(as_path.to_path_buf());
            }
            continue;
        }

        match glob::glob(pattern) {
            Ok(entries) => {
                let mut matched = false;
                for entry in entries.flatten() {
                    if !result.contains(&entry) {
                        result.push(entry);
                    }
                    matched = true;
                }
                if !matched {
                    eprintln!("warning: pattern '{}' matched no files.", pattern);
                }
            }
            Err(e) => {
                eprintln!("warning: invalid glob '{}': {}", pattern, e);
            }
        }
    }

    result
}

/// Compute the PNG path for one script.
///
/// Priority:
/// 1. `--output` (explicit path, single script)
/// 2. `--output-dir` (batch directory, `<stem>.png`)
/// 3. Fallback: `<stem>.png` next to the script
fn build_output_path(
    script: &Path,
    output: Option<&Path>,
    output_dir: Option<&Path>,
) -> Option<PathBuf> {
    if let Some(out) = output {
        return Some(out.to_path_buf());
    }

    let stem = script.file_stem()?.to_string_lossy().into_owned();
    let file_name = format!("{}.png", stem);

    match output_dir {
        Some(dir) => Some(dir.join(file_name)),
        None => Some(script.parent().unwrap_or(Path::new(".")).join(file_name)),
    }
}

/// `dir/name.png` → `dir/name.preview.png`
fn preview_path(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    output.with_file_name(format!("{}.preview.png", stem))
}
