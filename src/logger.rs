//! Run log for headless sessions.
//!
//! `init` opens (and truncates) one file per run. The `log_info!`,
//! `log_warn!` and `log_err!` macros append `[secs.millis] [LEVEL] message`
//! lines to it. Before `init`, lines only reach stderr when echo is on.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, OnceLock};
use std::time::{Duration, Instant};

static SINK: OnceLock<Mutex<File>> = OnceLock::new();
static STARTED: OnceLock<Instant> = OnceLock::new();
static ECHO: AtomicBool = AtomicBool::new(false);

/// Default run log location when `--log-file` is not given.
pub fn default_path() -> PathBuf {
    std::env::temp_dir().join("pixelpad.log")
}

/// Open the run log at `path` and route panics through it.
pub fn init(path: &Path) -> io::Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    let file = File::create(path)?;
    STARTED.get_or_init(Instant::now);
    if SINK.set(Mutex::new(file)).is_err() {
        return Ok(());
    }
    write_line(&format!("PixelPad run log: {}", path.display()));

    let prev = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        write("PANIC", &info.to_string());
        prev(info);
    }));
    Ok(())
}

/// Mirror log lines to stderr (`--verbose`).
pub fn set_echo(enabled: bool) {
    ECHO.store(enabled, Ordering::Relaxed);
}

pub fn write_line(line: &str) {
    if ECHO.load(Ordering::Relaxed) {
        eprintln!("{}", line);
    }
    if let Some(sink) = SINK.get()
        && let Ok(mut file) = sink.lock()
    {
        let _ = writeln!(file, "{}", line);
    }
}

pub fn write(level: &str, msg: &str) {
    let elapsed = STARTED.get().map_or(Duration::ZERO, Instant::elapsed);
    write_line(&format!("[{}] [{}] {}", stamp(elapsed), level, msg));
}

/// Seconds since `init`, with millisecond precision.
fn stamp(elapsed: Duration) -> String {
    format!("{:>4}.{:03}", elapsed.as_secs(), elapsed.subsec_millis())
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::logger::write("INFO", &format!($($arg)*));
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::logger::write("WARN", &format!($($arg)*));
    };
}

#[macro_export]
macro_rules! log_err {
    ($($arg:tt)*) => {
        $crate::logger::write("ERROR", &format!($($arg)*));
    };
}
