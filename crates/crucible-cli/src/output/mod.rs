//! Terminal output utilities: colored status lines, duration/byte
//! formatting, and TTY/`NO_COLOR` detection, shared by every command.

pub mod json;
pub mod progress;

use std::io::{IsTerminal, stderr, stdout};
use std::sync::atomic::{AtomicBool, Ordering};

static COLOR_ENABLED: AtomicBool = AtomicBool::new(true);
static UNICODE_ENABLED: AtomicBool = AtomicBool::new(true);

static IS_TTY: std::sync::LazyLock<bool> = std::sync::LazyLock::new(|| stdout().is_terminal() && stderr().is_terminal());
static NO_COLOR: std::sync::LazyLock<bool> = std::sync::LazyLock::new(|| std::env::var("NO_COLOR").is_ok());

/// Initialize output settings based on environment and flags.
pub fn init(force_ansi: Option<bool>, quiet: bool) {
    let colors = match force_ansi {
        Some(true) => true,
        Some(false) => false,
        None => *IS_TTY && !*NO_COLOR,
    };
    COLOR_ENABLED.store(colors, Ordering::Relaxed);

    let unicode = std::env::var("LANG")
        .or_else(|_| std::env::var("LC_ALL"))
        .map(|l| l.contains("UTF") || l.contains("utf"))
        .unwrap_or(cfg!(not(windows)));
    UNICODE_ENABLED.store(unicode && !quiet, Ordering::Relaxed);
}

pub fn colors_enabled() -> bool {
    COLOR_ENABLED.load(Ordering::Relaxed)
}

pub fn unicode_enabled() -> bool {
    UNICODE_ENABLED.load(Ordering::Relaxed)
}

fn pick_icon(unicode_sym: &'static str, ascii_sym: &'static str) -> &'static str {
    if unicode_enabled() { unicode_sym } else { ascii_sym }
}

/// Print a success message to stdout.
pub fn success(text: &str) {
    use owo_colors::OwoColorize;
    let sym = pick_icon("✓", "OK");
    if colors_enabled() {
        println!("{} {}", sym.green(), text);
    } else {
        println!("{sym} {text}");
    }
}

/// Print a warning message to stderr.
pub fn warning(text: &str) {
    use owo_colors::OwoColorize;
    let sym = pick_icon("⚠", "WARN");
    if colors_enabled() {
        eprintln!("{} {}", sym.yellow(), text.yellow());
    } else {
        eprintln!("{sym} {text}");
    }
}

/// Print an error message to stderr.
pub fn error(text: &str) {
    use owo_colors::OwoColorize;
    let sym = pick_icon("✗", "ERR");
    if colors_enabled() {
        eprintln!("{} {}", sym.red(), text.red());
    } else {
        eprintln!("{sym} {text}");
    }
}

/// Print an info message to stdout.
pub fn info(text: &str) {
    use owo_colors::OwoColorize;
    let sym = pick_icon("ℹ", "i");
    if colors_enabled() {
        println!("{} {}", sym.blue(), text);
    } else {
        println!("{sym} {text}");
    }
}

/// Format a duration for display.
pub fn format_duration(duration: std::time::Duration) -> String {
    let secs = duration.as_secs_f64();
    if secs < 0.001 {
        format!("{:.0}us", secs * 1_000_000.0)
    } else if secs < 1.0 {
        format!("{:.0}ms", secs * 1000.0)
    } else if secs < 60.0 {
        format!("{secs:.2}s")
    } else {
        format!("{:.1}m", secs / 60.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert!(format_duration(std::time::Duration::from_micros(500)).contains("us"));
        assert!(format_duration(std::time::Duration::from_millis(500)).contains("ms"));
        assert!(format_duration(std::time::Duration::from_secs(5)).contains('s'));
        assert!(format_duration(std::time::Duration::from_secs(120)).contains('m'));
    }
}
