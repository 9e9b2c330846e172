//! Env-gated redraw diagnostics.
//!
//! `REDISPLAY_DEBUG_REDRAW=1` turns on per-pass log lines; they are appended
//! to the file named by `REDISPLAY_DEBUG_LOG` (read once per process).

use std::env;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use once_cell::sync::Lazy;

static LOG_PATH: Lazy<Option<PathBuf>> = Lazy::new(|| {
    env::var("REDISPLAY_DEBUG_LOG")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from)
});

pub fn debug_redraw_enabled() -> bool {
    env::var("REDISPLAY_DEBUG_REDRAW")
        .map(|value| value == "1")
        .unwrap_or(false)
}

/// Append one redraw record to the debug log, if configured. Errors are
/// ignored; diagnostics must never break rendering.
pub fn log_debug_redraw(reason: &str, old_rows: usize, new_rows: usize, height: usize) {
    let Some(path) = LOG_PATH.as_ref() else {
        return;
    };
    if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
        let _ = writeln!(
            file,
            "redraw {reason}: rows {old_rows} -> {new_rows} (height {height})"
        );
    }
}

/// Per-session redraw counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RedrawStats {
    pub display_calls: u64,
    pub prompt_repaints: u64,
    pub identical_rows: u64,
}

impl fmt::Display for RedrawStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "display {}, prompt {}, identical {}",
            self.display_calls, self.prompt_repaints, self.identical_rows
        )
    }
}

#[cfg(test)]
mod tests {
    use super::RedrawStats;

    #[test]
    fn stats_format_is_stable() {
        let stats = RedrawStats {
            display_calls: 3,
            prompt_repaints: 1,
            identical_rows: 7,
        };
        assert_eq!(stats.to_string(), "display 3, prompt 1, identical 7");
    }
}
