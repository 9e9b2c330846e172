//! Display configuration.

use std::env;

use crate::render::line::Face;

/// SGR sequences for each face. An empty string means no styling, which for
/// `Face::Normal` is always the case.
#[derive(Debug, Clone)]
pub struct FaceStyles {
    pub highlight: String,
    pub scroll: String,
    pub suggestion: String,
    pub comment: String,
    pub modmark: String,
}

impl Default for FaceStyles {
    fn default() -> Self {
        Self {
            highlight: "\x1b[7m".to_string(),
            scroll: "\x1b[36m".to_string(),
            suggestion: "\x1b[90m".to_string(),
            comment: "\x1b[37;45m".to_string(),
            modmark: "\x1b[36m".to_string(),
        }
    }
}

impl FaceStyles {
    pub fn sgr(&self, face: Face) -> Option<&str> {
        let code = match face {
            Face::Normal => return None,
            Face::Highlight => &self.highlight,
            Face::Scroll => &self.scroll,
            Face::Suggestion => &self.suggestion,
            Face::Comment => &self.comment,
            Face::Modmark => &self.modmark,
        };
        if code.is_empty() {
            None
        } else {
            Some(code)
        }
    }
}

#[derive(Debug, Clone)]
pub struct DisplayConfig {
    /// Maximum rows for the input area; 0 means as many as fit the screen.
    pub max_input_rows: usize,
    /// Always lay out on a single horizontally scrolled row.
    pub horizontal_scroll_mode: bool,
    /// Reserve a comment row for history expansion previews.
    pub show_history_preview: bool,
    /// Show the accept-suggestion hint in the comment row.
    pub show_suggestion_hint: bool,
    /// Render tabs as spaces to the next tab stop instead of `^I`.
    pub display_literal_tabs: bool,
    /// Prefix the prompt with `*` when the provider reports the line
    /// modified.
    pub mark_modified_lines: bool,
    pub faces: FaceStyles,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            max_input_rows: 0,
            horizontal_scroll_mode: false,
            show_history_preview: true,
            show_suggestion_hint: true,
            display_literal_tabs: false,
            mark_modified_lines: false,
            faces: FaceStyles::default(),
        }
    }
}

impl DisplayConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_input_rows: env_usize("REDISPLAY_MAX_INPUT_ROWS")
                .unwrap_or(defaults.max_input_rows),
            horizontal_scroll_mode: env_flag("REDISPLAY_HORZ_SCROLL"),
            show_history_preview: !env_flag("REDISPLAY_NO_HISTORY_PREVIEW"),
            show_suggestion_hint: !env_flag("REDISPLAY_NO_SUGGESTION_HINT"),
            display_literal_tabs: env_flag("REDISPLAY_LITERAL_TABS"),
            mark_modified_lines: env_flag("REDISPLAY_MODMARK"),
            faces: defaults.faces,
        }
    }
}

fn env_flag(key: &str) -> bool {
    env::var(key).map(|value| value == "1").unwrap_or(false)
}

fn env_usize(key: &str) -> Option<usize> {
    env::var(key).ok().and_then(|value| value.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::{DisplayConfig, FaceStyles};
    use crate::render::line::Face;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    struct EnvGuard {
        key: &'static str,
        previous: Option<String>,
    }

    impl EnvGuard {
        fn set(key: &'static str, value: &str) -> Self {
            let previous = env::var(key).ok();
            env::set_var(key, value);
            Self { key, previous }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            if let Some(value) = &self.previous {
                env::set_var(self.key, value);
            } else {
                env::remove_var(self.key);
            }
        }
    }

    fn env_lock() -> &'static Mutex<()> {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        LOCK.get_or_init(|| Mutex::new(()))
    }

    #[test]
    fn defaults_when_env_unset() {
        let _lock = env_lock().lock().unwrap();
        let config = DisplayConfig::from_env();
        assert_eq!(config.max_input_rows, 0);
        assert!(!config.horizontal_scroll_mode);
        assert!(config.show_history_preview);
    }

    #[test]
    fn env_overrides_apply() {
        let _lock = env_lock().lock().unwrap();
        let _rows = EnvGuard::set("REDISPLAY_MAX_INPUT_ROWS", "3");
        let _horz = EnvGuard::set("REDISPLAY_HORZ_SCROLL", "1");
        let _hint = EnvGuard::set("REDISPLAY_NO_SUGGESTION_HINT", "1");
        let config = DisplayConfig::from_env();
        assert_eq!(config.max_input_rows, 3);
        assert!(config.horizontal_scroll_mode);
        assert!(!config.show_suggestion_hint);
    }

    #[test]
    fn normal_face_has_no_sgr() {
        let styles = FaceStyles::default();
        assert!(styles.sgr(Face::Normal).is_none());
        assert!(styles.sgr(Face::Scroll).is_some());
    }
}
