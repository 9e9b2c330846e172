//! Platform-specific terminal integrations.

pub mod process_terminal;

pub use process_terminal::{detect_caps, ProcessTerminal};
#[cfg(unix)]
pub use process_terminal::{watch_resize, ResizeWatcherGuard};
