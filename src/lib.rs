//! Incremental screen redisplay for interactive line editors.
//!
//! The host editor owns the prompt, the edit buffer, and input handling;
//! this crate owns what is on the screen. Each call to
//! [`DisplayManager::display`] lays the buffer out into terminal rows,
//! diffs against what was painted last time, and emits the minimal escape
//! stream to reconcile the two, coalesced into a single write.
//!
//! ```no_run
//! use redisplay::{DisplayConfig, DisplayManager, NoComments};
//! # use redisplay::{ContentProvider, platform::ProcessTerminal};
//! # struct Line;
//! # impl ContentProvider for Line {
//! #     fn prompt(&self) -> &str { "$ " }
//! #     fn buffer(&self) -> &str { "ls" }
//! #     fn cursor(&self) -> usize { 2 }
//! # }
//! let mut term = ProcessTerminal::new();
//! let mut display = DisplayManager::new(DisplayConfig::from_env());
//! display.display(&mut term, &Line, &NoComments)?;
//! # Ok::<(), redisplay::DisplayError>(())
//! ```

pub mod config;
pub mod core;
pub mod logging;
pub mod platform;
pub mod provider;
pub mod render;

pub use config::{DisplayConfig, FaceStyles};
pub use core::output::CoalesceScope;
pub use core::terminal::{TermCaps, TerminalBackend};
pub use logging::RedrawStats;
pub use provider::{CommentRowProvider, ContentProvider, Expansion, NoComments};
pub use render::{
    DiffRenderer, DisplayError, DisplayLine, DisplayManager, Face, Frame, MeasureColumns,
    MeasureMode,
};
