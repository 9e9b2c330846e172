//! Redisplay pipeline: row layout, column measurement, frame diffing, and
//! the render-state orchestrator.

pub mod display;
pub mod frame;
pub mod line;
pub mod measure;
pub mod renderer;

pub use display::DisplayManager;
pub use frame::Frame;
pub use line::{DisplayLine, Face};
pub use measure::{MeasureColumns, MeasureMode};
pub use renderer::DiffRenderer;

use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisplayError {
    /// Row construction could not allocate. The render pass is abandoned
    /// before any byte reaches the terminal.
    LayoutFailed,
    /// The backend lacks a capability the requested operation needs.
    CapabilityUnavailable,
    /// An internal invariant no longer holds; the render state is reset and
    /// the next pass repaints from scratch.
    Inconsistent(&'static str),
}

impl fmt::Display for DisplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayError::LayoutFailed => write!(f, "display line allocation failed"),
            DisplayError::CapabilityUnavailable => {
                write!(f, "terminal capability unavailable")
            }
            DisplayError::Inconsistent(what) => write!(f, "display state inconsistent: {what}"),
        }
    }
}

impl std::error::Error for DisplayError {}
