//! Content providers.
//!
//! The display engine pulls everything it paints through these traits. The
//! host editor owns the prompt and buffer; the engine only reads them.

use crate::render::line::Face;

/// Source of the prompt and the editable line.
///
/// `cursor` is a byte offset into `buffer` and must land on a char boundary.
pub trait ContentProvider {
    fn prompt(&self) -> &str;

    /// Text anchored to the right edge of a single-row input line. Shown
    /// only while it fits.
    fn right_prompt(&self) -> &str {
        ""
    }

    fn buffer(&self) -> &str;

    fn cursor(&self) -> usize;

    /// Byte range to paint with `Face::Highlight`, e.g. an active selection.
    fn highlight_range(&self) -> Option<(usize, usize)> {
        None
    }

    /// Face for the char starting at byte `index`. The highlight range wins
    /// over this.
    fn face_at(&self, _index: usize) -> Face {
        Face::Normal
    }

    /// Whether the line differs from its history entry, for the modified
    /// mark.
    fn modified(&self) -> bool {
        false
    }
}

/// A pending history expansion under the cursor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Expansion {
    /// Byte offset of the expansion reference in the buffer.
    pub start: usize,
    /// Byte length of the reference.
    pub len: usize,
    /// What the reference expands to.
    pub result: String,
}

/// Source of comment row content below the input area.
pub trait CommentRowProvider {
    /// Expansion preview for the reference containing `cursor`, if any.
    fn expansion_at(&self, _cursor: usize) -> Option<Expansion> {
        None
    }

    /// Whether a suggestion can currently be accepted, for the hint row.
    fn suggestion_available(&self) -> bool {
        false
    }
}

/// Provider with no comment row content.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoComments;

impl CommentRowProvider for NoComments {}
