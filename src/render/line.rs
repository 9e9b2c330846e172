//! One display row: expanded cell text plus a face per byte.

use super::DisplayError;

/// Visual classification of a cell. Mapped to SGR sequences by
/// `config::FaceStyles` at paint time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Face {
    #[default]
    Normal,
    Highlight,
    Scroll,
    Suggestion,
    Comment,
    Modmark,
}

/// Which scroll marker, if any, occupies an edge of the row.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ScrollMark {
    #[default]
    None,
    Left,
    Right,
}

/// A laid-out terminal row. `chars` holds the expanded text (control
/// characters appear as their `^X` caret pair) and `faces` holds one face
/// per byte of `chars`, so a multi-byte character repeats its face.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DisplayLine {
    pub(crate) chars: String,
    pub(crate) faces: Vec<Face>,
    /// Byte range of the source buffer this row covers.
    pub start: usize,
    pub end: usize,
    /// Column where the row begins (prompt width on the first input row).
    pub x: usize,
    /// Column where the row's content ends, excluding `trail` padding.
    pub lastcol: usize,
    /// Leading columns belonging to a glyph begun on the previous row
    /// (the tail of a wrapped `^X` pair) or to a scroll marker.
    pub lead: usize,
    /// Trailing pad spaces appended to force a hard wrap.
    pub trail: usize,
    /// The row ends at an explicit newline in the buffer.
    pub newline: bool,
    /// The row may rely on clear-to-eol when repainted shorter.
    pub to_eol: bool,
    pub scroll_mark: ScrollMark,
    pub(crate) has_suggestion: bool,
}

const MIN_RESERVE: usize = 160;

impl DisplayLine {
    pub fn chars(&self) -> &str {
        &self.chars
    }

    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    /// Byte length of the expanded row text.
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// Append one character. Fails with `LayoutFailed` when the row cannot
    /// grow, leaving the row unmodified.
    pub fn push(&mut self, ch: char, face: Face) -> Result<(), DisplayError> {
        debug_assert_eq!(self.trail, 0, "content after trailing pad");
        self.append_raw(ch, face)?;
        if face == Face::Suggestion {
            self.has_suggestion = true;
        }
        Ok(())
    }

    /// Append one pad space counted in `trail`.
    pub fn push_space(&mut self) -> Result<(), DisplayError> {
        self.append_raw(' ', Face::Normal)?;
        self.trail += 1;
        Ok(())
    }

    fn append_raw(&mut self, ch: char, face: Face) -> Result<(), DisplayError> {
        let need = ch.len_utf8();
        self.reserve_for(need)?;
        self.chars.push(ch);
        for _ in 0..need {
            self.faces.push(face);
        }
        Ok(())
    }

    fn reserve_for(&mut self, additional: usize) -> Result<(), DisplayError> {
        if self.chars.capacity() - self.chars.len() < additional {
            let grow = additional.max(MIN_RESERVE);
            self.chars
                .try_reserve(grow)
                .map_err(|_| DisplayError::LayoutFailed)?;
        }
        if self.faces.capacity() - self.faces.len() < additional {
            let grow = additional.max(MIN_RESERVE);
            self.faces
                .try_reserve(grow)
                .map_err(|_| DisplayError::LayoutFailed)?;
        }
        Ok(())
    }

    /// Replace the first `bytes` bytes with a single marker character.
    pub(crate) fn replace_prefix(&mut self, bytes: usize, ch: char, face: Face) {
        debug_assert!(self.chars.is_char_boundary(bytes));
        debug_assert_eq!(ch.len_utf8(), 1);
        self.chars.replace_range(..bytes, ch.encode_utf8(&mut [0u8; 4]));
        self.faces.splice(..bytes, std::iter::once(face));
    }

    /// Truncate the expanded text to `bytes` bytes.
    pub(crate) fn truncate_bytes(&mut self, bytes: usize) {
        debug_assert!(self.chars.is_char_boundary(bytes));
        self.chars.truncate(bytes);
        self.faces.truncate(bytes);
    }

    /// Reset for reuse, keeping allocations.
    pub(crate) fn reset(&mut self) {
        self.chars.clear();
        self.faces.clear();
        self.start = 0;
        self.end = 0;
        self.x = 0;
        self.lastcol = 0;
        self.lead = 0;
        self.trail = 0;
        self.newline = false;
        self.to_eol = false;
        self.scroll_mark = ScrollMark::None;
        self.has_suggestion = false;
    }
}
