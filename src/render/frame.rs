//! Layout of buffer text into display rows.
//!
//! `parse_wrapped` reflows the buffer across as many rows as it needs;
//! `parse_horizontal` lays out a single row window around the cursor with
//! `<`/`>` scroll markers; `apply_scroll_markers` annotates the edges of a
//! vertically scrolled frame.

use crate::core::text::width::{
    ctrl_display, prev_glyph_start, str_columns, str_columns_expand_ctrl, WidthIter,
};

use super::line::{DisplayLine, Face, ScrollMark};
use super::DisplayError;

/// What the comment row below the input is showing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CommentRowKind {
    #[default]
    Custom,
    Expansion,
    Suggestion,
}

/// Inputs for one layout pass.
pub struct LayoutRequest<'a> {
    pub width: usize,
    pub prompt_botlin: usize,
    /// Column where the first input row starts (prompt width).
    pub start_col: usize,
    pub buffer: &'a str,
    pub cursor: usize,
    /// Active selection, highlighted over the provider faces.
    pub highlight: Option<(usize, usize)>,
    pub literal_tabs: bool,
}

impl LayoutRequest<'_> {
    fn face(&self, face_at: &dyn Fn(usize) -> Face, index: usize) -> Face {
        if let Some((begin, end)) = self.highlight {
            if index >= begin && index < end {
                return Face::Highlight;
            }
        }
        face_at(index)
    }
}

/// A laid-out snapshot of the display: prompt rows, input rows, resolved
/// cursor position, and scroll state.
#[derive(Clone, Debug, Default)]
pub struct Frame {
    lines: Vec<DisplayLine>,
    count: usize,
    width: usize,
    prompt_botlin: usize,
    vpos: usize,
    cpos: usize,
    top: usize,
    horz_start: usize,
    horz_scroll: bool,
    comment_row: String,
    comment_kind: CommentRowKind,
}

impl Frame {
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn prompt_botlin(&self) -> usize {
        self.prompt_botlin
    }

    /// Row index (within the frame) holding the cursor.
    pub fn vpos(&self) -> usize {
        self.vpos
    }

    /// Column of the cursor.
    pub fn cpos(&self) -> usize {
        self.cpos
    }

    /// First visible row index, set by the orchestrator before painting.
    pub fn top(&self) -> usize {
        self.top
    }

    pub fn set_top(&mut self, top: usize) {
        self.top = top;
    }

    pub fn get(&self, index: usize) -> Option<&DisplayLine> {
        if index >= self.count {
            return None;
        }
        self.lines.get(index)
    }

    pub fn comment_row(&self) -> &str {
        &self.comment_row
    }

    pub fn comment_kind(&self) -> CommentRowKind {
        self.comment_kind
    }

    pub fn set_comment_row(&mut self, text: String, kind: CommentRowKind) {
        self.comment_row = text;
        self.comment_kind = kind;
    }

    pub fn clear_comment_row(&mut self) {
        self.comment_row.clear();
    }

    pub fn is_horz_scrolled(&self) -> bool {
        self.horz_scroll && self.horz_start > 0
    }

    /// Buffer offset and column consumed by the `<` marker when scrolled.
    pub fn horz_offset(&self) -> Option<(usize, usize)> {
        if self.is_horz_scrolled() {
            Some((self.horz_start, 1))
        } else {
            None
        }
    }

    /// A single-row frame whose content, one space, and the right prompt all
    /// fit within the width.
    pub fn can_show_rprompt(&self, rprompt_cols: usize) -> bool {
        self.count == 1 && self.lines[0].lastcol + 1 + rprompt_cols < self.width
    }

    /// Whether a suggestion is visible. Only the last two rows can hold one;
    /// wrapping can leave the final row empty with the suggestion above it.
    pub fn has_suggestion(&self) -> bool {
        let from = self.count.saturating_sub(2);
        self.lines[from..self.count]
            .iter()
            .any(|d| d.has_suggestion)
    }

    pub fn clear(&mut self) {
        for d in &mut self.lines[..self.count] {
            d.reset();
        }
        self.count = 0;
        self.width = 0;
        self.prompt_botlin = 0;
        self.vpos = 0;
        self.cpos = 0;
        self.top = 0;
        self.horz_start = 0;
        self.horz_scroll = false;
        self.comment_row.clear();
    }

    fn next_line(&mut self, start: usize) -> usize {
        if self.count >= self.lines.len() {
            self.lines.push(DisplayLine::default());
        }
        let i = self.count;
        self.count += 1;
        let d = &mut self.lines[i];
        debug_assert!(d.is_empty());
        d.start = start;
        d.to_eol = true;
        i
    }

    /// Wrapped layout: reflow the whole buffer at the frame width.
    pub fn parse_wrapped(
        &mut self,
        req: &LayoutRequest<'_>,
        face_at: &dyn Fn(usize) -> Face,
    ) -> Result<(), DisplayError> {
        let width = req.width.max(1);
        debug_assert!(req.start_col < width);

        self.clear();
        self.width = width;
        self.prompt_botlin = req.prompt_botlin;
        for _ in 0..req.prompt_botlin {
            self.next_line(0);
        }

        let mut di = self.next_line(0);
        let mut col = req.start_col.min(width.saturating_sub(1));
        self.lines[di].x = col;
        self.cpos = col;

        let mut tmp = String::new();
        let mut index = 0usize;
        let mut iter = WidthIter::new(req.buffer);

        while let Some(ch) = iter.next() {
            if ch == '\n' {
                let d = &mut self.lines[di];
                d.lastcol = col;
                d.end = index;
                d.newline = true;
                if index == req.cursor {
                    self.vpos = self.count - 1;
                    self.cpos = col;
                }
                index += 1;
                di = self.next_line(index);
                col = 0;
                continue;
            } else if ch == '\t' && req.literal_tabs {
                let target = ((col | 7) + 1) - col;
                tmp.clear();
                for _ in 0..target {
                    tmp.push(' ');
                }
            } else if iter.width_signed() < 0 {
                let [lead, tail] = ctrl_display(ch);
                tmp.clear();
                tmp.push(lead);
                tmp.push(tail);
            } else {
                let wc = iter.width_signed() as usize;

                if col + wc > width {
                    let d = &mut self.lines[di];
                    d.lastcol = col;
                    d.end = iter.char_start();
                    while col < width {
                        d.push_space()?;
                        col += 1;
                    }
                    debug_assert!(d.lead <= d.lastcol);
                    debug_assert_eq!(d.lastcol + d.trail, width);
                    di = self.next_line(iter.char_start());
                    col = 0;
                }

                if index <= req.cursor && req.cursor < index + iter.char_len() {
                    self.vpos = self.count - 1;
                    self.cpos = col;
                }

                let face = req.face(face_at, index);
                self.lines[di].push(ch, face)?;
                index += iter.char_len();
                col += wc;
                continue;
            }

            // Expanded forms (caret pairs, literal tabs) wrap per cell.
            let face = req.face(face_at, index);
            if index == req.cursor {
                self.vpos = self.count - 1;
                self.cpos = col;
            }

            let mut wrapped = false;
            for (k, add) in tmp.chars().enumerate() {
                if col >= width {
                    let d = &mut self.lines[di];
                    d.lastcol = col;
                    d.end = index;
                    debug_assert!(d.lead <= d.lastcol);
                    debug_assert_eq!(d.trail, 0);
                    wrapped = true;
                    di = self.next_line(index);
                    col = 0;
                    // The cursor lands on the next row only when the whole
                    // expansion wraps.
                    if k == 0 && index == req.cursor {
                        self.vpos = self.count - 1;
                        self.cpos = col;
                    }
                }
                self.lines[di].push(add, face)?;
                col += 1;
            }
            index += iter.char_len();
            if wrapped {
                self.lines[di].lead = col;
            }
        }

        let d = &mut self.lines[di];
        d.lastcol = col;
        d.end = index;

        if d.lastcol + d.trail >= width {
            debug_assert!(d.lead <= d.lastcol);
            debug_assert_eq!(d.trail, 0);
            let ni = self.next_line(index);
            self.lines[ni].end = index;
            col = 0;
        }

        if index == req.cursor {
            self.vpos = self.count - 1;
            self.cpos = col;
        }
        Ok(())
    }

    /// Horizontal-scroll layout: one input row windowed around the cursor.
    /// `prev` supplies the previous window offset so the view is sticky.
    pub fn parse_horizontal(
        &mut self,
        req: &LayoutRequest<'_>,
        face_at: &dyn Fn(usize) -> Face,
        prev: &Frame,
    ) -> Result<(), DisplayError> {
        let width = req.width.max(3);
        debug_assert!(req.start_col < width);

        let horz_start = prev.horz_start;
        self.clear();
        self.width = width;
        self.horz_start = horz_start;
        self.prompt_botlin = req.prompt_botlin;
        for _ in 0..req.prompt_botlin {
            self.next_line(0);
        }

        let scroll_stride = width / 3;
        let limit = width - 2; // one column for the `>` marker, one spare

        // Window adjustment: scroll left far enough to uncover the cursor,
        // or right far enough that the cursor re-enters the visible span.
        if req.cursor < self.horz_start {
            self.horz_start = req.cursor;
            adjust_columns(
                &mut self.horz_start,
                -(scroll_stride as i32),
                req.buffer,
            );
        } else {
            let occupied = if self.horz_start > 0 { 1 } else { req.start_col };
            let range = limit as i32 - occupied as i32;
            let mut end = self.horz_start;
            if range > 0
                && adjust_columns(&mut end, range, req.buffer)
                && req.cursor >= end
            {
                self.horz_start = req.cursor;
                if !adjust_columns(
                    &mut self.horz_start,
                    -(scroll_stride as i32 * 2),
                    req.buffer,
                ) {
                    self.horz_start += 1;
                }
            }
        }

        let di = self.next_line(0);
        self.lines[di].start = self.horz_start;
        self.horz_scroll = true;

        let mut col;
        if self.horz_start > 0 {
            let d = &mut self.lines[di];
            d.x = 0;
            d.lead = 1;
            d.push('<', Face::Scroll)?;
            col = 1;
        } else {
            self.lines[di].x = req.start_col;
            col = req.start_col;
        }
        self.vpos = self.prompt_botlin;
        self.cpos = col;

        let mut tmp = String::new();
        let mut index = self.horz_start;
        let mut overflow = false;
        let mut iter = WidthIter::new(&req.buffer[self.horz_start..]);

        while let Some(ch) = iter.next() {
            if iter.width_signed() < 0 {
                let [lead, tail] = ctrl_display(ch);
                tmp.clear();
                tmp.push(lead);
                tmp.push(tail);
            } else {
                let wc = iter.width_signed() as usize;

                if col + wc > limit {
                    overflow = true;
                    break;
                }

                if index <= req.cursor && req.cursor < index + iter.char_len() {
                    self.cpos = col;
                }

                let face = req.face(face_at, index);
                self.lines[di].push(ch, face)?;
                index += iter.char_len();
                col += wc;
                continue;
            }

            let face = req.face(face_at, index);
            if index == req.cursor {
                self.cpos = col;
            }

            let mut truncated = false;
            for add in tmp.chars() {
                if col >= limit {
                    truncated = true;
                    break;
                }
                self.lines[di].push(add, face)?;
                col += 1;
            }
            if truncated {
                overflow = true;
                break;
            }
            index += iter.char_len();
            if col >= limit {
                break;
            }
        }

        let d = &mut self.lines[di];
        d.lastcol = col;
        d.end = index;

        if iter.more() || overflow {
            d.push('>', Face::Scroll)?;
            d.lastcol += 1;
            d.to_eol = false;
        }

        if index == req.cursor {
            self.vpos = self.count - 1;
            self.cpos = col;
        }
        Ok(())
    }

    /// Mark the edges of a vertically scrolled frame: `<` replacing the first
    /// glyph of the top visible row, `>` in the last column of the bottom
    /// visible row when more rows follow.
    pub fn apply_scroll_markers(
        &mut self,
        top: usize,
        bottom: usize,
    ) -> Result<(), DisplayError> {
        debug_assert!(top >= self.prompt_botlin);
        debug_assert!(top <= bottom);
        debug_assert!(top < self.count);

        if top > self.prompt_botlin {
            let d = &mut self.lines[top];

            if d.is_empty() {
                d.push('<', Face::Scroll)?;
                d.scroll_mark = ScrollMark::Left;
            } else {
                let mut iter = WidthIter::new(d.chars());
                while iter.next().is_some() {
                    let mut wc = iter.width_one_ctrl();
                    if wc == 0 {
                        continue;
                    }

                    let bytes = iter.pos();
                    if bytes < wc {
                        break;
                    }

                    d.replace_prefix(bytes, '<', Face::Scroll);
                    d.scroll_mark = ScrollMark::Left;
                    // Pad out the columns the replaced glyph occupied.
                    while wc > 1 {
                        d.push_space()?;
                        wc -= 1;
                    }
                    break;
                }
            }
        }

        if bottom + 1 < self.count {
            debug_assert!(top != bottom);

            let width = self.width;
            let d = &mut self.lines[bottom];

            if d.lastcol - d.x > 2 {
                let keep = d.len() - d.trail;
                d.truncate_bytes(keep);
                d.trail = 0;

                while d.x + d.lastcol + 1 >= width {
                    let bytes = prev_glyph_start(d.chars(), d.len());
                    d.lastcol -= str_columns(&d.chars()[bytes..]);
                    d.truncate_bytes(bytes);
                }

                while d.x + d.lastcol + 2 < width {
                    d.push(' ', Face::Normal)?;
                    d.lastcol += 1;
                }
                d.push('>', Face::Scroll)?;
                d.scroll_mark = ScrollMark::Right;
                d.lastcol += 1;
                d.to_eol = false;
            }
        }
        Ok(())
    }
}

/// Walk `index` forward or backward by `delta` display columns (control
/// characters count their two-column caret form). Returns false when the
/// walk ran out of buffer, or left `index` at 0.
pub(crate) fn adjust_columns(index: &mut usize, delta: i32, buffer: &str) -> bool {
    debug_assert!(delta != 0);
    debug_assert!(*index <= buffer.len());

    let mut first = true;

    if delta < 0 {
        let mut remaining = -delta;
        while remaining > 0 {
            if *index == 0 {
                return false;
            }
            let i = prev_glyph_start(buffer, *index);
            let width = str_columns_expand_ctrl(&buffer[i..*index]) as i32;
            if first || remaining >= width {
                *index = i;
            }
            first = false;
            remaining -= width;
        }
    } else {
        let mut remaining = delta;
        let base = *index;
        let mut iter = WidthIter::new(&buffer[base..]);
        while remaining > 0 {
            if iter.next().is_none() {
                return false;
            }
            let width = iter.width_two_ctrl() as i32;
            if first || remaining >= width {
                *index = base + iter.pos();
            }
            first = false;
            remaining -= width;
        }
    }

    *index > 0
}
