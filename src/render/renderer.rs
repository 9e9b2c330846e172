//! Frame diffing and escape emission.
//!
//! `DiffRenderer` owns the physical cursor model (row, column, pending
//! autowrap) and rewrites only the differing span of each row. All cursor
//! motion goes through `move_to_row`/`move_to_column` so the pending-wrap
//! state machine is resolved before any other byte is emitted.

use crate::config::FaceStyles;
use crate::core::terminal::{TermCaps, TerminalBackend};
use crate::core::text::width::{prev_char_start, str_columns, WidthIter};

use super::frame::Frame;
use super::line::{DisplayLine, Face};
use super::DisplayError;

/// Per-pass paint context. `frame` is the frame whose rows are on screen for
/// the purpose of finishing a pending wrap: the current frame while old rows
/// are still being overwritten, the pending frame afterwards.
pub struct PaintCtx<'a> {
    pub frame: &'a Frame,
    pub width: usize,
    pub caps: TermCaps,
    pub styles: &'a FaceStyles,
}

#[derive(Debug, Default)]
pub struct DiffRenderer {
    row: usize,
    col: usize,
    pending_wrap: bool,
}

impl DiffRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn row(&self) -> usize {
        self.row
    }

    pub fn col(&self) -> usize {
        self.col
    }

    pub fn pending_wrap(&self) -> bool {
        self.pending_wrap
    }

    pub fn set_pending_wrap(&mut self, pending: bool) {
        self.pending_wrap = pending;
    }

    /// Adopt a cursor position produced by raw writes (prompt text).
    pub fn set_position(&mut self, row: usize, col: usize) {
        self.row = row;
        self.col = col;
    }

    pub fn reset(&mut self) {
        self.row = 0;
        self.col = 0;
        self.pending_wrap = false;
    }

    /// Repaint row `i` of the pending frame over `o`, the row currently on
    /// screen there. Returns true when the rows were identical and nothing
    /// was written.
    #[allow(clippy::too_many_arguments)]
    pub fn update_line(
        &mut self,
        out: &mut dyn TerminalBackend,
        ctx: &PaintCtx<'_>,
        i: usize,
        o: Option<&DisplayLine>,
        d: &DisplayLine,
        top: usize,
        prompt_botlin: usize,
        has_rprompt: bool,
    ) -> Result<bool, DisplayError> {
        debug_assert!(i >= top);

        let mut lcol = d.x;
        let mut rcol = d.lastcol + d.trail;
        let mut lind = 0usize;
        let mut rind = d.len();
        let mut delta: i32 = 0;

        if let Some(o) = o {
            if o.x == d.x && o.chars() == d.chars() && o.faces() == d.faces() {
                return Ok(true);
            }
        }

        let mut use_eol_opt = !has_rprompt && d.to_eol;

        // The common prefix/suffix walk only works when the new row starts at
        // or before the old one; otherwise the row is repainted whole.
        if let Some(o) = o.filter(|o| d.x <= o.x) {
            let ob = o.chars().as_bytes();
            let db = d.chars().as_bytes();
            let of = o.faces();
            let df = d.faces();
            let stop = o.len().min(d.len());

            // Left index of difference, advancing whole characters. `stop`
            // need not be a char boundary of the new row's text.
            {
                let mut iter = WidthIter::new(d.chars());
                let mut p = 0usize;
                'prefix: while iter.next().is_some() {
                    let q = iter.pos();
                    if q > stop {
                        break;
                    }
                    for k in p..q {
                        if ob[k] != db[k] || of[k] != df[k] {
                            break 'prefix;
                        }
                    }
                    lcol += iter.width_one_ctrl();
                    p = q;
                }
                lind = p;
            }

            let mut oe = o.len();
            let mut de = d.len();

            // Right index of difference. Not with a right-side prompt on the
            // row: the suffix must be repainted over it.
            if !has_rprompt {
                while oe > lind && de > lind {
                    let oback = prev_char_start(o.chars(), oe);
                    let dback = prev_char_start(d.chars(), de);
                    if oe - oback != de - dback {
                        break;
                    }
                    let n = de - dback;
                    if ob[oback..oe] != db[dback..de] || of[oe - n..oe] != df[de - n..de] {
                        break;
                    }
                    oe = oback;
                    de = dback;
                }

                // Clear-to-eol can stand in for the matched suffix only when
                // that suffix is blank.
                if use_eol_opt {
                    for k in de..d.len() {
                        if db[k] != b' ' || df[k] != Face::Normal {
                            use_eol_opt = false;
                            break;
                        }
                    }
                }
            }

            rind = de;
            let dcols = str_columns(&d.chars()[lind..de]);
            rcol = lcol + dcols;
            if oe < o.len() {
                let ocols = str_columns(&o.chars()[lind..oe]);
                delta = dcols as i32 - ocols as i32;
            }
        }

        let mut left_shift = o
            .filter(|o| o.x > d.x)
            .map(|o| d.x as i32 - o.x as i32)
            .unwrap_or(0);

        // Without insert/delete-column support, repaint the row from its
        // start column instead of shifting.
        if (delta != 0 || left_shift != 0) && !ctx.caps.insert_delete_cols {
            lind = 0;
            lcol = d.x;
            rind = d.len();
            rcol = d.lastcol + d.trail;
            delta = 0;
            left_shift = 0;
        }

        let row = prompt_botlin + i - top;
        self.move_to_row(out, ctx, row)?;

        if left_shift != 0 {
            self.move_to_column(out, ctx, d.x, false)?;
            self.shift_cols(out, ctx, d.x, left_shift)?;
        }

        self.move_to_column(out, ctx, lcol, false)?;
        self.shift_cols(out, ctx, lcol, delta)?;

        self.print_faced(out, ctx, &d.chars()[lind..rind], &d.faces()[lind..rind])?;
        self.col = rcol;

        // Clear anything leftover from the old row.
        if let Some(o) = o {
            if d.lastcol < o.lastcol {
                if use_eol_opt {
                    out.write("\x1b[K");
                } else {
                    // lastcol excludes pad spaces, which is fine: pads are
                    // plain spaces already.
                    let erase = o.lastcol - d.lastcol;
                    self.move_to_column(out, ctx, d.lastcol, false)?;
                    out.write(&" ".repeat(erase));
                    self.col += erase;
                }
            }
        }

        self.detect_pending_wrap(ctx);
        Ok(false)
    }

    pub fn move_to_row(
        &mut self,
        out: &mut dyn TerminalBackend,
        ctx: &PaintCtx<'_>,
        row: usize,
    ) -> Result<(), DisplayError> {
        if self.pending_wrap {
            self.finish_pending_wrap(out, ctx)?;
        }

        if row == self.row {
            return Ok(());
        }
        if row > self.row {
            out.write(&format!("\x1b[{}B", row - self.row));
        } else {
            out.write(&format!("\x1b[{}A", self.row - row));
        }
        self.row = row;
        Ok(())
    }

    pub fn move_to_column(
        &mut self,
        out: &mut dyn TerminalBackend,
        ctx: &PaintCtx<'_>,
        col: usize,
        force: bool,
    ) -> Result<(), DisplayError> {
        debug_assert!(col < ctx.width || col == 0);

        if self.pending_wrap {
            self.finish_pending_wrap(out, ctx)?;
        }

        if col == self.col && !force {
            return Ok(());
        }

        if col > 0 {
            out.write(&format!("\x1b[{}G", col + 1));
        } else {
            out.write("\r");
        }
        self.col = col;
        Ok(())
    }

    /// Insert (`delta > 0`) or delete (`delta < 0`) columns at `col`.
    pub fn shift_cols(
        &mut self,
        out: &mut dyn TerminalBackend,
        ctx: &PaintCtx<'_>,
        col: usize,
        delta: i32,
    ) -> Result<(), DisplayError> {
        debug_assert_eq!(col, self.col);

        if delta > 0 {
            if self.pending_wrap {
                self.finish_pending_wrap(out, ctx)?;
            }
            if !ctx.caps.insert_delete_cols {
                return Err(DisplayError::CapabilityUnavailable);
            }
            out.write(&format!("\x1b[{delta}@"));
        } else if delta < 0 {
            if self.pending_wrap {
                self.finish_pending_wrap(out, ctx)?;
            }
            if !ctx.caps.insert_delete_cols {
                return Err(DisplayError::CapabilityUnavailable);
            }
            out.write(&format!("\x1b[{}P", -delta));
        }

        self.move_to_column(out, ctx, col, false)
    }

    /// Write faced text, switching SGR attributes at face-run boundaries and
    /// restoring the default face at the end.
    pub fn print_faced(
        &mut self,
        out: &mut dyn TerminalBackend,
        ctx: &PaintCtx<'_>,
        chars: &str,
        faces: &[Face],
    ) -> Result<(), DisplayError> {
        debug_assert!(!self.pending_wrap);
        debug_assert_eq!(chars.len(), faces.len());

        if chars.is_empty() {
            return Ok(());
        }

        let mut current = Face::Normal;
        let mut i = 0;
        while i < faces.len() {
            let face = faces[i];
            let mut j = i + 1;
            while j < faces.len() && faces[j] == face {
                j += 1;
            }
            if face != current {
                match ctx.styles.sgr(face) {
                    Some(code) => out.write(code),
                    None => out.write("\x1b[m"),
                }
                current = face;
            }
            out.write(&chars[i..j]);
            i = j;
        }
        if current != Face::Normal {
            out.write("\x1b[m");
        }
        Ok(())
    }

    /// Printing in the last column leaves the terminal holding a wrap open;
    /// model the cursor as already on the next row at column 0.
    pub fn detect_pending_wrap(&mut self, ctx: &PaintCtx<'_>) {
        if self.col == ctx.width {
            self.col = 0;
            self.row += 1;
            self.pending_wrap = true;
        } else {
            self.pending_wrap = false;
        }
    }

    /// Commit a pending wrap by reprinting the first glyph of the row the
    /// cursor wrapped onto, or a throwaway space when that row is blank.
    fn finish_pending_wrap(
        &mut self,
        out: &mut dyn TerminalBackend,
        ctx: &PaintCtx<'_>,
    ) -> Result<(), DisplayError> {
        debug_assert!(self.pending_wrap);
        debug_assert_eq!(self.col, 0);
        self.pending_wrap = false;

        let frame = ctx.frame;
        let mut bytes = 0usize;

        let index = (frame.top() + self.row).checked_sub(frame.prompt_botlin());
        if let Some(index) = index {
            if let Some(d) = frame.get(index) {
                let mut iter = WidthIter::new(d.chars());
                while iter.next().is_some() {
                    if iter.width_one_ctrl() > 0 {
                        break;
                    }
                }
                bytes = iter.pos();
                if bytes > 0 {
                    self.print_faced(out, ctx, &d.chars()[..bytes], &d.faces()[..bytes])?;
                    out.write("\r");
                }
            }
        }

        if bytes == 0 {
            // A space forces the wrap and the backspace undoes it with the
            // fewest side effects during asynchronous resizes.
            out.write("\x1b[m \x08");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{DiffRenderer, PaintCtx};
    use crate::config::FaceStyles;
    use crate::core::terminal::{TermCaps, TerminalBackend};
    use crate::render::frame::{Frame, LayoutRequest};
    use crate::render::line::Face;

    #[derive(Default)]
    struct Capture {
        out: String,
    }

    impl Capture {
        fn take(&mut self) -> String {
            std::mem::take(&mut self.out)
        }
    }

    impl TerminalBackend for Capture {
        fn write(&mut self, data: &str) {
            self.out.push_str(data);
        }
        fn flush(&mut self) {}
        fn size(&self) -> (u16, u16) {
            (80, 24)
        }
    }

    fn layout(width: usize, buffer: &str, cursor: usize) -> Frame {
        let mut f = Frame::default();
        let req = LayoutRequest {
            width,
            prompt_botlin: 0,
            start_col: 0,
            buffer,
            cursor,
            highlight: None,
            literal_tabs: false,
        };
        f.parse_wrapped(&req, &|_| Face::Normal).unwrap();
        f
    }

    fn ctx<'a>(frame: &'a Frame, styles: &'a FaceStyles, width: usize) -> PaintCtx<'a> {
        PaintCtx {
            frame,
            width,
            caps: TermCaps::default(),
            styles,
        }
    }

    #[test]
    fn identical_rows_write_nothing() {
        let styles = FaceStyles::default();
        let old = layout(80, "hello", 5);
        let new = layout(80, "hello", 5);
        let mut cap = Capture::default();
        let mut r = DiffRenderer::new();
        let c = ctx(&old, &styles, 80);
        let identical = r
            .update_line(&mut cap, &c, 0, old.get(0), new.get(0).unwrap(), 0, 0, false)
            .unwrap();
        assert!(identical);
        assert!(cap.take().is_empty());
    }

    #[test]
    fn append_after_common_prefix_writes_suffix_only() {
        let styles = FaceStyles::default();
        let old = layout(80, "abc", 3);
        let new = layout(80, "abcdef", 6);
        let mut cap = Capture::default();
        let mut r = DiffRenderer::new();

        let c = ctx(&old, &styles, 80);
        r.update_line(&mut cap, &c, 0, None, old.get(0).unwrap(), 0, 0, false)
            .unwrap();
        assert_eq!(cap.take(), "abc");
        assert_eq!(r.col(), 3);

        r.update_line(&mut cap, &c, 0, old.get(0), new.get(0).unwrap(), 0, 0, false)
            .unwrap();
        // No clear-to-eol: the new row is longer than the old one.
        assert_eq!(cap.take(), "def");
        assert_eq!(r.col(), 6);
    }

    #[test]
    fn multibyte_glyph_straddling_old_row_length_repaints() {
        let styles = FaceStyles::default();
        let old = layout(80, "ab", 2);
        // The ideograph's three bytes straddle the old row's two-byte length.
        let new = layout(80, "你x", 0);
        let mut cap = Capture::default();
        let mut r = DiffRenderer::new();

        let c = ctx(&old, &styles, 80);
        r.update_line(&mut cap, &c, 0, None, old.get(0).unwrap(), 0, 0, false)
            .unwrap();
        cap.take();

        r.update_line(&mut cap, &c, 0, old.get(0), new.get(0).unwrap(), 0, 0, false)
            .unwrap();
        assert_eq!(cap.take(), "\r你x");
        assert_eq!(r.col(), 3);
    }

    #[test]
    fn shortened_row_uses_clear_to_eol() {
        let styles = FaceStyles::default();
        let old = layout(80, "abcdef", 6);
        let new = layout(80, "abc", 3);
        let mut cap = Capture::default();
        let mut r = DiffRenderer::new();

        let c = ctx(&old, &styles, 80);
        r.update_line(&mut cap, &c, 0, None, old.get(0).unwrap(), 0, 0, false)
            .unwrap();
        cap.take();

        r.update_line(&mut cap, &c, 0, old.get(0), new.get(0).unwrap(), 0, 0, false)
            .unwrap();
        assert_eq!(cap.take(), "\x1b[4G\x1b[K");
        assert_eq!(r.col(), 3);
    }

    #[test]
    fn insertion_shifts_columns_and_writes_gap() {
        let styles = FaceStyles::default();
        let old = layout(80, "xxABCD", 6);
        let new = layout(80, "xxZZABCD", 8);
        let mut cap = Capture::default();
        let mut r = DiffRenderer::new();

        let c = ctx(&old, &styles, 80);
        r.update_line(&mut cap, &c, 0, None, old.get(0).unwrap(), 0, 0, false)
            .unwrap();
        cap.take();

        r.update_line(&mut cap, &c, 0, old.get(0), new.get(0).unwrap(), 0, 0, false)
            .unwrap();
        assert_eq!(cap.take(), "\x1b[3G\x1b[2@ZZ");
        assert_eq!(r.col(), 4);
    }

    #[test]
    fn deletion_shifts_columns_closed() {
        let styles = FaceStyles::default();
        let old = layout(80, "xxZZABCD", 8);
        let new = layout(80, "xxABCD", 6);
        let mut cap = Capture::default();
        let mut r = DiffRenderer::new();

        let c = ctx(&old, &styles, 80);
        r.update_line(&mut cap, &c, 0, None, old.get(0).unwrap(), 0, 0, false)
            .unwrap();
        cap.take();

        r.update_line(&mut cap, &c, 0, old.get(0), new.get(0).unwrap(), 0, 0, false)
            .unwrap();
        // Delete-columns closes the gap, then the columns the old row
        // extended past the new one are blanked explicitly: the retained
        // suffix is not blank, so clear-to-eol is not safe.
        assert_eq!(cap.take(), "\x1b[3G\x1b[2P\x1b[7G  ");
        assert_eq!(r.col(), 8);
    }

    #[test]
    fn no_shift_caps_fall_back_to_row_rewrite() {
        let styles = FaceStyles::default();
        let old = layout(80, "xxABCD", 6);
        let new = layout(80, "xxZZABCD", 8);
        let mut cap = Capture::default();
        let mut r = DiffRenderer::new();

        let mut c = ctx(&old, &styles, 80);
        c.caps.insert_delete_cols = false;
        r.update_line(&mut cap, &c, 0, None, old.get(0).unwrap(), 0, 0, false)
            .unwrap();
        cap.take();

        r.update_line(&mut cap, &c, 0, old.get(0), new.get(0).unwrap(), 0, 0, false)
            .unwrap();
        assert_eq!(cap.take(), "\rxxZZABCD");
        assert_eq!(r.col(), 8);
    }

    #[test]
    fn faced_runs_emit_sgr_transitions() {
        let styles = FaceStyles::default();
        let frame = layout(80, "", 0);
        let mut cap = Capture::default();
        let mut r = DiffRenderer::new();
        let c = ctx(&frame, &styles, 80);
        r.print_faced(
            &mut cap,
            &c,
            "ab<",
            &[Face::Normal, Face::Normal, Face::Scroll],
        )
        .unwrap();
        let out = cap.take();
        assert_eq!(out, format!("ab{}<\x1b[m", styles.sgr(Face::Scroll).unwrap()));
    }

    #[test]
    fn pending_wrap_finishes_by_reprinting_next_row_head() {
        let styles = FaceStyles::default();
        let text = "x".repeat(85);
        let frame = layout(80, &text, 85);
        assert_eq!(frame.count(), 2);

        let mut cap = Capture::default();
        let mut r = DiffRenderer::new();
        let c = ctx(&frame, &styles, 80);

        r.update_line(&mut cap, &c, 0, None, frame.get(0).unwrap(), 0, 0, false)
            .unwrap();
        assert!(r.pending_wrap());
        assert_eq!((r.row(), r.col()), (1, 0));
        cap.take();

        r.update_line(&mut cap, &c, 1, None, frame.get(1).unwrap(), 0, 0, false)
            .unwrap();
        // The wrap is committed by reprinting the head of row 1, then the
        // row paints normally.
        assert_eq!(cap.take(), "x\rxxxxx");
        assert!(!r.pending_wrap());
    }

    #[test]
    fn pending_wrap_placeholder_when_no_row() {
        let styles = FaceStyles::default();
        let frame = layout(80, "", 0);
        let mut cap = Capture::default();
        let mut r = DiffRenderer::new();
        let c = ctx(&frame, &styles, 80);

        r.set_position(0, 0);
        r.set_pending_wrap(true);
        r.move_to_row(&mut cap, &c, 2).unwrap();
        let out = cap.take();
        assert!(out.starts_with("\x1b[m \x08"));
        assert!(out.ends_with("\x1b[2B"));
    }
}
