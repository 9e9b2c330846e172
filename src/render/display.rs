//! Render-state orchestrator.
//!
//! `DisplayManager` owns the frame pair and drives a full redisplay pass:
//! prompt repaint when geometry changes, row layout, vertical scroll
//! clamping, scroll markers, frame diffing, the right-side prompt, and the
//! comment row, all inside one coalescing scope so the pass reaches the
//! terminal as a single write.

use crate::config::DisplayConfig;
use crate::core::output::CoalesceScope;
use crate::core::terminal::TerminalBackend;
use crate::core::text::ecma48::{prompt_problem_codes, PromptProblems};
use crate::core::text::utils::{ellipsify, expand_ctrl_into};
use crate::core::text::width::{visible_width, WidthIter};
use crate::logging::{self, RedrawStats};
use crate::provider::{CommentRowProvider, ContentProvider};

use super::frame::{CommentRowKind, Frame, LayoutRequest};
use super::line::{Face, ScrollMark};
use super::measure::{MeasureColumns, MeasureMode};
use super::renderer::{DiffRenderer, PaintCtx};
use super::DisplayError;

const SUGGESTION_HINT: &str = "\x1b[7mRight\x1b[27m=Accept Suggestion";

pub struct DisplayManager {
    config: DisplayConfig,
    /// Frame currently on screen.
    curr: Frame,
    /// Frame being laid out and painted this pass.
    next: Frame,
    renderer: DiffRenderer,
    /// Prompt text as last painted, modmark included.
    last_prompt: String,
    last_width: usize,
    /// Rows the prompt occupies above the input row.
    prompt_botlin: usize,
    /// Column where the input row begins.
    start_col: usize,
    prompt_problems: PromptProblems,
    /// Input rows painted by the previous pass.
    vis_rows: usize,
    /// Columns of right prompt currently on screen, 0 when hidden.
    rprompt_shown: usize,
    /// Physical row of the comment row, when one is shown.
    comment_shown_at: Option<usize>,
    redrawing: bool,
    stats: RedrawStats,
}

impl DisplayManager {
    pub fn new(config: DisplayConfig) -> Self {
        Self {
            config,
            curr: Frame::default(),
            next: Frame::default(),
            renderer: DiffRenderer::new(),
            last_prompt: String::new(),
            last_width: 0,
            prompt_botlin: 0,
            start_col: 0,
            prompt_problems: PromptProblems::default(),
            vis_rows: 0,
            rprompt_shown: 0,
            comment_shown_at: None,
            redrawing: false,
            stats: RedrawStats::default(),
        }
    }

    pub fn config(&self) -> &DisplayConfig {
        &self.config
    }

    pub fn stats(&self) -> RedrawStats {
        self.stats
    }

    /// Run one redisplay pass. Non-reentrant: a nested call (from a signal
    /// handler or a provider callback) returns without painting.
    pub fn display(
        &mut self,
        term: &mut dyn TerminalBackend,
        content: &dyn ContentProvider,
        comments: &dyn CommentRowProvider,
    ) -> Result<(), DisplayError> {
        if self.redrawing {
            return Ok(());
        }
        self.redrawing = true;

        let mut out = CoalesceScope::new(term);
        let result = self.render(&mut out, content, comments);
        if result.is_err() {
            out.discard();
        }
        drop(out);

        self.redrawing = false;
        if result.is_err() {
            self.reset_paint_state();
        }
        result
    }

    fn render(
        &mut self,
        out: &mut CoalesceScope<'_>,
        content: &dyn ContentProvider,
        comments: &dyn CommentRowProvider,
    ) -> Result<(), DisplayError> {
        self.stats.display_calls += 1;

        let (cols, rows) = out.size();
        let width = (cols as usize).max(1);
        let height = (rows as usize).max(1);
        let caps = out.caps();

        // The prompt exactly as it will be painted, modmark included.
        let modmark = self.config.mark_modified_lines && content.modified();
        let mut prompt = String::with_capacity(content.prompt().len() + 1);
        if modmark {
            prompt.push('*');
        }
        prompt.push_str(content.prompt());

        let forced = self.curr.count() == 0
            || width != self.last_width
            || prompt != self.last_prompt
            || self.prompt_problems.problem;

        if forced {
            let mut mc = MeasureColumns::new(
                MeasureMode::Print,
                width,
                self.config.display_literal_tabs,
            );
            mc.measure(&prompt, true);
            self.prompt_botlin = mc.line_count().saturating_sub(1);
            self.start_col = mc.column();
            self.prompt_problems = prompt_problem_codes(&prompt);
            let prompt_wrap = mc.force_wrap();

            {
                let ctx = PaintCtx {
                    frame: &self.curr,
                    width,
                    caps,
                    styles: &self.config.faces,
                };
                self.renderer.move_to_row(out, &ctx, 0)?;
                self.renderer.move_to_column(out, &ctx, 0, false)?;
                out.write("\x1b[m");
                if modmark {
                    if let Some(code) = self.config.faces.sgr(Face::Modmark) {
                        out.write(code);
                    }
                    out.write("*");
                    out.write("\x1b[m");
                    out.write(content.prompt());
                } else {
                    out.write(&prompt);
                }
                out.write("\x1b[J");
            }
            self.stats.prompt_repaints += 1;

            // Double-width glyphs may render at a different width than
            // measured; trust the terminal's own answer when it gives one.
            if caps.double_width_reconciliation && !prompt_wrap {
                if let Some((col, _)) = out.cursor_position() {
                    let col = col as usize;
                    if col < width {
                        self.start_col = col;
                    }
                }
            }

            if prompt_wrap {
                self.renderer.set_position(self.prompt_botlin, 0);
                self.renderer.set_pending_wrap(true);
            } else {
                self.renderer.set_position(self.prompt_botlin, self.start_col);
                self.renderer.set_pending_wrap(false);
                if self.start_col > 0 {
                    let ctx = PaintCtx {
                        frame: &self.curr,
                        width,
                        caps,
                        styles: &self.config.faces,
                    };
                    // Raw prompt bytes bypassed column tracking; pin it down.
                    self.renderer.move_to_column(out, &ctx, self.start_col, true)?;
                }
            }

            self.curr.clear();
            self.vis_rows = 0;
            self.rprompt_shown = 0;
            self.comment_shown_at = None;
            self.last_width = width;
            self.last_prompt = prompt;
        }

        let buffer = content.buffer();
        let cursor = content.cursor().min(buffer.len());
        let req = LayoutRequest {
            width,
            prompt_botlin: self.prompt_botlin,
            start_col: self.start_col.min(width.saturating_sub(1)),
            buffer,
            cursor,
            highlight: content.highlight_range(),
            literal_tabs: self.config.display_literal_tabs,
        };
        let reserve =
            usize::from(self.config.show_history_preview || self.config.show_suggestion_hint);
        let mut allowed = height.saturating_sub(self.prompt_botlin + reserve).max(1);
        if self.config.max_input_rows > 0 {
            allowed = allowed.min(self.config.max_input_rows);
        }

        let face_at = |index: usize| content.face_at(index);
        // A one-row window cannot scroll vertically; lay out horizontally
        // instead. Newlines render as their ^J caret pair there.
        let horz = self.config.horizontal_scroll_mode || allowed <= 1;
        if horz {
            self.next.parse_horizontal(&req, &face_at, &self.curr)?;
        } else {
            self.next.parse_wrapped(&req, &face_at)?;
        }

        let count = self.next.count();
        let botlin = self.next.prompt_botlin();
        let vpos = self.next.vpos();
        let cpos = self.next.cpos();

        let visible = (count - botlin).min(allowed);
        let offset = visible - 1;

        let mut top = self.curr.top().max(botlin);
        if vpos < top {
            top = vpos.max(botlin);
        }
        if vpos > top + offset {
            top = vpos - offset;
        }
        if top + offset + 1 > count {
            top = count - 1 - offset;
        }

        // Nudge so a scroll marker never lands on the cursor cell.
        if offset > 0 {
            if top > botlin && top == vpos {
                if let Some(d) = self.next.get(vpos) {
                    if cpos == d.x {
                        top -= 1;
                    }
                }
            }
            if top + offset + 1 < count && top + offset == vpos && cpos + 1 == width {
                top += 1;
            }
        }

        self.next.set_top(top);
        if !horz {
            self.next.apply_scroll_markers(top, top + offset)?;
        }

        if self.config.show_history_preview {
            if let Some(exp) = comments.expansion_at(cursor) {
                let end = (exp.start + exp.len).min(buffer.len());
                let reference = buffer.get(exp.start..end).unwrap_or("");
                let mut text = String::from("History expansion for \"");
                expand_ctrl_into(&mut text, reference);
                text.push_str("\": ");
                expand_ctrl_into(&mut text, &exp.result);
                self.next.set_comment_row(text, CommentRowKind::Expansion);
            }
        }
        if self.next.comment_row().is_empty()
            && self.config.show_suggestion_hint
            && comments.suggestion_available()
            && self.next.has_suggestion()
        {
            self.next
                .set_comment_row(SUGGESTION_HINT.to_string(), CommentRowKind::Suggestion);
        }

        let rtext = content.right_prompt();
        let rcols = if rtext.is_empty() { 0 } else { visible_width(rtext) };
        let show_rprompt = rcols > 0
            && rcols + 2 < width
            && !self.next.is_horz_scrolled()
            && self.next.can_show_rprompt(rcols);

        // Rows still on screen belong to the old frame; pending wraps are
        // finished against it until every visible row is repainted.
        let mut ctx = PaintCtx {
            frame: &self.curr,
            width,
            caps,
            styles: &self.config.faces,
        };

        if !show_rprompt && self.rprompt_shown > 0 {
            Self::print_rprompt(
                &mut self.renderer,
                &mut self.rprompt_shown,
                out,
                &ctx,
                None,
                width,
            )?;
        }

        let old_top = self.curr.top();
        let bottom = top + offset;
        for i in top..=bottom {
            let Some(d) = self.next.get(i) else {
                return Err(DisplayError::Inconsistent("laid-out row missing"));
            };
            let o = self.curr.get(i - top + old_top);
            let identical =
                self.renderer
                    .update_line(out, &ctx, i, o, d, top, botlin, show_rprompt)?;
            if identical {
                self.stats.identical_rows += 1;
            }
        }

        ctx.frame = &self.next;

        if show_rprompt && self.rprompt_shown != rcols {
            Self::print_rprompt(
                &mut self.renderer,
                &mut self.rprompt_shown,
                out,
                &ctx,
                Some((rtext, rcols)),
                width,
            )?;
        }

        let rows_vis = bottom - top + 1;
        let old_rows = self.vis_rows;
        if old_rows > rows_vis {
            for r in rows_vis..old_rows {
                self.renderer.move_to_row(out, &ctx, botlin + r)?;
                self.renderer.move_to_column(out, &ctx, 0, false)?;
                out.write("\x1b[K");
            }
        }
        self.vis_rows = rows_vis;

        let comment_phys = botlin + rows_vis;
        let show_comment = !self.next.comment_row().is_empty() && comment_phys < height;

        if let Some(p) = self.comment_shown_at {
            if !show_comment || p != comment_phys {
                self.renderer.move_to_row(out, &ctx, p)?;
                self.renderer.move_to_column(out, &ctx, 0, false)?;
                out.write("\x1b[K");
                self.comment_shown_at = None;
            }
        }
        if show_comment {
            let changed = self.comment_shown_at != Some(comment_phys)
                || self.next.comment_row() != self.curr.comment_row();
            if changed {
                self.renderer.move_to_row(out, &ctx, comment_phys)?;
                self.renderer.move_to_column(out, &ctx, 0, false)?;
                match self.next.comment_kind() {
                    CommentRowKind::Suggestion => {
                        out.write("\x1b[m\x1b[K");
                        let hint_cols = visible_width(self.next.comment_row());
                        let pad = width.saturating_sub(hint_cols + 1);
                        self.renderer.move_to_column(out, &ctx, pad, false)?;
                        out.write(self.next.comment_row());
                        out.write("\x1b[m");
                        self.renderer
                            .set_position(comment_phys, (pad + hint_cols).min(width - 1));
                    }
                    _ => {
                        let text =
                            ellipsify(self.next.comment_row(), width.saturating_sub(1), "…");
                        if let Some(code) = self.config.faces.sgr(Face::Comment) {
                            out.write(code);
                        }
                        out.write(&text);
                        out.write("\x1b[m\x1b[K");
                        let tcols = visible_width(&text).min(width.saturating_sub(1));
                        self.renderer.set_position(comment_phys, tcols);
                    }
                }
            }
            self.comment_shown_at = Some(comment_phys);
        }

        if vpos < top || vpos > bottom {
            return Err(DisplayError::Inconsistent("cursor row outside scroll window"));
        }
        self.renderer.move_to_row(out, &ctx, botlin + (vpos - top))?;
        self.renderer
            .move_to_column(out, &ctx, cpos.min(width.saturating_sub(1)), false)?;
        debug_assert!(!self.renderer.pending_wrap());

        std::mem::swap(&mut self.curr, &mut self.next);
        self.next.clear();

        if logging::debug_redraw_enabled() {
            logging::log_debug_redraw(
                if forced { "forced" } else { "incremental" },
                old_rows,
                rows_vis,
                height,
            );
        }
        Ok(())
    }

    fn print_rprompt(
        renderer: &mut DiffRenderer,
        rprompt_shown: &mut usize,
        out: &mut dyn TerminalBackend,
        ctx: &PaintCtx<'_>,
        show: Option<(&str, usize)>,
        width: usize,
    ) -> Result<(), DisplayError> {
        // The right prompt only ever appears on a single-row frame, which
        // puts it on physical row 0, ending one column short of the edge so
        // it can never trip the autowrap.
        match show {
            Some((text, cols)) => {
                let col = width - cols - 1;
                renderer.move_to_row(out, ctx, 0)?;
                renderer.move_to_column(out, ctx, col, false)?;
                out.write("\x1b[m");
                out.write(text);
                out.write("\x1b[m");
                renderer.set_position(0, col + cols);
                *rprompt_shown = cols;
            }
            None => {
                let col = width.saturating_sub(*rprompt_shown + 1);
                renderer.move_to_row(out, ctx, 0)?;
                renderer.move_to_column(out, ctx, col, false)?;
                out.write("\x1b[K");
                *rprompt_shown = 0;
            }
        }
        Ok(())
    }

    /// Re-measure the displayed prompt and the visible rows up to the cursor
    /// into `mc`, which the caller constructs at the new width in `Resize`
    /// mode. Join counts observed at the displayed width carry over, since
    /// the terminal joins previously wrapped rows when it widens.
    pub fn measure_for_resize(&self, content: &dyn ContentProvider, mc: &mut MeasureColumns) {
        let mut old = MeasureColumns::new(
            MeasureMode::Print,
            self.last_width.max(1),
            self.config.display_literal_tabs,
        );
        old.measure(&self.last_prompt, true);
        mc.measure(&self.last_prompt, true);
        mc.apply_join_count(&old);

        let f = &self.curr;
        if f.count() == 0 {
            return;
        }
        let cursor = content.cursor();
        let top = f.top();
        let vpos = f.vpos().max(top);
        for i in top..=vpos {
            let Some(d) = f.get(i) else {
                break;
            };
            if i > top {
                mc.measure("\n", true);
            }
            if i == vpos {
                // Row cells are expanded text; the byte offsets only line up
                // for plain characters, so floor to a char boundary.
                let mut len = (d.lead + cursor.saturating_sub(d.start)).min(d.len());
                while len > 0 && !d.chars().is_char_boundary(len) {
                    len -= 1;
                }
                mc.measure(&d.chars()[..len], false);
            } else {
                mc.measure(d.chars(), false);
            }
        }
    }

    /// Rows between the first input row and the first visible row.
    pub fn top_offset(&self) -> usize {
        self.curr.top().saturating_sub(self.curr.prompt_botlin())
    }

    /// Buffer offset where the first visible row begins.
    pub fn top_buffer_start(&self) -> usize {
        self.curr.get(self.curr.top()).map_or(0, |d| d.start)
    }

    /// Screen position of the buffer cursor, `(row, col)` relative to the
    /// top of the display, as of the last pass.
    pub fn cursor_screen_position(&self) -> (usize, usize) {
        let f = &self.curr;
        let row = f.prompt_botlin() + f.vpos().saturating_sub(f.top());
        (row, f.cpos())
    }

    /// Map a screen position to the buffer offset under it, walking the
    /// layout the way it was painted (control characters count their caret
    /// pair). `row` is relative to the top of the display. With `clip`,
    /// positions outside the input area snap to the nearest row; without it
    /// they return `None`. A position past the end of a row maps to the
    /// row's end.
    pub fn buffer_offset_at(
        &self,
        buffer: &str,
        x: usize,
        row: usize,
        clip: bool,
    ) -> Option<usize> {
        let f = &self.curr;
        if f.count() == 0 {
            return None;
        }
        let botlin = f.prompt_botlin();
        let top = f.top();
        let last = (top + self.vis_rows.max(1) - 1).min(f.count() - 1);

        let i = if row < botlin {
            if !clip {
                return None;
            }
            top
        } else {
            let i = row - botlin + top;
            if i > last {
                if !clip {
                    return None;
                }
                last
            } else {
                i
            }
        };

        let d = f.get(i)?;
        let end = d.end.min(buffer.len());
        let mut col = d.x + d.lead;
        let mut index = d.start.min(end);

        // A lead from a glyph split across the wrap belongs to the previous
        // row; a horizontal `<` marker lead does not consume buffer text.
        if d.lead > 0 && d.scroll_mark == ScrollMark::None && !f.is_horz_scrolled() {
            let mut it = WidthIter::new(&buffer[index..end]);
            if it.next().is_some() {
                index += it.char_len();
            }
        }

        if x < col {
            return Some(index);
        }
        let mut it = WidthIter::new(&buffer[index..end]);
        while it.next().is_some() {
            let w = it.width_two_ctrl().max(1);
            if x < col + w {
                return Some(index + it.char_start());
            }
            col += w;
        }
        Some(end)
    }

    /// The host moved the cursor to a fresh line (printed output, cleared
    /// the screen). The next pass repaints from scratch at the cursor.
    pub fn on_new_line(&mut self) {
        self.reset_paint_state();
    }

    /// Repaint everything on the next pass, in place. Keeps the cursor
    /// model so the repaint can walk back to the top of the display.
    pub fn force_redraw(&mut self) {
        self.curr.clear();
        self.last_width = 0;
        self.vis_rows = 0;
        self.rprompt_shown = 0;
        self.comment_shown_at = None;
    }

    /// Finish the line: erase the comment row, move past the last visible
    /// row, and emit CR/LF so subsequent output starts on a fresh line.
    pub fn end_prompt_lf(&mut self, term: &mut dyn TerminalBackend) -> Result<(), DisplayError> {
        let mut out = CoalesceScope::new(term);
        let caps = out.caps();
        let width = self.curr.width().max(1);
        let ctx = PaintCtx {
            frame: &self.curr,
            width,
            caps,
            styles: &self.config.faces,
        };

        if let Some(p) = self.comment_shown_at {
            self.renderer.move_to_row(&mut out, &ctx, p)?;
            self.renderer.move_to_column(&mut out, &ctx, 0, false)?;
            out.write("\x1b[K");
        }
        if self.curr.count() > 0 {
            // move_to_row commits any pending wrap, so the bottom row exists
            // even when it is an empty wrap continuation.
            let bottom = self.curr.prompt_botlin() + self.vis_rows.saturating_sub(1);
            self.renderer.move_to_row(&mut out, &ctx, bottom)?;
        }
        out.write("\r\n");
        drop(out);

        self.reset_paint_state();
        Ok(())
    }

    fn reset_paint_state(&mut self) {
        self.curr.clear();
        self.next.clear();
        self.renderer.reset();
        self.last_prompt.clear();
        self.last_width = 0;
        self.prompt_botlin = 0;
        self.start_col = 0;
        self.prompt_problems = PromptProblems::default();
        self.vis_rows = 0;
        self.rprompt_shown = 0;
        self.comment_shown_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::DisplayManager;
    use crate::config::DisplayConfig;
    use crate::core::terminal::{TermCaps, TerminalBackend};
    use crate::provider::{CommentRowProvider, ContentProvider, Expansion, NoComments};
    use crate::render::line::Face;
    use crate::render::measure::{MeasureColumns, MeasureMode};

    struct Fake {
        out: String,
        size: (u16, u16),
    }

    impl Fake {
        fn new(cols: u16, rows: u16) -> Self {
            Self {
                out: String::new(),
                size: (cols, rows),
            }
        }

        fn take(&mut self) -> String {
            std::mem::take(&mut self.out)
        }
    }

    impl TerminalBackend for Fake {
        fn write(&mut self, data: &str) {
            self.out.push_str(data);
        }
        fn flush(&mut self) {}
        fn size(&self) -> (u16, u16) {
            self.size
        }
    }

    #[derive(Default)]
    struct Content {
        prompt: String,
        buffer: String,
        cursor: usize,
        rprompt: String,
        suggestion_from: Option<usize>,
    }

    impl Content {
        fn new(prompt: &str, buffer: &str, cursor: usize) -> Self {
            Self {
                prompt: prompt.to_string(),
                buffer: buffer.to_string(),
                cursor,
                ..Self::default()
            }
        }
    }

    impl ContentProvider for Content {
        fn prompt(&self) -> &str {
            &self.prompt
        }
        fn right_prompt(&self) -> &str {
            &self.rprompt
        }
        fn buffer(&self) -> &str {
            &self.buffer
        }
        fn cursor(&self) -> usize {
            self.cursor
        }
        fn face_at(&self, index: usize) -> Face {
            match self.suggestion_from {
                Some(from) if index >= from => Face::Suggestion,
                _ => Face::Normal,
            }
        }
    }

    struct Comments {
        available: bool,
        expansion: Option<Expansion>,
    }

    impl CommentRowProvider for Comments {
        fn expansion_at(&self, _cursor: usize) -> Option<Expansion> {
            self.expansion.clone()
        }
        fn suggestion_available(&self) -> bool {
            self.available
        }
    }

    #[test]
    fn first_pass_paints_prompt_and_pins_the_column() {
        let mut term = Fake::new(80, 24);
        let mut dm = DisplayManager::new(DisplayConfig::default());
        let content = Content::new("$ ", "", 0);
        dm.display(&mut term, &content, &NoComments).unwrap();
        assert_eq!(term.take(), "\x1b[m$ \x1b[J\x1b[3G");
    }

    #[test]
    fn unchanged_pass_writes_nothing() {
        let mut term = Fake::new(80, 24);
        let mut dm = DisplayManager::new(DisplayConfig::default());
        let content = Content::new("$ ", "ls", 2);
        dm.display(&mut term, &content, &NoComments).unwrap();
        term.take();
        dm.display(&mut term, &content, &NoComments).unwrap();
        assert_eq!(term.take(), "");
    }

    #[test]
    fn typing_at_the_end_appends_only_the_suffix() {
        let mut term = Fake::new(80, 24);
        let mut dm = DisplayManager::new(DisplayConfig::default());
        dm.display(&mut term, &Content::new("$ ", "ls", 2), &NoComments)
            .unwrap();
        term.take();
        dm.display(&mut term, &Content::new("$ ", "ls -la", 6), &NoComments)
            .unwrap();
        assert_eq!(term.take(), " -la");
    }

    #[test]
    fn right_prompt_appears_and_hides_when_the_line_grows() {
        let mut term = Fake::new(80, 24);
        let mut dm = DisplayManager::new(DisplayConfig::default());
        let mut content = Content::new("$ ", "ls", 2);
        content.rprompt = "[git]".to_string();
        dm.display(&mut term, &content, &NoComments).unwrap();
        let first = term.take();
        assert!(first.contains("\x1b[75G\x1b[m[git]\x1b[m"));
        assert!(first.ends_with("\x1b[5G"));

        // Two rows now; the right prompt no longer fits and is erased.
        content.buffer = "x".repeat(80);
        content.cursor = 80;
        dm.display(&mut term, &content, &NoComments).unwrap();
        assert!(term.take().contains("\x1b[75G\x1b[K"));
    }

    #[test]
    fn suggestion_hint_is_right_aligned_below_the_input() {
        let mut term = Fake::new(80, 24);
        let mut dm = DisplayManager::new(DisplayConfig::default());
        let mut content = Content::new("$ ", "ls -la", 2);
        content.suggestion_from = Some(2);
        let comments = Comments {
            available: true,
            expansion: None,
        };
        dm.display(&mut term, &content, &comments).unwrap();
        let out = term.take();
        assert!(out.contains("\x1b[57G"));
        assert!(out.contains("Right\x1b[27m=Accept Suggestion"));
    }

    #[test]
    fn expansion_preview_uses_the_comment_face() {
        let mut term = Fake::new(80, 24);
        let mut dm = DisplayManager::new(DisplayConfig::default());
        let content = Content::new("$ ", "!g", 2);
        let comments = Comments {
            available: false,
            expansion: Some(Expansion {
                start: 0,
                len: 2,
                result: "git status".to_string(),
            }),
        };
        dm.display(&mut term, &content, &comments).unwrap();
        let out = term.take();
        assert!(out.contains("\x1b[37;45mHistory expansion for \"!g\": git status"));
    }

    #[test]
    fn scrolled_frame_marks_the_top_row() {
        let mut term = Fake::new(80, 5);
        let mut dm = DisplayManager::new(DisplayConfig::default());
        let text = "x".repeat(400);
        let content = Content::new("$ ", &text, 400);
        dm.display(&mut term, &content, &NoComments).unwrap();
        let out = term.take();
        assert!(out.contains("\x1b[36m<"));
    }

    #[test]
    fn one_row_window_falls_back_to_horizontal() {
        // Height 2 with the comment-row reservation leaves one input row.
        let mut term = Fake::new(40, 2);
        let mut dm = DisplayManager::new(DisplayConfig::default());
        let text = "x".repeat(200);
        let content = Content::new("$ ", &text, 100);
        dm.display(&mut term, &content, &NoComments).unwrap();
        let out = term.take();
        assert!(out.contains("\x1b[36m<"));
        assert!(out.contains("\x1b[36m>"));
        assert_eq!(dm.cursor_screen_position().0, 0);
    }

    #[test]
    fn horizontal_mode_renders_newlines_as_caret_pairs() {
        let mut term = Fake::new(80, 24);
        let mut config = DisplayConfig::default();
        config.horizontal_scroll_mode = true;
        let mut dm = DisplayManager::new(config);
        let content = Content::new("$ ", "ab\ncd", 5);
        dm.display(&mut term, &content, &NoComments).unwrap();
        assert!(term.take().contains("ab^Jcd"));
    }

    struct Probing {
        out: String,
        observed_col: u16,
    }

    impl TerminalBackend for Probing {
        fn write(&mut self, data: &str) {
            self.out.push_str(data);
        }
        fn flush(&mut self) {}
        fn size(&self) -> (u16, u16) {
            (80, 24)
        }
        fn cursor_position(&mut self) -> Option<(u16, u16)> {
            Some((self.observed_col, 0))
        }
        fn caps(&self) -> TermCaps {
            TermCaps {
                double_width_reconciliation: true,
                ..TermCaps::default()
            }
        }
    }

    #[test]
    fn prompt_probe_adopts_the_observed_column() {
        // The terminal reports the prompt ended at column 5, not the
        // measured 2; the input row starts where the terminal says.
        let mut term = Probing {
            out: String::new(),
            observed_col: 5,
        };
        let mut dm = DisplayManager::new(DisplayConfig::default());
        let content = Content::new("$ ", "", 0);
        dm.display(&mut term, &content, &NoComments).unwrap();
        assert_eq!(term.out, "\x1b[m$ \x1b[J\x1b[6G");
        assert_eq!(dm.cursor_screen_position(), (0, 5));
    }

    #[test]
    fn problem_prompt_repaints_every_pass() {
        let mut term = Fake::new(80, 24);
        let mut dm = DisplayManager::new(DisplayConfig::default());
        let content = Content::new("\x1b[K$ ", "", 0);
        dm.display(&mut term, &content, &NoComments).unwrap();
        term.take();
        dm.display(&mut term, &content, &NoComments).unwrap();
        assert!(term.take().contains("\x1b[J"));
    }

    #[test]
    fn end_prompt_lf_emits_a_newline() {
        let mut term = Fake::new(80, 24);
        let mut dm = DisplayManager::new(DisplayConfig::default());
        dm.display(&mut term, &Content::new("$ ", "ls", 2), &NoComments)
            .unwrap();
        term.take();
        dm.end_prompt_lf(&mut term).unwrap();
        assert_eq!(term.take(), "\r\n");
        // State was reset; the next pass repaints the prompt.
        dm.display(&mut term, &Content::new("$ ", "", 0), &NoComments)
            .unwrap();
        assert!(term.take().contains("$ "));
    }

    #[test]
    fn buffer_offset_maps_screen_columns_back() {
        let mut term = Fake::new(80, 24);
        let mut dm = DisplayManager::new(DisplayConfig::default());
        let content = Content::new("$ ", "hello", 5);
        dm.display(&mut term, &content, &NoComments).unwrap();
        assert_eq!(dm.buffer_offset_at("hello", 4, 0, false), Some(2));
        assert_eq!(dm.buffer_offset_at("hello", 0, 0, false), Some(0));
        assert_eq!(dm.buffer_offset_at("hello", 60, 0, false), Some(5));
        assert_eq!(dm.buffer_offset_at("hello", 0, 5, false), None);
        assert_eq!(dm.buffer_offset_at("hello", 0, 5, true), Some(0));
    }

    #[test]
    fn resize_measurement_counts_reflowed_rows() {
        let mut term = Fake::new(80, 24);
        let mut dm = DisplayManager::new(DisplayConfig::default());
        let content = Content::new("$ ", "ls", 2);
        dm.display(&mut term, &content, &NoComments).unwrap();
        let mut mc = MeasureColumns::new(MeasureMode::Resize, 40, false);
        dm.measure_for_resize(&content, &mut mc);
        assert_eq!(mc.line_count(), 1);
        assert_eq!(mc.column(), 4);
    }

    #[test]
    fn modified_line_gets_a_modmark_prompt() {
        struct Modified(Content);
        impl ContentProvider for Modified {
            fn prompt(&self) -> &str {
                self.0.prompt()
            }
            fn buffer(&self) -> &str {
                self.0.buffer()
            }
            fn cursor(&self) -> usize {
                self.0.cursor()
            }
            fn modified(&self) -> bool {
                true
            }
        }

        let mut term = Fake::new(80, 24);
        let mut config = DisplayConfig::default();
        config.mark_modified_lines = true;
        let mut dm = DisplayManager::new(config);
        let content = Modified(Content::new("$ ", "", 0));
        dm.display(&mut term, &content, &NoComments).unwrap();
        let out = term.take();
        assert!(out.contains("\x1b[36m*\x1b[m$ "));
        // The mark widens the prompt by one column.
        assert!(out.ends_with("\x1b[4G"));
    }
}
