//! Column measurement without painting.
//!
//! Replays text the way the terminal will display it and reports the ending
//! column and row count. `Print` mode models the live terminal, including
//! its deferred wrap when prompt text lands exactly on the last column;
//! `Resize` mode wraps immediately, matching how the terminal reflows
//! already-printed rows.

use crate::core::text::ecma48::{Ecma48Run, Ecma48Scanner};
use crate::core::text::width::WidthIter;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MeasureMode {
    Print,
    Resize,
}

#[derive(Clone, Debug)]
pub struct MeasureColumns {
    mode: MeasureMode,
    width: usize,
    literal_tabs: bool,
    col: usize,
    line_count: usize,
    join_count: usize,
    force_wrap: bool,
}

impl MeasureColumns {
    pub fn new(mode: MeasureMode, width: usize, literal_tabs: bool) -> Self {
        Self {
            mode,
            width: width.max(1),
            literal_tabs,
            col: 0,
            line_count: 1,
            join_count: 0,
            force_wrap: false,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Ending column of everything measured so far.
    pub fn column(&self) -> usize {
        self.col
    }

    /// Rows occupied, net of wraps the terminal joins with a newline.
    pub fn line_count(&self) -> usize {
        self.line_count.saturating_sub(self.join_count)
    }

    /// The measured text ends exactly at a wrap boundary without a trailing
    /// newline, so the terminal is holding a deferred wrap open.
    pub fn force_wrap(&self) -> bool {
        self.force_wrap
    }

    /// Adopt the join count observed by a `Print` measurement at the width
    /// the rows were originally displayed at.
    pub fn apply_join_count(&mut self, other: &MeasureColumns) {
        self.join_count = other.join_count;
    }

    /// Accumulate `text`. Calls compose: prompt first, then buffer rows.
    pub fn measure(&mut self, text: &str, is_prompt: bool) {
        let mut last_lf: Option<usize> = None;
        let mut wrapped = false;

        let mut scanner = Ecma48Scanner::new(text);
        while let Some(run) = scanner.next_run() {
            match run {
                Ecma48Run::Chars(chars) => {
                    let mut iter = WidthIter::new(chars);
                    while iter.next().is_some() {
                        if !is_prompt && iter.width_signed() < 0 {
                            self.ctrl_columns();
                            continue;
                        }
                        if wrapped {
                            wrapped = false;
                            self.line_count += 1;
                        }
                        let n = iter.width_one_ctrl();
                        self.col += n;
                        if self.col >= self.width {
                            if is_prompt && self.mode == MeasureMode::Print && self.col == self.width
                            {
                                // Defer: the terminal holds the wrap open
                                // until the next character prints.
                                wrapped = true;
                            } else {
                                self.line_count += 1;
                            }
                            self.col = if self.col > self.width { n } else { 0 };
                        }
                    }
                }
                Ecma48Run::C0(code) => {
                    if !is_prompt && !(code == 0x09 && self.literal_tabs) {
                        self.ctrl_columns();
                        continue;
                    }
                    match code {
                        0x0a => {
                            last_lf = Some(scanner.pos());
                            self.line_count += 1;
                            self.col = 0;
                            if wrapped {
                                if self.mode == MeasureMode::Print {
                                    self.join_count += 1;
                                }
                                wrapped = false;
                            }
                        }
                        0x0d => {
                            self.col = 0;
                            if wrapped {
                                if self.mode == MeasureMode::Print {
                                    self.join_count += 1;
                                }
                                wrapped = false;
                            }
                        }
                        0x09 => {
                            if wrapped {
                                wrapped = false;
                                self.line_count += 1;
                            }
                            let n = 8 - (self.col & 7);
                            self.col = (self.col + n).min(self.width);
                        }
                        0x08 => {
                            if self.col > 0 {
                                self.col -= 1;
                            }
                        }
                        _ => {}
                    }
                }
                _ => {}
            }
        }

        if wrapped {
            self.line_count += 1;
        }

        self.force_wrap =
            self.col == 0 && self.line_count > 1 && last_lf != Some(text.len());
    }

    fn ctrl_columns(&mut self) {
        self.col += 2;
        while self.col >= self.width {
            self.col -= self.width;
            self.line_count += 1;
        }
    }
}
