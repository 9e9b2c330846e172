//! ECMA-48 run scanner.
//!
//! Splits text into plain-character runs and escape/control runs so that
//! measurement can skip sequences and prompt classification can inspect them.

/// One scanned run. `Chars` carries visible text; the other variants carry
/// the raw bytes of the sequence they matched.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ecma48Run<'a> {
    Chars(&'a str),
    /// Single C0 control byte (or DEL).
    C0(u8),
    /// CSI sequence with its final byte.
    Csi { final_byte: u8, raw: &'a str },
    /// Operating system command, terminated by BEL or ST.
    Osc(&'a str),
    /// Application program command.
    Apc(&'a str),
    /// Device control string.
    Dcs(&'a str),
    /// Any other escape sequence (including SS3).
    Esc(&'a str),
}

pub struct Ecma48Scanner<'a> {
    text: &'a str,
    pos: usize,
    run_start: usize,
}

impl<'a> Ecma48Scanner<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            pos: 0,
            run_start: 0,
        }
    }

    /// Byte offset where the most recent run began.
    pub fn run_start(&self) -> usize {
        self.run_start
    }

    /// Byte offset just past the most recent run.
    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn next_run(&mut self) -> Option<Ecma48Run<'a>> {
        let bytes = self.text.as_bytes();
        if self.pos >= bytes.len() {
            return None;
        }
        self.run_start = self.pos;

        let b = bytes[self.pos];
        if b == 0x1b {
            return Some(self.scan_escape());
        }
        if b < 0x20 || b == 0x7f {
            self.pos += 1;
            return Some(Ecma48Run::C0(b));
        }

        let mut end = self.pos + 1;
        while end < bytes.len() {
            let c = bytes[end];
            if c == 0x1b || c < 0x20 || c == 0x7f {
                break;
            }
            end += 1;
        }
        let run = &self.text[self.pos..end];
        self.pos = end;
        Some(Ecma48Run::Chars(run))
    }

    fn scan_escape(&mut self) -> Ecma48Run<'a> {
        let bytes = self.text.as_bytes();
        let start = self.pos;
        debug_assert_eq!(bytes[start], 0x1b);

        let Some(&kind) = bytes.get(start + 1) else {
            self.pos = bytes.len();
            return Ecma48Run::Esc(&self.text[start..]);
        };

        match kind {
            b'[' => {
                let mut i = start + 2;
                while i < bytes.len() {
                    let c = bytes[i];
                    if (0x40..=0x7e).contains(&c) {
                        self.pos = i + 1;
                        return Ecma48Run::Csi {
                            final_byte: c,
                            raw: &self.text[start..self.pos],
                        };
                    }
                    i += 1;
                }
                // Unterminated; consume the rest.
                self.pos = bytes.len();
                Ecma48Run::Esc(&self.text[start..])
            }
            b']' | b'_' | b'P' => {
                let end = self.scan_string_terminator(start + 2);
                let raw = &self.text[start..end];
                self.pos = end;
                match kind {
                    b']' => Ecma48Run::Osc(raw),
                    b'_' => Ecma48Run::Apc(raw),
                    _ => Ecma48Run::Dcs(raw),
                }
            }
            b'O' => {
                // SS3: ESC O plus one byte.
                let end = (start + 3).min(bytes.len());
                self.pos = end;
                Ecma48Run::Esc(&self.text[start..end])
            }
            _ => {
                let end = start + 1 + self.char_len_at(start + 1);
                self.pos = end;
                Ecma48Run::Esc(&self.text[start..end])
            }
        }
    }

    /// Scan past a BEL or ST (`ESC \`) terminator, or to end of input.
    fn scan_string_terminator(&self, from: usize) -> usize {
        let bytes = self.text.as_bytes();
        let mut i = from;
        while i < bytes.len() {
            match bytes[i] {
                0x07 => return i + 1,
                0x1b if bytes.get(i + 1) == Some(&b'\\') => return i + 2,
                _ => i += 1,
            }
        }
        bytes.len()
    }

    fn char_len_at(&self, index: usize) -> usize {
        self.text[index..].chars().next().map_or(0, char::len_utf8)
    }
}

/// Whether a prompt contains escape or control sequences the renderer cannot
/// reconcile with its own cursor bookkeeping.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PromptProblems {
    /// The prompt will definitely break incremental redisplay.
    pub problem: bool,
    /// The prompt may break it (cursor motion codes that are sometimes
    /// self-cancelling).
    pub maybe: bool,
}

/// Classifies escape codes in a prompt. Cursor motion (CUU/CUD/CUF/CUB,
/// CNL/CPL, CHA, CUP, VPA, HVP, save/restore) is a maybe-problem; scrolling
/// is always a problem; erase/insert/delete codes and C0 BS/HT/FF are a
/// problem only on the last prompt line, where the input row begins.
pub fn prompt_problem_codes(prompt: &str) -> PromptProblems {
    let mut out = PromptProblems::default();
    let last_line = prompt.rfind('\n').map_or(0, |i| i + 1);

    let mut scanner = Ecma48Scanner::new(prompt);
    while let Some(run) = scanner.next_run() {
        match run {
            Ecma48Run::Csi { final_byte, .. } => match final_byte {
                b'A'..=b'H' | b'd' | b'f' | b's' | b'u' => out.maybe = true,
                b'S' | b'T' => out.problem = true,
                b'J' | b'K' | b'L' | b'M' | b'P' | b'X' => {
                    if scanner.run_start() >= last_line {
                        out.problem = true;
                    }
                }
                _ => {}
            },
            Ecma48Run::C0(code) => {
                if matches!(code, 0x08 | 0x09 | 0x0c) && scanner.run_start() >= last_line {
                    out.problem = true;
                }
            }
            _ => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{prompt_problem_codes, Ecma48Run, Ecma48Scanner};

    fn runs(text: &str) -> Vec<Ecma48Run<'_>> {
        let mut scanner = Ecma48Scanner::new(text);
        let mut out = Vec::new();
        while let Some(run) = scanner.next_run() {
            out.push(run);
        }
        out
    }

    #[test]
    fn splits_chars_and_csi() {
        assert_eq!(
            runs("ab\x1b[31mcd"),
            vec![
                Ecma48Run::Chars("ab"),
                Ecma48Run::Csi {
                    final_byte: b'm',
                    raw: "\x1b[31m"
                },
                Ecma48Run::Chars("cd"),
            ]
        );
    }

    #[test]
    fn osc_terminated_by_bel_or_st() {
        assert_eq!(
            runs("\x1b]0;title\x07x"),
            vec![Ecma48Run::Osc("\x1b]0;title\x07"), Ecma48Run::Chars("x")]
        );
        assert_eq!(
            runs("\x1b]8;;u\x1b\\y"),
            vec![Ecma48Run::Osc("\x1b]8;;u\x1b\\"), Ecma48Run::Chars("y")]
        );
    }

    #[test]
    fn c0_bytes_are_individual_runs() {
        assert_eq!(
            runs("a\tb"),
            vec![
                Ecma48Run::Chars("a"),
                Ecma48Run::C0(0x09),
                Ecma48Run::Chars("b"),
            ]
        );
    }

    #[test]
    fn unterminated_csi_consumes_rest() {
        assert_eq!(runs("\x1b[3"), vec![Ecma48Run::Esc("\x1b[3")]);
    }

    #[test]
    fn sgr_only_prompt_is_clean() {
        let p = prompt_problem_codes("\x1b[32m$\x1b[m ");
        assert!(!p.problem);
        assert!(!p.maybe);
    }

    #[test]
    fn cursor_motion_is_maybe_problem() {
        let p = prompt_problem_codes("\x1b[2A$ ");
        assert!(!p.problem);
        assert!(p.maybe);
    }

    #[test]
    fn scroll_codes_are_always_problem() {
        assert!(prompt_problem_codes("top\n\x1b[2S$ ").problem);
    }

    #[test]
    fn erase_codes_matter_only_on_last_line() {
        assert!(!prompt_problem_codes("\x1b[K\n$ ").problem);
        assert!(prompt_problem_codes("x\n\x1b[K$ ").problem);
    }

    #[test]
    fn c0_problems_only_on_last_line() {
        assert!(!prompt_problem_codes("a\tb\n$ ").problem);
        assert!(prompt_problem_codes("a\n\tb$ ").problem);
    }
}
