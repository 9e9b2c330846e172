//! Display-width classification.
//!
//! `WidthIter` is the character walk used by layout and measurement: it
//! reports each character's byte span and display column width, flagging
//! control characters with a negative width so callers can render them as a
//! two-column `^X` pair.

use emojis::get as emoji_get;
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthChar;

use super::ecma48::{Ecma48Run, Ecma48Scanner};

/// Signed display width of one character. Control characters (C0, DEL, C1)
/// report `-1`; everything else reports its column width (0 for combining
/// marks).
pub fn char_width_signed(ch: char) -> i32 {
    if ch.is_control() {
        return -1;
    }
    UnicodeWidthChar::width(ch).map(|w| w as i32).unwrap_or(0)
}

/// The two-column caret form of a control character (`^A`, `^?`, ...).
pub fn ctrl_display(ch: char) -> [char; 2] {
    let code = ch as u32;
    let tail = if code < 0x20 {
        char::from_u32(code + 0x40).unwrap_or('?')
    } else {
        '?'
    };
    ['^', tail]
}

/// Character iterator reporting byte spans and display widths.
#[derive(Debug)]
pub struct WidthIter<'a> {
    text: &'a str,
    pos: usize,
    start: usize,
    width: i32,
}

impl<'a> WidthIter<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            pos: 0,
            start: 0,
            width: 0,
        }
    }

    /// Advance to the next character, or `None` at end of input.
    pub fn next(&mut self) -> Option<char> {
        self.start = self.pos;
        let ch = self.text[self.pos..].chars().next()?;
        self.pos += ch.len_utf8();
        self.width = char_width_signed(ch);
        Some(ch)
    }

    /// Whether any input remains past the current position.
    pub fn more(&self) -> bool {
        self.pos < self.text.len()
    }

    /// Byte offset of the current character.
    pub fn char_start(&self) -> usize {
        self.start
    }

    /// Byte offset just past the current character.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Byte length of the current character.
    pub fn char_len(&self) -> usize {
        self.pos - self.start
    }

    /// Signed width; negative for control characters.
    pub fn width_signed(&self) -> i32 {
        self.width
    }

    /// Width with a control character counted as one column.
    pub fn width_one_ctrl(&self) -> usize {
        if self.width < 0 {
            1
        } else {
            self.width as usize
        }
    }

    /// Width with a control character counted as the full `^X` pair.
    pub fn width_two_ctrl(&self) -> usize {
        if self.width < 0 {
            2
        } else {
            self.width as usize
        }
    }
}

/// Column count of already-expanded row text. Row cells hold the caret form
/// of control characters, so a stray control byte counts one column.
pub fn str_columns(text: &str) -> usize {
    let mut iter = WidthIter::new(text);
    let mut cols = 0;
    while iter.next().is_some() {
        cols += iter.width_one_ctrl();
    }
    cols
}

/// Column count of raw buffer text with control characters expanded to `^X`.
pub fn str_columns_expand_ctrl(text: &str) -> usize {
    let mut iter = WidthIter::new(text);
    let mut cols = 0;
    while iter.next().is_some() {
        cols += iter.width_two_ctrl();
    }
    cols
}

/// Byte offset of the character immediately before `index`.
pub fn prev_char_start(text: &str, index: usize) -> usize {
    text[..index]
        .char_indices()
        .next_back()
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// Byte offset of the previous glyph: steps over zero-width characters so a
/// combining sequence stays attached to its base character.
pub fn prev_glyph_start(text: &str, index: usize) -> usize {
    let mut i = index;
    while i > 0 {
        let start = prev_char_start(text, i);
        let ch = match text[start..i].chars().next() {
            Some(ch) => ch,
            None => return start,
        };
        i = start;
        if char_width_signed(ch) != 0 {
            break;
        }
    }
    i
}

pub fn grapheme_width(grapheme: &str) -> usize {
    if grapheme.is_empty() {
        return 0;
    }

    if emoji_get(grapheme).is_some() {
        return 2;
    }

    let mut width = 0;
    for ch in grapheme.chars() {
        width += UnicodeWidthChar::width(ch).unwrap_or(0);
    }
    width
}

/// Visible column width of text that may contain escape sequences, used for
/// right-prompt and comment-row measurement. Escape sequences and control
/// codes measure zero.
pub fn visible_width(input: &str) -> usize {
    if input.is_empty() {
        return 0;
    }

    let mut clean = String::with_capacity(input.len());
    let mut scanner = Ecma48Scanner::new(input);
    while let Some(run) = scanner.next_run() {
        if let Ecma48Run::Chars(text) = run {
            clean.push_str(text);
        }
    }

    let mut width = 0;
    for grapheme in clean.graphemes(true) {
        width += grapheme_width(grapheme);
    }
    width
}

#[cfg(test)]
mod tests {
    use super::{
        char_width_signed, ctrl_display, prev_glyph_start, str_columns, str_columns_expand_ctrl,
        visible_width, WidthIter,
    };

    #[test]
    fn control_characters_report_negative_width() {
        assert_eq!(char_width_signed('\t'), -1);
        assert_eq!(char_width_signed('\x01'), -1);
        assert_eq!(char_width_signed('\u{7f}'), -1);
        assert_eq!(char_width_signed('a'), 1);
        assert_eq!(char_width_signed('你'), 2);
    }

    #[test]
    fn caret_form_of_control_characters() {
        assert_eq!(ctrl_display('\x01'), ['^', 'A']);
        assert_eq!(ctrl_display('\t'), ['^', 'I']);
        assert_eq!(ctrl_display('\u{7f}'), ['^', '?']);
    }

    #[test]
    fn width_iter_reports_spans_and_widths() {
        let mut iter = WidthIter::new("a你\x01");
        assert_eq!(iter.next(), Some('a'));
        assert_eq!((iter.char_start(), iter.pos(), iter.width_signed()), (0, 1, 1));
        assert_eq!(iter.next(), Some('你'));
        assert_eq!((iter.char_start(), iter.pos(), iter.width_signed()), (1, 4, 2));
        assert_eq!(iter.next(), Some('\x01'));
        assert_eq!(iter.width_one_ctrl(), 1);
        assert_eq!(iter.width_two_ctrl(), 2);
        assert_eq!(iter.next(), None);
    }

    #[test]
    fn column_counts_expand_ctrl() {
        assert_eq!(str_columns("abc"), 3);
        assert_eq!(str_columns_expand_ctrl("a\x01b"), 4);
    }

    #[test]
    fn prev_glyph_skips_combining_marks() {
        let text = "ae\u{301}"; // 'e' plus combining acute
        assert_eq!(prev_glyph_start(text, text.len()), 1);
    }

    #[test]
    fn escapes_ignored_in_visible_width() {
        assert_eq!(visible_width("hi\x1b[31m!!\x1b[0m"), 4);
        assert_eq!(visible_width("\x1b]8;;https://example.com\x07link\x1b]8;;\x07"), 4);
    }

    #[test]
    fn rgi_emoji_width_is_two() {
        assert_eq!(visible_width("😀"), 2);
    }
}
