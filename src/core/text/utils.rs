//! Small text helpers shared by the comment row and debug output.

use unicode_segmentation::UnicodeSegmentation;

use super::ecma48::{Ecma48Run, Ecma48Scanner};
use super::width::{ctrl_display, grapheme_width, visible_width, WidthIter};

/// Truncate `input` to at most `max_width` visible columns, appending
/// `ellipsis` when anything was cut. Escape sequences pass through and do not
/// count toward the width; raw control bytes are dropped.
pub fn ellipsify(input: &str, max_width: usize, ellipsis: &str) -> String {
    if visible_width(input) <= max_width {
        return input.to_string();
    }

    let keep = max_width.saturating_sub(visible_width(ellipsis));
    let mut out = String::with_capacity(input.len());
    let mut used = 0;

    let mut scanner = Ecma48Scanner::new(input);
    while let Some(run) = scanner.next_run() {
        match run {
            Ecma48Run::Chars(text) => {
                for grapheme in text.graphemes(true) {
                    let w = grapheme_width(grapheme);
                    if used + w > keep {
                        out.push_str(ellipsis);
                        return out;
                    }
                    used += w;
                    out.push_str(grapheme);
                }
            }
            Ecma48Run::C0(_) => {}
            Ecma48Run::Csi { raw, .. }
            | Ecma48Run::Osc(raw)
            | Ecma48Run::Apc(raw)
            | Ecma48Run::Dcs(raw)
            | Ecma48Run::Esc(raw) => out.push_str(raw),
        }
    }

    out.push_str(ellipsis);
    out
}

/// Append `text` to `out` with control characters expanded to their `^X`
/// caret form.
pub fn expand_ctrl_into(out: &mut String, text: &str) {
    let mut iter = WidthIter::new(text);
    while let Some(ch) = iter.next() {
        if iter.width_signed() < 0 {
            let [lead, tail] = ctrl_display(ch);
            out.push(lead);
            out.push(tail);
        } else {
            out.push(ch);
        }
    }
}
