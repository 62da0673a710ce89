use tabgrid_engine::Alignment;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Display width of a string, accounting for CJK double-width, emoji, etc.
pub(crate) fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

/// Truncate `s` to at most `width` display columns, ending in ".." when cut.
pub(crate) fn truncate_display(s: &str, width: usize) -> String {
    if display_width(s) <= width {
        return s.to_string();
    }
    if width < 3 {
        return s
            .chars()
            .next()
            .filter(|ch| UnicodeWidthChar::width(*ch).unwrap_or(0) <= width)
            .map(String::from)
            .unwrap_or_default();
    }

    let budget = width - 2;
    let mut used = 0;
    let mut end = 0;
    for (i, ch) in s.char_indices() {
        let cw = UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + cw > budget {
            break;
        }
        used += cw;
        end = i + ch.len_utf8();
    }
    format!("{}..", &s[..end])
}

/// Fit `s` into exactly `width` display columns, padding on the side the
/// alignment leaves open.
pub(crate) fn fit(s: &str, width: usize, alignment: Alignment) -> String {
    let s = truncate_display(s, width);
    let slack = width.saturating_sub(display_width(&s));
    match alignment {
        Alignment::Left => format!("{}{}", s, " ".repeat(slack)),
        Alignment::Right => format!("{}{}", " ".repeat(slack), s),
        Alignment::Center => {
            let left = slack / 2;
            format!("{}{}{}", " ".repeat(left), s, " ".repeat(slack - left))
        }
    }
}
