use std::borrow::Cow;
use std::sync::OnceLock;

use regex::Regex;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Ellipsis appended by both excerpting and width truncation.
const ELLIPSIS: &str = "...";
const ELLIPSIS_WIDTH: usize = 3;

/// Default excerpt length for summaries.
pub const DEFAULT_EXCERPT_LENGTH: usize = 150;

fn tag_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]*>").expect("tag pattern is valid"))
}

fn whitespace_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("whitespace pattern is valid"))
}

fn img_src_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)<img[^>]+src=(?:"([^">]+)"|'([^'>]+)')"#)
            .expect("img pattern is valid")
    })
}

fn terminal_escape_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // CSI sequences, OSC sequences (BEL or ST terminated), then any bare ESC
    RE.get_or_init(|| {
        Regex::new(r"\x1b\[[0-?]*[ -/]*[@-~]|\x1b\][^\x07\x1b]*(?:\x07|\x1b\\)?|\x1b")
            .expect("escape pattern is valid")
    })
}

/// Turns an HTML fragment into a single line of plain text.
///
/// Every tag is replaced by a space, whitespace runs collapse to one space and
/// the result is trimmed. A lone newline, tab or NBSP also counts as a run, so
/// the output is always one line; a `\s{2,}` cleanup would keep those.
/// Entities are left alone; the XML layer has already decoded the ones that
/// were escaped in the feed.
///
/// ```
/// use feedlens::util::clean_description;
///
/// assert_eq!(clean_description("<p>Hello <b>World</b></p>"), "Hello World");
/// ```
pub fn clean_description(html: &str) -> String {
    let without_tags = tag_pattern().replace_all(html, " ");
    whitespace_pattern()
        .replace_all(&without_tags, " ")
        .trim()
        .to_string()
}

/// Returns the `src` of the first `<img>` tag in `html`, if any.
///
/// Each quote style only ends at its own closing quote, so a double-quoted
/// URL may contain an apostrophe.
pub fn extract_image_url(html: &str) -> Option<String> {
    img_src_pattern()
        .captures(html)
        .and_then(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| m.as_str().to_string())
}

/// Shortens `text` to at most `max_len` characters at a word boundary.
///
/// Text that already fits is returned borrowed. Otherwise the cut happens at
/// the last space whose character index is `<= max_len` and `"..."` is
/// appended. Without such a space the text is hard-cut at `max_len`.
///
/// Lengths are counted in Unicode scalar values, so multi-byte text is never
/// split inside a character.
///
/// ```
/// use feedlens::util::create_excerpt;
///
/// assert_eq!(create_excerpt("hello world foo", 10), "hello...");
/// assert_eq!(create_excerpt("short", 10), "short");
/// assert_eq!(create_excerpt("abcdefghijkl", 5), "abcde...");
/// ```
pub fn create_excerpt(text: &str, max_len: usize) -> Cow<'_, str> {
    let mut chars = text.char_indices();
    // Byte offset of the first character past max_len, if the text is longer
    let Some((cut, _)) = chars.nth(max_len) else {
        return Cow::Borrowed(text);
    };

    // The search window includes index max_len itself
    let window_end = chars.next().map_or(text.len(), |(i, _)| i);
    let boundary = text[..window_end].rfind(' ');

    let end = boundary.unwrap_or(cut);
    Cow::Owned(format!("{}{}", &text[..end], ELLIPSIS))
}

/// Calculates the display width of a string in terminal columns.
pub fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

/// Fits a single line into `max_width` terminal columns.
///
/// Wide characters (CJK, emoji) count as two columns. When the line does not
/// fit, it is cut so that the text plus `"..."` stays within the budget. For
/// widths too narrow to hold anything next to the ellipsis the line is cut
/// without one.
pub fn truncate_to_width(s: &str, max_width: usize) -> Cow<'_, str> {
    if display_width(s) <= max_width {
        return Cow::Borrowed(s);
    }

    let with_ellipsis = max_width > ELLIPSIS_WIDTH;
    let budget = if with_ellipsis {
        max_width - ELLIPSIS_WIDTH
    } else {
        max_width
    };

    let mut used = 0;
    let mut end = 0;
    for (idx, c) in s.char_indices() {
        let w = UnicodeWidthChar::width(c).unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        end = idx + c.len_utf8();
    }

    if with_ellipsis {
        Cow::Owned(format!("{}{}", &s[..end], ELLIPSIS))
    } else {
        Cow::Owned(s[..end].to_string())
    }
}

/// SEC-001: Removes terminal escape sequences and control characters.
///
/// Feed text is printed straight to the terminal, so ANSI CSI/OSC sequences
/// and C0 controls other than tab, newline and carriage return are dropped.
/// Clean input is returned borrowed.
pub fn strip_control_chars(s: &str) -> Cow<'_, str> {
    let is_stripped = |c: char| c == '\x7f' || (c.is_ascii_control() && !matches!(c, '\t' | '\n' | '\r'));

    if !s.chars().any(is_stripped) {
        return Cow::Borrowed(s);
    }

    let without_escapes = terminal_escape_pattern().replace_all(s, "");
    Cow::Owned(without_escapes.chars().filter(|&c| !is_stripped(c)).collect())
}
