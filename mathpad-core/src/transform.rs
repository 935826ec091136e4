//! Delimiter transformer: raw text to canonical math markup
//!
//! The transform is shallow: it escapes HTML-significant characters,
//! rewrites math spans into the `\( \)` and `\[ \]` forms the typesetting
//! engine understands, and splits the rest into paragraphs. Unbalanced or
//! empty spans are emitted literally.

use crate::config::DelimiterConfig;
use crate::content::{EditEvent, ProcessedContent};

const INLINE_OPEN: &str = "\\(";
const INLINE_CLOSE: &str = "\\)";
const DISPLAY_OPEN: &str = "\\[";
const DISPLAY_CLOSE: &str = "\\]";

/// A delimiter pair, already escaped so it can be matched against escaped text
#[derive(Debug, Clone)]
struct Delimiters {
    open: String,
    close: String,
}

impl Delimiters {
    /// Returns None for pairs with an empty side, which disables the rewrite
    fn from_pair(pair: &[String; 2]) -> Option<Self> {
        let [open, close] = pair;
        if open.is_empty() || close.is_empty() {
            return None;
        }
        Some(Self {
            open: escape_html(open),
            close: escape_html(close),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SpanKind {
    Inline,
    Display,
}

/// Converts raw edit text into display-ready markup
#[derive(Debug, Clone)]
pub struct Transformer {
    inline: Option<Delimiters>,
    display: Option<Delimiters>,
}

impl Transformer {
    /// Create a transformer bound to a snapshot of the delimiter configuration
    pub fn new(config: &DelimiterConfig) -> Self {
        let inline = Delimiters::from_pair(&config.inline);
        let display = Delimiters::from_pair(&config.display);
        if inline.is_none() {
            log::warn!("Inline math delimiters are empty, inline math will not be rewritten");
        }
        if display.is_none() {
            log::warn!("Display math delimiters are empty, display math will not be rewritten");
        }
        Self { inline, display }
    }

    /// Transform one edit event
    pub fn transform(&self, event: &EditEvent) -> ProcessedContent {
        ProcessedContent::new(self.transform_str(event.as_str()))
    }

    /// Transform raw text
    pub fn transform_str(&self, raw: &str) -> String {
        let normalized = raw.replace("\r\n", "\n");
        let escaped = escape_html(&normalized);
        let math = self.rewrite_math(&escaped);
        wrap_paragraphs(&math)
    }

    /// Rewrite math spans in a single left-to-right pass.
    ///
    /// At every position the display opener is tried before the inline one,
    /// so a display span can never be read as two adjacent inline spans.
    /// Closers are only searched for up to the end of the current paragraph.
    fn rewrite_math(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len() + text.len() / 8);
        let mut pos = 0;
        let mut para_end = paragraph_end(text, 0);
        // Openers before these offsets have no closer left in their paragraph
        let mut display_blocked = 0;
        let mut inline_blocked = 0;

        while let Some(ch) = text[pos..].chars().next() {
            if pos >= para_end {
                para_end = paragraph_end(text, pos);
            }

            let mut matched = None;
            if let Some(delims) = self.display.as_ref().filter(|_| pos >= display_blocked) {
                match match_span(text, pos, para_end, delims) {
                    SpanMatch::Span(end, body) => matched = Some((end, SpanKind::Display, body)),
                    SpanMatch::NoCloser => display_blocked = para_end,
                    SpanMatch::NoSpan => {}
                }
            }
            if matched.is_none() {
                if let Some(delims) = self.inline.as_ref().filter(|_| pos >= inline_blocked) {
                    match match_span(text, pos, para_end, delims) {
                        SpanMatch::Span(end, body) => matched = Some((end, SpanKind::Inline, body)),
                        SpanMatch::NoCloser => inline_blocked = para_end,
                        SpanMatch::NoSpan => {}
                    }
                }
            }

            match matched {
                Some((end, kind, body)) => {
                    let (open, close) = match kind {
                        SpanKind::Inline => (INLINE_OPEN, INLINE_CLOSE),
                        SpanKind::Display => (DISPLAY_OPEN, DISPLAY_CLOSE),
                    };
                    out.push_str(open);
                    out.push_str(body);
                    out.push_str(close);
                    pos = end;
                }
                None => {
                    out.push(ch);
                    pos += ch.len_utf8();
                }
            }
        }

        out
    }
}

enum SpanMatch<'a> {
    /// Offset just past the closer, and the span body
    Span(usize, &'a str),
    /// Opener present but no closer before the paragraph ends
    NoCloser,
    NoSpan,
}

/// Offset of the next blank line (`\n\n`) at or after `from`, or the text length
fn paragraph_end(text: &str, from: usize) -> usize {
    text[from..]
        .find("\n\n")
        .map_or(text.len(), |i| from + i)
}

fn match_span<'a>(text: &'a str, pos: usize, para_end: usize, delims: &Delimiters) -> SpanMatch<'a> {
    if !text[pos..].starts_with(delims.open.as_str()) {
        return SpanMatch::NoSpan;
    }
    let body_start = pos + delims.open.len();
    // Spans never cross a paragraph boundary
    if body_start > para_end {
        return SpanMatch::NoSpan;
    }
    match text[body_start..para_end].find(delims.close.as_str()) {
        None => SpanMatch::NoCloser,
        Some(0) => SpanMatch::NoSpan,
        Some(len) => SpanMatch::Span(
            body_start + len + delims.close.len(),
            &text[body_start..body_start + len],
        ),
    }
}

/// Escape `&`, `<` and `>`
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Split on runs of two or more newlines and wrap each paragraph in `<p>`
fn wrap_paragraphs(text: &str) -> String {
    split_paragraphs(text)
        .into_iter()
        .map(|para| format!("<p>{}</p>", para.replace('\n', "<br>")))
        .collect::<Vec<_>>()
        .join("\n")
}

fn split_paragraphs(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut parts = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'\n' && bytes.get(i + 1) == Some(&b'\n') {
            parts.push(&text[start..i]);
            while i < bytes.len() && bytes[i] == b'\n' {
                i += 1;
            }
            start = i;
        } else {
            i += 1;
        }
    }
    parts.push(&text[start..]);

    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transformer() -> Transformer {
        Transformer::new(&DelimiterConfig::default())
    }

    fn with_delimiters(inline: [&str; 2], display: [&str; 2]) -> Transformer {
        Transformer::new(&DelimiterConfig {
            inline: inline.map(String::from),
            display: display.map(String::from),
        })
    }

    #[test]
    fn test_inline_math() {
        let out = transformer().transform_str("Energy: $E=mc^2$");
        assert_eq!(out, "<p>Energy: \\(E=mc^2\\)</p>");
        assert!(!out.contains('$'));
    }

    #[test]
    fn test_display_math_not_split_into_inline() {
        let out = transformer().transform_str("$$x^2$$");
        assert_eq!(out, "<p>\\[x^2\\]</p>");
    }

    #[test]
    fn test_mixed_inline_and_display() {
        let out = transformer().transform_str("where $a$ and $$\\sum_i b_i$$ hold");
        assert_eq!(out, "<p>where \\(a\\) and \\[\\sum_i b_i\\] hold</p>");
    }

    #[test]
    fn test_unbalanced_delimiter_passes_through() {
        let t = transformer();
        assert_eq!(t.transform_str("costs $5"), "<p>costs $5</p>");
        assert_eq!(t.transform_str("$$ open"), "<p>$$ open</p>");
        assert_eq!(t.transform_str("$$"), "<p>$$</p>");
    }

    #[test]
    fn test_unclosed_display_falls_back_to_inline() {
        let out = transformer().transform_str("$$a$ b$");
        assert_eq!(out, "<p>$\\(a\\) b$</p>");
    }

    #[test]
    fn test_span_does_not_cross_paragraphs() {
        let out = transformer().transform_str("a $b\n\nc$ d");
        assert_eq!(out, "<p>a $b</p>\n<p>c$ d</p>");
    }

    #[test]
    fn test_span_may_cross_single_newline() {
        let out = transformer().transform_str("$$a\n+b$$");
        assert_eq!(out, "<p>\\[a<br>+b\\]</p>");
    }

    #[test]
    fn test_html_escaped_before_math() {
        let out = transformer().transform_str("if $a < b$ & <b>");
        assert_eq!(out, "<p>if \\(a &lt; b\\) &amp; &lt;b&gt;</p>");
    }

    #[test]
    fn test_escaped_delimiters_match_escaped_text() {
        let t = with_delimiters(["<m>", "</m>"], ["$$", "$$"]);
        let out = t.transform_str("x <m>y</m>");
        assert_eq!(out, "<p>x \\(y\\)</p>");
    }

    #[test]
    fn test_custom_delimiters() {
        let t = with_delimiters(["@", "@"], ["@@", "@@"]);
        assert_eq!(
            t.transform_str("@a@ then @@b@@ and $c$"),
            "<p>\\(a\\) then \\[b\\] and $c$</p>"
        );
    }

    #[test]
    fn test_empty_delimiters_disable_rewrite() {
        let t = with_delimiters(["", ""], ["", "$$"]);
        assert_eq!(t.transform_str("$a$ $$b$$"), "<p>$a$ $$b$$</p>");
    }

    #[test]
    fn test_paragraphs_and_line_breaks() {
        let out = transformer().transform_str("one\ntwo\n\n\nthree");
        assert_eq!(out, "<p>one<br>two</p>\n<p>three</p>");
    }

    #[test]
    fn test_crlf_normalized() {
        let out = transformer().transform_str("one\r\ntwo\r\n\r\nthree");
        assert_eq!(out, "<p>one<br>two</p>\n<p>three</p>");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(transformer().transform_str(""), "<p></p>");
    }

    #[test]
    fn test_multibyte_text() {
        let out = transformer().transform_str("π ≈ $3.14$ – ok");
        assert_eq!(out, "<p>π ≈ \\(3.14\\) – ok</p>");
    }

    #[test]
    fn test_transform_is_deterministic() {
        let t = transformer();
        let event = EditEvent::new("Let $x$ be\n\n$$\\int_0^1 x\\,dx$$ & more <tags>");
        assert_eq!(t.transform(&event), t.transform(&event));
        assert_eq!(
            t.transform(&event),
            transformer().transform(&event)
        );
    }

    #[test]
    fn test_closer_past_blank_line_stays_linear() {
        let t = with_delimiters(["[[", "]]"], ["$$", "$$"]);
        let raw = format!("{}\n\n]]", "[[".repeat(40_000));

        let started = std::time::Instant::now();
        let out = t.transform_str(&raw);
        assert!(started.elapsed() < std::time::Duration::from_secs(5));
        assert_eq!(out, format!("<p>{}</p>\n<p>]]</p>", "[[".repeat(40_000)));
    }

    #[test]
    fn test_blocked_paragraph_does_not_block_next() {
        let t = with_delimiters(["[[", "]]"], ["$$", "$$"]);
        let out = t.transform_str("[[a\n\n[[b]]");
        assert_eq!(out, "<p>[[a</p>\n<p>\\(b\\)</p>");
    }

    #[test]
    fn test_many_unclosed_openers() {
        let t = with_delimiters(["[[", "]]"], ["$$", "$$"]);
        let raw = "[[".repeat(10_000);
        let out = t.transform_str(&raw);
        assert_eq!(out, format!("<p>{}</p>", raw));
    }
}
