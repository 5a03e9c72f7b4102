//! HTML to plain text for chat prompts.
//!
//! Note bodies are stored as editor HTML. The model only needs the words and
//! the rough block structure, so markup is reduced to line breaks and list
//! bullets before a body goes into a prompt.

use once_cell::sync::Lazy;
use regex::Regex;

static HIDDEN_BLOCKS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>|<style\b[^>]*>.*?</style\s*>|<!--.*?-->")
        .expect("hidden block pattern")
});

static LINE_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<br\s*/?>").expect("line break pattern"));

static LIST_ITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<li\b[^>]*>").expect("list item pattern"));

static BLOCK_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)</?(?:p|div|h[1-6]|ul|ol|blockquote|pre|table|tr|section|article|header|footer|hr)\b[^>]*>",
    )
    .expect("block tag pattern")
});

static ANY_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("tag pattern"));

static BLANK_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").expect("blank run pattern"));

/// Reduce an HTML fragment to readable plain text.
///
/// Script and style blocks are dropped, block elements and `<br>` become
/// line breaks, list items are prefixed with `* `, remaining tags are
/// removed and the common entities decoded. Input without markup comes back
/// trimmed but otherwise unchanged.
pub fn html_to_text(html: &str) -> String {
    let text = HIDDEN_BLOCKS.replace_all(html, "");
    let text = LINE_BREAK.replace_all(&text, "\n");
    let text = LIST_ITEM.replace_all(&text, "\n* ");
    let text = BLOCK_TAG.replace_all(&text, "\n");
    let text = ANY_TAG.replace_all(&text, "");
    let text = decode_entities(&text);

    let lines: Vec<&str> = text.lines().map(str::trim_end).collect();
    let joined = lines.join("\n");
    BLANK_RUNS.replace_all(&joined, "\n\n").trim().to_string()
}

// `&amp;` goes last so an escaped entity like `&amp;lt;` stays literal.
fn decode_entities(raw: &str) -> String {
    raw.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_passes_through() {
        assert_eq!(html_to_text("buy milk"), "buy milk");
        assert_eq!(html_to_text(""), "");
    }

    #[test]
    fn test_paragraphs_become_separate_lines() {
        let text = html_to_text("<h1>Groceries</h1><p>milk</p><p>eggs</p>");
        assert_eq!(text, "Groceries\n\nmilk\n\neggs");
    }

    #[test]
    fn test_line_breaks() {
        assert_eq!(html_to_text("one<br>two<br/>three<BR />"), "one\ntwo\nthree");
    }

    #[test]
    fn test_list_items_get_bullets() {
        let text = html_to_text("<ul><li>milk</li><li>eggs</li></ul>");
        assert_eq!(text, "* milk\n* eggs");
    }

    #[test]
    fn test_inline_tags_are_removed() {
        let text = html_to_text("<p>call <strong>Ana</strong> at <em>noon</em></p>");
        assert_eq!(text, "call Ana at noon");
    }

    #[test]
    fn test_script_and_style_dropped() {
        let text = html_to_text(
            "<style>p { color: red }</style><p>visible</p><script>alert('x')</script><!-- hidden -->",
        );
        assert_eq!(text, "visible");
    }

    #[test]
    fn test_entities_decoded() {
        assert_eq!(
            html_to_text("<p>salt &amp; pepper &lt;3 &quot;fresh&quot;&nbsp;ok</p>"),
            "salt & pepper <3 \"fresh\" ok"
        );
        assert_eq!(html_to_text("&amp;lt;"), "&lt;");
    }

    #[test]
    fn test_blank_runs_collapsed() {
        let text = html_to_text("<div><p>a</p></div><div></div><div><p>b</p></div>");
        assert_eq!(text, "a\n\nb");
    }
}
