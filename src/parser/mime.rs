//! MIME body resolution: one raw email in, clean display text out.
//!
//! Capture payloads embed anything from well-formed multipart MIME to bare
//! text with stray headers. Resolution never fails: every fallback ends at
//! the raw source with line endings normalized.

use lazy_static::lazy_static;
use mail_parser::{Message, MessageParser, PartType};
use regex::Regex;

/// Outcome of body resolution.
#[derive(Debug, Clone)]
pub struct ResolvedBody {
    /// Clean display text.
    pub text: String,
    /// Whether any `text/html` part contributed to `text`.
    pub was_html: bool,
}

/// Resolve a raw email (headers + MIME body) into display text.
///
/// Priority order:
/// 1. parse as MIME; on failure return the raw text with CRLF→LF;
/// 2. collect every `text/plain` part verbatim and every `text/html` part
///    through [`strip_html`], in part-encounter order, joined by newlines;
/// 3. a single non-text body passes through unstripped;
/// 4. an empty result falls back to the raw text with CRLF→LF.
pub fn resolve_body(raw: &str) -> ResolvedBody {
    let Some(msg) = MessageParser::default().parse(raw.as_bytes()) else {
        return ResolvedBody {
            text: normalize_line_endings(raw),
            was_html: false,
        };
    };

    let mut parts: Vec<String> = Vec::new();
    let mut was_html = false;
    collect_text_parts(&msg, &mut parts, &mut was_html);

    if parts.is_empty() {
        // Single non-text body: pass through unstripped.
        if let Some(PartType::Binary(bytes) | PartType::InlineBinary(bytes)) =
            msg.parts.first().map(|p| &p.body)
        {
            parts.push(String::from_utf8_lossy(bytes).into_owned());
        }
    }

    let text = parts
        .iter()
        .filter(|p| !p.is_empty())
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join("\n");
    let text = text.trim().to_string();

    if text.is_empty() {
        ResolvedBody {
            text: normalize_line_endings(raw),
            was_html: false,
        }
    } else {
        ResolvedBody { text, was_html }
    }
}

/// Walk message parts in encounter order, descending into nested
/// message/rfc822 parts.
fn collect_text_parts(msg: &Message<'_>, parts: &mut Vec<String>, was_html: &mut bool) {
    for part in &msg.parts {
        match &part.body {
            PartType::Text(text) => parts.push(text.to_string()),
            PartType::Html(html) => {
                parts.push(strip_html(html));
                *was_html = true;
            }
            PartType::Message(nested) => collect_text_parts(nested, parts, was_html),
            _ => {}
        }
    }
}

/// Normalize CRLF to LF.
pub fn normalize_line_endings(raw: &str) -> String {
    raw.replace("\r\n", "\n")
}

lazy_static! {
    static ref SCRIPT_RE: Regex = Regex::new(r"(?is)<script[^>]*>.*?</script>").unwrap();
    static ref STYLE_RE: Regex = Regex::new(r"(?is)<style[^>]*>.*?</style>").unwrap();
    static ref BR_RE: Regex = Regex::new(r"(?i)<\s*br\s*/?\s*>").unwrap();
    static ref P_CLOSE_RE: Regex = Regex::new(r"(?i)</\s*p\s*>").unwrap();
    static ref TAG_RE: Regex = Regex::new(r"<[^>]+>").unwrap();
    static ref HSPACE_RE: Regex = Regex::new(r"[ \t\r\x0B\x0C]+").unwrap();
    static ref BLANKS_RE: Regex = Regex::new(r"\n\s*\n\s*\n+").unwrap();
}

/// Convert HTML to plain text.
///
/// Decodes common entities, drops `<script>`/`<style>` blocks entirely,
/// turns `<br>` and `</p>` into newlines, strips remaining tags, collapses
/// runs of horizontal whitespace, and collapses 3+ consecutive blank lines
/// to exactly one blank line.
pub fn strip_html(html: &str) -> String {
    if html.is_empty() {
        return String::new();
    }
    let text = decode_entities(html);
    let text = SCRIPT_RE.replace_all(&text, "");
    let text = STYLE_RE.replace_all(&text, "");
    let text = BR_RE.replace_all(&text, "\n");
    let text = P_CLOSE_RE.replace_all(&text, "\n");
    let text = TAG_RE.replace_all(&text, "");
    let text = HSPACE_RE.replace_all(&text, " ");
    let text = BLANKS_RE.replace_all(&text, "\n\n");
    text.trim().to_string()
}

/// Decode the HTML entities that actually occur in group captures.
pub fn decode_entities(input: &str) -> String {
    let mut result = input.to_string();
    result = result.replace("&lt;", "<");
    result = result.replace("&gt;", ">");
    result = result.replace("&quot;", "\"");
    result = result.replace("&#39;", "'");
    result = result.replace("&apos;", "'");
    result = result.replace("&nbsp;", " ");
    result = result.replace("&#160;", " ");
    result = result.replace("&amp;", "&");
    result
}
