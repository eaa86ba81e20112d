//! Content sniffing for rendering: an ordered chain of fallible
//! transformations over a stored body, first success wins.
//!
//! Some captures carry bodies that are still base64, either as one undecoded
//! blob or as MIME parts whose `Content-Transfer-Encoding` header survived
//! into the text. Each attempt returns `None` to pass the body to the next
//! one; the final fallback is plain text.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use lazy_static::lazy_static;
use regex::Regex;

/// A body classified for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SniffedBody {
    /// Render as markup.
    Html(String),
    /// Render escaped, preformatted.
    Text(String),
}

type Attempt = fn(&str) -> Option<SniffedBody>;

/// Classify a stored body for rendering.
pub fn sniff_body(content: &str) -> SniffedBody {
    const ATTEMPTS: &[Attempt] = &[
        detect_markup,
        decode_base64_whole,
        decode_base64_mime_parts,
    ];
    for attempt in ATTEMPTS {
        if let Some(body) = attempt(content) {
            return body;
        }
    }
    SniffedBody::Text(content.to_string())
}

lazy_static! {
    static ref MARKUP_RE: Regex = Regex::new(r"</?\w+>").unwrap();
    static ref B64_ALPHABET_RE: Regex = Regex::new(r"[^A-Za-z0-9+/=]").unwrap();
    static ref CTE_BASE64_RE: Regex =
        Regex::new(r"(?i)Content-Transfer-Encoding:\s*base64").unwrap();
    static ref BLANK_LINE_RE: Regex = Regex::new(r"\r?\n\r?\n").unwrap();
    static ref PART_BOUNDARY_RE: Regex = Regex::new(r"\r?\n--[^\r\n]+").unwrap();
    static ref CONTENT_TYPE_RE: Regex = Regex::new(r"(?i)Content-Type:\s*([^\r\n;]+)").unwrap();
}

/// Bodies that already contain tags render as markup directly.
fn detect_markup(content: &str) -> Option<SniffedBody> {
    if MARKUP_RE.is_match(content) {
        Some(SniffedBody::Html(content.to_string()))
    } else {
        None
    }
}

/// Whole-string heuristic: a reasonably long, alphabet-clean base64 blob.
fn decode_base64_whole(content: &str) -> Option<SniffedBody> {
    let compact: String = content.split_whitespace().collect();
    if compact.len() < 16 || B64_ALPHABET_RE.is_match(&compact) {
        return None;
    }
    let raw = STANDARD.decode(compact.as_bytes()).ok()?;
    let decoded = decode_text_bytes(&raw);
    if MARKUP_RE.is_match(&decoded) {
        Some(SniffedBody::Html(decoded))
    } else {
        Some(SniffedBody::Text(decoded))
    }
}

/// Find MIME parts marked base64, decode their payloads, and combine them.
///
/// Returns `None` when no base64 part marker is present. A payload that
/// fails strict decoding is kept verbatim rather than dropped.
fn decode_base64_mime_parts(content: &str) -> Option<SniffedBody> {
    let mut any_html = false;
    let mut parts: Vec<String> = Vec::new();
    let mut pos = 0;
    let mut found = false;

    while let Some(marker) = CTE_BASE64_RE.find(&content[pos..]) {
        found = true;
        let header_idx = pos + marker.start();
        let after_header = pos + marker.end();

        // Payload starts after the first blank line following the header.
        let payload_start = match BLANK_LINE_RE.find(&content[after_header..]) {
            Some(blank) => after_header + blank.end(),
            None => after_header,
        };

        // Payload ends at the next MIME boundary line, or end of text.
        let payload_end = match PART_BOUNDARY_RE.find(&content[payload_start..]) {
            Some(boundary) => payload_start + boundary.start(),
            None => content.len(),
        };
        let payload = content[payload_start..payload_end].trim();

        // The part's Content-Type precedes the encoding header.
        let look_start = content[..header_idx].rfind("\n--").unwrap_or(0);
        let ctype = CONTENT_TYPE_RE
            .captures(&content[look_start..header_idx])
            .map(|c| c[1].to_lowercase())
            .unwrap_or_default();

        let compact: String = payload.split_whitespace().collect();
        match STANDARD.decode(compact.as_bytes()) {
            Ok(raw) => {
                parts.push(decode_text_bytes(&raw));
                if ctype.contains("html") {
                    any_html = true;
                }
            }
            Err(_) => parts.push(payload.to_string()),
        }

        pos = payload_end;
    }

    if !found {
        return None;
    }
    let combined = parts.join("\n\n");
    Some(if any_html {
        SniffedBody::Html(combined)
    } else {
        SniffedBody::Text(combined)
    })
}

/// UTF-8 first, then WINDOWS-1252 (which accepts every byte).
fn decode_text_bytes(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            decoded.into_owned()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine as _;

    #[test]
    fn test_plain_text_stays_text() {
        let body = sniff_body("Just a plain message.");
        assert_eq!(body, SniffedBody::Text("Just a plain message.".into()));
    }

    #[test]
    fn test_markup_detected() {
        let body = sniff_body("hello <b>world</b>");
        assert!(matches!(body, SniffedBody::Html(_)));
    }

    #[test]
    fn test_whole_string_base64_text() {
        // "a plain decoded sentence" in base64
        let encoded = STANDARD.encode("a plain decoded sentence");
        let body = sniff_body(&encoded);
        assert_eq!(body, SniffedBody::Text("a plain decoded sentence".into()));
    }

    #[test]
    fn test_whole_string_base64_html() {
        let encoded = STANDARD.encode("<p>decoded markup</p>");
        let body = sniff_body(&encoded);
        assert_eq!(body, SniffedBody::Html("<p>decoded markup</p>".into()));
    }

    #[test]
    fn test_short_blob_not_treated_as_base64() {
        let body = sniff_body("abcd");
        assert_eq!(body, SniffedBody::Text("abcd".into()));
    }

    #[test]
    fn test_mime_base64_part_decoded() {
        let payload = STANDARD.encode("hidden body text here");
        let content = format!(
            "--b1\nContent-Type: text/plain\nContent-Transfer-Encoding: base64\n\n{payload}\n--b1--"
        );
        let body = sniff_body(&content);
        match body {
            SniffedBody::Text(text) => assert!(text.contains("hidden body text here")),
            other => panic!("expected text, got {other:?}"),
        }
    }

    #[test]
    fn test_mime_base64_html_part_flagged() {
        let payload = STANDARD.encode("<p>hidden markup</p>");
        let content = format!(
            "--b1\nContent-Type: text/html\nContent-Transfer-Encoding: base64\n\n{payload}\n--b1--"
        );
        let body = sniff_body(&content);
        assert!(matches!(body, SniffedBody::Html(_)));
    }

    #[test]
    fn test_invalid_payload_kept_verbatim() {
        let content =
            "--b1\nContent-Transfer-Encoding: base64\n\n!!not base64!!\n--b1--";
        let body = sniff_body(content);
        match body {
            SniffedBody::Text(text) => assert!(text.contains("!!not base64!!")),
            other => panic!("expected text, got {other:?}"),
        }
    }
}
