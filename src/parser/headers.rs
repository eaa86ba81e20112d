//! Minimal RFC 5322 header scraping for threading evidence.
//!
//! Only the headers the thread reconstructor needs are pulled out of the raw
//! email text; the full MIME parse happens separately in [`super::mime`].

/// Unfold the header block of a raw email into `(lowercase_name, value)`
/// pairs. Continuation lines (leading space or tab) join the previous
/// header; scanning stops at the first blank line.
pub fn unfold_headers(raw: &str) -> Vec<(String, String)> {
    let mut result: Vec<(String, String)> = Vec::new();

    for line in raw.lines() {
        let trimmed_end = line.trim_end_matches('\r');
        if trimmed_end.is_empty() {
            break;
        }
        if trimmed_end.starts_with(' ') || trimmed_end.starts_with('\t') {
            if let Some(last) = result.last_mut() {
                last.1.push(' ');
                last.1.push_str(trimmed_end.trim());
            }
        } else if let Some(colon_pos) = trimmed_end.find(':') {
            let name = trimmed_end[..colon_pos].trim().to_lowercase();
            let value = trimmed_end[colon_pos + 1..].trim().to_string();
            result.push((name, value));
        }
        // Lines without a colon and not a continuation are silently skipped
    }

    result
}

/// First value for a header name (case-insensitive; names are stored
/// lowercased by [`unfold_headers`]).
pub fn get_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
}

/// Normalize a message-id token by stripping enclosing `<` `>` and
/// surrounding whitespace.
pub fn normalize_msg_id(token: &str) -> String {
    let s = token.trim();
    let s = s.strip_prefix('<').unwrap_or(s);
    let s = s.strip_suffix('>').unwrap_or(s);
    s.trim().to_string()
}

/// Parse a `References`-style value into normalized message-id tokens.
///
/// Angle-bracket tokens win; a value with no brackets splits on commas and
/// whitespace. Empty tokens are dropped.
pub fn split_references(value: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();

    let mut remaining = value;
    while let Some(start) = remaining.find('<') {
        if let Some(end) = remaining[start..].find('>') {
            tokens.push(remaining[start + 1..start + end].trim().to_string());
            remaining = &remaining[start + end + 1..];
        } else {
            break;
        }
    }

    if tokens.is_empty() {
        tokens = value
            .split(|c: char| c == ',' || c.is_whitespace())
            .map(normalize_msg_id)
            .collect();
    }

    tokens.retain(|t| !t.is_empty());
    tokens
}
