//! Attachment-candidate detection.
//!
//! Retrieval is out of scope; this pass only surfaces leads: URLs in message
//! bodies that look like file links, and WARC response records whose payload
//! is not text. Output is one JSON object per candidate.

use std::collections::BTreeSet;
use std::io::Write;
use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use crate::error::{ArchiveError, Result};
use crate::model::message::CanonicalMessage;
use crate::warc::reader::WarcReader;

lazy_static! {
    static ref URL_RE: Regex = Regex::new(r#"(?i)https?://[^\s"'<>]+"#).unwrap();
    static ref FILE_EXT_RE: Regex = Regex::new(
        r"(?i)\.(?:zip|tar|tgz|gz|rar|7z|pdf|docx?|xlsx?|pptx?|jpg|jpeg|png|gif|mp3|wav|exe|bin)(?:[?#/]|$)"
    )
    .unwrap();
}

/// A URL found in a message body that looks like a file link.
#[derive(Debug, Serialize)]
struct CorpusCandidate<'a> {
    source: &'static str,
    message: &'a str,
    candidate_url: &'a str,
}

/// A non-text WARC response payload.
#[derive(Debug, Serialize)]
struct WarcCandidate {
    source: &'static str,
    uri: String,
    content_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content_disposition: Option<String>,
}

/// Scan message bodies for candidate file URLs; write one JSON line each.
///
/// Returns the number of candidates written.
pub fn scan_corpus(messages: &[CanonicalMessage], out: &mut dyn Write) -> Result<u64> {
    let mut count = 0;
    for msg in messages {
        // Dedup per message, deterministically ordered.
        let mut urls: BTreeSet<&str> = BTreeSet::new();
        for text in [msg.full_text.as_str(), msg.index_text.as_str()] {
            for m in URL_RE.find_iter(text) {
                urls.insert(m.as_str());
            }
        }
        for url in urls {
            if !is_file_candidate(url) {
                continue;
            }
            let candidate = CorpusCandidate {
                source: "corpus",
                message: &msg.id,
                candidate_url: url,
            };
            let line = serde_json::to_string(&candidate)
                .map_err(|e| ArchiveError::RenderError(format!("serializing candidate: {e}")))?;
            writeln!(out, "{line}")?;
            count += 1;
        }
    }
    Ok(count)
}

/// Whether a URL is worth surfacing as an attachment lead.
fn is_file_candidate(url: &str) -> bool {
    FILE_EXT_RE.is_match(url) || url.contains("/attachments/") || url.contains("groups.yahoo.com")
}

/// Scan a WARC for response records with non-text payloads.
///
/// Returns the number of candidates written.
pub fn scan_warc(warc_path: &Path, out: &mut dyn Write) -> Result<u64> {
    let reader = WarcReader::new(warc_path)?;
    let mut count = 0;
    let mut write_error: Option<std::io::Error> = None;

    reader.for_each_record(
        &mut |record| {
            if record.warc_type != "response" {
                return true;
            }
            let Some((content_type, content_disposition)) = http_payload_headers(&record.body)
            else {
                return true;
            };
            if content_type.is_empty() || content_type.starts_with("text/") {
                return true;
            }
            let candidate = WarcCandidate {
                source: "warc",
                uri: record.target_uri.clone().unwrap_or_default(),
                content_type,
                content_disposition,
            };
            let line = match serde_json::to_string(&candidate) {
                Ok(line) => line,
                Err(_) => return true,
            };
            if let Err(e) = writeln!(out, "{line}") {
                write_error = Some(e);
                return false;
            }
            count += 1;
            true
        },
        None,
    )?;

    if let Some(e) = write_error {
        return Err(e.into());
    }
    Ok(count)
}

/// Pull `Content-Type` / `Content-Disposition` out of an HTTP response
/// block embedded in a WARC response body.
fn http_payload_headers(body: &[u8]) -> Option<(String, Option<String>)> {
    let text = String::from_utf8_lossy(body);
    if !text.starts_with("HTTP/") {
        return None;
    }
    let mut content_type = String::new();
    let mut content_disposition = None;
    for line in text.lines() {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            match name.trim().to_lowercase().as_str() {
                "content-type" => content_type = value.trim().to_lowercase(),
                "content-disposition" => content_disposition = Some(value.trim().to_string()),
                _ => {}
            }
        }
    }
    Some((content_type, content_disposition))
}
