//! Reload a persisted corpus for the site passes.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::{ArchiveError, Result};
use crate::model::message::CanonicalMessage;

/// Path of the full corpus stream under an output directory.
pub fn corpus_path(out_dir: &Path) -> PathBuf {
    out_dir.join("messages.ndjson")
}

/// Path of the by-year partition directory under an output directory.
pub fn by_year_dir(out_dir: &Path) -> PathBuf {
    out_dir.join("by_year")
}

/// Load the full corpus, preserving emission order.
///
/// Blank lines are skipped; malformed lines are warned about and skipped.
/// A missing corpus file is an error: the extract pass has not run.
pub fn load_corpus(out_dir: &Path) -> Result<Vec<CanonicalMessage>> {
    let path = corpus_path(out_dir);
    let file = File::open(&path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ArchiveError::InvalidCorpus {
                path: path.clone(),
                reason: "not found (run extract first)".into(),
            }
        } else {
            ArchiveError::io(&path, e)
        }
    })?;

    let mut messages = Vec::new();
    for (line_no, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| ArchiveError::io(&path, e))?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<CanonicalMessage>(&line) {
            Ok(msg) => messages.push(msg),
            Err(e) => {
                warn!(path = %path.display(), line = line_no + 1, error = %e, "Skipping malformed corpus line");
            }
        }
    }
    Ok(messages)
}

/// Return the (oldest, newest) timestamps across the corpus.
///
/// ISO-8601 UTC strings compare correctly as strings; messages without a
/// timestamp are ignored.
pub fn date_range(messages: &[CanonicalMessage]) -> Option<(String, String)> {
    let mut stamps = messages.iter().filter_map(|m| m.timestamp.as_deref());
    let first = stamps.next()?;
    let (mut min, mut max) = (first, first);
    for ts in stamps {
        if ts < min {
            min = ts;
        }
        if ts > max {
            max = ts;
        }
    }
    Some((min.to_string(), max.to_string()))
}

/// Number of distinct thread ids in the corpus.
pub fn thread_count(messages: &[CanonicalMessage]) -> usize {
    messages
        .iter()
        .map(|m| m.thread_id.as_str())
        .collect::<std::collections::HashSet<_>>()
        .len()
}

/// Return the top N authors by message count.
pub fn top_authors(messages: &[CanonicalMessage], n: usize) -> Vec<(String, usize)> {
    let mut counts: std::collections::HashMap<&str, usize> = std::collections::HashMap::new();
    for msg in messages {
        let key = if msg.author.is_empty() {
            "Unknown"
        } else {
            msg.author.as_str()
        };
        *counts.entry(key).or_default() += 1;
    }
    let mut sorted: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(author, count)| (author.to_string(), count))
        .collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    sorted.truncate(n);
    sorted
}
