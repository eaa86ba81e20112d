//! The canonical message: the durable, deduplicated unit of the corpus.

use serde::{Deserialize, Serialize};

/// Number of characters of `full_text` copied into `index_text`.
///
/// A hard character truncation; it may split mid-word.
pub const INDEX_EXCERPT_CHARS: usize = 1000;

/// One normalized message, serialized as a single NDJSON line.
///
/// Created once per unique id during the corpus build and immutable
/// thereafter. The whole corpus is held in memory (`Vec<CanonicalMessage>`)
/// for the threading and linking passes; at a few KB per message this is
/// comfortable for archives in the hundreds of thousands of messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalMessage {
    /// Stable identifier. Unique across the corpus after dedup.
    pub id: String,

    /// Best-effort conversation root key. Equals `id` when no thread
    /// evidence exists.
    pub thread_id: String,

    /// Subject line (possibly empty).
    pub subject: String,

    /// Author display name (possibly empty; rendering falls back to
    /// "Unknown", the corpus does not).
    pub author: String,

    /// UTC timestamp as ISO-8601 with a trailing `Z`, or `None` when the
    /// source epoch could not be parsed. Always set together with `year`.
    pub timestamp: Option<String>,

    /// Calendar year of `timestamp`; selects the by-year partition.
    pub year: Option<i32>,

    /// First [`INDEX_EXCERPT_CHARS`] characters of `full_text`.
    pub index_text: String,

    /// Complete normalized display text.
    pub full_text: String,
}

impl CanonicalMessage {
    /// The bounded excerpt used for search indexing.
    ///
    /// Truncation counts Unicode scalars, not bytes, so multi-byte text
    /// never splits inside a character.
    pub fn excerpt(full_text: &str) -> String {
        full_text.chars().take(INDEX_EXCERPT_CHARS).collect()
    }
}

/// Lightweight summary row for `docs.json` (search result display).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocSummary {
    pub id: String,
    pub subject: String,
    pub author: String,
    pub timestamp: Option<String>,
    pub year: Option<i32>,
}

impl From<&CanonicalMessage> for DocSummary {
    fn from(msg: &CanonicalMessage) -> Self {
        Self {
            id: msg.id.clone(),
            subject: msg.subject.clone(),
            author: msg.author.clone(),
            timestamp: msg.timestamp.clone(),
            year: msg.year,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_excerpt_short_text_unchanged() {
        assert_eq!(CanonicalMessage::excerpt("hello"), "hello");
    }

    #[test]
    fn test_excerpt_hard_truncation() {
        let long: String = "a".repeat(2500);
        let excerpt = CanonicalMessage::excerpt(&long);
        assert_eq!(excerpt.chars().count(), INDEX_EXCERPT_CHARS);
    }

    #[test]
    fn test_excerpt_counts_chars_not_bytes() {
        let long: String = "é".repeat(1500);
        let excerpt = CanonicalMessage::excerpt(&long);
        assert_eq!(excerpt.chars().count(), INDEX_EXCERPT_CHARS);
        assert!(excerpt.chars().all(|c| c == 'é'));
    }

    #[test]
    fn test_ndjson_roundtrip() {
        let msg = CanonicalMessage {
            id: "42".into(),
            thread_id: "1".into(),
            subject: "Hi".into(),
            author: "alice".into(),
            timestamp: Some("2001-09-09T01:46:40Z".into()),
            year: Some(2001),
            index_text: "Hello".into(),
            full_text: "Hello".into(),
        };
        let line = serde_json::to_string(&msg).unwrap();
        let back: CanonicalMessage = serde_json::from_str(&line).unwrap();
        assert_eq!(back.id, "42");
        assert_eq!(back.year, Some(2001));
    }
}
