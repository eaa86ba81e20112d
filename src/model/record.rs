//! Raw capture records: JSON objects pulled out of WARC resource payloads.
//!
//! Captures expose the same logical attribute under several key names
//! depending on scrape vintage. Each attribute has an explicit ordered alias
//! table, resolved by a single first-present-wins helper.

use serde_json::{Map, Value};

/// Candidate key names for the stable message identifier.
pub const ID_FIELDS: &[&str] = &["msgId", "messageId", "id"];

/// Candidate key names for the author display name.
/// `yahooAlias` is a legacy key seen in group captures.
pub const AUTHOR_FIELDS: &[&str] = &["authorName", "author", "yahooAlias", "from"];

/// Candidate key names for the post timestamp (epoch seconds).
pub const DATE_FIELDS: &[&str] = &["postDate", "lastPosted", "date"];

/// Candidate key names for the thread/topic hint.
pub const THREAD_FIELDS: &[&str] = &["topicFirstRecord", "topicId"];

/// One JSON object from a capture payload. Transient; consumed once.
#[derive(Debug, Clone)]
pub struct RawRecord {
    fields: Map<String, Value>,
}

impl RawRecord {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// First present, non-empty value among `keys`, coerced to a string.
    ///
    /// Numbers coerce via their decimal form; empty strings, nulls, and
    /// non-scalar values count as absent.
    pub fn first_present(&self, keys: &[&str]) -> Option<String> {
        for key in keys {
            match self.fields.get(*key) {
                Some(Value::String(s)) if !s.is_empty() => return Some(s.clone()),
                Some(Value::Number(n)) => return Some(n.to_string()),
                _ => {}
            }
        }
        None
    }

    /// The stable identifier, if any source field carries one.
    pub fn id(&self) -> Option<String> {
        self.first_present(ID_FIELDS)
    }

    /// The embedded raw email (headers + MIME body), if present and non-empty.
    pub fn raw_email(&self) -> Option<&str> {
        match self.fields.get("rawEmail") {
            Some(Value::String(s)) if !s.is_empty() => Some(s),
            _ => None,
        }
    }

    /// Subject, trimmed; empty when absent.
    pub fn subject(&self) -> String {
        self.first_present(&["subject"])
            .map(|s| s.trim().to_string())
            .unwrap_or_default()
    }

    /// Author display name, trimmed; empty when no alias matches.
    pub fn author(&self) -> String {
        self.first_present(AUTHOR_FIELDS)
            .map(|s| s.trim().to_string())
            .unwrap_or_default()
    }

    /// The raw timestamp value (string form), first date alias wins.
    pub fn date_value(&self) -> Option<String> {
        self.first_present(DATE_FIELDS)
    }

    /// Thread/topic hint, first alias wins.
    pub fn thread_hint(&self) -> Option<String> {
        self.first_present(THREAD_FIELDS)
    }
}

/// Visit every JSON object nested anywhere inside `value`, depth-first,
/// in encounter order. Capture payloads bury message objects at arbitrary
/// depth inside wrapper objects and arrays.
pub fn visit_objects(value: &Value, visit: &mut dyn FnMut(&Map<String, Value>)) {
    match value {
        Value::Object(map) => {
            visit(map);
            for v in map.values() {
                visit_objects(v, visit);
            }
        }
        Value::Array(items) => {
            for v in items {
                visit_objects(v, visit);
            }
        }
        _ => {}
    }
}
