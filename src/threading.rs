//! Thread reconstruction from weak threading evidence.
//!
//! Captures rarely carry a reliable thread key: topic hints are sparse,
//! `References` chains are truncated, and many replies name only their
//! immediate parent. Each message gets an *immediate* key from a cascading
//! heuristic, and the keys are then linked into a cycle-free parent forest
//! so that a reply chain converges on one root id.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::model::message::CanonicalMessage;
use crate::parser::fields::parse_iso;
use crate::parser::headers::{get_header, normalize_msg_id, split_references, unfold_headers};

/// Threading evidence scraped from a raw email plus the capture's topic
/// hint. Build-time only; never persisted.
#[derive(Debug, Clone, Default)]
pub struct ThreadHeaders {
    /// Explicit thread/topic identifier from the capture record.
    pub topic_hint: Option<String>,
    /// Normalized message-ids from the `References` header.
    pub references: Vec<String>,
    /// Normalized `In-Reply-To` value.
    pub in_reply_to: Option<String>,
}

impl ThreadHeaders {
    /// Scrape threading headers from a raw email.
    pub fn from_raw_email(raw: &str, topic_hint: Option<String>) -> Self {
        let headers = unfold_headers(raw);
        let references = get_header(&headers, "references")
            .map(split_references)
            .unwrap_or_default();
        let in_reply_to = get_header(&headers, "in-reply-to")
            .map(normalize_msg_id)
            .filter(|s| !s.is_empty());
        Self {
            topic_hint,
            references,
            in_reply_to,
        }
    }

    /// The immediate thread key, first match wins:
    /// topic hint, first `References` token, `In-Reply-To`, own id.
    pub fn immediate_key(&self, own_id: &str) -> String {
        if let Some(hint) = self.topic_hint.as_deref().filter(|h| !h.is_empty()) {
            return hint.to_string();
        }
        if let Some(first) = self.references.first() {
            return first.clone();
        }
        if let Some(reply_to) = &self.in_reply_to {
            return reply_to.clone();
        }
        own_id.to_string()
    }
}

/// Resolve a thread id for every message.
///
/// `ids` and `headers` run in parallel. Immediate keys become parent links
/// (skipping any link that would close a cycle), and each message walks its
/// chain to the root. A parent id that was never captured terminates the
/// walk and becomes the thread id itself: the true root may be missing from
/// the archive, and no later reconciliation merges such threads.
pub fn resolve_thread_ids(ids: &[String], headers: &[ThreadHeaders]) -> Vec<String> {
    debug_assert_eq!(ids.len(), headers.len());

    let id_set: HashSet<&str> = ids.iter().map(String::as_str).collect();
    let mut parent: HashMap<&str, String> = HashMap::new();

    for (id, hdr) in ids.iter().zip(headers) {
        let key = hdr.immediate_key(id);
        if key == *id {
            continue;
        }
        if would_create_cycle(&parent, &key, id) {
            continue;
        }
        parent.insert(id.as_str(), key);
    }

    ids.iter()
        .map(|id| {
            let mut current: &str = id;
            let mut depth = 0;
            while let Some(next) = parent.get(current) {
                current = next.as_str();
                if !id_set.contains(current) {
                    break;
                }
                depth += 1;
                if depth > 100 {
                    break;
                }
            }
            current.to_string()
        })
        .collect()
}

/// Check if making `start` an ancestor of `target` would close a cycle.
fn would_create_cycle(parent: &HashMap<&str, String>, start: &str, target: &str) -> bool {
    let mut current = start;
    let mut depth = 0;
    while current != target {
        match parent.get(current) {
            Some(next) => current = next.as_str(),
            None => return false,
        }
        depth += 1;
        if depth > 100 {
            return true;
        }
    }
    true
}

/// A set of messages sharing a thread id, in display order.
#[derive(Debug)]
pub struct ThreadGroup {
    /// The shared conversation root key.
    pub thread_id: String,
    /// Indices into the corpus slice, timestamp-sorted.
    pub members: Vec<usize>,
}

/// Sort key inside a thread: parsed timestamp ascending; unparseable or
/// missing timestamps order by their raw string form after every
/// timestamped message. Deterministic, not necessarily chronological.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum ThreadSortKey {
    Time(DateTime<Utc>),
    Raw(String),
}

fn thread_sort_key(msg: &CanonicalMessage) -> ThreadSortKey {
    match msg.timestamp.as_deref() {
        Some(ts) => match parse_iso(ts) {
            Some(dt) => ThreadSortKey::Time(dt),
            None => ThreadSortKey::Raw(ts.to_string()),
        },
        None => ThreadSortKey::Raw(String::new()),
    }
}

/// Group the corpus by `thread_id` and sort each group.
///
/// The final tie-break is the message id, so the order is total and
/// idempotent across runs. Groups themselves come back sorted by thread id.
pub fn group_threads(messages: &[CanonicalMessage]) -> Vec<ThreadGroup> {
    let mut by_thread: HashMap<&str, Vec<usize>> = HashMap::new();
    for (idx, msg) in messages.iter().enumerate() {
        by_thread.entry(msg.thread_id.as_str()).or_default().push(idx);
    }

    let mut threads: Vec<ThreadGroup> = by_thread
        .into_iter()
        .map(|(thread_id, mut members)| {
            members.sort_by(|&a, &b| {
                thread_sort_key(&messages[a])
                    .cmp(&thread_sort_key(&messages[b]))
                    .then_with(|| messages[a].id.cmp(&messages[b].id))
            });
            ThreadGroup {
                thread_id: thread_id.to_string(),
                members,
            }
        })
        .collect();

    threads.sort_by(|a, b| a.thread_id.cmp(&b.thread_id));
    threads
}
