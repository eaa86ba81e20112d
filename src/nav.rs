//! Navigation linking: chronological and in-thread prev/next for every
//! message.
//!
//! "Chronological" adjacency is adjacency in corpus emission order; the
//! linker never re-sorts by timestamp. Linking stays O(n) and stable across
//! runs even when timestamps are partially missing, and is only as
//! chronological as the input order itself.

use std::collections::HashMap;

use crate::model::message::CanonicalMessage;
use crate::threading::ThreadGroup;

/// The 4-tuple of navigation targets for one message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavLinks {
    pub prev_chrono: Option<String>,
    pub next_chrono: Option<String>,
    pub prev_in_thread: Option<String>,
    pub next_in_thread: Option<String>,
}

/// Compute navigation links for the whole corpus.
///
/// Every message gets an entry; links are symmetric by construction
/// (`next(A) == B` implies `prev(B) == A` for both link kinds).
pub fn compute_links(
    messages: &[CanonicalMessage],
    threads: &[ThreadGroup],
) -> HashMap<String, NavLinks> {
    let mut links: HashMap<String, NavLinks> = messages
        .iter()
        .map(|m| (m.id.clone(), NavLinks::default()))
        .collect();

    for (i, msg) in messages.iter().enumerate() {
        let entry = links.get_mut(&msg.id).expect("link entry exists");
        if i > 0 {
            entry.prev_chrono = Some(messages[i - 1].id.clone());
        }
        if i + 1 < messages.len() {
            entry.next_chrono = Some(messages[i + 1].id.clone());
        }
    }

    for thread in threads {
        for (pos, &idx) in thread.members.iter().enumerate() {
            let entry = links
                .get_mut(&messages[idx].id)
                .expect("link entry exists");
            if pos > 0 {
                entry.prev_in_thread = Some(messages[thread.members[pos - 1]].id.clone());
            }
            if pos + 1 < thread.members.len() {
                entry.next_in_thread = Some(messages[thread.members[pos + 1]].id.clone());
            }
        }
    }

    links
}
