//! Integration tests for the extract → thread → link → render pipeline.
//!
//! WARC fixtures are generated per-test (framing is length-prefixed, so
//! building them programmatically beats maintaining byte-exact files).

use std::io::Write;
use std::path::{Path, PathBuf};

use grouparc::corpus::builder::{BuildOutcome, CorpusBuilder};
use grouparc::corpus::reader::load_corpus;
use grouparc::model::message::INDEX_EXCERPT_CHARS;
use grouparc::nav::compute_links;
use grouparc::threading::group_threads;

fn warc_bytes(payloads: &[serde_json::Value]) -> Vec<u8> {
    let mut bytes = Vec::new();
    for payload in payloads {
        let body = payload.to_string().into_bytes();
        bytes.extend_from_slice(b"WARC/1.0\r\n");
        bytes.extend_from_slice(b"WARC-Type: resource\r\n");
        bytes.extend_from_slice(b"Content-Type: application/json\r\n");
        bytes.extend_from_slice(format!("Content-Length: {}\r\n", body.len()).as_bytes());
        bytes.extend_from_slice(b"\r\n");
        bytes.extend_from_slice(&body);
        bytes.extend_from_slice(b"\r\n\r\n");
    }
    bytes
}

fn write_warc(dir: &Path, payloads: &[serde_json::Value]) -> PathBuf {
    let path = dir.join("capture.warc");
    std::fs::write(&path, warc_bytes(payloads)).unwrap();
    path
}

fn extract(dir: &Path, payloads: &[serde_json::Value]) -> BuildOutcome {
    let warc = write_warc(dir, payloads);
    CorpusBuilder::new(dir.join("out")).run(&warc, None).unwrap()
}

fn message(id: &str, body: &str, epoch: &str) -> serde_json::Value {
    serde_json::json!({
        "msgId": id,
        "rawEmail": format!("Subject: msg {id}\n\n{body}"),
        "postDate": epoch,
        "authorName": format!("author-{id}"),
        "subject": format!("msg {id}"),
    })
}

// ─── Test 1: Single record, epoch gigasecond ─────────────────────────

#[test]
fn test_single_record_scenario() {
    let tmp = tempfile::tempdir().unwrap();
    let outcome = extract(
        tmp.path(),
        &[serde_json::json!({
            "msgId": "1",
            "rawEmail": "Subject: Hi\n\nHello world",
            "postDate": "1000000000"
        })],
    );

    assert_eq!(outcome.stats.messages_written, 1);
    let msg = &outcome.entries[0].message;
    assert_eq!(msg.id, "1");
    assert!(msg.full_text.contains("Hello world"));
    assert_eq!(msg.timestamp.as_deref(), Some("2001-09-09T01:46:40Z"));
    assert_eq!(msg.year, Some(2001));
}

// ─── Test 2: Dedup equivalence ───────────────────────────────────────

#[test]
fn test_duplicates_yield_same_count_as_deduplicated_input() {
    let with_dupes = vec![
        message("1", "first body", "1000000000"),
        message("2", "other body", "1000000100"),
        serde_json::json!({
            "msgId": "1",
            "rawEmail": "Subject: recapture\n\na different body",
            "postDate": "1000000000"
        }),
    ];
    let without_dupes = vec![
        message("1", "first body", "1000000000"),
        message("2", "other body", "1000000100"),
    ];

    let tmp_a = tempfile::tempdir().unwrap();
    let tmp_b = tempfile::tempdir().unwrap();
    let a = extract(tmp_a.path(), &with_dupes);
    let b = extract(tmp_b.path(), &without_dupes);

    assert_eq!(a.stats.messages_written, b.stats.messages_written);
    // First capture wins: the recapture body never replaces the original.
    assert!(a.entries[0].message.full_text.contains("first body"));
}

// ─── Test 3: Unique ids after dedup ──────────────────────────────────

#[test]
fn test_every_corpus_id_is_unique() {
    let payloads: Vec<serde_json::Value> = (0..20)
        .map(|i| message(&format!("{}", i % 7), "body", "1000000000"))
        .collect();
    let tmp = tempfile::tempdir().unwrap();
    let outcome = extract(tmp.path(), &payloads);

    let mut ids: Vec<&str> = outcome
        .entries
        .iter()
        .map(|e| e.message.id.as_str())
        .collect();
    ids.sort_unstable();
    let before = ids.len();
    ids.dedup();
    assert_eq!(before, ids.len(), "duplicate id survived dedup");
    assert_eq!(before, 7);
}

// ─── Test 4: index_text is a character-exact truncation ──────────────

#[test]
fn test_index_text_is_first_1000_chars() {
    let long_body: String = "word ".repeat(600);
    let tmp = tempfile::tempdir().unwrap();
    let outcome = extract(tmp.path(), &[message("1", &long_body, "1000000000")]);

    let msg = &outcome.entries[0].message;
    let expected: String = msg.full_text.chars().take(INDEX_EXCERPT_CHARS).collect();
    assert_eq!(msg.index_text, expected);
    assert_eq!(msg.index_text.chars().count(), INDEX_EXCERPT_CHARS);
}

// ─── Test 5: Reply chain converges on the root ───────────────────────

#[test]
fn test_reply_chain_threads_and_orders() {
    let payloads = vec![
        serde_json::json!({
            "msgId": "A",
            "rawEmail": "Subject: topic\n\nroot says",
            "postDate": "1000000000"
        }),
        serde_json::json!({
            "msgId": "B",
            "rawEmail": "In-Reply-To: <A>\nSubject: Re: topic\n\nfirst reply",
            "postDate": "1000000100"
        }),
        serde_json::json!({
            "msgId": "C",
            "rawEmail": "In-Reply-To: <B>\nSubject: Re: topic\n\nsecond reply",
            "postDate": "1000000200"
        }),
    ];
    let tmp = tempfile::tempdir().unwrap();
    let outcome = extract(tmp.path(), &payloads);

    let messages: Vec<_> = outcome.entries.iter().map(|e| e.message.clone()).collect();
    assert!(messages.iter().all(|m| m.thread_id == "A"));

    let threads = group_threads(&messages);
    assert_eq!(threads.len(), 1);
    let ordered: Vec<&str> = threads[0]
        .members
        .iter()
        .map(|&i| messages[i].id.as_str())
        .collect();
    assert_eq!(ordered, vec!["A", "B", "C"]);
}

// ─── Test 6: Navigation links are symmetric and emission-ordered ─────

#[test]
fn test_navigation_links_symmetric() {
    let payloads = vec![
        message("x", "a", "1000000300"),
        message("y", "b", "1000000100"),
        message("z", "c", "1000000200"),
    ];
    let tmp = tempfile::tempdir().unwrap();
    let outcome = extract(tmp.path(), &payloads);
    let messages: Vec<_> = outcome.entries.iter().map(|e| e.message.clone()).collect();

    let links = compute_links(&messages, &group_threads(&messages));

    // Chronological links follow emission order, not timestamps.
    assert_eq!(links["x"].next_chrono.as_deref(), Some("y"));
    assert_eq!(links["y"].next_chrono.as_deref(), Some("z"));

    for msg in &messages {
        let l = &links[&msg.id];
        if let Some(next) = &l.next_chrono {
            assert_eq!(links[next].prev_chrono.as_deref(), Some(msg.id.as_str()));
        }
        if let Some(prev) = &l.prev_chrono {
            assert_eq!(links[prev].next_chrono.as_deref(), Some(msg.id.as_str()));
        }
        if let Some(next) = &l.next_in_thread {
            assert_eq!(links[next].prev_in_thread.as_deref(), Some(msg.id.as_str()));
        }
    }
}

// ─── Test 7: Persisted corpus reloads in emission order ──────────────

#[test]
fn test_corpus_roundtrip_preserves_order() {
    let payloads = vec![
        message("first", "a", "1000000000"),
        message("second", "b", "not-an-epoch"),
        message("third", "c", "1100000000"),
    ];
    let tmp = tempfile::tempdir().unwrap();
    extract(tmp.path(), &payloads);

    let reloaded = load_corpus(&tmp.path().join("out")).unwrap();
    assert_eq!(reloaded.len(), 3);
    let ids: Vec<&str> = reloaded.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["first", "second", "third"]);

    // Unparseable epoch: both fields null, still in the full corpus.
    assert_eq!(reloaded[1].timestamp, None);
    assert_eq!(reloaded[1].year, None);

    // Year partitions exclude the null-year message.
    let by_year = tmp.path().join("out").join("by_year");
    assert!(by_year.join("2001.ndjson").exists());
    assert!(by_year.join("2004.ndjson").exists());
    let partitioned: usize = std::fs::read_dir(&by_year)
        .unwrap()
        .map(|entry| {
            std::fs::read_to_string(entry.unwrap().path())
                .unwrap()
                .lines()
                .count()
        })
        .sum();
    assert_eq!(partitioned, 2);
}

// ─── Test 8: Gzip input behaves identically ──────────────────────────

#[test]
fn test_gzip_capture_matches_plain() {
    use flate2::write::GzEncoder;
    use flate2::Compression;

    let payloads = vec![
        message("1", "alpha", "1000000000"),
        message("2", "beta", "1000000100"),
    ];

    let tmp = tempfile::tempdir().unwrap();
    let plain = extract(tmp.path(), &payloads);

    let gz_dir = tempfile::tempdir().unwrap();
    let mut enc = GzEncoder::new(Vec::new(), Compression::default());
    enc.write_all(&warc_bytes(&payloads)).unwrap();
    let gz_path = gz_dir.path().join("capture.warc.gz");
    std::fs::write(&gz_path, enc.finish().unwrap()).unwrap();

    let gz = CorpusBuilder::new(gz_dir.path().join("out"))
        .run(&gz_path, None)
        .unwrap();

    assert_eq!(gz.stats.messages_written, plain.stats.messages_written);
    assert_eq!(gz.entries[0].message.id, plain.entries[0].message.id);
    assert_eq!(
        gz.entries[1].message.full_text,
        plain.entries[1].message.full_text
    );
}

// ─── Test 9: Thread ordering is idempotent across runs ───────────────

#[test]
fn test_thread_ordering_idempotent() {
    let payloads = vec![
        message("a", "one", "1000000000"),
        message("b", "two", "1000000000"),
        message("c", "three", "not-a-date"),
    ];
    let tmp_a = tempfile::tempdir().unwrap();
    let tmp_b = tempfile::tempdir().unwrap();

    let order = |outcome: &BuildOutcome| {
        let messages: Vec<_> = outcome.entries.iter().map(|e| e.message.clone()).collect();
        group_threads(&messages)
            .iter()
            .map(|t| {
                (
                    t.thread_id.clone(),
                    t.members
                        .iter()
                        .map(|&i| messages[i].id.clone())
                        .collect::<Vec<_>>(),
                )
            })
            .collect::<Vec<_>>()
    };

    let first = order(&extract(tmp_a.path(), &payloads));
    let second = order(&extract(tmp_b.path(), &payloads));
    assert_eq!(first, second);
}

// ─── Test 10: Rendered site covers the whole corpus ──────────────────

#[test]
fn test_render_full_pipeline() {
    let payloads = vec![
        message("1", "hello body", "1000000000"),
        serde_json::json!({
            "msgId": "2",
            "rawEmail": "In-Reply-To: <1>\nSubject: Re: msg 1\n\n<p>html reply &amp; more</p>",
            "postDate": "1000000100"
        }),
    ];
    let tmp = tempfile::tempdir().unwrap();
    extract(tmp.path(), &payloads);

    let messages = load_corpus(&tmp.path().join("out")).unwrap();
    let threads = group_threads(&messages);
    let links = compute_links(&messages, &threads);
    let site = tmp.path().join("site");
    let stats = grouparc::site::render::write_site(&messages, &links, &site).unwrap();

    assert_eq!(stats.message_pages, 2);
    assert!(site.join("msg/1.html").exists());
    assert!(site.join("msg/2.json").exists());
    assert!(site.join("browse/index.html").exists());

    // The reply links back to its thread predecessor.
    let page = std::fs::read_to_string(site.join("msg/2.html")).unwrap();
    assert!(page.contains("Prev in thread"));
    assert!(page.contains("../msg/1.html"));

    grouparc::site::search::write_search_documents(&messages, &site).unwrap();
    let docs: Vec<serde_json::Value> =
        serde_json::from_str(&std::fs::read_to_string(site.join("search_docs.json")).unwrap())
            .unwrap();
    assert_eq!(docs.len(), 2);
}
