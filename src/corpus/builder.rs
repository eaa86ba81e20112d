//! Corpus construction: one pass over a WARC capture.
//!
//! For each resource record carrying JSON, every nested object is examined:
//! objects with a stable id and an embedded raw email become canonical
//! messages, first capture wins. Thread ids are resolved after the pass,
//! then the corpus is persisted as NDJSON: a full stream plus per-year
//! partitions.

use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::model::message::CanonicalMessage;
use crate::model::record::{visit_objects, RawRecord};
use crate::parser::fields::epoch_to_iso_year;
use crate::parser::mime::resolve_body;
use crate::threading::{resolve_thread_ids, ThreadHeaders};
use crate::warc::reader::WarcReader;

/// A canonical message paired with its build-time threading evidence.
#[derive(Debug, Clone)]
pub struct CorpusEntry {
    pub message: CanonicalMessage,
    pub headers: ThreadHeaders,
}

/// Counters for one build run.
#[derive(Debug, Clone, Default)]
pub struct BuildStats {
    /// WARC records delivered by the reader.
    pub records_scanned: u64,
    /// JSON payloads that parsed (resource records only).
    pub payloads_parsed: u64,
    /// Canonical messages written.
    pub messages_written: u64,
    /// Re-captures of an already-seen id, dropped without merging.
    pub duplicates_skipped: u64,
    /// Message-like objects lacking an id or a raw email.
    pub rejected: u64,
    /// By-year partition files written.
    pub partition_files: u64,
}

/// Result of a build run: the in-memory corpus plus counters.
#[derive(Debug)]
pub struct BuildOutcome {
    pub entries: Vec<CorpusEntry>,
    pub stats: BuildStats,
}

/// Builds the corpus for one run.
///
/// The dedup set is owned here and lives exactly as long as the run;
/// reruns start fresh and overwrite prior outputs wholesale.
pub struct CorpusBuilder {
    out_dir: PathBuf,
    seen: HashSet<String>,
}

impl CorpusBuilder {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            seen: HashSet::new(),
        }
    }

    /// Run the full build: scan, normalize, dedup, thread, persist.
    pub fn run(
        mut self,
        warc_path: &Path,
        progress: Option<&dyn Fn(u64, u64)>,
    ) -> Result<BuildOutcome> {
        let reader = WarcReader::new(warc_path)?;
        info!(path = %warc_path.display(), "Building corpus");

        let mut entries: Vec<CorpusEntry> = Vec::new();
        let mut stats = BuildStats::default();

        reader.for_each_record(
            &mut |record| {
                stats.records_scanned += 1;
                if record.warc_type != "resource" || !record.content_type.contains("json") {
                    return true;
                }
                let payload = String::from_utf8_lossy(&record.body);
                let value: serde_json::Value = match serde_json::from_str(&payload) {
                    Ok(v) => v,
                    Err(e) => {
                        debug!(offset = record.offset, error = %e, "Skipping unparseable JSON payload");
                        return true;
                    }
                };
                stats.payloads_parsed += 1;

                visit_objects(&value, &mut |map| {
                    self.collect(RawRecord::new(map.clone()), &mut entries, &mut stats);
                });
                true
            },
            progress,
        )?;

        // Thread resolution needs the whole corpus in view.
        let ids: Vec<String> = entries.iter().map(|e| e.message.id.clone()).collect();
        let headers: Vec<ThreadHeaders> = entries.iter().map(|e| e.headers.clone()).collect();
        for (entry, thread_id) in entries.iter_mut().zip(resolve_thread_ids(&ids, &headers)) {
            entry.message.thread_id = thread_id;
        }

        stats.partition_files = self.persist(&entries);
        stats.messages_written = entries.len() as u64;

        info!(
            messages = stats.messages_written,
            duplicates = stats.duplicates_skipped,
            rejected = stats.rejected,
            "Corpus build complete"
        );

        Ok(BuildOutcome { entries, stats })
    }

    /// Examine one nested JSON object; append a corpus entry if it is a
    /// usable, unseen message.
    fn collect(
        &mut self,
        record: RawRecord,
        entries: &mut Vec<CorpusEntry>,
        stats: &mut BuildStats,
    ) {
        let id = record.id();
        let raw_email = record.raw_email().map(String::from);
        let (Some(id), Some(raw_email)) = (id, raw_email) else {
            // Objects with neither field are wrapper noise; with exactly one
            // they are message-like but unusable.
            if record.id().is_some() || record.raw_email().is_some() {
                stats.rejected += 1;
            }
            return;
        };

        if !self.seen.insert(id.clone()) {
            stats.duplicates_skipped += 1;
            return;
        }

        let body = resolve_body(&raw_email);
        let (timestamp, year) = match record.date_value() {
            Some(value) => epoch_to_iso_year(&value),
            None => (None, None),
        };
        let headers = ThreadHeaders::from_raw_email(&raw_email, record.thread_hint());

        let message = CanonicalMessage {
            thread_id: id.clone(),
            id,
            subject: record.subject(),
            author: record.author(),
            timestamp,
            year,
            index_text: CanonicalMessage::excerpt(&body.text),
            full_text: body.text,
        };
        entries.push(CorpusEntry { message, headers });
    }

    /// Persist the corpus: `messages.ndjson` plus `by_year/<year>.ndjson`.
    ///
    /// An I/O failure on one target disables that target with a warning;
    /// the others continue. Returns the number of partition files written.
    fn persist(&self, entries: &[CorpusEntry]) -> u64 {
        if let Err(e) = std::fs::create_dir_all(self.out_dir.join("by_year")) {
            warn!(dir = %self.out_dir.display(), error = %e, "Cannot create output directory; skipping persistence");
            return 0;
        }

        let full_path = self.out_dir.join("messages.ndjson");
        let mut full: Option<BufWriter<File>> = match File::create(&full_path) {
            Ok(f) => Some(BufWriter::new(f)),
            Err(e) => {
                warn!(path = %full_path.display(), error = %e, "Cannot write full corpus; continuing with partitions only");
                None
            }
        };

        let mut per_year: BTreeMap<i32, Vec<String>> = BTreeMap::new();
        for entry in entries {
            let line = match serde_json::to_string(&entry.message) {
                Ok(line) => line,
                Err(e) => {
                    warn!(id = %entry.message.id, error = %e, "Skipping unserializable message");
                    continue;
                }
            };
            if let Some(mut writer) = full.take() {
                match writeln!(writer, "{line}") {
                    Ok(()) => full = Some(writer),
                    Err(e) => {
                        warn!(path = %full_path.display(), error = %e, "Write failed; abandoning full corpus output");
                    }
                }
            }
            if let Some(year) = entry.message.year {
                per_year.entry(year).or_default().push(line);
            }
        }

        if let Some(mut writer) = full {
            if let Err(e) = writer.flush() {
                warn!(path = %full_path.display(), error = %e, "Flush failed on full corpus output");
            }
        }

        let mut partitions = 0;
        for (year, lines) in &per_year {
            let path = self.out_dir.join("by_year").join(format!("{year}.ndjson"));
            match File::create(&path) {
                Ok(f) => {
                    let mut writer = BufWriter::new(f);
                    let ok = lines
                        .iter()
                        .all(|line| writeln!(writer, "{line}").is_ok())
                        && writer.flush().is_ok();
                    if ok {
                        partitions += 1;
                    } else {
                        warn!(path = %path.display(), "Write failed on partition; continuing");
                    }
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Cannot create partition; continuing");
                }
            }
        }
        partitions
    }
}
