//! Streaming WARC reader.
//!
//! Reads WARC files record-by-record with a buffered reader. Never loads the
//! entire archive into memory. Tolerant of malformed input:
//!
//! - Mixed `\n` and `\r\n` line endings
//! - Noise lines between records (skipped until the next version line)
//! - Records without a `Content-Length` (skipped with a warning)
//! - Truncated final records
//!
//! `.gz`/`.gzip` files are read through a multi-member gzip decoder, the
//! usual member-per-record layout of captured archives.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use flate2::read::MultiGzDecoder;
use tracing::warn;

use crate::error::{ArchiveError, Result};

/// Size of the internal read buffer.
const READ_BUFFER_SIZE: usize = 1024 * 1024;

/// Report progress every this many (decompressed) bytes.
const PROGRESS_INTERVAL: u64 = 4 * 1024 * 1024;

/// One framed WARC record.
#[derive(Debug, Clone)]
pub struct WarcRecord {
    /// The `WARC-Type` header (e.g. `resource`, `response`), lowercased.
    pub warc_type: String,
    /// The record's `Content-Type` header, lowercased; empty when absent.
    pub content_type: String,
    /// The `WARC-Target-URI` header, if present.
    pub target_uri: Option<String>,
    /// Offset of the record's version line in the (decompressed) stream.
    pub offset: u64,
    /// The record body, exactly `Content-Length` bytes.
    pub body: Vec<u8>,
}

/// Streaming WARC reader.
#[derive(Debug)]
pub struct WarcReader {
    path: PathBuf,
    file_size: u64,
}

impl WarcReader {
    /// Create a reader for the given WARC file.
    ///
    /// Verifies that the file exists and is readable, but does NOT validate
    /// that it is actually a WARC.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let metadata = std::fs::metadata(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ArchiveError::FileNotFound(path.clone())
            } else {
                ArchiveError::io(&path, e)
            }
        })?;
        Ok(Self {
            path,
            file_size: metadata.len(),
        })
    }

    /// Total size of the underlying file in bytes (compressed size for gzip).
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Path to the WARC file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the file routes through the gzip decoder.
    pub fn is_gzip(&self) -> bool {
        matches!(
            self.path.extension().and_then(|e| e.to_str()),
            Some("gz") | Some("gzip")
        )
    }

    /// Iterate all records, calling `record_callback` for each one found.
    ///
    /// The callback returns `true` to continue or `false` to abort early.
    /// The progress callback receives `(bytes, total)` where `total` is 0
    /// for gzip input (the decompressed size is unknown up front).
    ///
    /// Returns the number of records delivered.
    pub fn for_each_record(
        &self,
        record_callback: &mut dyn FnMut(WarcRecord) -> bool,
        progress_callback: Option<&dyn Fn(u64, u64)>,
    ) -> Result<u64> {
        if self.file_size == 0 {
            return Ok(0);
        }

        let file = File::open(&self.path).map_err(|e| ArchiveError::io(&self.path, e))?;
        let mut reader: Box<dyn BufRead> = if self.is_gzip() {
            Box::new(BufReader::with_capacity(
                READ_BUFFER_SIZE,
                MultiGzDecoder::new(BufReader::with_capacity(READ_BUFFER_SIZE, file)),
            ))
        } else {
            Box::new(BufReader::with_capacity(READ_BUFFER_SIZE, file))
        };
        let progress_total = if self.is_gzip() { 0 } else { self.file_size };

        let mut count: u64 = 0;
        let mut offset: u64 = 0;
        let mut last_progress: u64 = 0;
        let mut line_buf: Vec<u8> = Vec::with_capacity(4096);

        loop {
            // Scan for the next version line, skipping inter-record noise.
            line_buf.clear();
            let line_len = reader
                .read_until(b'\n', &mut line_buf)
                .map_err(|e| ArchiveError::io(&self.path, e))?;
            if line_len == 0 {
                break; // EOF
            }
            let record_offset = offset;
            offset += line_len as u64;

            let line = String::from_utf8_lossy(&line_buf);
            if !line.trim_start().starts_with("WARC/") {
                continue;
            }

            // Header block: lines until the first blank one.
            let mut warc_type = String::new();
            let mut content_type = String::new();
            let mut target_uri = None;
            let mut content_length: Option<u64> = None;

            loop {
                line_buf.clear();
                let n = reader
                    .read_until(b'\n', &mut line_buf)
                    .map_err(|e| ArchiveError::io(&self.path, e))?;
                if n == 0 {
                    break;
                }
                offset += n as u64;
                let header_line = String::from_utf8_lossy(&line_buf);
                let header_line = header_line.trim_end_matches(['\r', '\n']);
                if header_line.is_empty() {
                    break;
                }
                if let Some((name, value)) = header_line.split_once(':') {
                    let value = value.trim();
                    match name.trim().to_lowercase().as_str() {
                        "warc-type" => warc_type = value.to_lowercase(),
                        "content-type" => content_type = value.to_lowercase(),
                        "warc-target-uri" => target_uri = Some(value.to_string()),
                        "content-length" => content_length = value.parse().ok(),
                        _ => {}
                    }
                }
            }

            let Some(length) = content_length else {
                warn!(
                    offset = record_offset,
                    "WARC record without Content-Length, skipping"
                );
                continue;
            };

            let mut body = vec![0u8; length as usize];
            if let Err(e) = reader.read_exact(&mut body) {
                warn!(offset = record_offset, error = %e, "Truncated WARC record at EOF");
                break;
            }
            offset += length;

            if !record_callback(WarcRecord {
                warc_type,
                content_type,
                target_uri,
                offset: record_offset,
                body,
            }) {
                return Ok(count + 1);
            }
            count += 1;

            if let Some(cb) = progress_callback {
                if offset - last_progress >= PROGRESS_INTERVAL {
                    cb(offset, progress_total);
                    last_progress = offset;
                }
            }
            // Trailing record separator (blank lines) falls out of the
            // version-line scan at the top of the loop.
        }

        if let Some(cb) = progress_callback {
            cb(offset, progress_total);
        }

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_record(out: &mut Vec<u8>, warc_type: &str, content_type: &str, body: &[u8]) {
        out.extend_from_slice(b"WARC/1.0\r\n");
        out.extend_from_slice(format!("WARC-Type: {warc_type}\r\n").as_bytes());
        out.extend_from_slice(format!("Content-Type: {content_type}\r\n").as_bytes());
        out.extend_from_slice(format!("Content-Length: {}\r\n", body.len()).as_bytes());
        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(body);
        out.extend_from_slice(b"\r\n\r\n");
    }

    fn temp_warc(bytes: &[u8]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let mut f = File::create(dir.path().join("capture.warc")).unwrap();
        f.write_all(bytes).unwrap();
        dir
    }

    #[test]
    fn test_reads_all_records() {
        let mut bytes = Vec::new();
        write_record(&mut bytes, "warcinfo", "application/warc-fields", b"x: y");
        write_record(&mut bytes, "resource", "application/json", b"{\"a\":1}");
        let dir = temp_warc(&bytes);

        let reader = WarcReader::new(dir.path().join("capture.warc")).unwrap();
        let mut seen = Vec::new();
        let n = reader
            .for_each_record(
                &mut |rec| {
                    seen.push((rec.warc_type.clone(), rec.body.clone()));
                    true
                },
                None,
            )
            .unwrap();
        assert_eq!(n, 2);
        assert_eq!(seen[0].0, "warcinfo");
        assert_eq!(seen[1].1, b"{\"a\":1}");
    }

    #[test]
    fn test_early_abort() {
        let mut bytes = Vec::new();
        write_record(&mut bytes, "resource", "application/json", b"{}");
        write_record(&mut bytes, "resource", "application/json", b"{}");
        let dir = temp_warc(&bytes);

        let reader = WarcReader::new(dir.path().join("capture.warc")).unwrap();
        let n = reader.for_each_record(&mut |_| false, None).unwrap();
        assert_eq!(n, 1);
    }

    #[test]
    fn test_skips_record_without_length() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"WARC/1.0\r\nWARC-Type: resource\r\n\r\n");
        write_record(&mut bytes, "resource", "application/json", b"{\"ok\":true}");
        let dir = temp_warc(&bytes);

        let reader = WarcReader::new(dir.path().join("capture.warc")).unwrap();
        let mut bodies = Vec::new();
        let n = reader
            .for_each_record(
                &mut |rec| {
                    bodies.push(rec.body);
                    true
                },
                None,
            )
            .unwrap();
        assert_eq!(n, 1);
        assert_eq!(bodies[0], b"{\"ok\":true}");
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let err = WarcReader::new("/nonexistent/capture.warc").unwrap_err();
        assert!(matches!(err, ArchiveError::FileNotFound(_)));
    }

    #[test]
    fn test_gzip_member_per_record() {
        use flate2::write::GzEncoder;
        use flate2::Compression;

        let mut plain1 = Vec::new();
        write_record(&mut plain1, "resource", "application/json", b"{\"n\":1}");
        let mut plain2 = Vec::new();
        write_record(&mut plain2, "resource", "application/json", b"{\"n\":2}");

        let mut bytes = Vec::new();
        for member in [&plain1, &plain2] {
            let mut enc = GzEncoder::new(Vec::new(), Compression::default());
            enc.write_all(member).unwrap();
            bytes.extend_from_slice(&enc.finish().unwrap());
        }

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture.warc.gz");
        std::fs::write(&path, &bytes).unwrap();

        let reader = WarcReader::new(&path).unwrap();
        assert!(reader.is_gzip());
        let mut n_json = 0;
        let n = reader
            .for_each_record(
                &mut |rec| {
                    if rec.content_type.contains("json") {
                        n_json += 1;
                    }
                    true
                },
                None,
            )
            .unwrap();
        assert_eq!(n, 2);
        assert_eq!(n_json, 2);
    }
}
