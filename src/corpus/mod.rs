//! Canonical corpus: one-pass build from a WARC capture, NDJSON
//! persistence, and reload for the site passes.

pub mod builder;
pub mod reader;
