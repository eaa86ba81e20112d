//! Raw web-archive (WARC) record iteration.

pub mod reader;
