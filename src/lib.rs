//! `grouparc` — turn web-archive captures of a discussion group into a
//! browsable, searchable static corpus.
//!
//! This crate provides the core library: a streaming WARC reader, MIME body
//! normalization, message identity and deduplication, thread reconstruction,
//! navigation linking, and the static-site emitters.

pub mod config;
pub mod corpus;
pub mod error;
pub mod model;
pub mod nav;
pub mod parser;
pub mod site;
pub mod threading;
pub mod warc;
