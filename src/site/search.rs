//! Search-document emission.
//!
//! The core produces the document set only: `search_docs.json` carries the
//! searchable fields handed to an external index builder, `docs.json` the
//! lightweight summaries a result list needs. Tokenization and index
//! serialization happen outside this crate.

use std::path::Path;

use serde::Serialize;

use crate::error::{ArchiveError, Result};
use crate::model::message::{CanonicalMessage, DocSummary};

/// One searchable document: the fields an index builder consumes.
#[derive(Debug, Clone, Serialize)]
pub struct SearchDoc {
    pub id: String,
    pub subject: String,
    pub author: String,
    pub index_text: String,
}

impl From<&CanonicalMessage> for SearchDoc {
    fn from(msg: &CanonicalMessage) -> Self {
        Self {
            id: msg.id.clone(),
            subject: msg.subject.clone(),
            author: msg.author.clone(),
            index_text: msg.index_text.clone(),
        }
    }
}

/// Write `search_docs.json` and `docs.json` under `site_dir`.
pub fn write_search_documents(messages: &[CanonicalMessage], site_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(site_dir).map_err(|e| ArchiveError::io(site_dir, e))?;

    let docs: Vec<SearchDoc> = messages.iter().map(SearchDoc::from).collect();
    let docs_path = site_dir.join("search_docs.json");
    let body = serde_json::to_string(&docs)
        .map_err(|e| ArchiveError::RenderError(format!("serializing search docs: {e}")))?;
    std::fs::write(&docs_path, body).map_err(|e| ArchiveError::io(&docs_path, e))?;

    let summaries: Vec<DocSummary> = messages.iter().map(DocSummary::from).collect();
    let summaries_path = site_dir.join("docs.json");
    let body = serde_json::to_string(&summaries)
        .map_err(|e| ArchiveError::RenderError(format!("serializing doc summaries: {e}")))?;
    std::fs::write(&summaries_path, body).map_err(|e| ArchiveError::io(&summaries_path, e))?;

    Ok(())
}
