//! Error types for archive validation and merging.
//!
//! Extraction and canonicalization are total and never produce errors;
//! only whole-document operations can fail.

use thiserror::Error;

/// Errors raised while decoding, validating, or merging archive documents.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Two records in the same subset share an id.
    #[error("duplicate {subset} id '{id}' in archive")]
    DuplicateId { subset: &'static str, id: String },

    /// A merge was requested with nothing to merge.
    #[error("no archive documents to merge")]
    NoDocuments,

    /// The document is not valid archive JSON.
    #[error("invalid archive JSON: {0}")]
    Json(#[from] serde_json::Error),
}
