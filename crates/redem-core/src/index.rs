//! URI occurrence index.
//!
//! [`UriIndexer`] ties an extraction strategy to a canonicalizer and turns
//! records into [`UriOccurrence`]s. Per record the order is fixed: the
//! record's own links first (permalink, then a submission's url), then
//! whatever the strategy finds in the body.

use std::sync::Arc;

use crate::aggregate::Aggregator;
use crate::canonical::Canonicalizer;
use crate::extract::UriExtractionStrategy;
use crate::models::{ArchiveRecord, Comment, SourceRef, Submission};

/// One URI seen in one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UriOccurrence {
    pub raw: String,
    pub canonical: String,
    pub source: SourceRef,
}

/// Canonical URI → every `(raw, source)` it was seen as.
pub type UriIndex = Aggregator<UriOccurrence, String, (String, SourceRef)>;

fn occurrence_key(occurrence: &UriOccurrence) -> String {
    occurrence.canonical.clone()
}

fn occurrence_ref(occurrence: UriOccurrence) -> (String, SourceRef) {
    (occurrence.raw, occurrence.source)
}

/// An empty index.
pub fn new_uri_index() -> UriIndex {
    Aggregator::new(occurrence_key, occurrence_ref)
}

impl Aggregator<UriOccurrence, String, (String, SourceRef)> {
    /// `(canonical, count)` pairs sorted by canonical URI ascending.
    pub fn sorted(&self) -> Vec<(String, usize)> {
        let mut pairs: Vec<(String, usize)> = self
            .counts()
            .map(|(uri, count, _)| (uri.clone(), count))
            .collect();
        pairs.sort_by(|a, b| a.0.cmp(&b.0));
        pairs
    }
}

/// Extracts and canonicalizes URIs from records.
#[derive(Clone)]
pub struct UriIndexer {
    strategy: Arc<dyn UriExtractionStrategy>,
    canonicalizer: Arc<Canonicalizer>,
}

impl UriIndexer {
    pub fn new(
        strategy: Arc<dyn UriExtractionStrategy>,
        canonicalizer: Arc<Canonicalizer>,
    ) -> Self {
        Self {
            strategy,
            canonicalizer,
        }
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    pub fn canonicalizer(&self) -> &Canonicalizer {
        &self.canonicalizer
    }

    /// Raw URIs of one record, in order.
    pub fn record_uris<R: ArchiveRecord>(&self, record: &R) -> Vec<String> {
        let mut uris: Vec<String> = record
            .leading_uris()
            .into_iter()
            .map(str::to_owned)
            .collect();
        if let Some(body) = record.body(self.strategy.body_format()) {
            uris.extend(self.strategy.extract(body));
        }
        uris
    }

    /// Canonicalized occurrences of one record, in order.
    pub fn occurrences<R: ArchiveRecord>(&self, record: &R) -> Vec<UriOccurrence> {
        let source = record.source_ref();
        self.record_uris(record)
            .into_iter()
            .map(|raw| UriOccurrence {
                canonical: self.canonicalizer.canonicalize(&raw),
                raw,
                source: source.clone(),
            })
            .collect()
    }

    /// Index a slice of records of one kind.
    pub fn index_records<R: ArchiveRecord>(&self, records: &[R]) -> UriIndex {
        let mut index = new_uri_index();
        for record in records {
            index.extend(self.occurrences(record));
        }
        index
    }

    /// Index a whole document: comments first, then submissions.
    pub fn index_document(&self, comments: &[Comment], submissions: &[Submission]) -> UriIndex {
        let mut index = self.index_records(comments);
        index.merge(self.index_records(submissions));
        tracing::debug!(
            "Indexed {} URI occurrences ({} distinct) with {} strategy",
            index.total(),
            index.len(),
            self.strategy.name()
        );
        index
    }
}

impl std::fmt::Debug for UriIndexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UriIndexer")
            .field("strategy", &self.strategy.name())
            .field("canonicalizer", &self.canonicalizer)
            .finish()
    }
}
