//! # redem core
//!
//! Pure, synchronous logic for redem: archive models, record projection,
//! URI extraction, URI canonicalization, reference counting, and archive
//! merging.
//!
//! This crate performs no network, filesystem, or async work. Everything
//! that touches the outside world (the platform client, the response cache,
//! reading configuration tables, writing archives) lives in the `redem`
//! crate and hands plain values in here.
//!
//! ## Pipeline
//!
//! ```text
//! raw JSON ──▶ projector ──▶ Comment / Submission
//!                                  │
//!                     extract (markup | pattern)
//!                                  │
//!                            canonicalize
//!                                  │
//!                        aggregate (UriIndex) ──▶ uris [(canonical, count)]
//! ```

pub mod aggregate;
pub mod canonical;
pub mod errors;
pub mod extract;
pub mod frequency;
pub mod index;
pub mod merge;
pub mod models;
pub mod projector;

pub use aggregate::{group_and_count, Aggregator};
pub use canonical::{Canonicalizer, HostTables};
pub use errors::ArchiveError;
pub use extract::{
    ExtractionMode, MarkupAnchorStrategy, PatternStrategy, UriExtractionStrategy,
};
pub use index::{UriIndex, UriIndexer, UriOccurrence};
pub use merge::dedupe_by_id;
pub use models::{ArchiveDocument, ArchiveMeta, ArchiveRecord, Comment, Submission};
pub use projector::RecordProjector;
