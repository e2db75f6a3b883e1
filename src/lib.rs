//! # redem
//!
//! Back up a reddit user's comments and submissions to a single JSON
//! archive, with a canonical, reference-counted index of every link they
//! posted, and render that archive as a standalone HTML page.
//!
//! The pure pipeline (projection, URI extraction, canonicalization,
//! counting, merging) lives in `redem-core`. This crate adds everything
//! that touches the outside world.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌─────────────────────┐   ┌────────────┐
//! │ RedditClient │──▶│      assemble       │──▶│ data.json  │
//! │  + HttpCache │   │ project → index (N) │   │  (archive) │
//! └──────────────┘   └─────────────────────┘   └─────┬──────┘
//!                                                    │
//!                        ┌───────────────┬───────────┤
//!                        ▼               ▼           ▼
//!                   ┌─────────┐    ┌──────────┐ ┌─────────┐
//!                   │  merge  │    │  report  │ │  uris   │
//!                   └─────────┘    └──────────┘ └─────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! redem backup someone                 # writes data.json
//! redem report -o summary.html         # HTML summary
//! redem uris --by freq --limit 20      # most-linked sites
//! redem merge old.json data.json -o all.json
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`client`] | Platform client trait and reddit implementation |
//! | [`cache`] | On-disk response cache |
//! | [`assemble`] | Backup orchestration and parallel indexing |
//! | [`archive`] | Archive file persistence |
//! | [`merge_cmd`] | Merging archive files |
//! | [`report`] | HTML report rendering |
//! | [`uris`] | Site-frequency table |
//! | [`progress`] | Backup progress on stderr |
//! | [`logging`] | `tracing` subscriber setup |

pub mod archive;
pub mod assemble;
pub mod cache;
pub mod client;
pub mod config;
pub mod logging;
pub mod merge_cmd;
pub mod progress;
pub mod report;
pub mod uris;
