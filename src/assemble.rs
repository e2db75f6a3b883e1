//! Archive assembly: fetch → project → index → document.
//!
//! Coordinates the full backup flow for one user. URI extraction and
//! canonicalization are CPU-bound and independent per record, so they run
//! on blocking worker tasks over contiguous chunks of records. The partial
//! indexes are merged back in chunk order (comments first, then
//! submissions), which gives exactly the sequential result.

use anyhow::{bail, Context, Result};
use chrono::Utc;
use redem_core::canonical::{parse_aliases, parse_https_hosts};
use redem_core::index::new_uri_index;
use redem_core::models::ArchiveRecord;
use redem_core::{
    dedupe_by_id, ArchiveDocument, ArchiveMeta, Canonicalizer, Comment, HostTables,
    RecordProjector, Submission, UriIndex, UriIndexer,
};
use std::path::Path;
use std::sync::Arc;

use crate::archive;
use crate::client::PlatformClient;
use crate::config::Config;
use crate::progress::{BackupProgressEvent, BackupProgressReporter};

/// Build the URI indexer described by the config.
///
/// Missing alias or https-host files give empty tables.
pub fn indexer_from_config(config: &Config) -> Result<UriIndexer> {
    let aliases = read_table(&config.canonical.host_aliases)?
        .map(|text| parse_aliases(&text))
        .unwrap_or_default();
    let https_hosts = read_table(&config.canonical.https_hosts)?
        .map(|text| parse_https_hosts(&text))
        .unwrap_or_default();
    tracing::debug!(
        "Loaded {} host aliases and {} https hosts",
        aliases.len(),
        https_hosts.len()
    );

    let canonicalizer = Canonicalizer::new(
        HostTables::new(aliases, https_hosts),
        &config.canonical.platform_host,
        config.canonical.relative_prefixes.clone(),
    );
    Ok(UriIndexer::new(
        Arc::from(config.extract.mode.strategy()),
        Arc::new(canonicalizer),
    ))
}

fn read_table(path: &Path) -> Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No table at {}; using an empty one", path.display());
            Ok(None)
        }
        Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
    }
}

/// Fetch, project and index one user's history.
pub async fn assemble(
    client: &dyn PlatformClient,
    username: &str,
    limit: Option<usize>,
    indexer: &UriIndexer,
    workers: usize,
    progress: &dyn BackupProgressReporter,
) -> Result<ArchiveDocument> {
    progress.report(BackupProgressEvent::Fetching {
        user: username.to_string(),
        subset: "comments",
    });
    let raw_comments = client
        .fetch_comments(username, limit)
        .await
        .with_context(|| format!("Failed to fetch comments for {}", username))?;
    progress.report(BackupProgressEvent::Fetched {
        user: username.to_string(),
        subset: "comments",
        count: raw_comments.len(),
    });

    progress.report(BackupProgressEvent::Fetching {
        user: username.to_string(),
        subset: "submissions",
    });
    let raw_submissions = client
        .fetch_submissions(username, limit)
        .await
        .with_context(|| format!("Failed to fetch submissions for {}", username))?;
    progress.report(BackupProgressEvent::Fetched {
        user: username.to_string(),
        subset: "submissions",
        count: raw_submissions.len(),
    });

    let mut projector = RecordProjector::new();
    let comments: Vec<Comment> = raw_comments
        .iter()
        .map(|raw| projector.project_comment(raw))
        .collect();
    let submissions: Vec<Submission> = raw_submissions
        .iter()
        .map(|raw| projector.project_submission(raw))
        .collect();

    // Listings can shift while paging, so the same record may come back twice.
    let fetched = (comments.len(), submissions.len());
    let comments = dedupe_by_id(comments);
    let submissions = dedupe_by_id(submissions);
    if fetched != (comments.len(), submissions.len()) {
        tracing::debug!(
            "{}: dropped {} repeated records",
            username,
            fetched.0 + fetched.1 - comments.len() - submissions.len()
        );
    }

    let comments = Arc::new(comments);
    let submissions = Arc::new(submissions);
    let index = index_parallel(
        indexer,
        comments.clone(),
        submissions.clone(),
        workers,
        username,
        progress,
    )
    .await?;

    let comments = Arc::try_unwrap(comments).unwrap_or_else(|shared| (*shared).clone());
    let submissions = Arc::try_unwrap(submissions).unwrap_or_else(|shared| (*shared).clone());

    tracing::info!(
        "{}: {} comments, {} submissions, {} URIs ({} distinct)",
        username,
        comments.len(),
        submissions.len(),
        index.total(),
        index.len()
    );

    Ok(ArchiveDocument {
        meta: ArchiveMeta::new(username, Utc::now()),
        comments,
        submissions,
        uris: index.sorted(),
    })
}

/// Back up each user in turn and write their archives.
///
/// A single user writes to `output`; several users each get
/// `{stem}_{username}.{ext}` next to it. One user's failure is logged and
/// the rest still run; the command fails at the end if any user failed.
pub async fn run_backup(
    config: &Config,
    client: &dyn PlatformClient,
    usernames: &[String],
    limit: Option<usize>,
    output: &Path,
    progress: &dyn BackupProgressReporter,
) -> Result<()> {
    if usernames.is_empty() {
        bail!("No usernames given");
    }
    let indexer = indexer_from_config(config)?;

    let mut failed: Vec<&str> = Vec::new();
    for username in usernames {
        let path = if usernames.len() == 1 {
            output.to_path_buf()
        } else {
            archive::per_user_path(output, username)
        };

        let result = async {
            let doc = assemble(
                client,
                username,
                limit,
                &indexer,
                config.extract.workers,
                progress,
            )
            .await?;
            archive::dump(&doc, &path)?;
            Ok::<_, anyhow::Error>(doc)
        }
        .await;

        match result {
            Ok(doc) => println!(
                "backup {}: {} comments, {} submissions, {} uris -> {}",
                username,
                doc.comments.len(),
                doc.submissions.len(),
                doc.uris.len(),
                path.display()
            ),
            Err(e) => {
                tracing::error!("backup {} failed: {:#}", username, e);
                failed.push(username);
            }
        }
    }

    if !failed.is_empty() {
        bail!("backup failed for: {}", failed.join(", "));
    }
    Ok(())
}

/// Index comments then submissions across `workers` blocking tasks.
pub async fn index_parallel(
    indexer: &UriIndexer,
    comments: Arc<Vec<Comment>>,
    submissions: Arc<Vec<Submission>>,
    workers: usize,
    username: &str,
    progress: &dyn BackupProgressReporter,
) -> Result<UriIndex> {
    let total = comments.len() + submissions.len();
    let mut handles = Vec::new();
    spawn_chunks(&mut handles, indexer, &comments, workers);
    spawn_chunks(&mut handles, indexer, &submissions, workers);

    let mut index = new_uri_index();
    let mut done = 0usize;
    for handle in handles {
        let (records, partial) = handle.await.context("URI indexing task failed")?;
        index.merge(partial);
        done += records;
        progress.report(BackupProgressEvent::Indexing {
            user: username.to_string(),
            n: done,
            total,
        });
    }
    Ok(index)
}

type IndexTask = tokio::task::JoinHandle<(usize, UriIndex)>;

fn spawn_chunks<R>(
    handles: &mut Vec<IndexTask>,
    indexer: &UriIndexer,
    records: &Arc<Vec<R>>,
    workers: usize,
) where
    R: ArchiveRecord + Send + Sync + 'static,
{
    if records.is_empty() {
        return;
    }
    let chunk_size = records.len().div_ceil(workers.max(1));
    let mut start = 0;
    while start < records.len() {
        let end = (start + chunk_size).min(records.len());
        let indexer = indexer.clone();
        let records = Arc::clone(records);
        handles.push(tokio::task::spawn_blocking(move || {
            let slice = &records[start..end];
            (slice.len(), indexer.index_records(slice))
        }));
        start = end;
    }
}
