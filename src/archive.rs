//! Reading and writing archive files.
//!
//! An archive is always written whole: the document is serialized to a
//! string first and then written in one call, so a serialization failure
//! never leaves a truncated file behind.

use anyhow::{Context, Result};
use redem_core::ArchiveDocument;
use std::path::{Path, PathBuf};

/// Write `doc` to `path` as pretty JSON, creating parent directories.
pub fn dump(doc: &ArchiveDocument, path: &Path) -> Result<()> {
    let json = doc
        .to_json_pretty()
        .context("Failed to serialize archive")?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;

    tracing::info!(
        "Wrote {} comments, {} submissions, {} URIs to {}",
        doc.comments.len(),
        doc.submissions.len(),
        doc.uris.len(),
        path.display()
    );
    Ok(())
}

/// Read and validate the archive at `path`.
pub fn load(path: &Path) -> Result<ArchiveDocument> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read archive: {}", path.display()))?;
    ArchiveDocument::from_json(&text)
        .with_context(|| format!("Invalid archive: {}", path.display()))
}

/// Output path for one user when several are backed up at once:
/// `dir/data.json` → `dir/data_{username}.json`.
pub fn per_user_path(base: &Path, username: &str) -> PathBuf {
    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "data".to_string());
    let file_name = match base.extension() {
        Some(ext) => format!("{}_{}.{}", stem, username, ext.to_string_lossy()),
        None => format!("{}_{}", stem, username),
    };
    base.with_file_name(file_name)
}
