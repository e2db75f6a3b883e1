//! `redem merge`: combine archive files into one.

use anyhow::{bail, Result};
use chrono::Utc;
use redem_core::merge::merge_documents;
use redem_core::ArchiveDocument;
use std::path::{Path, PathBuf};

use crate::archive;
use crate::assemble::indexer_from_config;
use crate::config::Config;

/// Load every input, merge them, and write the result to `output`.
///
/// Inputs are keyed in `_meta.merged_from` by their file name.
pub fn run_merge(config: &Config, inputs: &[PathBuf], output: &Path) -> Result<()> {
    if inputs.is_empty() {
        bail!("merge needs at least one input archive");
    }

    let mut sources: Vec<(String, ArchiveDocument)> = Vec::with_capacity(inputs.len());
    for path in inputs {
        let doc = archive::load(path)?;
        let mut name = source_name(path);
        if sources.iter().any(|(seen, _)| *seen == name) {
            name = path.display().to_string();
        }
        sources.push((name, doc));
    }

    let indexer = indexer_from_config(config)?;
    let merged = merge_documents(sources, &indexer, Utc::now())?;
    archive::dump(&merged, output)?;

    println!(
        "merged {} archives: {} comments, {} submissions, {} uris -> {}",
        inputs.len(),
        merged.comments.len(),
        merged.submissions.len(),
        merged.uris.len(),
        output.display()
    );
    Ok(())
}

fn source_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
