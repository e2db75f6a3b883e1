//! Link index overview for an archive.
//!
//! Prints the archive's size and the site-frequency table, ranked either
//! by count or by `(host, path, query)`. Used by `redem uris`.

use anyhow::Result;
use redem_core::frequency::{site_frequencies_weighted, SiteFrequencies, SiteKey};
use redem_core::ArchiveDocument;
use std::path::Path;

use crate::archive;
use crate::progress::format_number;

/// Ranking used by `redem uris --by`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SiteOrder {
    Freq,
    Site,
}

/// Load the archive at `path` and print its site frequencies.
pub fn run_uris(path: &Path, by: SiteOrder, limit: Option<usize>) -> Result<()> {
    let doc = archive::load(path)?;
    print!("{}", render_table(&doc, path, by, limit));
    Ok(())
}

fn frequencies(doc: &ArchiveDocument) -> SiteFrequencies {
    site_frequencies_weighted(doc.uris.iter().map(|(uri, n)| (uri.as_str(), *n)))
}

/// Text table for the archive at `path`.
pub fn render_table(
    doc: &ArchiveDocument,
    path: &Path,
    by: SiteOrder,
    limit: Option<usize>,
) -> String {
    let freq = frequencies(doc);
    let occurrences: usize = doc.uris.iter().map(|(_, n)| n).sum();

    let mut out = String::new();
    out.push_str("redem: URI index\n");
    out.push_str("=================\n\n");
    out.push_str(&format!("  Archive:     {}\n", path.display()));
    out.push_str(&format!("  Username:    {}\n", doc.meta.username));
    out.push_str(&format!("  Comments:    {}\n", format_number(doc.comments.len() as u64)));
    out.push_str(&format!("  Submissions: {}\n", format_number(doc.submissions.len() as u64)));
    out.push_str(&format!(
        "  URIs:        {} distinct, {} occurrences\n",
        format_number(doc.uris.len() as u64),
        format_number(occurrences as u64)
    ));

    let rows: &[(SiteKey, usize)] = match by {
        SiteOrder::Freq => &freq.by_freq,
        SiteOrder::Site => &freq.by_site,
    };
    let shown = limit.unwrap_or(rows.len()).min(rows.len());

    if shown > 0 {
        out.push('\n');
        out.push_str(&format!("  {:>7}   {:<32} {}\n", "COUNT", "HOST", "PATH"));
        out.push_str(&format!("  {}\n", "-".repeat(76)));
        for (key, count) in &rows[..shown] {
            let mut location = key.path.clone();
            if !key.query.is_empty() {
                location.push('?');
                location.push_str(&key.query);
            }
            out.push_str(&format!(
                "  {:>7}   {:<32} {}\n",
                format_number(*count as u64),
                if key.host.is_empty() { "-" } else { key.host.as_str() },
                location
            ));
        }
        if shown < rows.len() {
            out.push_str(&format!("  ... {} more\n", rows.len() - shown));
        }
    }

    out.push('\n');
    out
}
