//! Standalone HTML summary of an archive.
//!
//! The page lists the archive's comments and submissions newest first,
//! followed by the URI index and the site-frequency rankings. Record HTML
//! bodies are embedded as-is (they are the platform's own rendered
//! markdown); every other value is escaped.

use anyhow::{Context, Result};
use chrono::DateTime;
use html_escape::{encode_double_quoted_attribute, encode_text};
use redem_core::frequency::{site_frequencies_weighted, SiteFrequencies};
use redem_core::{ArchiveDocument, Comment, Submission};
use std::fmt::Write;
use std::path::Path;

use crate::archive;
use crate::config::ReportConfig;

/// Presentation settings for [`HtmlReport`].
#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub title: String,
    /// Overrides `_meta.username` when set.
    pub username: Option<String>,
    /// Prefix for the stylesheet and other static assets.
    pub media_url: String,
    /// Base that site-relative permalinks are linked against.
    pub platform_url: String,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self::from(&ReportConfig::default())
    }
}

impl From<&ReportConfig> for ReportOptions {
    fn from(cfg: &ReportConfig) -> Self {
        Self {
            title: cfg.title.clone(),
            username: None,
            media_url: cfg.media_url.clone(),
            platform_url: "https://www.reddit.com".to_string(),
        }
    }
}

/// Renders an [`ArchiveDocument`] to a single HTML page.
pub struct HtmlReport;

impl HtmlReport {
    pub fn render(doc: &ArchiveDocument, options: &ReportOptions) -> String {
        let mut out = String::with_capacity(16 * 1024);
        // Writing into a String cannot fail.
        let _ = render_into(&mut out, doc, options);
        out
    }
}

/// Render the archive at `input` to `output`, or to stdout.
pub fn run_report(
    config: &ReportConfig,
    input: &Path,
    output: Option<&Path>,
    media_url: Option<String>,
    username: Option<String>,
) -> Result<()> {
    let doc = archive::load(input)?;
    let mut options = ReportOptions::from(config);
    if let Some(media_url) = media_url {
        options.media_url = media_url;
    }
    options.username = username;

    let html = HtmlReport::render(&doc, &options);
    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, &html)
                .with_context(|| format!("Failed to write report: {}", path.display()))?;
            eprintln!("Wrote report for {} to {}", input.display(), path.display());
        }
        None => {
            print!("{}", html);
        }
    }
    Ok(())
}

fn render_into(
    out: &mut String,
    doc: &ArchiveDocument,
    options: &ReportOptions,
) -> std::fmt::Result {
    let username = options
        .username
        .as_deref()
        .filter(|u| !u.is_empty())
        .unwrap_or(&doc.meta.username);
    let title = encode_text(&options.title);

    writeln!(out, "<!DOCTYPE html>")?;
    writeln!(out, "<html lang=\"en\">")?;
    writeln!(out, "<head>")?;
    writeln!(out, "<meta charset=\"utf-8\">")?;
    writeln!(out, "<title>{} - {}</title>", title, encode_text(username))?;
    writeln!(
        out,
        "<link rel=\"stylesheet\" href=\"{}redem.css\">",
        encode_double_quoted_attribute(&options.media_url)
    )?;
    writeln!(out, "</head>")?;
    writeln!(out, "<body>")?;
    writeln!(out, "<h1>{}</h1>", title)?;

    writeln!(out, "<section id=\"meta\">")?;
    writeln!(out, "<dl>")?;
    writeln!(out, "<dt>username</dt><dd>{}</dd>", encode_text(username))?;
    writeln!(out, "<dt>date_utc</dt><dd>{}</dd>", encode_text(&doc.meta.date_utc))?;
    writeln!(out, "<dt>comments</dt><dd>{}</dd>", doc.comments.len())?;
    writeln!(out, "<dt>submissions</dt><dd>{}</dd>", doc.submissions.len())?;
    writeln!(out, "<dt>uris</dt><dd>{}</dd>", doc.uris.len())?;
    if let Some(sources) = &doc.meta.merged_from {
        let names: Vec<String> = sources.keys().map(|k| encode_text(k).into_owned()).collect();
        writeln!(out, "<dt>merged_from</dt><dd>{}</dd>", names.join(", "))?;
    }
    writeln!(out, "</dl>")?;
    writeln!(out, "</section>")?;

    writeln!(out, "<section id=\"comments\">")?;
    writeln!(out, "<h2>comments</h2>")?;
    for comment in &doc.comments {
        render_comment(out, comment, options)?;
    }
    writeln!(out, "</section>")?;

    writeln!(out, "<section id=\"submissions\">")?;
    writeln!(out, "<h2>submissions</h2>")?;
    for submission in &doc.submissions {
        render_submission(out, submission, options)?;
    }
    writeln!(out, "</section>")?;

    render_uris(out, doc)?;

    let freq = site_frequencies_weighted(doc.uris.iter().map(|(uri, n)| (uri.as_str(), *n)));
    render_frequencies(out, &freq)?;

    writeln!(out, "</body>")?;
    writeln!(out, "</html>")
}

fn render_comment(out: &mut String, c: &Comment, options: &ReportOptions) -> std::fmt::Result {
    writeln!(
        out,
        "<article class=\"comment\" id=\"comment-{}\">",
        encode_double_quoted_attribute(&c.id)
    )?;
    writeln!(
        out,
        "<header><a href=\"{}\">{}</a> in r/{} &middot; {} &middot; score {}</header>",
        encode_double_quoted_attribute(&absolute_link(&c.permalink, options)),
        encode_text(&c.link_title),
        encode_text(&c.subreddit),
        format_timestamp(c.created_utc),
        c.score
    )?;
    if let Some(edited) = c.edited {
        writeln!(out, "<p class=\"edited\">edited {}</p>", format_timestamp(edited))?;
    }
    match c.body_html.as_deref().filter(|h| !h.is_empty()) {
        Some(html) => render_body(out, html)?,
        None => {
            writeln!(out, "<div class=\"body\"><p>{}</p></div>", encode_text(&c.body))?;
        }
    }
    writeln!(out, "</article>")
}

fn render_submission(
    out: &mut String,
    s: &Submission,
    options: &ReportOptions,
) -> std::fmt::Result {
    writeln!(
        out,
        "<article class=\"submission\" id=\"submission-{}\">",
        encode_double_quoted_attribute(&s.id)
    )?;
    let target = s.url.as_deref().filter(|u| !u.is_empty()).unwrap_or(&s.permalink);
    writeln!(
        out,
        "<header><a href=\"{}\">{}</a> <span class=\"domain\">({})</span></header>",
        encode_double_quoted_attribute(&absolute_link(target, options)),
        encode_text(&s.title),
        encode_text(&s.domain)
    )?;
    writeln!(
        out,
        "<p class=\"byline\">r/{} &middot; {} &middot; score {} &middot; <a href=\"{}\">{} comments</a></p>",
        encode_text(&s.subreddit),
        format_timestamp(s.created_utc),
        s.score,
        encode_double_quoted_attribute(&absolute_link(&s.permalink, options)),
        s.num_comments
    )?;
    if let Some(html) = s.selftext_html.as_deref().filter(|h| !h.is_empty()) {
        render_body(out, html)?;
    }
    writeln!(out, "</article>")
}

fn render_body(out: &mut String, html: &str) -> std::fmt::Result {
    writeln!(
        out,
        "<div class=\"body\" data-charcount=\"{}\">{}</div>",
        html.chars().count(),
        html
    )
}

fn render_uris(out: &mut String, doc: &ArchiveDocument) -> std::fmt::Result {
    writeln!(out, "<section id=\"uris\">")?;
    writeln!(out, "<h2>uris</h2>")?;
    writeln!(out, "<table>")?;
    writeln!(out, "<tr><th>count</th><th>uri</th></tr>")?;
    for (uri, count) in &doc.uris {
        writeln!(
            out,
            "<tr><td>{}</td><td><a href=\"{}\">{}</a></td></tr>",
            count,
            encode_double_quoted_attribute(uri),
            encode_text(uri)
        )?;
    }
    writeln!(out, "</table>")?;
    writeln!(out, "</section>")
}

fn render_frequencies(out: &mut String, freq: &SiteFrequencies) -> std::fmt::Result {
    writeln!(out, "<section id=\"sites\">")?;
    writeln!(out, "<h2>sites by frequency</h2>")?;
    writeln!(out, "<table>")?;
    writeln!(out, "<tr><th>count</th><th>host</th><th>path</th><th>query</th></tr>")?;
    for (key, count) in &freq.by_freq {
        writeln!(
            out,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            count,
            encode_text(&key.host),
            encode_text(&key.path),
            encode_text(&key.query)
        )?;
    }
    writeln!(out, "</table>")?;
    writeln!(out, "</section>")
}

fn absolute_link(link: &str, options: &ReportOptions) -> String {
    if link.starts_with('/') && !link.starts_with("//") {
        format!("{}{}", options.platform_url.trim_end_matches('/'), link)
    } else {
        link.to_string()
    }
}

/// Epoch seconds as `%Y-%m-%d-%H:%M:%S` (UTC); empty for zero.
pub fn format_timestamp(ts: f64) -> String {
    if ts <= 0.0 || !ts.is_finite() {
        return String::new();
    }
    DateTime::from_timestamp(ts.trunc() as i64, 0)
        .map(|dt| dt.format("%Y-%m-%d-%H:%M:%S").to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use redem_core::ArchiveMeta;
    use serde_json::json;

    fn doc() -> ArchiveDocument {
        ArchiveDocument {
            meta: ArchiveMeta {
                date_utc: "2024-01-01 00:00:00.000000".into(),
                username: "someone".into(),
                merged_from: None,
            },
            comments: vec![serde_json::from_value(json!({
                "id": "c1",
                "link_title": "Fish & <Chips>",
                "body_html": "<div class=\"md\"><p>see <a href=\"http://a.example/\">a</a></p></div>",
                "created_utc": 1700000000.0,
                "permalink": "/r/food/comments/1/fish/c1",
                "subreddit": "food"
            }))
            .unwrap()],
            submissions: vec![serde_json::from_value(json!({
                "id": "s1",
                "title": "A link",
                "url": "http://a.example/",
                "permalink": "/r/food/comments/2/a_link/",
                "created_utc": 1700000100.0
            }))
            .unwrap()],
            uris: vec![
                ("http://a.example/".into(), 2),
                ("http://www.reddit.com/r/food/comments/2/a_link/".into(), 1),
            ],
        }
    }

    #[test]
    fn test_render_contains_records_and_index() {
        let html = HtmlReport::render(&doc(), &ReportOptions::default());
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<title>redem_summary - someone</title>"));
        assert!(html.contains("Fish &amp; &lt;Chips&gt;"));
        assert!(html.contains("<a href=\"http://a.example/\">a</a>"), "body html kept as markup");
        assert!(html.contains("https://www.reddit.com/r/food/comments/1/fish/c1"));
        assert!(html.contains("2023-11-14-22:13:20"));
        assert!(html.contains("<td>2</td><td><a href=\"http://a.example/\">"));
        assert!(html.contains("href=\"static/redem.css\""));
    }

    #[test]
    fn test_username_override_and_escape() {
        let options = ReportOptions {
            username: Some("<b>x</b>".into()),
            ..ReportOptions::default()
        };
        let html = HtmlReport::render(&doc(), &options);
        assert!(html.contains("&lt;b&gt;x&lt;/b&gt;"));
        assert!(!html.contains("<b>x</b>"));
    }

    #[test]
    fn test_empty_archive_renders() {
        let empty = ArchiveDocument {
            meta: ArchiveMeta {
                date_utc: String::new(),
                username: String::new(),
                merged_from: None,
            },
            comments: Vec::new(),
            submissions: Vec::new(),
            uris: Vec::new(),
        };
        let html = HtmlReport::render(&empty, &ReportOptions::default());
        assert!(html.trim_end().ends_with("</html>"));
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0.0), "");
        assert_eq!(format_timestamp(1700000000.5), "2023-11-14-22:13:20");
    }
}
