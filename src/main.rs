//! # redem CLI
//!
//! Back up a reddit user's history, then inspect, merge, or render the
//! resulting archive.
//!
//! ## Usage
//!
//! ```bash
//! redem --config ./config/redem.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `redem backup <user>...` | Fetch comments and submissions and write an archive |
//! | `redem report` | Render an archive as a standalone HTML page |
//! | `redem merge <in>... -o <out>` | Merge archives, newest edit wins |
//! | `redem uris` | Print the site-frequency table of an archive |
//!
//! ## Examples
//!
//! ```bash
//! # Back up the 500 newest comments and submissions
//! redem backup someone --limit 500
//!
//! # Back up two users into data_alice.json and data_bob.json
//! redem backup alice bob --json data.json
//!
//! # Render the archive with assets served from a CDN
//! redem report --json data.json -o summary.html --media-url https://cdn.example/redem/
//! ```

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use redem::client::RedditClient;
use redem::uris::SiteOrder;
use redem::{assemble, config, logging, merge_cmd, progress, report, uris};

const DEFAULT_CONFIG: &str = "./config/redem.toml";

/// redem: back up reddit comments and submissions with a canonical link index.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. When the flag is omitted and `./config/redem.toml` doesn't exist,
/// built-in defaults are used.
#[derive(Parser)]
#[command(
    name = "redem",
    about = "Back up reddit comments and submissions to a JSON archive with a canonical link index",
    version
)]
struct Cli {
    /// Path to configuration file (TOML). Defaults to `./config/redem.toml`.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log debug output to stderr.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors; disable progress output.
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Fetch a user's comments and submissions and write an archive.
    ///
    /// With several usernames, each archive is written next to `--json`
    /// as `{stem}_{username}.json`. A failing user doesn't stop the others.
    Backup {
        /// One or more reddit usernames.
        #[arg(required = true)]
        usernames: Vec<String>,

        /// Maximum number of comments and of submissions to fetch.
        #[arg(long)]
        limit: Option<usize>,

        /// Archive path. Defaults to `[archive].path`.
        #[arg(long)]
        json: Option<PathBuf>,
    },

    /// Render an archive as a standalone HTML page.
    Report {
        /// Archive path. Defaults to `[archive].path`.
        #[arg(long)]
        json: Option<PathBuf>,

        /// Output HTML path. Writes to stdout when omitted.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Prefix for stylesheet and static assets.
        #[arg(long)]
        media_url: Option<String>,

        /// Username shown in the report, overriding `_meta.username`.
        #[arg(long)]
        username: Option<String>,
    },

    /// Merge archives into one; the newest edit of each record wins.
    Merge {
        /// Input archive paths, in priority order.
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output archive path.
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Print the site-frequency table of an archive.
    Uris {
        /// Archive path. Defaults to `[archive].path`.
        #[arg(long)]
        json: Option<PathBuf>,

        /// Ranking: by descending count or by host/path/query.
        #[arg(long, value_enum, default_value = "freq")]
        by: SiteOrder,

        /// Show at most this many rows.
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.quiet);

    let cfg = match &cli.config {
        Some(path) => config::load_or_default(path, true)?,
        None => config::load_or_default(Path::new(DEFAULT_CONFIG), false)?,
    };

    match cli.command {
        Commands::Backup {
            usernames,
            limit,
            json,
        } => {
            let output = json.unwrap_or_else(|| cfg.archive.path.clone());
            let client = RedditClient::from_config(&cfg)?;
            let reporter = progress::reporter(cli.quiet);
            assemble::run_backup(&cfg, &client, &usernames, limit, &output, reporter.as_ref())
                .await?;
        }
        Commands::Report {
            json,
            output,
            media_url,
            username,
        } => {
            let input = json.unwrap_or_else(|| cfg.archive.path.clone());
            report::run_report(&cfg.report, &input, output.as_deref(), media_url, username)?;
        }
        Commands::Merge { inputs, output } => {
            merge_cmd::run_merge(&cfg, &inputs, &output)?;
        }
        Commands::Uris { json, by, limit } => {
            let input = json.unwrap_or_else(|| cfg.archive.path.clone());
            uris::run_uris(&input, by, limit)?;
        }
    }

    Ok(())
}
