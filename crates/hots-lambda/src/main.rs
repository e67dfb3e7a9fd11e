//! hots2lambda - dump replay records as lambda log lines
//!
//! # Usage
//!
//! ```bash
//! # Every category, one line per record
//! hots2lambda --protocols ./protocols --all match.StormReplay
//!
//! # Event size summary only
//! hots2lambda --protocols ./protocols --stats match.StormReplay
//! ```
//!
//! The replay argument is a replay archive. A directory holding blobs
//! already extracted from one (`replay.header`, `replay.details`, ...) is
//! accepted too.

use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use hots_lambda::{open_replay, Category, Config, Request, Session, SessionOptions};
use hots_lambda_log::FlattenOptions;
use hots_lambda_protocol::ProtocolRegistry;

/// Convert replays into lambda log lines
#[derive(Parser)]
#[command(name = "hots2lambda")]
#[command(about = "Convert replays into lambda log lines")]
#[command(version)]
struct Cli {
    /// Replay archive, or a directory of blobs extracted from one
    replay: PathBuf,

    /// Print the protocol header
    #[arg(long)]
    header: bool,

    /// Print the game details
    #[arg(long)]
    details: bool,

    /// Print the init data
    #[arg(long)]
    initdata: bool,

    /// Print game events
    #[arg(long)]
    gameevents: bool,

    /// Print message events
    #[arg(long)]
    messageevents: bool,

    /// Print tracker events
    #[arg(long)]
    trackerevents: bool,

    /// Print attributes events
    #[arg(long)]
    attributeevents: bool,

    /// Print per event kind counts and sizes to stderr
    #[arg(long)]
    stats: bool,

    /// Print every category
    #[arg(long)]
    all: bool,

    /// Directory of protocol<BUILD>.json definitions
    #[arg(long, value_name = "DIR")]
    protocols: Option<PathBuf>,

    /// Settings file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Build used for headers and unknown builds
    #[arg(long, value_name = "BUILD")]
    fallback_build: Option<u32>,

    /// Separator between flat key segments
    #[arg(long, value_name = "SEP")]
    separator: Option<String>,

    /// Continue with the remaining categories when one fails to decode
    #[arg(long)]
    keep_going: bool,
}

impl Cli {
    fn request(&self) -> Request {
        if self.all {
            return Request {
                stats: self.stats,
                ..Request::all()
            };
        }
        let flags = [
            (self.header, Category::Header),
            (self.details, Category::Details),
            (self.initdata, Category::InitData),
            (self.gameevents, Category::GameEvents),
            (self.messageevents, Category::MessageEvents),
            (self.trackerevents, Category::TrackerEvents),
            (self.attributeevents, Category::AttributesEvents),
        ];
        Request {
            categories: flags
                .into_iter()
                .filter_map(|(on, category)| on.then_some(category))
                .collect(),
            stats: self.stats,
        }
    }

    /// Settings file values overridden by flags.
    fn settings(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };
        if let Some(dir) = &self.protocols {
            config.protocols_dir = Some(dir.clone());
        }
        if let Some(build) = self.fallback_build {
            config.fallback_build = build;
        }
        if let Some(separator) = &self.separator {
            config.separator = separator.clone();
        }
        config.keep_going |= self.keep_going;
        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.settings()?;
    let request = cli.request();
    if request.is_empty() {
        tracing::warn!("Nothing requested; pass --all or a category flag");
    }

    let Some(protocols_dir) = &config.protocols_dir else {
        bail!("no protocol definitions configured; pass --protocols <DIR> or set protocols_dir");
    };
    let registry = ProtocolRegistry::load_dir(protocols_dir, config.fallback_build)
        .with_context(|| format!("loading protocols from {}", protocols_dir.display()))?;
    let replay = open_replay(&cli.replay)?;

    let options = SessionOptions {
        flatten: FlattenOptions {
            separator: config.separator.clone(),
        },
        keep_going: config.keep_going,
    };
    let mut session = Session::new(&registry, options);
    let mut out = BufWriter::new(io::stdout().lock());
    let report = session
        .run(replay.as_ref(), &request, &mut out, &mut io::stderr())
        .with_context(|| format!("decoding {}", cli.replay.display()))?;
    out.flush()?;

    if report.fallback {
        tracing::warn!(
            "Build {} decoded with protocol {}; output is provisional",
            report.base_build,
            report.protocol_build
        );
    }
    if !report.failures.is_empty() {
        let failed: Vec<String> = report
            .failures
            .iter()
            .map(|f| f.category.to_string())
            .collect();
        bail!("failed to decode {}", failed.join(", "));
    }
    Ok(())
}
