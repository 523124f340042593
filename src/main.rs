//! `capsule-pack`: command-line driver for one-shot capsule assembly.
//!
//! Each input root is classified automatically: an existing capsule is
//! embedded opaquely, anything else is expanded as a directory tree.

use anyhow::Context;
use capsule::{build, is_capsule, InputDescriptor};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    name = "capsule-pack",
    version,
    about = "Assemble compiled outputs into a single reproducible capsule"
)]
struct Cli {
    /// Path of the capsule to create
    output: PathBuf,

    /// Input roots: existing capsules are embedded opaquely, directories
    /// are expanded recursively
    roots: Vec<PathBuf>,

    /// Base metadata record, a JSON object of string key/value pairs
    #[arg(short = 'm', long = "manifest")]
    manifest: Option<PathBuf>,

    /// Main entry point recorded in the metadata block
    #[arg(long = "main-entry")]
    main_entry: Option<String>,

    /// Store entries verbatim instead of compressing them
    #[arg(long)]
    store: bool,

    /// Keep source mtimes instead of the fixed canonical timestamp
    /// (output is no longer byte-reproducible)
    #[arg(long)]
    keep_timestamps: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    let inputs = cli
        .roots
        .iter()
        .map(|root| {
            if is_capsule(root) {
                InputDescriptor::NestedArchive { path: root.clone() }
            } else {
                InputDescriptor::DirectoryTree { root: root.clone() }
            }
        })
        .collect();

    build(
        &cli.output,
        cli.manifest.as_deref(),
        cli.main_entry.as_deref(),
        !cli.store,
        !cli.keep_timestamps,
        inputs,
    )
    .with_context(|| format!("failed to build {}", cli.output.display()))?;

    Ok(())
}
