//! review-qa - extract metadata and query answers from CSV review exports
//!
//! A single-binary CLI: index CSV rows as documents, embed them, answer
//! queries per document and write everything to a CSV report.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use review_qa::cli::Cli;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse_from(std::env::args_os());

    let mut filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "review_qa=info,warn".into());
    if cli.debug {
        // Applies on top of RUST_LOG as well
        filter = filter.add_directive("review_qa::pipeline=debug".parse()?);
    }
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    cli.run().await
}
