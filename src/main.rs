use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use gh_activity_importer::cli;

fn main() {
    let args = cli::Cli::parse();

    // Initialize logging; RUST_LOG overrides the --log-level flag
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)))
        .init();

    std::process::exit(cli::run(args));
}
