//! commark - scan, reflow and render source-code comments

use anyhow::Result;
use clap::Parser;

use commark::cli;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    let level = if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .format_timestamp(None)
        .init();

    cli::run(cli)
}
