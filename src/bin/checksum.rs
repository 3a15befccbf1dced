#![forbid(unsafe_code)]

use clap::Parser;
use std::path::PathBuf;

use pakutil::asset;
use pakutil::pak::{hex64, PakResult};

#[derive(Debug, Parser)]
#[command(name = "checksum", version, about = "Print the content hash of each file")]
struct Cli {
    /// Files to hash.
    #[arg(required = true)]
    paths: Vec<PathBuf>,
}

fn run(paths: &[PathBuf]) -> PakResult<()> {
    for p in paths {
        let a = asset::load(p)?;
        println!("{}: {}", p.display(), hex64(a.hash()));
    }
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(&cli.paths) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
