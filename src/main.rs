#![forbid(unsafe_code)]

mod ops;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "pakutil", version, about = "Inspect and edit PACK v1 archives")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Add files (directories are walked recursively) and rewrite the pak.
    Add {
        pak: PathBuf,
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Remove named entries and rewrite the pak.
    Remove {
        pak: PathBuf,
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Report whether each name is present and at which index.
    Check {
        pak: PathBuf,
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// List every entry.
    List {
        pak: PathBuf,
        /// Print offsets, sizes and content hashes too.
        #[arg(long, default_value_t = false)]
        verbose: bool,
    },

    /// Print the raw bytes of named entries.
    Data {
        pak: PathBuf,
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Extract entries (all of them if no names are given) into a directory.
    Extract {
        pak: PathBuf,
        output: PathBuf,
        names: Vec<String>,
    },

    /// Verify table layout and payload bounds.
    Verify { pak: PathBuf },
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

    let res = match cli.cmd {
        Command::Add { pak, files } => ops::add(&pak, &files),
        Command::Remove { pak, names } => ops::remove(&pak, &names),
        Command::Check { pak, names } => ops::check(&pak, &names),
        Command::List { pak, verbose } => ops::list(&pak, verbose),
        Command::Data { pak, names } => ops::data(&pak, &names),
        Command::Extract { pak, output, names } => ops::extract(&pak, &output, &names),
        Command::Verify { pak } => ops::verify(&pak),
    };

    if let Err(e) = res {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
