use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod utils;

use commands::SourceArgs;

#[derive(Parser)]
#[command(name = "virtfile-cmd")]
#[command(about = "Serve byte ranges of virtual Parquet files built from NDJSON data")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the layout of the virtual file as JSON
    Inspect {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Produce the inclusive byte window [begin, end] of the virtual file
    Range {
        #[command(flatten)]
        source: SourceArgs,

        /// First byte of the window
        #[arg(long)]
        begin: u64,

        /// Last byte of the window (inclusive)
        #[arg(long)]
        end: u64,

        /// Write the bytes to this file instead of hex-dumping them to stdout
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Write the whole virtual file to disk
    Materialize {
        #[command(flatten)]
        source: SourceArgs,

        /// Output Parquet file path
        #[arg(short, long)]
        output: String,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Inspect { source } => commands::inspect::run(source),
        Commands::Range {
            source,
            begin,
            end,
            output,
        } => commands::range::run(source, begin, end, output),
        Commands::Materialize { source, output } => commands::materialize::run(source, output),
    }
}
