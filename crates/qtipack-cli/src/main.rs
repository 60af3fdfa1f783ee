//! qtipack CLI: the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use qtipack_core::model::PackageFormat;

mod commands;
mod config;

#[derive(Parser)]
#[command(name = "qtipack", version, about = "QTI quiz package generator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a QTI package from a quiz file
    Build {
        /// Path to a .toml or .json quiz file
        #[arg(long)]
        quiz: PathBuf,

        /// Package format: qti21 or qti30
        #[arg(long, value_parser = parse_format)]
        format: Option<PackageFormat>,

        /// Output directory for the package tree
        #[arg(long)]
        output: Option<PathBuf>,

        /// Directory holding embedded assets
        #[arg(long)]
        assets: Option<PathBuf>,

        /// Fail on colliding identifier hints
        #[arg(long)]
        strict: bool,

        /// Let the delivery engine shuffle choices
        #[arg(long)]
        shuffle: bool,

        /// Fixed identifier namespace, for reproducible output
        #[arg(long)]
        namespace: Option<String>,

        /// Print the package summary as JSON
        #[arg(long)]
        json: bool,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Validate quiz files and self-check their answer keys
    Validate {
        /// Path to quiz file or directory
        #[arg(long)]
        quiz: PathBuf,

        /// Directory holding embedded assets
        #[arg(long)]
        assets: Option<PathBuf>,
    },

    /// Create starter config and example quiz
    Init,
}

fn parse_format(s: &str) -> Result<PackageFormat, String> {
    s.parse()
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("qtipack=info")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Build {
            quiz,
            format,
            output,
            assets,
            strict,
            shuffle,
            namespace,
            json,
            config,
        } => commands::build::execute(commands::build::BuildArgs {
            quiz,
            format,
            output,
            assets,
            strict,
            shuffle,
            namespace,
            json,
            config,
        }),
        Commands::Validate { quiz, assets } => commands::validate::execute(quiz, assets),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
