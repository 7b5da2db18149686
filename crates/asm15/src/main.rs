//! CLI for the asm15 assembler.
//!
//! # Examples
//!
//! ```bash
//! # Assemble prog.as into prog.ob (and prog.ent / prog.ext when needed)
//! asm15 assemble prog
//!
//! # Assemble several files, keeping the macro-expanded .am stream
//! asm15 assemble --keep-expanded prog lib
//!
//! # Check a source file without writing anything
//! asm15 check prog.as
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::Result;

mod commands;
mod output;

use output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "asm15")]
#[command(author, version, about = "Assembler for the 15-bit educational machine", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Assemble source files into .ob, .ent, and .ext artifacts
    Assemble {
        /// Input file stems; <stem>.as is read (a trailing .as is allowed)
        #[arg(value_name = "STEM")]
        stems: Vec<String>,

        /// Write artifacts into this directory instead of next to the source
        #[arg(long, value_name = "DIR")]
        out_dir: Option<PathBuf>,

        /// Also write the macro-expanded intermediate stream (<stem>.am)
        #[arg(long)]
        keep_expanded: bool,

        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Check sources and report diagnostics without writing artifacts
    Check {
        /// Input source files (a bare stem is completed to <stem>.as)
        #[arg(value_name = "FILE")]
        files: Vec<String>,

        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Assemble {
            stems,
            out_dir,
            keep_expanded,
            format,
        } => commands::assemble::run(stems, out_dir, keep_expanded, OutputFormat::from_str(&format)),
        Commands::Check { files, format } => {
            commands::check::run(files, OutputFormat::from_str(&format))
        }
    }
}
