//! sigbridge command-line tool
//!
//! Inspects signature payloads offline: the same grammar and name index
//! the bridge uses at runtime, without a live object system.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use sigbridge_cli::commands::{self, PayloadSource};
use sigbridge_cli::output::{init_logging, level_for, resolve_color_choice, StyledOutput};

#[derive(Parser)]
#[command(name = "sigbridge")]
#[command(about = "Inspect runtime signature payloads", long_about = None)]
#[command(version)]
struct Cli {
    /// Color output: auto, always, never
    #[arg(long, global = true)]
    color: Option<String>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a payload and print its signature dictionary
    Dump {
        /// Payload file
        file: PathBuf,
        /// File is a zlib stream
        #[arg(short = 'z', long)]
        compressed: bool,
        /// Declared module name
        #[arg(short, long)]
        module: Option<String>,
        /// Qualified class name (payload describes a module otherwise)
        #[arg(short, long)]
        class: Option<String>,
        /// Emit JSON
        #[arg(long)]
        json: bool,
    },

    /// Render a payload as stub declarations
    Stub {
        /// Payload file
        file: PathBuf,
        /// File is a zlib stream
        #[arg(short = 'z', long)]
        compressed: bool,
    },

    /// Display build and environment info
    Info,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let choice = resolve_color_choice(cli.color.as_deref());
    init_logging(level_for(cli.verbose, cli.quiet), choice);
    let mut out = StyledOutput::new(choice);

    match cli.command {
        Commands::Dump {
            file,
            compressed,
            module,
            class,
            json,
        } => {
            let source = PayloadSource {
                file: &file,
                compressed,
                module: module.as_deref(),
                class: class.as_deref(),
            };
            commands::dump::execute(&source, json, &mut out)?;
        }

        Commands::Stub { file, compressed } => {
            let source = PayloadSource {
                file: &file,
                compressed,
                module: None,
                class: None,
            };
            commands::stub::execute(&source, &mut out)?;
        }

        Commands::Info => {
            commands::info::execute()?;
        }
    }

    Ok(())
}
