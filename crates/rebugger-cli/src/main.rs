//! Rebugger CLI entry point
//!
//! Loads script files as tracked source and drives the capture core.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use rebugger_core::RebugConfig;

mod commands;
mod error;
mod logging;

use commands::*;
use error::CliErrorHandler;

//-----------------------------------------------------------------------------
// Command Definition
//-----------------------------------------------------------------------------

/// Rebugger command-line interface
///
/// Captures the arguments of a marked call or of every frame of a failing
/// command and prints them as editable replay blocks
#[derive(Debug, Parser)]
#[command(name = "rebug", about = "Capture-and-replay debugging for Rebugger scripts")]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose error and log output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print results and errors as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Capture the call marked in a buffer and print its replay block
    Stepin {
        /// Source files to load before evaluating the buffer
        #[arg(short, long = "file")]
        files: Vec<PathBuf>,

        /// Buffer text
        #[arg(short, long, conflicts_with = "buffer_file")]
        buffer: Option<String>,

        /// File holding the buffer text
        #[arg(long)]
        buffer_file: Option<PathBuf>,

        /// Byte offset where the call's function name starts
        #[arg(short, long, conflicts_with = "at")]
        point: Option<usize>,

        /// Mark the first occurrence of this text instead of giving an offset
        #[arg(long)]
        at: Option<String>,
    },

    /// Capture every frame of a failing command
    Trace {
        /// Source files to load before running the command
        #[arg(short, long = "file")]
        files: Vec<PathBuf>,

        /// Module the command is evaluated in
        #[arg(short, long, default_value = "Main")]
        module: String,

        /// Command expected to raise an error
        command: String,
    },

    /// Load files and print the value of the last expression
    Run {
        /// Source files to load in order
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

//-----------------------------------------------------------------------------
// Main Function
//-----------------------------------------------------------------------------

fn main() {
    let cli = Cli::parse();
    let error_handler = CliErrorHandler::new(cli.verbose, cli.json);

    let config = match &cli.config {
        Some(path) => match RebugConfig::load(path) {
            Ok(config) => config,
            Err(err) => {
                error_handler.handle_error(&err.into());
                process::exit(2);
            }
        },
        None => RebugConfig::default(),
    };

    let level = if cli.verbose { "debug" } else { config.logging.level.as_str() };
    if let Err(err) = logging::init_tracing(level) {
        eprintln!("warning: could not initialize logging: {}", err);
    }

    let output = Output { json: cli.json };
    let result = match cli.command {
        Command::Stepin { files, buffer, buffer_file, point, at } => {
            let request = StepinRequest { files, buffer, buffer_file, point, at };
            handle_stepin_command(config, request, &output)
        }
        Command::Trace { files, module, command } => handle_trace_command(config, &files, &module, &command, &output),
        Command::Run { files } => handle_run_command(config, &files, &output),
    };

    if let Err(err) = result {
        error_handler.handle_error(&err);
        process::exit(1);
    }
}
