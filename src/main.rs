// RepCRec CLI entry point.
//
// Subcommand shape grounded on the `todo_app` example's `clap::Parser`
// derive pattern (`examples/ryancinsight-OxiDB/examples/todo_app`):
// an outer `Cli` wrapping a `#[clap(subcommand)]` enum, one variant per
// mode.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::error;

use repcrec::config::{init_logging, Config};
use repcrec::driver;
use repcrec::RepcrecError;

#[derive(Parser, Debug)]
#[command(name = "repcrec", author, version, about = "A replicated-database concurrency control simulator")]
struct Cli {
    #[command(subcommand)]
    mode: Mode,

    /// Emit debug-level tracing diagnostics.
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Run a single batch file of test cases.
    F {
        #[arg(short = 'i', long = "input")]
        input: PathBuf,
        #[arg(short = 'o', long = "output")]
        output: PathBuf,
    },
    /// Run every `*.txt` file in a directory, mirroring outputs.
    D {
        #[arg(short = 'i', long = "input")]
        input: PathBuf,
        #[arg(short = 'o', long = "output")]
        output: PathBuf,
    },
    /// Interactive REPL.
    I,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&Config { verbose: cli.verbose });

    let result = match cli.mode {
        Mode::F { input, output } => driver::run_file(&input, &output).map(Some),
        Mode::D { input, output } => driver::run_directory(&input, &output).map(Some),
        Mode::I => driver::run_interactive().map(|()| None),
    };

    match result {
        Ok(Some(true)) => ExitCode::from(1),
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            exit_code_for(&err)
        }
    }
}

/// Nonzero on unparseable input or a duplicate transaction id, per
/// spec.md §6; any other I/O failure also fails the run.
fn exit_code_for(err: &RepcrecError) -> ExitCode {
    match err {
        RepcrecError::Transaction(_) => ExitCode::from(1),
        RepcrecError::Io(_) => ExitCode::from(2),
    }
}
