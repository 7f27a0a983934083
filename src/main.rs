use std::error::Error as _;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use ledger_tools::logging;
use ledger_tools::pipeline::run_pipeline;
use ledger_tools::{PipelineError, Result};
use tracing::error;

const FAILURE: u8 = 2;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let _guard = match logging::init(&cli.log_level, cli.log_file()) {
        Ok(guard) => guard,
        Err(error) => {
            eprintln!("error: {error}");
            return ExitCode::from(FAILURE);
        }
    };

    match run(cli) {
        Ok(code) => code,
        Err(failure) => {
            error!(kind = ?failure.kind(), "pipeline failed: {}", cause_chain(&failure));
            eprintln!("Pipeline failed, see log.");
            ExitCode::from(FAILURE)
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Command::Clean(args) => execute_clean(args),
    }
}

fn execute_clean(args: CleanArgs) -> Result<ExitCode> {
    let input = match args.input {
        Some(path) => path,
        None => match prompt_for_input()? {
            Some(path) => path,
            None => {
                println!("Input CSV path is required.");
                return Ok(ExitCode::from(FAILURE));
            }
        },
    };
    run_pipeline(&input, &args.out_clean, &args.out_stats)?;
    Ok(ExitCode::SUCCESS)
}

/// Asks for the input path on stdin when it was not given on the command line.
fn prompt_for_input() -> Result<Option<PathBuf>> {
    let mut stdout = io::stdout();
    write!(stdout, "Input CSV path: ")?;
    stdout.flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    let answer = answer.trim();
    Ok((!answer.is_empty()).then(|| PathBuf::from(answer)))
}

fn cause_chain(failure: &PipelineError) -> String {
    let mut message = failure.to_string();
    let mut source = failure.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Validate a sales ledger CSV and summarise the accepted rows."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log level used when RUST_LOG is not set.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// File that receives a copy of the log output.
    #[arg(long, global = true, default_value = "logs/ledger-tools.log")]
    log_file: PathBuf,

    /// Only log to stderr.
    #[arg(long, global = true)]
    no_log_file: bool,
}

impl Cli {
    fn log_file(&self) -> Option<&Path> {
        (!self.no_log_file).then_some(self.log_file.as_path())
    }
}

#[derive(Subcommand)]
enum Command {
    /// Clean a ledger CSV and write the stats document.
    Clean(CleanArgs),
}

#[derive(clap::Args)]
struct CleanArgs {
    /// Input CSV path. Prompted for on stdin when omitted.
    input: Option<PathBuf>,

    /// Cleaned CSV output path.
    #[arg(long, default_value = "out/clean.csv")]
    out_clean: PathBuf,

    /// Stats JSON output path.
    #[arg(long, default_value = "out/stats.json")]
    out_stats: PathBuf,
}
