//! CLI front end: reads newline-delimited commands from a file or stdin,
//! drives a [`clob_engine::MatchingEngine`], and prints trades followed by
//! the final per-symbol book snapshot.

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

use clob_engine::{format_output, parse_line, MatchingEngine};

#[derive(Parser)]
#[command(name = "clob-engine", about = "Deterministic central limit order book matching engine")]
struct Cli {
    /// Path to a file of newline-delimited commands. Reads stdin when
    /// omitted or given as "-".
    input: Option<PathBuf>,

    /// Emit debug-level logging in addition to warnings and errors.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "clob_engine=debug" } else { "clob_engine=info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .with_target(false)
        .init();

    let source: Box<dyn io::Read> = match &cli.input {
        Some(path) if path.as_os_str() != "-" => match fs::File::open(path) {
            Ok(file) => Box::new(file),
            Err(err) => {
                error!(%err, path = %path.display(), "failed to open input file");
                return ExitCode::FAILURE;
            }
        },
        _ => Box::new(io::stdin()),
    };

    let mut engine = MatchingEngine::new();
    let mut had_errors = false;

    for (line_no, line) in io::BufReader::new(source).lines().enumerate() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                error!(%err, line_no = line_no + 1, "failed to read line");
                had_errors = true;
                continue;
            }
        };
        if line.is_empty() {
            continue;
        }
        match parse_line(&line) {
            Ok(command) => engine.apply(command),
            Err(err) => {
                warn!(%err, line_no = line_no + 1, line = line.as_str(), "skipping unparseable command");
                had_errors = true;
            }
        }
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for line in format_output(engine.trades(), &engine.snapshot_books()) {
        if writeln!(out, "{line}").is_err() {
            error!("failed to write to stdout");
            return ExitCode::FAILURE;
        }
    }

    if had_errors {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
