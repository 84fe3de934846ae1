use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;

use crate::commands::chunk::{self, ChunkOptions};
use crate::commands::sanitize::{self, SanitizeOptions};
use crate::commands::summarize::{self, SummarizeOptions};
use crate::commands::{CommandReport, status};
use crate::logging;

/// Summarize long documents through token-budgeted LLM windows.
#[derive(Parser, Debug)]
#[command(name = "chunksum", version, about)]
struct Cli {
    /// Log filter for stderr output (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Summarize a document, recursing until it fits one request
    Summarize {
        /// Input file, stdin when omitted
        #[arg(long)]
        input: Option<PathBuf>,
        /// Write the summary here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
        /// Skip the on-disk window cache
        #[arg(long)]
        no_cache: bool,
        #[arg(long)]
        json: bool,
    },
    /// Strip invisible and control characters
    Sanitize {
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Show the windows the first pass would send, without calling a backend
    Chunk {
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },
    /// Resolved paths, thresholds and configured backend pools
    Status {
        #[arg(long)]
        json: bool,
    },
}

fn print_report(report: &CommandReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        println!("{}: {}", report.command, if report.ok { "ok" } else { "issues" });
        for detail in &report.details {
            println!("  {detail}");
        }
        for issue in &report.issues {
            println!("  ! {issue}");
        }
    }
    if report.ok {
        Ok(())
    } else {
        Err(anyhow!("{} reported {} issue(s)", report.command, report.issues.len()))
    }
}

fn print_text(text: &str) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(text.as_bytes()).context("failed to write stdout")?;
    if !text.is_empty() && !text.ends_with('\n') {
        stdout.write_all(b"\n").context("failed to write stdout")?;
    }
    stdout.flush().context("failed to write stdout")
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.log_level.as_deref());

    match cli.command {
        Command::Summarize {
            input,
            output,
            no_cache,
            json,
        } => {
            let writes_file = output.is_some();
            let report = summarize::run(&SummarizeOptions {
                input,
                output,
                no_cache,
            })?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else if !writes_file {
                print_text(&report.summary)?;
            }
            Ok(())
        }
        Command::Sanitize { input } => {
            let clean = sanitize::run(&SanitizeOptions { input })?;
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(clean.as_bytes()).context("failed to write stdout")?;
            stdout.flush().context("failed to write stdout")
        }
        Command::Chunk { input, json } => {
            let plan = chunk::run(&ChunkOptions { input })?;
            if json {
                println!("{}", serde_json::to_string_pretty(&plan)?);
                Ok(())
            } else {
                print_report(&plan.to_report(), false)
            }
        }
        Command::Status { json } => print_report(&status::run()?, json),
    }
}
