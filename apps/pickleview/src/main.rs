use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use pickleview_config::{OutputFormat, ReportConfig, load_config};
use pickleview_engine::{Engine, RunSummary, index, renderer_for};
use pickleview_ingest_ndjson::NdjsonSource;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

mod logging;

#[derive(Parser, Debug)]
#[command(name = "pickleview")]
#[command(about = "Render readable test reports from Cucumber message streams.", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
    /// Report configuration (YAML, or JSON by extension).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// More log output on stderr; repeat for more.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a report from an NDJSON message stream.
    Render {
        /// Message file, or `-` for stdin.
        #[arg(long)]
        messages: PathBuf,
        /// `markdown` or `json`. Overrides the config file.
        #[arg(long)]
        format: Option<OutputFormat>,
        /// Write here instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,
        /// Report title. Overrides the config file.
        #[arg(long)]
        title: Option<String>,
    },
    /// Print scenario counts per status. Exits 1 when any scenario had a problem.
    Summary {
        /// Message file, or `-` for stdin.
        #[arg(long)]
        messages: PathBuf,
    },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ReportConfig::default(),
    };
    logging::init(&config.logging, cli.verbose);
    tracing::debug!(path = ?cli.config, format = ?config.format, "loaded configuration");

    match cli.cmd {
        Command::Render {
            messages,
            format,
            out,
            title,
        } => {
            let mut config = config;
            if let Some(format) = format {
                config.format = format;
            }
            if let Some(title) = title {
                config.title = title;
            }

            let renderer = renderer_for(&config);
            let outputs =
                Engine::new(renderer.as_ref()).run(&NdjsonSource::new(messages), out.as_deref())?;

            match outputs.out_path {
                Some(path) => eprintln!("wrote {}", path.display()),
                None => std::io::stdout()
                    .lock()
                    .write_all(outputs.report.as_bytes())
                    .context("write report to stdout")?,
            }
            Ok(ExitCode::SUCCESS)
        }

        Command::Summary { messages } => {
            let query = index(&NdjsonSource::new(messages))?;
            let summary = RunSummary::from_query(&query);
            println!("{summary}");
            if summary.has_problems() {
                Ok(ExitCode::from(1))
            } else {
                Ok(ExitCode::SUCCESS)
            }
        }
    }
}
