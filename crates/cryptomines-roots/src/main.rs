use std::{
    collections::BTreeMap,
    io::{self, Write},
    process::ExitCode,
};

use clap::{Parser, ValueEnum};
use cryptomines_paths::{RootKind, RootPathError, RootPaths, process_roots};
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "cryptomines-roots", about = "Print resolved cryptomines data roots")]
struct Cli {
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,
    /// Print only this root.
    #[arg(value_enum)]
    root: Option<RootArg>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum RootArg {
    Main,
    Keys,
    Simulator,
}

impl From<RootArg> for RootKind {
    fn from(arg: RootArg) -> Self {
        match arg {
            RootArg::Main => RootKind::Main,
            RootArg::Keys => RootKind::Keys,
            RootArg::Simulator => RootKind::Simulator,
        }
    }
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Resolve(#[from] RootPathError),
    #[error("failed to encode json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("cryptomines-roots error: {err}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<(), CliError> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(io::stderr)
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let roots = process_roots()?;
    info!(
        main = %roots.main().display(),
        keys = %roots.keys().display(),
        simulator = %roots.simulator().display(),
        "resolved roots"
    );

    let rendered = render(roots, cli.root.map(RootKind::from), cli.format)?;
    let mut stdout = io::stdout().lock();
    stdout.write_all(rendered.as_bytes())?;
    stdout.flush()?;
    Ok(())
}

fn render(roots: &RootPaths, only: Option<RootKind>, format: Format) -> Result<String, CliError> {
    let rendered = match (format, only) {
        (Format::Text, Some(kind)) => format!("{}\n", roots.get(kind).display()),
        (Format::Text, None) => roots
            .iter()
            .map(|(kind, path)| format!("{}\t{}\n", kind.as_str(), path.display()))
            .collect(),
        (Format::Json, Some(kind)) => {
            let single = BTreeMap::from([(kind.as_str(), roots.get(kind))]);
            format!("{}\n", serde_json::to_string_pretty(&single)?)
        }
        (Format::Json, None) => format!("{}\n", serde_json::to_string_pretty(roots)?),
    };
    Ok(rendered)
}
