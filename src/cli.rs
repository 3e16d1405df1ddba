use crate::config::{Direction, load_config};
use crate::instance::Trace;
use crate::layout_dump::write_trace_dump;
use crate::pipeline::build_trace_graphs_with_config;
use crate::theme::Theme;
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "tracegraph",
    version,
    about = "Lay out every instance of an Alloy trace on one shared canvas"
)]
pub struct Args {
    /// Trace file (JSON) or '-' for stdin
    #[arg(short = 'i', long = "trace")]
    pub trace: Option<PathBuf>,

    /// Theme JSON file. Without one every atom and relation is shown.
    #[arg(short = 't', long = "theme")]
    pub theme: Option<PathBuf>,

    /// Output file for the layout dump. Defaults to stdout.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Layout config JSON file
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Overrides the configured layout direction
    #[arg(short = 'd', long = "direction", value_enum)]
    pub direction: Option<DirectionArg>,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum DirectionArg {
    #[value(name = "TD", alias = "TB")]
    TopDown,
    #[value(name = "LR")]
    LeftRight,
}

impl From<DirectionArg> for Direction {
    fn from(value: DirectionArg) -> Self {
        match value {
            DirectionArg::TopDown => Direction::TopDown,
            DirectionArg::LeftRight => Direction::LeftRight,
        }
    }
}

pub fn run() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let mut config = load_config(args.config.as_deref())?;
    if let Some(direction) = args.direction {
        config.layout.direction = direction.into();
    }

    let trace: Trace = serde_json::from_str(&read_input(args.trace.as_deref())?)
        .context("trace is not valid JSON")?;
    let theme = match args.theme.as_deref() {
        Some(path) => Some(read_theme(path)?),
        None => None,
    };

    // Skipped theme rules are already reported through `tracing::warn!`.
    let graphs = build_trace_graphs_with_config(&trace, theme.as_ref(), &config.layout)?;
    write_trace_dump(args.output.as_deref(), &graphs)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    // try_init fails if a subscriber is already installed; keep that one.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path {
        if path != Path::new("-") {
            return std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()));
        }
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

fn read_theme(path: &Path) -> Result<Theme> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_theme(&contents)
}

fn parse_theme(contents: &str) -> Result<Theme> {
    serde_json::from_str(contents).context("theme is not valid JSON")
}
