//! dairyscope - Child Dairy Consumption Report Builder
//!
//! Loads the survey and country metadata tables, derives the summary
//! tables and writes a PPTX deck with the four standard figures.

mod charts;
mod config;
mod data;
mod pipeline;
mod report;
mod stats;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use config::ReportConfig;
use pipeline::BuildSummary;

#[derive(Parser, Debug)]
#[command(name = "dairyscope", version, about = "Builds the child dairy-consumption report deck")]
struct Args {
    /// JSON configuration file; built-in defaults apply when absent
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory holding the input CSV files
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Output deck path
    #[arg(long)]
    out: Option<PathBuf>,

    /// Also write each figure as a standalone PNG into this directory
    #[arg(long)]
    figures_dir: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    match run(&args) {
        Ok(summary) if summary.is_complete() => {
            info!(figures = summary.rendered, "report complete");
            ExitCode::SUCCESS
        }
        Ok(summary) => {
            for (name, err) in &summary.failed {
                warn!(figure = name, error = %err, "figure missing from the deck");
            }
            warn!(figures = summary.rendered, "report written with missing figures");
            ExitCode::FAILURE
        }
        Err(err) => {
            error!(error = %err, "report build failed");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> anyhow::Result<BuildSummary> {
    let config = load_config(args)?;
    let summary = pipeline::build_report(&config)?;
    Ok(summary)
}

/// Start from the config file (or the built-in defaults) and apply the
/// command-line overrides on top.
fn load_config(args: &Args) -> Result<ReportConfig, config::ConfigError> {
    let mut config = match &args.config {
        Some(path) => ReportConfig::from_file(path)?,
        None => ReportConfig::default(),
    };

    if let Some(dir) = &args.data_dir {
        config.rebase_inputs(dir);
    }
    if let Some(out) = &args.out {
        config.output_path = out.clone();
    }
    if let Some(dir) = &args.figures_dir {
        config.figures_dir = Some(dir.clone());
    }
    Ok(config)
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_apply_on_top_of_defaults() {
        let args = Args {
            config: None,
            data_dir: Some(PathBuf::from("/srv/data")),
            out: Some(PathBuf::from("deck.pptx")),
            figures_dir: Some(PathBuf::from("figs")),
            verbose: false,
        };

        let config = load_config(&args).unwrap();

        assert_eq!(
            config.nutrition_path,
            PathBuf::from("/srv/data/dairy_consumption.csv")
        );
        assert_eq!(config.output_path, PathBuf::from("deck.pptx"));
        assert_eq!(config.figures_dir, Some(PathBuf::from("figs")));
    }

    #[test]
    fn test_args_parse() {
        let args = Args::parse_from(["dairyscope", "--data-dir", "d", "-v"]);
        assert!(args.verbose);
        assert_eq!(args.data_dir, Some(PathBuf::from("d")));
        assert_eq!(args.out, None);
    }
}
