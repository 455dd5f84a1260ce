pub mod commands;

use crate::config::{Config, HOME_ENV};
use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(name = "bias-lens")]
#[command(author, version, about = "Flag biased wording in job descriptions", long_about = None)]
pub struct Cli {
    /// Rule document (YAML or JSON). Overrides config.json and BIAS_LENS_RULES
    #[arg(long, global = true)]
    pub rules: Option<PathBuf>,

    /// Override the config directory (default: ~/.bias-lens/, env: BIAS_LENS_HOME)
    #[arg(long, global = true)]
    pub home: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Analyze a job description (reads stdin when no file is given)
    Analyze {
        /// .txt, .docx or .pdf file
        file: Option<PathBuf>,

        /// Rules only, skip the classifier
        #[arg(long)]
        no_ml: bool,

        /// Classifier confidence threshold in [0, 1]
        #[arg(long)]
        threshold: Option<f64>,

        /// Classifier command line (overrides BIAS_LENS_CLASSIFIER)
        #[arg(long)]
        classifier: Option<String>,

        /// Write a standalone HTML report
        #[arg(long)]
        html_out: Option<PathBuf>,

        /// Write the inclusive rewrite as plain text
        #[arg(long)]
        rewrite_out: Option<PathBuf>,
    },

    /// Print the inclusive rewrite
    Rewrite {
        /// .txt, .docx or .pdf file
        file: Option<PathBuf>,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// List the loaded rule table
    Rules {
        /// Show only one category (raw or canonical name)
        #[arg(short, long)]
        category: Option<String>,
    },

    /// Show the rule source and classifier availability
    Status,
}

/// Resolve a potentially relative path to an absolute one.
fn resolve_absolute(path: &Path) -> anyhow::Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().context("Could not read current directory")?;
    Ok(cwd.join(path))
}

/// Run the CLI with parsed arguments
pub fn run(cli: Cli) -> anyhow::Result<()> {
    // Set BIAS_LENS_HOME early so config loading uses the override
    if let Some(home) = &cli.home {
        std::env::set_var(HOME_ENV, resolve_absolute(home)?);
    }

    let mut config = Config::load().context("Failed to load configuration")?;
    if let Some(rules) = cli.rules {
        config.rules_path = Some(rules);
    }

    match cli.command {
        Commands::Analyze {
            file,
            no_ml,
            threshold,
            classifier,
            html_out,
            rewrite_out,
        } => commands::analyze::run(
            config,
            &commands::analyze::AnalyzeOptions {
                file,
                no_ml,
                threshold,
                classifier,
                html_out,
                rewrite_out,
            },
            cli.format,
        ),
        Commands::Rewrite { file, out } => {
            commands::rewrite::run(&config, file.as_deref(), out.as_deref(), cli.format)
        }
        Commands::Rules { category } => {
            commands::rules::run(&config, category.as_deref(), cli.format)
        }
        Commands::Status => commands::status::run(&config, cli.format),
    }
}
