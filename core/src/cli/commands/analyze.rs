use super::{print_json, read_input};
use crate::analysis::{AnalysisResult, Analyzer};
use crate::cli::OutputFormat;
use crate::config::Config;
use crate::render;
use anyhow::Context;
use colored::Colorize;
use std::path::PathBuf;

#[derive(Debug, Default)]
pub struct AnalyzeOptions {
    pub file: Option<PathBuf>,
    pub no_ml: bool,
    pub threshold: Option<f64>,
    pub classifier: Option<String>,
    pub html_out: Option<PathBuf>,
    pub rewrite_out: Option<PathBuf>,
}

pub fn run(mut config: Config, opts: &AnalyzeOptions, format: OutputFormat) -> anyhow::Result<()> {
    if let Some(command) = &opts.classifier {
        config.classifier.command = Some(command.clone());
    }
    if let Some(threshold) = opts.threshold {
        config.classifier.threshold = threshold;
    }
    if opts.no_ml {
        config.classifier.enabled = false;
    }

    let analyzer = Analyzer::from_config(&config)?;
    let text = read_input(opts.file.as_deref())?;
    let use_ml = !opts.no_ml;
    if use_ml && !analyzer.classifier_available() && format == OutputFormat::Text {
        eprintln!("{}", "Classifier unavailable; running rules only".dimmed());
    }

    let result = analyzer.submit(&text, use_ml)?;

    if let Some(path) = &opts.html_out {
        std::fs::write(path, render::report_html(&result))
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }
    if let Some(path) = &opts.rewrite_out {
        render::write_rewrite(path, &result)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }

    if format == OutputFormat::Json {
        return print_json(&result);
    }

    print_report(&result);
    if let Some(path) = &opts.html_out {
        println!("\n{} {}", "Report written to".dimmed(), path.display());
    }
    if let Some(path) = &opts.rewrite_out {
        println!("{} {}", "Rewrite written to".dimmed(), path.display());
    }
    Ok(())
}

fn print_report(result: &AnalysisResult) {
    let score = format!("{:.0}", result.score);
    let score = if result.score >= 80.0 {
        score.green()
    } else if result.score >= 50.0 {
        score.yellow()
    } else {
        score.red()
    };
    println!(
        "{} {} {}",
        "Bias score:".bold(),
        score.bold(),
        "(0 = high bias, 100 = cleaner)".dimmed()
    );
    println!("{}", result.summary.replace("**", ""));

    if !result.counts.is_empty() {
        println!();
        println!("{}", "By category".bold().cyan());
        for (category, n) in result.counts.iter() {
            println!("  {}: {n}", category.yellow());
        }
    }

    println!();
    println!("{}", "Suggestions".bold().cyan());
    if result.suggestions.is_empty() {
        println!("  {}", "No specific rewrite suggestions.".dimmed());
    }
    for s in &result.suggestions {
        print!("  \u{201c}{}\u{201d} \u{2192} {}", s.found.bold(), s.suggest.green());
        if s.note.is_empty() {
            println!();
        } else {
            println!(" {}", format!("\u{2014} {}", s.note).dimmed());
        }
    }

    println!();
    println!("{}", "Applied replacements".bold().cyan());
    if result.changes.is_empty() {
        println!("  {}", "No automatic replacements were applied.".dimmed());
    }
    for change in &result.changes {
        println!(
            "  {} \u{201c}{}\u{201d} \u{2192} {}",
            format!("[{}]", change.category).dimmed(),
            change.before,
            change.after.green()
        );
    }
}
