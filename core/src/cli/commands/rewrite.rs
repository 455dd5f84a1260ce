use super::{print_json, read_input};
use crate::analysis::Analyzer;
use crate::cli::OutputFormat;
use crate::config::Config;
use crate::render;
use anyhow::Context;
use std::io::Write;
use std::path::Path;

/// Rewrites only use rule suggestions, so the classifier is never consulted.
pub fn run(
    config: &Config,
    file: Option<&Path>,
    out: Option<&Path>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let analyzer = Analyzer::from_config(&Config {
        classifier: crate::config::ClassifierConfig {
            enabled: false,
            ..config.classifier.clone()
        },
        ..config.clone()
    })?;
    let text = read_input(file)?;
    let result = analyzer.submit(&text, false)?;

    if let Some(path) = out {
        render::write_rewrite(path, &result)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }

    if format == OutputFormat::Json {
        return print_json(&serde_json::json!({
            "rewritten_text": result.rewritten_text,
            "changes": result.changes,
        }));
    }

    if out.is_none() {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(result.rewritten_text.as_bytes())?;
        stdout.flush()?;
    }
    Ok(())
}
