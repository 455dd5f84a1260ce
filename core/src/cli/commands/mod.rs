pub mod analyze;
pub mod rewrite;
pub mod rules;
pub mod status;

use crate::ingest;
use anyhow::Context;
use std::io::Read;
use std::path::Path;

/// Read the job description from `file`, or stdin when absent.
fn read_input(file: Option<&Path>) -> anyhow::Result<String> {
    match file {
        Some(path) => {
            ingest::read_path(path).with_context(|| format!("Failed to read {}", path.display()))
        }
        None => {
            let mut bytes = Vec::new();
            std::io::stdin()
                .read_to_end(&mut bytes)
                .context("Failed to read stdin")?;
            Ok(ingest::read_document(&bytes, "stdin.txt")?)
        }
    }
}

/// Serialize a value as pretty-printed JSON and print it to stdout.
fn print_json(value: &impl serde::Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
