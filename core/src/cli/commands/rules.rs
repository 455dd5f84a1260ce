use super::print_json;
use crate::analysis::load_rules;
use crate::cli::OutputFormat;
use crate::config::Config;
use crate::rules::Rule;
use colored::Colorize;

pub fn run(config: &Config, category: Option<&str>, format: OutputFormat) -> anyhow::Result<()> {
    let table = load_rules(config)?;

    // Filter by raw or canonical category if specified
    let matches = |rule: &Rule| match category {
        Some(cat) => {
            rule.category.eq_ignore_ascii_case(cat) || rule.canonical.as_str().eq_ignore_ascii_case(cat)
        }
        None => true,
    };
    let rules: Vec<&Rule> = table.rules().filter(|r| matches(r)).collect();

    if rules.is_empty() {
        if let Some(cat) = category {
            anyhow::bail!("Category '{cat}' not found");
        }
        anyhow::bail!("The rule table is empty");
    }

    if format == OutputFormat::Json {
        return print_json(&rules);
    }

    let mut current: Option<&str> = None;
    for rule in rules {
        if current != Some(rule.category.as_str()) {
            if current.is_some() {
                println!();
            }
            println!(
                "{} {}",
                rule.category.bold().cyan(),
                format!("({}, weight {})", rule.canonical, rule.weight).dimmed()
            );
            current = Some(rule.category.as_str());
        }
        match &rule.suggest {
            Some(suggest) if !suggest.is_empty() => {
                println!("  {} \u{2192} {}", rule.phrase.green(), suggest);
            }
            _ => println!("  {}", rule.phrase.green()),
        }
        if let Some(note) = &rule.note {
            println!("    {}", note.dimmed());
        }
    }

    Ok(())
}
