use super::print_json;
use crate::analysis::load_rules_from;
use crate::classify::ClassifierHandle;
use crate::cli::OutputFormat;
use crate::config::Config;
use colored::Colorize;

pub fn run(config: &Config, format: OutputFormat) -> anyhow::Result<()> {
    let rules_path = config.resolve_rules_path()?;
    let table = load_rules_from(rules_path.as_deref())?;
    let classifier_available = ClassifierHandle::detect(&config.classifier).is_available();

    let rules_source = rules_path
        .as_ref()
        .map_or_else(|| "bundled".to_owned(), |p| p.display().to_string());
    let home = config
        .home
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_default();

    if format == OutputFormat::Json {
        return print_json(&serde_json::json!({
            "home": home,
            "rules": {
                "source": rules_source,
                "count": table.len(),
                "categories": table.categories(),
            },
            "classifier": {
                "enabled": config.classifier.enabled,
                "command": config.classifier.command,
                "available": classifier_available,
                "threshold": config.classifier.threshold,
            },
        }));
    }

    println!("{} {}", "Home:".bold(), home);
    println!(
        "{} {} ({} rules in {} categories)",
        "Rules:".bold(),
        rules_source,
        table.len(),
        table.categories().len()
    );
    let availability = if classifier_available {
        "available".green()
    } else if !config.classifier.enabled {
        "disabled".yellow()
    } else {
        "unavailable (rules only)".yellow()
    };
    println!("{} {}", "Classifier:".bold(), availability);
    if let Some(command) = &config.classifier.command {
        println!("  {} {}", "command:".dimmed(), command);
    }
    println!("  {} {}", "threshold:".dimmed(), config.classifier.threshold);

    Ok(())
}
