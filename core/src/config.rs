//! User configuration.
//!
//! Everything lives in `~/.bias-lens/` (or `$BIAS_LENS_HOME`):
//! ```text
//! ~/.bias-lens/
//!   config.json     # optional, see `Config`
//!   rules.yml       # optional rule table override (or rules.json)
//! ```
//!
//! Environment variables override the file; CLI flags override both.

use crate::classify::DEFAULT_THRESHOLD;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const HOME_ENV: &str = "BIAS_LENS_HOME";
pub const RULES_ENV: &str = "BIAS_LENS_RULES";
pub const CLASSIFIER_ENV: &str = "BIAS_LENS_CLASSIFIER";
pub const THRESHOLD_ENV: &str = "BIAS_LENS_THRESHOLD";

const CONFIG_FILE: &str = "config.json";
const RULE_FILES: [&str; 3] = ["rules.yml", "rules.yaml", "rules.json"];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Could not determine home directory")]
    Home,
    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
    #[error("Rule document not found: {0}")]
    MissingRules(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub enabled: bool,
    /// Command line of the external zero-shot classifier.
    pub command: Option<String>,
    pub threshold: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: None,
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Explicit rule document; overrides the home directory lookup.
    pub rules_path: Option<PathBuf>,
    pub classifier: ClassifierConfig,
    /// Home directory this config was loaded from. Not persisted.
    #[serde(skip)]
    pub home: Option<PathBuf>,
}

/// Return the configuration root.
///
/// Uses `$BIAS_LENS_HOME` if set, otherwise `~/.bias-lens/`.
pub fn get_home_root() -> Result<PathBuf, ConfigError> {
    if let Ok(home) = std::env::var(HOME_ENV) {
        return Ok(PathBuf::from(home));
    }
    let home = dirs::home_dir().ok_or(ConfigError::Home)?;
    Ok(home.join(".bias-lens"))
}

impl Config {
    /// Load `config.json` from the home directory (if present) and apply
    /// environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let home = get_home_root()?;
        let mut config = Self::load_from(&home)?;
        config.apply_env()?;
        Ok(config)
    }

    /// Load from a specific home directory, without environment overrides.
    pub fn load_from(home: &Path) -> Result<Self, ConfigError> {
        let path = home.join(CONFIG_FILE);
        let mut config = if path.exists() {
            let content = fs::read_to_string(&path)?;
            let config: Self = serde_json::from_str(&content)?;
            log::info!("[config] Loaded {}", path.display());
            config
        } else {
            Self::default()
        };
        config.home = Some(home.to_path_buf());
        config.validate()?;
        Ok(config)
    }

    /// Write `config.json` into the home directory (atomic: tmp + rename).
    pub fn save_to(&self, home: &Path) -> Result<(), ConfigError> {
        fs::create_dir_all(home)?;
        let path = home.join(CONFIG_FILE);
        let tmp_path = home.join("config.json.tmp");
        fs::write(&tmp_path, serde_json::to_string_pretty(self)?)?;
        fs::rename(&tmp_path, &path)?;
        Ok(())
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(rules) = std::env::var(RULES_ENV) {
            if !rules.trim().is_empty() {
                self.rules_path = Some(PathBuf::from(rules));
            }
        }
        if let Ok(command) = std::env::var(CLASSIFIER_ENV) {
            self.classifier.command = Some(command).filter(|c| !c.trim().is_empty());
        }
        if let Ok(raw) = std::env::var(THRESHOLD_ENV) {
            self.classifier.threshold = parse_threshold(THRESHOLD_ENV, &raw)?;
        }
        self.validate()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let threshold = self.classifier.threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::InvalidValue {
                name: "classifier.threshold",
                value: threshold.to_string(),
            });
        }
        Ok(())
    }

    /// Resolve the rule document to load. `None` means the bundled table.
    ///
    /// An explicit path must exist; otherwise the home directory is checked
    /// for `rules.yml`, `rules.yaml` or `rules.json`.
    pub fn resolve_rules_path(&self) -> Result<Option<PathBuf>, ConfigError> {
        if let Some(path) = &self.rules_path {
            if !path.is_file() {
                return Err(ConfigError::MissingRules(path.clone()));
            }
            return Ok(Some(path.clone()));
        }
        let home = match &self.home {
            Some(home) => home.clone(),
            None => get_home_root()?,
        };
        Ok(RULE_FILES
            .iter()
            .map(|name| home.join(name))
            .find(|path| path.is_file()))
    }
}

/// Parse a threshold value from the environment or the command line.
pub fn parse_threshold(name: &'static str, raw: &str) -> Result<f64, ConfigError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|t| (0.0..=1.0).contains(t))
        .ok_or_else(|| ConfigError::InvalidValue {
            name,
            value: raw.to_owned(),
        })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Serializes tests that modify the `BIAS_LENS_*` environment.
    pub static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_env() {
        for name in [HOME_ENV, RULES_ENV, CLASSIFIER_ENV, THRESHOLD_ENV] {
            std::env::remove_var(name);
        }
    }

    #[test]
    fn test_get_home_root_with_env() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_env();
        std::env::set_var(HOME_ENV, "/tmp/test-bias-lens");
        assert_eq!(get_home_root().unwrap(), PathBuf::from("/tmp/test-bias-lens"));
        clear_env();
    }

    #[test]
    fn test_defaults_without_config_file() {
        let home = TempDir::new().unwrap();
        let config = Config::load_from(home.path()).unwrap();
        assert!(config.rules_path.is_none());
        assert!(config.classifier.enabled);
        assert!(config.classifier.command.is_none());
        assert!((config.classifier.threshold - DEFAULT_THRESHOLD).abs() < f64::EPSILON);
    }

    #[test]
    fn test_partial_config_file() {
        let home = TempDir::new().unwrap();
        fs::write(
            home.path().join("config.json"),
            r#"{"classifier": {"command": "zero-shot --json"}}"#,
        )
        .unwrap();
        let config = Config::load_from(home.path()).unwrap();
        assert_eq!(config.classifier.command.as_deref(), Some("zero-shot --json"));
        assert!(config.classifier.enabled);
        assert!((config.classifier.threshold - DEFAULT_THRESHOLD).abs() < f64::EPSILON);
    }

    #[test]
    fn test_invalid_threshold_in_file() {
        let home = TempDir::new().unwrap();
        fs::write(
            home.path().join("config.json"),
            r#"{"classifier": {"threshold": 1.7}}"#,
        )
        .unwrap();
        assert!(matches!(
            Config::load_from(home.path()),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_save_and_reload() {
        let home = TempDir::new().unwrap();
        let mut config = Config::default();
        config.classifier.threshold = 0.7;
        config.classifier.enabled = false;
        config.save_to(home.path()).unwrap();

        let loaded = Config::load_from(home.path()).unwrap();
        assert!(!loaded.classifier.enabled);
        assert!((loaded.classifier.threshold - 0.7).abs() < f64::EPSILON);
        assert!(!home.path().join("config.json.tmp").exists());
    }

    #[test]
    fn test_env_overrides() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_env();
        let home = TempDir::new().unwrap();
        fs::write(
            home.path().join("config.json"),
            r#"{"classifier": {"command": "from-file", "threshold": 0.6}}"#,
        )
        .unwrap();
        std::env::set_var(HOME_ENV, home.path());
        std::env::set_var(CLASSIFIER_ENV, "from-env --flag");
        std::env::set_var(THRESHOLD_ENV, "0.8");

        let config = Config::load().unwrap();
        assert_eq!(config.classifier.command.as_deref(), Some("from-env --flag"));
        assert!((config.classifier.threshold - 0.8).abs() < f64::EPSILON);

        std::env::set_var(THRESHOLD_ENV, "high");
        assert!(Config::load().is_err());
        clear_env();
    }

    #[test]
    fn test_resolve_rules_path() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_env();
        let home = TempDir::new().unwrap();
        let config = Config::load_from(home.path()).unwrap();
        assert_eq!(config.resolve_rules_path().unwrap(), None);

        let home_rules = home.path().join("rules.json");
        fs::write(&home_rules, r#"{"categories": {}}"#).unwrap();
        assert_eq!(config.resolve_rules_path().unwrap(), Some(home_rules));

        let explicit = home.path().join("custom.yml");
        fs::write(&explicit, "categories: {}\n").unwrap();
        let config = Config {
            rules_path: Some(explicit.clone()),
            ..config
        };
        assert_eq!(config.resolve_rules_path().unwrap(), Some(explicit));

        let missing = Config {
            rules_path: Some(home.path().join("nope.yml")),
            ..Config::default()
        };
        assert!(matches!(
            missing.resolve_rules_path(),
            Err(ConfigError::MissingRules(_))
        ));
    }

    #[test]
    fn test_parse_threshold() {
        assert!((parse_threshold("t", " 0.25 ").unwrap() - 0.25).abs() < f64::EPSILON);
        assert!(parse_threshold("t", "-0.1").is_err());
        assert!(parse_threshold("t", "NaN").is_err());
        assert!(parse_threshold("t", "").is_err());
    }
}
