//! Phrase rule table: loading, validation and the process-wide default.
//!
//! A rule document looks like
//!
//! ```yaml
//! categories:
//!   gender_coded:
//!     weight: 1.0
//!     terms:
//!       - phrase: rockstar
//!         suggest: high performer
//! ```
//!
//! Category and term order is kept exactly as written, because suggestion
//! order and summary tie-breaking depend on it.

pub mod category;
pub mod matcher;

pub use category::CanonicalCategory;
pub use matcher::find_rule_hits;

use regex::Regex;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::{Arc, OnceLock};
use thiserror::Error;

const BUNDLED_RULES: &str = include_str!("../../resources/rules.yml");

#[derive(Error, Debug)]
pub enum RuleError {
    #[error("IO error reading rules: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed YAML rule document: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Malformed JSON rule document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Category '{category}' does not map to a known bias bucket; add `canonical:` to declare one")]
    UnmappedCategory { category: String },
    #[error("Category '{category}' contains a term with an empty phrase")]
    EmptyPhrase { category: String },
    #[error("Category '{category}' has invalid weight {weight}")]
    InvalidWeight { category: String, weight: f64 },
    #[error("Could not compile pattern for '{phrase}': {source}")]
    Pattern {
        phrase: String,
        #[source]
        source: regex::Error,
    },
}

/// A single phrase rule. Immutable once loaded.
#[derive(Debug, Clone, Serialize)]
pub struct Rule {
    pub category: String,
    pub canonical: CanonicalCategory,
    pub phrase: String,
    pub weight: f64,
    pub suggest: Option<String>,
    pub note: Option<String>,
}

/// A rule together with its compiled whole-word, case-insensitive pattern.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub rule: Rule,
    pattern: Regex,
}

impl CompiledRule {
    fn compile(rule: Rule) -> Result<Self, RuleError> {
        let source = format!(r"(?i)\b{}\b", regex::escape(&rule.phrase));
        let pattern = Regex::new(&source).map_err(|source| RuleError::Pattern {
            phrase: rule.phrase.clone(),
            source,
        })?;
        Ok(Self { rule, pattern })
    }

    pub(crate) fn pattern(&self) -> &Regex {
        &self.pattern
    }
}

/// Ordered collection of compiled rules.
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    rules: Vec<CompiledRule>,
}

#[derive(Debug, Deserialize)]
struct RuleDocument {
    #[serde(deserialize_with = "ordered_categories")]
    categories: Vec<(String, CategorySpec)>,
}

#[derive(Debug, Deserialize)]
struct CategorySpec {
    #[serde(default = "default_weight")]
    weight: f64,
    #[serde(default)]
    canonical: Option<String>,
    terms: Vec<TermSpec>,
}

#[derive(Debug, Deserialize)]
struct TermSpec {
    phrase: String,
    #[serde(default)]
    suggest: Option<String>,
    #[serde(default)]
    note: Option<String>,
}

fn default_weight() -> f64 {
    1.0
}

fn check_weight(category: &str, weight: f64) -> Result<(), RuleError> {
    if weight.is_finite() && weight >= 0.0 {
        Ok(())
    } else {
        Err(RuleError::InvalidWeight {
            category: category.to_owned(),
            weight,
        })
    }
}

/// Deserialize a mapping into a `Vec` of entries, keeping document order.
fn ordered_categories<'de, D>(deserializer: D) -> Result<Vec<(String, CategorySpec)>, D::Error>
where
    D: Deserializer<'de>,
{
    struct OrderedVisitor;

    impl<'de> Visitor<'de> for OrderedVisitor {
        type Value = Vec<(String, CategorySpec)>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a mapping of category name to category spec")
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some(entry) = map.next_entry::<String, CategorySpec>()? {
                entries.push(entry);
            }
            Ok(entries)
        }
    }

    deserializer.deserialize_map(OrderedVisitor)
}

impl RuleTable {
    /// Build a table from rules in match order. Weights must be finite and
    /// non-negative and phrases non-blank.
    pub fn new(rules: Vec<Rule>) -> Result<Self, RuleError> {
        let rules = rules
            .into_iter()
            .map(|rule| {
                check_weight(&rule.category, rule.weight)?;
                if rule.phrase.trim().is_empty() {
                    return Err(RuleError::EmptyPhrase {
                        category: rule.category,
                    });
                }
                CompiledRule::compile(rule)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    pub fn from_yaml_str(source: &str) -> Result<Self, RuleError> {
        let document: RuleDocument = serde_yaml::from_str(source)?;
        Self::from_document(document)
    }

    pub fn from_json_str(source: &str) -> Result<Self, RuleError> {
        let document: RuleDocument = serde_json::from_str(source)?;
        Self::from_document(document)
    }

    /// Load a rule document from disk. `.json` files are read as JSON,
    /// everything else as YAML.
    pub fn load(path: &Path) -> Result<Self, RuleError> {
        let content = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let table = if is_json {
            Self::from_json_str(&content)?
        } else {
            Self::from_yaml_str(&content)?
        };
        log::info!(
            "[rules] Loaded {} rules from {}",
            table.len(),
            path.display()
        );
        Ok(table)
    }

    /// The default table compiled into the binary, parsed once per process.
    pub fn bundled() -> Result<Arc<Self>, RuleError> {
        static BUNDLED: OnceLock<Arc<RuleTable>> = OnceLock::new();

        if let Some(table) = BUNDLED.get() {
            return Ok(Arc::clone(table));
        }
        let table = Arc::new(Self::from_yaml_str(BUNDLED_RULES)?);
        log::info!("[rules] Loaded {} bundled rules", table.len());
        // A racing first caller may have won; either copy is identical.
        Ok(Arc::clone(BUNDLED.get_or_init(|| table)))
    }

    fn from_document(document: RuleDocument) -> Result<Self, RuleError> {
        let mut rules = Vec::new();

        for (category, spec) in document.categories {
            // checked here too so a category with no terms still fails
            check_weight(&category, spec.weight)?;

            let canonical = match spec.canonical.as_deref() {
                Some(name) => CanonicalCategory::from_name(name),
                None => CanonicalCategory::resolve(&category),
            }
            .ok_or_else(|| RuleError::UnmappedCategory {
                category: category.clone(),
            })?;

            for term in spec.terms {
                rules.push(Rule {
                    category: category.clone(),
                    canonical,
                    phrase: term.phrase,
                    weight: spec.weight,
                    suggest: term.suggest,
                    note: term.note,
                });
            }
        }

        Self::new(rules)
    }

    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter().map(|c| &c.rule)
    }

    pub(crate) fn compiled(&self) -> &[CompiledRule] {
        &self.rules
    }

    /// Distinct category names, in document order.
    pub fn categories(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for rule in self.rules() {
            if !seen.contains(&rule.category.as_str()) {
                seen.push(&rule.category);
            }
        }
        seen
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_bundled_rules_load() {
        let table = RuleTable::bundled().unwrap();
        assert!(!table.is_empty());
        let categories = table.categories();
        assert_eq!(
            categories,
            vec![
                "gender_coded",
                "age_coded",
                "ableist",
                "immigration_coded",
                "elitism"
            ]
        );
    }

    #[test]
    fn test_bundled_is_cached() {
        let a = RuleTable::bundled().unwrap();
        let b = RuleTable::bundled().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_document_order_is_preserved() {
        let yaml = r"
categories:
  elitism:
    weight: 0.8
    terms:
      - phrase: ivy league
      - phrase: prestigious
  gender_coded:
    terms:
      - phrase: ninja
";
        let table = RuleTable::from_yaml_str(yaml).unwrap();
        let phrases: Vec<&str> = table.rules().map(|r| r.phrase.as_str()).collect();
        assert_eq!(phrases, vec!["ivy league", "prestigious", "ninja"]);
        assert_eq!(table.categories(), vec!["elitism", "gender_coded"]);
    }

    #[test]
    fn test_weight_defaults_to_one() {
        let yaml = "categories:\n  gender_coded:\n    terms:\n      - phrase: ninja\n";
        let table = RuleTable::from_yaml_str(yaml).unwrap();
        let rule = table.rules().next().unwrap();
        assert!((rule.weight - 1.0).abs() < f64::EPSILON);
        assert!(rule.suggest.is_none());
        assert!(rule.note.is_none());
    }

    #[test]
    fn test_json_document() {
        let json = r#"{"categories": {"age_coded": {"weight": 1.2, "terms": [
            {"phrase": "digital native", "suggest": "comfortable with digital tools", "note": "n"}
        ]}}}"#;
        let table = RuleTable::from_json_str(json).unwrap();
        let rule = table.rules().next().unwrap();
        assert_eq!(rule.canonical, CanonicalCategory::AgeCoded);
        assert_eq!(rule.suggest.as_deref(), Some("comfortable with digital tools"));
        assert_eq!(rule.note.as_deref(), Some("n"));
    }

    #[test]
    fn test_unmapped_category_is_rejected() {
        let yaml = "categories:\n  jargon:\n    terms:\n      - phrase: synergy\n";
        let err = RuleTable::from_yaml_str(yaml).unwrap_err();
        assert!(matches!(err, RuleError::UnmappedCategory { ref category } if category == "jargon"));
    }

    #[test]
    fn test_explicit_canonical_other() {
        let yaml = "categories:\n  jargon:\n    canonical: other\n    terms:\n      - phrase: synergy\n";
        let table = RuleTable::from_yaml_str(yaml).unwrap();
        assert_eq!(
            table.rules().next().unwrap().canonical,
            CanonicalCategory::Other
        );
    }

    #[test]
    fn test_unknown_explicit_canonical_is_rejected() {
        let yaml = "categories:\n  jargon:\n    canonical: buzzwords\n    terms:\n      - phrase: synergy\n";
        assert!(matches!(
            RuleTable::from_yaml_str(yaml),
            Err(RuleError::UnmappedCategory { .. })
        ));
    }

    #[test]
    fn test_negative_weight_is_rejected() {
        let yaml = "categories:\n  ableist:\n    weight: -1\n    terms:\n      - phrase: lame\n";
        assert!(matches!(
            RuleTable::from_yaml_str(yaml),
            Err(RuleError::InvalidWeight { .. })
        ));
    }

    #[test]
    fn test_empty_phrase_is_rejected() {
        let yaml = "categories:\n  ableist:\n    terms:\n      - phrase: '  '\n";
        assert!(matches!(
            RuleTable::from_yaml_str(yaml),
            Err(RuleError::EmptyPhrase { .. })
        ));
    }

    #[test]
    fn test_category_without_terms_is_rejected() {
        let err = RuleTable::from_yaml_str("categories:\n  gender_coded:\n    weight: 1.0\n")
            .unwrap_err();
        match err {
            RuleError::Yaml(e) => assert!(e.to_string().contains("terms"), "{e}"),
            other => panic!("Wrong error: {other:?}"),
        }
        assert!(matches!(
            RuleTable::from_json_str(r#"{"categories": {"elitism": {"weight": 0.8}}}"#),
            Err(RuleError::Json(_))
        ));
    }

    #[test]
    fn test_new_validates_rules() {
        let rule = |phrase: &str, weight: f64| Rule {
            category: "ableist".to_owned(),
            canonical: CanonicalCategory::Ableist,
            phrase: phrase.to_owned(),
            weight,
            suggest: None,
            note: None,
        };
        assert_eq!(RuleTable::new(vec![rule("lame", 1.1)]).unwrap().len(), 1);
        assert!(matches!(
            RuleTable::new(vec![rule("lame", f64::NAN)]),
            Err(RuleError::InvalidWeight { .. })
        ));
        assert!(matches!(
            RuleTable::new(vec![rule("lame", -0.5)]),
            Err(RuleError::InvalidWeight { .. })
        ));
        assert!(matches!(
            RuleTable::new(vec![rule(" ", 1.0)]),
            Err(RuleError::EmptyPhrase { .. })
        ));
    }

    #[test]
    fn test_malformed_document_is_fatal() {
        assert!(matches!(
            RuleTable::from_yaml_str("categories: [1, 2"),
            Err(RuleError::Yaml(_))
        ));
        assert!(matches!(
            RuleTable::from_yaml_str("terms: []"),
            Err(RuleError::Yaml(_))
        ));
        assert!(matches!(
            RuleTable::from_json_str("{"),
            Err(RuleError::Json(_))
        ));
    }

    #[test]
    fn test_load_from_path_by_extension() {
        let dir = tempfile::TempDir::new().unwrap();

        let json_path = dir.path().join("rules.json");
        std::fs::write(
            &json_path,
            r#"{"categories": {"elitism": {"terms": [{"phrase": "ivy league"}]}}}"#,
        )
        .unwrap();
        assert_eq!(RuleTable::load(&json_path).unwrap().len(), 1);

        let yaml_path = dir.path().join("rules.yml");
        let mut file = std::fs::File::create(&yaml_path).unwrap();
        writeln!(file, "categories:\n  elitism:\n    terms:\n      - phrase: a\n      - phrase: b").unwrap();
        assert_eq!(RuleTable::load(&yaml_path).unwrap().len(), 2);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = RuleTable::load(Path::new("/nonexistent/rules.yml")).unwrap_err();
        assert!(matches!(err, RuleError::Io(_)));
    }
}
