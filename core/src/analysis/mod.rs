//! The analysis pipeline: rule matching, optional classifier scoring,
//! aggregation and rendering, combined into one [`AnalysisResult`].

pub mod annotate;
pub mod score;

use crate::classify::{self, ClassifierHandle, DEFAULT_THRESHOLD};
use crate::config::Config;
use crate::error::AnalysisError;
use crate::render::{self, LegendEntry};
use crate::rules::{find_rule_hits, CanonicalCategory, RuleTable};
use annotate::AnnotationPlan;
use score::CategoryCounts;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// Half-open byte range into the original text. Always on char boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// True when `other` lies entirely inside this span.
    pub fn contains(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// True when the two spans share at least one byte.
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Convert to character (Unicode scalar value) offsets within `text`,
    /// for display surfaces that index by character.
    pub fn char_range(&self, text: &str) -> (usize, usize) {
        let start = text[..self.start].chars().count();
        let len = text[self.start..self.end].chars().count();
        (start, start + len)
    }
}

/// Where a hit came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HitSource {
    Rule,
    #[serde(rename = "ml")]
    Classifier,
}

/// One detected instance of potentially biased language.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Hit {
    /// Raw category name, as defined by the rule table or classifier label.
    pub category: String,
    pub canonical_category: CanonicalCategory,
    pub weight: f64,
    /// Verbatim matched text (rule hits) or the whole sentence (classifier hits).
    pub found_text: String,
    /// Exact location of a rule hit. Always `None` for classifier hits.
    pub span: Option<Span>,
    /// Location of the flagged sentence for classifier hits.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentence: Option<Span>,
    pub suggest: Option<String>,
    pub note: String,
    pub source: HitSource,
    pub confidence: Option<f64>,
}

impl Hit {
    pub fn is_rule(&self) -> bool {
        self.source == HitSource::Rule
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
    pub found: String,
    pub suggest: String,
    pub note: String,
}

/// A replacement the rewrite engine actually applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Change {
    pub category: String,
    pub before: String,
    pub after: String,
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    /// 0 = heavily biased, 100 = clean.
    pub score: f64,
    pub counts: CategoryCounts,
    pub suggestions: Vec<Suggestion>,
    /// Rule hits in discovery order followed by classifier hits.
    pub highlights: Vec<Hit>,
    pub changes: Vec<Change>,
    pub rendered_html: String,
    pub rewritten_text: String,
    pub rewritten_html: String,
    pub summary: String,
    pub legend: Vec<LegendEntry>,
    pub word_count: usize,
    pub weighted_sum: f64,
}

/// Load the rule table `config` points at, or the bundled one.
pub fn load_rules(config: &Config) -> Result<Arc<RuleTable>, AnalysisError> {
    load_rules_from(config.resolve_rules_path()?.as_deref())
}

/// Load a resolved rule document; `None` means the bundled table.
pub fn load_rules_from(path: Option<&Path>) -> Result<Arc<RuleTable>, AnalysisError> {
    Ok(match path {
        Some(path) => Arc::new(RuleTable::load(path)?),
        None => RuleTable::bundled()?,
    })
}

/// The analysis service. Owns the rule table and the classifier handle;
/// holds no per-call state, so one instance can serve concurrent callers.
#[derive(Debug)]
pub struct Analyzer {
    rules: Arc<RuleTable>,
    classifier: ClassifierHandle,
    threshold: f64,
}

impl Analyzer {
    pub fn new(rules: Arc<RuleTable>, classifier: ClassifierHandle) -> Self {
        Self {
            rules,
            classifier,
            threshold: DEFAULT_THRESHOLD,
        }
    }

    /// Rule-only analyzer over the bundled rule table.
    pub fn with_bundled_rules() -> Result<Self, AnalysisError> {
        Ok(Self::new(RuleTable::bundled()?, ClassifierHandle::unavailable()))
    }

    /// Build an analyzer from resolved configuration. A missing or malformed
    /// rule document is fatal; a missing classifier only downgrades to
    /// rule-only mode.
    pub fn from_config(config: &Config) -> Result<Self, AnalysisError> {
        let rules = load_rules(config)?;
        let classifier = ClassifierHandle::detect(&config.classifier);
        Self::new(rules, classifier).with_threshold(config.classifier.threshold)
    }

    /// Set the classifier confidence threshold (must lie in `[0, 1]`).
    pub fn with_threshold(mut self, threshold: f64) -> Result<Self, AnalysisError> {
        classify::validate_threshold(threshold)?;
        self.threshold = threshold;
        Ok(self)
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Capability flag: whether classifier-backed analysis is possible at all.
    pub fn classifier_available(&self) -> bool {
        self.classifier.is_available()
    }

    /// Input boundary: reject blank text, then run the pipeline.
    pub fn submit(&self, text: &str, use_ml: bool) -> Result<AnalysisResult, AnalysisError> {
        if text.trim().is_empty() {
            return Err(AnalysisError::EmptyInput);
        }
        self.analyze(text, use_ml)
    }

    /// Run the full pipeline over `text`.
    ///
    /// Empty text is accepted and scores 100. A classifier failure fails the
    /// whole call rather than looking like a clean result.
    pub fn analyze(&self, text: &str, use_ml: bool) -> Result<AnalysisResult, AnalysisError> {
        let rule_hits = find_rule_hits(text, &self.rules);

        let ml_hits = if use_ml {
            classify::classify_text(&self.classifier, text, self.threshold)?
        } else {
            Vec::new()
        };

        let word_count = score::word_count(text);
        let weighted_sum: f64 = rule_hits.iter().chain(&ml_hits).map(|h| h.weight).sum();
        let score = score::bias_score(weighted_sum, word_count);

        let has_ml = !ml_hits.is_empty();
        let mut highlights = rule_hits;
        highlights.extend(ml_hits);

        let counts = CategoryCounts::tally(&highlights);
        let summary = score::summarize(&counts, has_ml);
        let suggestions = score::collect_suggestions(&highlights);

        let plan = AnnotationPlan::build(text, &highlights);
        let rendered_html = render::highlight::render_highlights(text, &highlights, &plan);
        let rewrite = render::rewrite::rewrite(text, &highlights, &plan);

        log::debug!(
            "[analyze] words={word_count} hits={} weight={weighted_sum:.2} score={score:.1}",
            highlights.len()
        );

        Ok(AnalysisResult {
            score,
            counts,
            suggestions,
            highlights,
            changes: rewrite.changes,
            rendered_html,
            rewritten_text: rewrite.text,
            rewritten_html: rewrite.html,
            summary,
            legend: render::legend(),
            word_count,
            weighted_sum,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{ClassifyError, LabelScore, SentenceClassifier, CLASSIFIER_LABELS};
    use crate::rules::Rule;

    fn rockstar_table() -> Arc<RuleTable> {
        Arc::new(
            RuleTable::new(vec![Rule {
                category: "gender_coded".to_owned(),
                canonical: CanonicalCategory::GenderCoded,
                phrase: "rockstar".to_owned(),
                weight: 1.0,
                suggest: Some("high performer".to_owned()),
                note: None,
            }])
            .unwrap(),
        )
    }

    struct FixedClassifier(Vec<(usize, f64)>);

    impl SentenceClassifier for FixedClassifier {
        fn classify(&self, _sentence: &str, labels: &[&str]) -> Result<Vec<LabelScore>, ClassifyError> {
            Ok(self
                .0
                .iter()
                .map(|&(i, score)| LabelScore {
                    label: labels[i].to_owned(),
                    score,
                })
                .collect())
        }
    }

    struct BrokenClassifier;

    impl SentenceClassifier for BrokenClassifier {
        fn classify(&self, _sentence: &str, _labels: &[&str]) -> Result<Vec<LabelScore>, ClassifyError> {
            Err(ClassifyError::CommandFailed("model crashed".to_owned()))
        }
    }

    #[test]
    fn test_span_helpers() {
        let a = Span::new(0, 6);
        let b = Span::new(0, 16);
        assert!(b.contains(&a));
        assert!(!a.contains(&b));
        assert!(a.overlaps(&b));
        assert!(!Span::new(0, 3).overlaps(&Span::new(3, 5)));
        assert_eq!(a.len(), 6);
        assert!(Span::new(4, 4).is_empty());
    }

    #[test]
    fn test_char_range_counts_scalars() {
        let text = "Café rockstar";
        let start = text.find("rockstar").unwrap();
        let span = Span::new(start, start + "rockstar".len());
        assert_eq!(span.char_range(text), (5, 13));
    }

    #[test]
    fn test_rockstar_end_to_end() {
        let analyzer = Analyzer::new(rockstar_table(), ClassifierHandle::unavailable());
        let text = "We want a ROCKSTAR engineer.";
        let result = analyzer.analyze(text, true).unwrap();

        assert_eq!(result.highlights.len(), 1);
        let hit = &result.highlights[0];
        assert_eq!(hit.found_text, "ROCKSTAR");
        assert_eq!(hit.span, Some(Span::new(10, 18)));
        assert_eq!(result.word_count, 5);
        let expected = 100.0 - 100.0 * 1.0 / (5.0 / 75.0 + 1.0);
        assert!((result.score - expected).abs() < 1e-9);
        assert!((result.score - 6.25).abs() < 1e-9);
        assert_eq!(result.rewritten_text, "We want a HIGH PERFORMER engineer.");
        assert_eq!(
            result.changes,
            vec![Change {
                category: "gender_coded".to_owned(),
                before: "ROCKSTAR".to_owned(),
                after: "HIGH PERFORMER".to_owned(),
                note: String::new(),
            }]
        );
        assert_eq!(result.counts.get("gender_coded"), 1);
        assert_eq!(
            result.summary,
            "Most flags in **gender_coded**; rules caught issues."
        );
    }

    #[test]
    fn test_empty_text_scores_100() {
        let analyzer = Analyzer::new(rockstar_table(), ClassifierHandle::unavailable());
        let result = analyzer.analyze("", false).unwrap();
        assert!((result.score - 100.0).abs() < f64::EPSILON);
        assert!(result.highlights.is_empty());
        assert_eq!(result.summary, "No obvious issues detected.");
        assert_eq!(result.rewritten_text, "");
    }

    #[test]
    fn test_submit_rejects_blank_input() {
        let analyzer = Analyzer::new(rockstar_table(), ClassifierHandle::unavailable());
        assert!(matches!(
            analyzer.submit("  \n\t ", false),
            Err(AnalysisError::EmptyInput)
        ));
        assert!(analyzer.submit("a rockstar", false).is_ok());
    }

    #[test]
    fn test_classifier_disabled_matches_rule_only() {
        let analyzer = Analyzer::new(rockstar_table(), ClassifierHandle::unavailable());
        let text = "We want a rockstar. Young people only!";
        let with_ml = analyzer.analyze(text, true).unwrap();
        let without_ml = analyzer.analyze(text, false).unwrap();
        assert_eq!(with_ml, without_ml);
        assert!(with_ml.highlights.iter().all(Hit::is_rule));
    }

    #[test]
    fn test_classifier_hits_join_the_result() {
        let classifier: Arc<dyn SentenceClassifier> =
            Arc::new(FixedClassifier(vec![(1, 0.9), (0, 0.3)]));
        let analyzer = Analyzer::new(rockstar_table(), ClassifierHandle::ready(classifier));
        let text = "We want a rockstar. Apply now!";
        let result = analyzer.analyze(text, true).unwrap();

        let ml: Vec<&Hit> = result.highlights.iter().filter(|h| !h.is_rule()).collect();
        // one age hit per sentence, the 0.3 gender score is under threshold
        assert_eq!(ml.len(), 2);
        assert!(ml.iter().all(|h| h.category == CLASSIFIER_LABELS[1]));
        assert!(ml.iter().all(|h| h.span.is_none()));
        assert_eq!(result.counts.get(CLASSIFIER_LABELS[1]), 2);
        assert_eq!(
            result.summary,
            format!("Most flags in **{}**; rules + ML caught issues.", CLASSIFIER_LABELS[1])
        );
        // classifier hits never produce suggestions or rewrites
        assert_eq!(result.suggestions.len(), 1);
        assert_eq!(result.changes.len(), 1);
        // ml disabled for this call: rule-only
        let rule_only = analyzer.analyze(text, false).unwrap();
        assert!(rule_only.highlights.iter().all(Hit::is_rule));
        assert!(rule_only.score > result.score);
    }

    #[test]
    fn test_classifier_failure_is_not_a_clean_result() {
        let classifier: Arc<dyn SentenceClassifier> = Arc::new(BrokenClassifier);
        let analyzer = Analyzer::new(rockstar_table(), ClassifierHandle::ready(classifier));
        let err = analyzer.analyze("Nothing to see here.", true).unwrap_err();
        assert!(matches!(err, AnalysisError::Classification { .. }));
        // rule-only calls still succeed
        assert!(analyzer.analyze("Nothing to see here.", false).is_ok());
    }

    #[test]
    fn test_threshold_validation() {
        let analyzer = Analyzer::new(rockstar_table(), ClassifierHandle::unavailable());
        assert!(analyzer.with_threshold(1.5).is_err());
        let analyzer = Analyzer::new(rockstar_table(), ClassifierHandle::unavailable())
            .with_threshold(0.8)
            .unwrap();
        assert!((analyzer.threshold() - 0.8).abs() < f64::EPSILON);
    }

    #[test]
    fn test_repeated_runs_are_identical() {
        let analyzer = Analyzer::with_bundled_rules().unwrap();
        let text = "Young and dynamic team seeks a rockstar ninja. Native English speaker, \
                    top-tier university degree. Must be able to stand for long shifts.";
        let first = analyzer.analyze(text, false).unwrap();
        let second = analyzer.analyze(text, false).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_load_rules_from_resolved_path() {
        let bundled = load_rules_from(None).unwrap();
        assert!(Arc::ptr_eq(&bundled, &RuleTable::bundled().unwrap()));

        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("rules.yml");
        std::fs::write(&path, "categories:\n  elitism:\n    terms:\n      - phrase: ivy league\n")
            .unwrap();
        let table = load_rules_from(Some(path.as_path())).unwrap();
        assert_eq!(table.categories(), vec!["elitism"]);

        std::fs::write(&path, [0xff, 0xfe, b'\n']).unwrap();
        let err = load_rules_from(Some(path.as_path())).unwrap_err();
        assert!(matches!(err, AnalysisError::Rules { .. }));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_analyzer_debug_names_the_classifier_state() {
        let analyzer = Analyzer::new(rockstar_table(), ClassifierHandle::unavailable());
        let debug = format!("{analyzer:?}");
        assert!(debug.starts_with("Analyzer"));
        assert!(debug.contains("ClassifierHandle"));
    }

    #[test]
    fn test_hit_source_serialization() {
        assert_eq!(serde_json::to_string(&HitSource::Rule).unwrap(), "\"rule\"");
        assert_eq!(serde_json::to_string(&HitSource::Classifier).unwrap(), "\"ml\"");
    }
}
