//! Sentence-level classifier adapter.
//!
//! The classifier itself is an external oracle behind [`SentenceClassifier`].
//! Whether one exists is decided once, when the [`ClassifierHandle`] is
//! built; the oracle is then initialized lazily on first use and shared.

pub mod command;
pub mod sentences;

pub use command::CommandClassifier;
pub use sentences::{split_sentences, Sentence};

use crate::analysis::{Hit, HitSource};
use crate::config::ClassifierConfig;
use crate::rules::CanonicalCategory;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;

/// Default confidence threshold for keeping a (label, score) pair.
pub const DEFAULT_THRESHOLD: f64 = 0.55;

/// Candidate labels sent with every sentence, in this order.
pub const CLASSIFIER_LABELS: [&str; 5] = [
    "gender-coded language in hiring",
    "age-coded or age-restrictive hiring language",
    "ableist or disability-exclusionary language",
    "immigration or nationality-restrictive language",
    "elitist education requirements (e.g., top-tier only)",
];

/// Base weight per label; labels not listed weigh 1.0.
const LABEL_WEIGHTS: [(&str, f64); 5] = [
    (CLASSIFIER_LABELS[0], 1.0),
    (CLASSIFIER_LABELS[1], 1.2),
    (CLASSIFIER_LABELS[2], 1.1),
    (CLASSIFIER_LABELS[3], 1.2),
    (CLASSIFIER_LABELS[4], 0.8),
];

#[derive(Error, Debug)]
pub enum ClassifyError {
    #[error("Classifier executable not found: {0}")]
    NotFound(String),
    #[error("Classifier command failed: {0}")]
    CommandFailed(String),
    #[error("Failed to parse classifier response: {0}")]
    ParseError(String),
    #[error("Empty response from classifier")]
    EmptyResponse,
    #[error("Classifier threshold must be within [0, 1], got {0}")]
    InvalidThreshold(f64),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One (label, score) pair returned by the oracle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelScore {
    pub label: String,
    pub score: f64,
}

/// Multi-label sentence classifier oracle.
///
/// Given a sentence and the candidate labels, returns a score in `[0, 1]` per
/// label, sorted by descending score. Labels are independent (multi-label).
pub trait SentenceClassifier: Send + Sync {
    fn classify(&self, sentence: &str, labels: &[&str]) -> Result<Vec<LabelScore>, ClassifyError>;
}

type Loader = Box<dyn Fn() -> Result<Arc<dyn SentenceClassifier>, ClassifyError> + Send + Sync>;

/// Capability flag plus lazily-initialized, shared classifier instance.
pub struct ClassifierHandle {
    loader: Option<Loader>,
    instance: Mutex<Option<Arc<dyn SentenceClassifier>>>,
}

impl ClassifierHandle {
    /// No classifier: analysis runs rule-only for the lifetime of the handle.
    pub fn unavailable() -> Self {
        Self {
            loader: None,
            instance: Mutex::new(None),
        }
    }

    /// An already-initialized classifier.
    pub fn ready(classifier: Arc<dyn SentenceClassifier>) -> Self {
        Self {
            loader: None,
            instance: Mutex::new(Some(classifier)),
        }
    }

    /// A classifier that is known to exist but is built on first use.
    pub fn lazy<F>(loader: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn SentenceClassifier>, ClassifyError> + Send + Sync + 'static,
    {
        Self {
            loader: Some(Box::new(loader)),
            instance: Mutex::new(None),
        }
    }

    /// Probe for the configured classifier command once. A missing command or
    /// executable downgrades to [`ClassifierHandle::unavailable`].
    pub fn detect(config: &ClassifierConfig) -> Self {
        if !config.enabled {
            log::info!("[classifier] Disabled by configuration");
            return Self::unavailable();
        }
        let Some(command_line) = config.command.clone() else {
            log::info!("[classifier] No classifier command configured; running rules only");
            return Self::unavailable();
        };
        match CommandClassifier::parse(&command_line) {
            Ok(classifier) if classifier.is_available() => {
                log::info!("[classifier] Using '{command_line}'");
                Self::lazy(move || {
                    log::info!("[classifier] Initializing '{command_line}'");
                    let classifier: Arc<dyn SentenceClassifier> =
                        Arc::new(CommandClassifier::parse(&command_line)?);
                    Ok(classifier)
                })
            }
            Ok(_) => {
                log::warn!("[classifier] '{command_line}' not found; running rules only");
                Self::unavailable()
            }
            Err(e) => {
                log::warn!("[classifier] Invalid classifier command: {e}; running rules only");
                Self::unavailable()
            }
        }
    }

    pub fn is_available(&self) -> bool {
        self.loader.is_some() || self.lock().is_some()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Arc<dyn SentenceClassifier>>> {
        self.instance.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The shared instance, initializing it exactly once. `None` when the
    /// handle is unavailable.
    fn get(&self) -> Result<Option<Arc<dyn SentenceClassifier>>, ClassifyError> {
        let mut slot = self.lock();
        if let Some(classifier) = slot.as_ref() {
            return Ok(Some(Arc::clone(classifier)));
        }
        let Some(loader) = &self.loader else {
            return Ok(None);
        };
        let classifier = loader()?;
        *slot = Some(Arc::clone(&classifier));
        Ok(Some(classifier))
    }
}

impl std::fmt::Debug for ClassifierHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassifierHandle")
            .field("available", &self.is_available())
            .finish()
    }
}

pub fn validate_threshold(threshold: f64) -> Result<(), ClassifyError> {
    if (0.0..=1.0).contains(&threshold) {
        Ok(())
    } else {
        Err(ClassifyError::InvalidThreshold(threshold))
    }
}

/// Reject oracle scores outside `[0, 1]`, NaN included.
pub(crate) fn check_score(label: &str, score: f64) -> Result<(), ClassifyError> {
    if (0.0..=1.0).contains(&score) {
        Ok(())
    } else {
        Err(ClassifyError::ParseError(format!(
            "Score {score} for '{label}' is outside [0, 1]"
        )))
    }
}

/// Base weight for a classifier label.
pub fn label_weight(label: &str) -> f64 {
    LABEL_WEIGHTS
        .iter()
        .find(|(l, _)| *l == label)
        .map_or(1.0, |&(_, w)| w)
}

/// Hit weight for a label at a given confidence.
pub fn classifier_weight(label: &str, score: f64) -> f64 {
    label_weight(label) * (0.75 + 0.5 * score)
}

/// Score every sentence of `text` and turn kept (label, score) pairs into
/// unpositioned hits.
///
/// Returns no hits when the handle is unavailable. Oracle errors propagate.
pub fn classify_text(
    handle: &ClassifierHandle,
    text: &str,
    threshold: f64,
) -> Result<Vec<Hit>, ClassifyError> {
    validate_threshold(threshold)?;
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    let Some(classifier) = handle.get()? else {
        return Ok(Vec::new());
    };

    let mut hits = Vec::new();
    for sentence in split_sentences(text) {
        let scores = classifier.classify(sentence.text, &CLASSIFIER_LABELS)?;
        for LabelScore { label, score } in scores {
            check_score(&label, score)?;
            if score < threshold {
                continue;
            }
            let Some(canonical) = CanonicalCategory::resolve(&label) else {
                log::warn!("[classifier] Ignoring unmapped label '{label}'");
                continue;
            };
            hits.push(Hit {
                weight: classifier_weight(&label, score),
                category: label,
                canonical_category: canonical,
                found_text: sentence.text.to_owned(),
                span: None,
                sentence: Some(sentence.span),
                suggest: None,
                note: String::new(),
                source: HitSource::Classifier,
                confidence: Some(score),
            });
        }
    }

    log::debug!("[classifier] {} classifier hits", hits.len());
    Ok(hits)
}
