//! Hit aggregation: per-category counts, the bias score, the summary line
//! and the suggestion list.

use super::{Hit, Suggestion};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// Words per normalization block; longer texts tolerate more raw hits.
const WORDS_PER_BLOCK: f64 = 75.0;

const NO_ISSUES_SUMMARY: &str = "No obvious issues detected.";

/// Whitespace-delimited word count.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Score in `[0, 100]`: 100 is clean, 0 is maximally biased.
///
/// Non-increasing in `weighted_sum`, non-decreasing in `word_count`.
pub fn bias_score(weighted_sum: f64, word_count: usize) -> f64 {
    let words = word_count.max(1) as f64;
    let penalty = (100.0 * weighted_sum / (words / WORDS_PER_BLOCK + 1.0)).min(100.0);
    (100.0 - penalty).clamp(0.0, 100.0)
}

/// Hit counts keyed by raw category, in order of first appearance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryCounts {
    entries: Vec<(String, usize)>,
}

impl CategoryCounts {
    pub fn tally(hits: &[Hit]) -> Self {
        let mut counts = Self::default();
        for hit in hits {
            counts.increment(&hit.category);
        }
        counts
    }

    pub fn increment(&mut self, category: &str) {
        match self.entries.iter_mut().find(|(name, _)| name.as_str() == category) {
            Some((_, n)) => *n += 1,
            None => self.entries.push((category.to_owned(), 1)),
        }
    }

    pub fn get(&self, category: &str) -> usize {
        self.entries
            .iter()
            .find(|(name, _)| name == category)
            .map_or(0, |&(_, n)| n)
    }

    /// Category with the highest count; ties go to the earliest inserted.
    pub fn top(&self) -> Option<(&str, usize)> {
        let mut best: Option<(&str, usize)> = None;
        for (name, n) in &self.entries {
            if best.map_or(true, |(_, b)| *n > b) {
                best = Some((name.as_str(), *n));
            }
        }
        best
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.entries.iter().map(|(name, n)| (name.as_str(), *n))
    }

    pub fn total(&self) -> usize {
        self.entries.iter().map(|(_, n)| n).sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for CategoryCounts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, n) in &self.entries {
            map.serialize_entry(name, n)?;
        }
        map.end()
    }
}

/// One-line summary naming the most-flagged category.
pub fn summarize(counts: &CategoryCounts, classifier_contributed: bool) -> String {
    match counts.top() {
        None => NO_ISSUES_SUMMARY.to_owned(),
        Some((category, _)) => {
            let sources = if classifier_contributed {
                "rules + ML"
            } else {
                "rules"
            };
            format!("Most flags in **{category}**; {sources} caught issues.")
        }
    }
}

/// Rule hits carrying a non-empty suggestion, in matcher discovery order.
pub fn collect_suggestions(hits: &[Hit]) -> Vec<Suggestion> {
    hits.iter()
        .filter(|h| h.is_rule())
        .filter_map(|h| {
            let suggest = h.suggest.as_deref().filter(|s| !s.is_empty())?;
            Some(Suggestion {
                found: h.found_text.clone(),
                suggest: suggest.to_owned(),
                note: h.note.clone(),
            })
        })
        .collect()
}
