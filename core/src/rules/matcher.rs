//! Lexical phrase matcher.
//!
//! Each rule is scanned independently with a leftmost, non-overlapping scan,
//! so hits from different rules may overlap each other. Matching is purely
//! lexical: "senior" matches "Senior" and "SENIOR" but never "seniority".

use super::RuleTable;
use crate::analysis::{Hit, HitSource, Span};

/// Scan `text` against every rule, in table order.
///
/// Hits are emitted rule by rule (not by text position). Every span slices
/// the original text to exactly the hit's `found_text`.
pub fn find_rule_hits(text: &str, table: &RuleTable) -> Vec<Hit> {
    let mut hits = Vec::new();
    if text.is_empty() {
        return hits;
    }

    for compiled in table.compiled() {
        let rule = &compiled.rule;
        for m in compiled.pattern().find_iter(text) {
            hits.push(Hit {
                category: rule.category.clone(),
                canonical_category: rule.canonical,
                weight: rule.weight,
                found_text: m.as_str().to_owned(),
                span: Some(Span::new(m.start(), m.end())),
                sentence: None,
                suggest: rule.suggest.clone(),
                note: rule.note.clone().unwrap_or_default(),
                source: HitSource::Rule,
                confidence: None,
            });
        }
    }

    log::debug!("[rules] {} rule hits in {} bytes", hits.len(), text.len());
    hits
}
