//! Rewrite engine: substitutes rule suggestions into the text, matching the
//! casing of what was found.

use super::{escape_html, BLOCK_CLOSE, BLOCK_OPEN};
use crate::analysis::annotate::AnnotationPlan;
use crate::analysis::{Change, Hit};
use std::fmt::Write as _;

const CHANGED_COLOR: &str = "#d1fae5";

/// Output of one rewrite pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rewrite {
    pub text: String,
    /// Escaped rewrite with every substituted span highlighted.
    pub html: String,
    pub changes: Vec<Change>,
}

/// Apply suggestions of the accepted rule spans in `plan`, left to right.
///
/// Spans without a suggestion (or with an empty one) are copied through.
pub fn rewrite(text: &str, hits: &[Hit], plan: &AnnotationPlan) -> Rewrite {
    let mut out = Rewrite {
        text: String::with_capacity(text.len()),
        html: String::with_capacity(text.len() * 2 + BLOCK_OPEN.len()),
        changes: Vec::new(),
    };
    out.html.push_str(BLOCK_OPEN);

    let mut cursor = 0;
    for hit in plan.accepted.iter().filter_map(|&i| hits.get(i)) {
        let Some(span) = hit.span else { continue };
        let Some(suggest) = hit.suggest.as_deref().filter(|s| !s.is_empty()) else {
            continue;
        };

        let gap = &text[cursor..span.start];
        out.text.push_str(gap);
        out.html.push_str(&escape_html(gap));

        let found = &text[span.start..span.end];
        let replacement = match_case(found, suggest);
        out.text.push_str(&replacement);
        let _ = write!(
            out.html,
            "<span style=\"background:{CHANGED_COLOR};padding:0 2px;border-radius:3px\" \
             title=\"Replaced {} \u{2192} {}\">{}</span>",
            escape_html(found),
            escape_html(&replacement),
            escape_html(&replacement)
        );
        if !replacement.trim().is_empty() {
            out.changes.push(Change {
                category: hit.category.clone(),
                before: found.to_owned(),
                after: replacement,
                note: hit.note.clone(),
            });
        }
        cursor = span.end;
    }

    let tail = &text[cursor..];
    out.text.push_str(tail);
    out.html.push_str(&escape_html(tail));
    out.html.push_str(BLOCK_CLOSE);

    log::debug!("[rewrite] {} replacements applied", out.changes.len());
    out
}

/// Transform `suggest` to follow the casing pattern of `found`.
///
/// All-uppercase, title case and all-lowercase originals carry over; any
/// other (mixed) casing leaves the suggestion verbatim.
pub fn match_case(found: &str, suggest: &str) -> String {
    if is_upper(found) {
        suggest.to_uppercase()
    } else if is_title(found) {
        title_case(suggest)
    } else if is_lower(found) {
        suggest.to_lowercase()
    } else {
        suggest.to_owned()
    }
}

fn is_cased(c: char) -> bool {
    c.is_uppercase() || c.is_lowercase()
}

/// At least one cased character and no lowercase ones.
fn is_upper(s: &str) -> bool {
    s.chars().any(is_cased) && !s.chars().any(char::is_lowercase)
}

/// At least one cased character and no uppercase ones.
fn is_lower(s: &str) -> bool {
    s.chars().any(is_cased) && !s.chars().any(char::is_uppercase)
}

/// Uppercase only after uncased characters, lowercase only after cased ones.
fn is_title(s: &str) -> bool {
    let mut seen_cased = false;
    let mut previous_cased = false;
    for c in s.chars() {
        if c.is_uppercase() {
            if previous_cased {
                return false;
            }
            previous_cased = true;
            seen_cased = true;
        } else if c.is_lowercase() {
            if !previous_cased {
                return false;
            }
            previous_cased = true;
            seen_cased = true;
        } else {
            previous_cased = false;
        }
    }
    seen_cased
}

fn is_apostrophe(c: char) -> bool {
    matches!(c, '\'' | '\u{2019}')
}

/// Uppercase the first letter of every word and lowercase the rest. Words
/// start after whitespace or punctuation, but not after an apostrophe, and a
/// digit counts as part of the word (`3rd`).
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for c in s.chars() {
        if c.is_alphanumeric() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = !is_apostrophe(c);
        }
    }
    out
}
