//! Canonical bias buckets and the table that maps free-text category names
//! (rule-table keys and classifier labels) onto them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the fixed buckets every hit is normalized into for coloring and
/// labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalCategory {
    GenderCoded,
    AgeCoded,
    Ableist,
    ImmigrationCoded,
    Elitism,
    /// Catch-all bucket. Only reachable through an explicit `canonical: other`
    /// declaration in the rule document.
    Other,
}

/// Highlight color for the catch-all bucket.
const DEFAULT_HIGHLIGHT: &str = "#ffe58f";
/// Underline color for classifier sentences in the catch-all bucket.
const DEFAULT_UNDERLINE: &str = "#ffd666";

impl CanonicalCategory {
    /// The five palette buckets, in legend order.
    pub const PALETTE: [Self; 5] = [
        Self::GenderCoded,
        Self::AgeCoded,
        Self::Ableist,
        Self::ImmigrationCoded,
        Self::Elitism,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::GenderCoded => "gender_coded",
            Self::AgeCoded => "age_coded",
            Self::Ableist => "ableist",
            Self::ImmigrationCoded => "immigration_coded",
            Self::Elitism => "elitism",
            Self::Other => "other",
        }
    }

    /// Human-readable legend label.
    pub fn label(self) -> &'static str {
        match self {
            Self::GenderCoded => "Gender-coded",
            Self::AgeCoded => "Age-coded",
            Self::Ableist => "Ableist",
            Self::ImmigrationCoded => "Immigration-coded",
            Self::Elitism => "Elitism",
            Self::Other => "Other",
        }
    }

    /// Background color used for rule highlights.
    pub fn color(self) -> &'static str {
        match self {
            Self::GenderCoded => "#ffcc00",
            Self::AgeCoded => "#7dd3fc",
            Self::Ableist => "#fca5a5",
            Self::ImmigrationCoded => "#a7f3d0",
            Self::Elitism => "#c4b5fd",
            Self::Other => DEFAULT_HIGHLIGHT,
        }
    }

    /// Border color used for classifier sentence underlays.
    pub fn underline_color(self) -> &'static str {
        match self {
            Self::Other => DEFAULT_UNDERLINE,
            other => other.color(),
        }
    }

    /// Parse an explicit bucket name (`gender_coded`, `other`, ...).
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().to_lowercase();
        [
            Self::GenderCoded,
            Self::AgeCoded,
            Self::Ableist,
            Self::ImmigrationCoded,
            Self::Elitism,
            Self::Other,
        ]
        .into_iter()
        .find(|c| c.as_str() == name)
    }

    /// Resolve a raw category string through the mapping table.
    ///
    /// Returns `None` when nothing matches; callers registering categories
    /// treat that as an error instead of silently bucketing the name.
    pub fn resolve(raw: &str) -> Option<Self> {
        let lowered = raw.to_lowercase();
        let tokens: Vec<&str> = lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .collect();

        CATEGORY_MAPPING
            .iter()
            .find(|(matcher, _)| matcher.matches(&tokens))
            .map(|&(_, category)| category)
    }
}

impl fmt::Display for CanonicalCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a mapping entry recognizes a tokenized category name.
enum TokenMatch {
    /// Some token starts with this prefix.
    Prefix(&'static str),
    /// Some token equals one of these words.
    AnyOf(&'static [&'static str]),
    /// These two tokens appear next to each other.
    Pair(&'static str, &'static str),
}

impl TokenMatch {
    fn matches(&self, tokens: &[&str]) -> bool {
        match self {
            Self::Prefix(prefix) => tokens.iter().any(|t| t.starts_with(prefix)),
            Self::AnyOf(words) => tokens.iter().any(|t| words.contains(t)),
            Self::Pair(first, second) => tokens
                .windows(2)
                .any(|w| w[0] == *first && w[1] == *second),
        }
    }
}

/// Ordered mapping table; the first matching entry wins.
const CATEGORY_MAPPING: &[(TokenMatch, CanonicalCategory)] = &[
    (TokenMatch::Prefix("gender"), CanonicalCategory::GenderCoded),
    (TokenMatch::AnyOf(&["age"]), CanonicalCategory::AgeCoded),
    (
        TokenMatch::AnyOf(&["ableist", "ableism", "disability"]),
        CanonicalCategory::Ableist,
    ),
    (
        TokenMatch::AnyOf(&["immigration", "nationality"]),
        CanonicalCategory::ImmigrationCoded,
    ),
    (
        TokenMatch::AnyOf(&["elitist", "elitism"]),
        CanonicalCategory::Elitism,
    ),
    (TokenMatch::Pair("top", "tier"), CanonicalCategory::Elitism),
];
