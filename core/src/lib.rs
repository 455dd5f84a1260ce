//! Bias detection for job descriptions.
//!
//! Text goes through a phrase rule matcher and, when one is configured, an
//! external sentence classifier. Hits are scored, rendered as highlighted
//! HTML, and rule suggestions are applied to produce an inclusive rewrite.

pub mod analysis;
pub mod classify;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod ingest;
pub mod render;
pub mod rules;

pub use analysis::{AnalysisResult, Analyzer, Hit, HitSource, Span};
pub use config::Config;
pub use error::AnalysisError;
pub use rules::{CanonicalCategory, Rule, RuleTable};
