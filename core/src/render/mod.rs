//! Markup output: escaping, the category legend, the standalone HTML report
//! and the plain-text rewrite export.

pub mod highlight;
pub mod rewrite;

use crate::analysis::AnalysisResult;
use crate::rules::CanonicalCategory;
use serde::Serialize;
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::Path;

/// Wrapper opened around every rendered text block.
pub(crate) const BLOCK_OPEN: &str = "<div style='white-space:pre-wrap;line-height:1.5'>";
pub(crate) const BLOCK_CLOSE: &str = "</div>";

/// Styles for the legend chips.
pub const LEGEND_CSS: &str = "<style>
  .legend { display:flex; flex-wrap:wrap; gap:8px; margin-bottom:8px;}
  .legend .chip { display:inline-flex; align-items:center; gap:6px; border-radius:999px; padding:2px 10px; font-size:12px; border:1px solid rgba(0,0,0,.08);}
  .dot { width:10px; height:10px; border-radius:999px; display:inline-block; }
</style>";

/// One chip of the color legend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LegendEntry {
    pub label: String,
    pub color: String,
}

/// Legend for the five canonical buckets, in palette order.
pub fn legend() -> Vec<LegendEntry> {
    CanonicalCategory::PALETTE
        .iter()
        .map(|c| LegendEntry {
            label: c.label().to_owned(),
            color: c.color().to_owned(),
        })
        .collect()
}

/// Escape text for inclusion in HTML element content or a quoted attribute.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Legend chips as a `<div class="legend">` block.
pub fn legend_html(entries: &[LegendEntry]) -> String {
    let mut out = String::from("<div class=\"legend\">");
    for entry in entries {
        let _ = write!(
            out,
            "<span class=\"chip\"><span class=\"dot\" style=\"background:{}\"></span>{}</span>",
            escape_html(&entry.color),
            escape_html(&entry.label)
        );
    }
    out.push_str("</div>");
    out
}

/// Write the rewritten text exactly as computed.
pub fn write_rewrite(path: &Path, result: &AnalysisResult) -> io::Result<()> {
    fs::write(path, result.rewritten_text.as_bytes())
}

/// Render a standalone HTML page for one analysis result.
pub fn report_html(result: &AnalysisResult) -> String {
    let mut out = String::with_capacity(
        result.rendered_html.len() + result.rewritten_html.len() + 2048,
    );
    out.push_str("<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\">");
    out.push_str("<title>Bias report</title>\n");
    out.push_str(LEGEND_CSS);
    out.push_str(
        "\n<style>body{font-family:sans-serif;margin:2em;} \
         .panels{display:grid;grid-template-columns:1fr 1fr;gap:2em;}</style>",
    );
    out.push_str("</head><body>\n");

    let _ = write!(
        out,
        "<h1>Bias score: {:.0}</h1>\n<p>{}</p>\n",
        result.score,
        markdown_bold(&escape_html(&result.summary))
    );

    out.push_str("<h2>By category</h2>\n<ul>");
    for (category, n) in result.counts.iter() {
        let _ = write!(out, "<li><b>{}</b>: {n}</li>", escape_html(category));
    }
    out.push_str("</ul>\n");

    out.push_str("<h2>Suggestions</h2>\n");
    if result.suggestions.is_empty() {
        out.push_str("<p>No specific rewrite suggestions.</p>\n");
    } else {
        out.push_str("<ul>");
        for s in &result.suggestions {
            let _ = write!(
                out,
                "<li><b>\u{201c}{}\u{201d}</b> \u{2192} <i>{}</i>{}</li>",
                escape_html(&s.found),
                escape_html(&s.suggest),
                note_suffix(&s.note)
            );
        }
        out.push_str("</ul>\n");
    }

    out.push_str(&legend_html(&result.legend));
    out.push_str("\n<div class=\"panels\">\n<div><h3>Original (highlighted)</h3>");
    out.push_str(&result.rendered_html);
    out.push_str("</div>\n<div><h3>Inclusive rewrite</h3>");
    out.push_str(&result.rewritten_html);
    out.push_str("</div>\n</div>\n");

    out.push_str("<h2>Applied replacements</h2>\n");
    if result.changes.is_empty() {
        out.push_str("<p>No automatic replacements were applied.</p>\n");
    } else {
        out.push_str("<ul>");
        for change in &result.changes {
            let _ = write!(
                out,
                "<li><b>{}</b>: \u{201c}{}\u{201d} \u{2192} <i>{}</i>{}</li>",
                escape_html(&change.category),
                escape_html(&change.before),
                escape_html(&change.after),
                note_suffix(&change.note)
            );
        }
        out.push_str("</ul>\n");
    }

    out.push_str("</body></html>\n");
    out
}

fn note_suffix(note: &str) -> String {
    if note.is_empty() {
        String::new()
    } else {
        format!(" \u{2014} {}", escape_html(note))
    }
}

/// Turn `**x**` pairs into `<b>x</b>`. Input must already be escaped.
fn markdown_bold(escaped: &str) -> String {
    let mut out = String::with_capacity(escaped.len());
    let mut parts = escaped.split("**");
    if let Some(first) = parts.next() {
        out.push_str(first);
    }
    let rest: Vec<&str> = parts.collect();
    let mut chunks = rest.chunks_exact(2);
    for pair in chunks.by_ref() {
        let _ = write!(out, "<b>{}</b>{}", pair[0], pair[1]);
    }
    for unpaired in chunks.remainder() {
        out.push_str("**");
        out.push_str(unpaired);
    }
    out
}
