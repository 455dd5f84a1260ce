//! Span renderer: the original text with rule hits highlighted and
//! classifier sentences underlined.

use super::{escape_html, BLOCK_CLOSE, BLOCK_OPEN};
use crate::analysis::annotate::AnnotationPlan;
use crate::analysis::{Hit, Span};
use std::fmt::Write as _;

/// Render `text` as escaped HTML following `plan`.
///
/// Accepted rule spans get a background in their category color with the raw
/// category as title. Each underlay wraps its sentence in one dotted
/// underline per classifier hit, nested in hit order.
pub fn render_highlights(text: &str, hits: &[Hit], plan: &AnnotationPlan) -> String {
    let spans: Vec<(&Hit, Span)> = plan
        .accepted
        .iter()
        .filter_map(|&i| hits.get(i).and_then(|h| h.span.map(|s| (h, s))))
        .collect();

    let mut out = String::with_capacity(text.len() * 2 + BLOCK_OPEN.len());
    out.push_str(BLOCK_OPEN);

    let mut cursor = 0;
    let mut next = 0;
    for underlay in &plan.underlays {
        let range = underlay.range;
        while next < spans.len() && spans[next].1.start < range.start {
            cursor = push_highlight(&mut out, text, cursor, spans[next]);
            next += 1;
        }
        out.push_str(&escape_html(&text[cursor..range.start]));

        let layers: Vec<&Hit> = underlay.hits.iter().filter_map(|&i| hits.get(i)).collect();
        for hit in &layers {
            open_underline(&mut out, hit);
        }
        cursor = range.start;
        while next < spans.len() && spans[next].1.start < range.end {
            cursor = push_highlight(&mut out, text, cursor, spans[next]);
            next += 1;
        }
        out.push_str(&escape_html(&text[cursor..range.end]));
        for _ in &layers {
            out.push_str("</span>");
        }
        cursor = range.end;
    }
    for &span in &spans[next..] {
        cursor = push_highlight(&mut out, text, cursor, span);
    }
    out.push_str(&escape_html(&text[cursor..]));

    out.push_str(BLOCK_CLOSE);
    out
}

/// Emit the gap before `span` and the highlighted span; returns the new cursor.
fn push_highlight(out: &mut String, text: &str, cursor: usize, (hit, span): (&Hit, Span)) -> usize {
    out.push_str(&escape_html(&text[cursor..span.start]));
    let _ = write!(
        out,
        "<span style=\"background:{};padding:0 2px;border-radius:3px\" title=\"{}\">{}</span>",
        hit.canonical_category.color(),
        escape_html(&hit.category),
        escape_html(&text[span.start..span.end])
    );
    span.end
}

fn open_underline(out: &mut String, hit: &Hit) {
    let _ = write!(
        out,
        "<span style=\"border-bottom:2px dotted {};padding-bottom:1px\" title=\"ML: {} ({:.2})\">",
        hit.canonical_category.underline_color(),
        escape_html(&hit.category),
        hit.confidence.unwrap_or(0.0)
    );
}
