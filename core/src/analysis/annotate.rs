//! Conflict resolution for everything that gets marked up.
//!
//! Rule spans and classifier sentence ranges are merged once, here, into an
//! [`AnnotationPlan`]. The span renderer and the rewrite engine both walk the
//! same plan, so their output always agrees on which spans were marked.

use super::{Hit, Span};

/// A classifier underlay over one sentence. Several classifier hits on the
/// same sentence share an underlay and render nested, in hit order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Underlay {
    pub range: Span,
    pub hits: Vec<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotationPlan {
    /// Indices of rule hits to mark, ascending by span start, never overlapping.
    pub accepted: Vec<usize>,
    /// Rule hits that started inside an earlier accepted span. Still counted
    /// and scored, just not marked.
    pub dropped: Vec<usize>,
    /// Classifier underlays, ascending by start, never overlapping each other
    /// and never cut by an accepted rule span.
    pub underlays: Vec<Underlay>,
}

impl AnnotationPlan {
    /// Resolve overlaps among `hits` (indices refer to this slice).
    ///
    /// Rule spans: sorted by start (stable, so discovery order breaks ties),
    /// and a span starting before the end of the previous accepted span is
    /// dropped, so the earliest start wins. Underlays: dropped when an accepted
    /// rule span crosses the sentence boundary.
    pub fn build(text: &str, hits: &[Hit]) -> Self {
        let mut positioned: Vec<(usize, Span)> = hits
            .iter()
            .enumerate()
            .filter_map(|(i, h)| h.span.map(|s| (i, s)))
            .filter(|(_, s)| text.get(s.start..s.end).is_some())
            .collect();
        positioned.sort_by_key(|&(_, s)| s.start);

        let mut plan = Self::default();
        let mut cursor = 0;
        let mut accepted_spans = Vec::new();
        for (i, span) in positioned {
            if span.start < cursor {
                log::warn!(
                    "[annotate] Dropping overlapping '{}' at {}..{} from markup",
                    hits[i].found_text,
                    span.start,
                    span.end
                );
                plan.dropped.push(i);
                continue;
            }
            plan.accepted.push(i);
            accepted_spans.push(span);
            cursor = span.end;
        }

        let mut groups: Vec<Underlay> = Vec::new();
        for (i, hit) in hits.iter().enumerate() {
            let Some(range) = hit.sentence.filter(|_| hit.span.is_none()) else {
                continue;
            };
            if text.get(range.start..range.end).is_none() || range.is_empty() {
                continue;
            }
            match groups.iter_mut().find(|g| g.range == range) {
                Some(group) => group.hits.push(i),
                None => groups.push(Underlay {
                    range,
                    hits: vec![i],
                }),
            }
        }
        groups.sort_by_key(|g| g.range.start);

        for group in groups {
            let cut = accepted_spans
                .iter()
                .any(|s| s.overlaps(&group.range) && !group.range.contains(s));
            let collides = plan
                .underlays
                .last()
                .is_some_and(|prev| prev.range.overlaps(&group.range));
            if cut || collides {
                log::warn!(
                    "[annotate] Skipping sentence underlay at {}..{}",
                    group.range.start,
                    group.range.end
                );
                continue;
            }
            plan.underlays.push(group);
        }

        plan
    }
}
