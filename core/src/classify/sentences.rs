//! Lightweight terminator-based sentence splitter.
//!
//! Splits after `.`, `!` or `?` when followed by whitespace. Abbreviations
//! ("e.g. foo") split too; that is an accepted limitation.

use crate::analysis::Span;

/// A sentence slice together with its byte range in the original text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sentence<'a> {
    pub text: &'a str,
    pub span: Span,
}

fn is_terminator(c: char) -> bool {
    matches!(c, '.' | '!' | '?')
}

/// Split `text` into non-empty sentences. Leading and trailing whitespace of
/// the whole text is ignored; whitespace between sentences is consumed.
pub fn split_sentences(text: &str) -> Vec<Sentence<'_>> {
    let mut sentences = Vec::new();
    let mut start: Option<usize> = None;
    let mut previous: Option<char> = None;

    for (i, c) in text.char_indices() {
        if c.is_whitespace() {
            if let Some(s) = start {
                if previous.is_some_and(is_terminator) {
                    sentences.push(Sentence {
                        text: &text[s..i],
                        span: Span::new(s, i),
                    });
                    start = None;
                }
            }
        } else if start.is_none() {
            start = Some(i);
        }
        previous = Some(c);
    }

    if let Some(s) = start {
        let end = text.trim_end().len();
        if end > s {
            sentences.push(Sentence {
                text: &text[s..end],
                span: Span::new(s, end),
            });
        }
    }

    sentences
}
