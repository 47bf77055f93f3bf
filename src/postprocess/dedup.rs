// ============================================================
// Layer 4 — Overlap Deduplicator
// ============================================================
// Neighbouring windows (and neighbouring token pairs inside one
// window) often propose nearly the same span:
//
//   "the river"  vs  "river in Maine"   ← share "river"
//
// Greedy, highest score first:
//   walk the answers in score order, keep an accepted list,
//   and drop a candidate when it overlaps an accepted answer on
//   the SAME document by more than `threshold` of the shorter
//   span's length.
//
//   overlap  = max(0, min(end1, end2) - max(start1, start2))
//   fraction = overlap / min(len1, len2)
//
// A short span fully inside a long one is a fraction of 1.0.
// Answers without a document or offset, or on a different
// document, never conflict.

use crate::domain::answer::{ExtractedAnswer, Span};

/// Number of characters two spans share
pub fn calculate_overlap(a: Span, b: Span) -> usize {
    let start = a.start.max(b.start);
    let end   = a.end.min(b.end);
    end.saturating_sub(start)
}

/// Whether two spans of the same document overlap by more than
/// `threshold` of the shorter one
fn spans_conflict(a: Span, b: Span, threshold: f64) -> bool {
    let overlap = calculate_overlap(a, b);
    if overlap == 0 {
        return false;
    }
    // overlap > 0 implies both spans are non-empty
    let shorter = a.len().min(b.len());
    (overlap as f64 / shorter as f64) > threshold
}

/// Document id and span of an answer, if it has both
fn answer_key(answer: &ExtractedAnswer) -> Option<(&str, Span)> {
    Some((answer.document.as_ref()?.id.as_str(), answer.document_offset?))
}

/// Whether `candidate` survives against every already accepted answer
pub fn should_keep(candidate: &ExtractedAnswer, accepted: &[ExtractedAnswer], threshold: f64) -> bool {
    let Some((doc, span)) = answer_key(candidate) else {
        return true;
    };
    accepted
        .iter()
        .filter_map(answer_key)
        .all(|(other_doc, other_span)| other_doc != doc || !spans_conflict(span, other_span, threshold))
}

/// Greedy deduplication over score-sorted `items`, returning the
/// indices of the survivors (at most `limit`).
///
/// `key` gives an item's document id and span; items without a
/// key never conflict. `None` as threshold keeps everything.
pub fn surviving_indices<'a, T>(
    items:     &'a [T],
    threshold: Option<f64>,
    limit:     usize,
    key:       impl Fn(&'a T) -> Option<(&'a str, Span)>,
) -> Vec<usize> {
    let mut kept:     Vec<usize> = Vec::new();
    let mut accepted: Vec<(&'a str, Span)> = Vec::new();

    for (index, item) in items.iter().enumerate() {
        if kept.len() >= limit {
            break;
        }
        let item_key = key(item);
        if let (Some(threshold), Some((doc, span))) = (threshold, item_key) {
            let conflicts = accepted
                .iter()
                .any(|&(other_doc, other_span)| other_doc == doc && spans_conflict(span, other_span, threshold));
            if conflicts {
                continue;
            }
        }
        accepted.extend(item_key);
        kept.push(index);
    }
    kept
}

/// Drop lower-ranked answers that overlap a higher-ranked one.
/// `answers` must already be sorted by descending score; `None`
/// disables deduplication.
pub fn deduplicate_by_overlap(answers: Vec<ExtractedAnswer>, threshold: Option<f64>) -> Vec<ExtractedAnswer> {
    if threshold.is_none() {
        return answers;
    }

    let mut keep = surviving_indices(&answers, threshold, usize::MAX, answer_key)
        .into_iter()
        .peekable();
    answers
        .into_iter()
        .enumerate()
        .filter_map(|(index, answer)| keep.next_if_eq(&index).map(|_| answer))
        .collect()
}
