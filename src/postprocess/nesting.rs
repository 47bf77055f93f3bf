// ============================================================
// Layer 4 — Answer Aggregation ("nesting")
// ============================================================
// Gathers the decoded spans of every window back into one
// ranked answer list per query:
//
//   windows (flat, any order of queries/documents)
//       │  group by query id
//       ▼
//   per query:
//     1. sort by descending score (stable)
//     2. drop overlapping duplicates (when a threshold is set)
//     3. keep the top_k
//     4. no-answer probability from the survivors
//     5. drop answers under the score threshold
//        (the no-answer entry is exempt)
//     6. page-number annotation
//     7. append the no-answer entry and sort again
//
// No-answer probability:
//   Each document is independent evidence. Per document the
//   chance that none of its answers is right is Π (1 - p), and
//   the query's no-answer probability is the product of those
//   per-document values. Summing ln(1 - p) instead of
//   multiplying keeps tiny products from losing precision, and
//   p = 1 gives exactly 0.
//
// The no-answer entry is ranked by its score like any other
// answer: it is not forced to the end. On equal scores real
// answers stay in front.

use crate::domain::answer::{ExtractedAnswer, Span};
use crate::domain::document::Document;
use crate::domain::error::ReaderError;
use crate::postprocess::decoder::DecodedWindow;
use crate::postprocess::dedup::surviving_indices;
use crate::postprocess::page_number::add_answer_page_number;

/// Per-call knobs for aggregation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NestingOptions {
    pub top_k:             usize,
    pub score_threshold:   Option<f64>,
    pub no_answer:         bool,
    pub overlap_threshold: Option<f64>,
}

/// A decoded span before it becomes an answer
#[derive(Debug, Clone, Copy)]
struct Candidate {
    document_id: usize,
    span:        Span,
    score:       f64,
}

/// Stable sort by descending score
pub fn sort_by_score(answers: &mut [ExtractedAnswer]) {
    answers.sort_by(|a, b| b.score.total_cmp(&a.score));
}

/// Probability that none of `answers` is correct.
/// The no-answer entry itself is ignored.
pub fn no_answer_probability(answers: &[ExtractedAnswer]) -> f64 {
    let log_none: f64 = answers
        .iter()
        .filter(|a| !a.is_no_answer())
        .map(|a| (-a.score.clamp(0.0, 1.0)).ln_1p())
        .sum();
    log_none.exp()
}

/// Turn decoded windows into one ranked answer list per query.
///
/// `query_ids` and `document_ids` hold one entry per window;
/// `documents` is the flattened document list and `queries` has
/// one entry per query id. A query without any window gets an
/// empty list.
pub fn nest_answers(
    decoded:      &[DecodedWindow],
    query_ids:    &[usize],
    document_ids: &[usize],
    documents:    &[&Document],
    queries:      &[&str],
    options:      &NestingOptions,
) -> Result<Vec<Vec<ExtractedAnswer>>, ReaderError> {
    if query_ids.len() != decoded.len() || document_ids.len() != decoded.len() {
        return Err(ReaderError::InvalidInput(format!(
            "{} decoded windows but {} query ids and {} document ids",
            decoded.len(),
            query_ids.len(),
            document_ids.len()
        )));
    }

    let mut grouped: Vec<Vec<Candidate>> = vec![Vec::new(); queries.len()];
    let mut has_windows = vec![false; queries.len()];

    for (index, ((window, &query_id), &document_id)) in decoded
        .iter()
        .zip(query_ids)
        .zip(document_ids)
        .enumerate()
    {
        if query_id >= queries.len() {
            return Err(ReaderError::InvalidInput(format!(
                "window {index} points at unknown query {query_id}"
            )));
        }
        if document_id >= documents.len() {
            return Err(ReaderError::InvalidInput(format!(
                "window {index} points at unknown document {document_id}"
            )));
        }

        tracing::debug!(
            "Window {} (query {}, document {}): {} span(s), model no-answer {:.4}",
            index,
            query_id,
            document_id,
            window.len(),
            window.no_answer_probability
        );

        has_windows[query_id] = true;
        let spans = window.starts.iter().zip(&window.ends).zip(&window.probabilities);
        for ((&start, &end), &probability) in spans {
            grouped[query_id].push(Candidate {
                document_id,
                span:  Span::new(start, end),
                score: probability,
            });
        }
    }

    Ok(grouped
        .into_iter()
        .zip(has_windows)
        .zip(queries)
        .map(|((candidates, seen), query)| {
            if seen {
                rank_query_answers(query, candidates, documents, options)
            } else {
                Vec::new()
            }
        })
        .collect())
}

/// Steps 1-7 for the candidates of a single query
fn rank_query_answers(
    query:          &str,
    mut candidates: Vec<Candidate>,
    documents:      &[&Document],
    options:        &NestingOptions,
) -> Vec<ExtractedAnswer> {
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

    let key = |c: &Candidate| documents.get(c.document_id).map(|d| (d.id.as_str(), c.span));
    let kept = surviving_indices(&candidates, options.overlap_threshold, options.top_k, key);

    // Only the survivors get a copy of their document
    let mut answers: Vec<ExtractedAnswer> = kept
        .into_iter()
        .filter_map(|i| {
            let c = &candidates[i];
            let document = documents.get(c.document_id)?;
            Some(ExtractedAnswer::from_span(query, document, c.span, c.score))
        })
        .collect();

    // Computed before thresholding: dropped answers still count as evidence
    let no_answer_score = no_answer_probability(&answers);

    if let Some(threshold) = options.score_threshold {
        answers.retain(|a| a.score >= threshold);
    }

    let mut answers: Vec<ExtractedAnswer> = answers.into_iter().map(add_answer_page_number).collect();

    if options.no_answer {
        answers.push(ExtractedAnswer::no_answer(query, no_answer_score));
        sort_by_score(&mut answers);
    }

    answers
}
