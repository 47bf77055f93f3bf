// ============================================================
// Layer 4 — Page-Number Annotator
// ============================================================
// Documents converted from PDFs keep page breaks as form feed
// characters ('\f') and carry the page they start on in
// `meta.page_number`. An answer's page is then:
//
//   page_number + number of '\f' before the answer's start
//
// The result is stored under `answer_page_number` in the
// answer's own metadata.

use serde_json::Value;

use crate::domain::answer::{ExtractedAnswer, ANSWER_PAGE_NUMBER_KEY};

const FORM_FEED: char = '\u{c}';

/// Return `answer` with `answer_page_number` set when its document
/// has an integer page number. Anything else passes through unchanged.
pub fn add_answer_page_number(answer: ExtractedAnswer) -> ExtractedAnswer {
    match answer_page(&answer) {
        Some(page) => {
            let mut annotated = answer;
            annotated
                .meta
                .insert(ANSWER_PAGE_NUMBER_KEY.to_string(), Value::from(page));
            annotated
        }
        None => answer,
    }
}

fn answer_page(answer: &ExtractedAnswer) -> Option<i64> {
    let document = answer.document.as_ref()?;
    let span     = answer.document_offset?;

    let base = match document.page_number()? {
        Value::Number(n) if n.is_i64() => n.as_i64()?,
        other => {
            tracing::warn!(
                "page_number must be int, got {} on document '{}'",
                other,
                document.id
            );
            return None;
        }
    };

    let breaks = document
        .content
        .as_deref()
        .map_or(0, |c| c.chars().take(span.start).filter(|&ch| ch == FORM_FEED).count());

    Some(base + breaks as i64)
}
