// ============================================================
// Layer 3 — ExtractedAnswer Domain Type
// ============================================================
// The output of the reader. In extractive Q&A the answer is
// never generated: it is a SPAN of characters that already
// exists in one of the candidate documents.
//
// Example:
//   Question: "Who is the chancellor of Germany?"
//   Document: "Olaf Scholz is the chancellor of Germany"
//   Answer:   characters 0..11 → "Olaf Scholz"
//
// One extra entry per query may say "the answer is not in
// these documents". That entry has no data, no document and
// no offset; only a score.
//
// Reference: Rust Book §5 (Structs)

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::document::Document;

/// Metadata key added to answers whose document has a page number
pub const ANSWER_PAGE_NUMBER_KEY: &str = "answer_page_number";

/// A half-open [start, end) character range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end:   usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Number of characters covered; 0 for inverted spans
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An answer span (or the "no answer" option) for one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedAnswer {
    /// The query this answer belongs to
    pub query: String,

    /// The matched text, None for the no-answer entry
    pub data: Option<String>,

    /// The document the span was found in
    pub document: Option<Document>,

    /// Character span inside `document.content`
    pub document_offset: Option<Span>,

    /// Probability in [0, 1]
    pub score: f64,

    #[serde(default)]
    pub meta: Map<String, Value>,
}

impl ExtractedAnswer {
    /// Build an answer that points into `document`
    pub fn from_span(
        query:    impl Into<String>,
        document: &Document,
        span:     Span,
        score:    f64,
    ) -> Self {
        Self {
            query:           query.into(),
            data:            document.substring(span),
            document:        Some(document.clone()),
            document_offset: Some(span),
            score,
            meta:            Map::new(),
        }
    }

    /// Build the "no answer" entry for a query
    pub fn no_answer(query: impl Into<String>, score: f64) -> Self {
        Self {
            query:           query.into(),
            data:            None,
            document:        None,
            document_offset: None,
            score,
            meta:            Map::new(),
        }
    }

    pub fn is_no_answer(&self) -> bool {
        self.data.is_none() && self.document.is_none() && self.document_offset.is_none()
    }

    /// The page the answer starts on, when it was annotated
    pub fn page_number(&self) -> Option<i64> {
        self.meta.get(ANSWER_PAGE_NUMBER_KEY).and_then(Value::as_i64)
    }
}
