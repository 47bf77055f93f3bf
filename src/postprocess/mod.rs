// ============================================================
// Layer 4 — Answer Postprocessing
// ============================================================
// Everything between "raw start/end logits" and "a ranked list
// of answers per query".
//
//   SpanLogits (one row per window)
//       │
//       ▼
//   SpanDecoder   → top-k character spans + probabilities
//       │           per window
//       ▼
//   nest_answers  → group by query, rank, deduplicate,
//       │           truncate, add the no-answer entry
//       ▼
//   Vec<Vec<ExtractedAnswer>>
//
// Deduplication and page-number annotation are called by
// nest_answers but are public so they can be used (and tested)
// on their own.
//
// Reference: Rust Book §13 (Iterators and Closures)

/// Start/end logits → ranked character spans
pub mod decoder;

/// Greedy overlap-based deduplication
pub mod dedup;

/// Form-feed based page numbers for answers
pub mod page_number;

/// Per-query aggregation with the no-answer option
pub mod nesting;
