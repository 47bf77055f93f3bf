// ============================================================
// Layer 4 — Query/Document Flattener
// ============================================================
// Turns "one list of candidate documents per query" into
// three parallel lists with one entry per (query, document)
// pair, so every later stage can work pair by pair:
//
//   queries:   ["q0", "q0", "q0", "q1"]
//   documents: [ d0,   d1,   d2,   d3 ]
//   query_ids: [  0,    0,    0,    1 ]
//
// Order is preserved (outer loop over queries, inner loop over
// that query's documents). Nothing is filtered or deduplicated.

use crate::domain::{document::Document, error::ReaderError};

/// Parallel (query, document, query id) lists
#[derive(Debug, Clone, Default)]
pub struct Flattened<'a> {
    pub queries:   Vec<&'a str>,
    pub documents: Vec<&'a Document>,
    pub query_ids: Vec<usize>,
}

impl Flattened<'_> {
    /// Number of (query, document) pairs
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// Pair every query with each of its documents.
pub fn flatten_documents<'a>(
    queries:   &[&'a str],
    documents: &[&'a [Document]],
) -> Result<Flattened<'a>, ReaderError> {
    if queries.len() != documents.len() {
        return Err(ReaderError::InvalidInput(format!(
            "got {} queries but {} document lists",
            queries.len(),
            documents.len()
        )));
    }

    let mut flat = Flattened::default();
    let pairs = queries.iter().copied().zip(documents.iter().copied());
    for (query_id, (query, docs)) in pairs.enumerate() {
        for doc in docs {
            flat.queries.push(query);
            flat.documents.push(doc);
            flat.query_ids.push(query_id);
        }
    }
    Ok(flat)
}
