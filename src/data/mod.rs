// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between "a query and some documents" and
// "tensors the model can read".
//
// The pipeline flows in this order:
//
//   query + documents per query
//       │
//       ▼
//   Flattener            → one (query, document, query id) per pair
//       │
//       ▼
//   WindowedPreprocessor → tokenizes each pair into fixed-length
//       │                  windows, splitting long documents with
//       │                  the Chunker's sliding window
//       ▼
//   WindowBatcher        → stacks windows into tensor batches
//
// The CLI additionally uses DirectoryLoader to read documents
// from disk before any of this happens.
//
// Reference: Burn Book §4 (Batcher)
//            Rust Book §13 (Iterators and Closures)

/// Loads .txt and .docx files from a directory
pub mod loader;

/// Pairs every query with each of its documents
pub mod flattener;

/// Token-level sliding window arithmetic
pub mod chunker;

/// Builds fixed-length token windows from (query, document) pairs
pub mod preprocessor;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;
