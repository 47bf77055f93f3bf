// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Pure Rust structs, enums and traits that define what the
// reader works with:
//
//   document.rs — a candidate document (owned by the caller)
//   answer.rs   — an extracted answer span or a "no answer"
//   traits.rs   — the seams to external collaborators
//                 (span model, tokenizer, document source)
//   error.rs    — the library error type
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O or network calls
//   - NO tokenizer-specific code
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

/// A candidate document with text content and metadata
pub mod document;

/// An extracted answer with its character span and score
pub mod answer;

/// Core abstractions (traits) that other layers implement
pub mod traits;

/// Library error type
pub mod error;
