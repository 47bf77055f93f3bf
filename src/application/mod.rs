// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// This layer wires the other layers into the reader pipeline
// and the workflows the CLI exposes.
//
// Rules for this layer:
//   - No ML math or model code here
//   - No UI or printing here (that's Layer 1)
//   - No direct file parsing (that's Layer 4 and 6)
//   - Only workflow coordination
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// Reader settings, defaults and their dictionary form
pub mod config;

// The extractive reader pipeline
pub mod reader;

// Question answering over a directory of documents
pub mod ask_use_case;
