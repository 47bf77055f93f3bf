// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The reader talks to three external collaborators, each
// behind a trait so a real implementation and a deterministic
// test stub are interchangeable:
//
//   SpanModel      — the neural network: token ids + attention
//                    mask in, start/end logits out
//   TokenEncoder   — the tokenizer: text in, token ids and
//                    character offsets out
//   DocumentSource — wherever documents come from (the CLI
//                    reads a directory)
//
// This is the Dependency Inversion Principle from SOLID,
// applied using Rust's trait system.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)
//            Rust Book §16 (Send and Sync)

use anyhow::Result;
use crate::domain::document::Document;

// ─── DocumentSource ───────────────────────────────────────────────────────────
/// Any component that can load documents from a source.
///
/// Implementations:
///   - DirectoryLoader → .txt and .docx files in a directory
pub trait DocumentSource {
    /// Load all available documents from this source.
    fn load_all(&self) -> Result<Vec<Document>>;
}

// ─── SpanModel ────────────────────────────────────────────────────────────────
/// Start and end logits for a batch of windows.
/// Row `i` of each matrix belongs to input row `i`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpanLogits {
    pub start: Vec<Vec<f32>>,
    pub end:   Vec<Vec<f32>>,
}

impl SpanLogits {
    pub fn rows(&self) -> usize {
        self.start.len()
    }

    /// Append another batch's rows (used when inference is chunked)
    pub fn extend(&mut self, other: SpanLogits) {
        self.start.extend(other.start);
        self.end.extend(other.end);
    }
}

/// A span-extraction model.
///
/// `Send + Sync` because one loaded model is shared read-only
/// by every concurrent call to the reader.
///
/// Implementations:
///   - BurnSpanModel → the transformer encoder in ml/model.rs
pub trait SpanModel: Send + Sync {
    /// Run one batch. Both inputs have one row per window and
    /// every row has the same length. Failures are fatal for the
    /// calling reader invocation; nothing is retried.
    fn infer(&self, input_ids: &[&[u32]], attention_mask: &[&[u32]]) -> Result<SpanLogits>;

    /// Whether several independent queries may share one call.
    fn supports_query_batching(&self) -> bool {
        false
    }
}

// ─── TokenEncoder ─────────────────────────────────────────────────────────────
/// Token ids of a text with the character span of every token
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenizedText {
    pub ids:     Vec<u32>,
    pub offsets: Vec<(usize, usize)>,
}

impl TokenizedText {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Ids of the special tokens used to lay out a window:
/// [CLS] query [SEP] document [SEP] [PAD]...
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecialTokens {
    pub cls: u32,
    pub sep: u32,
    pub pad: u32,
}

/// A tokenizer.
///
/// Implementations:
///   - HfTokenEncoder → a HuggingFace `tokenizers::Tokenizer`
pub trait TokenEncoder: Send + Sync {
    /// Tokenize `text` without adding special tokens.
    /// Offsets are character offsets into `text`.
    fn encode(&self, text: &str) -> Result<TokenizedText>;

    fn special_tokens(&self) -> SpecialTokens;
}
