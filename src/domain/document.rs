// ============================================================
// Layer 3 — Document Domain Type
// ============================================================
// A document handed to the reader by the caller (usually a
// retriever or a document store). The reader only ever reads
// it: answers keep a copy so the caller can trace an answer
// back to the document it came from.
//
// All offsets into `content` are CHARACTER offsets (Unicode
// scalar values), never byte offsets. A form feed ('\f')
// inside the content marks a page break.
//
// Reference: Rust Book §5 (Structs and Methods)
//            Rust Book §8 (Strings in Rust)

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use sha2::{Digest, Sha256};

use crate::domain::answer::Span;

/// Metadata key holding the page the document starts on
pub const PAGE_NUMBER_KEY: &str = "page_number";

/// A candidate document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Stable identifier, used to tell documents apart
    /// when deduplicating answers
    pub id: String,

    /// Text content. Documents without text (e.g. images)
    /// cannot be read and are rejected by the preprocessor.
    pub content: Option<String>,

    /// Free-form metadata. May contain an integer `page_number`.
    #[serde(default)]
    pub meta: Map<String, Value>,
}

impl Document {
    /// Create a document with no metadata.
    /// The id is derived from the content.
    ///
    /// Example:
    ///   let doc = Document::new("Olaf Scholz is the chancellor of Germany");
    pub fn new(content: impl Into<String>) -> Self {
        Self::with_meta(content, Map::new())
    }

    /// Create a document with metadata. The id is derived from
    /// both content and metadata, so equal documents share an id.
    pub fn with_meta(content: impl Into<String>, meta: Map<String, Value>) -> Self {
        let content = content.into();
        let id      = content_id(Some(&content), &meta);
        Self { id, content: Some(content), meta }
    }

    /// Create a document with a caller-chosen id.
    pub fn with_id(
        id:      impl Into<String>,
        content: Option<String>,
        meta:    Map<String, Value>,
    ) -> Self {
        Self { id: id.into(), content, meta }
    }

    /// The raw `page_number` metadata value, if present
    pub fn page_number(&self) -> Option<&Value> {
        self.meta.get(PAGE_NUMBER_KEY)
    }

    /// Length of the content in characters (0 without content)
    pub fn char_len(&self) -> usize {
        self.content.as_deref().map_or(0, |c| c.chars().count())
    }

    /// Extract the characters covered by `span`.
    /// Returns None when the document has no content.
    pub fn substring(&self, span: Span) -> Option<String> {
        let content = self.content.as_deref()?;
        Some(
            content
                .chars()
                .skip(span.start)
                .take(span.len())
                .collect(),
        )
    }
}

/// SHA-256 over content and serialized metadata, URL-safe base64
fn content_id(content: Option<&str>, meta: &Map<String, Value>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.unwrap_or_default().as_bytes());
    hasher.update(Value::Object(meta.clone()).to_string().as_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_equal_documents_share_an_id() {
        let a = Document::new("Angela Merkel was the chancellor of Germany.");
        let b = Document::new("Angela Merkel was the chancellor of Germany.");
        assert_eq!(a.id, b.id);
        // 32 digest bytes, unpadded base64
        assert_eq!(a.id.len(), 43);
        assert!(a.id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_metadata_changes_the_id() {
        let mut meta = Map::new();
        meta.insert(PAGE_NUMBER_KEY.to_string(), json!(3));
        let a = Document::new("Jerry is the head of the department.");
        let b = Document::with_meta("Jerry is the head of the department.", meta);
        assert_ne!(a.id, b.id);
        assert_eq!(b.page_number(), Some(&json!(3)));
    }

    #[test]
    fn test_substring_uses_character_offsets() {
        // "é" is two bytes but one character
        let doc = Document::new("café au lait");
        assert_eq!(doc.substring(Span::new(5, 7)).as_deref(), Some("au"));
        assert_eq!(doc.char_len(), 12);
    }

    #[test]
    fn test_substring_without_content() {
        let doc = Document::with_id("img-1", None, Map::new());
        assert_eq!(doc.substring(Span::new(0, 3)), None);
        assert_eq!(doc.char_len(), 0);
    }
}
