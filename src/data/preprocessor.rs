// ============================================================
// Layer 4 — Windowed Preprocessor
// ============================================================
// Tokenizes every (query, document) pair into one or more
// fixed-length windows the model can read:
//
//   [CLS] query tokens [SEP] document slice [SEP] [PAD] [PAD] ...
//   └──────────────── max_seq_length tokens ────────────────┘
//
// When the document does not fit, the Chunker splits its
// tokens into overlapping slices and each slice becomes its own
// window with a full copy of the query. Consecutive slices
// share exactly `stride` tokens; a long query can shrink the
// slice to `stride` tokens or fewer, and splitting such a
// document is an InvalidInput error rather than a crawl.
//
// For every token position a window records:
//   - the token id and attention mask (1 = real, 0 = padding)
//   - its Segment: Query, Document, or Special (CLS/SEP/PAD)
//   - for Document tokens only, the character span in the
//     source document, so predicted token indices can be turned
//     back into document text
//
// Each window also remembers which query group and which
// flattened document it came from.
//
// Reference: Devlin et al. (2019) BERT paper - input representation
//            Rust Book §8 (Vectors)

use std::collections::HashMap;

use crate::data::chunker::Chunker;
use crate::data::flattener::Flattened;
use crate::domain::error::ReaderError;
use crate::domain::traits::{TokenEncoder, TokenizedText};

/// [CLS] + [SEP] after the query + [SEP] after the document
pub const SPECIAL_TOKENS_PER_WINDOW: usize = 3;

/// Shortest window that still fits one query and one document token
pub const MIN_SEQ_LENGTH: usize = SPECIAL_TOKENS_PER_WINDOW + 2;

/// Which part of the pair a token belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Segment {
    Query,
    Document,
    /// Special and padding tokens
    Special,
}

impl Segment {
    /// Integer sentinel: query = 0, document = 1, other = -1
    pub fn as_id(self) -> i8 {
        match self {
            Segment::Query    => 0,
            Segment::Document => 1,
            Segment::Special  => -1,
        }
    }
}

/// One fixed-length tokenized slice of a (query, document) pair
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    pub input_ids:      Vec<u32>,
    pub attention_mask: Vec<u32>,
    pub segments:       Vec<Segment>,
    /// Character span per token; Some only for document tokens
    pub offsets:        Vec<Option<(usize, usize)>>,
    /// Index of the originating query group
    pub query_id:       usize,
    /// Index into the flattened document list
    pub document_id:    usize,
}

impl Window {
    pub fn len(&self) -> usize {
        self.input_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.input_ids.is_empty()
    }

    /// Character span of token `index`, None for non-document tokens
    pub fn token_to_chars(&self, index: usize) -> Option<(usize, usize)> {
        self.offsets.get(index).copied().flatten()
    }

    /// Segment ids as integer sentinels (see `Segment::as_id`)
    pub fn segment_ids(&self) -> Vec<i8> {
        self.segments.iter().map(|s| s.as_id()).collect()
    }

    /// Character range covered by this window's document tokens
    pub fn document_char_range(&self) -> Option<(usize, usize)> {
        let mut spans = self.offsets.iter().flatten();
        let first     = spans.next()?;
        let last      = spans.last().unwrap_or(first);
        Some((first.0, last.1))
    }
}

/// Builds windows for flattened (query, document) pairs
pub struct WindowedPreprocessor {
    max_seq_length: usize,
    stride:         usize,
}

impl WindowedPreprocessor {
    pub fn new(max_seq_length: usize, stride: usize) -> Self {
        Self { max_seq_length, stride }
    }

    /// Tokenize every pair into windows.
    ///
    /// Returns at least one window per pair; exactly one when no
    /// document needed splitting. Windows keep pair order.
    pub fn preprocess(
        &self,
        encoder: &dyn TokenEncoder,
        pairs:   &Flattened<'_>,
    ) -> Result<Vec<Window>, ReaderError> {
        if self.max_seq_length < MIN_SEQ_LENGTH {
            return Err(ReaderError::InvalidConfig(format!(
                "max_seq_length must be at least {MIN_SEQ_LENGTH}, got {}",
                self.max_seq_length
            )));
        }

        // The same query text repeats for every one of its documents
        let mut query_cache: HashMap<usize, TokenizedText> = HashMap::new();
        let mut windows = Vec::with_capacity(pairs.len());

        for (document_id, ((query, document), &query_id)) in pairs
            .queries
            .iter()
            .zip(&pairs.documents)
            .zip(&pairs.query_ids)
            .enumerate()
        {
            let content = document.content.as_deref().ok_or_else(|| {
                ReaderError::InvalidInput(format!(
                    "document '{}' has no text content",
                    document.id
                ))
            })?;

            if !query_cache.contains_key(&query_id) {
                let encoded = encoder.encode(query).map_err(ReaderError::Model)?;
                query_cache.insert(query_id, encoded);
            }
            let query_tokens = &query_cache[&query_id];
            let doc_tokens   = encoder.encode(content).map_err(ReaderError::Model)?;

            let before = windows.len();
            self.windows_for_pair(encoder, query_tokens, &doc_tokens, query_id, document_id, &mut windows)?;
            tracing::debug!(
                "Document {} ({} tokens) → {} window(s)",
                document_id,
                doc_tokens.len(),
                windows.len() - before
            );
        }

        Ok(windows)
    }

    fn windows_for_pair(
        &self,
        encoder:      &dyn TokenEncoder,
        query:        &TokenizedText,
        document:     &TokenizedText,
        query_id:     usize,
        document_id:  usize,
        out:          &mut Vec<Window>,
    ) -> Result<(), ReaderError> {
        let special = encoder.special_tokens();

        // Leave room for at least one document token
        let max_query = self.max_seq_length - SPECIAL_TOKENS_PER_WINDOW - 1;
        let query_ids = if query.len() > max_query {
            tracing::warn!(
                "Query has {} tokens, truncating to {} to fit max_seq_length={}",
                query.len(),
                max_query,
                self.max_seq_length
            );
            &query.ids[..max_query]
        } else {
            &query.ids[..]
        };

        let capacity = self.max_seq_length - SPECIAL_TOKENS_PER_WINDOW - query_ids.len();

        // Splitting must move forward by capacity - stride tokens
        if document.len() > capacity && self.stride >= capacity {
            return Err(ReaderError::InvalidInput(format!(
                "stride ({}) must be smaller than the {} document tokens that fit next to a \
                 {}-token query (max_seq_length={})",
                self.stride,
                capacity,
                query_ids.len(),
                self.max_seq_length
            )));
        }
        let chunker = Chunker::new(capacity, self.stride);

        for range in chunker.ranges(document.len()) {
            let mut input_ids = Vec::with_capacity(self.max_seq_length);
            let mut segments  = Vec::with_capacity(self.max_seq_length);
            let mut offsets   = Vec::with_capacity(self.max_seq_length);

            input_ids.push(special.cls);
            segments.push(Segment::Special);
            offsets.push(None);

            for &id in query_ids {
                input_ids.push(id);
                segments.push(Segment::Query);
                offsets.push(None);
            }

            input_ids.push(special.sep);
            segments.push(Segment::Special);
            offsets.push(None);

            for t in range {
                input_ids.push(document.ids[t]);
                segments.push(Segment::Document);
                offsets.push(document.offsets.get(t).copied());
            }

            input_ids.push(special.sep);
            segments.push(Segment::Special);
            offsets.push(None);

            // Pad up to the fixed window length
            let real_tokens    = input_ids.len();
            let mut attention_mask = vec![1u32; real_tokens];
            input_ids.resize(self.max_seq_length, special.pad);
            attention_mask.resize(self.max_seq_length, 0);
            segments.resize(self.max_seq_length, Segment::Special);
            offsets.resize(self.max_seq_length, None);

            out.push(Window {
                input_ids,
                attention_mask,
                segments,
                offsets,
                query_id,
                document_id,
            });
        }
        Ok(())
    }
}
