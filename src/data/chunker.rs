// ============================================================
// Layer 4 — Token Chunker
// ============================================================
// Splits a document's token sequence into overlapping windows.
//
// Why do we need chunking?
//   The model has a fixed input length (max_seq_length), and
//   the query plus special tokens already take part of it.
//   We can't just truncate: the answer might sit after the cut.
//
// Solution: Sliding window chunking with overlap
//   - Each chunk holds at most `chunk_size` document tokens
//   - Each chunk starts `overlap` tokens before the previous
//     chunk's end, so an answer crossing a boundary appears
//     whole in at least one chunk
//
// Example with chunk_size=5, overlap=2 over tokens 0..10:
//   Chunk 1:  0..5
//   Chunk 2:  3..8     (starts 2 tokens before chunk 1 ends)
//   Chunk 3:  6..10    (last chunk, shorter)
//
// The step between chunk starts = chunk_size - overlap.
// The overlap is clamped below chunk_size so the window always
// moves forward. The preprocessor never relies on the clamp: it
// rejects a stride that does not fit before splitting.
//
// Reference: Rust Book §8 (Slices)
//            Devlin et al. (2019) BERT paper - sliding window approach

use std::ops::Range;

pub struct Chunker {
    /// Maximum number of tokens per chunk
    chunk_size: usize,
    /// Number of tokens shared between adjacent chunks
    overlap: usize,
}

impl Chunker {
    /// Create a new Chunker. `chunk_size` is raised to 1 and
    /// `overlap` lowered to `chunk_size - 1` when needed.
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        let overlap    = overlap.min(chunk_size - 1);
        Self { chunk_size, overlap }
    }

    /// Token ranges of every chunk of a sequence of `len` tokens.
    /// An empty sequence still produces one empty chunk, so every
    /// document gets at least one window.
    pub fn ranges(&self, len: usize) -> Vec<Range<usize>> {
        if len == 0 {
            return vec![0..0];
        }

        let step       = self.chunk_size - self.overlap;
        let mut ranges = Vec::with_capacity(self.num_chunks(len));
        let mut start  = 0usize;

        loop {
            let end = (start + self.chunk_size).min(len);
            ranges.push(start..end);
            if end == len {
                break;
            }
            start += step;
        }

        ranges
    }

    /// Returns how many chunks a sequence of `len` tokens produces
    pub fn num_chunks(&self, len: usize) -> usize {
        if len <= self.chunk_size {
            return 1;
        }
        let step = self.chunk_size - self.overlap;
        1 + (len - self.chunk_size + step - 1) / step
    }
}
