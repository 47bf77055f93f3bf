//! Deterministic stand-ins for the model and tokenizer, shared by
//! the unit tests of every layer.

use std::sync::Mutex;

use anyhow::Result;

use crate::domain::traits::{SpanLogits, SpanModel, SpecialTokens, TokenEncoder, TokenizedText};

pub const CLS: u32 = 101;
pub const SEP: u32 = 102;
pub const PAD: u32 = 0;

pub fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

// ─── WhitespaceEncoder ────────────────────────────────────────────────────────
/// One token per whitespace-separated word. Ids are 1000 + word
/// length so equal words get equal ids.
pub struct WhitespaceEncoder;

impl TokenEncoder for WhitespaceEncoder {
    fn encode(&self, text: &str) -> Result<TokenizedText> {
        let mut offsets = Vec::new();
        let mut start   = None;
        let mut count   = 0usize;

        for (i, c) in text.chars().enumerate() {
            if c.is_whitespace() {
                if let Some(s) = start.take() {
                    offsets.push((s, i));
                }
            } else if start.is_none() {
                start = Some(i);
            }
            count = i + 1;
        }
        if let Some(s) = start {
            offsets.push((s, count));
        }

        let ids = offsets
            .iter()
            .map(|(s, e)| 1000 + (e - s) as u32)
            .collect();
        Ok(TokenizedText { ids, offsets })
    }

    fn special_tokens(&self) -> SpecialTokens {
        SpecialTokens { cls: CLS, sep: SEP, pad: PAD }
    }
}

// ─── PeakModel ────────────────────────────────────────────────────────────────
/// Puts a start logit of 1.0 at one position and an end logit of
/// 1.0 at another, 0.0 everywhere else. Records the size of every
/// batch it is called with.
pub struct PeakModel {
    pub start:    usize,
    pub end:      usize,
    pub batching: bool,
    pub batches:  Mutex<Vec<usize>>,
}

impl PeakModel {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end, batching: false, batches: Mutex::new(Vec::new()) }
    }

    pub fn with_query_batching(mut self) -> Self {
        self.batching = true;
        self
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batches.lock().map(|b| b.clone()).unwrap_or_default()
    }
}

impl SpanModel for PeakModel {
    fn infer(&self, input_ids: &[&[u32]], _attention_mask: &[&[u32]]) -> Result<SpanLogits> {
        if let Ok(mut batches) = self.batches.lock() {
            batches.push(input_ids.len());
        }
        let mut logits = SpanLogits::default();
        for row in input_ids {
            let mut start = vec![0.0f32; row.len()];
            let mut end   = vec![0.0f32; row.len()];
            if let Some(s) = start.get_mut(self.start) {
                *s = 1.0;
            }
            if let Some(e) = end.get_mut(self.end) {
                *e = 1.0;
            }
            logits.start.push(start);
            logits.end.push(end);
        }
        Ok(logits)
    }

    fn supports_query_batching(&self) -> bool {
        self.batching
    }
}

// ─── FailingModel ─────────────────────────────────────────────────────────────
/// Always fails, like a model that ran out of memory
pub struct FailingModel;

impl SpanModel for FailingModel {
    fn infer(&self, _input_ids: &[&[u32]], _attention_mask: &[&[u32]]) -> Result<SpanLogits> {
        anyhow::bail!("out of memory")
    }
}
