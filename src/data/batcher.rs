// ============================================================
// Layer 4 — Window Batcher
// ============================================================
// Implements Burn's Batcher trait to turn a batch of windows
// into the two tensors the span model reads.
//
// How batching works here:
//   Input:  Vec of N WindowInputs, each with sequences of length S
//   Output: WindowBatch with tensors of shape [N, S]
//
//   We flatten all input_ids into one long Vec, then reshape:
//   [w1_t1, w1_t2, ..., w1_tS, w2_t1, ..., wN_tS] → [N, S]
//
// All windows are already padded to the same length by the
// preprocessor, so no dynamic padding is needed here.
//
// Reference: Burn Book §4 (Batcher)
//            Rust Book §8 (Vectors)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

/// Model input for one window
#[derive(Debug, Clone)]
pub struct WindowInput {
    pub input_ids:      Vec<u32>,
    pub attention_mask: Vec<u32>,
}

impl WindowInput {
    pub fn new(input_ids: &[u32], attention_mask: &[u32]) -> Self {
        Self {
            input_ids:      input_ids.to_vec(),
            attention_mask: attention_mask.to_vec(),
        }
    }
}

// ─── WindowBatch ──────────────────────────────────────────────────────────────
/// A batch of windows ready for the model forward pass.
#[derive(Debug, Clone)]
pub struct WindowBatch<B: Backend> {
    /// Token ID sequences — shape: [batch_size, seq_len]
    pub input_ids: Tensor<B, 2, Int>,

    /// Attention masks — shape: [batch_size, seq_len]
    /// 1 = real token, 0 = padding
    pub attention_mask: Tensor<B, 2, Int>,
}

// ─── WindowBatcher ────────────────────────────────────────────────────────────
/// Holds the target device so tensors are created on the
/// correct GPU/CPU.
#[derive(Clone, Debug)]
pub struct WindowBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> WindowBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<WindowInput, WindowBatch<B>> for WindowBatcher<B> {
    /// Callers guarantee a non-empty batch of equal-length windows.
    fn batch(&self, items: Vec<WindowInput>) -> WindowBatch<B> {
        let batch_size = items.len();
        let seq_len    = items.first().map_or(0, |w| w.input_ids.len());

        // Burn uses i32 for Int tensors
        let input_flat: Vec<i32> = items
            .iter()
            .flat_map(|w| w.input_ids.iter().map(|&x| x as i32))
            .collect();

        let mask_flat: Vec<i32> = items
            .iter()
            .flat_map(|w| w.attention_mask.iter().map(|&x| x as i32))
            .collect();

        let input_ids = Tensor::<B, 1, Int>::from_ints(
            input_flat.as_slice(), &self.device
        ).reshape([batch_size, seq_len]);

        let attention_mask = Tensor::<B, 1, Int>::from_ints(
            mask_flat.as_slice(), &self.device
        ).reshape([batch_size, seq_len]);

        WindowBatch { input_ids, attention_mask }
    }
}
