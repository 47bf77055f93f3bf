// ============================================================
// Layer 5 — Inferencer
// ============================================================
// BurnSpanModel runs the span encoder for the reader. It is the
// SpanModel implementation behind ExtractiveReader:
//
//   &[&[u32]] input ids + attention masks
//       │ WindowBatcher → [batch, seq] Int tensors
//       ▼
//   SpanEncoderModel::forward
//       │
//       ▼
//   start/end logits copied back into plain Vec<f32> rows
//
// Backends:
//   Device::Cpu    → NdArray (pure Rust, no GPU needed)
//   Device::Gpu(i) → Wgpu on discrete GPU i
//   no device      → Wgpu default device
//
// Burn modules are Send but not Sync, while SpanModel is shared
// between threads, so forward passes go through a Mutex.
//
// Reference: Burn Book §4 (Inference)

use anyhow::Result;
use burn::{
    backend::{ndarray::NdArrayDevice, wgpu::WgpuDevice, NdArray, Wgpu},
    data::dataloader::batcher::Batcher,
    prelude::*,
};
use std::sync::Mutex;

use crate::data::batcher::{WindowBatcher, WindowInput};
use crate::domain::traits::{SpanLogits, SpanModel};
use crate::infra::checkpoint::{CheckpointManager, Precision};
use crate::infra::device::Device;
use crate::ml::model::SpanEncoderModel;

pub struct BurnSpanModel<B: Backend> {
    model:         Mutex<SpanEncoderModel<B>>,
    batcher:       WindowBatcher<B>,
    max_positions: usize,
}

impl<B: Backend> BurnSpanModel<B> {
    pub fn new(model: SpanEncoderModel<B>, device: B::Device) -> Self {
        let max_positions = model.max_seq_len;
        Self {
            model:   Mutex::new(model),
            batcher: WindowBatcher::new(device),
            max_positions,
        }
    }

    /// Rebuild the architecture from the checkpoint, then load its weights.
    pub fn from_checkpoint(
        ckpt:      &CheckpointManager,
        precision: Precision,
        device:    B::Device,
    ) -> Result<Self> {
        let cfg   = ckpt.load_config()?;
        let model = cfg.init::<B>(&device);
        let model = ckpt.load_model(model, precision, &device)?;
        tracing::info!(
            "Model loaded from checkpoint ({} layers, d_model={}, max_seq_len={})",
            cfg.num_layers,
            cfg.d_model,
            cfg.max_seq_len
        );
        Ok(Self::new(model, device))
    }
}

impl<B: Backend> SpanModel for BurnSpanModel<B> {
    fn infer(&self, input_ids: &[&[u32]], attention_mask: &[&[u32]]) -> Result<SpanLogits> {
        if input_ids.is_empty() {
            return Ok(SpanLogits::default());
        }
        if input_ids.len() != attention_mask.len() {
            anyhow::bail!(
                "{} input rows but {} attention mask rows",
                input_ids.len(),
                attention_mask.len()
            );
        }

        let seq_len = input_ids[0].len();
        if seq_len == 0 {
            anyhow::bail!("cannot run the model on empty windows");
        }
        if seq_len > self.max_positions {
            anyhow::bail!(
                "windows of {} tokens exceed the model's {} positions; lower max_seq_length",
                seq_len,
                self.max_positions
            );
        }
        if input_ids.iter().chain(attention_mask).any(|row| row.len() != seq_len) {
            anyhow::bail!("all rows in a batch must have the same length");
        }

        let items: Vec<WindowInput> = input_ids
            .iter()
            .zip(attention_mask)
            .map(|(ids, mask)| WindowInput::new(ids, mask))
            .collect();
        let batch = self.batcher.batch(items);

        let output = {
            let model = self
                .model
                .lock()
                .map_err(|_| anyhow::anyhow!("model lock poisoned"))?;
            model.forward(batch.input_ids, batch.attention_mask)
        };

        let start = output
            .start_logits
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| anyhow::anyhow!("Cannot read start logits: {e:?}"))?;
        let end = output
            .end_logits
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| anyhow::anyhow!("Cannot read end logits: {e:?}"))?;

        tracing::debug!("Forward pass over {} window(s) of {} tokens", input_ids.len(), seq_len);

        Ok(SpanLogits {
            start: start.chunks(seq_len).map(<[f32]>::to_vec).collect(),
            end:   end.chunks(seq_len).map(<[f32]>::to_vec).collect(),
        })
    }
}

/// Load a checkpoint on the backend that matches `device`.
pub fn load_for_device(
    ckpt:      &CheckpointManager,
    precision: Precision,
    device:    Option<Device>,
) -> Result<Box<dyn SpanModel>> {
    let model: Box<dyn SpanModel> = match device {
        Some(Device::Cpu) => {
            tracing::info!("Running on CPU (ndarray backend)");
            Box::new(BurnSpanModel::<NdArray>::from_checkpoint(ckpt, precision, NdArrayDevice::Cpu)?)
        }
        Some(Device::Gpu(index)) => {
            tracing::info!("Running on GPU {} (wgpu backend)", index);
            Box::new(BurnSpanModel::<Wgpu>::from_checkpoint(ckpt, precision, WgpuDevice::DiscreteGpu(index))?)
        }
        None => {
            tracing::info!("Running on the default wgpu device");
            Box::new(BurnSpanModel::<Wgpu>::from_checkpoint(ckpt, precision, WgpuDevice::default())?)
        }
    };
    Ok(model)
}
