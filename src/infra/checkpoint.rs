// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Loads (and writes) span-encoder checkpoints.
//
// A checkpoint is a directory:
//
//   my-reader/
//     model_config.json   ← SpanEncoderConfig (architecture)
//     model.mpk.gz        ← weights, burn record
//     tokenizer.json      ← HuggingFace tokenizer (see tokenizer_store.rs)
//
// Why save the config separately?
//   The model has to be rebuilt with the exact architecture
//   (d_model, num_layers, etc.) before the weights can be
//   loaded into it.
//
// Precision picks the burn recorder:
//   f16 → CompactRecorder  (MessagePack + gzip, half precision)
//   f32 → DefaultRecorder  (MessagePack + gzip, full precision)
// A checkpoint must be loaded with the precision it was saved in.
//
// Reference: Burn Book §5 (Records and Checkpointing)
//            Rust Book §9 (Error Handling)

use anyhow::{Context, Result};
use std::{fs, path::PathBuf};
use burn::{
    prelude::*,
    record::{CompactRecorder, DefaultRecorder, Recorder},
};
use serde::{Deserialize, Serialize};

use crate::ml::model::{SpanEncoderConfig, SpanEncoderModel};

/// Architecture file inside a checkpoint directory
pub const MODEL_CONFIG_FILE: &str = "model_config.json";

/// Weights file stem; the recorder adds ".mpk.gz"
pub const WEIGHTS_FILE_STEM: &str = "model";

/// Numeric precision of the stored weights
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    F16,
    #[default]
    F32,
}

/// Reads and writes the files of one checkpoint directory.
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    /// Whether this directory looks like a checkpoint
    pub fn exists(&self) -> bool {
        self.dir.join(MODEL_CONFIG_FILE).is_file()
    }

    /// Read the architecture so the model can be rebuilt.
    pub fn load_config(&self) -> Result<SpanEncoderConfig> {
        let path = self.dir.join(MODEL_CONFIG_FILE);

        let json = fs::read_to_string(&path)
            .with_context(|| {
                format!(
                    "Cannot read model config from '{}'. \
                     Is '{}' a checkpoint directory?",
                    path.display(),
                    self.dir.display()
                )
            })?;

        serde_json::from_str(&json)
            .with_context(|| format!("Invalid model config in '{}'", path.display()))
    }

    /// Load the saved weights into `model`.
    ///
    /// The model must have the architecture from `load_config`
    /// or loading fails.
    pub fn load_model<B: Backend>(
        &self,
        model:     SpanEncoderModel<B>,
        precision: Precision,
        device:    &B::Device,
    ) -> Result<SpanEncoderModel<B>> {
        let path = self.dir.join(WEIGHTS_FILE_STEM);

        tracing::info!("Loading {:?} weights from '{}'", precision, self.dir.display());

        let record: <SpanEncoderModel<B> as Module<B>>::Record = match precision {
            Precision::F16 => CompactRecorder::new().load(path.clone(), device),
            Precision::F32 => DefaultRecorder::new().load(path.clone(), device),
        }
        .with_context(|| format!("Cannot load weights '{}.mpk.gz'", path.display()))?;

        // load_record() returns a new model with the loaded weights
        Ok(model.load_record(record))
    }

    /// Write the architecture file, creating the directory if needed.
    pub fn save_config(&self, cfg: &SpanEncoderConfig) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create '{}'", self.dir.display()))?;

        let path = self.dir.join(MODEL_CONFIG_FILE);
        let json = serde_json::to_string_pretty(cfg)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;

        tracing::debug!("Saved model config to '{}'", path.display());
        Ok(())
    }

    /// Write the weights with the recorder for `precision`.
    pub fn save_model<B: Backend>(&self, model: &SpanEncoderModel<B>, precision: Precision) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create '{}'", self.dir.display()))?;

        let path   = self.dir.join(WEIGHTS_FILE_STEM);
        let record = model.clone().into_record();
        match precision {
            Precision::F16 => CompactRecorder::new().record(record, path.clone()),
            Precision::F32 => DefaultRecorder::new().record(record, path.clone()),
        }
        .with_context(|| format!("Failed to save weights to '{}'", path.display()))?;

        tracing::debug!("Saved {:?} weights to '{}'", precision, path.display());
        Ok(())
    }
}
