// ============================================================
// Layer 2 — Reader Configuration
// ============================================================
// Every constructor-level setting of the reader, with defaults,
// validation and a plain-dictionary form for saving/restoring:
//
//   {
//     "type": "extractive_reader::ExtractiveReader",
//     "init_parameters": { "model": "...", "top_k": 20, ... }
//   }
//
// Missing parameters fall back to their defaults; an explicit
// null turns an optional setting off (e.g. "overlap_threshold":
// null disables deduplication).
//
// Values that are not plain JSON travel as strings and are
// parsed back on load: devices ("cpu", "gpu:0"), device maps,
// precision ("f16", "f32").
//
// Device resolution happens once, at construction:
//   device AND device_map → warn, device_map wins
//   otherwise             → device (default cpu) becomes the
//                           device map, device is cleared
//
// Reference: Rust Book §5 (Structs), serde documentation

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::{fs, path::Path};

use crate::domain::error::ReaderError;
use crate::infra::checkpoint::Precision;
use crate::infra::device::{Device, DeviceMapSetting};
use crate::infra::secret::Secret;

/// Identifies this component in a serialized configuration
pub const COMPONENT_TYPE: &str = "extractive_reader::ExtractiveReader";

pub const DEFAULT_MODEL:              &str = "deepset/roberta-base-squad2-distilled";
pub const DEFAULT_TOP_K:              usize = 20;
pub const DEFAULT_MAX_SEQ_LENGTH:     usize = 384;
pub const DEFAULT_STRIDE:             usize = 128;
pub const DEFAULT_CALIBRATION_FACTOR: f64 = 0.1;
pub const DEFAULT_OVERLAP_THRESHOLD:  f64 = 0.01;

/// Smallest max_seq_length accepted by validation
pub const MIN_MAX_SEQ_LENGTH: usize = 8;

/// Extra arguments for model loading
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelKwargs {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub precision:  Option<Precision>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_map: Option<DeviceMapSetting>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Checkpoint directory (weights + tokenizer) or hub id
    pub model:              String,
    pub device:             Option<Device>,
    /// Hub token used when the tokenizer has to be downloaded
    pub token:              Option<Secret>,
    /// Answers returned per query, not counting the no-answer entry
    pub top_k:              usize,
    pub score_threshold:    Option<f64>,
    /// Window length in tokens, special tokens included
    pub max_seq_length:     usize,
    /// Tokens shared by consecutive windows of a split document
    pub stride:             usize,
    /// Windows per model call; None sends everything at once
    pub max_batch_size:     Option<usize>,
    /// Candidates kept per window; None uses top_k
    pub answers_per_seq:    Option<usize>,
    pub no_answer:          bool,
    pub calibration_factor: f64,
    /// Largest allowed overlap (fraction of the shorter span); None disables dedup
    pub overlap_threshold:  Option<f64>,
    pub model_kwargs:       ModelKwargs,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            model:              DEFAULT_MODEL.to_string(),
            device:             None,
            token:              Some(Secret::default_hub_token()),
            top_k:              DEFAULT_TOP_K,
            score_threshold:    None,
            max_seq_length:     DEFAULT_MAX_SEQ_LENGTH,
            stride:             DEFAULT_STRIDE,
            max_batch_size:     None,
            answers_per_seq:    None,
            no_answer:          true,
            calibration_factor: DEFAULT_CALIBRATION_FACTOR,
            overlap_threshold:  Some(DEFAULT_OVERLAP_THRESHOLD),
            model_kwargs:       ModelKwargs::default(),
        }
    }
}

impl ReaderConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self { model: model.into(), ..Self::default() }
    }

    /// Fold `device` into `model_kwargs.device_map`.
    pub fn resolve_devices(mut self) -> Self {
        let device = self.device.take();
        if self.model_kwargs.device_map.is_some() {
            if device.is_some() {
                tracing::warn!(
                    "The parameters `device` and `device_map` from `model_kwargs` are both provided. \
                     Ignoring `device` and using `device_map`."
                );
            }
        } else {
            self.model_kwargs.device_map = Some(DeviceMapSetting::Single(device.unwrap_or_default()));
        }
        self
    }

    /// Device the model runs on; None lets the backend choose
    pub fn effective_device(&self) -> Option<Device> {
        match &self.model_kwargs.device_map {
            Some(map) => map.first_device(),
            None      => Some(self.device.unwrap_or_default()),
        }
    }

    pub fn precision(&self) -> Precision {
        self.model_kwargs.precision.unwrap_or_default()
    }

    pub fn effective_answers_per_seq(&self) -> usize {
        self.answers_per_seq.unwrap_or(self.top_k)
    }

    pub fn validate(&self) -> Result<(), ReaderError> {
        let fail = |msg: String| Err(ReaderError::InvalidConfig(msg));

        if self.top_k == 0 {
            return fail("top_k must be at least 1".to_string());
        }
        if self.max_seq_length < MIN_MAX_SEQ_LENGTH {
            return fail(format!(
                "max_seq_length must be at least {MIN_MAX_SEQ_LENGTH}, got {}",
                self.max_seq_length
            ));
        }
        if self.stride >= self.max_seq_length {
            return fail(format!(
                "stride ({}) must be smaller than max_seq_length ({})",
                self.stride, self.max_seq_length
            ));
        }
        if self.max_batch_size == Some(0) {
            return fail("max_batch_size must be at least 1".to_string());
        }
        if self.answers_per_seq == Some(0) {
            return fail("answers_per_seq must be at least 1".to_string());
        }
        if !(self.calibration_factor > 0.0 && self.calibration_factor.is_finite()) {
            return fail(format!(
                "calibration_factor must be a positive number, got {}",
                self.calibration_factor
            ));
        }
        for (name, value) in [
            ("score_threshold", self.score_threshold),
            ("overlap_threshold", self.overlap_threshold),
        ] {
            if let Some(v) = value {
                if !(0.0..=1.0).contains(&v) {
                    return fail(format!("{name} must be within [0, 1], got {v}"));
                }
            }
        }
        Ok(())
    }

    /// Serialize into the `{"type", "init_parameters"}` dictionary.
    /// Fails when the token is a plain value rather than env vars.
    pub fn to_dict(&self) -> Result<Value, ReaderError> {
        Ok(json!({
            "type": COMPONENT_TYPE,
            "init_parameters": serde_json::to_value(self)?,
        }))
    }

    /// Rebuild a configuration from `to_dict` output.
    pub fn from_dict(data: &Value) -> Result<Self, ReaderError> {
        match data.get("type").and_then(Value::as_str) {
            Some(COMPONENT_TYPE) => {}
            other => {
                return Err(ReaderError::InvalidConfig(format!(
                    "expected component type '{COMPONENT_TYPE}', got {other:?}"
                )))
            }
        }

        let params = data.get("init_parameters").cloned().unwrap_or_else(|| json!({}));
        let config: ReaderConfig = serde_json::from_value(params)?;
        let config = config.resolve_devices();
        config.validate()?;
        Ok(config)
    }

    /// Read a configuration dictionary from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .with_context(|| format!("Cannot read config file '{}'", path.display()))?;
        let data: Value = serde_json::from_str(&json)
            .with_context(|| format!("Invalid JSON in '{}'", path.display()))?;
        Self::from_dict(&data).with_context(|| format!("Invalid reader config in '{}'", path.display()))
    }
}
