// ============================================================
// Layer 2 — Extractive Reader
// ============================================================
// The reader pipeline, stage by stage:
//
//   queries + document lists
//       │ flatten_documents        (one entry per pair)
//       ▼
//   WindowedPreprocessor          (≥ 1 window per pair)
//       │
//       ▼
//   SpanModel::infer              (max_batch_size windows per call)
//       │
//       ▼
//   SpanDecoder                   (answers_per_seq spans per window)
//       │
//       ▼
//   nest_answers                  (dedup, top_k, no-answer,
//                                  threshold, page numbers)
//       │
//       ▼
//   one ranked answer list per query
//
// The reader is built cold from a ReaderConfig and loads its
// model and tokenizer in warm_up(). Tests (and callers with
// their own model) can hand in ready components instead.
//
// Per-call overrides replace the configured value only when
// set; a run can never switch an option back to "unset".

use std::sync::Arc;

use crate::application::config::ReaderConfig;
use crate::data::flattener::flatten_documents;
use crate::data::preprocessor::{Window, WindowedPreprocessor};
use crate::domain::answer::ExtractedAnswer;
use crate::domain::document::Document;
use crate::domain::error::ReaderError;
use crate::domain::traits::{SpanLogits, SpanModel, TokenEncoder};
use crate::infra::checkpoint::CheckpointManager;
use crate::infra::tokenizer_store::{HfTokenEncoder, TokenizerStore};
use crate::ml::inferencer::load_for_device;
use crate::postprocess::decoder::SpanDecoder;
use crate::postprocess::nesting::{nest_answers, NestingOptions};

/// Per-call replacements for configured values
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunOverrides {
    pub top_k:             Option<usize>,
    pub score_threshold:   Option<f64>,
    pub max_seq_length:    Option<usize>,
    pub stride:            Option<usize>,
    pub max_batch_size:    Option<usize>,
    pub answers_per_seq:   Option<usize>,
    pub no_answer:         Option<bool>,
    pub overlap_threshold: Option<f64>,
}

pub struct ExtractiveReader {
    config:  ReaderConfig,
    model:   Option<Arc<dyn SpanModel>>,
    encoder: Option<Arc<dyn TokenEncoder>>,
}

impl ExtractiveReader {
    /// Validate the configuration. Nothing is loaded until warm_up().
    pub fn new(config: ReaderConfig) -> Result<Self, ReaderError> {
        let config = config.resolve_devices();
        config.validate()?;
        Ok(Self { config, model: None, encoder: None })
    }

    /// A reader that is already warm, running the given components.
    pub fn with_components(
        config:  ReaderConfig,
        model:   Arc<dyn SpanModel>,
        encoder: Arc<dyn TokenEncoder>,
    ) -> Result<Self, ReaderError> {
        let mut reader = Self::new(config)?;
        reader.model   = Some(model);
        reader.encoder = Some(encoder);
        Ok(reader)
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    pub fn is_warmed_up(&self) -> bool {
        self.model.is_some() && self.encoder.is_some()
    }

    /// Load tokenizer and model. Does nothing when already loaded.
    pub fn warm_up(&mut self) -> Result<(), ReaderError> {
        if self.is_warmed_up() {
            return Ok(());
        }

        let token = match &self.config.token {
            Some(secret) => secret.resolve_value()?,
            None         => None,
        };

        let tokenizer = TokenizerStore::new(&self.config.model)
            .load(token)
            .map_err(ReaderError::Model)?;
        let encoder = HfTokenEncoder::new(tokenizer).map_err(ReaderError::Model)?;

        let ckpt  = CheckpointManager::new(&self.config.model);
        let model = load_for_device(&ckpt, self.config.precision(), self.config.effective_device())
            .map_err(ReaderError::Model)?;

        tracing::info!("Reader warmed up with model '{}'", self.config.model);
        self.encoder = Some(Arc::new(encoder));
        self.model   = Some(Arc::from(model));
        Ok(())
    }

    /// Answer one query from `documents`.
    pub fn run(
        &self,
        query:     &str,
        documents: &[Document],
        overrides: &RunOverrides,
    ) -> Result<Vec<ExtractedAnswer>, ReaderError> {
        let mut nested = self.run_batch(&[query], &[documents], overrides)?;
        Ok(nested.pop().unwrap_or_default())
    }

    /// Answer several queries, each against its own document list.
    /// Needs a model that supports query batching when there is
    /// more than one query.
    pub fn run_batch(
        &self,
        queries:   &[&str],
        documents: &[&[Document]],
        overrides: &RunOverrides,
    ) -> Result<Vec<Vec<ExtractedAnswer>>, ReaderError> {
        let (model, encoder) = match (&self.model, &self.encoder) {
            (Some(model), Some(encoder)) => (&**model, &**encoder),
            _ => return Err(ReaderError::NotWarmedUp),
        };

        if queries.len() > 1 && !model.supports_query_batching() {
            return Err(ReaderError::Unsupported(format!(
                "got {} queries, but this model answers one query per call",
                queries.len()
            )));
        }

        let config = self.effective_config(overrides);
        config.validate()?;

        let pairs = flatten_documents(queries, documents)?;
        if pairs.is_empty() {
            return Ok(vec![Vec::new(); queries.len()]);
        }

        let windows = WindowedPreprocessor::new(config.max_seq_length, config.stride)
            .preprocess(encoder, &pairs)?;
        tracing::info!(
            "{} query(ies), {} document(s) → {} window(s)",
            queries.len(),
            pairs.len(),
            windows.len()
        );

        let logits  = infer_windows(model, &windows, config.max_batch_size)?;
        let decoded = SpanDecoder::new(config.calibration_factor).decode(
            &windows,
            &logits,
            config.effective_answers_per_seq(),
        )?;

        let query_ids:    Vec<usize> = windows.iter().map(|w| w.query_id).collect();
        let document_ids: Vec<usize> = windows.iter().map(|w| w.document_id).collect();
        let options = NestingOptions {
            top_k:             config.top_k,
            score_threshold:   config.score_threshold,
            no_answer:         config.no_answer,
            overlap_threshold: config.overlap_threshold,
        };

        nest_answers(&decoded, &query_ids, &document_ids, &pairs.documents, queries, &options)
    }

    fn effective_config(&self, overrides: &RunOverrides) -> ReaderConfig {
        let mut config = self.config.clone();
        if let Some(v) = overrides.top_k             { config.top_k = v; }
        if let Some(v) = overrides.score_threshold   { config.score_threshold = Some(v); }
        if let Some(v) = overrides.max_seq_length    { config.max_seq_length = v; }
        if let Some(v) = overrides.stride            { config.stride = v; }
        if let Some(v) = overrides.max_batch_size    { config.max_batch_size = Some(v); }
        if let Some(v) = overrides.answers_per_seq   { config.answers_per_seq = Some(v); }
        if let Some(v) = overrides.no_answer         { config.no_answer = v; }
        if let Some(v) = overrides.overlap_threshold { config.overlap_threshold = Some(v); }
        config
    }
}

/// Run the model over `windows` in chunks of at most `max_batch_size`.
fn infer_windows(
    model:          &dyn SpanModel,
    windows:        &[Window],
    max_batch_size: Option<usize>,
) -> Result<SpanLogits, ReaderError> {
    let batch_size = max_batch_size.unwrap_or(windows.len()).max(1);
    let mut logits = SpanLogits::default();

    for (index, chunk) in windows.chunks(batch_size).enumerate() {
        let input_ids:      Vec<&[u32]> = chunk.iter().map(|w| w.input_ids.as_slice()).collect();
        let attention_mask: Vec<&[u32]> = chunk.iter().map(|w| w.attention_mask.as_slice()).collect();

        tracing::debug!("Batch {}: {} window(s)", index, chunk.len());
        let batch = model.infer(&input_ids, &attention_mask).map_err(ReaderError::Model)?;
        if batch.rows() != chunk.len() {
            return Err(ReaderError::Model(anyhow::anyhow!(
                "model returned {} rows for a batch of {} windows",
                batch.rows(),
                chunk.len()
            )));
        }
        logits.extend(batch);
    }

    Ok(logits)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::answer::Span;
    use crate::infra::checkpoint::Precision;
    use crate::infra::device::Device;
    use crate::ml::model::SpanEncoderConfig;
    use crate::testing::{approx_eq, sigmoid, FailingModel, PeakModel, WhitespaceEncoder};
    use burn::backend::{ndarray::NdArrayDevice, NdArray};

    fn chancellor_documents() -> Vec<Document> {
        vec![
            Document::new("Angela Merkel was the chancellor of Germany."),
            Document::new("Olaf Scholz is the chancellor of Germany"),
            Document::new("Jerry is the head of the department."),
        ]
    }

    fn reader_with(model: Arc<PeakModel>, config: ReaderConfig) -> ExtractiveReader {
        ExtractiveReader::with_components(config, model, Arc::new(WhitespaceEncoder)).unwrap()
    }

    fn top3_config() -> ReaderConfig {
        ReaderConfig { top_k: 3, ..ReaderConfig::new("test-model") }
    }

    #[test]
    fn test_run_end_to_end() {
        // [CLS] + 6 query words + [SEP] puts the first document word at 8
        let model  = Arc::new(PeakModel::new(8, 9));
        let reader = reader_with(model.clone(), top3_config());

        let answers = reader
            .run("Who is the chancellor of Germany?", &chancellor_documents(), &RunOverrides::default())
            .unwrap();

        assert_eq!(answers.len(), 4);
        let texts: Vec<_> = answers.iter().map(|a| a.data.clone()).collect();
        assert_eq!(
            texts,
            vec![
                Some("Angela Merkel".to_string()),
                Some("Olaf Scholz".to_string()),
                Some("Jerry is".to_string()),
                None,
            ]
        );
        assert_eq!(answers[0].document_offset, Some(Span::new(0, 13)));
        assert!(answers[..3].iter().all(|a| approx_eq(a.score, sigmoid(0.2))));
        assert!(answers[3].is_no_answer());
        assert!(approx_eq(answers[3].score, (1.0 - sigmoid(0.2)).powi(3)));
        assert_eq!(model.batch_sizes(), vec![3]);
    }

    #[test]
    fn test_empty_documents_skip_the_model() {
        let model  = Arc::new(PeakModel::new(8, 9));
        let reader = reader_with(model.clone(), top3_config());

        let answers = reader.run("Who?", &[], &RunOverrides::default()).unwrap();
        assert!(answers.is_empty());
        assert!(model.batch_sizes().is_empty());
    }

    #[test]
    fn test_cold_reader_is_not_warmed_up() {
        let reader = ExtractiveReader::new(ReaderConfig::default()).unwrap();
        assert!(!reader.is_warmed_up());
        let err = reader.run("Who?", &chancellor_documents(), &RunOverrides::default());
        assert!(matches!(err, Err(ReaderError::NotWarmedUp)));
    }

    #[test]
    fn test_invalid_config_is_rejected_at_construction() {
        let config = ReaderConfig { top_k: 0, ..ReaderConfig::default() };
        assert!(matches!(ExtractiveReader::new(config), Err(ReaderError::InvalidConfig(_))));
    }

    #[test]
    fn test_multiple_queries_need_query_batching() {
        let docs    = chancellor_documents();
        let queries = ["Who is the chancellor of Germany?", "Who is the head?"];
        let lists: [&[Document]; 2] = [&docs, &docs[2..]];

        let plain = reader_with(Arc::new(PeakModel::new(8, 9)), top3_config());
        let err   = plain.run_batch(&queries, &lists, &RunOverrides::default());
        assert!(matches!(err, Err(ReaderError::Unsupported(_))));

        let batching = reader_with(Arc::new(PeakModel::new(8, 9).with_query_batching()), top3_config());
        let nested   = batching.run_batch(&queries, &lists, &RunOverrides::default()).unwrap();
        assert_eq!(nested.len(), 2);
        assert_eq!(nested[0].len(), 4);
        assert!(nested[1].iter().all(|a| a.query == queries[1]));
    }

    #[test]
    fn test_batch_size_does_not_change_answers() {
        let query = "Who is the chancellor of Germany?";
        let docs  = chancellor_documents();

        let whole   = Arc::new(PeakModel::new(8, 9));
        let batched = Arc::new(PeakModel::new(8, 9));
        let expected = reader_with(whole.clone(), top3_config())
            .run(query, &docs, &RunOverrides::default())
            .unwrap();
        let actual = reader_with(batched.clone(), top3_config())
            .run(query, &docs, &RunOverrides { max_batch_size: Some(1), ..Default::default() })
            .unwrap();

        assert_eq!(actual, expected);
        assert_eq!(whole.batch_sizes(), vec![3]);
        assert_eq!(batched.batch_sizes(), vec![1, 1, 1]);
    }

    #[test]
    fn test_long_document_is_answered_from_every_window() {
        let words: Vec<String> = (0..100).map(|i| format!("w{i}")).collect();
        let docs  = vec![Document::new(words.join(" "))];
        // [CLS] q [SEP] takes positions 0-2, so each window's first
        // document word sits at 3
        let model  = Arc::new(PeakModel::new(3, 4));
        let config = ReaderConfig {
            top_k:          5,
            max_seq_length: 32,
            stride:         8,
            no_answer:      false,
            ..ReaderConfig::new("test-model")
        };
        let reader = reader_with(model.clone(), config);

        let answers = reader.run("q", &docs, &RunOverrides::default()).unwrap();

        // capacity 28, step 20 → windows start at words 0, 20, 40, 60, 80
        assert_eq!(model.batch_sizes(), vec![5]);
        let texts: Vec<_> = answers.iter().filter_map(|a| a.data.clone()).collect();
        assert_eq!(texts, vec!["w0 w1", "w20 w21", "w40 w41", "w60 w61", "w80 w81"]);
    }

    #[test]
    fn test_overrides_apply_per_call() {
        let reader    = reader_with(Arc::new(PeakModel::new(8, 9)), top3_config());
        let overrides = RunOverrides { top_k: Some(1), no_answer: Some(false), ..Default::default() };

        let answers = reader
            .run("Who is the chancellor of Germany?", &chancellor_documents(), &overrides)
            .unwrap();
        assert_eq!(answers.len(), 1);
        assert_eq!(answers[0].data.as_deref(), Some("Angela Merkel"));
        assert_eq!(reader.config().top_k, 3);
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        let reader    = reader_with(Arc::new(PeakModel::new(8, 9)), top3_config());
        let overrides = RunOverrides { stride: Some(400), ..Default::default() };
        let err = reader.run("Who?", &chancellor_documents(), &overrides);
        assert!(matches!(err, Err(ReaderError::InvalidConfig(_))));
    }

    #[test]
    fn test_model_failure_propagates() {
        let reader = ExtractiveReader::with_components(
            top3_config(),
            Arc::new(FailingModel),
            Arc::new(WhitespaceEncoder),
        )
        .unwrap();
        let err = reader.run("Who?", &chancellor_documents(), &RunOverrides::default());
        assert!(matches!(err, Err(ReaderError::Model(_))));
    }

    #[test]
    fn test_warm_up_from_local_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let words = ["who", "is", "the", "chancellor", "of", "germany", "angela", "merkel", "was"];
        TokenizerStore::word_level(&words)
            .unwrap()
            .save(dir.path().join(crate::infra::tokenizer_store::TOKENIZER_FILE), false)
            .unwrap();

        let ckpt   = CheckpointManager::new(dir.path());
        let cfg    = SpanEncoderConfig::new(200, 32, 8, 2, 1, 16);
        let device = NdArrayDevice::Cpu;
        ckpt.save_config(&cfg).unwrap();
        ckpt.save_model(&cfg.init::<NdArray>(&device), Precision::F32).unwrap();

        let mut config = ReaderConfig::new(dir.path().to_string_lossy());
        config.device         = Some(Device::Cpu);
        config.token          = None;
        config.top_k          = 2;
        config.max_seq_length = 32;
        config.stride         = 8;

        let mut reader = ExtractiveReader::new(config).unwrap();
        reader.warm_up().unwrap();
        reader.warm_up().unwrap();
        assert!(reader.is_warmed_up());

        let docs    = vec![Document::new("Angela Merkel was the chancellor of Germany.")];
        let answers = reader.run("Who is the chancellor of Germany?", &docs, &RunOverrides::default()).unwrap();

        assert!(answers.len() <= 3);
        assert_eq!(answers.iter().filter(|a| a.is_no_answer()).count(), 1);
        assert!(answers.iter().all(|a| (0.0..=1.0).contains(&a.score)));
        assert!(answers.windows(2).all(|w| w[0].score >= w[1].score));
    }

}
