// ============================================================
// Layer 6 — Tokenizer Store
// ============================================================
// Finds the tokenizer that belongs to a model:
//
//   1. "<model>/tokenizer.json" when the model is a local
//      checkpoint directory
//   2. "<model>" itself when it points at a tokenizer file
//   3. otherwise the model name is a HuggingFace hub id and the
//      tokenizer is downloaded (with the hub token, if any)
//
// HfTokenEncoder adapts a `tokenizers::Tokenizer` to the
// TokenEncoder trait. Offsets come from encode_char_offsets so
// they count characters, not UTF-8 bytes.
//
// word_level() builds a tiny word-level tokenizer in the
// HuggingFace JSON format directly; handy for demos and tests
// where downloading a real vocabulary is not an option.
//
// Reference: HuggingFace tokenizers documentation

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tokenizers::{FromPretrainedParameters, Tokenizer};

use crate::domain::traits::{SpecialTokens, TokenEncoder, TokenizedText};

pub const TOKENIZER_FILE: &str = "tokenizer.json";

pub struct TokenizerStore {
    model: String,
}

impl TokenizerStore {
    /// `model` is a checkpoint directory, a tokenizer file or a hub id
    pub fn new(model: impl Into<String>) -> Self {
        Self { model: model.into() }
    }

    /// Local tokenizer file for this model, if there is one
    pub fn local_path(&self) -> Option<PathBuf> {
        let path = Path::new(&self.model);
        if path.is_dir() {
            let file = path.join(TOKENIZER_FILE);
            file.is_file().then_some(file)
        } else if path.is_file() {
            Some(path.to_path_buf())
        } else {
            None
        }
    }

    /// Load the tokenizer from disk or the hub.
    pub fn load(&self, token: Option<String>) -> Result<Tokenizer> {
        if let Some(path) = self.local_path() {
            tracing::info!("Loading tokenizer from '{}'", path.display());
            return Tokenizer::from_file(&path)
                .map_err(|e| anyhow::anyhow!(
                    "Cannot load tokenizer from '{}': {}", path.display(), e
                ));
        }

        tracing::info!("Downloading tokenizer for '{}'", self.model);
        let params = FromPretrainedParameters { token, ..Default::default() };
        Tokenizer::from_pretrained(&self.model, Some(params))
            .map_err(|e| anyhow::anyhow!(
                "Cannot download tokenizer for '{}': {}", self.model, e
            ))
    }

    /// Build a lowercase word-level tokenizer over `words`.
    ///
    /// Special tokens get fixed ids matching the BERT convention:
    /// [PAD]=0, [UNK]=1, [CLS]=101, [SEP]=102, [MASK]=103.
    /// Words are numbered from 104 in the order given.
    pub fn word_level(words: &[&str]) -> Result<Tokenizer> {
        let mut vocab = serde_json::json!({
            "[PAD]":  0,
            "[UNK]":  1,
            "[CLS]":  101,
            "[SEP]":  102,
            "[MASK]": 103,
        });

        let mut next_id = 104usize;
        for word in words {
            let w = word.to_lowercase();
            // Skip duplicates and special tokens
            if vocab.get(&w).is_none() {
                vocab[w.as_str()] = serde_json::json!(next_id);
                next_id += 1;
            }
        }

        // This format is what Tokenizer::from_file() expects
        let tokenizer_json = serde_json::json!({
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": [
                {"id": 0,   "content": "[PAD]",  "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true},
                {"id": 1,   "content": "[UNK]",  "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true},
                {"id": 101, "content": "[CLS]",  "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true},
                {"id": 102, "content": "[SEP]",  "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true},
                {"id": 103, "content": "[MASK]", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true}
            ],
            "normalizer": {
                "type": "BertNormalizer",
                "clean_text": true,
                "handle_chinese_chars": true,
                "strip_accents": false,
                "lowercase": true
            },
            "pre_tokenizer": {
                "type": "Whitespace"
            },
            "post_processor": null,
            "decoder": null,
            "model": {
                "type": "WordLevel",
                "vocab": vocab,
                "unk_token": "[UNK]"
            }
        });

        tracing::debug!("Word-level tokenizer built with {} entries", next_id - 99);

        Tokenizer::from_str(&tokenizer_json.to_string())
            .map_err(|e| anyhow::anyhow!("Cannot build word-level tokenizer: {e}"))
    }
}

// ─── HfTokenEncoder ───────────────────────────────────────────────────────────
/// Candidate spellings of each special token (BERT style, RoBERTa style)
const CLS_TOKENS: [&str; 2] = ["[CLS]", "<s>"];
const SEP_TOKENS: [&str; 2] = ["[SEP]", "</s>"];
const PAD_TOKENS: [&str; 2] = ["[PAD]", "<pad>"];

pub struct HfTokenEncoder {
    tokenizer: Tokenizer,
    special:   SpecialTokens,
}

impl HfTokenEncoder {
    /// Fails when the vocabulary has no CLS, SEP or PAD token.
    pub fn new(tokenizer: Tokenizer) -> Result<Self> {
        let lookup = |names: &[&str]| -> Result<u32> {
            names
                .iter()
                .find_map(|name| tokenizer.token_to_id(name))
                .with_context(|| format!("Tokenizer has none of the special tokens {names:?}"))
        };

        let special = SpecialTokens {
            cls: lookup(&CLS_TOKENS)?,
            sep: lookup(&SEP_TOKENS)?,
            pad: lookup(&PAD_TOKENS)?,
        };
        Ok(Self { tokenizer, special })
    }
}

impl TokenEncoder for HfTokenEncoder {
    fn encode(&self, text: &str) -> Result<TokenizedText> {
        let encoding = self
            .tokenizer
            .encode_char_offsets(text, false)
            .map_err(|e| anyhow::anyhow!("Tokenisation failed: {e}"))?;

        Ok(TokenizedText {
            ids:     encoding.get_ids().to_vec(),
            offsets: encoding.get_offsets().to_vec(),
        })
    }

    fn special_tokens(&self) -> SpecialTokens {
        self.special
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_level_ids_and_char_offsets() {
        let tokenizer = TokenizerStore::word_level(&["café", "au", "lait"]).unwrap();
        let encoder   = HfTokenEncoder::new(tokenizer).unwrap();

        let encoded = encoder.encode("Café au lait").unwrap();
        assert_eq!(encoded.ids, vec![104, 105, 106]);
        // "é" is two bytes; offsets count characters
        assert_eq!(encoded.offsets, vec![(0, 4), (5, 7), (8, 12)]);
    }

    #[test]
    fn test_unknown_words_map_to_unk() {
        let tokenizer = TokenizerStore::word_level(&["olaf"]).unwrap();
        let encoder   = HfTokenEncoder::new(tokenizer).unwrap();
        let encoded   = encoder.encode("Olaf Scholz").unwrap();
        assert_eq!(encoded.ids, vec![104, 1]);
        assert_eq!(encoded.offsets[1], (5, 11));
    }

    #[test]
    fn test_special_tokens_are_found() {
        let encoder = HfTokenEncoder::new(TokenizerStore::word_level(&[]).unwrap()).unwrap();
        assert_eq!(encoder.special_tokens(), SpecialTokens { cls: 101, sep: 102, pad: 0 });
    }

    #[test]
    fn test_local_tokenizer_file_is_preferred() {
        let dir = tempfile::tempdir().unwrap();
        TokenizerStore::word_level(&["jerry"])
            .unwrap()
            .save(dir.path().join(TOKENIZER_FILE), false)
            .unwrap();

        let store = TokenizerStore::new(dir.path().to_str().unwrap());
        assert_eq!(store.local_path(), Some(dir.path().join(TOKENIZER_FILE)));

        let tokenizer = store.load(None).unwrap();
        assert_eq!(tokenizer.token_to_id("jerry"), Some(104));
    }
}
