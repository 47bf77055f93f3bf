// ============================================================
// Layer 2 — Ask Use Case
// ============================================================
// Answers a question against every document in a directory:
//   1. Load .txt/.docx documents (with their sidecar metadata)
//   2. Run the extractive reader over all of them
//   3. Hand back the ranked answers; formatting for the
//      terminal lives in format_answers()

use anyhow::{Context, Result};
use std::fmt::Write as _;

use crate::application::config::ReaderConfig;
use crate::application::reader::{ExtractiveReader, RunOverrides};
use crate::data::loader::DirectoryLoader;
use crate::domain::answer::ExtractedAnswer;
use crate::domain::traits::DocumentSource;

pub struct AskUseCase {
    reader:   ExtractiveReader,
    docs_dir: String,
}

impl AskUseCase {
    /// Build and warm up a reader from `config`.
    pub fn new(config: ReaderConfig, docs_dir: String) -> Result<Self> {
        let mut reader = ExtractiveReader::new(config)?;
        reader
            .warm_up()
            .context("Cannot load the reader model. Is --model a checkpoint directory?")?;
        Ok(Self::with_reader(reader, docs_dir))
    }

    pub fn with_reader(reader: ExtractiveReader, docs_dir: String) -> Self {
        Self { reader, docs_dir }
    }

    pub fn answer(&self, question: &str, overrides: &RunOverrides) -> Result<Vec<ExtractedAnswer>> {
        let documents = DirectoryLoader::new(&self.docs_dir).load_all()?;
        if documents.is_empty() {
            tracing::warn!("No documents found in '{}'", self.docs_dir);
            return Ok(Vec::new());
        }
        tracing::info!("Loaded {} document(s) from '{}'", documents.len(), self.docs_dir);

        let answers = self.reader.run(question, &documents, overrides)?;
        Ok(answers)
    }
}

/// Render answers as a numbered list, best first.
pub fn format_answers(answers: &[ExtractedAnswer]) -> String {
    if answers.is_empty() {
        return "No documents to answer from.".to_string();
    }

    let mut out = String::new();
    for (rank, answer) in answers.iter().enumerate() {
        let _ = write!(out, "{:>2}. [{:.4}] ", rank + 1, answer.score);

        let Some(text) = &answer.data else {
            let _ = writeln!(out, "(no answer)");
            continue;
        };
        let _ = write!(out, "{text}");

        let source = answer
            .document
            .as_ref()
            .and_then(|d| d.meta.get("file_path"))
            .and_then(|v| v.as_str());
        if let Some(source) = source {
            let _ = write!(out, "  ({source}");
            if let Some(page) = answer.page_number() {
                let _ = write!(out, ", page {page}");
            }
            let _ = write!(out, ")");
        }
        out.push('\n');
    }
    out
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{PeakModel, WhitespaceEncoder};
    use std::{fs, sync::Arc};

    fn use_case(dir: &std::path::Path) -> AskUseCase {
        let config = ReaderConfig { top_k: 2, ..ReaderConfig::new("test-model") };
        let reader = ExtractiveReader::with_components(
            config,
            Arc::new(PeakModel::new(8, 9)),
            Arc::new(WhitespaceEncoder),
        )
        .unwrap();
        AskUseCase::with_reader(reader, dir.to_string_lossy().into_owned())
    }

    #[test]
    fn test_answers_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "Angela Merkel was the chancellor of Germany.").unwrap();
        fs::write(dir.path().join("b.txt"), "Olaf Scholz is the chancellor of Germany").unwrap();
        fs::write(dir.path().join("b.txt.meta.json"), r#"{"page_number": 3}"#).unwrap();

        let answers = use_case(dir.path())
            .answer("Who is the chancellor of Germany?", &RunOverrides::default())
            .unwrap();
        assert_eq!(answers.len(), 3);

        let rendered = format_answers(&answers);
        assert!(rendered.contains("Angela Merkel  (a.txt)"));
        assert!(rendered.contains("Olaf Scholz  (b.txt, page 3)"));
        assert!(rendered.contains("(no answer)"));
    }

    #[test]
    fn test_empty_directory() {
        let dir     = tempfile::tempdir().unwrap();
        let answers = use_case(dir.path()).answer("Who?", &RunOverrides::default()).unwrap();
        assert!(answers.is_empty());
        assert_eq!(format_answers(&answers), "No documents to answer from.");
    }
}
