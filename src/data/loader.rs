// ============================================================
// Layer 4 — Document Loader
// ============================================================
// Loads candidate documents from a directory for the CLI.
//
// Supported files:
//   *.txt  — read as UTF-8, form feeds ('\f') kept as page breaks
//   *.docx — parsed with docx-rs, one line per paragraph
//
// Metadata sidecar:
//   A file named "<file name>.meta.json" next to a document is
//   merged into that document's metadata, e.g.
//     report.txt            ← the document
//     report.txt.meta.json  ← {"page_number": 5}
//
// The file name is always stored under "file_path".
//
// A .docx file is a ZIP archive of XML. docx-rs gives us a
// typed tree:
//   Document
//     └── children: Vec<DocumentChild>
//           └── Paragraph
//                 └── children: Vec<ParagraphChild>
//                       └── Run
//                             └── children: Vec<RunChild>
//                                   └── Text (the actual words!)
//
// Reference: docx-rs crate documentation
//            Rust Book §9 (Error Handling)

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::{fs, path::Path};
use docx_rs::read_docx;

use crate::domain::document::Document;
use crate::domain::traits::DocumentSource;

/// Suffix of metadata sidecar files
pub const META_SUFFIX: &str = ".meta.json";

/// Loads all .txt and .docx files from a directory.
pub struct DirectoryLoader {
    dir: String,
}

impl DirectoryLoader {
    pub fn new(dir: impl Into<String>) -> Self {
        Self { dir: dir.into() }
    }
}

impl DocumentSource for DirectoryLoader {
    fn load_all(&self) -> Result<Vec<Document>> {
        let dir = Path::new(&self.dir);

        if !dir.exists() {
            tracing::warn!(
                "Docs directory '{}' does not exist — returning empty corpus",
                self.dir
            );
            return Ok(Vec::new());
        }

        // Sorted so documents keep a stable rank order between runs
        let mut paths: Vec<_> = fs::read_dir(dir)
            .with_context(|| format!("Cannot read directory '{}'", self.dir))?
            .collect::<std::io::Result<Vec<_>>>()?
            .into_iter()
            .map(|entry| entry.path())
            .collect();
        paths.sort();

        let mut docs = Vec::new();
        for path in paths {
            let text = match path.extension().and_then(|e| e.to_str()) {
                Some("txt")  => fs::read_to_string(&path)
                    .with_context(|| format!("Cannot read '{}'", path.display())),
                Some("docx") => load_docx_text(&path),
                _            => continue,
            };

            // Log a warning but continue — don't fail on one bad file
            let text = match text {
                Ok(t)  => t,
                Err(e) => {
                    tracing::warn!("Skipping '{}': {:#}", path.display(), e);
                    continue;
                }
            };

            let meta = load_meta(&path)?;
            let doc  = Document::with_meta(text, meta);
            tracing::debug!("Loaded: {} ({} chars)", path.display(), doc.char_len());
            docs.push(doc);
        }

        tracing::info!("Successfully loaded {} documents", docs.len());
        Ok(docs)
    }
}

/// Build the metadata map: file name plus the optional sidecar
fn load_meta(path: &Path) -> Result<Map<String, Value>> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown")
        .to_string();

    let mut meta = Map::new();
    let sidecar  = path.with_file_name(format!("{file_name}{META_SUFFIX}"));
    if sidecar.exists() {
        let raw = fs::read_to_string(&sidecar)
            .with_context(|| format!("Cannot read '{}'", sidecar.display()))?;
        let value: Value = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid JSON in '{}'", sidecar.display()))?;
        match value {
            Value::Object(map) => meta.extend(map),
            _ => anyhow::bail!("'{}' must contain a JSON object", sidecar.display()),
        }
    }
    meta.insert("file_path".to_string(), Value::String(file_name));
    Ok(meta)
}

/// Parse a single .docx file and return its text,
/// one paragraph per line.
fn load_docx_text(path: &Path) -> Result<String> {
    let bytes = fs::read(path)
        .with_context(|| format!("Cannot read '{}'", path.display()))?;

    let docx = read_docx(&bytes)
        .map_err(|e| {
            anyhow::anyhow!("docx-rs parse error in '{}': {:?}", path.display(), e)
        })?;

    let mut paragraphs: Vec<String> = Vec::new();
    for child in &docx.document.children {
        use docx_rs::DocumentChild;

        // Tables, images, section properties are ignored
        if let DocumentChild::Paragraph(para) = child {
            let para_text = extract_paragraph_text(para);
            if !para_text.trim().is_empty() {
                paragraphs.push(para_text);
            }
        }
    }

    Ok(paragraphs.join("\n"))
}

/// Concatenate the text runs of one paragraph.
fn extract_paragraph_text(para: &docx_rs::Paragraph) -> String {
    let mut parts = Vec::new();

    for child in &para.children {
        use docx_rs::ParagraphChild;

        if let ParagraphChild::Run(run) = child {
            for rc in &run.children {
                use docx_rs::RunChild;

                if let RunChild::Text(t) = rc {
                    parts.push(t.text.clone());
                }
            }
        }
    }

    parts.join("")
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_directory_gives_empty_corpus() {
        let loader = DirectoryLoader::new("/definitely/not/here");
        assert!(loader.load_all().unwrap().is_empty());
    }

    #[test]
    fn test_loads_text_files_with_sidecar_meta() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "Page one.\u{c}Page two.").unwrap();
        fs::write(dir.path().join("a.txt.meta.json"), r#"{"page_number": 5}"#).unwrap();
        fs::write(dir.path().join("b.txt"), "Olaf Scholz is the chancellor of Germany").unwrap();
        fs::write(dir.path().join("ignored.csv"), "x,y").unwrap();

        let docs = DirectoryLoader::new(dir.path().to_str().unwrap()).load_all().unwrap();
        assert_eq!(docs.len(), 2);

        assert_eq!(docs[0].content.as_deref(), Some("Page one.\u{c}Page two."));
        assert_eq!(docs[0].page_number(), Some(&json!(5)));
        assert_eq!(docs[0].meta.get("file_path"), Some(&json!("a.txt")));

        assert_eq!(docs[1].page_number(), None);
        assert_eq!(docs[1].meta.get("file_path"), Some(&json!("b.txt")));
    }

    #[test]
    fn test_sidecar_must_be_an_object() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "text").unwrap();
        fs::write(dir.path().join("a.txt.meta.json"), "[1, 2]").unwrap();

        let result = DirectoryLoader::new(dir.path().to_str().unwrap()).load_all();
        assert!(result.is_err());
    }
}
