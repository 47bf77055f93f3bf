// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands: `ask` and `config`
// and all their configurable flags.
//
// clap's derive macros automatically generate:
//   - help text (--help)
//   - error messages for missing args
//   - type conversion (string → usize, f64, etc.)
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};

use crate::application::reader::RunOverrides;

/// The top-level subcommands available to the user
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ask a question against a directory of documents
    Ask(AskArgs),

    /// Print (or save) the reader configuration as JSON
    Config(ConfigArgs),
}

/// Flags shared by every command that builds a reader.
/// Anything left unset keeps the value from --config or the default.
#[derive(Args, Debug)]
pub struct ReaderArgs {
    /// JSON file written by the `config` command
    #[arg(long)]
    pub config: Option<String>,

    /// Checkpoint directory holding model_config.json,
    /// the weights and tokenizer.json
    #[arg(long)]
    pub model: Option<String>,

    /// Compute device: cpu, gpu:N (or cuda:N)
    #[arg(long)]
    pub device: Option<String>,

    /// Window length in tokens
    /// Format: [CLS] question [SEP] document [SEP] + padding
    #[arg(long)]
    pub max_seq_length: Option<usize>,

    /// Tokens shared by consecutive windows of a long document
    #[arg(long)]
    pub stride: Option<usize>,
}

/// All arguments for the `ask` command
#[derive(Args, Debug)]
pub struct AskArgs {
    /// The natural language question to answer
    #[arg(long)]
    pub question: String,

    /// Directory with .txt/.docx files to search
    #[arg(long, default_value = "data/docs")]
    pub docs_dir: String,

    #[command(flatten)]
    pub reader: ReaderArgs,

    /// Number of answers to return (not counting "no answer")
    #[arg(long)]
    pub top_k: Option<usize>,

    /// Drop answers scoring below this probability
    #[arg(long)]
    pub score_threshold: Option<f64>,

    /// Windows per forward pass
    #[arg(long)]
    pub max_batch_size: Option<usize>,

    /// Leave out the "no answer" entry
    #[arg(long)]
    pub without_no_answer: bool,
}

/// Convert the per-run flags into reader overrides.
/// This is the boundary between Layer 1 and Layer 2 —
/// the application layer never sees clap types.
impl From<&AskArgs> for RunOverrides {
    fn from(a: &AskArgs) -> Self {
        RunOverrides {
            top_k:           a.top_k,
            score_threshold: a.score_threshold,
            max_batch_size:  a.max_batch_size,
            no_answer:       a.without_no_answer.then_some(false),
            ..RunOverrides::default()
        }
    }
}

/// All arguments for the `config` command
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(flatten)]
    pub reader: ReaderArgs,

    /// Write the JSON here instead of printing it
    #[arg(long)]
    pub output: Option<String>,
}
