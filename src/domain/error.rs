//! Library error type.
//!
//! The binary layers (cli, application use cases, infra loaders)
//! keep using `anyhow`; everything a caller of the reader may
//! want to match on is a variant here.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReaderError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Not supported yet: {0}")]
    Unsupported(String),

    #[error("The reader is not warmed up. Call warm_up() before running it.")]
    NotWarmedUp,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Model or tokenizer failure. Fatal for the call that hit it.
    #[error("Model error: {0:#}")]
    Model(anyhow::Error),
}
