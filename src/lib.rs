//! Extractive question answering over candidate documents.
//!
//! Layers, from the outside in:
//!
//! - [`cli`]: command line parsing (Layer 1)
//! - [`application`]: the reader pipeline and its config (Layer 2)
//! - [`domain`]: documents, answers, traits, errors (Layer 3)
//! - [`data`]: loading, flattening and windowing (Layer 4)
//! - [`postprocess`]: span decoding and answer ranking (Layer 4)
//! - [`ml`]: the burn span encoder (Layer 5)
//! - [`infra`]: checkpoints, tokenizers, devices, secrets (Layer 6)

#![recursion_limit = "256"]

pub mod application;
pub mod cli;
pub mod data;
pub mod domain;
pub mod infra;
pub mod ml;
pub mod postprocess;

#[cfg(test)]
mod testing;
