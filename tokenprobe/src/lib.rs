//! Token-level confidence visualizer for chat completions.

pub mod analysis;
pub mod client;
pub mod completions;
pub mod credentials;
pub mod error;
pub mod history;
pub mod render;
pub mod scoring;

#[cfg(test)]
mod test_support;

pub use tokenprobe_types as types;

pub use analysis::{Analysis, Analyzer};
pub use client::{Client, ClientBuilder, HttpOptions};
pub use completions::CompletionOptions;
pub use error::{Error, Result};
pub use scoring::{ConfidenceClass, ConfidencePolicy, LogBase, Scorer, SequenceScore, TokenScore};
