//! Shared wire types for tokenprobe.

pub mod chat;
pub mod logprobs;
