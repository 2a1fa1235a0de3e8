//! Model boundary: providers, prompts and structured-output parsing.

mod client;
mod context;
mod json;
mod prompts;

pub use client::*;
pub use context::{truncate, TranscriptCompressor, TranscriptEntry};
pub use json::*;
pub use prompts::*;
