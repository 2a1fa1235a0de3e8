//! Evidence error types.

use std::path::PathBuf;

/// Errors raised by the nearest-neighbor index boundary.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum IndexError {
    /// The backend cannot produce similarity scores.
    #[error("Similarity scores are not available from this index")]
    ScoresUnavailable,

    /// The backend failed.
    #[error("Index backend failed: {0}")]
    Backend(String),
}

/// Errors that can occur while chunking, registering or retrieving evidence.
#[derive(thiserror::Error, Debug)]
pub enum EvidenceError {
    /// Chunking parameters are out of range.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The file identifier is not registered.
    #[error("Unknown file_id: {file_id}. Available: {}", format_available(.available))]
    UnknownFile {
        file_id: String,
        available: Vec<String>,
    },

    /// The chunk index is outside the document's chunk list.
    #[error("Chunk id out of range: chunk={chunk}. Available: {}", format_range(.len))]
    ChunkOutOfRange {
        file_id: String,
        chunk: i64,
        len: usize,
    },

    /// The underlying index failed.
    #[error(transparent)]
    Index(#[from] IndexError),

    /// Failed to read an input document.
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn format_available(available: &[String]) -> String {
    if available.is_empty() {
        "(none)".to_string()
    } else {
        available.join(", ")
    }
}

fn format_range(len: &usize) -> String {
    if *len == 0 {
        "(no chunks)".to_string()
    } else {
        format!("0..{}", len - 1)
    }
}
