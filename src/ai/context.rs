//! Transcript compression for the model driver.
//!
//! The driver re-reads the investigation so far on every step; this keeps
//! that history within a fixed entry and character budget.

use serde_json::Value;

/// One step of an investigation as the driver sees it.
#[derive(Debug, Clone, PartialEq)]
pub enum TranscriptEntry {
    ToolCall { name: String, args: Value },
    ToolResult { name: String, output: String },
    Note(String),
}

/// Compressor for transcripts to fit within prompt limits.
#[derive(Debug, Clone)]
pub struct TranscriptCompressor {
    /// Maximum number of entries to include.
    max_entries: usize,
    /// Maximum total characters in output.
    max_chars: usize,
}

impl Default for TranscriptCompressor {
    fn default() -> Self {
        Self {
            max_entries: 20,
            max_chars: 8000,
        }
    }
}

impl TranscriptCompressor {
    #[must_use]
    pub fn new(max_entries: usize, max_chars: usize) -> Self {
        Self {
            max_entries,
            max_chars,
        }
    }

    /// Render the most recent entries, oldest first.
    ///
    /// Recent entries win: when the character budget runs out, older
    /// entries are dropped.
    #[must_use]
    pub fn compress(&self, entries: &[TranscriptEntry]) -> String {
        let mut kept: Vec<String> = Vec::new();
        let mut used = 0;

        for entry in entries.iter().rev().take(self.max_entries) {
            let summary = Self::summarize(entry);
            if summary.is_empty() {
                continue;
            }
            let cost = summary.len() + usize::from(!kept.is_empty());
            if used + cost > self.max_chars {
                break;
            }
            used += cost;
            kept.push(summary);
        }

        kept.reverse();
        kept.join("\n")
    }

    fn summarize(entry: &TranscriptEntry) -> String {
        match entry {
            TranscriptEntry::ToolCall { name, args } => {
                format!("[CALL] {name} {}", Self::summarize_args(args))
            }
            TranscriptEntry::ToolResult { name, output } => {
                format!("[RESULT {name}] {}", truncate(output, 600))
            }
            TranscriptEntry::Note(text) if text.trim().is_empty() => String::new(),
            TranscriptEntry::Note(text) => format!("[NOTE] {}", truncate(text, 300)),
        }
    }

    fn summarize_args(args: &Value) -> String {
        match args {
            Value::Object(map) => map
                .iter()
                .map(|(k, v)| {
                    let v_str = match v {
                        Value::String(s) => truncate(s, 80),
                        _ => truncate(&v.to_string(), 80),
                    };
                    format!("{k}={v_str}")
                })
                .collect::<Vec<_>>()
                .join(", "),
            Value::Null => String::new(),
            _ => truncate(&args.to_string(), 100),
        }
    }
}

/// Truncate a string to a maximum byte length, adding ellipsis if needed.
/// Cuts on char boundaries.
#[must_use]
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        let target_len = max_len.saturating_sub(3);
        let truncate_at = s
            .char_indices()
            .take_while(|(i, c)| i + c.len_utf8() <= target_len)
            .last()
            .map_or(0, |(i, c)| i + c.len_utf8());
        format!("{}...", &s[..truncate_at])
    }
}
