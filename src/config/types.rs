//! Configuration types.

use serde::{Deserialize, Serialize};

/// AI provider kind.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Gemini,
    Claude,
    OpenAi,
}

/// Configuration for the model client used by agents and the model driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    /// Provider to use (gemini, claude or openai).
    #[serde(default)]
    pub provider: ProviderKind,
    /// Model name passed to the provider.
    #[serde(default = "default_model")]
    pub model: String,
    /// Maximum tokens in response.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Base URL for the API.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Environment variable name for the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

fn default_model() -> String {
    "gemini-3-flash".to_string()
}

fn default_max_tokens() -> u32 {
    8192
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
        }
    }
}

/// Sliding-window chunking parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Window size in characters.
    pub chunk_size: usize,
    /// Characters shared between consecutive windows.
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 900,
            chunk_overlap: 150,
        }
    }
}

/// Retrieval output shaping.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Character budget for search previews.
    pub preview_chars: usize,
    /// Results per file when the caller omits `k`.
    pub default_k: usize,
    /// Character budget for tool results shown on the terminal.
    pub max_tool_chars: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            preview_chars: 80,
            default_k: 4,
            max_tool_chars: 900,
        }
    }
}

/// Default thresholds for the analysis toolkit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalysisConfig {
    /// `compare_values` flags a spread above this ratio.
    pub significance_threshold: f64,
    /// `detect_anomalies` flags deviations above this ratio.
    pub anomaly_threshold: f64,
    /// `calculate_variance` flags variances above this ratio.
    pub variance_threshold: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            significance_threshold: 0.2,
            anomaly_threshold: 0.2,
            variance_threshold: 0.1,
        }
    }
}

/// Configuration for the supervisor task loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
    /// Maximum tool calls per task before the loop is ended.
    pub max_steps: usize,
    /// Bound on accumulated `evidence` / `documents` text in the shared context.
    pub max_context_chars: usize,
    /// Entries kept in each agent's working memory.
    pub memory_limit: usize,
    /// Results returned by `lookup_knowledge`.
    pub knowledge_k: usize,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            max_steps: 25,
            max_context_chars: 8000,
            memory_limit: 50,
            knowledge_k: 3,
        }
    }
}

/// Top-level configuration file layout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InvestigatorConfig {
    pub ai: AiConfig,
    pub chunking: ChunkingConfig,
    pub retrieval: RetrievalConfig,
    pub analysis: AnalysisConfig,
    pub supervisor: SupervisorConfig,
}
