use std::env;
use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::paths::AppPaths;
use super::validation::{validate_settings, ConfigError};

/// Typed application settings, loaded from `config.yml` with environment
/// overrides layered on top.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub embedding: EmbeddingSettings,
    pub llm: LlmSettings,
    pub chunking: ChunkingSettings,
    pub retrieval: RetrievalSettings,
    pub chat: ChatSettings,
    pub history: HistorySettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Port to bind. 0 lets the OS pick one.
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Base URL of an OpenAI-compatible embeddings endpoint.
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Base URL of an OpenAI-compatible chat completions endpoint.
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<i32>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in characters.
    pub chunk_overlap: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    /// Number of chunks retrieved per query.
    pub top_k: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatSettings {
    /// Most recent turns fetched from the conversation store per request.
    pub history_limit: usize,
    /// Model context window, in (estimated) tokens.
    pub context_window: usize,
    /// Tokens reserved for the system instructions.
    pub system_reserve: usize,
    /// Tokens reserved for the model's output.
    pub output_reserve: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistorySettings {
    /// Conversation store backing: "memory" or "sqlite".
    pub backend: String,
    /// Per-conversation turn cap for the memory backing; oldest turns are
    /// evicted past this.
    pub max_turns: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            port: 8000,
            cors_allowed_origins: Vec::new(),
        }
    }
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:11434".to_string(),
            model: "nomic-embed-text".to_string(),
            api_key: None,
        }
    }
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.groq.com/openai".to_string(),
            model: "llama-3.1-8b-instant".to_string(),
            api_key: None,
            temperature: None,
            max_tokens: None,
            timeout_secs: 60,
        }
    }
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self { top_k: 4 }
    }
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            history_limit: 20,
            context_window: 8192,
            system_reserve: 500,
            output_reserve: 1000,
        }
    }
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            backend: "memory".to_string(),
            max_turns: 200,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            embedding: EmbeddingSettings::default(),
            llm: LlmSettings::default(),
            chunking: ChunkingSettings::default(),
            retrieval: RetrievalSettings::default(),
            chat: ChatSettings::default(),
            history: HistorySettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from `config.yml` (if present), apply environment
    /// overrides, and validate.
    pub fn load(paths: &AppPaths) -> Result<Self, ConfigError> {
        let mut settings = match config_path(paths) {
            Some(path) => {
                let contents = fs::read_to_string(&path)
                    .map_err(|e| ConfigError::Io(path.display().to_string(), e))?;
                serde_yaml::from_str::<Settings>(&contents)
                    .map_err(|e| ConfigError::Parse(path.display().to_string(), e))?
            }
            None => Settings::default(),
        };

        settings.apply_env_overrides();
        validate_settings(&settings)?;
        Ok(settings)
    }

    fn apply_env_overrides(&mut self) {
        if let Some(port) = env_parse::<u16>("PORT") {
            self.server.port = port;
        }
        if let Ok(url) = env::var("DOCQA_EMBEDDING_URL") {
            self.embedding.base_url = url;
        }
        if let Ok(model) = env::var("EMBEDDING_MODEL") {
            self.embedding.model = model;
        }
        if let Ok(url) = env::var("DOCQA_LLM_URL") {
            self.llm.base_url = url;
        }
        if let Ok(model) = env::var("DOCQA_LLM_MODEL") {
            self.llm.model = model;
        }
        if let Ok(key) = env::var("GROQ_API_KEY") {
            self.llm.api_key = Some(key);
        }
        if let Ok(backend) = env::var("DOCQA_HISTORY_BACKEND") {
            self.history.backend = backend;
        }
    }
}

fn config_path(paths: &AppPaths) -> Option<PathBuf> {
    if let Ok(path) = env::var("DOCQA_CONFIG_PATH") {
        return Some(PathBuf::from(path));
    }

    let user_config = paths.user_data_dir.join("config.yml");
    if user_config.exists() {
        return Some(user_config);
    }

    let project_config = paths.project_root.join("config.yml");
    if project_config.exists() {
        return Some(project_config);
    }

    None
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|val| val.parse::<T>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_pass_validation() {
        let settings = Settings::default();
        assert!(validate_settings(&settings).is_ok());
    }

    #[test]
    fn parses_partial_yaml() {
        let yaml = "chunking:\n  chunk_size: 800\n  chunk_overlap: 100\n";
        let settings: Settings = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(settings.chunking.chunk_size, 800);
        assert_eq!(settings.chunking.chunk_overlap, 100);
        // Untouched sections keep their defaults
        assert_eq!(settings.retrieval.top_k, 4);
    }
}
