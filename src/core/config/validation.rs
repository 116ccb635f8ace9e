use thiserror::Error;

use super::settings::Settings;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config: {0}")]
    Invalid(String),
    #[error("failed to read config {0}: {1}")]
    Io(String, #[source] std::io::Error),
    #[error("failed to parse config {0}: {1}")]
    Parse(String, #[source] serde_yaml::Error),
}

/// Validate settings before any service starts. Violations here are fatal.
pub fn validate_settings(settings: &Settings) -> Result<(), ConfigError> {
    let chunking = &settings.chunking;
    if chunking.chunk_size == 0 {
        return Err(ConfigError::Invalid(
            "chunking.chunk_size must be positive".to_string(),
        ));
    }
    if chunking.chunk_overlap >= chunking.chunk_size {
        return Err(ConfigError::Invalid(format!(
            "chunking.chunk_overlap ({}) must be less than chunk_size ({})",
            chunking.chunk_overlap, chunking.chunk_size
        )));
    }

    if settings.retrieval.top_k == 0 {
        return Err(ConfigError::Invalid(
            "retrieval.top_k must be at least 1".to_string(),
        ));
    }

    if settings.llm.timeout_secs == 0 {
        return Err(ConfigError::Invalid(
            "llm.timeout_secs must be positive".to_string(),
        ));
    }

    let chat = &settings.chat;
    if chat.system_reserve + chat.output_reserve >= chat.context_window {
        return Err(ConfigError::Invalid(format!(
            "chat reserves ({} + {}) leave no room in context_window ({})",
            chat.system_reserve, chat.output_reserve, chat.context_window
        )));
    }

    match settings.history.backend.as_str() {
        "memory" | "sqlite" => {}
        other => {
            return Err(ConfigError::Invalid(format!(
                "history.backend must be \"memory\" or \"sqlite\", got \"{other}\""
            )));
        }
    }

    Ok(())
}
