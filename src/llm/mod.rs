pub mod openai_compat;
pub mod provider;
pub mod types;

pub use openai_compat::OpenAiCompatClient;
pub use provider::{GenerateError, LlmClient};
pub use types::{ChatMessage, ChatRequest};
