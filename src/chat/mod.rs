pub mod prompt;
pub mod synthesizer;

pub use prompt::PromptBudget;
pub use synthesizer::{AnswerSynthesizer, ChatAnswer, SourceRef, SynthesizerConfig};
