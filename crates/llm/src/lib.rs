//! `LanguageModel` collaborator: a streaming HTTP backend plus an in-memory
//! fake for tests.

pub mod error;
pub mod fake;
pub mod ollama;

pub use error::LlmError;
pub use fake::FakeLanguageModel;
pub use ollama::{OllamaConfig, OllamaLanguageModel};
