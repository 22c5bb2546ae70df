//! LLM integration.
//!
//! Provides the text-generation collaborator the pipeline calls twice per
//! request: once to write SQL, once to phrase the answer. Calls are
//! independent and stateless; there is no retry or streaming here, so any
//! provider failure surfaces to the caller.

pub mod factory;
pub mod mock;
pub mod ollama;
pub mod openai;
pub mod parser;
pub mod prompt;
pub mod types;

pub use factory::create_client;
pub use mock::{LlmRequest, MockLlmClient};
pub use ollama::{OllamaClient, OllamaConfig};
pub use openai::{OpenAiClient, OpenAiConfig};
pub use parser::extract_sql;
pub use types::{Message, Role};

use async_trait::async_trait;
use std::str::FromStr;

use crate::error::Result;

/// Trait for LLM clients that can generate completions.
///
/// Implementations must be thread-safe (Send + Sync) to serve concurrent
/// requests.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generates a completion for the given messages.
    async fn complete(&self, messages: &[Message]) -> Result<String>;

    /// Generates text from a system instruction and a user message.
    async fn generate(&self, system_instruction: &str, user_content: &str) -> Result<String> {
        let messages = [
            Message::system(system_instruction),
            Message::user(user_content),
        ];
        self.complete(&messages).await
    }
}

/// LLM provider type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LlmProvider {
    /// Groq (OpenAI-compatible API)
    #[default]
    Groq,
    /// OpenAI
    OpenAi,
    /// Local Ollama instance
    Ollama,
    /// Mock client for testing (no API key required)
    Mock,
}

impl LlmProvider {
    /// Returns the provider as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Groq => "groq",
            Self::OpenAi => "openai",
            Self::Ollama => "ollama",
            Self::Mock => "mock",
        }
    }

    /// Returns the model used when none is configured.
    pub fn default_model(&self) -> &'static str {
        match self {
            Self::Groq => "llama3-8b-8192",
            Self::OpenAi => "gpt-4o-mini",
            Self::Ollama => "llama3.2:3b",
            Self::Mock => "mock",
        }
    }
}

impl FromStr for LlmProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "groq" => Ok(Self::Groq),
            "openai" => Ok(Self::OpenAi),
            "ollama" => Ok(Self::Ollama),
            "mock" => Ok(Self::Mock),
            _ => Err(format!("Unknown LLM provider: {}", s)),
        }
    }
}

impl std::fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
