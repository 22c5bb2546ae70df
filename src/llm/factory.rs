//! LLM client factory.
//!
//! Centralizes provider-specific logic for creating LLM clients.

use std::sync::Arc;

use crate::config::LlmConfig;
use crate::error::{AgentError, Result};
use crate::llm::{
    LlmClient, LlmProvider, MockLlmClient, OllamaClient, OllamaConfig, OpenAiClient, OpenAiConfig,
};

/// Creates the LLM client described by `config`, reading keys from the
/// process environment.
///
/// - `GROQ_API_KEY` / `OPENAI_API_KEY` supply the API key (required).
/// - `LLM_MODEL` overrides the configured model.
/// - `OLLAMA_URL` overrides the Ollama base URL.
pub fn create_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>> {
    create_client_with(config, |key| std::env::var(key).ok())
}

/// Same as [`create_client`] with an explicit variable lookup.
pub fn create_client_with<F>(config: &LlmConfig, lookup: F) -> Result<Arc<dyn LlmClient>>
where
    F: Fn(&str) -> Option<String>,
{
    let provider: LlmProvider = config.provider.parse().map_err(AgentError::config)?;
    let model = lookup("LLM_MODEL")
        .or_else(|| config.model.clone())
        .unwrap_or_else(|| provider.default_model().to_string());

    match provider {
        LlmProvider::Groq => {
            let key = lookup("GROQ_API_KEY").ok_or_else(|| {
                AgentError::config("GROQ_API_KEY environment variable not set.")
            })?;
            let mut openai_config = OpenAiConfig::groq(key, model).with_timeout(config.timeout_secs);
            if let Some(base_url) = &config.base_url {
                openai_config = openai_config.with_base_url(base_url);
            }
            Ok(Arc::new(OpenAiClient::new(openai_config)?))
        }
        LlmProvider::OpenAi => {
            let key = lookup("OPENAI_API_KEY").ok_or_else(|| {
                AgentError::config("OPENAI_API_KEY environment variable not set.")
            })?;
            let mut openai_config = OpenAiConfig::new(key, model).with_timeout(config.timeout_secs);
            if let Some(base_url) = &config.base_url {
                openai_config = openai_config.with_base_url(base_url);
            }
            Ok(Arc::new(OpenAiClient::new(openai_config)?))
        }
        LlmProvider::Ollama => {
            let mut ollama_config = OllamaConfig::new(model).with_timeout(config.timeout_secs);
            if let Some(url) = lookup("OLLAMA_URL").or_else(|| config.base_url.clone()) {
                ollama_config = ollama_config.with_url(url);
            }
            Ok(Arc::new(OllamaClient::new(ollama_config)?))
        }
        LlmProvider::Mock => Ok(Arc::new(MockLlmClient::new())),
    }
}
