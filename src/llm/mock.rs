//! Mock LLM client for testing.
//!
//! Provides deterministic responses based on input patterns and records
//! every request it receives.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use crate::error::{AgentError, Result};
use crate::llm::types::{Message, Role};
use crate::llm::LlmClient;

/// A request observed by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmRequest {
    /// Concatenated system instructions.
    pub system: String,
    /// Content of the last user message.
    pub user: String,
}

/// Mock LLM client that returns canned responses based on input patterns.
///
/// Answer-generation calls are recognized by their user content and
/// answered with a fixed prefix followed by the execution result, so a
/// pipeline run against the mock is fully deterministic.
#[derive(Debug, Clone, Default)]
pub struct MockLlmClient {
    /// Custom response mappings (pattern -> response).
    custom_responses: Vec<(String, String)>,
    /// Fail every call from this index on, with the given message.
    failure: Option<(usize, String)>,
    /// Requests seen so far, shared between clones.
    requests: Arc<Mutex<Vec<LlmRequest>>>,
}

/// Prefix of every mock answer.
pub const MOCK_ANSWER_PREFIX: &str = "Mock answer based on:";

impl MockLlmClient {
    /// Creates a new mock client with default responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a custom response mapping.
    ///
    /// When the user input contains `pattern` (case-insensitive), the mock
    /// returns `response` verbatim.
    pub fn with_response(
        mut self,
        pattern: impl Into<String>,
        response: impl Into<String>,
    ) -> Self {
        self.custom_responses
            .push((pattern.into().to_lowercase(), response.into()));
        self
    }

    /// Makes every call fail with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some((0, message.into())),
            ..Self::default()
        }
    }

    /// Lets the first `calls` calls succeed and fails the rest.
    pub fn failing_after(mut self, calls: usize) -> Self {
        self.failure = Some((calls, "Mock LLM service unavailable".to_string()));
        self
    }

    /// Returns the recorded requests.
    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Generates a mock response based on the input.
    fn mock_response(&self, input: &str) -> String {
        if input.starts_with("Original question:") || input.starts_with("Original request:") {
            return Self::mock_answer(input);
        }

        let input_lower = input.to_lowercase();

        for (pattern, response) in &self.custom_responses {
            if input_lower.contains(pattern) {
                return response.clone();
            }
        }

        if input_lower.contains("all users") || input_lower.contains("show users") {
            return "```sql\nSELECT * FROM users;\n```".to_string();
        }

        if input_lower.contains("count") && input_lower.contains("orders") {
            return "```sql\nSELECT COUNT(*) FROM orders;\n```".to_string();
        }

        if input_lower.contains("count") && input_lower.contains("users") {
            return "```sql\nSELECT COUNT(*) FROM users;\n```".to_string();
        }

        if input_lower.contains("drop") && input_lower.contains("users") {
            return "DROP TABLE users;".to_string();
        }

        if (input_lower.contains("insert") || input_lower.contains("add"))
            && input_lower.contains("user")
        {
            return "```sql\nINSERT INTO users (email, name) VALUES ('test@example.com', 'Test User');\n```".to_string();
        }

        if input_lower.contains("update") && input_lower.contains("user") {
            return "```sql\nUPDATE users SET name = 'Updated Name' WHERE id = 1;\n```".to_string();
        }

        if input_lower.contains("delete") && input_lower.contains("user") {
            return "```sql\nDELETE FROM users WHERE id = 1;\n```".to_string();
        }

        "SELECT 1;".to_string()
    }

    /// Echoes the execution result section of an answer request.
    fn mock_answer(input: &str) -> String {
        let result = input
            .split_once("Execution Result:\n")
            .map(|(_, result)| result)
            .unwrap_or(input);
        format!("{}\n{}", MOCK_ANSWER_PREFIX, result)
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String> {
        let request = LlmRequest {
            system: messages
                .iter()
                .filter(|m| m.role == Role::System)
                .map(|m| m.content.as_str())
                .collect::<Vec<_>>()
                .join("\n"),
            user: messages
                .iter()
                .rev()
                .find(|m| m.role == Role::User)
                .map(|m| m.content.clone())
                .unwrap_or_default(),
        };

        let call_index = {
            let mut requests = self
                .requests
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            requests.push(request.clone());
            requests.len() - 1
        };

        if let Some((after, message)) = &self.failure {
            if call_index >= *after {
                return Err(AgentError::llm(message.clone()));
            }
        }

        Ok(self.mock_response(&request.user))
    }
}
