//! Mock database client for testing.
//!
//! Provides an in-memory database with a scripted catalog and scripted
//! statement outcomes, recording every transaction event.

use super::{CatalogEntry, DatabaseClient, Row, SqlTransaction, StatementOutput, Value};
use crate::error::{AgentError, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// Scripted result for statements matching a pattern.
#[derive(Debug, Clone, PartialEq)]
pub enum MockOutcome {
    /// Return these rows.
    Rows(Vec<Row>),
    /// Report this many affected rows.
    Affected(u64),
    /// Fail with this database error text.
    Error(String),
}

/// A transaction or client event observed by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxEvent {
    Begin,
    Run(String),
    Commit,
    Rollback,
    /// The client itself was closed.
    Close,
}

/// A mock database client that returns predefined results.
#[derive(Debug, Clone, Default)]
pub struct MockDatabaseClient {
    catalog: Vec<CatalogEntry>,
    catalog_error: Option<String>,
    statements: Vec<(String, MockOutcome)>,
    begin_error: Option<String>,
    commit_error: Option<String>,
    events: Arc<Mutex<Vec<TxEvent>>>,
}

impl MockDatabaseClient {
    /// Creates a new mock database client with an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mock with a small `users`/`orders` database, used by the
    /// `--mock-db` CLI mode.
    pub fn demo() -> Self {
        Self::new()
            .with_catalog(vec![
                CatalogEntry::new("orders", "id", "integer"),
                CatalogEntry::new("orders", "user_id", "integer"),
                CatalogEntry::new("orders", "total", "numeric"),
                CatalogEntry::new("users", "id", "integer"),
                CatalogEntry::new("users", "email", "character varying"),
                CatalogEntry::new("users", "name", "character varying"),
            ])
            .with_statement(
                "from users",
                MockOutcome::Rows(vec![
                    vec![
                        Value::Int(1),
                        Value::from("alice@example.com"),
                        Value::from("Alice"),
                    ],
                    vec![
                        Value::Int(2),
                        Value::from("bob@example.com"),
                        Value::from("Bob"),
                    ],
                ]),
            )
            .with_statement("count(*)", MockOutcome::Rows(vec![vec![Value::Int(2)]]))
    }

    /// Sets the catalog rows returned by `fetch_catalog`.
    pub fn with_catalog(mut self, catalog: Vec<CatalogEntry>) -> Self {
        self.catalog = catalog;
        self
    }

    /// Makes `fetch_catalog` fail.
    pub fn with_catalog_error(mut self, message: impl Into<String>) -> Self {
        self.catalog_error = Some(message.into());
        self
    }

    /// Adds a scripted outcome for statements containing `pattern`
    /// (case-insensitive). The first matching pattern wins.
    pub fn with_statement(mut self, pattern: impl Into<String>, outcome: MockOutcome) -> Self {
        self.statements.push((pattern.into().to_lowercase(), outcome));
        self
    }

    /// Makes `begin` fail.
    pub fn with_begin_error(mut self, message: impl Into<String>) -> Self {
        self.begin_error = Some(message.into());
        self
    }

    /// Makes every commit fail.
    pub fn with_commit_error(mut self, message: impl Into<String>) -> Self {
        self.commit_error = Some(message.into());
        self
    }

    /// Returns the recorded transaction events.
    pub fn events(&self) -> Vec<TxEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

fn record(events: &Mutex<Vec<TxEvent>>, event: TxEvent) {
    events
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .push(event);
}

#[async_trait]
impl DatabaseClient for MockDatabaseClient {
    async fn fetch_catalog(&self) -> Result<Vec<CatalogEntry>> {
        match &self.catalog_error {
            Some(message) => Err(AgentError::query(message.clone())),
            None => Ok(self.catalog.clone()),
        }
    }

    async fn begin(&self) -> Result<Box<dyn SqlTransaction>> {
        if let Some(message) = &self.begin_error {
            return Err(AgentError::connection(message.clone()));
        }
        record(&self.events, TxEvent::Begin);

        Ok(Box::new(MockTransaction {
            statements: self.statements.clone(),
            commit_error: self.commit_error.clone(),
            events: Arc::clone(&self.events),
        }))
    }

    async fn close(&self) -> Result<()> {
        record(&self.events, TxEvent::Close);
        Ok(())
    }
}

struct MockTransaction {
    statements: Vec<(String, MockOutcome)>,
    commit_error: Option<String>,
    events: Arc<Mutex<Vec<TxEvent>>>,
}

impl MockTransaction {
    fn outcome_for(&self, sql: &str) -> MockOutcome {
        let sql_lower = sql.to_lowercase();

        if let Some((_, outcome)) = self
            .statements
            .iter()
            .find(|(pattern, _)| sql_lower.contains(pattern.as_str()))
        {
            return outcome.clone();
        }

        if sql_lower.trim_start().starts_with("select") {
            MockOutcome::Rows(vec![vec![Value::String(format!(
                "Mock result for: {}",
                sql.trim()
            ))]])
        } else {
            MockOutcome::Affected(0)
        }
    }
}

#[async_trait]
impl SqlTransaction for MockTransaction {
    async fn run(&mut self, sql: &str) -> Result<StatementOutput> {
        record(&self.events, TxEvent::Run(sql.to_string()));

        match self.outcome_for(sql) {
            MockOutcome::Rows(rows) => Ok(StatementOutput::Rows(rows)),
            MockOutcome::Affected(count) => Ok(StatementOutput::Affected(count)),
            MockOutcome::Error(message) => Err(AgentError::query(message)),
        }
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        if let Some(message) = &self.commit_error {
            return Err(AgentError::query(message.clone()));
        }
        record(&self.events, TxEvent::Commit);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        record(&self.events, TxEvent::Rollback);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_select_default() {
        let client = MockDatabaseClient::new();
        let mut tx = client.begin().await.unwrap();
        let output = tx.run("SELECT 1").await.unwrap();
        match output {
            StatementOutput::Rows(rows) => assert_eq!(rows.len(), 1),
            other => panic!("Expected rows, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_mock_insert_default() {
        let client = MockDatabaseClient::new();
        let mut tx = client.begin().await.unwrap();
        let output = tx.run("INSERT INTO test VALUES (1)").await.unwrap();
        assert_eq!(output, StatementOutput::Affected(0));
    }

    #[tokio::test]
    async fn test_mock_scripted_error_and_events() {
        let client = MockDatabaseClient::new()
            .with_statement("bogus", MockOutcome::Error("syntax error".to_string()));
        let mut tx = client.begin().await.unwrap();
        assert!(tx.run("SELEC bogus").await.is_err());
        tx.rollback().await.unwrap();

        assert_eq!(
            client.events(),
            vec![
                TxEvent::Begin,
                TxEvent::Run("SELEC bogus".to_string()),
                TxEvent::Rollback
            ]
        );
    }

    #[tokio::test]
    async fn test_mock_catalog_error() {
        let client = MockDatabaseClient::new().with_catalog_error("boom");
        assert!(client.fetch_catalog().await.is_err());
    }

    #[tokio::test]
    async fn test_demo_catalog_is_ordered() {
        let catalog = MockDatabaseClient::demo().fetch_catalog().await.unwrap();
        let mut sorted = catalog.clone();
        sorted.sort_by(|a, b| a.table_name.cmp(&b.table_name));
        assert_eq!(catalog, sorted);
    }
}
