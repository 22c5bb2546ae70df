//! Safe execution of generated SQL.
//!
//! Runs one statement inside its own transaction and folds every outcome,
//! including database errors, into an [`ExecutionResult`]. Nothing raised by
//! the database escapes this module.

use serde::Serialize;
use tracing::{debug, warn};

use crate::db::{render_row, DatabaseClient, SqlTransaction, StatementOutput};
use crate::error::AgentError;

/// Text rendered for a statement that succeeded without a row set.
pub const ACKNOWLEDGED_TEXT: &str = "Query executed successfully.";

/// Outcome of running one SQL statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExecutionResult {
    /// The statement produced a row set; each entry is one rendered row, in
    /// the order the database returned them.
    Rows { rows: Vec<String> },
    /// The statement produced no row set and its transaction committed.
    Acknowledged,
    /// The statement (or its commit) failed and the transaction was rolled back.
    Failed { message: String },
}

impl ExecutionResult {
    /// Renders the result as the text handed to the answer stage.
    pub fn render(&self) -> String {
        match self {
            Self::Rows { rows } => rows.join("\n"),
            Self::Acknowledged => ACKNOWLEDGED_TEXT.to_string(),
            Self::Failed { message } => message.clone(),
        }
    }

    /// Returns true for the `Failed` variant.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    fn failed(error: &AgentError) -> Self {
        Self::Failed {
            message: format!("Error executing query: {}", failure_text(error)),
        }
    }
}

/// The underlying message without the error category prefix.
fn failure_text(error: &AgentError) -> &str {
    match error {
        AgentError::Connection(msg)
        | AgentError::Query(msg)
        | AgentError::Llm(msg)
        | AgentError::Config(msg)
        | AgentError::Internal(msg) => msg,
    }
}

/// Executes untrusted SQL with rollback-on-error as its only safeguard.
///
/// The caller hands over exactly one statement per call; multi-statement
/// text is neither split nor validated.
pub struct QueryExecutor<'a> {
    db: &'a dyn DatabaseClient,
}

impl<'a> QueryExecutor<'a> {
    /// Creates a new query executor.
    pub fn new(db: &'a dyn DatabaseClient) -> Self {
        Self { db }
    }

    /// Executes `sql` and returns its outcome. Never fails.
    ///
    /// Every successful statement is committed, including one that produced
    /// rows, so `INSERT ... RETURNING` and data-modifying CTEs persist. A
    /// failed commit is reported as `Failed`, never as the rows it returned.
    pub async fn execute(&self, sql: &str) -> ExecutionResult {
        let mut tx = match self.db.begin().await {
            Ok(tx) => tx,
            Err(e) => {
                warn!("Could not open transaction: {}", e);
                return ExecutionResult::failed(&e);
            }
        };

        match tx.run(sql).await {
            Ok(StatementOutput::Rows(rows)) => {
                let rendered: Vec<String> = rows.iter().map(render_row).collect();
                match tx.commit().await {
                    Ok(()) => ExecutionResult::Rows { rows: rendered },
                    Err(e) => {
                        warn!("Commit failed after row-producing statement: {}", e);
                        ExecutionResult::failed(&e)
                    }
                }
            }
            Ok(StatementOutput::Affected(count)) => match tx.commit().await {
                Ok(()) => {
                    debug!("Statement committed ({} rows affected)", count);
                    ExecutionResult::Acknowledged
                }
                Err(e) => {
                    warn!("Commit failed: {}", e);
                    ExecutionResult::failed(&e)
                }
            },
            Err(e) => {
                rollback(tx).await;
                ExecutionResult::failed(&e)
            }
        }
    }
}

async fn rollback(tx: Box<dyn SqlTransaction>) {
    match tx.rollback().await {
        Ok(()) => warn!("Statement failed; transaction rolled back"),
        // The connection is discarded either way, which also aborts the transaction.
        Err(e) => warn!("Statement failed and rollback reported: {}", e),
    }
}
