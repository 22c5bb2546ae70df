//! End-to-end pipeline tests against the mock database and mock LLM.

use std::sync::Arc;

use nl2sql_agent::db::{MockDatabaseClient, MockOutcome, TxEvent, SCHEMA_UNAVAILABLE};
use nl2sql_agent::error::AgentError;
use nl2sql_agent::llm::prompt::{MUTATION_CONFIRMATION_PROMPT, READ_ANSWER_PROMPT};
use nl2sql_agent::llm::MockLlmClient;
use nl2sql_agent::pipeline::{Phase, Pipeline};
use nl2sql_agent::query::ExecutionResult;

fn pipeline(db: &MockDatabaseClient, llm: &MockLlmClient) -> Pipeline {
    Pipeline::new(Arc::new(db.clone()), Arc::new(llm.clone()))
}

#[tokio::test]
async fn test_list_all_users_reads_and_answers() {
    let db = MockDatabaseClient::demo();
    let llm = MockLlmClient::new().with_response("list all users", "SELECT * FROM users;");

    let state = pipeline(&db, &llm).run("List all users").await.unwrap();

    assert_eq!(state.phase(), Phase::ResponseGenerated);
    assert!(!state.is_mutating().unwrap());
    assert_eq!(
        state.execution_result().unwrap(),
        "(1, 'alice@example.com', 'Alice')\n(2, 'bob@example.com', 'Bob')"
    );
    assert_eq!(llm.requests()[1].system, READ_ANSWER_PROMPT);
    assert_eq!(
        db.events(),
        vec![
            TxEvent::Begin,
            TxEvent::Run("SELECT * FROM users;".to_string()),
            TxEvent::Commit,
        ]
    );
}

#[tokio::test]
async fn test_drop_table_acknowledged_with_confirmation_branch() {
    let db = MockDatabaseClient::demo();
    let llm = MockLlmClient::new();

    let state = pipeline(&db, &llm)
        .run("Drop the users table")
        .await
        .unwrap();

    assert_eq!(state.sql_text().unwrap(), "DROP TABLE users;");
    assert!(state.is_mutating().unwrap());
    assert_eq!(state.execution().unwrap(), &ExecutionResult::Acknowledged);
    assert_eq!(llm.requests()[1].system, MUTATION_CONFIRMATION_PROMPT);
}

#[tokio::test]
async fn test_drop_missing_table_fails_with_confirmation_branch() {
    let db = MockDatabaseClient::demo().with_statement(
        "drop table",
        MockOutcome::Error("table \"users\" does not exist".to_string()),
    );
    let llm = MockLlmClient::new();

    let answer = pipeline(&db, &llm)
        .answer("Drop the users table")
        .await
        .unwrap();

    assert!(answer.contains("Error executing query: table \"users\" does not exist"));
    assert_eq!(llm.requests()[1].system, MUTATION_CONFIRMATION_PROMPT);
    assert!(db.events().contains(&TxEvent::Rollback));
}

#[tokio::test]
async fn test_unreachable_catalog_still_answers() {
    let db = MockDatabaseClient::new().with_catalog_error("connection reset by peer");
    let llm = MockLlmClient::new();

    let state = pipeline(&db, &llm).run("Count the users").await.unwrap();

    assert_eq!(state.schema().unwrap(), SCHEMA_UNAVAILABLE);
    assert_eq!(state.sql_text().unwrap(), "SELECT COUNT(*) FROM users;");
    assert!(state.final_answer().is_ok());
}

#[tokio::test]
async fn test_begin_failure_folds_into_answer() {
    let db = MockDatabaseClient::demo()
        .with_begin_error("pool timed out while waiting for an open connection");
    let llm = MockLlmClient::new();

    let answer = pipeline(&db, &llm).answer("Show me all users").await.unwrap();

    assert!(answer.contains("pool timed out"));
}

#[tokio::test]
async fn test_concurrent_runs_are_independent() {
    let db = MockDatabaseClient::demo();
    let llm = MockLlmClient::new();
    let pipeline = pipeline(&db, &llm);

    let (users, count) = tokio::join!(
        pipeline.answer("Show me all users"),
        pipeline.answer("Count all orders"),
    );

    assert!(users.unwrap().contains("'Alice'"));
    assert_eq!(count.unwrap(), "Mock answer based on:\n(2)");
}

#[tokio::test]
async fn test_llm_outage_surfaces_as_error() {
    let db = MockDatabaseClient::demo();
    let llm = MockLlmClient::failing("Request to Groq timed out.");

    let err = pipeline(&db, &llm).answer("List all users").await.unwrap_err();

    assert!(matches!(err, AgentError::Llm(_)));
    assert_eq!(err.category(), "LLM Error");
}
