//! Statement execution integration tests against PostgreSQL.
//!
//! Each execution runs on its own pooled connection, so these tests use
//! regular tables named after the test and process, dropped at the end.

use nl2sql_agent::config::{ConnectionConfig, DatabaseConfig};
use nl2sql_agent::db::{DatabaseClient, PostgresClient};
use nl2sql_agent::query::{ExecutionResult, QueryExecutor};

/// Helper to create a test client.
async fn get_test_client(statement_timeout_secs: u64) -> Option<PostgresClient> {
    connect(DatabaseConfig {
        statement_timeout_secs,
        ..Default::default()
    })
    .await
}

async fn connect(config: DatabaseConfig) -> Option<PostgresClient> {
    let url = std::env::var("DATABASE_URL").ok()?;
    let connection = ConnectionConfig::from_connection_string(&url).ok()?;
    PostgresClient::connect(&connection, &config).await.ok()
}

fn table_name(test: &str) -> String {
    format!("nl2sql_it_{}_{}", test, std::process::id())
}

#[tokio::test]
async fn test_select_renders_rows() {
    let Some(client) = get_test_client(30).await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let result = QueryExecutor::new(&client)
        .execute("SELECT 1 AS num, 'hello' AS greeting, NULL::text AS missing")
        .await;

    assert_eq!(
        result,
        ExecutionResult::Rows {
            rows: vec!["(1, 'hello', NULL)".to_string()]
        }
    );

    client.close().await.unwrap();
}

#[tokio::test]
async fn test_empty_select_is_rows_not_acknowledged() {
    let Some(client) = get_test_client(30).await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let result = QueryExecutor::new(&client)
        .execute("SELECT 1 WHERE false")
        .await;

    assert_eq!(result, ExecutionResult::Rows { rows: vec![] });

    client.close().await.unwrap();
}

#[tokio::test]
async fn test_mutations_commit_and_failures_roll_back() {
    let Some(client) = get_test_client(30).await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };
    let table = table_name("mutations");
    let executor = QueryExecutor::new(&client);

    let created = executor
        .execute(&format!(
            "CREATE TABLE {table} (id integer PRIMARY KEY, name text NOT NULL)"
        ))
        .await;
    assert_eq!(created, ExecutionResult::Acknowledged);

    let inserted = executor
        .execute(&format!(
            "INSERT INTO {table} (id, name) VALUES (1, 'Alice'), (2, 'Bob')"
        ))
        .await;
    assert_eq!(inserted, ExecutionResult::Acknowledged);

    // Duplicate key: the whole statement rolls back, including row 3.
    let duplicate = executor
        .execute(&format!(
            "INSERT INTO {table} (id, name) VALUES (3, 'Carol'), (1, 'Again')"
        ))
        .await;
    assert!(duplicate.is_failure());
    assert!(duplicate.render().starts_with("Error executing query:"));
    assert!(duplicate.render().contains("duplicate key"));

    let returning = executor
        .execute(&format!(
            "INSERT INTO {table} (id, name) VALUES (4, 'Dave') RETURNING id"
        ))
        .await;
    assert_eq!(
        returning,
        ExecutionResult::Rows {
            rows: vec!["(4)".to_string()]
        }
    );

    let rows = executor
        .execute(&format!("SELECT id, name FROM {table} ORDER BY id DESC"))
        .await;
    assert_eq!(
        rows,
        ExecutionResult::Rows {
            rows: vec![
                "(4, 'Dave')".to_string(),
                "(2, 'Bob')".to_string(),
                "(1, 'Alice')".to_string(),
            ]
        }
    );

    let dropped = executor.execute(&format!("DROP TABLE {table}")).await;
    assert_eq!(dropped, ExecutionResult::Acknowledged);

    client.close().await.unwrap();
}

#[tokio::test]
async fn test_malformed_statement_fails() {
    let Some(client) = get_test_client(30).await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let result = QueryExecutor::new(&client)
        .execute("SELEC * FRM nowhere")
        .await;

    assert!(result.is_failure());
    assert!(result.render().contains("syntax error"));

    client.close().await.unwrap();
}

#[tokio::test]
async fn test_statement_timeout_fails_and_releases_connection() {
    let Some(client) = get_test_client(1).await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };
    let executor = QueryExecutor::new(&client);

    let result = executor.execute("SELECT pg_sleep(5)").await;

    assert!(result.is_failure());
    assert!(result.render().contains("statement timeout"));

    // The connection went back to the pool in a usable state.
    let next = executor.execute("SELECT 2").await;
    assert_eq!(
        next,
        ExecutionResult::Rows {
            rows: vec!["(2)".to_string()]
        }
    );

    client.close().await.unwrap();
}

#[tokio::test]
async fn test_same_select_after_alter_sees_new_columns() {
    // One connection, so every statement reuses the same session.
    let Some(client) = connect(DatabaseConfig {
        max_connections: 1,
        ..Default::default()
    })
    .await
    else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };
    let table = table_name("alter");
    let executor = QueryExecutor::new(&client);
    let select = format!("SELECT * FROM {table}");

    executor
        .execute(&format!("CREATE TABLE {table} (a integer)"))
        .await;
    executor
        .execute(&format!("INSERT INTO {table} VALUES (1)"))
        .await;

    let before = executor.execute(&select).await;
    assert_eq!(
        before,
        ExecutionResult::Rows {
            rows: vec!["(1)".to_string()]
        }
    );

    let altered = executor
        .execute(&format!(
            "ALTER TABLE {table} ADD COLUMN b text DEFAULT 'x'"
        ))
        .await;
    assert_eq!(altered, ExecutionResult::Acknowledged);

    let after = executor.execute(&select).await;
    assert_eq!(
        after,
        ExecutionResult::Rows {
            rows: vec!["(1, 'x')".to_string()]
        }
    );

    executor.execute(&format!("DROP TABLE {table}")).await;
    client.close().await.unwrap();
}

#[tokio::test]
async fn test_uncommon_types_are_not_rendered_as_null() {
    let Some(client) = get_test_client(30).await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let result = QueryExecutor::new(&client)
        .execute(
            "SELECT ARRAY[1, 2], interval '1 day', '10.0.0.1'::inet, \
             ARRAY['a', NULL]::text[], NULL::text",
        )
        .await;

    assert_eq!(
        result,
        ExecutionResult::Rows {
            rows: vec!["([1, 2], '1 day', '<INET>', ['a', NULL], NULL)".to_string()]
        }
    );

    client.close().await.unwrap();
}
