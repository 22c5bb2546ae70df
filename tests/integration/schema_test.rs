//! Schema introspection integration tests.

use nl2sql_agent::config::{ConnectionConfig, DatabaseConfig};
use nl2sql_agent::db::{
    introspect_schema, CatalogEntry, DatabaseClient, MockDatabaseClient, PostgresClient,
    SchemaDescription, SCHEMA_UNAVAILABLE,
};
use nl2sql_agent::query::{ExecutionResult, QueryExecutor};
use pretty_assertions::assert_eq;

async fn get_test_client() -> Option<PostgresClient> {
    let url = std::env::var("DATABASE_URL").ok()?;
    let connection = ConnectionConfig::from_connection_string(&url).ok()?;
    PostgresClient::connect(&connection, &DatabaseConfig::default())
        .await
        .ok()
}

#[tokio::test]
async fn test_mock_catalog_renders_grouped_tables() {
    let db = MockDatabaseClient::demo();

    let schema = introspect_schema(&db).await;

    assert_eq!(
        schema,
        "Table: orders\n  - id: integer\n  - user_id: integer\n  - total: numeric\n\
         \n\
         Table: users\n  - id: integer\n  - email: character varying\n  - name: character varying\n"
    );
}

#[tokio::test]
async fn test_catalog_failure_yields_sentinel() {
    let db = MockDatabaseClient::new().with_catalog_error("permission denied for schema public");

    assert_eq!(introspect_schema(&db).await, SCHEMA_UNAVAILABLE);
}

#[test]
fn test_rendering_is_reproducible() {
    let catalog = vec![
        CatalogEntry::new("a", "x", "integer"),
        CatalogEntry::new("b", "y", "text"),
    ];

    let first = SchemaDescription::from_catalog(catalog.clone()).render();
    let second = SchemaDescription::from_catalog(catalog).render();

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_postgres_schema_lists_new_table() {
    let Some(client) = get_test_client().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };
    let table = format!("nl2sql_it_schema_{}", std::process::id());
    let executor = QueryExecutor::new(&client);

    let created = executor
        .execute(&format!(
            "CREATE TABLE {table} (id integer, label text, created_at timestamptz)"
        ))
        .await;
    assert_eq!(created, ExecutionResult::Acknowledged);

    let schema = introspect_schema(&client).await;
    let expected = format!(
        "Table: {table}\n  - id: integer\n  - label: text\n  - created_at: timestamp with time zone\n"
    );
    assert!(
        schema.contains(&expected),
        "schema did not contain {expected:?}:\n{schema}"
    );

    executor.execute(&format!("DROP TABLE {table}")).await;
    client.close().await.unwrap();
}
