//! HTTP API integration tests over the mock database and mock LLM.

use std::sync::Arc;

use actix_web::{test, web, App};
use nl2sql_agent::db::MockDatabaseClient;
use nl2sql_agent::llm::MockLlmClient;
use nl2sql_agent::pipeline::Pipeline;
use nl2sql_agent::server::{configure, ErrorResponse, QueryRequest, QueryResponse};

fn app_data(llm: MockLlmClient) -> web::Data<Pipeline> {
    web::Data::new(Pipeline::new(
        Arc::new(MockDatabaseClient::demo()),
        Arc::new(llm),
    ))
}

#[actix_web::test]
async fn test_post_query_round_trip() {
    let llm = MockLlmClient::new();
    let app = test::init_service(
        App::new()
            .app_data(app_data(llm.clone()))
            .configure(configure),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/query")
        .set_json(QueryRequest {
            query: "Count all orders".to_string(),
        })
        .to_request();
    let body: QueryResponse = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body.result, "Mock answer based on:\n(2)");
    assert_eq!(llm.requests().len(), 2);
}

#[actix_web::test]
async fn test_post_query_llm_failure_returns_detail() {
    let app = test::init_service(
        App::new()
            .app_data(app_data(MockLlmClient::new().failing_after(1)))
            .configure(configure),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/query")
        .set_json(QueryRequest {
            query: "List all users".to_string(),
        })
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 500);
    let body: ErrorResponse = test::read_body_json(resp).await;
    assert!(body.detail.starts_with("LLM error:"));
}

#[actix_web::test]
async fn test_get_query_not_allowed() {
    let app = test::init_service(
        App::new()
            .app_data(app_data(MockLlmClient::new()))
            .configure(configure),
    )
    .await;

    let req = test::TestRequest::get().uri("/query").to_request();
    let resp = test::call_service(&app, req).await;

    assert!(resp.status().is_client_error());
}
