//! HTTP handlers.

use actix_web::{web, HttpResponse};
use serde_json::json;
use tracing::{debug, error};

use super::models::{ErrorResponse, QueryRequest, QueryResponse};
use crate::pipeline::Pipeline;

/// Handler for `POST /query`.
///
/// Runs one pipeline for the question. A blank question is rejected with
/// 400; an LLM failure is reported as 500 with the error text as detail.
pub async fn query(req: web::Json<QueryRequest>, pipeline: web::Data<Pipeline>) -> HttpResponse {
    let question = req.query.trim();

    if question.is_empty() {
        debug!("Rejected empty query");
        return HttpResponse::BadRequest().json(ErrorResponse::new("Query must not be empty."));
    }

    match pipeline.answer(question).await {
        Ok(result) => HttpResponse::Ok().json(QueryResponse { result }),
        Err(e) => {
            error!("Pipeline failed: {}", e);
            HttpResponse::InternalServerError().json(ErrorResponse::new(e.to_string()))
        }
    }
}

/// Handler for `GET /`.
pub async fn root() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "message": "API is running. Post your query to /query."
    }))
}

/// Handler for `GET /health`.
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{CatalogEntry, MockDatabaseClient, MockOutcome, Value};
    use crate::llm::MockLlmClient;
    use crate::server::configure;
    use actix_web::{test, App};
    use std::sync::Arc;

    fn pipeline(llm: MockLlmClient) -> Pipeline {
        let db = MockDatabaseClient::new()
            .with_catalog(vec![CatalogEntry::new("users", "name", "text")])
            .with_statement(
                "from users",
                MockOutcome::Rows(vec![vec![Value::from("Alice")]]),
            );
        Pipeline::new(Arc::new(db), Arc::new(llm))
    }

    #[actix_web::test]
    async fn test_query_returns_answer() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(pipeline(MockLlmClient::new())))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/query")
            .set_json(QueryRequest {
                query: "Show me all users".to_string(),
            })
            .to_request();

        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);

        let body: QueryResponse = test::read_body_json(resp).await;
        assert_eq!(body.result, "Mock answer based on:\n('Alice')");
    }

    #[actix_web::test]
    async fn test_blank_query_is_bad_request() {
        let llm = MockLlmClient::new();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(pipeline(llm.clone())))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/query")
            .set_json(QueryRequest {
                query: "   ".to_string(),
            })
            .to_request();

        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
        assert!(llm.requests().is_empty());
    }

    #[actix_web::test]
    async fn test_missing_query_field_is_rejected() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(pipeline(MockLlmClient::new())))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/query")
            .set_json(json!({ "question": "List all users" }))
            .to_request();

        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_client_error());
    }

    #[actix_web::test]
    async fn test_llm_failure_is_internal_server_error() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(pipeline(MockLlmClient::failing(
                    "Failed to connect to Groq API. Check your network.",
                ))))
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
        assert!(body.detail.contains("Failed to connect to Groq API"));
    }

    #[actix_web::test]
    async fn test_root_and_health() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(pipeline(MockLlmClient::new())))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::get().uri("/").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["message"], "API is running. Post your query to /query.");

        let req = test::TestRequest::get().uri("/health").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }
}
