//! HTTP front door.
//!
//! Routes:
//! - `GET /` - liveness message
//! - `GET /health` - health check with crate version
//! - `POST /query` - answer a natural-language question

mod handlers;
pub mod models;

pub use models::{ErrorResponse, QueryRequest, QueryResponse};

use actix_web::{middleware, web, App, HttpServer};
use tracing::info;

use crate::config::ServerConfig;
use crate::error::{AgentError, Result};
use crate::pipeline::Pipeline;

/// Registers the API routes. Expects a `web::Data<Pipeline>` on the app.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(handlers::root))
        .route("/health", web::get().to(handlers::health))
        .route("/query", web::post().to(handlers::query));
}

/// Serves the API until the process is interrupted.
pub async fn run(pipeline: Pipeline, config: &ServerConfig) -> Result<()> {
    let bind_addr = config.bind_address();
    let pipeline = web::Data::new(pipeline);

    info!("Starting HTTP server on {}", bind_addr);

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .app_data(pipeline.clone())
            .configure(configure)
    })
    .bind(&bind_addr)
    .map_err(|e| AgentError::config(format!("Cannot bind to {}: {}", bind_addr, e)))?
    .run()
    .await
    .map_err(|e| AgentError::internal(format!("HTTP server failed: {}", e)))
}
