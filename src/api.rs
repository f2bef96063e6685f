//! REST API for the financial analysis agent
//!
//! One question in, one answer out.

use axum::{extract::State, routing::post, Json, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, info_span, Instrument};

use crate::agent::ReasoningAgent;
use crate::error::AgentError;
use crate::models::{AgentResponse, Query};
use crate::tools::ToolRegistry;
use crate::Result;

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub agent: Arc<dyn ReasoningAgent>,
    pub tools: Arc<ToolRegistry>,
    pub persona: Arc<str>,
}

impl ApiState {
    pub fn new(agent: Arc<dyn ReasoningAgent>, tools: ToolRegistry, persona: &str) -> Self {
        Self {
            agent,
            tools: Arc::new(tools),
            persona: Arc::from(persona),
        }
    }
}

/// =============================
/// Health Endpoint
/// =============================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Ask Endpoint
/// =============================

/// Body-shape problems never get here: the `Json` extractor rejects them
/// with a 4xx before the handler runs.
async fn ask_agent(
    State(state): State<ApiState>,
    Json(query): Json<Query>,
) -> Result<Json<AgentResponse>> {
    let request_id = uuid::Uuid::new_v4();
    let span = info_span!("ask", %request_id);

    async move {
        info!(chars = query.messages.len(), "Received question");

        let answer = state
            .agent
            .invoke(&state.persona, &state.tools, &query.messages)
            .await?;

        info!(chars = answer.len(), "Answer ready");
        Ok::<_, AgentError>(Json(AgentResponse { answer }))
    }
    .instrument(span)
    .await
}

/// =============================
/// Router
/// =============================

pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", axum::routing::get(health))
        .route("/ask", post(ask_agent))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(state: ApiState, bind_address: &str) -> Result<()> {
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(bind_address).await?;

    info!("API Server listening on http://{}", bind_address);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("API Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
