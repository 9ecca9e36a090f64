use std::sync::Arc;

use axum::{
    extract::{ Path, State },
    http::StatusCode,
    response::IntoResponse,
    routing::{ get, post },
    Json,
    Router,
};
use log::error;
use serde::{ Deserialize, Serialize };
use tower_http::cors::{ Any, CorsLayer };

use crate::agent::ChatAgent;
use crate::error::{ AgentError, HistoryError, LlmError };
use crate::models::chat::PromptMessage;

#[derive(Clone)]
struct AppState {
    agent: Arc<ChatAgent>,
    default_conversation: String,
}

#[derive(Deserialize)]
struct ChatRequest {
    conversation_id: Option<String>,
    message: String,
}

#[derive(Serialize)]
struct ChatResponse {
    conversation_id: String,
    reply: String,
    persisted: bool,
}

#[derive(Serialize)]
struct HistoryResponse {
    conversation_id: String,
    messages: Vec<PromptMessage>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

pub fn router(agent: Arc<ChatAgent>, default_conversation: String) -> Router {
    let state = AppState {
        agent,
        default_conversation,
    };

    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/api/health", get(health_handler))
        .route("/api/chat", post(chat_handler))
        .route("/api/history/{conversation_id}", get(history_handler).delete(clear_handler))
        .layer(cors)
        .with_state(state)
}

/// Non-fatal errors become dismissible notices with a matching status; the
/// conversation stays usable.
fn status_for(err: &AgentError) -> StatusCode {
    match err {
        AgentError::EmptyInput => StatusCode::UNPROCESSABLE_ENTITY,
        AgentError::History(HistoryError::InvalidRecord(_)) => StatusCode::UNPROCESSABLE_ENTITY,
        AgentError::History(HistoryError::BackendUnavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
        AgentError::Llm(LlmError::ModelUnavailable(_)) => StatusCode::BAD_GATEWAY,
        AgentError::Llm(LlmError::EmbeddingUnavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
        AgentError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_body(err: AgentError) -> (StatusCode, Json<ErrorResponse>) {
    let status = status_for(&err);
    if status.is_server_error() {
        error!("Request failed: {}", err);
    }
    (status, Json(ErrorResponse { error: err.to_string() }))
}

async fn health_handler() -> StatusCode {
    StatusCode::OK
}

async fn chat_handler(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>
) -> impl IntoResponse {
    let conversation_id = request.conversation_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or(state.default_conversation);

    match state.agent.process_turn(&conversation_id, &request.message).await {
        Ok(outcome) =>
            Json(ChatResponse {
                conversation_id,
                reply: outcome.reply,
                persisted: outcome.persisted,
            }).into_response(),
        Err(err) => error_body(err).into_response(),
    }
}

async fn history_handler(
    State(state): State<AppState>,
    Path(conversation_id): Path<String>
) -> impl IntoResponse {
    match state.agent.history(&conversation_id).await {
        Ok(conversation) =>
            Json(HistoryResponse {
                conversation_id: conversation.id,
                messages: conversation.messages.iter().map(PromptMessage::from).collect(),
            }).into_response(),
        Err(err) => error_body(err.into()).into_response(),
    }
}

async fn clear_handler(
    State(state): State<AppState>,
    Path(conversation_id): Path<String>
) -> impl IntoResponse {
    match state.agent.clear_conversation(&conversation_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_body(err.into()).into_response(),
    }
}
