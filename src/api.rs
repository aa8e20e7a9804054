// src/api.rs
use std::sync::Arc;

use axum::{
    extract::{ws::WebSocketUpgrade, Path, Query, State},
    response::IntoResponse,
    routing::{delete, get, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};

use crate::assistant::AssistantEngine;
use crate::occupancy::{OccupancyReading, OccupancyService};
use crate::quant::{QuantEngine, SurfaceFigure};
use crate::store::{ConversationStore, Role, SessionInfo, StoredMessage};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ConversationStore>,
    pub assistant: Arc<AssistantEngine>,
    pub quant: Arc<QuantEngine>,
    pub occupancy: Arc<OccupancyService>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/query", post(handle_query))
        .route("/api/chats", get(list_chats))
        .route("/api/chats/{id}/messages", get(chat_messages))
        .route("/api/chats/{id}", delete(delete_chat))
        .route("/api/favorites", get(list_favorites).post(add_favorite))
        .route("/api/favorites/{ticker}", delete(remove_favorite))
        .route("/api/quant/surface", get(quant_surface))
        .route("/api/occupancy", get(occupancy_index))
        .route("/api/ws/live-chat", get(ws_live_chat))
        .route_service("/", ServeFile::new("static/index.html"))
        .nest_service("/static", ServeDir::new("static"))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Deserialize)]
struct QueryRequest {
    query_text: String,
    session_id: String,
}

#[derive(Serialize)]
struct QueryResponse {
    answer_text: String,
    ticker: Option<String>,
    status: &'static str,
}

/// Chat query: persist the user message, run the pipeline, persist the
/// assistant message. Both appends happen even when generation fell back to
/// the error answer.
async fn handle_query(
    State(state): State<AppState>,
    Form(req): Form<QueryRequest>,
) -> Json<QueryResponse> {
    state
        .store
        .add_message(&req.session_id, Role::User, &req.query_text);

    let answer = state.assistant.answer(&req.query_text).await;

    state
        .store
        .add_message(&req.session_id, Role::Assistant, &answer.text);

    Json(QueryResponse {
        answer_text: answer.text,
        ticker: answer.ticker,
        status: "success",
    })
}

async fn list_chats(State(state): State<AppState>) -> Json<Vec<SessionInfo>> {
    Json(state.store.sessions())
}

async fn chat_messages(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<Vec<StoredMessage>> {
    Json(state.store.history(&id))
}

async fn delete_chat(State(state): State<AppState>, Path(id): Path<String>) -> Json<serde_json::Value> {
    state.store.delete_session(&id);
    Json(json!({ "status": "deleted" }))
}

#[derive(Deserialize)]
struct FavoriteItem {
    ticker: String,
}

async fn list_favorites(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.store.favorites())
}

async fn add_favorite(
    State(state): State<AppState>,
    Json(item): Json<FavoriteItem>,
) -> Json<serde_json::Value> {
    state.store.add_favorite(&item.ticker);
    Json(json!({ "status": "added" }))
}

async fn remove_favorite(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
) -> Json<serde_json::Value> {
    state.store.remove_favorite(&ticker);
    Json(json!({ "status": "deleted" }))
}

#[derive(Deserialize)]
struct SurfaceParams {
    #[serde(default = "default_surface_ticker")]
    ticker: String,
}

fn default_surface_ticker() -> String {
    "BTC-USD".to_string()
}

async fn quant_surface(
    State(state): State<AppState>,
    Query(params): Query<SurfaceParams>,
) -> Json<SurfaceFigure> {
    Json(state.quant.volatility_surface(&params.ticker).await)
}

async fn occupancy_index(State(state): State<AppState>) -> Json<Vec<OccupancyReading>> {
    Json(state.occupancy.index().await)
}

/// Placeholder live-chat socket: accept the connection and drain frames
/// until the peer goes away. Streaming responses come later.
async fn ws_live_chat(ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(|mut socket| async move {
        while let Some(Ok(_frame)) = socket.recv().await {}
    })
}
