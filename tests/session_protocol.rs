//! Integration tests for the `/ws/asr` session protocol end to end: a real
//! TCP listener, a real axum router, and a real WebSocket client driving the
//! wire protocol. Covers only paths that don't require a warmed-up Whisper
//! model — silence never crosses the VAD's speech threshold, so no decode is
//! ever scheduled.

use bg_coach::asr::WhisperAsr;
use bg_coach::chat::DummyChat;
use bg_coach::config::Config;
use bg_coach::content::ContentStore;
use bg_coach::http::{build_router, AppState};
use bg_coach::session::SessionDeps;
use bg_coach::tts::SilenceTts;
use bg_coach::vad::{VoiceActivityDetection, WebRtcVad};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tokio_tungstenite::tungstenite::Message;

async fn spawn_server() -> (String, tokio::task::JoinHandle<()>) {
    let content = Arc::new(
        ContentStore::load(std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("content").as_path())
            .expect("content pack loads"),
    );
    let config = Config::from_env().expect("default config is valid");
    let session_deps = Arc::new(SessionDeps {
        vad_factory: Arc::new(|| Arc::new(WebRtcVad::new(2)) as Arc<dyn VoiceActivityDetection>),
        asr_engine: Arc::new(WhisperAsr::new(&config.whisper_model)),
        chat: Arc::new(DummyChat::new()),
        content: content.clone(),
        config,
    });
    let state = AppState {
        content,
        tts: Arc::new(SilenceTts::new()),
        asr_ready: Arc::new(AtomicBool::new(true)),
        session_deps,
    };

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("ws://{addr}/ws/asr"), handle)
}

async fn next_json(
    ws: &mut tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >,
) -> Value {
    loop {
        match ws.next().await.expect("stream ended unexpectedly").unwrap() {
            Message::Text(text) => return serde_json::from_str(&text).unwrap(),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("expected a text frame, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn session_sends_ready_on_connect() {
    let (url, _server) = spawn_server().await;
    let (mut ws, _) = tokio_tungstenite::connect_async(&url).await.unwrap();

    let msg = next_json(&mut ws).await;
    assert_eq!(msg["type"], "ready");
}

#[tokio::test]
async fn malformed_binary_frame_closes_with_audio_format_error() {
    let (url, _server) = spawn_server().await;
    let (mut ws, _) = tokio_tungstenite::connect_async(&url).await.unwrap();
    assert_eq!(next_json(&mut ws).await["type"], "ready");

    // 319 samples: not a whole multiple of the fixed 320-sample frame.
    let bad_audio = vec![0u8; 319 * 2];
    ws.send(Message::Binary(bad_audio.into())).await.unwrap();

    let msg = next_json(&mut ws).await;
    assert_eq!(msg["type"], "error");
    assert_eq!(msg["kind"], "audio_format");
    assert_eq!(msg["fatal"], true);
}

#[tokio::test]
async fn silence_produces_no_vad_or_transcript_events() {
    let (url, _server) = spawn_server().await;
    let (mut ws, _) = tokio_tungstenite::connect_async(&url).await.unwrap();
    assert_eq!(next_json(&mut ws).await["type"], "ready");

    let silent_frame = vec![0u8; 320 * 2];
    for _ in 0..20 {
        ws.send(Message::Binary(silent_frame.clone().into())).await.unwrap();
    }

    // No speech was ever detected, so the session should stay quiet; a
    // subsequent ping/pong round trip proves the connection is still alive.
    ws.send(Message::Text(json!({"type": "ping"}).to_string().into()))
        .await
        .unwrap();
    let msg = next_json(&mut ws).await;
    assert_eq!(msg["type"], "pong");
}

#[tokio::test]
async fn malformed_json_control_message_is_a_non_fatal_protocol_error() {
    let (url, _server) = spawn_server().await;
    let (mut ws, _) = tokio_tungstenite::connect_async(&url).await.unwrap();
    assert_eq!(next_json(&mut ws).await["type"], "ready");

    ws.send(Message::Text("not json".to_string().into())).await.unwrap();

    let msg = next_json(&mut ws).await;
    assert_eq!(msg["type"], "error");
    assert_eq!(msg["kind"], "protocol");
    assert_eq!(msg["fatal"], false);

    // The session should still be alive after a non-fatal protocol error.
    ws.send(Message::Text(json!({"type": "ping"}).to_string().into()))
        .await
        .unwrap();
    let msg = next_json(&mut ws).await;
    assert_eq!(msg["type"], "pong");
}
