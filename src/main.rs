//! Process entrypoint: loads configuration, warms up the ASR engine, loads
//! the content pack, and serves the HTTP/WebSocket surface.
//!
//! Exit codes: 0 clean shutdown, 2 invalid configuration, 3 content pack
//! failed to load, 4 ASR engine failed to warm up.

use bg_coach::asr::{SpeechToAsr, WhisperAsr};
use bg_coach::chat::select_provider;
use bg_coach::config::Config;
use bg_coach::content::ContentStore;
use bg_coach::http::{build_router, AppState};
use bg_coach::session::SessionDeps;
use bg_coach::tts::select_backend;
use bg_coach::vad::{VoiceActivityDetection, WebRtcVad};
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    bg_coach::logging::init();

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("invalid configuration: {e}");
            std::process::exit(2);
        }
    };

    info!("bg-coach-server starting on port {}", config.port);

    let content = match ContentStore::load(Path::new(&config.content_dir)) {
        Ok(c) => Arc::new(c),
        Err(e) => {
            error!("failed to load content pack from {}: {e}", config.content_dir);
            std::process::exit(3);
        }
    };

    let asr_engine: Arc<dyn SpeechToAsr> = Arc::new(WhisperAsr::new(&config.whisper_model));
    info!("warming up ASR engine ({})...", config.whisper_model);
    if let Err(e) = asr_engine.warm_up().await {
        error!("ASR warm-up failed: {e}");
        std::process::exit(4);
    }
    info!("ASR engine ready");
    let asr_ready = Arc::new(AtomicBool::new(true));

    let chat = select_provider(
        config.chat_provider,
        config.openai_api_key.as_deref(),
        config.anthropic_api_key.as_deref(),
        Duration::from_secs(config.chat_timeout_secs),
    );
    info!("chat provider: {}", chat.name());

    let tts = select_backend();
    if !tts.is_ready() {
        warn!("tts backend {} is not ready, falling back to silence", tts.name());
    }

    let vad_aggressiveness = config.vad_aggressiveness;
    let vad_factory: Arc<dyn Fn() -> Arc<dyn VoiceActivityDetection> + Send + Sync> =
        Arc::new(move || Arc::new(WebRtcVad::new(vad_aggressiveness)) as Arc<dyn VoiceActivityDetection>);

    let session_deps = Arc::new(SessionDeps {
        vad_factory,
        asr_engine,
        chat,
        content: content.clone(),
        config: config.clone(),
    });

    let state = AppState {
        content,
        tts,
        asr_ready,
        session_deps,
    };

    let app = build_router(state);
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            error!("failed to bind {addr}: {e}");
            std::process::exit(2);
        }
    };
    info!("listening on {addr}");

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let serve = axum::serve(listener, app).with_graceful_shutdown(async {
        let _ = shutdown_rx.await;
    });

    tokio::spawn(async move {
        wait_for_signal().await;
        info!("signal received, draining connections (up to 5s)...");
        let _ = shutdown_tx.send(());
        tokio::time::sleep(Duration::from_secs(5)).await;
        warn!("drain window elapsed, forcing exit");
        std::process::exit(0);
    });

    if let Err(e) = serve.await {
        error!("server error: {e}");
        std::process::exit(1);
    }

    info!("shutdown complete");
}

/// Waits for SIGINT or SIGTERM.
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate()).expect("install SIGTERM handler");
    let ctrl_c = tokio::signal::ctrl_c();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT"),
        _ = sigterm.recv() => info!("received SIGTERM"),
    }
}
