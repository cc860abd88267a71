pub mod request_id;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::future::Future;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::controllers::{
    health::{self, HealthState},
    saved_audio::SavedAudioController,
    tts::TtsController,
};
use crate::infrastructure::config::Config;
pub use request_id::{request_id_middleware, RequestId, X_REQUEST_ID};

/// Build the application router with all routes and layers
pub fn build_router(
    health_state: Arc<HealthState>,
    tts_controller: Arc<TtsController>,
    saved_audio_controller: Arc<SavedAudioController>,
) -> Router {
    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::health_ready))
        .with_state(health_state);

    let tts_routes = Router::new()
        .route(
            "/api/tts",
            get(TtsController::list_jobs).post(TtsController::create_job),
        )
        .route(
            "/api/tts/:id",
            get(TtsController::get_job).delete(TtsController::delete_job),
        )
        .route("/api/tts/:id/status", get(TtsController::get_status))
        .route("/api/tts/:id/audio", get(TtsController::get_audio))
        .route("/api/tts/:id/cancel", post(TtsController::cancel_job))
        .with_state(tts_controller);

    let saved_audio_routes = Router::new()
        .route(
            "/api/saved-audios",
            get(SavedAudioController::list_saved_audios)
                .post(SavedAudioController::create_saved_audio),
        )
        .route(
            "/api/saved-audios/:id",
            axum::routing::delete(SavedAudioController::delete_saved_audio),
        )
        .route(
            "/api/saved-audios/:id/audio",
            get(SavedAudioController::get_saved_audio_file),
        )
        .with_state(saved_audio_controller);

    Router::new()
        .merge(health_routes)
        .merge(tts_routes)
        .merge(saved_audio_routes)
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Serve `app` until `shutdown` resolves
pub async fn start_http_server<F>(
    config: Arc<Config>,
    app: Router,
    shutdown: F,
) -> Result<(), Box<dyn std::error::Error>>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener =
        tokio::net::TcpListener::bind(format!("{}:{}", config.host, config.port)).await?;

    tracing::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    tracing::info!("HTTP server stopped");
    Ok(())
}
