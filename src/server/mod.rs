//! HTTP surface (axum).
//!
//! One route per analysis the original web client offers, plus resume,
//! translate and a health check. Each request runs its own pipeline on the
//! handler's task; a client that disconnects drops that future and with it
//! any poll loop in flight.

pub mod handlers;
pub mod request_id;
pub mod response;
pub mod state;

use std::net::SocketAddr;

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use handlers::{
    analyze_chart_handler, analyze_image_handler, analyze_video_handler,
    analyze_video_json_handler, analyze_youtube_handler, flowchart_to_code_handler,
    health_handler, resume_video_handler, translate_handler,
};
use request_id::request_id_middleware;
pub use state::AppState;

/// Multipart framing on top of the largest accepted upload.
const FORM_OVERHEAD_BYTES: usize = 1024 * 1024;

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    // Files slightly over the configured limit must still reach the
    // ingestor so the caller gets a localized 413. Bodies past this cap are
    // cut off inside the extractors, which the handlers render as JSON.
    let limits = state.analyzer.config().limits;
    let body_limit =
        2 * limits.max_image_bytes.max(limits.max_video_bytes) + FORM_OVERHEAD_BYTES;

    Router::new()
        .route("/health", get(health_handler))
        .route("/api/analyze-image", post(analyze_image_handler))
        .route("/api/analyze-chart", post(analyze_chart_handler))
        .route("/api/flowchart-to-code", post(flowchart_to_code_handler))
        .route("/api/analyze-video", post(analyze_video_handler))
        .route("/api/analyze-video-json", post(analyze_video_json_handler))
        .route("/api/analyze-video/resume", post(resume_video_handler))
        .route("/api/analyze-youtube", post(analyze_youtube_handler))
        .route("/api/translate", post(translate_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(trace_layer)
        .layer(cors)
        .with_state(state)
}

/// Bind `addr` and serve until Ctrl-C.
pub async fn serve(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    let router = create_router(state);
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
