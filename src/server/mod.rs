pub mod handlers;
pub mod middleware;
pub mod types;

use crate::{
    Result,
    config::{Config, ModelConfig},
    readiness::ModelGate,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use std::{future::IntoFuture, net::SocketAddr, sync::Arc};
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};
use tracing::info;

pub fn router(gate: Arc<ModelGate>, max_body_bytes: usize) -> Router {
    let app_state = handlers::AppState { gate };

    Router::new()
        .route("/health", get(handlers::health))
        .route("/remove-bg", post(handlers::remove_background))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(axum::middleware::from_fn_with_state(
            max_body_bytes,
            middleware::reject_oversized,
        ))
        .layer(CatchPanicLayer::custom(middleware::handle_panic))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

pub async fn run(config: Config) -> Result<()> {
    let gate = Arc::new(ModelGate::new(config.model.name.clone()));
    let app = router(gate.clone(), config.server.max_body_bytes);

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let server = axum::serve(listener, app).into_future();
    tokio::pin!(server);

    // Health checks answer "loading" while the model is read from disk.
    tokio::select! {
        served = &mut server => return Ok(served?),
        loaded = load_model(gate, config.model) => loaded?,
    }

    server.await?;
    Ok(())
}

#[cfg(feature = "onnx")]
async fn load_model(gate: Arc<ModelGate>, model: ModelConfig) -> Result<()> {
    use crate::{Error, segmenter::OnnxSegmenter};

    let segmenter = tokio::task::spawn_blocking(move || OnnxSegmenter::load(&model))
        .await
        .map_err(|e| Error::internal(format!("Model loader task failed: {}", e)))??;

    gate.install(Arc::new(segmenter))?;
    info!("Model {} ready", gate.model());
    Ok(())
}

#[cfg(not(feature = "onnx"))]
async fn load_model(_gate: Arc<ModelGate>, _model: ModelConfig) -> Result<()> {
    Err(crate::Error::config(
        "no segmenter backend compiled in; rebuild with the `onnx` feature",
    ))
}
