// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Router construction and server startup

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::config::PipelineConfig;
use crate::vision::image_utils::MAX_IMAGE_SIZE;
use crate::vision::{Binarizer, Recognizer};

use super::preprocess::preprocess_handler;
use super::recognize::recognize_handler;

#[derive(Clone)]
pub struct AppState {
    pub binarizer: Arc<dyn Binarizer>,
    pub recognizer: Arc<dyn Recognizer>,
    pub config: PipelineConfig,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/preprocess", post(preprocess_handler))
        .route("/api/recognize", post(recognize_handler))
        // room for base64 inflation and JSON framing over the decoded cap
        .layer(DefaultBodyLimit::max(2 * MAX_IMAGE_SIZE))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

async fn health_handler() -> &'static str {
    "ok"
}

pub async fn start_server(state: AppState, port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("API server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to install shutdown handler: {}", e);
    } else {
        info!("shutdown signal received");
    }
}
