// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use std::env;
use std::sync::Arc;

use anyhow::Result;
use snaptext::{
    api::{start_server, AppState},
    config::PipelineConfig,
    HttpRecognizer, ThresholdBinarizer,
};

#[tokio::main]
async fn main() -> Result<()> {
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    let config = PipelineConfig::from_env();
    config.validate()?;

    tracing::info!(
        port = config.port,
        recognizer = %config.recognizer_url,
        languages = %config.language_hints.join("+"),
        "starting snaptext"
    );

    let state = AppState {
        binarizer: Arc::new(ThresholdBinarizer),
        recognizer: Arc::new(HttpRecognizer::new(config.recognizer_url.clone())),
        config: config.clone(),
    };

    start_server(state, config.port)
        .await
        .map_err(|e| anyhow::anyhow!("server error: {}", e))?;

    tracing::info!("server stopped");
    Ok(())
}
