//! Assessment server: queue worker, notification listener and the viewer
//! WebSocket endpoint in one process.

use std::sync::Arc;

use anyhow::Context;
use axum::{extract::State, routing::get, Json, Router};
use serde_json::json;
use tracing::{info, warn};

use assessment_core::{logging, notifier, ConfigManager, SystemContext};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_tracing();

    let config_manager = ConfigManager::load().context("loading configuration")?;
    let bind_address = config_manager.config().server.bind_address.clone();
    let notifier_enabled = config_manager.config().notifier.enabled;

    let context = Arc::new(
        SystemContext::from_config(config_manager)
            .await
            .context("building system context")?,
    );

    let worker = context.diagnosis_worker();
    let worker_handle = worker.start();
    let listener_handle = context.start_notification_listener();
    let relay_handle = context.start_status_relay();

    let mut app = Router::new()
        .route("/health", get(health))
        .with_state(Arc::clone(&context));
    if notifier_enabled {
        app = app.merge(notifier::router(Arc::clone(&context.subscriptions)));
    }

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("binding {bind_address}"))?;
    info!(address = %bind_address, "🚀 Assessment server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP")?;

    info!("🛑 Shutting down");
    worker.stop();
    if let Some(handle) = worker_handle {
        if let Err(e) = handle.await {
            warn!(error = %e, "Diagnosis worker ended abnormally");
        }
    }
    for handle in [listener_handle, relay_handle].into_iter().flatten() {
        handle.abort();
    }
    Ok(())
}

async fn health(State(context): State<Arc<SystemContext>>) -> Json<serde_json::Value> {
    let messaging_healthy = context.messaging.health_check().await.unwrap_or(false);
    let breaker = context.gateway.breaker().metrics();

    Json(json!({
        "status": "ok",
        "system_id": context.system_id,
        "scoring_breaker": {
            "state": breaker.current_state,
            "summary": breaker.format_summary(),
        },
        "messaging": {
            "provider": context.messaging.provider_name(),
            "healthy": messaging_healthy,
        },
        "dispatcher": context.dispatcher.stats(),
        "ledger_enabled": context.ledger.is_some(),
        "status_relay": context.status_store.relay().map(|relay| relay.relay_name()),
    }))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Could not listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}
