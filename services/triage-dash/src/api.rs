// services/triage-dash/src/api.rs
//
// Optional local observability endpoint: health, prometheus metrics and
// the current store snapshot

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use svckit::metrics;

use crate::export;
use crate::store::StateStore;

pub fn router(store: Arc<StateStore>) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route("/metrics", get(handle_metrics))
        .route("/snapshot", get(handle_snapshot))
        .layer(TraceLayer::new_for_http())
        .with_state(store)
}

pub async fn start_server(store: Arc<StateStore>, port: u16) -> anyhow::Result<()> {
    let addr = format!("127.0.0.1:{}", port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Observability endpoint listening on {}", addr);

    serve(listener, store).await
}

pub async fn serve(listener: TcpListener, store: Arc<StateStore>) -> anyhow::Result<()> {
    axum::serve(listener, router(store)).await?;
    Ok(())
}

async fn handle_health(State(store): State<Arc<StateStore>>) -> impl IntoResponse {
    let snapshot = store.snapshot().await;
    Json(json!({
        "status": "healthy",
        "service": "triage-dash",
        "backend": store.gateway().name(),
        "refresh_cycles": store.cycles(),
        "last_refreshed": snapshot.last_refreshed.map(|t| t.to_rfc3339()),
        "timestamp": chrono::Utc::now(),
    }))
}

async fn handle_metrics() -> impl IntoResponse {
    match metrics::render() {
        Ok(text) => (StatusCode::OK, text).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

async fn handle_snapshot(State(store): State<Arc<StateStore>>) -> impl IntoResponse {
    let snapshot = store.snapshot().await;
    Json(export::document(&snapshot, chrono::Utc::now()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::DemoGateway;
    use serde_json::Value;

    async fn spawn(store: Arc<StateStore>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(serve(listener, store));
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_endpoints_report_store_state() {
        let store = Arc::new(StateStore::new(Arc::new(DemoGateway::seeded())));
        store.refresh().await;
        let base = spawn(store).await;
        let client = reqwest::Client::new();

        let health: Value = client
            .get(format!("{}/health", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(health["status"], "healthy");
        assert_eq!(health["backend"], "demo");
        assert_eq!(health["refresh_cycles"], 1);

        let snapshot: Value = client
            .get(format!("{}/snapshot", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(snapshot["patients"].as_array().unwrap().len(), 3);
        assert_eq!(snapshot["resources"].as_array().unwrap().len(), 6);
        assert_eq!(snapshot["stats"]["total"], 3);

        let metrics = client
            .get(format!("{}/metrics", base))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert!(metrics.contains("triage_refresh_cycles_total"));
    }
}
