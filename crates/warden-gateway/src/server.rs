use crate::middleware::request_log_middleware;
use crate::router;
use axum::{
    middleware as axum_mw,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use warden_channels::{MemoryNotifier, Notifier};
use warden_core::{WardenError, WardenResult};
use warden_orchestrator::Orchestrator;

/// Shared application state.
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    /// Where manual alerts are sent.
    pub notifier: Arc<dyn Notifier>,
    /// Activity feed served by `GET /notifications`.
    pub feed: Arc<MemoryNotifier>,
}

/// The REST gateway.
pub struct GatewayServer;

impl GatewayServer {
    /// Build the router over an existing engine.
    pub fn build(
        orchestrator: Arc<Orchestrator>,
        notifier: Arc<dyn Notifier>,
        feed: Arc<MemoryNotifier>,
    ) -> Router {
        let state = Arc::new(AppState {
            orchestrator,
            notifier,
            feed,
        });

        Router::new()
            .route("/health", get(router::health))
            .route("/agents", get(router::list_agents).post(router::create_agent))
            .route("/agents/{id}", get(router::get_agent))
            .route("/agents/{id}/reset", post(router::reset_agent))
            .route("/agents/{id}/cancel", post(router::cancel_agent))
            .route("/tasks", get(router::list_tasks).post(router::create_task))
            .route("/tasks/{id}", get(router::get_task))
            .route("/tasks/{id}/assign", post(router::assign_task))
            .route(
                "/playbooks",
                get(router::list_playbooks).post(router::create_playbook),
            )
            .route("/playbooks/{id}", get(router::get_playbook))
            .route("/playbooks/{id}/assign", post(router::assign_playbook))
            .route("/stats", get(router::stats))
            .route(
                "/notifications",
                get(router::list_notifications).post(router::send_notification),
            )
            .layer(axum_mw::from_fn(request_log_middleware))
            .with_state(state)
    }

    /// Bind `addr` (`host:port`) and serve `app` until Ctrl-C.
    pub async fn serve(addr: &str, app: Router) -> WardenResult<()> {
        let listener = TcpListener::bind(addr).await?;
        info!(addr = %listener.local_addr()?, "Gateway listening");
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| WardenError::Http(format!("server error: {e}")))
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}
