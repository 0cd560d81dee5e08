//! Web dashboard.
//!
//! Serves the generated charts and lets a browser trigger a new generation
//! run. Only one run may write the output directories at a time.

mod routes;

use crate::config::Config;
use crate::report::ReportAssembler;
use anyhow::{Context, Result};
use axum::Router;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Application state shared across handlers
pub struct AppState {
    pub config: Config,
    pub assembler: Arc<ReportAssembler>,
    /// Held for the whole duration of a generation run.
    pub run_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(config: Config, assembler: ReportAssembler) -> Self {
        Self {
            config,
            assembler: Arc::new(assembler),
            run_lock: Arc::new(Mutex::new(())),
        }
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let graphs_dir = state.config.paths.graphs_dir.clone();
    let state = Arc::new(state);

    Router::new()
        .merge(routes::dashboard_routes())
        .merge(routes::update_routes())
        .merge(routes::gallery_routes())
        .nest_service("/graficos", ServeDir::new(graphs_dir))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Run the HTTP server
pub async fn run(state: AppState) -> Result<()> {
    let addr = state.config.server.bind.clone();
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Dashboard listening on http://{}", addr);
    println!("🌐 Dashboard: http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
