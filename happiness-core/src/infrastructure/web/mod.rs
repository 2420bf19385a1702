// happiness-core/src/infrastructure/web/mod.rs
//
// Local dashboard server over an immutable gold frame.

pub mod handlers;

use axum::Router;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::domain::error::DomainError;
use crate::domain::frame::Frame;
use crate::domain::project::{DashboardConfig, EdaConfig};
use crate::error::HappinessError;
use crate::infrastructure::error::InfrastructureError;
use crate::infrastructure::templates::PageRenderer;

/// Shared by every handler; nothing in it is ever mutated.
#[derive(Clone)]
pub struct AppState {
    pub gold: Arc<Frame>,
    pub renderer: Arc<PageRenderer>,
    pub eda: EdaConfig,
}

impl AppState {
    pub fn new(gold: Frame, eda: EdaConfig) -> Result<Self, InfrastructureError> {
        Ok(Self {
            gold: Arc::new(gold),
            renderer: Arc::new(PageRenderer::new()?),
            eda,
        })
    }
}

/// Handler error: bad column names are the caller's fault, the rest is ours.
pub struct WebError(HappinessError);

impl<E: Into<HappinessError>> From<E> for WebError {
    fn from(err: E) -> Self {
        WebError(err.into())
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            HappinessError::Domain(
                DomainError::UnknownColumn { .. } | DomainError::MissingColumn { .. },
            ) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.0.to_string()).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::home))
        .route("/dataset", get(handlers::dataset))
        .route("/distribution", get(handlers::distribution))
        .route("/relationship", get(handlers::relationship))
        .route("/geo", get(handlers::geo))
        .route("/trends", get(handlers::trends))
        .route("/averages", get(handlers::averages))
        .route("/api/health", get(handlers::health))
        .route("/api/gold", get(handlers::gold))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Bind `host:port` and serve until the process is stopped.
pub async fn serve(state: AppState, config: &DashboardConfig) -> Result<(), HappinessError> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(rows = state.gold.height(), "Dashboard listening on http://{}", addr);
    println!("🌍 Dashboard running at http://{}", addr);

    axum::serve(listener, router(state)).await?;
    Ok(())
}
