use crate::config::AppConfig;
use crate::controller::SelectionController;
use crate::page::{render_page, MapSource};
use crate::tooltip::{Tooltip, TooltipContent, Transition};
use anyhow::Result;
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::info;

pub struct AppState {
    pub controller: Mutex<SelectionController>,
    pub static_dir: PathBuf,
}

type ApiError = (StatusCode, String);

impl AppState {
    pub fn new(controller: SelectionController, static_dir: PathBuf) -> Self {
        Self {
            controller: Mutex::new(controller),
            static_dir,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, SelectionController>, ApiError> {
        self.controller.lock().map_err(|_| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Render state poisoned".to_string(),
            )
        })
    }
}

#[derive(Deserialize)]
pub struct MapParams {
    variable: String,
}

#[derive(Deserialize)]
pub struct HoverParams {
    x: f64,
    y: f64,
    page_x: Option<f64>,
    page_y: Option<f64>,
}

/// `content` is null when the pointer is over no feature; the tooltip then
/// carries the fade-out.
#[derive(Serialize)]
pub struct HoverResponse {
    content: Option<TooltipContent>,
    tooltip: Tooltip,
    transition: Transition,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let static_service = ServeDir::new(&state.static_dir);

    Router::new()
        .route("/", get(index_handler))
        .route("/api/map", get(map_handler))
        .route("/api/hover", get(hover_handler))
        .nest_service("/static", static_service)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start_server(config: &AppConfig, controller: SelectionController) -> Result<()> {
    let state = Arc::new(AppState::new(controller, config.output.dir.clone()));

    let addr = SocketAddr::from(([127, 0, 0, 1], config.server.port));
    info!("Starting server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, build_router(state)).await?;
    Ok(())
}

async fn index_handler(State(state): State<Arc<AppState>>) -> Result<Html<String>, ApiError> {
    let controller = state.lock()?;
    let context = controller.context();
    let selected = context.active().unwrap_or_default();
    Ok(Html(render_page(&context.svg(), selected, MapSource::Api)))
}

async fn map_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<MapParams>,
) -> Result<impl IntoResponse, ApiError> {
    let mut controller = state.lock()?;
    controller
        .on_change(&params.variable)
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
    let svg = controller.context().svg();
    Ok(([(header::CONTENT_TYPE, "image/svg+xml")], svg))
}

async fn hover_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HoverParams>,
) -> Result<Json<HoverResponse>, ApiError> {
    let controller = state.lock()?;
    let content = controller.context().hover_at(params.x, params.y);
    let mut tooltip = Tooltip::default();
    let transition = match &content {
        Some(content) => tooltip.hover(
            content,
            params.page_x.unwrap_or(params.x),
            params.page_y.unwrap_or(params.y),
        ),
        None => tooltip.unhover(),
    };
    Ok(Json(HoverResponse {
        content,
        tooltip,
        transition,
    }))
}
