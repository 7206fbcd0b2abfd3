use std::any::Any;

use axum::http::HeaderValue;
use axum::{
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post},
    Router,
};
use serde::Serialize;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::{error::AppError, state::AppState};

pub mod applications;
pub mod auth;
pub mod health;

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

impl MessageResponse {
    pub fn new(message: &'static str) -> Self {
        Self { message }
    }
}

pub fn create_router(state: AppState) -> Router<()> {
    let cors = if let Some(origins) = state.config.cors_allowed_origin.as_ref() {
        let headers: Vec<HeaderValue> = origins
            .split(',')
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .filter_map(|value| match value.parse::<HeaderValue>() {
                Ok(header) => Some(header),
                Err(_) => {
                    tracing::warn!(origin = value, "ignoring invalid CORS allowed origin");
                    None
                }
            })
            .collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(headers))
            .allow_methods(tower_http::cors::AllowMethods::mirror_request())
            .allow_headers(tower_http::cors::AllowHeaders::mirror_request())
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::mirror_request())
            .allow_methods(tower_http::cors::AllowMethods::mirror_request())
            .allow_headers(tower_http::cors::AllowHeaders::mirror_request())
    };

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/me", get(auth::me))
        .route("/set-telegram", post(auth::set_telegram))
        .route("/agents", get(auth::list_agents))
        .route("/:id", delete(auth::delete_user));

    let applications_routes = Router::new()
        .route("/", post(applications::create_application))
        .route("/my", get(applications::list_my_applications))
        .route("/all", get(applications::list_all_applications))
        .route("/agent/:agent_id", get(applications::list_agent_applications))
        .route("/:id/status", patch(applications::update_status))
        .route("/:id", delete(applications::delete_application));

    let api_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/applications", applications_routes)
        .route("/health", get(health::health_check))
        .fallback(api_not_found);

    // Anything outside /api is the single-page frontend.
    let static_dir = &state.config.static_dir;
    let frontend = ServeDir::new(static_dir).fallback(ServeFile::new(static_dir.join("index.html")));

    Router::new()
        .nest("/api", api_routes)
        .fallback_service(frontend)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(CatchPanicLayer::custom(handle_panic))
}

async fn api_not_found() -> AppError {
    AppError::not_found("Ресурс не найден")
}

fn handle_panic(_panic: Box<dyn Any + Send + 'static>) -> Response {
    AppError::internal("request handler panicked").into_response()
}
