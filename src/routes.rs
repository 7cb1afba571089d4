use std::time::Duration;

use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    middleware,
    response::IntoResponse,
    routing::{get, patch, post},
    Json, Router,
};
use serde_json::json;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::handlers::{protected, public};
use crate::middleware::cookie_auth_middleware;
use crate::state::AppState;

/// Full application router with global middleware applied.
pub fn app(state: AppState) -> Router {
    let server = &state.config.server;
    let timeout = Duration::from_secs(server.request_timeout_secs);
    let body_limit = server.max_request_size_bytes;
    let cors = cors_layer(&state.config.security.cors_origins);

    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        // Token issuance
        .merge(session_routes())
        // Jobs and applications (no identity check)
        .merge(job_routes())
        .merge(application_routes())
        // Cookie-authenticated
        .merge(protected_routes(state.clone()))
        // Global middleware
        .layer(TimeoutLayer::new(timeout))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn session_routes() -> Router<AppState> {
    use public::session;

    Router::new()
        .route("/jwt", post(session::issue))
        .route("/logout", post(session::logout))
}

fn job_routes() -> Router<AppState> {
    use public::jobs;

    Router::new()
        .route("/jobs", get(jobs::list).post(jobs::create))
        .route("/jobs/:id", get(jobs::get))
}

fn application_routes() -> Router<AppState> {
    use public::applications;

    Router::new()
        .route("/job-application/:id", get(applications::get).delete(applications::delete))
        .route("/job-applications", post(applications::create))
        .route("/job-applications/:id", patch(applications::update_status))
        .route("/job-applications/jobs/:job_id", get(applications::list_by_job))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    use protected::applications;

    Router::new()
        .route("/job-application", get(applications::list_by_applicant))
        .route_layer(middleware::from_fn_with_state(state, cookie_auth_middleware))
}

/// Allow-list CORS with credentials so the browser sends the token cookie.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true)
}

async fn root() -> &'static str {
    "MZ Job Portal server is ready"
}

async fn health(axum::extract::State(state): axum::extract::State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();
    let backend = state.store.backend();

    match state.store.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": backend
                }
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "success": false,
                "error": "database unavailable",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "database_error": e.to_string()
                }
            })),
        ),
    }
}
