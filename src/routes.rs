// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method},
    middleware,
    routing::{delete, get, post, put},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{admin, scoring, statistics},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

/// Assembles the main application router.
///
/// * Scoring and statistics routes require a valid bearer token.
/// * Admin routes additionally require the 'admin' role.
/// * Global middleware: Trace, CORS.
pub fn create_router(state: AppState) -> Router {
    let origins = [
        HeaderValue::from_static("http://localhost:3000"),
        HeaderValue::from_static("http://127.0.0.1:3000"),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let scoring_routes = Router::new()
        .route("/form-state", post(scoring::check_form_state))
        .route("/preview", post(scoring::preview_score))
        .route("/submit", post(scoring::submit_score))
        .route("/results", get(scoring::list_my_results))
        .route("/results/{id}/wrong", get(scoring::wrong_questions));

    let statistics_routes = Router::new()
        .route("/{subject}/{round}", get(statistics::get_statistics))
        .route("/{subject}/{round}/weeks", get(statistics::get_weeks));

    let admin_routes = Router::new()
        .route(
            "/answer-keys",
            get(admin::get_answer_key).post(admin::publish_answer_key),
        )
        .route(
            "/settings/{subject}/{round}",
            get(admin::get_settings).put(admin::update_settings),
        )
        .route("/settings/{subject}/{round}/release", put(admin::set_release))
        .route("/statistics/{subject}/{round}", get(admin::preview_statistics))
        .route("/results/{id}", delete(admin::delete_result))
        // Auth first, then Admin check
        .route_layer(middleware::from_fn(admin_middleware));

    let protected = Router::new()
        .nest("/api/scoring", scoring_routes)
        .nest("/api/statistics", statistics_routes)
        .nest("/api/admin", admin_routes)
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
