// src/routes.rs

use axum::{
    Router, http::Method, middleware,
    routing::{delete, get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{attempts, auth, results, tests},
    state::AppState,
    utils::jwt::auth_middleware,
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, tests, attempts, results).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (stores, session registry, config).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        "http://localhost:3000".parse().unwrap(),
        "http://127.0.0.1:3000".parse().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    // let governor_conf = GovernorConfigBuilder::default()
    //     .per_second(2)
    //     .burst_size(5)
    //     .finish()
    //     .unwrap();

    // let governor_conf = Arc::new(governor_conf);

    let auth_routes = Router::new().route("/sync", post(auth::sync));

    let test_routes = Router::new()
        .route("/", get(tests::list_tests))
        .route("/{id}", get(tests::get_test))
        .route("/{id}/attempts", post(attempts::start_attempt))
        .route("/{id}/submit", post(attempts::submit_attempt))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let attempt_routes = Router::new()
        .route("/{id}", get(attempts::get_attempt))
        .route("/{id}/fullscreen", post(attempts::confirm_fullscreen))
        .route("/{id}/answers", put(attempts::record_answer))
        .route(
            "/{id}/answers/{question_id}",
            delete(attempts::clear_answer),
        )
        .route("/{id}/events", post(attempts::report_event))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let result_routes = Router::new()
        .route("/", get(results::list_my_results))
        .route("/{id}", get(results::get_result))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/tests", test_routes)
        .nest("/api/attempts", attempt_routes)
        .nest("/api/results", result_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // .layer(GovernorLayer::new(governor_conf))
        .with_state(state)
}
