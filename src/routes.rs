// src/routes.rs

use axum::{
    Router,
    http::{HeaderName, HeaderValue, Method, header},
    middleware,
    routing::{get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{admin, auth, public, results, test_taking},
    state::AppState,
    utils::jwt::{auth_middleware, staff_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, tests, results, admin, public).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state.
pub fn create_router(state: AppState) -> Router {
    let origins = [
        HeaderValue::from_static("http://localhost:3000"),
        HeaderValue::from_static("http://127.0.0.1:3000"),
        HeaderValue::from_static("http://localhost:5173"),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-answer-key"),
        ]);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/verify-otp", post(auth::verify_otp));

    let test_routes = Router::new()
        .route("/", get(test_taking::list_tests))
        .route("/{id}", get(test_taking::get_test))
        .route("/{id}/submit", post(test_taking::submit_test))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let result_routes = Router::new()
        .route("/", get(results::my_results))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let admin_routes = Router::new()
        .route("/tests", get(admin::list_tests).post(admin::create_test))
        .route("/tests/{id}/submissions", get(admin::list_submissions))
        .route("/tests/{id}/release", post(admin::release_results))
        .route("/tests/{id}/scores-csv", get(admin::scores_csv))
        .route("/users", get(admin::list_users))
        .route("/users/{id}/role", put(admin::change_role))
        .route("/teams", get(admin::list_teams))
        .route("/ai-questions", post(admin::generate_ai_questions))
        // Auth runs first, then the staff check
        .layer(middleware::from_fn(staff_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let public_routes = Router::new().route("/answer-key", get(public::get_answer_key));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/tests", test_routes)
        .nest("/api/results", result_routes)
        .nest("/api/admin", admin_routes)
        .nest("/api/public", public_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
