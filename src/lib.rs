pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod filter;
pub mod handlers;
pub mod middleware;
pub mod state;

use axum::{
    http::{header, HeaderValue, Method},
    routing::get,
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::{AppConfig, Environment};
use crate::state::AppState;

/// The full service: `/health` plus every `/api/v1` route, with CORS and request tracing.
pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        .route("/health", get(handlers::health::health))
        .nest("/api/v1", api_routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(auth_routes())
        .merge(user_routes())
        .merge(bootcamp_routes())
        .merge(course_routes())
        .merge(review_routes())
}

fn auth_routes() -> Router<AppState> {
    use axum::routing::{post, put};
    use handlers::auth;

    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me))
        .route("/auth/updatedetails", put(auth::update_details))
        .route("/auth/updatepassword", put(auth::update_password))
}

fn user_routes() -> Router<AppState> {
    use handlers::users;

    Router::new()
        .route("/auth/users", get(users::list).post(users::create))
        .route("/auth/users/:id", get(users::show).put(users::update).delete(users::delete))
}

fn bootcamp_routes() -> Router<AppState> {
    use handlers::bootcamps;

    Router::new()
        .route("/bootcamps", get(bootcamps::list).post(bootcamps::create))
        .route(
            "/bootcamps/:id",
            get(bootcamps::show).put(bootcamps::update).delete(bootcamps::delete),
        )
}

fn course_routes() -> Router<AppState> {
    use handlers::courses;

    Router::new()
        // Nested under the parent bootcamp
        .route(
            "/bootcamps/:id/courses",
            get(courses::list_for_bootcamp).post(courses::create),
        )
        .route("/courses", get(courses::list))
        .route("/courses/:id", get(courses::show).put(courses::update).delete(courses::delete))
}

fn review_routes() -> Router<AppState> {
    use handlers::reviews;

    Router::new()
        .route(
            "/bootcamps/:id/reviews",
            get(reviews::list_for_bootcamp).post(reviews::create),
        )
        .route("/reviews", get(reviews::list))
        .route("/reviews/:id", get(reviews::show).put(reviews::update).delete(reviews::delete))
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    if config.environment == Environment::Development {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}
