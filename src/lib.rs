use axum::{
    extract::DefaultBodyLimit, handler::HandlerWithoutStateExt, middleware::from_fn_with_state, Router,
};
use tower_cookies::CookieManagerLayer;
use tower_http::{services::ServeDir, trace::TraceLayer};

pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod session;
pub mod sql;
pub mod state;
pub mod uploads;
pub mod views;

use middleware::{error_page::render_error_pages, user_context::load_user_context};
use state::AppState;

/// Assemble the application router.
///
/// Layers, outermost first: request tracing, cookie jar, body limit, user
/// context, error pages. Anything not routed is served from the public
/// directory, and what is not there gets the 404 page.
pub fn app(state: AppState) -> Router {
    let public = ServeDir::new(&state.config.public_dir)
        .call_fallback_on_method_not_allowed(true)
        .not_found_service(routes::not_found.into_service());

    Router::new()
        .merge(routes::all_routes())
        .nest_service("/uploads", ServeDir::new(state.uploads.dir()))
        .fallback_service(public)
        .layer(from_fn_with_state(state.clone(), render_error_pages))
        .layer(from_fn_with_state(state.clone(), load_user_context))
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes))
        .layer(CookieManagerLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
