use axum::{middleware, Router};

use crate::{
    errors::{AppError, AppResult},
    middleware::role_guard::{require_admin, require_staff},
    state::AppState,
};

mod admin;
mod auth;
mod bookings;
mod guides;
mod index;
mod reservations;
mod tours;

/// Build the full router.
///
/// Public and member routes carry their own gates; the back office is split
/// into the staff-or-admin part and the admin-only part.
pub fn all_routes() -> Router<AppState> {
    Router::new()
        .merge(index::router())
        .merge(auth::router())
        .merge(bookings::router())
        .merge(
            Router::new()
                .merge(admin::staff_router())
                .merge(tours::router())
                .merge(reservations::staff_router())
                .route_layer(middleware::from_fn(require_staff)),
        )
        .merge(
            Router::new()
                .merge(admin::admin_router())
                .merge(guides::router())
                .merge(reservations::admin_router())
                .route_layer(middleware::from_fn(require_admin)),
        )
}

/// Fallback for anything neither routed nor served from the public directory.
pub async fn not_found() -> AppError {
    AppError::NotFound("ไม่พบหน้าที่คุณต้องการ".into())
}

/// Numeric id from a path segment.
fn parse_id(raw: &str, message: &str) -> AppResult<u64> {
    raw.trim()
        .parse()
        .map_err(|_| AppError::BadRequest(message.to_owned()))
}
