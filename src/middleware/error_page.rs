//! Error-page middleware.
//!
//! Error responses leave an [`ErrorView`] extension behind. This layer swaps
//! the bare error body for the full error view with the caller's locals, and
//! in development attaches the internal error chain.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{
    errors::ErrorView,
    middleware::user_context::RequestContext,
    state::AppState,
    views::Page,
};

pub async fn render_error_pages(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let ctx = req
        .extensions()
        .get::<RequestContext>()
        .cloned()
        .unwrap_or_default();

    let mut response = next.run(req).await;
    let Some(error) = response.extensions_mut().remove::<ErrorView>() else {
        return response;
    };

    let mut page = Page::new(error.view, &ctx)
        .status(response.status())
        .with("message", &error.message);
    if state.config.is_development() {
        if let Some(detail) = error.detail {
            page = page.with("error", detail);
        }
    }
    page.into_response()
}
