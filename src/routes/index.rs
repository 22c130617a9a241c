//! Public pages.

use axum::{extract::{Extension, State}, routing::get, Router};

use crate::{
    errors::AppResult,
    middleware::user_context::RequestContext,
    services::tours::list_tours,
    state::AppState,
    views::Page,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/",        get(home))
        .route("/contact", get(contact))
}

async fn home(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> AppResult<Page> {
    let tours = list_tours(&state.pool).await?;
    Ok(Page::new("index", &ctx).with("tours", tours))
}

async fn contact(Extension(ctx): Extension<RequestContext>) -> Page {
    Page::new("contact", &ctx)
}
