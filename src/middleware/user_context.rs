//! User-context middleware.
//!
//! Reads the signed `session` cookie, loads the user's display name and role
//! from the `users` table, and injects a [`RequestContext`] extension into the
//! request for the role gates and handlers downstream. Runs on every request,
//! logged in or not.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::{
    errors::{AppError, AppResult},
    models::Role,
    session::{Session, SessionData},
    state::AppState,
};

/// The logged-in user behind the current request.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user_id: u64,
    pub name:    String,
    pub role:    Role,
}

/// Request-scoped identity, resolved once per request.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub user: Option<CurrentUser>,
}

impl RequestContext {
    /// The current user, or [`AppError::Unauthorized`] (redirect to login).
    pub fn require_user(&self) -> AppResult<&CurrentUser> {
        self.user.as_ref().ok_or(AppError::Unauthorized)
    }
}

#[derive(sqlx::FromRow)]
struct ContextRow {
    name: String,
    role: String,
}

/// Middleware: resolve the session into a [`RequestContext`].
///
/// The role comes from storage, not from the cookie, so a demoted user loses
/// access on their next request; the cookie is re-issued to match. A session
/// whose user has been deleted is cleared.
pub async fn load_user_context(
    State(state): State<AppState>,
    session: Session,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let mut ctx = RequestContext::default();

    if let Some(data) = session.current() {
        let row = sqlx::query_as::<_, ContextRow>(
            "SELECT CONCAT(first_name, ' ', last_name) AS name, role
             FROM users WHERE user_id = ? LIMIT 1",
        )
        .bind(data.user_id)
        .fetch_optional(&state.pool)
        .await?;

        match row {
            Some(row) => {
                let role = Role::from_db(&row.role);
                if role != data.role {
                    tracing::info!(
                        user_id = data.user_id,
                        from = %data.role,
                        to = %role,
                        "Stored role changed; refreshing session"
                    );
                    session.establish(SessionData { user_id: data.user_id, role });
                }
                ctx.user = Some(CurrentUser {
                    user_id: data.user_id,
                    name:    row.name,
                    role,
                });
            }
            None => {
                tracing::info!(user_id = data.user_id, "Session refers to a missing user; clearing it");
                session.destroy();
            }
        }
    }

    req.extensions_mut().insert(ctx);
    Ok(next.run(req).await)
}
