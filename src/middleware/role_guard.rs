//! Role-based authorization guards.
//!
//! All guards read the [`RequestContext`] injected by `load_user_context`, so
//! they must be applied as route layers inside it.

use axum::{
    extract::{Extension, Request},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::errors::{AppError, AppResult};
use crate::middleware::user_context::{CurrentUser, RequestContext};
use crate::models::Role;

/// Check the caller against a set of allowed roles.
///
/// Anonymous callers get [`AppError::Unauthorized`] (redirect to login);
/// logged-in callers with the wrong role get [`AppError::Forbidden`].
pub fn authorize<'a>(ctx: &'a RequestContext, allowed: &[Role]) -> AppResult<&'a CurrentUser> {
    let user = ctx.require_user()?;
    if !allowed.contains(&user.role) {
        return Err(AppError::Forbidden);
    }
    Ok(user)
}

/// Where a user lands after logging in.
pub fn landing_path(role: Role) -> &'static str {
    if role.is_back_office() { "/admin" } else { "/" }
}

/// Middleware: require any logged-in user.
pub async fn require_login(
    Extension(ctx): Extension<RequestContext>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    authorize(&ctx, &Role::ALL)?;
    Ok(next.run(req).await)
}

/// Middleware: require the `staff` or `admin` role.
pub async fn require_staff(
    Extension(ctx): Extension<RequestContext>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    authorize(&ctx, &Role::BACK_OFFICE)?;
    Ok(next.run(req).await)
}

/// Middleware: require the `admin` role.
pub async fn require_admin(
    Extension(ctx): Extension<RequestContext>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    authorize(&ctx, &[Role::Admin])?;
    Ok(next.run(req).await)
}

/// Middleware: keep logged-in users away from the login and register pages.
pub async fn redirect_if_logged_in(
    Extension(ctx): Extension<RequestContext>,
    req: Request,
    next: Next,
) -> Response {
    match &ctx.user {
        Some(user) => Redirect::to(landing_path(user.role)).into_response(),
        None => next.run(req).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx_with(role: Role) -> RequestContext {
        RequestContext {
            user: Some(CurrentUser { user_id: 1, name: "Test User".into(), role }),
        }
    }

    #[test]
    fn anonymous_callers_must_log_in() {
        let ctx = RequestContext::default();
        assert!(matches!(authorize(&ctx, &Role::ALL), Err(AppError::Unauthorized)));
        assert!(matches!(authorize(&ctx, &[Role::Admin]), Err(AppError::Unauthorized)));
    }

    #[test]
    fn members_are_denied_back_office_routes() {
        let ctx = ctx_with(Role::Member);
        assert!(authorize(&ctx, &Role::ALL).is_ok());
        assert!(matches!(authorize(&ctx, &Role::BACK_OFFICE), Err(AppError::Forbidden)));
        assert!(matches!(authorize(&ctx, &[Role::Admin]), Err(AppError::Forbidden)));
    }

    #[test]
    fn staff_reach_back_office_but_not_admin_only_routes() {
        let ctx = ctx_with(Role::Staff);
        assert_eq!(authorize(&ctx, &Role::BACK_OFFICE).unwrap().role, Role::Staff);
        assert!(matches!(authorize(&ctx, &[Role::Admin]), Err(AppError::Forbidden)));
    }

    #[test]
    fn admins_pass_every_gate() {
        let ctx = ctx_with(Role::Admin);
        assert!(authorize(&ctx, &Role::ALL).is_ok());
        assert!(authorize(&ctx, &Role::BACK_OFFICE).is_ok());
        assert!(authorize(&ctx, &[Role::Admin]).is_ok());
    }

    #[test]
    fn landing_depends_on_role() {
        assert_eq!(landing_path(Role::Member), "/");
        assert_eq!(landing_path(Role::Staff), "/admin");
        assert_eq!(landing_path(Role::Admin), "/admin");
    }
}
