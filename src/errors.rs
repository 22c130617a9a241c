//! Application error type.
//!
//! Every handler returns [`AppResult`]. Errors render as a view model (see
//! [`crate::views`]) carrying an [`ErrorView`] extension, which the
//! error-page middleware re-renders with the caller's locals.

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use thiserror::Error;

use crate::views::Page;

pub type AppResult<T> = Result<T, AppError>;

pub const LOGIN_PATH: &str = "/auth/login";

const GENERIC_FAILURE: &str = "เกิดข้อผิดพลาด";
const PERMISSION_DENIED: &str = "คุณไม่มีสิทธิ์เข้าใช้งานหน้านี้";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("authentication required")]
    Unauthorized,
    #[error("permission denied")]
    Forbidden,
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Internal(anyhow::Error::new(err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(anyhow::Error::new(err))
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        AppError::BadRequest(err.body_text())
    }
}

/// Marker left on error responses for the error-page middleware.
#[derive(Debug, Clone)]
pub struct ErrorView {
    pub view:    &'static str,
    pub message: String,
    /// Internal error chain, shown only in development.
    pub detail:  Option<String>,
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized  => StatusCode::SEE_OTHER,
            AppError::Forbidden     => StatusCode::FORBIDDEN,
            AppError::NotFound(_)   => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_)   => StatusCode::CONFLICT,
            AppError::Internal(_)   => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = match self {
            AppError::Unauthorized => return Redirect::to(LOGIN_PATH).into_response(),
            AppError::Forbidden => ErrorView {
                view:    "errorPrivate",
                message: PERMISSION_DENIED.into(),
                detail:  None,
            },
            AppError::NotFound(message)
            | AppError::BadRequest(message)
            | AppError::Conflict(message) => ErrorView {
                view: "error",
                message,
                detail: None,
            },
            AppError::Internal(err) => {
                tracing::error!(error = ?err, "Request failed");
                ErrorView {
                    view:    "error",
                    message: GENERIC_FAILURE.into(),
                    detail:  Some(format!("{err:#}")),
                }
            }
        };

        let mut response = Page::anonymous(error.view)
            .status(status)
            .with("message", &error.message)
            .into_response();
        response.extensions_mut().insert(error);
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::LOCATION;

    #[test]
    fn unauthorized_redirects_to_login() {
        let response = AppError::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[LOCATION], LOGIN_PATH);
    }

    #[test]
    fn forbidden_renders_permission_denied_view() {
        let response = AppError::Forbidden.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let view = response.extensions().get::<ErrorView>().unwrap();
        assert_eq!(view.view, "errorPrivate");
    }

    #[test]
    fn internal_errors_hide_the_cause_but_keep_it_for_development() {
        let response = AppError::Internal(anyhow::anyhow!("db exploded")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let view = response.extensions().get::<ErrorView>().unwrap();
        assert_eq!(view.message, GENERIC_FAILURE);
        assert_eq!(view.detail.as_deref(), Some("db exploded"));
    }

    #[test]
    fn client_errors_carry_their_message() {
        let response = AppError::BadRequest("Invalid status".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let view = response.extensions().get::<ErrorView>().unwrap();
        assert_eq!(view.message, "Invalid status");
        assert!(view.detail.is_none());
    }
}
