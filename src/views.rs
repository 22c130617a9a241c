//! View models handed to the template renderer.
//!
//! HTML templating lives outside this service. A handler names the template
//! it wants and attaches the data; the response body is the JSON document the
//! renderer consumes:
//!
//! ```json
//! { "view": "tourprogram", "locals": { "is_logged_in": true, "name": "…", "role": "member" }, "tours": [ … ] }
//! ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::middleware::user_context::RequestContext;

/// Per-request values every template can read (the navbar greeting, role badge, …).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Locals {
    pub is_logged_in: bool,
    pub name:         String,
    pub role:         String,
    pub role_label:   String,
}

impl From<&RequestContext> for Locals {
    fn from(ctx: &RequestContext) -> Self {
        match &ctx.user {
            Some(user) => Locals {
                is_logged_in: true,
                name:         user.name.clone(),
                role:         user.role.as_str().to_owned(),
                role_label:   user.role.label().to_owned(),
            },
            None => Locals::default(),
        }
    }
}

#[derive(Debug)]
pub struct Page {
    view:   &'static str,
    status: StatusCode,
    locals: Locals,
    data:   Map<String, Value>,
}

impl Page {
    pub fn new(view: &'static str, ctx: &RequestContext) -> Self {
        Self::anonymous(view).locals(Locals::from(ctx))
    }

    /// A page with empty locals, used where no request context is at hand.
    pub fn anonymous(view: &'static str) -> Self {
        Self {
            view,
            status: StatusCode::OK,
            locals: Locals::default(),
            data:   Map::new(),
        }
    }

    pub fn status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn locals(mut self, locals: Locals) -> Self {
        self.locals = locals;
        self
    }

    pub fn with<T: Serialize>(mut self, key: &str, value: T) -> Self {
        let value = serde_json::to_value(value).unwrap_or_else(|err| {
            tracing::warn!(view = self.view, key, error = %err, "Could not serialize view data");
            Value::Null
        });
        self.data.insert(key.to_owned(), value);
        self
    }

    pub fn view(&self) -> &'static str {
        self.view
    }

    fn into_body(self) -> Value {
        let mut body = self.data;
        body.insert("view".into(), Value::String(self.view.into()));
        body.insert(
            "locals".into(),
            serde_json::to_value(&self.locals).unwrap_or(Value::Null),
        );
        Value::Object(body)
    }
}

impl IntoResponse for Page {
    fn into_response(self) -> Response {
        let status = self.status;
        (status, Json(self.into_body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::user_context::CurrentUser;
    use crate::models::Role;

    #[test]
    fn anonymous_page_has_logged_out_locals() {
        let body = Page::anonymous("index").with("tours", Vec::<u8>::new()).into_body();
        assert_eq!(body["view"], "index");
        assert_eq!(body["locals"]["is_logged_in"], false);
        assert_eq!(body["tours"], serde_json::json!([]));
    }

    #[test]
    fn locals_follow_the_request_context() {
        let ctx = RequestContext {
            user: Some(CurrentUser {
                user_id: 7,
                name:    "Somchai Jaidee".into(),
                role:    Role::Staff,
            }),
        };
        let page = Page::new("adminSystem/admin", &ctx);
        assert_eq!(page.view(), "adminSystem/admin");
        let body = page.into_body();
        assert_eq!(body["locals"]["is_logged_in"], true);
        assert_eq!(body["locals"]["name"], "Somchai Jaidee");
        assert_eq!(body["locals"]["role"], "staff");
        assert_eq!(body["locals"]["role_label"], "พนักงาน");
    }

    #[test]
    fn data_keys_cannot_shadow_view_name() {
        let body = Page::anonymous("reserve").with("view", "other").into_body();
        assert_eq!(body["view"], "reserve");
    }
}
