//! `/admin` dashboard and user management.
//!
//! The dashboard is open to staff and admins; user management is admin-only.
//! Both gates are applied in `all_routes`.

use axum::{
    extract::{Extension, Path, State},
    response::Redirect,
    routing::get,
    Router,
};
use serde::Serialize;

use crate::{
    auth::{hash_password, is_phone_number, MSG_EMAIL_TAKEN},
    db::{is_foreign_key_violation, is_unique_violation},
    errors::{AppError, AppResult},
    middleware::user_context::RequestContext,
    models::{BookingStatus, CheckinStatus, Role, UserProfile, USER_PROFILE_COLUMNS},
    routes::parse_id,
    sql::{UpdateBuilder, UserColumn},
    state::AppState,
    uploads::{FormFields, SubmittedForm},
    views::Page,
};

const MSG_BAD_USER_ID: &str = "รหัสผู้ใช้ไม่ถูกต้อง";
const MSG_USER_NOT_FOUND: &str = "ไม่พบผู้ใช้";

pub fn staff_router() -> Router<AppState> {
    Router::new().route("/admin", get(dashboard))
}

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/admin/manageUser",                  get(list_users))
        .route("/admin/manageUser/edit/{user_id}",   get(edit_user_page).post(update_user))
        .route("/admin/manageUser/delete/{user_id}", get(delete_user))
}

// ── Dashboard ────────────────────────────────────────────────

#[derive(Debug, Serialize, sqlx::FromRow)]
struct DashboardCounts {
    tours:                i64,
    users:                i64,
    bookings:             i64,
    pending_verification: i64,
    awaiting_checkin:     i64,
}

async fn dashboard(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> AppResult<Page> {
    let counts = sqlx::query_as::<_, DashboardCounts>(
        "SELECT
            (SELECT COUNT(*) FROM tours)    AS tours,
            (SELECT COUNT(*) FROM users)    AS users,
            (SELECT COUNT(*) FROM bookings) AS bookings,
            (SELECT COUNT(*) FROM bookings WHERE booking_status = ?) AS pending_verification,
            (SELECT COUNT(*) FROM bookings WHERE booking_status = ? AND checkin_status = ?) AS awaiting_checkin",
    )
    .bind(BookingStatus::PendingVerification.as_str())
    .bind(BookingStatus::Paid.as_str())
    .bind(CheckinStatus::Awaiting.as_str())
    .fetch_one(&state.pool)
    .await?;

    Ok(Page::new("adminSystem/admin", &ctx).with("counts", counts))
}

// ── Users ────────────────────────────────────────────────────

async fn list_users(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> AppResult<Page> {
    let users = sqlx::query_as::<_, UserProfile>(&format!(
        "SELECT {USER_PROFILE_COLUMNS} FROM users ORDER BY user_id"
    ))
    .fetch_all(&state.pool)
    .await?;
    Ok(Page::new("adminSystem/manageUser", &ctx)
        .with("users", users)
        .with("roles", Role::ALL.map(|role| (role.as_str(), role.label()))))
}

async fn edit_user_page(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(user_id): Path<String>,
) -> AppResult<Page> {
    let user_id = parse_id(&user_id, MSG_BAD_USER_ID)?;
    let user = sqlx::query_as::<_, UserProfile>(&format!(
        "SELECT {USER_PROFILE_COLUMNS} FROM users WHERE user_id = ?"
    ))
    .bind(user_id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| AppError::NotFound(MSG_USER_NOT_FOUND.into()))?;

    Ok(Page::new("adminSystem/editUser", &ctx)
        .with("user", user)
        .with("roles", Role::ALL.map(|role| (role.as_str(), role.label()))))
}

/// Validated contents of the user edit form.
#[derive(Debug, PartialEq)]
struct UserEdit {
    first_name: String,
    last_name:  String,
    email:      String,
    phone:      String,
    role:       Role,
    /// Only present when a new password was typed.
    password:   Option<String>,
}

impl UserEdit {
    fn from_fields(fields: &FormFields) -> AppResult<Self> {
        let role = fields
            .get("role")
            .and_then(Role::from_name_or_label)
            .ok_or_else(|| AppError::BadRequest("บทบาทไม่ถูกต้อง".into()))?;

        let phone = fields.require("phone", "กรุณากรอกเบอร์โทรศัพท์")?;
        if !is_phone_number(&phone) {
            return Err(AppError::BadRequest("กรุณากรอกเบอร์โทรศัพท์ให้ครบ 10 หลัก".into()));
        }

        Ok(Self {
            first_name: fields.require("firstname", "กรุณากรอกชื่อ")?,
            last_name:  fields.require("lastname", "กรุณากรอกนามสกุล")?,
            email:      fields.require("email", "กรุณากรอกอีเมล")?,
            phone,
            role,
            password:   fields.get("password").map(str::to_owned),
        })
    }
}

async fn update_user(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(user_id): Path<String>,
    form: SubmittedForm,
) -> AppResult<Redirect> {
    let admin = ctx.require_user()?;
    let user_id = parse_id(&user_id, MSG_BAD_USER_ID)?;
    let edit = UserEdit::from_fields(&form.fields)?;

    let password_hash = edit.password.as_deref().map(hash_password).transpose()?;
    let mut query = UpdateBuilder::<UserColumn>::new()
        .set(UserColumn::FirstName, edit.first_name)
        .set(UserColumn::LastName, edit.last_name)
        .set(UserColumn::Email, edit.email)
        .set(UserColumn::Phone, edit.phone)
        .set(UserColumn::Role, edit.role.as_str())
        .set_some(UserColumn::Password, password_hash)
        .where_key(user_id)?;

    let matched = match query.build().execute(&state.pool).await {
        Ok(result) => result.rows_affected(),
        Err(err) if is_unique_violation(&err) => {
            return Err(AppError::Conflict(MSG_EMAIL_TAKEN.into()));
        }
        Err(err) => return Err(err.into()),
    };
    if matched == 0 {
        return Err(AppError::NotFound(MSG_USER_NOT_FOUND.into()));
    }
    tracing::info!(
        user_id,
        by = admin.user_id,
        role = %edit.role,
        password_changed = edit.password.is_some(),
        "User updated"
    );

    Ok(Redirect::to("/admin/manageUser"))
}

async fn delete_user(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(user_id): Path<String>,
) -> AppResult<Redirect> {
    let admin = ctx.require_user()?;
    let user_id = parse_id(&user_id, MSG_BAD_USER_ID)?;
    if user_id == admin.user_id {
        return Err(AppError::BadRequest("ไม่สามารถลบบัญชีของตัวเองได้".into()));
    }

    let deleted = sqlx::query("DELETE FROM users WHERE user_id = ?")
        .bind(user_id)
        .execute(&state.pool)
        .await;
    let affected = match deleted {
        Ok(result) => result.rows_affected(),
        Err(err) if is_foreign_key_violation(&err) => {
            return Err(AppError::Conflict("ไม่สามารถลบผู้ใช้ที่ยังมีการจองอยู่ได้".into()));
        }
        Err(err) => return Err(err.into()),
    };
    if affected == 0 {
        return Err(AppError::NotFound(MSG_USER_NOT_FOUND.into()));
    }
    tracing::info!(user_id, by = admin.user_id, "User deleted");

    Ok(Redirect::to("/admin/manageUser"))
}
