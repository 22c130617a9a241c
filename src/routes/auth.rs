use axum::{
    extract::{Extension, State},
    middleware,
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Form, Router,
};
use serde_json::json;

use crate::{
    auth::{hash_password, verify_password, LoginForm, RegisterForm, MSG_EMAIL_TAKEN},
    db::{is_unique_violation, Db},
    errors::{AppError, AppResult},
    middleware::{
        role_guard::{landing_path, redirect_if_logged_in, require_login},
        user_context::RequestContext,
    },
    models::Role,
    services::tours::list_tours,
    session::{Session, SessionData},
    state::AppState,
    views::Page,
};

const MSG_UNKNOWN_EMAIL: &str = "ที่อยู่อีเมลไม่ถูกต้อง";
const MSG_WRONG_PASSWORD: &str = "รหัสผ่านไม่ถูกต้อง";
const MSG_REGISTERED: &str = "บัญชีของคุณถูกสร้างขึ้นเรียบร้อยแล้ว! ตอนนี้คุณสามารถเข้าสู่ระบบได้";

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(
            Router::new()
                .route("/auth/login",    get(login_page).post(login))
                .route("/auth/register", get(register_page).post(register))
                .route_layer(middleware::from_fn(redirect_if_logged_in)),
        )
        .merge(
            Router::new()
                .route("/auth", get(member_home))
                .route_layer(middleware::from_fn(require_login)),
        )
        .route("/auth/logout", get(logout))
}

// ── Login ─────────────────────────────────────────────────────

#[derive(sqlx::FromRow)]
struct CredentialRow {
    user_id:  u64,
    password: String,
    role:     String,
}

fn login_view(ctx: &RequestContext, errors: Vec<String>) -> Page {
    Page::new("authPage/login", ctx).with("login_errors", errors)
}

async fn login_page(Extension(ctx): Extension<RequestContext>) -> Page {
    login_view(&ctx, Vec::new())
}

/// POST /auth/login: verify credentials and open a session.
async fn login(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> AppResult<Response> {
    let form = form.normalized();

    let row = sqlx::query_as::<_, CredentialRow>(
        "SELECT user_id, password, role FROM users WHERE email = ? LIMIT 1",
    )
    .bind(&form.user_email)
    .fetch_optional(&state.pool)
    .await?;

    let mut errors = Vec::new();
    if row.is_none() {
        errors.push(MSG_UNKNOWN_EMAIL.to_owned());
    }
    errors.extend(form.problems());
    let Some(row) = row.filter(|_| errors.is_empty()) else {
        return Ok(login_view(&ctx, errors).into_response());
    };

    match verify_password(&form.user_pass, &row.password) {
        Ok(()) => {}
        Err(AppError::Unauthorized) => {
            tracing::info!(user_id = row.user_id, "Login rejected: wrong password");
            return Ok(login_view(&ctx, vec![MSG_WRONG_PASSWORD.to_owned()]).into_response());
        }
        Err(err) => return Err(err),
    }

    let role = Role::from_db(&row.role);
    session.establish(SessionData { user_id: row.user_id, role });
    tracing::info!(user_id = row.user_id, %role, "User logged in");

    Ok(Redirect::to(landing_path(role)).into_response())
}

// ── Register ──────────────────────────────────────────────────

fn register_view(ctx: &RequestContext) -> Page {
    Page::new("authPage/register", ctx)
        .with("register_error", Vec::<String>::new())
        .with("old_data", json!({}))
}

async fn register_page(Extension(ctx): Extension<RequestContext>) -> Page {
    register_view(&ctx)
}

async fn email_taken(pool: &Db, email: &str) -> AppResult<bool> {
    let taken: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = ?)")
        .bind(email)
        .fetch_one(pool)
        .await?;
    Ok(taken)
}

/// POST /auth/register: create a member account.
async fn register(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Form(form): Form<RegisterForm>,
) -> AppResult<Page> {
    let form = form.normalized();

    let mut errors = form.problems();
    if form.email_is_valid() && email_taken(&state.pool, &form.user_email).await? {
        errors.insert(0, MSG_EMAIL_TAKEN.to_owned());
    }
    if !errors.is_empty() {
        return Ok(register_view(&ctx)
            .with("register_error", errors)
            .with("old_data", form.echo()));
    }

    let hash = hash_password(&form.user_pass)?;
    let inserted = sqlx::query(
        "INSERT INTO users (first_name, last_name, phone, dob, gender, email, password, role)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&form.user_fname)
    .bind(&form.user_lname)
    .bind(&form.user_phone)
    .bind(form.date_of_birth())
    .bind(form.gender())
    .bind(&form.user_email)
    .bind(&hash)
    .bind(Role::Member.as_str())
    .execute(&state.pool)
    .await;

    match inserted {
        Ok(result) => {
            tracing::info!(user_id = result.last_insert_id(), "Member registered");
            Ok(register_view(&ctx).with("success_msg", MSG_REGISTERED))
        }
        // Another request registered the same email between the check and the insert.
        Err(err) if is_unique_violation(&err) => Ok(register_view(&ctx)
            .with("register_error", vec![MSG_EMAIL_TAKEN])
            .with("old_data", form.echo())),
        Err(err) => Err(err.into()),
    }
}

// ── Logout / member home ──────────────────────────────────────

async fn logout(Extension(ctx): Extension<RequestContext>, session: Session) -> Redirect {
    if let Some(user) = &ctx.user {
        tracing::info!(user_id = user.user_id, "User logged out");
    }
    session.destroy();
    Redirect::to("/")
}

/// GET /auth: the landing page greeting the logged-in user by name.
async fn member_home(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> AppResult<Page> {
    let user = ctx.require_user()?;
    let tours = list_tours(&state.pool).await?;
    Ok(Page::new("index", &ctx)
        .with("name", &user.name)
        .with("tours", tours))
}
