//! Back-office booking screens: the reservation list, payment verification
//! and check-in.

use axum::{
    extract::{Extension, Path, State},
    response::Redirect,
    routing::{get, post},
    Form, Router,
};
use serde::Deserialize;

use crate::{
    errors::{AppError, AppResult},
    middleware::user_context::RequestContext,
    models::{BookingStatus, CheckinStatus},
    routes::parse_id,
    services::bookings::{self, BookingFilter, MSG_BOOKING_NOT_FOUND},
    state::AppState,
    views::Page,
};

const MSG_BAD_BOOKING_ID: &str = "รหัสการจองไม่ถูกต้อง";

/// Staff and admins.
pub fn staff_router() -> Router<AppState> {
    Router::new()
        .route("/admin/manageReserve",                        get(all_reservations))
        .route("/admin/paymentVerify",                        get(pending_payments))
        .route("/admin/paymentVerify/update/{booking_id}",    post(verify_payment))
        .route("/admin/checkIn",                              get(check_in_list))
        .route("/admin/checkIn/confirm/{booking_id}",         post(confirm_check_in))
}

/// Admins only.
pub fn admin_router() -> Router<AppState> {
    Router::new().route("/admin/manageReserve/delete/{booking_id}", get(delete_reservation))
}

async fn all_reservations(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> AppResult<Page> {
    let rows = bookings::list_bookings(&state.pool, BookingFilter::All).await?;
    Ok(Page::new("adminSystem/manageReserve", &ctx).with("bookings", rows))
}

async fn delete_reservation(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(booking_id): Path<String>,
) -> AppResult<Redirect> {
    let admin = ctx.require_user()?;
    let booking_id = parse_id(&booking_id, MSG_BAD_BOOKING_ID)?;
    bookings::release_booking(&state.pool, booking_id, None).await?;
    tracing::info!(booking_id, by = admin.user_id, "Reservation removed by admin");
    Ok(Redirect::to("/admin/manageReserve"))
}

// ── Payment verification ─────────────────────────────────────

async fn pending_payments(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> AppResult<Page> {
    let rows = bookings::list_bookings(
        &state.pool,
        BookingFilter::Status(BookingStatus::PendingVerification),
    )
    .await?;
    Ok(Page::new("adminSystem/paymentVerify", &ctx)
        .with("bookings", rows)
        .with(
            "statuses",
            BookingStatus::VERIFICATION_CHOICES.map(|status| (status.as_str(), status.label())),
        ))
}

#[derive(Debug, Deserialize)]
struct VerifyForm {
    #[serde(default)]
    status: String,
}

/// POST /admin/paymentVerify/update/{booking_id}
///
/// The slip stays on the booking whatever the outcome.
async fn verify_payment(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(booking_id): Path<String>,
    Form(form): Form<VerifyForm>,
) -> AppResult<Redirect> {
    let staff = ctx.require_user()?;
    let booking_id = parse_id(&booking_id, MSG_BAD_BOOKING_ID)?;
    let status = BookingStatus::from_verification(&form.status)
        .ok_or_else(|| AppError::BadRequest("Invalid status".into()))?;

    let matched = sqlx::query("UPDATE bookings SET booking_status = ? WHERE booking_id = ?")
        .bind(status.as_str())
        .bind(booking_id)
        .execute(&state.pool)
        .await?
        .rows_affected();
    if matched == 0 {
        return Err(AppError::NotFound(MSG_BOOKING_NOT_FOUND.into()));
    }
    tracing::info!(booking_id, by = staff.user_id, status = status.as_str(), "Payment verified");

    Ok(Redirect::to("/admin/paymentVerify"))
}

// ── Check-in ─────────────────────────────────────────────────

async fn check_in_list(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> AppResult<Page> {
    let rows = bookings::list_bookings(&state.pool, BookingFilter::Status(BookingStatus::Paid)).await?;
    Ok(Page::new("adminSystem/checkIn", &ctx).with("bookings", rows))
}

async fn confirm_check_in(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(booking_id): Path<String>,
) -> AppResult<Redirect> {
    let staff = ctx.require_user()?;
    let booking_id = parse_id(&booking_id, MSG_BAD_BOOKING_ID)?;

    let matched = sqlx::query("UPDATE bookings SET checkin_status = ?, checkin_date = ? WHERE booking_id = ?")
        .bind(CheckinStatus::CheckedIn.as_str())
        .bind(state.config.business_now().naive_local())
        .bind(booking_id)
        .execute(&state.pool)
        .await?
        .rows_affected();
    if matched == 0 {
        return Err(AppError::NotFound(MSG_BOOKING_NOT_FOUND.into()));
    }
    tracing::info!(booking_id, by = staff.user_id, "Checked in");

    Ok(Redirect::to("/admin/checkIn"))
}
