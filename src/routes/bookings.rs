//! Member routes: the tour programme, booking, reservations and payment.

use axum::{
    extract::{Extension, Path, State},
    middleware,
    response::Redirect,
    routing::get,
    Form, Router,
};
use serde::Deserialize;

use crate::{
    errors::{AppError, AppResult},
    middleware::{role_guard::require_login, user_context::RequestContext},
    models::{BookingStatus, UserProfile, USER_PROFILE_COLUMNS},
    routes::parse_id,
    services::{
        bookings::{self, BookingFilter, BookingOutcome},
        tours::{find_tour, list_tours},
    },
    state::AppState,
    uploads::{SubmittedForm, UploadKind},
    views::Page,
};

const MSG_BAD_BOOKING_ID: &str = "รหัสการจองไม่ถูกต้อง";
const MSG_BAD_TOUR_ID: &str = "รหัสทัวร์ไม่ถูกต้อง";
const MSG_ALREADY_PAID: &str = "การจองนี้ชำระเงินเรียบร้อยแล้ว";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tourprogram",                   get(tour_programme))
        .route("/tourprogram/bookTour/{tour_id}", get(book_tour_page).post(book_tour))
        .route("/reserve",                       get(my_reservations))
        .route("/reserve/delete/{booking_id}",   get(cancel_reservation))
        .route("/payment/{booking_id}",          get(payment_page).post(submit_slip))
        .route_layer(middleware::from_fn(require_login))
}

async fn tour_programme(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> AppResult<Page> {
    let tours = list_tours(&state.pool).await?;
    Ok(Page::new("tourprogram", &ctx).with("tours", tours))
}

// ── Booking ──────────────────────────────────────────────────

async fn book_tour_page(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(tour_id): Path<String>,
) -> AppResult<Page> {
    let user = ctx.require_user()?;
    let tour_id = parse_id(&tour_id, MSG_BAD_TOUR_ID)?;
    let tour = find_tour(&state.pool, tour_id).await?;

    let profile = sqlx::query_as::<_, UserProfile>(&format!(
        "SELECT {USER_PROFILE_COLUMNS} FROM users WHERE user_id = ?"
    ))
    .bind(user.user_id)
    .fetch_one(&state.pool)
    .await?;

    Ok(Page::new("bookTour", &ctx)
        .with("tour", tour)
        .with("user", profile))
}

/// The booking form also posts the customer's contact details; the booking
/// always belongs to the session user, so only the seat count is read.
#[derive(Debug, Deserialize)]
struct BookTourForm {
    #[serde(default)]
    seats_booked: String,
}

fn requested_seats(raw: &str) -> AppResult<u32> {
    raw.trim()
        .parse::<u32>()
        .ok()
        .filter(|seats| *seats >= 1)
        .ok_or_else(|| AppError::BadRequest("กรุณาระบุจำนวนที่นั่งอย่างน้อย 1 ที่นั่ง".into()))
}

async fn book_tour(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(tour_id): Path<String>,
    Form(form): Form<BookTourForm>,
) -> AppResult<Redirect> {
    let user = ctx.require_user()?;
    let tour_id = parse_id(&tour_id, MSG_BAD_TOUR_ID)?;
    let seats = requested_seats(&form.seats_booked)?;
    let today = state.config.business_now().date_naive();

    match bookings::book_seats(&state.pool, user.user_id, tour_id, seats, today).await? {
        BookingOutcome::Booked { .. } => Ok(Redirect::to("/tourprogram")),
        BookingOutcome::InsufficientSeats { available } => {
            tracing::info!(tour_id, user_id = user.user_id, seats, available, "Booking rejected: not enough seats");
            Err(AppError::BadRequest(format!(
                "จำนวนที่นั่งไม่พอสำหรับการจองนี้ (เหลือ {available} ที่นั่ง)"
            )))
        }
    }
}

// ── Reservations ─────────────────────────────────────────────

async fn my_reservations(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> AppResult<Page> {
    let user = ctx.require_user()?;
    let rows = bookings::list_bookings(&state.pool, BookingFilter::OwnedBy(user.user_id)).await?;
    Ok(Page::new("reserve", &ctx).with("bookings", rows))
}

async fn cancel_reservation(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(booking_id): Path<String>,
) -> AppResult<Redirect> {
    let user = ctx.require_user()?;
    let booking_id = parse_id(&booking_id, MSG_BAD_BOOKING_ID)?;
    bookings::release_booking(&state.pool, booking_id, Some(user.user_id)).await?;
    Ok(Redirect::to("/reserve"))
}

// ── Payment ──────────────────────────────────────────────────

async fn payment_page(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(booking_id): Path<String>,
) -> AppResult<Page> {
    let user = ctx.require_user()?;
    let booking_id = parse_id(&booking_id, MSG_BAD_BOOKING_ID)?;
    let booking = bookings::owned_booking(&state.pool, booking_id, user.user_id).await?;
    Ok(Page::new("payment", &ctx).with("booking", booking))
}

/// POST /payment/{booking_id}: upload a payment slip for staff to verify.
async fn submit_slip(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(booking_id): Path<String>,
    mut form: SubmittedForm,
) -> AppResult<Redirect> {
    let user = ctx.require_user()?;
    let booking_id = parse_id(&booking_id, MSG_BAD_BOOKING_ID)?;
    let slip = form
        .take_file("slip")
        .ok_or_else(|| AppError::BadRequest("กรุณาอัปโหลดสลิปการชำระเงิน".into()))?;

    let booking = bookings::owned_booking(&state.pool, booking_id, user.user_id).await?;
    if booking.status().is_some_and(|status| !status.accepts_slip()) {
        return Err(AppError::BadRequest(MSG_ALREADY_PAID.into()));
    }

    let stored = state.uploads.save(&slip, UploadKind::Slip).await?;
    let now = state.config.business_now();

    let updated = sqlx::query(
        "UPDATE bookings
         SET slip_path = ?, booking_status = ?, payment_date = ?, payment_time = ?
         WHERE booking_id = ? AND user_id = ? AND booking_status <> ?",
    )
    .bind(&stored)
    .bind(BookingStatus::PendingVerification.as_str())
    .bind(now.date_naive())
    .bind(now.time())
    .bind(booking_id)
    .bind(user.user_id)
    .bind(BookingStatus::Paid.as_str())
    .execute(&state.pool)
    .await;

    let matched = match updated {
        Ok(result) => result.rows_affected(),
        Err(err) => {
            state.uploads.remove(&stored).await;
            return Err(err.into());
        }
    };
    // Marked paid by staff after the status check above.
    if matched == 0 {
        state.uploads.remove(&stored).await;
        return Err(AppError::BadRequest(MSG_ALREADY_PAID.into()));
    }

    if let Some(previous) = booking.slip_path.as_deref().filter(|p| *p != stored) {
        state.uploads.remove(previous).await;
    }
    tracing::info!(booking_id, user_id = user.user_id, slip = %stored, "Payment slip submitted");

    Ok(Redirect::to("/reserve"))
}
