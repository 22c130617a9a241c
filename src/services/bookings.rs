//! Booking ledger: the only code that moves `tours.seats_booked`.
//!
//! Creating or deleting a booking and adjusting the tour's counter happen in
//! one transaction, with the tour (or booking) row locked, so concurrent
//! bookings cannot oversell and a delete never loses its counter reversal.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;
use sqlx::{mysql::MySql, QueryBuilder};

use crate::{
    db::Db,
    errors::{AppError, AppResult},
    models::{BookingStatus, CheckinStatus},
};

pub const MSG_BOOKING_NOT_FOUND: &str = "ไม่พบการจองนี้";
pub const MSG_TOUR_NOT_FOUND: &str = "ไม่พบข้อมูลทัวร์";

// ── Seat arithmetic ──────────────────────────────────────────

/// Seats still open on a tour.
pub fn seats_left(seat: u32, seats_booked: u32) -> u32 {
    seat.saturating_sub(seats_booked)
}

/// Whether `requested` more seats fit without exceeding capacity.
pub fn fits(seat: u32, seats_booked: u32, requested: u32) -> bool {
    u64::from(seats_booked) + u64::from(requested) <= u64::from(seat)
}

pub fn total_price(price: u32, seats: u32) -> u64 {
    u64::from(price) * u64::from(seats)
}

// ── Create ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingOutcome {
    Booked { booking_id: u64, total_price: u64 },
    /// Nothing was written; `available` is what was left at the time.
    InsufficientSeats { available: u32 },
}

#[derive(sqlx::FromRow)]
struct SeatRow {
    price:        u32,
    seat:         u32,
    seats_booked: u32,
}

/// Book `seats` on `tour_id` for `user_id`.
pub async fn book_seats(
    pool: &Db,
    user_id: u64,
    tour_id: u64,
    seats: u32,
    booking_date: NaiveDate,
) -> AppResult<BookingOutcome> {
    if seats == 0 {
        return Err(AppError::BadRequest("กรุณาระบุจำนวนที่นั่ง".into()));
    }

    let mut tx = pool.begin().await?;

    let tour = sqlx::query_as::<_, SeatRow>(
        "SELECT price, seat, seats_booked FROM tours WHERE tour_id = ? FOR UPDATE",
    )
    .bind(tour_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::NotFound(MSG_TOUR_NOT_FOUND.into()))?;

    if !fits(tour.seat, tour.seats_booked, seats) {
        // Dropping `tx` rolls back and releases the row lock.
        return Ok(BookingOutcome::InsufficientSeats {
            available: seats_left(tour.seat, tour.seats_booked),
        });
    }

    // The guard re-checks capacity in the statement itself.
    let reserved = sqlx::query(
        "UPDATE tours SET seats_booked = seats_booked + ?
         WHERE tour_id = ? AND seats_booked + ? <= seat",
    )
    .bind(seats)
    .bind(tour_id)
    .bind(seats)
    .execute(&mut *tx)
    .await?
    .rows_affected();
    if reserved == 0 {
        return Ok(BookingOutcome::InsufficientSeats {
            available: seats_left(tour.seat, tour.seats_booked),
        });
    }

    let total_price = total_price(tour.price, seats);
    let booking_id = sqlx::query(
        "INSERT INTO bookings
            (booking_date, booking_status, checkin_status, total_people, total_price, user_id, tour_id)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(booking_date)
    .bind(BookingStatus::Unpaid.as_str())
    .bind(CheckinStatus::Awaiting.as_str())
    .bind(seats)
    .bind(total_price)
    .bind(user_id)
    .bind(tour_id)
    .execute(&mut *tx)
    .await?
    .last_insert_id();

    tx.commit().await?;
    tracing::info!(booking_id, tour_id, user_id, seats, total_price, "Booking created");

    Ok(BookingOutcome::Booked { booking_id, total_price })
}

// ── Delete ───────────────────────────────────────────────────

#[derive(sqlx::FromRow)]
struct ReleaseRow {
    tour_id:      u64,
    total_people: u32,
}

/// Delete a booking and give its seats back to the tour.
///
/// With `owner = Some(user_id)` only that user's booking matches; anything
/// else is reported as not found.
pub async fn release_booking(pool: &Db, booking_id: u64, owner: Option<u64>) -> AppResult<()> {
    let mut tx = pool.begin().await?;

    let booking = sqlx::query_as::<_, ReleaseRow>(
        "SELECT tour_id, total_people FROM bookings
         WHERE booking_id = ? AND (? IS NULL OR user_id = ?)
         FOR UPDATE",
    )
    .bind(booking_id)
    .bind(owner)
    .bind(owner)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::NotFound(MSG_BOOKING_NOT_FOUND.into()))?;

    sqlx::query(
        "UPDATE tours SET seats_booked = seats_booked - LEAST(seats_booked, ?)
         WHERE tour_id = ?",
    )
    .bind(booking.total_people)
    .bind(booking.tour_id)
    .execute(&mut *tx)
    .await?;

    sqlx::query("DELETE FROM bookings WHERE booking_id = ?")
        .bind(booking_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    tracing::info!(
        booking_id,
        tour_id = booking.tour_id,
        seats = booking.total_people,
        "Booking deleted and seats released"
    );
    Ok(())
}

// ── Listings ─────────────────────────────────────────────────

/// A booking joined with its tour and customer, as every booking screen shows it.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct BookingSummary {
    pub booking_id:     u64,
    pub booking_date:   NaiveDate,
    pub booking_status: String,
    pub checkin_status: String,
    pub total_people:   u32,
    pub total_price:    u64,
    pub slip_path:      Option<String>,
    pub payment_date:   Option<NaiveDate>,
    pub payment_time:   Option<NaiveTime>,
    pub checkin_date:   Option<NaiveDateTime>,
    pub tour_id:        u64,
    pub tour_name:      String,
    pub start_date:     NaiveDate,
    pub end_date:       NaiveDate,
    pub user_id:        u64,
    pub user_name:      String,
    pub email:          String,
    pub phone:          String,
}

impl BookingSummary {
    pub fn status(&self) -> Option<BookingStatus> {
        self.booking_status.parse().ok()
    }
}

#[derive(Debug, Clone, Copy)]
pub enum BookingFilter {
    All,
    OwnedBy(u64),
    Status(BookingStatus),
    One { booking_id: u64, owner: u64 },
}

fn summary_query(filter: BookingFilter) -> QueryBuilder<'static, MySql> {
    let mut query = QueryBuilder::new(
        "SELECT
            b.booking_id, b.booking_date, b.booking_status, b.checkin_status,
            b.total_people, b.total_price, b.slip_path,
            b.payment_date, b.payment_time, b.checkin_date,
            t.tour_id, t.tour_name, t.start_date, t.end_date,
            u.user_id, CONCAT(u.first_name, ' ', u.last_name) AS user_name, u.email, u.phone
         FROM bookings b
         JOIN tours t ON b.tour_id = t.tour_id
         JOIN users u ON b.user_id = u.user_id",
    );
    match filter {
        BookingFilter::All => {}
        BookingFilter::OwnedBy(user_id) => {
            query.push(" WHERE b.user_id = ").push_bind(user_id);
        }
        BookingFilter::Status(status) => {
            query.push(" WHERE b.booking_status = ").push_bind(status.as_str());
        }
        BookingFilter::One { booking_id, owner } => {
            query
                .push(" WHERE b.booking_id = ")
                .push_bind(booking_id)
                .push(" AND b.user_id = ")
                .push_bind(owner);
        }
    }
    query.push(" ORDER BY b.booking_date DESC, b.booking_id DESC");
    query
}

pub async fn list_bookings(pool: &Db, filter: BookingFilter) -> AppResult<Vec<BookingSummary>> {
    let mut query = summary_query(filter);
    let rows = query
        .build_query_as::<BookingSummary>()
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// One booking belonging to `owner`; not found otherwise.
pub async fn owned_booking(pool: &Db, booking_id: u64, owner: u64) -> AppResult<BookingSummary> {
    let mut query = summary_query(BookingFilter::One { booking_id, owner });
    query
        .build_query_as::<BookingSummary>()
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(MSG_BOOKING_NOT_FOUND.into()))
}
