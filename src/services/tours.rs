//! Tour catalogue queries shared by the public pages and the admin screens.

use chrono::NaiveDate;
use serde::Serialize;

use crate::{
    db::Db,
    errors::{AppError, AppResult},
    models::Tour,
    services::bookings::{seats_left, MSG_TOUR_NOT_FOUND},
};

/// A tour as listed on the programme and admin pages.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TourListing {
    pub tour_id:      u64,
    pub image:        Option<String>,
    pub tour_name:    String,
    pub price:        u32,
    pub description:  String,
    pub country:      String,
    pub start_date:   NaiveDate,
    pub end_date:     NaiveDate,
    pub seats_booked: u32,
    pub seat:         u32,
    /// `None` when the tour has no guide assigned.
    pub guide_name:   Option<String>,
    /// Inclusive day count.
    pub duration:     i64,
    #[sqlx(skip)]
    pub seats_left:   u32,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct GuideChoice {
    pub guide_id:   u64,
    pub first_name: String,
    pub last_name:  String,
}

pub async fn list_tours(pool: &Db) -> AppResult<Vec<TourListing>> {
    let mut tours = sqlx::query_as::<_, TourListing>(
        "SELECT
            t.tour_id, t.image, t.tour_name, t.price, t.description, t.country,
            t.start_date, t.end_date, t.seats_booked, t.seat,
            CONCAT(g.first_name, ' ', g.last_name) AS guide_name,
            CAST(DATEDIFF(t.end_date, t.start_date) + 1 AS SIGNED) AS duration
         FROM tours t
         LEFT JOIN guides g ON t.guide_id = g.guide_id
         ORDER BY t.start_date, t.tour_id",
    )
    .fetch_all(pool)
    .await?;

    for tour in &mut tours {
        tour.seats_left = seats_left(tour.seat, tour.seats_booked);
    }
    Ok(tours)
}

pub async fn find_tour(pool: &Db, tour_id: u64) -> AppResult<Tour> {
    sqlx::query_as::<_, Tour>(
        "SELECT tour_id, tour_name, price, description, country, start_date, end_date,
                seat, seats_booked, image, guide_id
         FROM tours WHERE tour_id = ?",
    )
    .bind(tour_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(MSG_TOUR_NOT_FOUND.into()))
}

/// Guides offered in the tour create/edit forms.
pub async fn guide_choices(pool: &Db) -> AppResult<Vec<GuideChoice>> {
    let guides = sqlx::query_as::<_, GuideChoice>(
        "SELECT guide_id, first_name, last_name FROM guides ORDER BY first_name, last_name",
    )
    .fetch_all(pool)
    .await?;
    Ok(guides)
}

pub async fn guide_exists(pool: &Db, guide_id: u64) -> AppResult<bool> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM guides WHERE guide_id = ?)")
        .bind(guide_id)
        .fetch_one(pool)
        .await?;
    Ok(exists)
}
