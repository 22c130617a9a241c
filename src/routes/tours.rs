//! `/admin/manageTour`: tour catalogue management for staff and admins.

use axum::{
    extract::{Extension, Path, State},
    response::Redirect,
    routing::get,
    Router,
};
use chrono::NaiveDate;

use crate::{
    db::is_foreign_key_violation,
    errors::{AppError, AppResult},
    middleware::user_context::RequestContext,
    routes::parse_id,
    services::{
        bookings::MSG_TOUR_NOT_FOUND,
        tours::{find_tour, guide_choices, guide_exists, list_tours},
    },
    sql::{TourColumn, UpdateBuilder},
    state::AppState,
    uploads::{FormFields, SubmittedForm, UploadKind},
    views::Page,
};

const MSG_BAD_TOUR_ID: &str = "รหัสทัวร์ไม่ถูกต้อง";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/manageTour",                  get(list))
        .route("/admin/manageTour/create",           get(create_page).post(create))
        .route("/admin/manageTour/edit/{tour_id}",   get(edit_page).post(update))
        .route("/admin/manageTour/delete/{tour_id}", get(delete))
}

// ── Form ─────────────────────────────────────────────────────

/// Validated contents of the tour create/edit form.
#[derive(Debug, Clone, PartialEq)]
struct TourInput {
    tour_name:   String,
    price:       u32,
    description: String,
    country:     String,
    start_date:  NaiveDate,
    end_date:    NaiveDate,
    seat:        u32,
    guide_id:    Option<u64>,
}

fn parse_date(fields: &FormFields, name: &str) -> AppResult<NaiveDate> {
    fields
        .get(name)
        .and_then(|raw| NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok())
        .ok_or_else(|| AppError::BadRequest("รูปแบบวันที่ไม่ถูกต้อง".into()))
}

impl TourInput {
    fn from_fields(fields: &FormFields) -> AppResult<Self> {
        let tour_name = fields.require("tour_name", "กรุณากรอกชื่อทัวร์")?;
        let price = fields
            .get("price")
            .and_then(|raw| raw.parse::<u32>().ok())
            .ok_or_else(|| AppError::BadRequest("ราคาไม่ถูกต้อง".into()))?;
        let seat = fields
            .get("seat")
            .and_then(|raw| raw.parse::<u32>().ok())
            .filter(|seat| *seat >= 1)
            .ok_or_else(|| AppError::BadRequest("จำนวนที่นั่งต้องเป็นตัวเลขอย่างน้อย 1".into()))?;

        let start_date = parse_date(fields, "start_date")?;
        let end_date = parse_date(fields, "end_date")?;
        if end_date < start_date {
            return Err(AppError::BadRequest("วันสิ้นสุดต้องไม่มาก่อนวันเริ่มต้น".into()));
        }

        let guide_id = match fields.get("guide") {
            None => None,
            Some(raw) => Some(
                raw.parse::<u64>()
                    .map_err(|_| AppError::BadRequest("ไกด์ไม่ถูกต้อง".into()))?,
            ),
        };

        Ok(Self {
            tour_name,
            price,
            description: fields.text("description"),
            country:     fields.text("country"),
            start_date,
            end_date,
            seat,
            guide_id,
        })
    }

    async fn check_guide(&self, state: &AppState) -> AppResult<()> {
        match self.guide_id {
            Some(guide_id) if !guide_exists(&state.pool, guide_id).await? => {
                Err(AppError::BadRequest("ไม่พบไกด์ที่เลือก".into()))
            }
            _ => Ok(()),
        }
    }
}

// ── Handlers ─────────────────────────────────────────────────

async fn list(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> AppResult<Page> {
    let tours = list_tours(&state.pool).await?;
    Ok(Page::new("adminSystem/manageTour", &ctx).with("tours", tours))
}

async fn create_page(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> AppResult<Page> {
    let guides = guide_choices(&state.pool).await?;
    Ok(Page::new("adminSystem/createTour", &ctx).with("guides", guides))
}

async fn create(
    State(state): State<AppState>,
    mut form: SubmittedForm,
) -> AppResult<Redirect> {
    let input = TourInput::from_fields(&form.fields)?;
    input.check_guide(&state).await?;

    let image = match form.take_file("image") {
        Some(file) => Some(state.uploads.save(&file, UploadKind::Image).await?),
        None => None,
    };

    let inserted = sqlx::query(
        "INSERT INTO tours
            (tour_name, price, description, country, start_date, end_date, seat, image, guide_id)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&input.tour_name)
    .bind(input.price)
    .bind(&input.description)
    .bind(&input.country)
    .bind(input.start_date)
    .bind(input.end_date)
    .bind(input.seat)
    .bind(&image)
    .bind(input.guide_id)
    .execute(&state.pool)
    .await;

    match inserted {
        Ok(result) => {
            tracing::info!(tour_id = result.last_insert_id(), name = %input.tour_name, "Tour created");
            Ok(Redirect::to("/admin/manageTour"))
        }
        Err(err) => {
            if let Some(name) = &image {
                state.uploads.remove(name).await;
            }
            Err(err.into())
        }
    }
}

async fn edit_page(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(tour_id): Path<String>,
) -> AppResult<Page> {
    let tour_id = parse_id(&tour_id, MSG_BAD_TOUR_ID)?;
    let tour = find_tour(&state.pool, tour_id).await?;
    let guides = guide_choices(&state.pool).await?;
    Ok(Page::new("adminSystem/editTour", &ctx)
        .with("tour", tour)
        .with("guides", guides))
}

#[derive(sqlx::FromRow)]
struct LockedTour {
    seats_booked: u32,
    image:        Option<String>,
}

/// POST /admin/manageTour/edit/{tour_id}
///
/// The tour row stays locked while the new capacity is checked against the
/// seats already sold, so a booking cannot slip in between.
async fn update(
    State(state): State<AppState>,
    Path(tour_id): Path<String>,
    mut form: SubmittedForm,
) -> AppResult<Redirect> {
    let tour_id = parse_id(&tour_id, MSG_BAD_TOUR_ID)?;
    let input = TourInput::from_fields(&form.fields)?;
    input.check_guide(&state).await?;

    let mut tx = state.pool.begin().await?;
    let current = sqlx::query_as::<_, LockedTour>(
        "SELECT seats_booked, image FROM tours WHERE tour_id = ? FOR UPDATE",
    )
    .bind(tour_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::NotFound(MSG_TOUR_NOT_FOUND.into()))?;

    if input.seat < current.seats_booked {
        return Err(AppError::BadRequest(format!(
            "จำนวนที่นั่งต้องไม่น้อยกว่าที่จองไปแล้ว ({} ที่นั่ง)",
            current.seats_booked
        )));
    }

    let new_image = match form.take_file("image") {
        Some(file) => Some(state.uploads.save(&file, UploadKind::Image).await?),
        None => None,
    };

    let mut query = UpdateBuilder::<TourColumn>::new()
        .set(TourColumn::TourName, input.tour_name)
        .set(TourColumn::Price, input.price)
        .set(TourColumn::Description, input.description)
        .set(TourColumn::Country, input.country)
        .set(TourColumn::StartDate, input.start_date)
        .set(TourColumn::EndDate, input.end_date)
        .set(TourColumn::Seat, input.seat)
        .set(TourColumn::GuideId, input.guide_id)
        .set_some(TourColumn::Image, new_image.clone())
        .where_key(tour_id)?;

    let executed = query.build().execute(&mut *tx).await;
    let written = match executed {
        Ok(_) => tx.commit().await,
        Err(err) => Err(err),
    };
    if let Err(err) = written {
        if let Some(name) = &new_image {
            state.uploads.remove(name).await;
        }
        return Err(err.into());
    }

    if let (Some(_), Some(old)) = (&new_image, &current.image) {
        state.uploads.remove(old).await;
    }
    tracing::info!(tour_id, image_replaced = new_image.is_some(), "Tour updated");

    Ok(Redirect::to("/admin/manageTour"))
}

async fn delete(
    State(state): State<AppState>,
    Path(tour_id): Path<String>,
) -> AppResult<Redirect> {
    let tour_id = parse_id(&tour_id, MSG_BAD_TOUR_ID)?;
    let tour = find_tour(&state.pool, tour_id).await?;

    let deleted = sqlx::query("DELETE FROM tours WHERE tour_id = ?")
        .bind(tour_id)
        .execute(&state.pool)
        .await;
    let affected = match deleted {
        Ok(result) => result.rows_affected(),
        Err(err) if is_foreign_key_violation(&err) => {
            return Err(AppError::Conflict("ไม่สามารถลบทัวร์ที่ยังมีการจองอยู่ได้".into()));
        }
        Err(err) => return Err(err.into()),
    };
    if affected == 0 {
        return Err(AppError::NotFound(MSG_TOUR_NOT_FOUND.into()));
    }

    if let Some(image) = &tour.image {
        state.uploads.remove(image).await;
    }
    tracing::info!(tour_id, "Tour deleted");

    Ok(Redirect::to("/admin/manageTour"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn fields(pairs: &[(&str, &str)]) -> FormFields {
        FormFields::from(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>(),
        )
    }

    fn with(overrides: &[(&'static str, &'static str)]) -> FormFields {
        let mut pairs: Vec<(&str, &str)> = vec![
            ("tour_name", "Chiang Mai Highlights"),
            ("price", "15900"),
            ("description", "Temples and night markets"),
            ("country", "Thailand"),
            ("start_date", "2025-11-01"),
            ("end_date", "2025-11-04"),
            ("seat", "30"),
            ("guide", "2"),
        ];
        for (key, value) in overrides {
            pairs.retain(|(k, _)| k != key);
            pairs.push((key, value));
        }
        fields(&pairs)
    }

    #[test]
    fn complete_form_parses() {
        let input = TourInput::from_fields(&with(&[])).unwrap();
        assert_eq!(input.price, 15_900);
        assert_eq!(input.seat, 30);
        assert_eq!(input.guide_id, Some(2));
        assert_eq!(input.end_date, NaiveDate::from_ymd_opt(2025, 11, 4).unwrap());
    }

    #[test]
    fn blank_guide_means_no_guide() {
        let input = TourInput::from_fields(&with(&[("guide", "")])).unwrap();
        assert_eq!(input.guide_id, None);
    }

    #[test]
    fn same_day_tour_is_allowed() {
        let input = TourInput::from_fields(&with(&[("end_date", "2025-11-01")])).unwrap();
        assert_eq!(input.start_date, input.end_date);
    }

    #[test]
    fn invalid_values_are_rejected() {
        for overrides in [
            &[("tour_name", "  ")][..],
            &[("price", "cheap")],
            &[("price", "-1")],
            &[("seat", "0")],
            &[("seat", "many")],
            &[("start_date", "01/11/2025")],
            &[("end_date", "2025-10-31")],
            &[("guide", "someone")],
        ] {
            let result = TourInput::from_fields(&with(overrides));
            assert!(matches!(result, Err(AppError::BadRequest(_))), "accepted {overrides:?}");
        }
    }
}
