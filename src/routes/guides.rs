//! `/admin/manageGuide`: admin-only guide management.

use axum::{
    extract::{Extension, Path, State},
    response::Redirect,
    routing::{get, post},
    Router,
};

use crate::{
    errors::{AppError, AppResult},
    middleware::user_context::RequestContext,
    models::Guide,
    routes::parse_id,
    sql::{GuideColumn, UpdateBuilder},
    state::AppState,
    uploads::{FormFields, SubmittedForm},
    views::Page,
};

const MSG_BAD_GUIDE_ID: &str = "รหัสไกด์ไม่ถูกต้อง";
const MSG_GUIDE_NOT_FOUND: &str = "ไม่พบข้อมูลไกด์";

const GUIDE_COLUMNS: &str = "guide_id, first_name, last_name, email, phone, gender";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/manageGuide",                   get(list))
        .route("/admin/manageGuide/create",            post(create))
        .route("/admin/manageGuide/edit/{guide_id}",   get(edit_page).post(update))
        .route("/admin/manageGuide/delete/{guide_id}", get(delete))
}

#[derive(Debug, PartialEq)]
struct GuideInput {
    first_name: String,
    last_name:  String,
    email:      String,
    phone:      String,
    gender:     String,
}

impl GuideInput {
    fn from_fields(fields: &FormFields) -> AppResult<Self> {
        Ok(Self {
            first_name: fields.require("firstname", "กรุณากรอกชื่อ")?,
            last_name:  fields.require("lastname", "กรุณากรอกนามสกุล")?,
            email:      fields.text("email"),
            phone:      fields.text("phone"),
            gender:     fields.text("gender"),
        })
    }
}

async fn list(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> AppResult<Page> {
    let guides = sqlx::query_as::<_, Guide>(&format!(
        "SELECT {GUIDE_COLUMNS} FROM guides ORDER BY guide_id"
    ))
    .fetch_all(&state.pool)
    .await?;
    Ok(Page::new("adminSystem/manageGuide", &ctx).with("guides", guides))
}

async fn create(
    State(state): State<AppState>,
    form: SubmittedForm,
) -> AppResult<Redirect> {
    let input = GuideInput::from_fields(&form.fields)?;
    let guide_id = sqlx::query(
        "INSERT INTO guides (first_name, last_name, email, phone, gender) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&input.first_name)
    .bind(&input.last_name)
    .bind(&input.email)
    .bind(&input.phone)
    .bind(&input.gender)
    .execute(&state.pool)
    .await?
    .last_insert_id();
    tracing::info!(guide_id, "Guide created");

    Ok(Redirect::to("/admin/manageGuide"))
}

async fn edit_page(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(guide_id): Path<String>,
) -> AppResult<Page> {
    let guide_id = parse_id(&guide_id, MSG_BAD_GUIDE_ID)?;
    let guide = sqlx::query_as::<_, Guide>(&format!(
        "SELECT {GUIDE_COLUMNS} FROM guides WHERE guide_id = ?"
    ))
    .bind(guide_id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| AppError::NotFound(MSG_GUIDE_NOT_FOUND.into()))?;
    Ok(Page::new("adminSystem/editGuide", &ctx).with("guide", guide))
}

async fn update(
    State(state): State<AppState>,
    Path(guide_id): Path<String>,
    form: SubmittedForm,
) -> AppResult<Redirect> {
    let guide_id = parse_id(&guide_id, MSG_BAD_GUIDE_ID)?;
    let input = GuideInput::from_fields(&form.fields)?;

    let mut query = UpdateBuilder::<GuideColumn>::new()
        .set(GuideColumn::FirstName, input.first_name)
        .set(GuideColumn::LastName, input.last_name)
        .set(GuideColumn::Email, input.email)
        .set(GuideColumn::Phone, input.phone)
        .set(GuideColumn::Gender, input.gender)
        .where_key(guide_id)?;
    let matched = query.build().execute(&state.pool).await?.rows_affected();
    if matched == 0 {
        return Err(AppError::NotFound(MSG_GUIDE_NOT_FOUND.into()));
    }
    tracing::info!(guide_id, "Guide updated");

    Ok(Redirect::to("/admin/manageGuide"))
}

/// Tours led by the guide keep running without one.
async fn delete(
    State(state): State<AppState>,
    Path(guide_id): Path<String>,
) -> AppResult<Redirect> {
    let guide_id = parse_id(&guide_id, MSG_BAD_GUIDE_ID)?;
    let affected = sqlx::query("DELETE FROM guides WHERE guide_id = ?")
        .bind(guide_id)
        .execute(&state.pool)
        .await?
        .rows_affected();
    if affected == 0 {
        return Err(AppError::NotFound(MSG_GUIDE_NOT_FOUND.into()));
    }
    tracing::info!(guide_id, "Guide deleted");

    Ok(Redirect::to("/admin/manageGuide"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn names_are_required_and_the_rest_is_optional() {
        let fields = FormFields::from(HashMap::from([
            ("firstname".to_string(), " Malee ".to_string()),
            ("lastname".to_string(), "Sukjai".to_string()),
        ]));
        let input = GuideInput::from_fields(&fields).unwrap();
        assert_eq!(input.first_name, "Malee");
        assert_eq!(input.email, "");
        assert_eq!(input.gender, "");

        let nameless = FormFields::from(HashMap::from([("lastname".to_string(), "Sukjai".to_string())]));
        assert!(matches!(GuideInput::from_fields(&nameless), Err(AppError::BadRequest(_))));
    }
}
