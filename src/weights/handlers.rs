use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::Json;
use time::format_description::FormatItem;
use time::macros::format_description;
use time::OffsetDateTime;
use tracing::{debug, instrument};

use crate::error::ApiError;
use crate::state::AppState;
use crate::weights::dto::{AddWeightRequest, AddWeightResponse, HistoryEntry, HistoryQuery};
use crate::weights::repo::WeightEntry;

const DATE_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Server-local date in `YYYY-MM-DD`; falls back to UTC when the local
/// offset cannot be determined (time crate refuses it on some platforms
/// once threads are running).
pub(crate) fn today() -> String {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    now.date()
        .format(DATE_FORMAT)
        .unwrap_or_else(|_| now.date().to_string())
}

/// POST /api/add_weight — insert one row dated today. The username is taken
/// at face value; no existence check against `users`.
#[instrument(skip(state, payload))]
pub async fn add_weight(
    State(state): State<AppState>,
    payload: Result<Json<AddWeightRequest>, JsonRejection>,
) -> Result<Json<AddWeightResponse>, ApiError> {
    let Json(payload) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let (Some(username), Some(weight)) = (payload.username, payload.weight) else {
        return Err(ApiError::BadRequest(
            "username and weight are required".into(),
        ));
    };

    let date = today();
    let id = WeightEntry::insert(&state.db, &username, weight, &date).await?;
    debug!(%username, weight, id, %date, "weight recorded");

    Ok(Json(AddWeightResponse { success: true }))
}

/// GET /api/history?username= — all rows for the username, ascending by
/// date. A missing or unknown username yields an empty list, not an error.
#[instrument(skip(state))]
pub async fn history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<HistoryEntry>>, ApiError> {
    let Some(username) = query.username else {
        return Ok(Json(Vec::new()));
    };

    let rows = WeightEntry::list_by_user(&state.db, &username).await?;
    debug!(%username, count = rows.len(), "history fetched");
    Ok(Json(rows))
}
