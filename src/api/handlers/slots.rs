use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    api::state::AppState,
    domain::AvailableSlots,
    error::{AppError, Result},
};

#[derive(Debug, Deserialize)]
pub struct SlotQuery {
    pub date: NaiveDate,
    pub duration: Option<i32>,
    /// Used for the duration when `duration` is omitted.
    pub service_id: Option<Uuid>,
}

pub async fn available_slots(
    State(state): State<AppState>,
    Path(provider_id): Path<Uuid>,
    Query(query): Query<SlotQuery>,
) -> Result<Json<AvailableSlots>> {
    let duration = match (query.duration, query.service_id) {
        (Some(duration), _) => duration,
        (None, Some(service_id)) => {
            let service = state
                .service_context
                .catalog_repo
                .find_service(service_id)
                .await?
                .filter(|s| s.provider_id == provider_id)
                .ok_or(AppError::ServiceNotFound(service_id))?;
            service.duration_minutes.ok_or_else(|| {
                AppError::Validation(format!("Service {} has no duration; pass one explicitly", service_id))
            })?
        }
        (None, None) => {
            return Err(AppError::Validation(
                "Either duration or service_id is required".to_string(),
            ))
        }
    };

    let slots = state
        .service_context
        .slot_resolver
        .resolve(provider_id, query.date, duration)
        .await?;

    Ok(Json(slots))
}
