use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::parse_time;
use crate::{
    api::{middleware::auth::CurrentUser, state::AppState},
    domain::{
        BlockDateRequest, CreateAvailabilityRequest, DayOfWeek, ProviderAvailability,
        ProviderBlockedDate, UpdateAvailabilityRequest,
    },
    error::{AppError, Result},
};

#[derive(Debug, Deserialize)]
pub struct CreateWindowDto {
    pub day_of_week: DayOfWeek,
    pub start_time: String,
    pub end_time: String,
    pub is_available: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateWindowDto {
    pub day_of_week: Option<DayOfWeek>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub is_available: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct BlockDateDto {
    pub blocked_date: NaiveDate,
    #[validate(length(max = 500))]
    pub reason: Option<String>,
}

fn ensure_manager(user: &CurrentUser, provider_id: Uuid) -> Result<()> {
    if user.can_manage_provider(provider_id) {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

pub async fn list_windows(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(provider_id): Path<Uuid>,
) -> Result<Json<Vec<ProviderAvailability>>> {
    ensure_manager(&user, provider_id)?;
    let windows = state
        .service_context
        .availability_service
        .list_windows(provider_id)
        .await?;
    Ok(Json(windows))
}

pub async fn create_window(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(provider_id): Path<Uuid>,
    Json(dto): Json<CreateWindowDto>,
) -> Result<(StatusCode, Json<ProviderAvailability>)> {
    ensure_manager(&user, provider_id)?;

    let request = CreateAvailabilityRequest {
        day_of_week: dto.day_of_week,
        start_time: parse_time(&dto.start_time)?,
        end_time: parse_time(&dto.end_time)?,
        is_available: dto.is_available.unwrap_or(true),
    };

    let window = state
        .service_context
        .availability_service
        .add_window(provider_id, request)
        .await?;

    Ok((StatusCode::CREATED, Json(window)))
}

pub async fn update_window(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path((provider_id, window_id)): Path<(Uuid, Uuid)>,
    Json(dto): Json<UpdateWindowDto>,
) -> Result<Json<ProviderAvailability>> {
    ensure_manager(&user, provider_id)?;

    let update = UpdateAvailabilityRequest {
        day_of_week: dto.day_of_week,
        start_time: dto.start_time.as_deref().map(parse_time).transpose()?,
        end_time: dto.end_time.as_deref().map(parse_time).transpose()?,
        is_available: dto.is_available,
    };

    let window = state
        .service_context
        .availability_service
        .update_window(provider_id, window_id, update)
        .await?;

    Ok(Json(window))
}

pub async fn delete_window(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path((provider_id, window_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode> {
    ensure_manager(&user, provider_id)?;
    state
        .service_context
        .availability_service
        .remove_window(provider_id, window_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_blocked_dates(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(provider_id): Path<Uuid>,
) -> Result<Json<Vec<ProviderBlockedDate>>> {
    ensure_manager(&user, provider_id)?;
    let dates = state
        .service_context
        .availability_service
        .list_blocked_dates(provider_id)
        .await?;
    Ok(Json(dates))
}

pub async fn block_date(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(provider_id): Path<Uuid>,
    Json(dto): Json<BlockDateDto>,
) -> Result<(StatusCode, Json<ProviderBlockedDate>)> {
    ensure_manager(&user, provider_id)?;
    dto.validate()?;

    let blocked = state
        .service_context
        .availability_service
        .block_date(
            provider_id,
            BlockDateRequest {
                blocked_date: dto.blocked_date,
                reason: dto.reason,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(blocked)))
}

pub async fn unblock_date(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path((provider_id, date)): Path<(Uuid, NaiveDate)>,
) -> Result<StatusCode> {
    ensure_manager(&user, provider_id)?;
    state
        .service_context
        .availability_service
        .unblock_date(provider_id, date)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
