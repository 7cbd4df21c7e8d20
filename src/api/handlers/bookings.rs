use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::parse_time;
use crate::{
    api::{
        middleware::auth::{CurrentUser, Role},
        state::AppState,
    },
    domain::{
        AddonSelection, Booking, BookingDetails, BookingStatus, BookingStatusChange,
        CreateBookingRequest, PaymentMethod, PaymentStatus, TransitionOptions,
    },
    error::{AppError, Result},
};

#[derive(Debug, Deserialize, Validate)]
pub struct AddonDto {
    pub addon_id: Uuid,
    #[validate(range(min = 1, max = 99))]
    pub quantity: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateBookingDto {
    pub service_id: Uuid,
    pub address_id: Option<Uuid>,
    pub scheduled_date: NaiveDate,
    /// `HH:MM`, or `HH:MM:SS` with the seconds dropped.
    pub scheduled_time: String,
    #[serde(default)]
    #[validate(nested)]
    pub addons: Vec<AddonDto>,
    pub payment_method: PaymentMethod,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(dto): Json<CreateBookingDto>,
) -> Result<(StatusCode, Json<BookingDetails>)> {
    if user.role != Role::Customer {
        return Err(AppError::Forbidden);
    }
    dto.validate()?;

    let request = CreateBookingRequest {
        customer_id: user.user_id,
        service_id: dto.service_id,
        address_id: dto.address_id,
        scheduled_date: dto.scheduled_date,
        scheduled_time: parse_time(&dto.scheduled_time)?,
        addons: dto
            .addons
            .into_iter()
            .map(|a| AddonSelection {
                addon_id: a.addon_id,
                quantity: a.quantity,
            })
            .collect(),
        payment_method: dto.payment_method,
        notes: dto.notes,
        payment_status: PaymentStatus::Pending,
    };

    let details = state.service_context.booking_ledger.create(request).await?;

    Ok((StatusCode::CREATED, Json(details)))
}

pub async fn get(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<BookingDetails>> {
    let booking = load_visible(&state, &user, id).await?;
    let addons = state.service_context.booking_repo.find_addon_lines(id).await?;

    Ok(Json(BookingDetails { booking, addons }))
}

pub async fn history(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<BookingStatusChange>>> {
    load_visible(&state, &user, id).await?;
    let history = state.service_context.booking_repo.list_status_history(id).await?;

    Ok(Json(history))
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(default = "default_limit")]
    limit: i64,
    #[serde(default)]
    offset: i64,
    /// Admins only.
    customer_id: Option<Uuid>,
    /// Admins only.
    provider_id: Option<Uuid>,
}

fn default_limit() -> i64 {
    50
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    bookings: Vec<Booking>,
    total: usize,
}

pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(params): Query<ListParams>,
) -> Result<Json<ListResponse>> {
    let repo = &state.service_context.booking_repo;
    let limit = params.limit.clamp(1, 200);
    let offset = params.offset.max(0);

    let bookings = match user.role {
        Role::Customer => repo.list_for_customer(user.user_id, limit, offset).await?,
        Role::Provider => repo.list_for_provider(user.user_id, limit, offset).await?,
        Role::Admin => match (params.customer_id, params.provider_id) {
            (Some(customer_id), _) => repo.list_for_customer(customer_id, limit, offset).await?,
            (None, Some(provider_id)) => repo.list_for_provider(provider_id, limit, offset).await?,
            (None, None) => {
                return Err(AppError::BadRequest(
                    "customer_id or provider_id is required".to_string(),
                ))
            }
        },
    };

    let total = bookings.len();
    Ok(Json(ListResponse { bookings, total }))
}

#[derive(Debug, Deserialize, Validate)]
pub struct TransitionDto {
    pub status: BookingStatus,
    #[validate(length(max = 1000))]
    pub cancellation_reason: Option<String>,
    #[validate(length(max = 1000))]
    pub provider_notes: Option<String>,
}

pub async fn transition(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(dto): Json<TransitionDto>,
) -> Result<Json<Booking>> {
    dto.validate()?;

    let booking = state
        .service_context
        .booking_repo
        .find_by_id(id)
        .await?
        .ok_or(AppError::BookingNotFound(id))?;

    let permitted = match dto.status {
        BookingStatus::Cancelled => {
            user.is_admin() || (user.role == Role::Customer && user.user_id == booking.customer_id)
        }
        _ => user.can_manage_provider(booking.provider_id),
    };
    if !permitted {
        return Err(AppError::Forbidden);
    }

    let options = TransitionOptions {
        cancellation_reason: dto.cancellation_reason,
        provider_notes: dto.provider_notes,
    };

    let updated = state
        .service_context
        .booking_state_machine
        .transition(id, dto.status, options, Some(user.user_id))
        .await?;

    Ok(Json(updated))
}

async fn load_visible(state: &AppState, user: &CurrentUser, id: Uuid) -> Result<Booking> {
    let booking = state
        .service_context
        .booking_repo
        .find_by_id(id)
        .await?
        .ok_or(AppError::BookingNotFound(id))?;

    let visible = user.is_admin()
        || (user.role == Role::Customer && user.user_id == booking.customer_id)
        || (user.role == Role::Provider && user.user_id == booking.provider_id);

    if !visible {
        return Err(AppError::Forbidden);
    }
    Ok(booking)
}
