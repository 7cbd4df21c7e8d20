use chrono::{NaiveDate, NaiveTime, Timelike};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain::{
        BlockDateRequest, CreateAvailabilityRequest, DayOfWeek, ProviderAvailability,
        ProviderBlockedDate, UpdateAvailabilityRequest,
    },
    error::{AppError, Result},
    repository::AvailabilityRepository,
};

pub struct AvailabilityService {
    repo: Arc<dyn AvailabilityRepository>,
}

impl AvailabilityService {
    pub fn new(repo: Arc<dyn AvailabilityRepository>) -> Self {
        Self { repo }
    }

    pub async fn list_windows(&self, provider_id: Uuid) -> Result<Vec<ProviderAvailability>> {
        self.repo.list_windows(provider_id).await
    }

    pub async fn add_window(&self, provider_id: Uuid, mut request: CreateAvailabilityRequest) -> Result<ProviderAvailability> {
        request.start_time = truncate_to_minute(request.start_time);
        request.end_time = truncate_to_minute(request.end_time);

        validate_window(request.start_time, request.end_time)?;
        self.ensure_no_overlap(provider_id, None, request.day_of_week, request.start_time, request.end_time)
            .await?;

        let window = self.repo.create_window(provider_id, request).await?;
        tracing::info!(
            "Provider {} added {} window {}-{}",
            provider_id,
            window.day_of_week.as_str(),
            window.start_time.format("%H:%M"),
            window.end_time.format("%H:%M")
        );
        Ok(window)
    }

    pub async fn update_window(
        &self,
        provider_id: Uuid,
        window_id: Uuid,
        mut update: UpdateAvailabilityRequest,
    ) -> Result<ProviderAvailability> {
        let existing = self.owned_window(provider_id, window_id).await?;

        if update.is_empty() {
            return Ok(existing);
        }

        update.start_time = update.start_time.map(truncate_to_minute);
        update.end_time = update.end_time.map(truncate_to_minute);

        let day = update.day_of_week.unwrap_or(existing.day_of_week);
        let start = update.start_time.unwrap_or(existing.start_time);
        let end = update.end_time.unwrap_or(existing.end_time);

        validate_window(start, end)?;
        self.ensure_no_overlap(provider_id, Some(window_id), day, start, end)
            .await?;

        self.repo.update_window(window_id, update).await
    }

    pub async fn remove_window(&self, provider_id: Uuid, window_id: Uuid) -> Result<()> {
        self.owned_window(provider_id, window_id).await?;
        self.repo.delete_window(window_id).await
    }

    pub async fn list_blocked_dates(&self, provider_id: Uuid) -> Result<Vec<ProviderBlockedDate>> {
        self.repo.list_blocked_dates(provider_id).await
    }

    /// Blocking an already blocked date replaces its reason.
    pub async fn block_date(&self, provider_id: Uuid, request: BlockDateRequest) -> Result<ProviderBlockedDate> {
        let blocked = self.repo.block_date(provider_id, request).await?;
        tracing::info!("Provider {} blocked {}", provider_id, blocked.blocked_date);
        Ok(blocked)
    }

    pub async fn unblock_date(&self, provider_id: Uuid, date: NaiveDate) -> Result<()> {
        if !self.repo.unblock_date(provider_id, date).await? {
            return Err(AppError::NotFound(format!("{} is not blocked", date)));
        }
        Ok(())
    }

    async fn owned_window(&self, provider_id: Uuid, window_id: Uuid) -> Result<ProviderAvailability> {
        self.repo
            .find_window(window_id)
            .await?
            .filter(|w| w.provider_id == provider_id)
            .ok_or_else(|| AppError::NotFound("Availability window not found".to_string()))
    }

    async fn ensure_no_overlap(
        &self,
        provider_id: Uuid,
        ignore: Option<Uuid>,
        day: DayOfWeek,
        start: NaiveTime,
        end: NaiveTime,
    ) -> Result<()> {
        let clash = self
            .repo
            .list_windows(provider_id)
            .await?
            .into_iter()
            .filter(|w| Some(w.id) != ignore && w.day_of_week == day)
            .find(|w| w.overlaps(start, end));

        match clash {
            Some(w) => Err(AppError::Conflict(format!(
                "Window overlaps existing {} window {}-{}",
                day.as_str(),
                w.start_time.format("%H:%M"),
                w.end_time.format("%H:%M")
            ))),
            None => Ok(()),
        }
    }
}

fn truncate_to_minute(time: NaiveTime) -> NaiveTime {
    NaiveTime::from_hms_opt(time.hour(), time.minute(), 0).unwrap_or(time)
}

fn validate_window(start: NaiveTime, end: NaiveTime) -> Result<()> {
    if start >= end {
        return Err(AppError::Validation(format!(
            "Window start {} must be before its end {}",
            start.format("%H:%M"),
            end.format("%H:%M")
        )));
    }
    Ok(())
}
