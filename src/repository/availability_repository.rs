use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{
        BlockDateRequest, CreateAvailabilityRequest, DayOfWeek, ProviderAvailability,
        ProviderBlockedDate, UpdateAvailabilityRequest,
    },
    error::{AppError, Result},
    repository::{parse_uuid, AvailabilityRepository},
};

#[derive(FromRow)]
struct AvailabilityRow {
    id: String,
    provider_id: String,
    day_of_week: String,
    start_time: NaiveTime,
    end_time: NaiveTime,
    is_available: i32,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

#[derive(FromRow)]
struct BlockedDateRow {
    id: String,
    provider_id: String,
    blocked_date: NaiveDate,
    reason: Option<String>,
    created_at: NaiveDateTime,
}

pub struct SqliteAvailabilityRepository {
    pool: SqlitePool,
}

impl SqliteAvailabilityRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_window(row: AvailabilityRow) -> Result<ProviderAvailability> {
        Ok(ProviderAvailability {
            id: parse_uuid(&row.id)?,
            provider_id: parse_uuid(&row.provider_id)?,
            day_of_week: DayOfWeek::parse(&row.day_of_week).ok_or_else(|| {
                AppError::Database(format!("Invalid day of week: {}", row.day_of_week))
            })?,
            start_time: row.start_time,
            end_time: row.end_time,
            is_available: row.is_available != 0,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
            updated_at: DateTime::from_naive_utc_and_offset(row.updated_at, Utc),
        })
    }

    fn row_to_blocked_date(row: BlockedDateRow) -> Result<ProviderBlockedDate> {
        Ok(ProviderBlockedDate {
            id: parse_uuid(&row.id)?,
            provider_id: parse_uuid(&row.provider_id)?,
            blocked_date: row.blocked_date,
            reason: row.reason,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
        })
    }

    async fn find_blocked_date(&self, provider_id: Uuid, date: NaiveDate) -> Result<Option<ProviderBlockedDate>> {
        let row = sqlx::query_as::<_, BlockedDateRow>(
            r#"
            SELECT id, provider_id, blocked_date, reason, created_at
            FROM provider_blocked_dates
            WHERE provider_id = ? AND blocked_date = ?
            "#
        )
        .bind(provider_id.to_string())
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_blocked_date).transpose()
    }
}

#[async_trait]
impl AvailabilityRepository for SqliteAvailabilityRepository {
    async fn create_window(&self, provider_id: Uuid, request: CreateAvailabilityRequest) -> Result<ProviderAvailability> {
        let id = Uuid::new_v4();
        let now = Utc::now().naive_utc();

        sqlx::query(
            r#"
            INSERT INTO provider_availability (
                id, provider_id, day_of_week, start_time, end_time,
                is_available, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#
        )
        .bind(id.to_string())
        .bind(provider_id.to_string())
        .bind(request.day_of_week.as_str())
        .bind(request.start_time)
        .bind(request.end_time)
        .bind(request.is_available as i32)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.find_window(id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve created availability window".to_string())
        })
    }

    async fn find_window(&self, id: Uuid) -> Result<Option<ProviderAvailability>> {
        let row = sqlx::query_as::<_, AvailabilityRow>(
            r#"
            SELECT id, provider_id, day_of_week, start_time, end_time,
                   is_available, created_at, updated_at
            FROM provider_availability
            WHERE id = ?
            "#
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_window).transpose()
    }

    async fn list_windows(&self, provider_id: Uuid) -> Result<Vec<ProviderAvailability>> {
        let rows = sqlx::query_as::<_, AvailabilityRow>(
            r#"
            SELECT id, provider_id, day_of_week, start_time, end_time,
                   is_available, created_at, updated_at
            FROM provider_availability
            WHERE provider_id = ?
            ORDER BY CASE day_of_week
                WHEN 'monday' THEN 1 WHEN 'tuesday' THEN 2 WHEN 'wednesday' THEN 3
                WHEN 'thursday' THEN 4 WHEN 'friday' THEN 5 WHEN 'saturday' THEN 6
                ELSE 7 END,
                start_time ASC
            "#
        )
        .bind(provider_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_window).collect()
    }

    async fn list_open_windows(&self, provider_id: Uuid, day: DayOfWeek) -> Result<Vec<ProviderAvailability>> {
        let rows = sqlx::query_as::<_, AvailabilityRow>(
            r#"
            SELECT id, provider_id, day_of_week, start_time, end_time,
                   is_available, created_at, updated_at
            FROM provider_availability
            WHERE provider_id = ? AND day_of_week = ? AND is_available = 1
            ORDER BY start_time ASC
            "#
        )
        .bind(provider_id.to_string())
        .bind(day.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_window).collect()
    }

    async fn update_window(&self, id: Uuid, update: UpdateAvailabilityRequest) -> Result<ProviderAvailability> {
        let now = Utc::now().naive_utc();

        let result = sqlx::query(
            r#"
            UPDATE provider_availability
            SET day_of_week = COALESCE(?, day_of_week),
                start_time = COALESCE(?, start_time),
                end_time = COALESCE(?, end_time),
                is_available = COALESCE(?, is_available),
                updated_at = ?
            WHERE id = ?
            "#
        )
        .bind(update.day_of_week.map(|d| d.as_str()))
        .bind(update.start_time)
        .bind(update.end_time)
        .bind(update.is_available.map(|b| b as i32))
        .bind(now)
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Availability window not found".to_string()));
        }

        self.find_window(id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve updated availability window".to_string())
        })
    }

    async fn delete_window(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM provider_availability WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Availability window not found".to_string()));
        }

        Ok(())
    }

    async fn block_date(&self, provider_id: Uuid, request: BlockDateRequest) -> Result<ProviderBlockedDate> {
        sqlx::query(
            r#"
            INSERT INTO provider_blocked_dates (id, provider_id, blocked_date, reason, created_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT (provider_id, blocked_date)
            DO UPDATE SET reason = excluded.reason
            "#
        )
        .bind(Uuid::new_v4().to_string())
        .bind(provider_id.to_string())
        .bind(request.blocked_date)
        .bind(&request.reason)
        .bind(Utc::now().naive_utc())
        .execute(&self.pool)
        .await?;

        self.find_blocked_date(provider_id, request.blocked_date)
            .await?
            .ok_or_else(|| AppError::Database("Failed to retrieve blocked date".to_string()))
    }

    async fn unblock_date(&self, provider_id: Uuid, date: NaiveDate) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM provider_blocked_dates WHERE provider_id = ? AND blocked_date = ?"
        )
        .bind(provider_id.to_string())
        .bind(date)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_blocked_dates(&self, provider_id: Uuid) -> Result<Vec<ProviderBlockedDate>> {
        let rows = sqlx::query_as::<_, BlockedDateRow>(
            r#"
            SELECT id, provider_id, blocked_date, reason, created_at
            FROM provider_blocked_dates
            WHERE provider_id = ?
            ORDER BY blocked_date ASC
            "#
        )
        .bind(provider_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_blocked_date).collect()
    }

    async fn is_date_blocked(&self, provider_id: Uuid, date: NaiveDate) -> Result<bool> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM provider_blocked_dates WHERE provider_id = ? AND blocked_date = ?"
        )
        .bind(provider_id.to_string())
        .bind(date)
        .fetch_one(&self.pool)
        .await?;

        Ok(count > 0)
    }
}
