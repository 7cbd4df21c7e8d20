use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{ProviderProfile, UpsertProviderProfileRequest, VerificationStatus},
    error::{AppError, Result},
    repository::{parse_decimal, parse_uuid, ProviderRepository},
};

#[derive(FromRow)]
struct ProviderProfileRow {
    provider_id: String,
    business_name: String,
    verification_status: String,
    commission_rate: Option<String>,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

pub struct SqliteProviderRepository {
    pool: SqlitePool,
}

impl SqliteProviderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_profile(row: ProviderProfileRow) -> Result<ProviderProfile> {
        Ok(ProviderProfile {
            provider_id: parse_uuid(&row.provider_id)?,
            business_name: row.business_name,
            verification_status: VerificationStatus::parse(&row.verification_status).ok_or_else(|| {
                AppError::Database(format!("Invalid verification status: {}", row.verification_status))
            })?,
            commission_rate: row.commission_rate.as_deref().map(parse_decimal).transpose()?,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
            updated_at: DateTime::from_naive_utc_and_offset(row.updated_at, Utc),
        })
    }

    /// Profile lookup on an existing connection, so a caller holding a
    /// transaction sees verification status and commission from its own snapshot.
    pub async fn fetch_profile_in(conn: &mut SqliteConnection, provider_id: Uuid) -> Result<Option<ProviderProfile>> {
        let row = sqlx::query_as::<_, ProviderProfileRow>(
            r#"
            SELECT provider_id, business_name, verification_status, commission_rate,
                   created_at, updated_at
            FROM provider_profiles
            WHERE provider_id = ?
            "#
        )
        .bind(provider_id.to_string())
        .fetch_optional(&mut *conn)
        .await?;

        row.map(Self::row_to_profile).transpose()
    }
}

#[async_trait]
impl ProviderRepository for SqliteProviderRepository {
    async fn upsert_profile(&self, request: UpsertProviderProfileRequest) -> Result<ProviderProfile> {
        let now = Utc::now().naive_utc();

        sqlx::query(
            r#"
            INSERT INTO provider_profiles (
                provider_id, business_name, verification_status, commission_rate,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT (provider_id) DO UPDATE SET
                business_name = excluded.business_name,
                verification_status = excluded.verification_status,
                commission_rate = excluded.commission_rate,
                updated_at = excluded.updated_at
            "#
        )
        .bind(request.provider_id.to_string())
        .bind(&request.business_name)
        .bind(request.verification_status.as_str())
        .bind(request.commission_rate.map(|r| r.to_string()))
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.find_profile(request.provider_id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve provider profile".to_string())
        })
    }

    async fn find_profile(&self, provider_id: Uuid) -> Result<Option<ProviderProfile>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch_profile_in(&mut conn, provider_id).await
    }

    async fn set_verification_status(&self, provider_id: Uuid, status: VerificationStatus) -> Result<()> {
        let result = sqlx::query(
            "UPDATE provider_profiles SET verification_status = ?, updated_at = ? WHERE provider_id = ?"
        )
        .bind(status.as_str())
        .bind(Utc::now().naive_utc())
        .bind(provider_id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::ProviderProfileNotFound(provider_id));
        }

        Ok(())
    }
}
