use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    error::Result,
    repository::{parse_decimal, parse_uuid},
};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EarningsRecord {
    pub id: Uuid,
    pub provider_id: Uuid,
    pub booking_id: Uuid,
    pub amount: Decimal,
    pub commission: Decimal,
    pub net: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EarningsOutcome {
    Recorded,
    AlreadyRecorded,
}

/// Earnings recognition for completed bookings. Implementations must be
/// idempotent per booking id: delivery is at-least-once.
#[async_trait]
pub trait EarningsRecorder: Send + Sync {
    async fn record_earnings(
        &self,
        provider_id: Uuid,
        booking_id: Uuid,
        amount: Decimal,
        commission: Decimal,
        net: Decimal,
    ) -> Result<EarningsOutcome>;

    async fn find_by_booking(&self, booking_id: Uuid) -> Result<Option<EarningsRecord>>;
}

#[derive(FromRow)]
struct EarningsRow {
    id: String,
    provider_id: String,
    booking_id: String,
    amount: String,
    commission: String,
    net: String,
    created_at: NaiveDateTime,
}

pub struct SqliteEarningsRecorder {
    pool: SqlitePool,
}

impl SqliteEarningsRecorder {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_record(row: EarningsRow) -> Result<EarningsRecord> {
        Ok(EarningsRecord {
            id: parse_uuid(&row.id)?,
            provider_id: parse_uuid(&row.provider_id)?,
            booking_id: parse_uuid(&row.booking_id)?,
            amount: parse_decimal(&row.amount)?,
            commission: parse_decimal(&row.commission)?,
            net: parse_decimal(&row.net)?,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
        })
    }
}

#[async_trait]
impl EarningsRecorder for SqliteEarningsRecorder {
    async fn record_earnings(
        &self,
        provider_id: Uuid,
        booking_id: Uuid,
        amount: Decimal,
        commission: Decimal,
        net: Decimal,
    ) -> Result<EarningsOutcome> {
        if self.find_by_booking(booking_id).await?.is_some() {
            tracing::debug!("Earnings for booking {} already recorded", booking_id);
            return Ok(EarningsOutcome::AlreadyRecorded);
        }

        // The unique index on booking_id settles a race between two retries
        let result = sqlx::query(
            r#"
            INSERT INTO provider_earnings (id, provider_id, booking_id, amount, commission, net, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (booking_id) DO NOTHING
            "#
        )
        .bind(Uuid::new_v4().to_string())
        .bind(provider_id.to_string())
        .bind(booking_id.to_string())
        .bind(amount.to_string())
        .bind(commission.to_string())
        .bind(net.to_string())
        .bind(Utc::now().naive_utc())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(EarningsOutcome::AlreadyRecorded);
        }

        tracing::info!(
            "Recorded earnings for provider {} on booking {}: net {}",
            provider_id,
            booking_id,
            net
        );
        Ok(EarningsOutcome::Recorded)
    }

    async fn find_by_booking(&self, booking_id: Uuid) -> Result<Option<EarningsRecord>> {
        let row = sqlx::query_as::<_, EarningsRow>(
            r#"
            SELECT id, provider_id, booking_id, amount, commission, net, created_at
            FROM provider_earnings
            WHERE booking_id = ?
            "#
        )
        .bind(booking_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_record).transpose()
    }
}
