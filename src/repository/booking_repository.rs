use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{
        Booking, BookingAddonLine, BookingStatus, BookingStatusChange, PaymentMethod,
        PaymentStatus,
    },
    error::{AppError, Result},
    repository::{parse_decimal, parse_uuid, BookingRepository},
};

const BOOKING_COLUMNS: &str = r#"
    id, customer_id, provider_id, service_id, address_id,
    scheduled_date, scheduled_time, status,
    service_price, addons_price, subtotal, commission_rate, commission_amount, provider_earnings,
    payment_method, payment_status, notes, provider_notes, cancellation_reason,
    accepted_at, started_at, completed_at, cancelled_at, created_at, updated_at
"#;

/// Quoted statuses whose bookings no longer hold their time slot.
fn released_status_list() -> String {
    BookingStatus::ALL
        .iter()
        .filter(|status| !status.occupies_slot())
        .map(|status| format!("'{}'", status.as_str()))
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(FromRow)]
struct BookingRow {
    id: String,
    customer_id: String,
    provider_id: String,
    service_id: String,
    address_id: Option<String>,
    scheduled_date: NaiveDate,
    scheduled_time: NaiveTime,
    status: String,
    service_price: String,
    addons_price: String,
    subtotal: String,
    commission_rate: String,
    commission_amount: String,
    provider_earnings: String,
    payment_method: String,
    payment_status: String,
    notes: Option<String>,
    provider_notes: Option<String>,
    cancellation_reason: Option<String>,
    accepted_at: Option<NaiveDateTime>,
    started_at: Option<NaiveDateTime>,
    completed_at: Option<NaiveDateTime>,
    cancelled_at: Option<NaiveDateTime>,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

#[derive(FromRow)]
struct AddonLineRow {
    id: String,
    booking_id: String,
    addon_id: String,
    addon_name: String,
    price: String,
    quantity: i32,
}

#[derive(FromRow)]
struct StatusChangeRow {
    id: String,
    booking_id: String,
    from_status: Option<String>,
    to_status: String,
    changed_by: Option<String>,
    note: Option<String>,
    changed_at: NaiveDateTime,
}

/// Column changes applied together with a status change. `None` leaves the
/// stored value untouched.
#[derive(Debug, Clone)]
pub struct StatusUpdate {
    pub booking_id: Uuid,
    pub from: BookingStatus,
    pub to: BookingStatus,
    pub payment_status: Option<PaymentStatus>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    pub provider_notes: Option<String>,
    pub updated_at: DateTime<Utc>,
}

pub struct SqliteBookingRepository {
    pool: SqlitePool,
}

impl SqliteBookingRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn to_utc(dt: NaiveDateTime) -> DateTime<Utc> {
        DateTime::from_naive_utc_and_offset(dt, Utc)
    }

    fn parse_status(s: &str) -> Result<BookingStatus> {
        BookingStatus::parse(s)
            .ok_or_else(|| AppError::Database(format!("Invalid booking status: {}", s)))
    }

    fn row_to_booking(row: BookingRow) -> Result<Booking> {
        Ok(Booking {
            id: parse_uuid(&row.id)?,
            customer_id: parse_uuid(&row.customer_id)?,
            provider_id: parse_uuid(&row.provider_id)?,
            service_id: parse_uuid(&row.service_id)?,
            address_id: row.address_id.as_deref().map(parse_uuid).transpose()?,
            scheduled_date: row.scheduled_date,
            scheduled_time: row.scheduled_time,
            status: Self::parse_status(&row.status)?,
            service_price: parse_decimal(&row.service_price)?,
            addons_price: parse_decimal(&row.addons_price)?,
            subtotal: parse_decimal(&row.subtotal)?,
            commission_rate: parse_decimal(&row.commission_rate)?,
            commission_amount: parse_decimal(&row.commission_amount)?,
            provider_earnings: parse_decimal(&row.provider_earnings)?,
            payment_method: PaymentMethod::parse(&row.payment_method).ok_or_else(|| {
                AppError::Database(format!("Invalid payment method: {}", row.payment_method))
            })?,
            payment_status: PaymentStatus::parse(&row.payment_status).ok_or_else(|| {
                AppError::Database(format!("Invalid payment status: {}", row.payment_status))
            })?,
            notes: row.notes,
            provider_notes: row.provider_notes,
            cancellation_reason: row.cancellation_reason,
            accepted_at: row.accepted_at.map(Self::to_utc),
            started_at: row.started_at.map(Self::to_utc),
            completed_at: row.completed_at.map(Self::to_utc),
            cancelled_at: row.cancelled_at.map(Self::to_utc),
            created_at: Self::to_utc(row.created_at),
            updated_at: Self::to_utc(row.updated_at),
        })
    }

    fn row_to_addon_line(row: AddonLineRow) -> Result<BookingAddonLine> {
        Ok(BookingAddonLine {
            id: parse_uuid(&row.id)?,
            booking_id: parse_uuid(&row.booking_id)?,
            addon_id: parse_uuid(&row.addon_id)?,
            addon_name: row.addon_name,
            price: parse_decimal(&row.price)?,
            quantity: row.quantity,
        })
    }

    fn row_to_status_change(row: StatusChangeRow) -> Result<BookingStatusChange> {
        Ok(BookingStatusChange {
            id: parse_uuid(&row.id)?,
            booking_id: parse_uuid(&row.booking_id)?,
            from_status: row.from_status.as_deref().map(Self::parse_status).transpose()?,
            to_status: Self::parse_status(&row.to_status)?,
            changed_by: row.changed_by.as_deref().map(parse_uuid).transpose()?,
            note: row.note,
            changed_at: Self::to_utc(row.changed_at),
        })
    }

    pub async fn fetch_in(conn: &mut SqliteConnection, id: Uuid) -> Result<Option<Booking>> {
        let sql = format!("SELECT {} FROM bookings WHERE id = ?", BOOKING_COLUMNS);
        let row = sqlx::query_as::<_, BookingRow>(&sql)
            .bind(id.to_string())
            .fetch_optional(&mut *conn)
            .await?;

        row.map(Self::row_to_booking).transpose()
    }

    /// Writes the booking row and its addon lines. Atomicity is the
    /// caller's transaction.
    pub async fn insert_in(
        conn: &mut SqliteConnection,
        booking: &Booking,
        lines: &[BookingAddonLine],
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO bookings (
                id, customer_id, provider_id, service_id, address_id,
                scheduled_date, scheduled_time, status,
                service_price, addons_price, subtotal, commission_rate,
                commission_amount, provider_earnings,
                payment_method, payment_status, notes,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#
        )
        .bind(booking.id.to_string())
        .bind(booking.customer_id.to_string())
        .bind(booking.provider_id.to_string())
        .bind(booking.service_id.to_string())
        .bind(booking.address_id.map(|id| id.to_string()))
        .bind(booking.scheduled_date)
        .bind(booking.scheduled_time)
        .bind(booking.status.as_str())
        .bind(booking.service_price.to_string())
        .bind(booking.addons_price.to_string())
        .bind(booking.subtotal.to_string())
        .bind(booking.commission_rate.to_string())
        .bind(booking.commission_amount.to_string())
        .bind(booking.provider_earnings.to_string())
        .bind(booking.payment_method.as_str())
        .bind(booking.payment_status.as_str())
        .bind(&booking.notes)
        .bind(booking.created_at.naive_utc())
        .bind(booking.updated_at.naive_utc())
        .execute(&mut *conn)
        .await?;

        for line in lines {
            sqlx::query(
                r#"
                INSERT INTO booking_addons (id, booking_id, addon_id, addon_name, price, quantity)
                VALUES (?, ?, ?, ?, ?, ?)
                "#
            )
            .bind(line.id.to_string())
            .bind(line.booking_id.to_string())
            .bind(line.addon_id.to_string())
            .bind(&line.addon_name)
            .bind(line.price.to_string())
            .bind(line.quantity)
            .execute(&mut *conn)
            .await?;
        }

        Ok(())
    }

    /// Compare-and-swap on the current status. Returns `false` when the row
    /// is no longer in `update.from`.
    pub async fn apply_status_update_in(conn: &mut SqliteConnection, update: &StatusUpdate) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE bookings
            SET status = ?,
                payment_status = COALESCE(?, payment_status),
                accepted_at = COALESCE(?, accepted_at),
                started_at = COALESCE(?, started_at),
                completed_at = COALESCE(?, completed_at),
                cancelled_at = COALESCE(?, cancelled_at),
                cancellation_reason = COALESCE(?, cancellation_reason),
                provider_notes = COALESCE(?, provider_notes),
                updated_at = ?
            WHERE id = ? AND status = ?
            "#
        )
        .bind(update.to.as_str())
        .bind(update.payment_status.map(|s| s.as_str()))
        .bind(update.accepted_at.map(|dt| dt.naive_utc()))
        .bind(update.started_at.map(|dt| dt.naive_utc()))
        .bind(update.completed_at.map(|dt| dt.naive_utc()))
        .bind(update.cancelled_at.map(|dt| dt.naive_utc()))
        .bind(&update.cancellation_reason)
        .bind(&update.provider_notes)
        .bind(update.updated_at.naive_utc())
        .bind(update.booking_id.to_string())
        .bind(update.from.as_str())
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn record_status_change_in(conn: &mut SqliteConnection, change: &BookingStatusChange) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO booking_status_history (
                id, booking_id, from_status, to_status, changed_by, note, changed_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#
        )
        .bind(change.id.to_string())
        .bind(change.booking_id.to_string())
        .bind(change.from_status.map(|s| s.as_str()))
        .bind(change.to_status.as_str())
        .bind(change.changed_by.map(|id| id.to_string()))
        .bind(&change.note)
        .bind(change.changed_at.naive_utc())
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    async fn list_where(&self, column: &'static str, id: Uuid, limit: i64, offset: i64) -> Result<Vec<Booking>> {
        let sql = format!(
            "SELECT {} FROM bookings WHERE {} = ? ORDER BY scheduled_date DESC, scheduled_time DESC LIMIT ? OFFSET ?",
            BOOKING_COLUMNS, column
        );
        let rows = sqlx::query_as::<_, BookingRow>(&sql)
            .bind(id.to_string())
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Self::row_to_booking).collect()
    }
}

#[async_trait]
impl BookingRepository for SqliteBookingRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Booking>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch_in(&mut conn, id).await
    }

    async fn find_addon_lines(&self, booking_id: Uuid) -> Result<Vec<BookingAddonLine>> {
        let rows = sqlx::query_as::<_, AddonLineRow>(
            r#"
            SELECT id, booking_id, addon_id, addon_name, price, quantity
            FROM booking_addons
            WHERE booking_id = ?
            ORDER BY addon_name ASC
            "#
        )
        .bind(booking_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_addon_line).collect()
    }

    async fn list_status_history(&self, booking_id: Uuid) -> Result<Vec<BookingStatusChange>> {
        let rows = sqlx::query_as::<_, StatusChangeRow>(
            r#"
            SELECT id, booking_id, from_status, to_status, changed_by, note, changed_at
            FROM booking_status_history
            WHERE booking_id = ?
            ORDER BY changed_at ASC, rowid ASC
            "#
        )
        .bind(booking_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_status_change).collect()
    }

    async fn list_for_customer(&self, customer_id: Uuid, limit: i64, offset: i64) -> Result<Vec<Booking>> {
        self.list_where("customer_id", customer_id, limit, offset).await
    }

    async fn list_for_provider(&self, provider_id: Uuid, limit: i64, offset: i64) -> Result<Vec<Booking>> {
        self.list_where("provider_id", provider_id, limit, offset).await
    }

    async fn list_booked_times(&self, provider_id: Uuid, date: NaiveDate) -> Result<Vec<NaiveTime>> {
        let sql = format!(
            r#"
            SELECT scheduled_time
            FROM bookings
            WHERE provider_id = ? AND scheduled_date = ?
              AND status NOT IN ({})
            ORDER BY scheduled_time ASC
            "#,
            released_status_list()
        );
        let times = sqlx::query_scalar::<_, NaiveTime>(&sql)
            .bind(provider_id.to_string())
            .bind(date)
            .fetch_all(&self.pool)
            .await?;

        Ok(times)
    }

    async fn list_completed_without_earnings(&self) -> Result<Vec<Booking>> {
        let columns = BOOKING_COLUMNS
            .split(',')
            .map(|c| format!("b.{}", c.trim()))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            r#"
            SELECT {}
            FROM bookings b
            LEFT JOIN provider_earnings e ON e.booking_id = b.id
            WHERE b.status = ? AND e.id IS NULL
            ORDER BY b.completed_at ASC
            "#,
            columns
        );
        let rows = sqlx::query_as::<_, BookingRow>(&sql)
            .bind(BookingStatus::Completed.as_str())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Self::row_to_booking).collect()
    }
}
