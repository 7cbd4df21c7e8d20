#![allow(dead_code)]

use std::{path::PathBuf, sync::Arc};

use appointly::{
    config::Settings,
    domain::{
        AddonSelection, BookingDetails, CreateAddonRequest, CreateAvailabilityRequest,
        CreateBookingRequest, CreateServiceRequest, DayOfWeek, PaymentMethod, PaymentStatus,
        Service, ServiceAddon, UpsertProviderProfileRequest, VerificationStatus,
    },
    integrations::{
        earnings::{EarningsRecorder, SqliteEarningsRecorder},
        notifications::{NotificationIntegration, Notifier, SqliteNotifier},
        IntegrationManager,
    },
    repository::{AvailabilityRepository, CatalogRepository, ProviderRepository},
    service::ServiceContext,
};
use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Utc, Weekday};
use rust_decimal::Decimal;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    SqlitePool,
};
use uuid::Uuid;

/// One connection so every query sees the same in-memory database.
pub async fn pool() -> anyhow::Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

/// Database file shared by several connections, for tests that need real
/// writer contention. Remove it with [`drop_file_pool`].
pub async fn file_pool() -> anyhow::Result<(SqlitePool, PathBuf)> {
    let path = std::env::temp_dir().join(format!("appointly-{}.db", Uuid::new_v4()));
    let options = SqliteConnectOptions::new()
        .filename(&path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(8)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok((pool, path))
}

pub async fn drop_file_pool(pool: SqlitePool, path: PathBuf) {
    pool.close().await;
    for suffix in ["", "-wal", "-shm"] {
        let mut file = path.clone().into_os_string();
        file.push(suffix);
        let _ = std::fs::remove_file(file);
    }
}

pub async fn context(pool: &SqlitePool) -> anyhow::Result<Arc<ServiceContext>> {
    context_with(
        pool,
        Arc::new(SqliteEarningsRecorder::new(pool.clone())),
        Arc::new(SqliteNotifier::new(pool.clone())),
    )
    .await
}

pub async fn context_with(
    pool: &SqlitePool,
    earnings: Arc<dyn EarningsRecorder>,
    notifier: Arc<dyn Notifier>,
) -> anyhow::Result<Arc<ServiceContext>> {
    let integration_manager = Arc::new(IntegrationManager::new());
    integration_manager
        .register(Arc::new(NotificationIntegration::new(notifier)))
        .await;

    Ok(Arc::new(ServiceContext::new(
        &Settings::default(),
        earnings,
        integration_manager,
        pool.clone(),
    )))
}

pub fn time(s: &str) -> NaiveTime {
    NaiveTime::parse_from_str(s, "%H:%M").unwrap()
}

/// First date on or after tomorrow falling on `weekday`.
pub fn next(weekday: Weekday) -> NaiveDate {
    let mut date = Utc::now().date_naive() + Duration::days(1);
    while date.weekday() != weekday {
        date += Duration::days(1);
    }
    date
}

pub async fn provider(
    ctx: &ServiceContext,
    status: VerificationStatus,
    commission_rate: Option<Decimal>,
) -> anyhow::Result<Uuid> {
    let provider_id = Uuid::new_v4();
    ctx.provider_repo
        .upsert_profile(UpsertProviderProfileRequest {
            provider_id,
            business_name: "Sparkle & Shine".to_string(),
            verification_status: status,
            commission_rate,
        })
        .await?;
    Ok(provider_id)
}

pub async fn service(
    ctx: &ServiceContext,
    provider_id: Uuid,
    base_price: Decimal,
    duration_minutes: Option<i32>,
) -> anyhow::Result<Service> {
    Ok(ctx
        .catalog_repo
        .create_service(CreateServiceRequest {
            provider_id,
            name: "Standard Cleaning".to_string(),
            base_price,
            duration_minutes,
        })
        .await?)
}

pub async fn addon(ctx: &ServiceContext, service_id: Uuid, name: &str, price: Decimal) -> anyhow::Result<ServiceAddon> {
    Ok(ctx
        .catalog_repo
        .create_addon(CreateAddonRequest {
            service_id,
            name: name.to_string(),
            price,
        })
        .await?)
}

pub async fn window(
    ctx: &ServiceContext,
    provider_id: Uuid,
    day: DayOfWeek,
    start: &str,
    end: &str,
) -> anyhow::Result<()> {
    ctx.availability_repo
        .create_window(
            provider_id,
            CreateAvailabilityRequest {
                day_of_week: day,
                start_time: time(start),
                end_time: time(end),
                is_available: true,
            },
        )
        .await?;
    Ok(())
}

pub fn booking_request(
    customer_id: Uuid,
    service_id: Uuid,
    date: NaiveDate,
    at: &str,
    addons: Vec<AddonSelection>,
) -> CreateBookingRequest {
    CreateBookingRequest {
        customer_id,
        service_id,
        address_id: None,
        scheduled_date: date,
        scheduled_time: time(at),
        addons,
        payment_method: PaymentMethod::Cash,
        notes: None,
        payment_status: PaymentStatus::Pending,
    }
}

/// Approved provider at the default rate with one 100.00 service, booked once.
pub async fn pending_booking(ctx: &ServiceContext) -> anyhow::Result<BookingDetails> {
    let provider_id = provider(ctx, VerificationStatus::Approved, None).await?;
    let service = service(ctx, provider_id, Decimal::new(10000, 2), Some(60)).await?;

    Ok(ctx
        .booking_ledger
        .create(booking_request(
            Uuid::new_v4(),
            service.id,
            next(Weekday::Mon),
            "09:00",
            vec![],
        ))
        .await?)
}

pub async fn notification_kinds(pool: &SqlitePool, user_id: Uuid) -> anyhow::Result<Vec<String>> {
    let kinds: Vec<(String,)> = sqlx::query_as(
        "SELECT kind FROM notifications WHERE user_id = ? ORDER BY created_at, rowid",
    )
    .bind(user_id.to_string())
    .fetch_all(pool)
    .await?;

    Ok(kinds.into_iter().map(|(k,)| k).collect())
}
