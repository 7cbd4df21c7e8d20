use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::*;
use crate::error::{AppError, Result};

pub mod availability_repository;
pub mod booking_repository;
pub mod catalog_repository;
pub mod provider_repository;
pub mod transaction;

pub use availability_repository::SqliteAvailabilityRepository;
pub use booking_repository::SqliteBookingRepository;
pub use catalog_repository::SqliteCatalogRepository;
pub use provider_repository::SqliteProviderRepository;
pub use transaction::WriteTransaction;

#[async_trait]
pub trait AvailabilityRepository: Send + Sync {
    async fn create_window(&self, provider_id: Uuid, request: CreateAvailabilityRequest) -> Result<ProviderAvailability>;
    async fn find_window(&self, id: Uuid) -> Result<Option<ProviderAvailability>>;
    async fn list_windows(&self, provider_id: Uuid) -> Result<Vec<ProviderAvailability>>;
    /// Windows flagged available for the given weekday, ordered by start time.
    async fn list_open_windows(&self, provider_id: Uuid, day: DayOfWeek) -> Result<Vec<ProviderAvailability>>;
    async fn update_window(&self, id: Uuid, update: UpdateAvailabilityRequest) -> Result<ProviderAvailability>;
    async fn delete_window(&self, id: Uuid) -> Result<()>;
    async fn block_date(&self, provider_id: Uuid, request: BlockDateRequest) -> Result<ProviderBlockedDate>;
    async fn unblock_date(&self, provider_id: Uuid, date: NaiveDate) -> Result<bool>;
    async fn list_blocked_dates(&self, provider_id: Uuid) -> Result<Vec<ProviderBlockedDate>>;
    async fn is_date_blocked(&self, provider_id: Uuid, date: NaiveDate) -> Result<bool>;
}

/// Read side of the booking store. Writes go through the ledger and the
/// state machine, which own their transactions.
#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Booking>>;
    async fn find_addon_lines(&self, booking_id: Uuid) -> Result<Vec<BookingAddonLine>>;
    async fn list_status_history(&self, booking_id: Uuid) -> Result<Vec<BookingStatusChange>>;
    async fn list_for_customer(&self, customer_id: Uuid, limit: i64, offset: i64) -> Result<Vec<Booking>>;
    async fn list_for_provider(&self, provider_id: Uuid, limit: i64, offset: i64) -> Result<Vec<Booking>>;
    /// Start times of bookings on `date` that still hold their slot.
    async fn list_booked_times(&self, provider_id: Uuid, date: NaiveDate) -> Result<Vec<NaiveTime>>;
    /// Completed bookings with no earnings record yet.
    async fn list_completed_without_earnings(&self) -> Result<Vec<Booking>>;
}

#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn create_service(&self, request: CreateServiceRequest) -> Result<Service>;
    async fn find_service(&self, id: Uuid) -> Result<Option<Service>>;
    async fn set_service_active(&self, id: Uuid, is_active: bool) -> Result<()>;
    async fn create_addon(&self, request: CreateAddonRequest) -> Result<ServiceAddon>;
    async fn list_addons(&self, service_id: Uuid) -> Result<Vec<ServiceAddon>>;
    async fn delete_addon(&self, id: Uuid) -> Result<()>;
}

#[async_trait]
pub trait ProviderRepository: Send + Sync {
    async fn upsert_profile(&self, request: UpsertProviderProfileRequest) -> Result<ProviderProfile>;
    async fn find_profile(&self, provider_id: Uuid) -> Result<Option<ProviderProfile>>;
    async fn set_verification_status(&self, provider_id: Uuid, status: VerificationStatus) -> Result<()>;
}

pub(crate) fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| AppError::Database(e.to_string()))
}

pub(crate) fn parse_decimal(s: &str) -> Result<Decimal> {
    Decimal::from_str(s).map_err(|e| AppError::Database(format!("Invalid decimal '{}': {}", s, e)))
}
