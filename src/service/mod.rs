pub mod availability_service;
pub mod booking_ledger;
pub mod booking_state_machine;
pub mod slot_resolver;

use std::sync::Arc;
use sqlx::SqlitePool;

use crate::config::Settings;
use crate::integrations::{earnings::EarningsRecorder, IntegrationManager};
use crate::repository::*;
use availability_service::AvailabilityService;
use booking_ledger::BookingLedger;
use booking_state_machine::BookingStateMachine;
use slot_resolver::{SlotPolicy, SlotResolver};

pub struct ServiceContext {
    pub availability_repo: Arc<dyn AvailabilityRepository>,
    pub booking_repo: Arc<dyn BookingRepository>,
    pub catalog_repo: Arc<dyn CatalogRepository>,
    pub provider_repo: Arc<dyn ProviderRepository>,
    pub earnings: Arc<dyn EarningsRecorder>,
    pub integration_manager: Arc<IntegrationManager>,
    pub availability_service: Arc<AvailabilityService>,
    pub slot_resolver: Arc<SlotResolver>,
    pub booking_ledger: Arc<BookingLedger>,
    pub booking_state_machine: Arc<BookingStateMachine>,
    pub db_pool: SqlitePool,
}

impl ServiceContext {
    pub fn new(
        settings: &Settings,
        earnings: Arc<dyn EarningsRecorder>,
        integration_manager: Arc<IntegrationManager>,
        db_pool: SqlitePool,
    ) -> Self {
        let availability_repo: Arc<dyn AvailabilityRepository> =
            Arc::new(SqliteAvailabilityRepository::new(db_pool.clone()));
        let booking_repo: Arc<dyn BookingRepository> =
            Arc::new(SqliteBookingRepository::new(db_pool.clone()));
        let catalog_repo: Arc<dyn CatalogRepository> =
            Arc::new(SqliteCatalogRepository::new(db_pool.clone()));
        let provider_repo: Arc<dyn ProviderRepository> =
            Arc::new(SqliteProviderRepository::new(db_pool.clone()));

        let availability_service = Arc::new(AvailabilityService::new(availability_repo.clone()));
        let slot_resolver = Arc::new(SlotResolver::new(
            availability_repo.clone(),
            booking_repo.clone(),
            SlotPolicy::from(&settings.scheduling),
        ));
        let booking_ledger = Arc::new(BookingLedger::new(
            db_pool.clone(),
            integration_manager.clone(),
            settings.commission.default_rate,
        ));
        let booking_state_machine = Arc::new(BookingStateMachine::new(
            db_pool.clone(),
            booking_repo.clone(),
            earnings.clone(),
            integration_manager.clone(),
        ));

        Self {
            availability_repo,
            booking_repo,
            catalog_repo,
            provider_repo,
            earnings,
            integration_manager,
            availability_service,
            slot_resolver,
            booking_ledger,
            booking_state_machine,
            db_pool,
        }
    }
}
