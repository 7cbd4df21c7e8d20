use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::{SqliteConnection, SqlitePool};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain::{
        Booking, BookingAddonLine, BookingDetails, BookingStatus, BookingStatusChange,
        CreateBookingRequest, PriceQuote,
    },
    error::{AppError, Result},
    integrations::{BookingEvent, IntegrationManager},
    repository::{
        SqliteBookingRepository, SqliteCatalogRepository, SqliteProviderRepository,
        WriteTransaction,
    },
};

/// Prices and persists new bookings.
///
/// Everything from the service lookup to the last addon line runs inside one
/// transaction on one connection, so the provider's verification status and
/// commission rate are read from the same snapshot the booking is written to.
pub struct BookingLedger {
    pool: SqlitePool,
    integration_manager: Arc<IntegrationManager>,
    default_commission_rate: Decimal,
}

impl BookingLedger {
    pub fn new(
        pool: SqlitePool,
        integration_manager: Arc<IntegrationManager>,
        default_commission_rate: Decimal,
    ) -> Self {
        Self {
            pool,
            integration_manager,
            default_commission_rate,
        }
    }

    pub async fn create(&self, request: CreateBookingRequest) -> Result<BookingDetails> {
        let mut tx = WriteTransaction::begin(&self.pool).await?;

        let written = self.write_booking(tx.executor()?, request).await;
        let (booking, lines) = match written {
            Ok(written) => written,
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::error!("Rollback after failed booking creation failed: {}", rollback_err);
                }
                return Err(e);
            }
        };

        tx.commit().await?;

        tracing::info!(
            "Created booking {} for provider {} on {} at {} (subtotal {}, commission {})",
            booking.id,
            booking.provider_id,
            booking.scheduled_date,
            booking.scheduled_time.format("%H:%M"),
            booking.subtotal,
            booking.commission_amount
        );

        self.integration_manager
            .handle_event(BookingEvent::Requested(booking.clone()))
            .await;

        Ok(BookingDetails {
            booking,
            addons: lines,
        })
    }

    /// Every read and write of a new booking, on the caller's transaction.
    async fn write_booking(
        &self,
        conn: &mut SqliteConnection,
        request: CreateBookingRequest,
    ) -> Result<(Booking, Vec<BookingAddonLine>)> {
        let service = SqliteCatalogRepository::fetch_service_in(&mut *conn, request.service_id)
            .await?
            .ok_or(AppError::ServiceNotFound(request.service_id))?;

        if !service.is_active {
            return Err(AppError::Validation(format!(
                "Service {} is not currently offered",
                service.id
            )));
        }

        let profile = SqliteProviderRepository::fetch_profile_in(&mut *conn, service.provider_id)
            .await?
            .ok_or(AppError::ProviderProfileNotFound(service.provider_id))?;

        if !profile.verification_status.can_receive_bookings() {
            tracing::info!(
                "Rejected booking for provider {} with verification status {}",
                profile.provider_id,
                profile.verification_status
            );
            return Err(AppError::ProviderNotVerified(profile.verification_status));
        }

        let commission_rate = profile.commission_rate.unwrap_or(self.default_commission_rate);

        let requested_ids: Vec<Uuid> = request.addons.iter().map(|a| a.addon_id).collect();
        let addons = SqliteCatalogRepository::fetch_addons_in(&mut *conn, service.id, &requested_ids).await?;

        let booking_id = Uuid::new_v4();

        let lines: Vec<BookingAddonLine> = request
            .addons
            .iter()
            .filter_map(|selection| {
                let addon = addons.iter().find(|a| a.id == selection.addon_id);
                if addon.is_none() {
                    tracing::debug!(
                        "Dropping addon {} not offered with service {}",
                        selection.addon_id,
                        service.id
                    );
                }
                addon.map(|addon| BookingAddonLine {
                    id: Uuid::new_v4(),
                    booking_id,
                    addon_id: addon.id,
                    addon_name: addon.name.clone(),
                    price: addon.price,
                    quantity: selection.effective_quantity(),
                })
            })
            .collect();

        let quote = PriceQuote::compute(
            service.base_price,
            lines.iter().map(|line| (line.price, line.quantity)),
            commission_rate,
        );

        let now = Utc::now();
        let booking = Booking {
            id: booking_id,
            customer_id: request.customer_id,
            provider_id: service.provider_id,
            service_id: service.id,
            address_id: request.address_id,
            scheduled_date: request.scheduled_date,
            scheduled_time: request.scheduled_time,
            status: BookingStatus::Pending,
            service_price: quote.service_price,
            addons_price: quote.addons_price,
            subtotal: quote.subtotal,
            commission_rate: quote.commission_rate,
            commission_amount: quote.commission_amount,
            provider_earnings: quote.provider_earnings,
            payment_method: request.payment_method,
            payment_status: request.payment_status,
            notes: request.notes,
            provider_notes: None,
            cancellation_reason: None,
            accepted_at: None,
            started_at: None,
            completed_at: None,
            cancelled_at: None,
            created_at: now,
            updated_at: now,
        };

        SqliteBookingRepository::insert_in(&mut *conn, &booking, &lines).await?;
        SqliteBookingRepository::record_status_change_in(
            &mut *conn,
            &BookingStatusChange {
                id: Uuid::new_v4(),
                booking_id,
                from_status: None,
                to_status: BookingStatus::Pending,
                changed_by: Some(request.customer_id),
                note: None,
                changed_at: now,
            },
        )
        .await?;

        Ok((booking, lines))
    }
}
