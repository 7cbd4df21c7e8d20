use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain::{Booking, BookingStatus, BookingStatusChange, PaymentStatus, TransitionOptions},
    error::{AppError, Result},
    integrations::{
        earnings::{EarningsOutcome, EarningsRecorder},
        BookingEvent, IntegrationManager,
    },
    repository::{
        booking_repository::{SqliteBookingRepository, StatusUpdate},
        BookingRepository, WriteTransaction,
    },
};

/// Applies booking status transitions.
///
/// The status change, its timestamps and the history row commit together.
/// Earnings recognition and notifications run after the commit and cannot
/// undo it.
pub struct BookingStateMachine {
    pool: SqlitePool,
    booking_repo: Arc<dyn BookingRepository>,
    earnings: Arc<dyn EarningsRecorder>,
    integration_manager: Arc<IntegrationManager>,
}

impl BookingStateMachine {
    pub fn new(
        pool: SqlitePool,
        booking_repo: Arc<dyn BookingRepository>,
        earnings: Arc<dyn EarningsRecorder>,
        integration_manager: Arc<IntegrationManager>,
    ) -> Self {
        Self {
            pool,
            booking_repo,
            earnings,
            integration_manager,
        }
    }

    pub async fn transition(
        &self,
        booking_id: Uuid,
        to: BookingStatus,
        options: TransitionOptions,
        actor: Option<Uuid>,
    ) -> Result<Booking> {
        let mut tx = WriteTransaction::begin(&self.pool).await?;

        let written = Self::write_transition(tx.executor()?, booking_id, to, options, actor).await;
        let (booking, from) = match written {
            Ok(written) => written,
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::error!("Rollback after failed transition failed: {}", rollback_err);
                }
                return Err(e);
            }
        };

        tx.commit().await?;

        tracing::info!("Booking {} moved from {} to {}", booking_id, from, to);

        if to == BookingStatus::Completed {
            self.recognize_earnings(&booking).await;
        }

        self.integration_manager
            .handle_event(BookingEvent::StatusChanged {
                booking: booking.clone(),
                from,
            })
            .await;

        Ok(booking)
    }

    /// Records earnings for completed bookings that have none yet, e.g. after
    /// the recorder was unavailable at completion time. Returns how many were
    /// recorded; bookings the recorder still rejects wait for the next run.
    pub async fn reconcile_earnings(&self) -> Result<usize> {
        let pending = self.booking_repo.list_completed_without_earnings().await?;
        let mut recorded = 0;

        for booking in &pending {
            let outcome = self
                .earnings
                .record_earnings(
                    booking.provider_id,
                    booking.id,
                    booking.subtotal,
                    booking.commission_amount,
                    booking.provider_earnings,
                )
                .await;
            match outcome {
                Ok(EarningsOutcome::Recorded) => recorded += 1,
                Ok(EarningsOutcome::AlreadyRecorded) => {}
                Err(e) => tracing::warn!(
                    booking_id = %booking.id,
                    provider_id = %booking.provider_id,
                    "Earnings still unrecorded: {:?}",
                    e
                ),
            }
        }

        if recorded > 0 {
            tracing::info!(recorded, "Reconciled earnings for completed bookings");
        }
        Ok(recorded)
    }

    async fn write_transition(
        conn: &mut SqliteConnection,
        booking_id: Uuid,
        to: BookingStatus,
        options: TransitionOptions,
        actor: Option<Uuid>,
    ) -> Result<(Booking, BookingStatus)> {
        let current = SqliteBookingRepository::fetch_in(&mut *conn, booking_id)
            .await?
            .ok_or(AppError::BookingNotFound(booking_id))?;
        let from = current.status;

        if !from.can_transition_to(to) {
            return Err(AppError::InvalidTransition { from, to });
        }

        let now = Utc::now();
        let mut update = StatusUpdate {
            booking_id,
            from,
            to,
            payment_status: None,
            accepted_at: None,
            started_at: None,
            completed_at: None,
            cancelled_at: None,
            cancellation_reason: None,
            provider_notes: options.provider_notes.clone(),
            updated_at: now,
        };

        match to {
            BookingStatus::Accepted => update.accepted_at = Some(now),
            BookingStatus::InProgress => update.started_at = Some(now),
            BookingStatus::Completed => {
                update.completed_at = Some(now);
                update.payment_status = Some(PaymentStatus::Paid);
            }
            BookingStatus::Cancelled => {
                update.cancelled_at = Some(now);
                update.cancellation_reason = options.cancellation_reason.clone();
            }
            BookingStatus::Pending | BookingStatus::Rejected => {}
        }

        if !SqliteBookingRepository::apply_status_update_in(&mut *conn, &update).await? {
            // Someone else moved the booking between our read and write
            return Err(AppError::Conflict(format!(
                "Booking {} changed status concurrently; reload and retry",
                booking_id
            )));
        }

        SqliteBookingRepository::record_status_change_in(
            &mut *conn,
            &BookingStatusChange {
                id: Uuid::new_v4(),
                booking_id,
                from_status: Some(from),
                to_status: to,
                changed_by: actor,
                note: options.cancellation_reason.or(options.provider_notes),
                changed_at: now,
            },
        )
        .await?;

        let booking = SqliteBookingRepository::fetch_in(&mut *conn, booking_id)
            .await?
            .ok_or_else(|| AppError::Database("Failed to retrieve updated booking".to_string()))?;

        Ok((booking, from))
    }

    async fn recognize_earnings(&self, booking: &Booking) {
        let outcome = self
            .earnings
            .record_earnings(
                booking.provider_id,
                booking.id,
                booking.subtotal,
                booking.commission_amount,
                booking.provider_earnings,
            )
            .await;

        match outcome {
            Ok(EarningsOutcome::Recorded) => {}
            Ok(EarningsOutcome::AlreadyRecorded) => {
                tracing::warn!("Earnings for booking {} were already recorded", booking.id);
            }
            Err(e) => {
                // Completion stands; reconcile_earnings picks the booking up later
                tracing::error!(
                    booking_id = %booking.id,
                    provider_id = %booking.provider_id,
                    earnings_unrecorded = true,
                    "Failed to record earnings: {:?}",
                    e
                );
            }
        }
    }
}
