use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::SqlitePool;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain::{Booking, BookingStatus},
    error::Result,
    integrations::{BaseIntegration, BookingEvent, Integration},
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    BookingRequested,
    BookingAccepted,
    BookingRejected,
    BookingStarted,
    BookingCompleted,
    BookingCancelled,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::BookingRequested => "booking_requested",
            NotificationKind::BookingAccepted => "booking_accepted",
            NotificationKind::BookingRejected => "booking_rejected",
            NotificationKind::BookingStarted => "booking_started",
            NotificationKind::BookingCompleted => "booking_completed",
            NotificationKind::BookingCancelled => "booking_cancelled",
        }
    }

    fn for_status(status: BookingStatus) -> Option<Self> {
        match status {
            BookingStatus::Accepted => Some(NotificationKind::BookingAccepted),
            BookingStatus::Rejected => Some(NotificationKind::BookingRejected),
            BookingStatus::InProgress => Some(NotificationKind::BookingStarted),
            BookingStatus::Completed => Some(NotificationKind::BookingCompleted),
            BookingStatus::Cancelled => Some(NotificationKind::BookingCancelled),
            BookingStatus::Pending => None,
        }
    }
}

/// Fire-and-forget delivery to a user. Callers must not depend on success.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, user_id: Uuid, kind: NotificationKind, payload: serde_json::Value) -> Result<()>;
}

/// Writes notifications to the in-app inbox table. Push and email fan-out
/// read from there.
pub struct SqliteNotifier {
    pool: SqlitePool,
}

impl SqliteNotifier {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Notifier for SqliteNotifier {
    async fn notify(&self, user_id: Uuid, kind: NotificationKind, payload: serde_json::Value) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO notifications (id, user_id, kind, payload, is_read, created_at)
            VALUES (?, ?, ?, ?, 0, ?)
            "#
        )
        .bind(Uuid::new_v4().to_string())
        .bind(user_id.to_string())
        .bind(kind.as_str())
        .bind(payload.to_string())
        .bind(Utc::now().naive_utc())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Tells the other party about booking requests and status changes.
pub struct NotificationIntegration {
    base: BaseIntegration,
    notifier: Arc<dyn Notifier>,
}

impl NotificationIntegration {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self {
            base: BaseIntegration::new("Notifications", true),
            notifier,
        }
    }

    fn payload(booking: &Booking) -> serde_json::Value {
        json!({
            "booking_id": booking.id,
            "service_id": booking.service_id,
            "scheduled_date": booking.scheduled_date,
            "scheduled_time": booking.scheduled_time.format("%H:%M").to_string(),
            "status": booking.status,
        })
    }
}

#[async_trait]
impl Integration for NotificationIntegration {
    fn name(&self) -> &str {
        &self.base.name
    }

    fn is_enabled(&self) -> bool {
        self.base.enabled
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }

    async fn handle_event(&self, event: &BookingEvent) -> Result<()> {
        match event {
            BookingEvent::Requested(booking) => {
                self.notifier
                    .notify(booking.provider_id, NotificationKind::BookingRequested, Self::payload(booking))
                    .await
            }
            BookingEvent::StatusChanged { booking, from } => {
                let Some(kind) = NotificationKind::for_status(booking.status) else {
                    return Ok(());
                };

                let mut payload = Self::payload(booking);
                payload["previous_status"] = json!(from);
                if let Some(reason) = &booking.cancellation_reason {
                    payload["cancellation_reason"] = json!(reason);
                }

                // A cancellation may come from either side, so both hear about it
                let provider_result = if kind == NotificationKind::BookingCancelled {
                    self.notifier
                        .notify(booking.provider_id, kind, payload.clone())
                        .await
                } else {
                    Ok(())
                };
                let customer_result = self.notifier.notify(booking.customer_id, kind, payload).await;

                provider_result.and(customer_result)
            }
        }
    }
}
