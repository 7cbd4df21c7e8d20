mod common;

use std::sync::Arc;

use appointly::{
    domain::{BookingStatus, TransitionOptions},
    error::{AppError, Result},
    integrations::{
        earnings::{EarningsOutcome, EarningsRecord, EarningsRecorder, SqliteEarningsRecorder},
        notifications::{NotificationKind, Notifier, SqliteNotifier},
    },
    repository::BookingRepository,
    service::ServiceContext,
};
use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use common::*;

struct UnavailableLedger;

#[async_trait]
impl EarningsRecorder for UnavailableLedger {
    async fn record_earnings(
        &self,
        _provider_id: Uuid,
        _booking_id: Uuid,
        _amount: Decimal,
        _commission: Decimal,
        _net: Decimal,
    ) -> Result<EarningsOutcome> {
        Err(AppError::Integration("earnings ledger unavailable".to_string()))
    }

    async fn find_by_booking(&self, _booking_id: Uuid) -> Result<Option<EarningsRecord>> {
        Ok(None)
    }
}

struct UnreachableInbox;

#[async_trait]
impl Notifier for UnreachableInbox {
    async fn notify(&self, _user_id: Uuid, _kind: NotificationKind, _payload: serde_json::Value) -> Result<()> {
        Err(AppError::Integration("inbox unreachable".to_string()))
    }
}

async fn complete(ctx: &ServiceContext, booking_id: Uuid, provider_id: Uuid) -> Result<()> {
    for to in [BookingStatus::Accepted, BookingStatus::InProgress, BookingStatus::Completed] {
        ctx.booking_state_machine
            .transition(booking_id, to, TransitionOptions::default(), Some(provider_id))
            .await?;
    }
    Ok(())
}

#[tokio::test]
async fn completion_stands_when_earnings_cannot_be_recorded() -> anyhow::Result<()> {
    let pool = pool().await?;
    let ctx = context_with(
        &pool,
        Arc::new(UnavailableLedger),
        Arc::new(SqliteNotifier::new(pool.clone())),
    )
    .await?;
    let booking = pending_booking(&ctx).await?.booking;

    complete(&ctx, booking.id, booking.provider_id).await?;

    let stored = ctx.booking_repo.find_by_id(booking.id).await?.unwrap();
    assert_eq!(stored.status, BookingStatus::Completed);
    assert!(stored.completed_at.is_some());

    let recorder = SqliteEarningsRecorder::new(pool.clone());
    assert!(recorder.find_by_booking(booking.id).await?.is_none());
    assert_eq!(
        ctx.booking_repo.list_completed_without_earnings().await?.len(),
        1
    );

    Ok(())
}

#[tokio::test]
async fn booking_is_created_when_notification_fails() -> anyhow::Result<()> {
    let pool = pool().await?;
    let ctx = context_with(
        &pool,
        Arc::new(SqliteEarningsRecorder::new(pool.clone())),
        Arc::new(UnreachableInbox),
    )
    .await?;

    let details = pending_booking(&ctx).await?;

    let stored = ctx.booking_repo.find_by_id(details.booking.id).await?.unwrap();
    assert_eq!(stored.status, BookingStatus::Pending);
    assert!(notification_kinds(&pool, details.booking.provider_id).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn transitions_succeed_when_notification_fails() -> anyhow::Result<()> {
    let pool = pool().await?;
    let ctx = context_with(
        &pool,
        Arc::new(SqliteEarningsRecorder::new(pool.clone())),
        Arc::new(UnreachableInbox),
    )
    .await?;
    let booking = pending_booking(&ctx).await?.booking;

    let cancelled = ctx
        .booking_state_machine
        .transition(
            booking.id,
            BookingStatus::Cancelled,
            TransitionOptions {
                cancellation_reason: Some("Moving house".to_string()),
                ..Default::default()
            },
            Some(booking.customer_id),
        )
        .await?;

    assert_eq!(cancelled.status, BookingStatus::Cancelled);
    assert_eq!(cancelled.cancellation_reason.as_deref(), Some("Moving house"));

    Ok(())
}

#[tokio::test]
async fn reconciliation_records_missed_earnings_once() -> anyhow::Result<()> {
    let pool = pool().await?;
    let degraded = context_with(
        &pool,
        Arc::new(UnavailableLedger),
        Arc::new(SqliteNotifier::new(pool.clone())),
    )
    .await?;
    let booking = pending_booking(&degraded).await?.booking;
    complete(&degraded, booking.id, booking.provider_id).await?;

    assert_eq!(degraded.booking_state_machine.reconcile_earnings().await?, 0);

    let ctx = context(&pool).await?;
    assert_eq!(ctx.booking_state_machine.reconcile_earnings().await?, 1);

    let earnings = ctx.earnings.find_by_booking(booking.id).await?.unwrap();
    assert_eq!(earnings.provider_id, booking.provider_id);
    assert_eq!(earnings.amount, dec!(100.00));
    assert_eq!(earnings.commission, dec!(15.00));
    assert_eq!(earnings.net, dec!(85.00));

    assert_eq!(ctx.booking_state_machine.reconcile_earnings().await?, 0);
    assert!(ctx.booking_repo.list_completed_without_earnings().await?.is_empty());

    Ok(())
}
