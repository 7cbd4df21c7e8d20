mod common;

use appointly::{
    domain::{BookingStatus, PaymentStatus, TransitionOptions},
    error::AppError,
    repository::BookingRepository,
};
use rust_decimal_macros::dec;
use uuid::Uuid;

use common::*;

#[tokio::test]
async fn happy_path_stamps_each_step_and_recognizes_earnings() -> anyhow::Result<()> {
    let pool = pool().await?;
    let ctx = context(&pool).await?;
    let booking = pending_booking(&ctx).await?.booking;
    let machine = &ctx.booking_state_machine;

    let accepted = machine
        .transition(booking.id, BookingStatus::Accepted, TransitionOptions::default(), Some(booking.provider_id))
        .await?;
    assert_eq!(accepted.status, BookingStatus::Accepted);
    assert!(accepted.accepted_at.is_some());
    assert!(accepted.started_at.is_none());

    let started = machine
        .transition(booking.id, BookingStatus::InProgress, TransitionOptions::default(), Some(booking.provider_id))
        .await?;
    assert!(started.started_at.is_some());
    assert_eq!(started.accepted_at, accepted.accepted_at);

    let completed = machine
        .transition(
            booking.id,
            BookingStatus::Completed,
            TransitionOptions {
                provider_notes: Some("Left spare key under the mat".to_string()),
                ..Default::default()
            },
            Some(booking.provider_id),
        )
        .await?;
    assert_eq!(completed.status, BookingStatus::Completed);
    assert!(completed.completed_at.is_some());
    assert_eq!(completed.payment_status, PaymentStatus::Paid);
    assert_eq!(completed.provider_notes.as_deref(), Some("Left spare key under the mat"));

    let earnings = ctx.earnings.find_by_booking(booking.id).await?.unwrap();
    assert_eq!(earnings.provider_id, booking.provider_id);
    assert_eq!(earnings.amount, dec!(100.00));
    assert_eq!(earnings.commission, dec!(15.00));
    assert_eq!(earnings.net, dec!(85.00));

    let history = ctx.booking_repo.list_status_history(booking.id).await?;
    let steps: Vec<_> = history.iter().map(|h| (h.from_status, h.to_status)).collect();
    assert_eq!(
        steps,
        vec![
            (None, BookingStatus::Pending),
            (Some(BookingStatus::Pending), BookingStatus::Accepted),
            (Some(BookingStatus::Accepted), BookingStatus::InProgress),
            (Some(BookingStatus::InProgress), BookingStatus::Completed),
        ]
    );
    assert_eq!(history[3].changed_by, Some(booking.provider_id));

    Ok(())
}

#[tokio::test]
async fn skipping_a_step_is_rejected_and_changes_nothing() -> anyhow::Result<()> {
    let pool = pool().await?;
    let ctx = context(&pool).await?;
    let booking = pending_booking(&ctx).await?.booking;

    for to in [BookingStatus::InProgress, BookingStatus::Completed, BookingStatus::Pending] {
        let result = ctx
            .booking_state_machine
            .transition(booking.id, to, TransitionOptions::default(), None)
            .await;
        assert!(matches!(
            result,
            Err(AppError::InvalidTransition { from: BookingStatus::Pending, to: t }) if t == to
        ));
    }

    let stored = ctx.booking_repo.find_by_id(booking.id).await?.unwrap();
    assert_eq!(stored.status, BookingStatus::Pending);
    assert!(ctx.earnings.find_by_booking(booking.id).await?.is_none());
    assert_eq!(ctx.booking_repo.list_status_history(booking.id).await?.len(), 1);

    Ok(())
}

#[tokio::test]
async fn invalid_transition_message_names_both_states() -> anyhow::Result<()> {
    let pool = pool().await?;
    let ctx = context(&pool).await?;
    let booking = pending_booking(&ctx).await?.booking;

    let err = ctx
        .booking_state_machine
        .transition(booking.id, BookingStatus::Completed, TransitionOptions::default(), None)
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Cannot transition booking from pending to completed");

    Ok(())
}

#[tokio::test]
async fn terminal_states_accept_no_further_transitions() -> anyhow::Result<()> {
    let pool = pool().await?;
    let ctx = context(&pool).await?;
    let machine = &ctx.booking_state_machine;

    let rejected = pending_booking(&ctx).await?.booking;
    machine
        .transition(rejected.id, BookingStatus::Rejected, TransitionOptions::default(), None)
        .await?;

    let cancelled = pending_booking(&ctx).await?.booking;
    machine
        .transition(cancelled.id, BookingStatus::Accepted, TransitionOptions::default(), None)
        .await?;
    machine
        .transition(cancelled.id, BookingStatus::Cancelled, TransitionOptions::default(), None)
        .await?;

    for id in [rejected.id, cancelled.id] {
        for to in [BookingStatus::Accepted, BookingStatus::Cancelled, BookingStatus::Completed] {
            let result = machine.transition(id, to, TransitionOptions::default(), None).await;
            assert!(matches!(result, Err(AppError::InvalidTransition { .. })));
        }
    }

    Ok(())
}

#[tokio::test]
async fn cancellation_keeps_reason_and_notifies_both_parties() -> anyhow::Result<()> {
    let pool = pool().await?;
    let ctx = context(&pool).await?;
    let booking = pending_booking(&ctx).await?.booking;

    let cancelled = ctx
        .booking_state_machine
        .transition(
            booking.id,
            BookingStatus::Cancelled,
            TransitionOptions {
                cancellation_reason: Some("Plans changed".to_string()),
                ..Default::default()
            },
            Some(booking.customer_id),
        )
        .await?;

    assert_eq!(cancelled.status, BookingStatus::Cancelled);
    assert!(cancelled.cancelled_at.is_some());
    assert_eq!(cancelled.cancellation_reason.as_deref(), Some("Plans changed"));
    assert_eq!(cancelled.payment_status, PaymentStatus::Pending);

    assert_eq!(
        notification_kinds(&pool, booking.customer_id).await?,
        vec!["booking_cancelled"]
    );
    assert_eq!(
        notification_kinds(&pool, booking.provider_id).await?,
        vec!["booking_requested", "booking_cancelled"]
    );

    let history = ctx.booking_repo.list_status_history(booking.id).await?;
    assert_eq!(history.last().unwrap().note.as_deref(), Some("Plans changed"));

    Ok(())
}

#[tokio::test]
async fn completing_twice_records_earnings_once() -> anyhow::Result<()> {
    let pool = pool().await?;
    let ctx = context(&pool).await?;
    let booking = pending_booking(&ctx).await?.booking;
    let machine = &ctx.booking_state_machine;

    for to in [BookingStatus::Accepted, BookingStatus::InProgress, BookingStatus::Completed] {
        machine.transition(booking.id, to, TransitionOptions::default(), None).await?;
    }

    let again = machine
        .transition(booking.id, BookingStatus::Completed, TransitionOptions::default(), None)
        .await;
    assert!(matches!(again, Err(AppError::InvalidTransition { .. })));

    // Redelivery straight to the recorder is absorbed too
    let outcome = ctx
        .earnings
        .record_earnings(booking.provider_id, booking.id, dec!(100.00), dec!(15.00), dec!(85.00))
        .await?;
    assert_eq!(outcome, appointly::integrations::earnings::EarningsOutcome::AlreadyRecorded);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM provider_earnings WHERE booking_id = ?")
        .bind(booking.id.to_string())
        .fetch_one(&pool)
        .await?;
    assert_eq!(count, 1);

    Ok(())
}

#[tokio::test]
async fn unknown_booking_is_reported() -> anyhow::Result<()> {
    let pool = pool().await?;
    let ctx = context(&pool).await?;
    let missing = Uuid::new_v4();

    let result = ctx
        .booking_state_machine
        .transition(missing, BookingStatus::Accepted, TransitionOptions::default(), None)
        .await;

    assert!(matches!(result, Err(AppError::BookingNotFound(id)) if id == missing));

    Ok(())
}
