mod common;

use appointly::{
    domain::{BookingStatus, TransitionOptions, VerificationStatus},
    error::AppError,
};
use chrono::Weekday;
use rust_decimal_macros::dec;
use uuid::Uuid;

use common::*;

async fn count(pool: &sqlx::SqlitePool, sql: &str) -> anyhow::Result<i64> {
    Ok(sqlx::query_scalar(sql).fetch_one(pool).await?)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn simultaneous_bookings_all_commit() -> anyhow::Result<()> {
    let (pool, path) = file_pool().await?;
    let ctx = context(&pool).await?;
    let provider_id = provider(&ctx, VerificationStatus::Approved, None).await?;
    let service_id = service(&ctx, provider_id, dec!(80.00), Some(15)).await?.id;
    let date = next(Weekday::Tue);

    let tasks: Vec<_> = (0..20)
        .map(|i| {
            let ctx = ctx.clone();
            let at = format!("{:02}:{:02}", 8 + i / 4, (i % 4) * 15);
            tokio::spawn(async move {
                ctx.booking_ledger
                    .create(booking_request(Uuid::new_v4(), service_id, date, &at, vec![]))
                    .await
            })
        })
        .collect();

    let mut failures = Vec::new();
    for task in tasks {
        if let Err(e) = task.await? {
            failures.push(e.to_string());
        }
    }

    let bookings = count(&pool, "SELECT COUNT(*) FROM bookings").await?;
    let history = count(&pool, "SELECT COUNT(*) FROM booking_status_history").await?;
    drop_file_pool(pool, path).await;

    assert!(failures.is_empty(), "creations failed: {:?}", failures);
    assert_eq!(bookings, 20);
    assert_eq!(history, 20);

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn simultaneous_transitions_of_different_bookings_all_commit() -> anyhow::Result<()> {
    let (pool, path) = file_pool().await?;
    let ctx = context(&pool).await?;

    let mut bookings = Vec::new();
    for _ in 0..10 {
        bookings.push(pending_booking(&ctx).await?.booking);
    }

    let tasks: Vec<_> = bookings
        .iter()
        .map(|booking| {
            let ctx = ctx.clone();
            let (booking_id, provider_id) = (booking.id, booking.provider_id);
            tokio::spawn(async move {
                ctx.booking_state_machine
                    .transition(booking_id, BookingStatus::Accepted, TransitionOptions::default(), Some(provider_id))
                    .await
            })
        })
        .collect();

    let mut failures = Vec::new();
    for task in tasks {
        if let Err(e) = task.await? {
            failures.push(e.to_string());
        }
    }

    let accepted = count(&pool, "SELECT COUNT(*) FROM bookings WHERE status = 'accepted'").await?;
    drop_file_pool(pool, path).await;

    assert!(failures.is_empty(), "transitions failed: {:?}", failures);
    assert_eq!(accepted, 10);

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_accepts_of_one_booking_let_exactly_one_win() -> anyhow::Result<()> {
    let (pool, path) = file_pool().await?;
    let ctx = context(&pool).await?;
    let booking = pending_booking(&ctx).await?.booking;

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let ctx = ctx.clone();
            let (booking_id, provider_id) = (booking.id, booking.provider_id);
            tokio::spawn(async move {
                ctx.booking_state_machine
                    .transition(booking_id, BookingStatus::Accepted, TransitionOptions::default(), Some(provider_id))
                    .await
            })
        })
        .collect();

    let mut won = 0;
    let mut unexpected = Vec::new();
    for task in tasks {
        match task.await? {
            Ok(_) => won += 1,
            Err(AppError::InvalidTransition { .. }) | Err(AppError::Conflict(_)) => {}
            Err(e) => unexpected.push(e.to_string()),
        }
    }

    let accept_rows = count(
        &pool,
        "SELECT COUNT(*) FROM booking_status_history WHERE to_status = 'accepted'",
    )
    .await?;
    drop_file_pool(pool, path).await;

    assert!(unexpected.is_empty(), "unexpected errors: {:?}", unexpected);
    assert_eq!(won, 1);
    assert_eq!(accept_rows, 1);

    Ok(())
}
