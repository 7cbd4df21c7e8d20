use sqlx::{pool::PoolConnection, Sqlite, SqliteConnection, SqlitePool};

use crate::error::{AppError, Result};

/// Write transaction that takes SQLite's write lock up front.
///
/// `pool.begin()` issues a deferred `BEGIN`: a transaction that reads before
/// it writes holds a shared lock and fails with `SQLITE_BUSY` when it tries to
/// upgrade while another writer is active. `BEGIN IMMEDIATE` queues writers on
/// the connection's busy timeout instead.
///
/// Dropping the guard without [`WriteTransaction::commit`] rolls back.
pub struct WriteTransaction {
    conn: Option<PoolConnection<Sqlite>>,
}

impl WriteTransaction {
    pub async fn begin(pool: &SqlitePool) -> Result<Self> {
        let mut conn = pool.acquire().await?;
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;

        Ok(Self { conn: Some(conn) })
    }

    pub fn executor(&mut self) -> Result<&mut SqliteConnection> {
        self.conn
            .as_deref_mut()
            .ok_or_else(|| AppError::Internal("Transaction already finished".to_string()))
    }

    pub async fn commit(mut self) -> Result<()> {
        let mut conn = self
            .conn
            .take()
            .ok_or_else(|| AppError::Internal("Transaction already finished".to_string()))?;

        if let Err(e) = sqlx::query("COMMIT").execute(&mut *conn).await {
            // Never hand a connection with an open transaction back to the pool
            let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
            return Err(e.into());
        }

        Ok(())
    }

    pub async fn rollback(mut self) -> Result<()> {
        if let Some(mut conn) = self.conn.take() {
            sqlx::query("ROLLBACK").execute(&mut *conn).await?;
        }
        Ok(())
    }
}

impl Drop for WriteTransaction {
    fn drop(&mut self) {
        let Some(mut conn) = self.conn.take() else {
            return;
        };

        tracing::debug!("Write transaction dropped without commit, rolling back");

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = sqlx::query("ROLLBACK").execute(&mut *conn).await {
                        tracing::error!("Rollback of abandoned transaction failed: {}", e);
                        // Closing the connection discards the transaction
                        drop(conn.detach());
                    }
                });
            }
            Err(_) => drop(conn.detach()),
        }
    }
}
