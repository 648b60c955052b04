use sqlx::{PgConnection, PgPool};

use super::pg_err;
use crate::DbError;

/// Fixed key for the advisory lock that serialises migration runs across
/// instances starting at the same time.
pub const MIGRATION_LOCK_KEY: i64 = 0x7072_696E_7462_7564; // "printbud"

/// Run pending migrations under a session advisory lock. Lock, migrations
/// and unlock share one pooled connection; a session lock is only released
/// by the session holding it.
pub async fn run(pool: &PgPool) -> Result<(), DbError> {
    let mut conn = pool.acquire().await.map_err(pg_err)?;

    sqlx::query("SELECT pg_advisory_lock($1)")
        .bind(MIGRATION_LOCK_KEY)
        .execute(&mut *conn)
        .await
        .map_err(pg_err)?;

    let result = run_inner(&mut conn).await;

    if let Err(e) = sqlx::query("SELECT pg_advisory_unlock($1)")
        .bind(MIGRATION_LOCK_KEY)
        .execute(&mut *conn)
        .await
    {
        tracing::warn!("failed to release migration lock: {e}");
        // Never pool a session that may still hold the lock.
        drop(conn.detach());
    }

    result
}

async fn run_inner(conn: &mut PgConnection) -> Result<(), DbError> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version    INTEGER PRIMARY KEY,
            applied_at TIMESTAMPTZ NOT NULL
        )",
    )
    .execute(&mut *conn)
    .await
    .map_err(pg_err)?;

    let current: i32 = sqlx::query_scalar("SELECT COALESCE(MAX(version), 0) FROM schema_version")
        .fetch_one(&mut *conn)
        .await
        .map_err(pg_err)?;

    if current < 1 {
        tracing::info!("applying postgres migration V1");
        sqlx::raw_sql(include_str!("sql/V1__initial.sql"))
            .execute(&mut *conn)
            .await
            .map_err(pg_err)?;
    }

    Ok(())
}
