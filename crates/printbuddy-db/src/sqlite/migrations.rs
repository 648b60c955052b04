use rusqlite::Connection;

use super::SqliteResultExt;
use crate::DbError;

pub fn run(conn: &Connection) -> Result<(), DbError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version    INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL
        );",
    )
    .to_db()?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |r| r.get(0),
        )
        .to_db()?;

    if current_version < 1 {
        // v1: one table per record kind; rows are never updated or deleted
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS feedback (
                 id          TEXT PRIMARY KEY,
                 name        TEXT,
                 email       TEXT,
                 feedback    TEXT NOT NULL CHECK(feedback <> ''),
                 rating      INTEGER NOT NULL CHECK(rating BETWEEN 1 AND 5),
                 created_at  TEXT NOT NULL
             );
             CREATE INDEX IF NOT EXISTS idx_feedback_created ON feedback(created_at);

             CREATE TABLE IF NOT EXISTS orders (
                 id              TEXT PRIMARY KEY,
                 name            TEXT NOT NULL CHECK(name <> ''),
                 email           TEXT NOT NULL,
                 service         TEXT NOT NULL
                                     CHECK(service IN ('document', 'poster', 'bw', 'color')),
                 file_locator    TEXT NOT NULL CHECK(file_locator <> ''),
                 details         TEXT NOT NULL CHECK(details <> ''),
                 is_female       INTEGER NOT NULL DEFAULT 0,
                 customer_phone  TEXT,
                 amount          INTEGER NOT NULL,
                 created_at      TEXT NOT NULL
             );
             CREATE INDEX IF NOT EXISTS idx_orders_created ON orders(created_at);",
        )
        .to_db()?;

        conn.execute(
            "INSERT INTO schema_version (version, applied_at) VALUES (1, datetime('now'))",
            [],
        )
        .to_db()?;
    }

    Ok(())
}
