use chrono::Utc;
use rusqlite::{params, Row};

use printbuddy_core::feedback::{CreateFeedback, Feedback};

use super::super::{not_found_or, SqliteDatabase, SqliteResultExt};
use crate::DbError;

fn row_to_feedback(row: &Row) -> rusqlite::Result<Feedback> {
    Ok(Feedback {
        id: row.get("id")?,
        name: row.get("name")?,
        email: row.get("email")?,
        feedback: row.get("feedback")?,
        rating: row.get("rating")?,
        created_at: row.get("created_at")?,
    })
}

impl SqliteDatabase {
    pub fn insert_feedback_sync(&self, input: &CreateFeedback) -> Result<Feedback, DbError> {
        self.with_conn(|conn| {
            let id = uuid::Uuid::new_v4().to_string();
            let now = Utc::now();
            conn.execute(
                "INSERT INTO feedback (id, name, email, feedback, rating, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![id, input.name, input.email, input.feedback, input.rating, now],
            )
            .to_db()?;
            conn.query_row(
                "SELECT * FROM feedback WHERE id = ?1",
                params![id],
                row_to_feedback,
            )
            .to_db()
        })
    }

    pub fn get_feedback_sync(&self, id: &str) -> Result<Feedback, DbError> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT * FROM feedback WHERE id = ?1",
                params![id],
                row_to_feedback,
            )
            .map_err(not_found_or(format!("feedback {id}")))
        })
    }

    pub fn list_feedback_sync(&self, limit: i64) -> Result<Vec<Feedback>, DbError> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT * FROM feedback ORDER BY created_at DESC, rowid DESC LIMIT ?1",
                )
                .to_db()?;
            let rows = stmt
                .query_map(params![limit], row_to_feedback)
                .to_db()?
                .collect::<Result<Vec<_>, _>>()
                .to_db()?;
            Ok(rows)
        })
    }

    pub fn count_feedback_sync(&self) -> Result<i64, DbError> {
        self.with_conn(|conn| {
            conn.query_row("SELECT count(*) FROM feedback", [], |r| r.get(0))
                .to_db()
        })
    }
}
