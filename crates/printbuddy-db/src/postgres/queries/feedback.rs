use chrono::{DateTime, Utc};

use printbuddy_core::feedback::{CreateFeedback, Feedback};

use super::super::{pg_err, pg_not_found, PostgresDatabase};
use crate::DbError;

#[derive(sqlx::FromRow)]
struct FeedbackRow {
    id: String,
    name: Option<String>,
    email: Option<String>,
    feedback: String,
    rating: i64,
    created_at: DateTime<Utc>,
}

impl From<FeedbackRow> for Feedback {
    fn from(r: FeedbackRow) -> Self {
        Feedback {
            id: r.id,
            name: r.name,
            email: r.email,
            feedback: r.feedback,
            rating: r.rating,
            created_at: r.created_at,
        }
    }
}

impl PostgresDatabase {
    pub(crate) async fn pg_insert_feedback(
        &self,
        input: &CreateFeedback,
    ) -> Result<Feedback, DbError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();

        let row = sqlx::query_as::<_, FeedbackRow>(
            "INSERT INTO feedback (id, name, email, feedback, rating, created_at)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING *",
        )
        .bind(&id)
        .bind(&input.name)
        .bind(&input.email)
        .bind(&input.feedback)
        .bind(input.rating)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(pg_err)?;

        Ok(row.into())
    }

    pub(crate) async fn pg_get_feedback(&self, id: &str) -> Result<Feedback, DbError> {
        let row = sqlx::query_as::<_, FeedbackRow>("SELECT * FROM feedback WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(pg_err)?
            .ok_or_else(|| pg_not_found(&format!("feedback {id}")))?;
        Ok(row.into())
    }

    pub(crate) async fn pg_list_feedback(&self, limit: i64) -> Result<Vec<Feedback>, DbError> {
        let rows = sqlx::query_as::<_, FeedbackRow>(
            "SELECT * FROM feedback ORDER BY created_at DESC, seq DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(pg_err)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub(crate) async fn pg_count_feedback(&self) -> Result<i64, DbError> {
        sqlx::query_scalar("SELECT count(*) FROM feedback")
            .fetch_one(&self.pool)
            .await
            .map_err(pg_err)
    }
}
